//! Compatible matching and device binding with a file-based tree.

use rgbled::config::Settings;
use rgbled::driver::LedsDriver;
use rgbled::line::sim::SimulatedLines;
use rgbled::platform::PlatformBus;
use rgbled::registry::MiscRegistry;
use rgbled::tree::loader::{load_tree, load_tree_from_str, TreeLoadError};
use std::io::Write;
use std::sync::Arc;

const BOARD: &str = r#"
name = "/"

[[children]]
name = "soc"

[[children.children]]
name = "rgb-leds"
compatible = ["vendor,other", "arrow,RGBleds"]

[[children.children.children]]
name = "led-red"
properties = { label = "ledred", gpios = [27, 0] }

[[children.children.children]]
name = "led-blue"
properties = { label = "ledblue", gpios = [26, 0] }

[[children]]
name = "keys"
compatible = ["arrow,hellokeys"]

[[children.children]]
name = "key-1"
properties = { label = "ledgreen", gpios = [22] }
"#;

fn write_board() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(BOARD.as_bytes()).unwrap();
    file
}

#[test]
fn test_binds_only_compatible_node() {
    let file = write_board();
    let tree = load_tree(file.path()).unwrap();

    let lines = SimulatedLines::new(28);
    let registry = MiscRegistry::new();
    let mut bus = PlatformBus::new(LedsDriver::new(
        Arc::new(registry.clone()),
        Arc::new(lines.clone()),
    ));

    assert_eq!(bus.bind_tree(&tree), 1);
    assert_eq!(bus.bound_devices().collect::<Vec<_>>(), vec!["/soc/rgb-leds"]);
    assert_eq!(registry.names(), vec!["ledred", "ledblue"]);
    assert_eq!(lines.owner(22), None);

    let ctx = bus.context("/soc/rgb-leds").unwrap();
    ctx.endpoint("ledred").unwrap().write(b"1").unwrap();
    assert_eq!(lines.is_high(27), Some(true));

    // Rebinding does not probe again
    assert_eq!(bus.bind_tree(&tree), 0);
    assert_eq!(registry.registered(), 2);

    assert!(bus.unbind("/soc/rgb-leds"));
    assert!(registry.is_empty());
    assert!(lines.owned_lines().is_empty());
}

#[test]
fn test_settings_drive_matching_and_capacity() {
    let file = write_board();
    let tree = load_tree(file.path()).unwrap();

    let mut settings = Settings::default();
    settings.driver.compatible = vec!["arrow,hellokeys".to_string()];
    settings.driver.max_resources = 1;

    let lines = SimulatedLines::new(settings.lines.count);
    let registry = MiscRegistry::new();
    let mut bus = PlatformBus::new(LedsDriver::from_settings(
        &settings,
        Arc::new(registry.clone()),
        Arc::new(lines.clone()),
    ));

    assert_eq!(bus.bind_tree(&tree), 1);
    assert!(bus.is_bound("/keys"));
    assert_eq!(registry.names(), vec!["ledgreen"]);
    assert_eq!(bus.context("/keys").unwrap().capacity(), 1);
}

#[test]
fn test_dropping_bus_tears_down() {
    let file = write_board();
    let tree = load_tree(file.path()).unwrap();

    let lines = SimulatedLines::new(28);
    let registry = MiscRegistry::new();
    {
        let mut bus = PlatformBus::new(LedsDriver::new(
            Arc::new(registry.clone()),
            Arc::new(lines.clone()),
        ));
        bus.bind_tree(&tree);
        assert_eq!(registry.len(), 2);
    }

    assert!(registry.is_empty());
    assert_eq!(lines.released(), 2);
}

#[test]
fn test_same_named_devices_on_different_buses() {
    let tree = load_tree_from_str(
        r#"
name = "/"

[[children]]
name = "bus0"

[[children.children]]
name = "leds"
compatible = ["arrow,RGBleds"]

[[children.children.children]]
name = "led-red"
properties = { label = "ledred", gpios = [27] }

[[children]]
name = "bus1"

[[children.children]]
name = "leds"
compatible = ["arrow,RGBleds"]

[[children.children.children]]
name = "led-blue"
properties = { label = "ledblue", gpios = [26] }
"#,
    )
    .unwrap();

    let lines = SimulatedLines::new(28);
    let registry = MiscRegistry::new();
    let mut bus = PlatformBus::new(LedsDriver::new(
        Arc::new(registry.clone()),
        Arc::new(lines.clone()),
    ));

    assert_eq!(bus.bind_tree(&tree), 2);
    assert_eq!(
        bus.bound_devices().collect::<Vec<_>>(),
        vec!["/bus0/leds", "/bus1/leds"]
    );
    assert_eq!(registry.names(), vec!["ledred", "ledblue"]);
    assert!(bus.context("/bus1/leds").unwrap().endpoint("ledblue").is_some());

    assert!(bus.unbind("/bus0/leds"));
    assert_eq!(registry.names(), vec!["ledblue"]);
    assert_eq!(lines.owned_lines(), vec![26]);
}

#[test]
fn test_missing_tree_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_tree(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, TreeLoadError::NotFound(_)));
}

#[test]
fn test_shipped_board_file() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/board.toml");
    let tree = load_tree(&path).unwrap();

    let lines = SimulatedLines::new(28);
    let registry = MiscRegistry::new();
    let mut bus = PlatformBus::new(LedsDriver::new(
        Arc::new(registry.clone()),
        Arc::new(lines),
    ));

    assert_eq!(bus.bind_tree(&tree), 1);
    assert_eq!(registry.names(), vec!["ledred", "ledgreen", "ledblue"]);
}
