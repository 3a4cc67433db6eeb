//! Command-line front end for the RGB LED driver.
//!
//! Runs the driver against simulated lines and an in-memory registration
//! service, driven by a configuration tree file.
//!
//! # Usage
//!
//! Bring up the LEDs described by a tree and list them:
//! ```bash
//! rgbled probe --tree config/board.toml
//! ```
//!
//! Switch LEDs and read every endpoint back:
//! ```bash
//! rgbled set --tree config/board.toml ledred=1 ledblue=0
//! ```

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use rgbled::config::Settings;
use rgbled::driver::{DriverContext, LedsDriver};
use rgbled::line::sim::SimulatedLines;
use rgbled::logging;
use rgbled::platform::PlatformBus;
use rgbled::registry::MiscRegistry;
use rgbled::tree::loader::load_tree;

#[derive(Parser)]
#[command(name = "rgbled")]
#[command(about = "RGB LED platform driver on simulated lines", long_about = None)]
struct Cli {
    /// Settings file (defaults to config/rgbled.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring up the LEDs of a tree, list them, and tear down
    Probe {
        /// Configuration tree file
        #[arg(long)]
        tree: PathBuf,
    },

    /// Bring up, write each assignment, read back, and tear down
    Set {
        /// Configuration tree file
        #[arg(long)]
        tree: PathBuf,

        /// Assignments such as `ledred=1`
        #[arg(required = true, value_parser = parse_assignment)]
        assignments: Vec<(String, u8)>,
    },
}

fn parse_assignment(s: &str) -> Result<(String, u8), String> {
    let (label, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected <label>=<0|1>, got '{}'", s))?;
    match value {
        "0" => Ok((label.to_string(), b'0')),
        "1" => Ok((label.to_string(), b'1')),
        _ => Err(format!("value for '{}' must be 0 or 1, got '{}'", label, value)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .context("Failed to load settings")?;
    settings.validate().map_err(|e| anyhow!(e))?;
    logging::init_from_settings(&settings).map_err(|e| anyhow!(e))?;

    match cli.command {
        Commands::Probe { tree } => probe(&settings, &tree),
        Commands::Set { tree, assignments } => set(&settings, &tree, &assignments),
    }
}

fn bind(settings: &Settings, tree_path: &Path) -> Result<PlatformBus<LedsDriver>> {
    let tree = load_tree(tree_path)?;

    let lines = SimulatedLines::new(settings.lines.count);
    let registry = MiscRegistry::new();
    let driver = LedsDriver::from_settings(settings, Arc::new(registry), Arc::new(lines));

    let mut bus = PlatformBus::new(driver);
    let bound = bus.bind_tree(&tree);
    if bound == 0 {
        bail!(
            "No node in '{}' is compatible with {:?}",
            tree_path.display(),
            settings.driver.compatible
        );
    }
    info!("Bound {} device(s)", bound);
    Ok(bus)
}

fn contexts(bus: &PlatformBus<LedsDriver>) -> impl Iterator<Item = (&str, &DriverContext)> {
    bus.bound_devices()
        .filter_map(|path| bus.context(path).map(|ctx| (path, ctx)))
}

fn probe(settings: &Settings, tree_path: &Path) -> Result<()> {
    let mut bus = bind(settings, tree_path)?;

    for (path, context) in contexts(&bus) {
        println!("{}:", path);
        for endpoint in context.endpoints() {
            println!(
                "  {:<12} minor {:<3} {} mask 0x{:08x}",
                endpoint.path(),
                endpoint.minor(),
                endpoint.line_ref(),
                endpoint.mask().bits()
            );
        }
        for skipped in context.skipped() {
            println!("  skipped {} ({}): {}", skipped.node, skipped.reason, skipped.error);
        }
    }

    bus.unbind_all();
    Ok(())
}

fn set(settings: &Settings, tree_path: &Path, assignments: &[(String, u8)]) -> Result<()> {
    let mut bus = bind(settings, tree_path)?;

    for (label, value) in assignments {
        let endpoint = contexts(&bus)
            .find_map(|(_, ctx)| ctx.endpoint(label))
            .ok_or_else(|| anyhow!("No endpoint named '{}'", label))?;
        endpoint.write(&[*value])?;
    }

    for (_, context) in contexts(&bus) {
        for endpoint in context.endpoints() {
            let mut state = String::new();
            endpoint.open().read_to_string(&mut state)?;
            print!("{} {}", endpoint.path(), state);
        }
    }

    bus.unbind_all();
    Ok(())
}
