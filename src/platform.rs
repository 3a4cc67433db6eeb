//! Platform device enumeration.
//!
//! A [`PlatformBus`] walks a configuration tree, matches each node against a
//! driver's compatible table, and probes the matching nodes. Contexts returned
//! by `probe` are held by the bus until the device is unbound, so each device
//! is probed once and removed once.

use tracing::{debug, error, info};

use crate::error::Result;
use crate::tree::{node_path, ConfigNode};

/// A configuration node presented to a driver.
#[derive(Debug, Clone)]
pub struct PlatformDevice<'a> {
    node: &'a ConfigNode,
    path: String,
}

impl<'a> PlatformDevice<'a> {
    /// Wrap a node that sits at the root of its tree.
    pub fn new(node: &'a ConfigNode) -> Self {
        Self::at_path(node, node_path(None, &node.name))
    }

    /// Wrap a node found at `path` in a larger tree.
    pub fn at_path(node: &'a ConfigNode, path: impl Into<String>) -> Self {
        Self {
            node,
            path: path.into(),
        }
    }

    /// Device name, taken from the node name.
    pub fn name(&self) -> &'a str {
        &self.node.name
    }

    /// Full path of the node. Unique within a tree.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The device's configuration node.
    pub fn node(&self) -> &'a ConfigNode {
        self.node
    }
}

/// Lifecycle hooks of a platform driver.
pub trait PlatformDriver: Send + Sync {
    /// Per-device state produced by `probe`.
    type Context;

    /// Driver name.
    fn name(&self) -> &str;

    /// Compatible strings this driver binds to.
    fn compatible(&self) -> &[String];

    /// Bring up a matched device.
    fn probe(&self, device: &PlatformDevice<'_>) -> Result<Self::Context>;

    /// Tear down a device. `None` means no context was recorded for it.
    fn remove(&self, context: Option<Self::Context>);
}

/// Binds one driver to the matching nodes of a tree.
///
/// Bound devices are keyed by node path.
pub struct PlatformBus<D: PlatformDriver> {
    driver: D,
    bound: Vec<(String, D::Context)>,
}

impl<D: PlatformDriver> PlatformBus<D> {
    /// Create a bus for `driver` with nothing bound.
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            bound: Vec::new(),
        }
    }

    /// The registered driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Probe every compatible node of `tree` that is not bound yet.
    ///
    /// Returns the number of newly bound devices. A failed probe is logged
    /// and the node stays unbound.
    pub fn bind_tree(&mut self, tree: &ConfigNode) -> usize {
        let mut newly_bound = 0;

        for (path, node) in tree.walk() {
            if !node.is_compatible(self.driver.compatible()) {
                continue;
            }
            if self.is_bound(&path) {
                debug!(device = %path, "Already bound, skipping");
                continue;
            }

            let device = PlatformDevice::at_path(node, path);
            match self.driver.probe(&device) {
                Ok(context) => {
                    info!(driver = self.driver.name(), device = device.path(), "Bound device");
                    self.bound.push((device.path, context));
                    newly_bound += 1;
                }
                Err(e) => {
                    error!(driver = self.driver.name(), device = device.path(), "Probe failed: {}", e);
                }
            }
        }

        newly_bound
    }

    /// Whether the device at this path is bound.
    pub fn is_bound(&self, device: &str) -> bool {
        self.bound.iter().any(|(name, _)| name == device)
    }

    /// Paths of bound devices, in bind order.
    pub fn bound_devices(&self) -> impl Iterator<Item = &str> {
        self.bound.iter().map(|(name, _)| name.as_str())
    }

    /// Context of a bound device.
    pub fn context(&self, device: &str) -> Option<&D::Context> {
        self.bound
            .iter()
            .find(|(name, _)| name == device)
            .map(|(_, ctx)| ctx)
    }

    /// Remove the device at `device`. The driver's `remove` runs even if the device is
    /// unknown, receiving `None`.
    pub fn unbind(&mut self, device: &str) -> bool {
        let position = self.bound.iter().position(|(name, _)| name == device);
        let context = position.map(|i| self.bound.remove(i).1);
        let found = context.is_some();
        self.driver.remove(context);
        found
    }

    /// Remove every bound device, most recently bound first.
    pub fn unbind_all(&mut self) {
        while let Some((name, context)) = self.bound.pop() {
            debug!(device = %name, "Unbinding");
            self.driver.remove(Some(context));
        }
    }
}

impl<D: PlatformDriver> Drop for PlatformBus<D> {
    fn drop(&mut self) {
        self.unbind_all();
    }
}
