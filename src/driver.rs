//! RGB LED platform driver.
//!
//! [`LedsDriver`] binds to configuration nodes compatible with
//! `arrow,RGBleds`. Bring-up walks the node's children in order and turns up
//! to [`MAX_RESOURCES`] of them into control endpoints; teardown releases them
//! in registration order.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use rgbled::driver::LedsDriver;
//! use rgbled::line::sim::SimulatedLines;
//! use rgbled::platform::{PlatformDevice, PlatformDriver};
//! use rgbled::registry::MiscRegistry;
//! use rgbled::tree::loader::load_tree;
//!
//! # fn main() -> anyhow::Result<()> {
//! let tree = load_tree("config/board.toml".as_ref())?;
//! let driver = LedsDriver::new(Arc::new(MiscRegistry::new()), Arc::new(SimulatedLines::new(28)));
//!
//! let context = driver.probe(&PlatformDevice::new(&tree))?;
//! if let Some(red) = context.endpoint("ledred") {
//!     red.write(b"1")?;
//! }
//! driver.remove(Some(context));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::endpoint::ControlEndpoint;
use crate::error::{LedError, Result};
use crate::line::LineController;
use crate::platform::{PlatformDevice, PlatformDriver};
use crate::registrar::{RegisterOutcome, Registrar, SkipReason};
use crate::registry::{EndpointRegistry, DEV_PREFIX};
use crate::resource::ResourceMask;

/// Maximum number of LEDs one device can expose.
pub const MAX_RESOURCES: usize = 3;

/// Driver name.
pub const DRIVER_NAME: &str = "rgb-leds-driver";

/// Default compatible match table.
pub const COMPATIBLE: &[&str] = &["arrow,RGBleds"];

/// A child that bring-up skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedChild {
    /// Name of the child node
    pub node: String,
    /// Step that failed
    pub reason: SkipReason,
    /// The absorbed error
    pub error: LedError,
}

/// Per-device state produced by bring-up.
///
/// Owns every live endpoint. Endpoints are kept in registration order and
/// never exceed the capacity reserved at creation.
#[derive(Debug)]
pub struct DriverContext {
    device: String,
    capacity: usize,
    endpoints: Vec<ControlEndpoint>,
    skipped: Vec<SkippedChild>,
}

impl DriverContext {
    /// Create an empty context able to hold `capacity` endpoints.
    ///
    /// Storage is reserved up front. Fails with [`LedError::OutOfMemory`] if
    /// the reservation cannot be satisfied.
    pub fn with_capacity(device: impl Into<String>, capacity: usize) -> Result<Self> {
        let mut endpoints = Vec::new();
        endpoints
            .try_reserve_exact(capacity)
            .map_err(|_| LedError::OutOfMemory { capacity })?;

        Ok(Self {
            device: device.into(),
            capacity,
            endpoints,
            skipped: Vec::new(),
        })
    }

    /// Name of the device this context belongs to.
    pub fn device_name(&self) -> &str {
        &self.device
    }

    /// Maximum number of endpoints.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether no endpoint was registered.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Whether the context holds `capacity` endpoints.
    pub fn is_full(&self) -> bool {
        self.endpoints.len() >= self.capacity
    }

    /// Live endpoints in registration order.
    pub fn endpoints(&self) -> &[ControlEndpoint] {
        &self.endpoints
    }

    /// Find an endpoint by name (`ledred`).
    pub fn endpoint(&self, name: &str) -> Option<&ControlEndpoint> {
        self.endpoints.iter().find(|ep| ep.name() == name)
    }

    /// Find an endpoint by path (`/dev/ledred`).
    pub fn endpoint_by_path(&self, path: &str) -> Option<&ControlEndpoint> {
        path.strip_prefix(DEV_PREFIX)
            .and_then(|name| self.endpoint(name))
    }

    /// Union of the masks of all registered LEDs.
    pub fn registered_mask(&self) -> ResourceMask {
        self.endpoints
            .iter()
            .fold(ResourceMask::empty(), |mask, ep| mask | ep.mask())
    }

    /// Union of the masks of all LEDs currently on.
    pub fn active_mask(&self) -> ResourceMask {
        self.endpoints
            .iter()
            .filter(|ep| ep.is_on())
            .fold(ResourceMask::empty(), |mask, ep| mask | ep.mask())
    }

    /// Children skipped during bring-up, in document order.
    pub fn skipped(&self) -> &[SkippedChild] {
        &self.skipped
    }

    /// Append an endpoint. Hands it back if the context is full.
    pub(crate) fn push(
        &mut self,
        endpoint: ControlEndpoint,
    ) -> std::result::Result<(), ControlEndpoint> {
        if self.is_full() {
            return Err(endpoint);
        }
        self.endpoints.push(endpoint);
        Ok(())
    }

    fn record_skip(&mut self, node: &str, reason: SkipReason, error: LedError) {
        self.skipped.push(SkippedChild {
            node: node.to_string(),
            reason,
            error,
        });
    }

    /// Release every endpoint in registration order. Returns how many.
    fn teardown(self) -> usize {
        let count = self.endpoints.len();
        for endpoint in self.endpoints {
            endpoint.release();
        }
        count
    }
}

/// Driver for the RGB LED node.
pub struct LedsDriver {
    registrar: Registrar,
    max_resources: usize,
    compatible: Vec<String>,
}

impl LedsDriver {
    /// Create a driver with the default capacity and match table.
    pub fn new(registry: Arc<dyn EndpointRegistry>, lines: Arc<dyn LineController>) -> Self {
        Self {
            registrar: Registrar::new(registry, lines),
            max_resources: MAX_RESOURCES,
            compatible: COMPATIBLE.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a driver using the `[driver]` section of `settings`.
    pub fn from_settings(
        settings: &Settings,
        registry: Arc<dyn EndpointRegistry>,
        lines: Arc<dyn LineController>,
    ) -> Self {
        Self::new(registry, lines)
            .with_max_resources(settings.driver.max_resources)
            .with_compatible(settings.driver.compatible.clone())
    }

    /// Override the per-device endpoint limit.
    pub fn with_max_resources(mut self, max_resources: usize) -> Self {
        self.max_resources = max_resources;
        self
    }

    /// Override the compatible match table.
    pub fn with_compatible(mut self, compatible: Vec<String>) -> Self {
        self.compatible = compatible;
        self
    }

    /// Per-device endpoint limit.
    pub fn max_resources(&self) -> usize {
        self.max_resources
    }
}

impl PlatformDriver for LedsDriver {
    type Context = DriverContext;

    fn name(&self) -> &str {
        DRIVER_NAME
    }

    fn compatible(&self) -> &[String] {
        &self.compatible
    }

    fn probe(&self, device: &PlatformDevice<'_>) -> Result<DriverContext> {
        info!(device = device.path(), "leds_probe() called");

        let mut context = DriverContext::with_capacity(device.name(), self.max_resources)?;

        for descriptor in device.node().children() {
            match self.registrar.register(&descriptor, &mut context) {
                RegisterOutcome::Registered { .. } => {}
                RegisterOutcome::Skipped { reason, error } => {
                    context.record_skip(descriptor.node_name(), reason, error);
                }
                RegisterOutcome::CapacityReached => {
                    debug!(
                        device = device.path(),
                        "Maximum of {} LEDs reached",
                        context.capacity()
                    );
                    break;
                }
            }
        }

        if context.is_empty() {
            warn!(device = device.path(), "No LEDs registered");
        }
        info!(
            device = device.path(),
            skipped = context.skipped().len(),
            "Registered {} LEDs",
            context.len()
        );

        Ok(context)
    }

    fn remove(&self, context: Option<DriverContext>) {
        let Some(context) = context else {
            error!("{}", LedError::NullContext);
            return;
        };

        info!(device = context.device_name(), "leds_remove() called");
        info!("Removing {} LEDs", context.len());
        let released = context.teardown();
        debug!("Released {} LEDs", released);
    }
}
