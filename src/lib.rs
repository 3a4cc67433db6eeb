//! # RGB LED platform driver
//!
//! Brings up one control endpoint per LED described in a configuration tree.
//! Each endpoint owns a digital output line and is published as
//! `/dev/<label>`: writing `'1'` or `'0'` switches the LED, reading yields
//! `"1\n"` or `"0\n"`.
//!
//! ## Crate Structure
//!
//! - **`tree`**: configuration tree nodes, property accessors, TOML loader.
//! - **`line`**: line references, the [`line::LineController`] capability,
//!   and an in-memory controller under `line::sim`.
//! - **`registry`**: endpoint registration service and the
//!   [`registry::Registration`] guard.
//! - **`resource`**: the static label table and mask bits.
//! - **`registrar`**: per-child registration with skip-on-failure.
//! - **`endpoint`**: the per-LED read/write interface.
//! - **`driver`**: [`driver::DriverContext`] and [`driver::LedsDriver`]
//!   (`probe` / `remove`).
//! - **`platform`**: compatible matching and device binding.
//! - **`config`** / **`logging`**: settings and subscriber setup.
//! - **`error`**: [`LedError`].

pub mod config;
pub mod driver;
pub mod endpoint;
pub mod error;
pub mod line;
pub mod logging;
pub mod platform;
pub mod registrar;
pub mod registry;
pub mod resource;
pub mod tree;

pub use driver::{DriverContext, LedsDriver, MAX_RESOURCES};
pub use endpoint::{ControlEndpoint, EndpointFile};
pub use error::{LedError, Result};
pub use platform::{PlatformBus, PlatformDevice, PlatformDriver};
pub use registrar::{RegisterOutcome, SkipReason};
pub use resource::{ResourceKind, ResourceMask};
pub use tree::{ConfigNode, ResourceDescriptor};
