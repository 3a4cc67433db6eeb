//! Endpoint registration service.
//!
//! Each live LED is published under `/dev/<label>` with a slot number (the
//! misc-device "minor") handed out by an [`EndpointRegistry`]. The driver
//! holds a [`Registration`] guard per endpoint; dropping the guard
//! deregisters the name, so a registration is released exactly once on every
//! path, including the skip branches of bring-up.
//!
//! [`MiscRegistry`] is an in-memory registry allocating dynamic minors from a
//! bounded pool.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Directory prefix under which endpoints are published.
pub const DEV_PREFIX: &str = "/dev/";

/// Size of the dynamic minor pool of [`MiscRegistry::new`].
pub const DYNAMIC_MINORS: u32 = 64;

/// Errors returned by an [`EndpointRegistry`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Another endpoint already uses this name
    #[error("name '{name}' is already registered")]
    NameInUse { name: String },

    /// Every dynamic minor is taken
    #[error("no free dynamic minor")]
    NoFreeMinor,

    /// Name is empty or contains a path separator
    #[error("invalid endpoint name '{name}'")]
    InvalidName { name: String },
}

/// External service that publishes named control endpoints.
pub trait EndpointRegistry: Send + Sync {
    /// Publish `name` and return its slot id.
    fn register(&self, name: &str) -> Result<u32, RegistryError>;

    /// Withdraw the endpoint with slot id `minor`.
    fn deregister(&self, minor: u32);
}

/// Published endpoint name. Deregisters on drop.
pub struct Registration {
    registry: Arc<dyn EndpointRegistry>,
    name: String,
    minor: u32,
}

impl Registration {
    /// Register `name` with `registry`.
    pub fn acquire(
        registry: &Arc<dyn EndpointRegistry>,
        name: &str,
    ) -> Result<Self, RegistryError> {
        let minor = registry.register(name)?;
        info!("Registered misc device: {}{} (minor {})", DEV_PREFIX, name, minor);
        Ok(Self {
            registry: Arc::clone(registry),
            name: name.to_string(),
            minor,
        })
    }

    /// Slot id assigned by the registry.
    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// Registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Externally visible path, e.g. `/dev/ledred`.
    pub fn path(&self) -> String {
        format!("{}{}", DEV_PREFIX, self.name)
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.deregister(self.minor);
        info!("Deregistered misc device: {}{}", DEV_PREFIX, self.name);
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("minor", &self.minor)
            .finish()
    }
}

#[derive(Debug, Default)]
struct MiscState {
    /// minor -> name
    slots: BTreeMap<u32, String>,
    registrations: usize,
    deregistrations: usize,
}

/// In-memory registry with a bounded pool of dynamic minors.
#[derive(Clone, Debug)]
pub struct MiscRegistry {
    state: Arc<Mutex<MiscState>>,
    capacity: u32,
}

impl Default for MiscRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MiscRegistry {
    /// Registry with [`DYNAMIC_MINORS`] slots.
    pub fn new() -> Self {
        Self::with_capacity(DYNAMIC_MINORS)
    }

    /// Registry with `capacity` slots.
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(MiscState::default())),
            capacity,
        }
    }

    /// Slot id currently assigned to `name`.
    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.state
            .lock()
            .slots
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(minor, _)| *minor)
    }

    /// Names of all published endpoints, ordered by slot id.
    pub fn names(&self) -> Vec<String> {
        self.state.lock().slots.values().cloned().collect()
    }

    /// Number of published endpoints.
    pub fn len(&self) -> usize {
        self.state.lock().slots.len()
    }

    /// Whether nothing is published.
    pub fn is_empty(&self) -> bool {
        self.state.lock().slots.is_empty()
    }

    /// Total successful registrations.
    pub fn registered(&self) -> usize {
        self.state.lock().registrations
    }

    /// Total deregistrations.
    pub fn deregistered(&self) -> usize {
        self.state.lock().deregistrations
    }
}

impl EndpointRegistry for MiscRegistry {
    fn register(&self, name: &str) -> Result<u32, RegistryError> {
        if name.is_empty() || name.contains('/') {
            return Err(RegistryError::InvalidName {
                name: name.to_string(),
            });
        }

        let mut state = self.state.lock();
        if state.slots.values().any(|n| n == name) {
            return Err(RegistryError::NameInUse {
                name: name.to_string(),
            });
        }

        let minor = (0..self.capacity)
            .find(|m| !state.slots.contains_key(m))
            .ok_or(RegistryError::NoFreeMinor)?;

        state.slots.insert(minor, name.to_string());
        state.registrations += 1;
        Ok(minor)
    }

    fn deregister(&self, minor: u32) {
        let mut state = self.state.lock();
        match state.slots.remove(&minor) {
            Some(_) => state.deregistrations += 1,
            None => warn!(minor, "Deregister of unknown minor"),
        }
    }
}
