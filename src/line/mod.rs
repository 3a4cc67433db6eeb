//! Single-line digital output capability.
//!
//! The driver never touches hardware directly. It asks a [`LineController`]
//! for exclusive ownership of a line and gets back a [`LineHandle`]; dropping
//! the handle releases the line. Handles speak in logical levels: an
//! active-low line reads `true` while it is physically driven low.
//!
//! [`sim::SimulatedLines`] is an in-memory controller for tests and the CLI.

pub mod sim;

use bitflags::bitflags;
use std::fmt;
use thiserror::Error;

use crate::tree::PropertyError;

bitflags! {
    /// Flags carried in the second cell of a line reference.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LineFlags: u32 {
        /// Line is asserted when physically low
        const ACTIVE_LOW = 1 << 0;
    }
}

/// Reference to one physical line, resolved from a `gpios` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRef {
    /// Line number on the controller
    pub offset: u32,
    /// Polarity and other line flags
    pub flags: LineFlags,
}

impl LineRef {
    /// An active-high line.
    pub fn new(offset: u32) -> Self {
        Self {
            offset,
            flags: LineFlags::empty(),
        }
    }

    /// Mark this line active-low.
    pub fn active_low(mut self) -> Self {
        self.flags |= LineFlags::ACTIVE_LOW;
        self
    }

    /// Build from `[offset]` or `[offset, flags]` cells.
    ///
    /// Unknown flag bits are ignored.
    pub fn from_cells(cells: &[u32]) -> Result<Self, PropertyError> {
        let offset = *cells.first().ok_or(PropertyError::Empty)?;
        let flags = cells
            .get(1)
            .map(|bits| LineFlags::from_bits_truncate(*bits))
            .unwrap_or_default();
        Ok(Self { offset, flags })
    }

    /// Whether the line is asserted when physically low.
    pub fn is_active_low(&self) -> bool {
        self.flags.contains(LineFlags::ACTIVE_LOW)
    }

    /// Physical level that represents the logical `active` state.
    pub fn physical_level(&self, active: bool) -> bool {
        active != self.is_active_low()
    }
}

impl fmt::Display for LineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpio{}", self.offset)?;
        if self.is_active_low() {
            write!(f, " (active-low)")?;
        }
        Ok(())
    }
}

/// Errors acquiring a line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    /// Line number does not exist on this controller
    #[error("gpio{offset} does not exist")]
    NotFound { offset: u32 },

    /// Line is already owned by another consumer
    #[error("gpio{offset} is busy (owned by '{owner}')")]
    Busy { offset: u32, owner: String },

    /// Controller-specific failure
    #[error("gpio{offset}: {message}")]
    Controller { offset: u32, message: String },
}

/// Grants exclusive ownership of output lines.
pub trait LineController: Send + Sync {
    /// Acquire `line` for `consumer`, configured as an output driven inactive.
    ///
    /// Fails with [`LineError::Busy`] if any other handle owns the line.
    fn request_output(
        &self,
        line: LineRef,
        consumer: &str,
    ) -> Result<Box<dyn LineHandle>, LineError>;
}

/// Exclusive ownership of one output line. Dropping the handle releases it.
pub trait LineHandle: Send + fmt::Debug {
    /// The line this handle owns.
    fn line(&self) -> LineRef;

    /// Drive the line to its logical active (`true`) or inactive state.
    fn set_active(&mut self, active: bool);

    /// Sample the current logical state.
    fn is_active(&self) -> bool;
}
