//! Error types for LED driver operations.
//!
//! [`LedError`] covers every failure the driver can observe, from malformed
//! configuration-tree children to a bad byte written to an endpoint. Most of
//! these never reach the caller of `probe`: per-child failures are logged and
//! the child is skipped (see [`crate::registrar`]).

use thiserror::Error;

use crate::line::LineError;
use crate::registry::RegistryError;
use crate::tree::PropertyError;

/// Result type alias for LED driver operations.
pub type Result<T> = std::result::Result<T, LedError>;

/// Errors that can occur while bringing up, using, or tearing down LEDs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedError {
    /// A child node is missing a property or the property is malformed
    #[error("Configuration error on node '{node}', property '{property}': {source}")]
    Configuration {
        node: String,
        property: &'static str,
        #[source]
        source: PropertyError,
    },

    /// The label is not in the static resource table
    #[error("Unknown LED label '{label}'")]
    UnknownResource { label: String },

    /// The endpoint registration service refused the name
    #[error("Failed to register endpoint '{name}': {source}")]
    Registration {
        name: String,
        #[source]
        source: RegistryError,
    },

    /// The line reference could not be resolved or the line could not be acquired
    #[error("Line unavailable for '{name}': {reason}")]
    LineUnavailable { name: String, reason: LineFailure },

    /// A write payload whose first byte is neither `'0'` nor `'1'`
    #[error("Invalid argument written to '{name}': {found}")]
    InvalidArgument { name: String, found: InvalidByte },

    /// Teardown invoked without a driver context
    #[error("Driver data is null")]
    NullContext,

    /// The driver context storage could not be allocated
    #[error("Out of memory allocating driver context for {capacity} resources")]
    OutOfMemory { capacity: usize },
}

/// Why a line could not be attached to an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineFailure {
    /// The `gpios` property is missing or malformed
    Resolution(PropertyError),
    /// The line controller refused the request
    Acquisition(LineError),
}

impl std::fmt::Display for LineFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolution(err) => write!(f, "failed to get gpio from tree: {}", err),
            Self::Acquisition(err) => write!(f, "failed to request gpio: {}", err),
        }
    }
}

/// The offending first byte of a rejected write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidByte {
    /// Nothing was written
    Empty,
    /// Any byte other than `'0'` or `'1'`
    Byte(u8),
}

impl std::fmt::Display for InvalidByte {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty write"),
            Self::Byte(b) => write!(f, "byte 0x{:02x} (expected '0' or '1')", b),
        }
    }
}

impl LedError {
    /// Check if this is a malformed write payload.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    /// Check if the line could not be resolved or acquired.
    pub fn is_line_unavailable(&self) -> bool {
        matches!(self, Self::LineUnavailable { .. })
    }
}

impl From<LedError> for std::io::Error {
    fn from(err: LedError) -> Self {
        let kind = match &err {
            LedError::InvalidArgument { .. } => std::io::ErrorKind::InvalidInput,
            LedError::OutOfMemory { .. } => std::io::ErrorKind::OutOfMemory,
            _ => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}
