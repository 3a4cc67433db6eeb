//! Per-LED control endpoint.
//!
//! A [`ControlEndpoint`] is one live LED: its published name, its resource
//! kind, and exclusive ownership of its line. It serves the two wire
//! operations of the `/dev/<label>` node:
//!
//! - **write**: first byte `'1'` turns the LED on, `'0'` turns it off, anything
//!   else is rejected with [`LedError::InvalidArgument`].
//! - **read**: yields `"1\n"` or `"0\n"` once per read cycle.
//!
//! Calls take `&self` and may come from several threads at once. The line
//! handle sits behind a per-endpoint mutex so a write and a concurrent read
//! never interleave on the line.

use parking_lot::Mutex;
use std::fmt;
use std::io;
use tracing::{debug, info};

use crate::error::{InvalidByte, LedError, Result};
use crate::line::{LineHandle, LineRef};
use crate::registry::Registration;
use crate::resource::{ResourceKind, ResourceMask};

/// Size of the read payload: state byte plus newline.
pub const READ_PAYLOAD_LEN: usize = 2;

/// One registered LED.
pub struct ControlEndpoint {
    // Field order is drop order: deregister before releasing the line.
    registration: Registration,
    line: Mutex<Box<dyn LineHandle>>,
    kind: ResourceKind,
}

impl ControlEndpoint {
    pub(crate) fn new(
        kind: ResourceKind,
        registration: Registration,
        line: Box<dyn LineHandle>,
    ) -> Self {
        Self {
            registration,
            line: Mutex::new(line),
            kind,
        }
    }

    /// Endpoint name, equal to the resource label.
    pub fn name(&self) -> &str {
        self.registration.name()
    }

    /// Externally visible path, e.g. `/dev/ledred`.
    pub fn path(&self) -> String {
        self.registration.path()
    }

    /// Slot id assigned by the registration service.
    pub fn minor(&self) -> u32 {
        self.registration.minor()
    }

    /// Resource kind.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Identifying mask bit.
    pub fn mask(&self) -> ResourceMask {
        self.kind.mask()
    }

    /// The owned line.
    pub fn line_ref(&self) -> LineRef {
        self.line.lock().line()
    }

    /// Current logical line state.
    pub fn is_on(&self) -> bool {
        self.line.lock().is_active()
    }

    /// Handle a write of `buf`.
    ///
    /// Only the first byte is inspected. Returns `buf.len()` on success.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        debug!("LED device: {} write called", self.name());

        let active = match buf.first() {
            Some(b'1') => true,
            Some(b'0') => false,
            Some(&other) => return Err(self.invalid(InvalidByte::Byte(other))),
            None => return Err(self.invalid(InvalidByte::Empty)),
        };

        self.line.lock().set_active(active);
        Ok(buf.len())
    }

    /// Handle a read into `buf` at cursor `pos`.
    ///
    /// Delivers the two-byte payload from `*pos` onward and advances `pos`.
    /// Returns `0` once the payload has been fully delivered.
    pub fn read(&self, buf: &mut [u8], pos: &mut u64) -> usize {
        let state = if self.line.lock().is_active() { b'1' } else { b'0' };
        read_from_buffer(buf, pos, &[state, b'\n'])
    }

    /// Open the endpoint with a fresh cursor.
    pub fn open(&self) -> EndpointFile<'_> {
        EndpointFile {
            endpoint: self,
            pos: 0,
        }
    }

    /// Deregister the endpoint and release its line.
    pub(crate) fn release(self) {
        let name = self.name().to_string();
        let Self {
            registration, line, ..
        } = self;
        drop(registration);
        drop(line);
        info!("Released LED '{}'", name);
    }

    fn invalid(&self, found: InvalidByte) -> LedError {
        LedError::InvalidArgument {
            name: self.name().to_string(),
            found,
        }
    }
}

impl fmt::Debug for ControlEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlEndpoint")
            .field("name", &self.name())
            .field("minor", &self.minor())
            .field("kind", &self.kind)
            .finish()
    }
}

/// Copy `from[*pos..]` into `to`, bounded by both lengths.
fn read_from_buffer(to: &mut [u8], pos: &mut u64, from: &[u8]) -> usize {
    let start = match usize::try_from(*pos) {
        Ok(start) if start < from.len() => start,
        _ => return 0,
    };
    let n = to.len().min(from.len() - start);
    to[..n].copy_from_slice(&from[start..start + n]);
    *pos += n as u64;
    n
}

/// An open endpoint with its own read cursor.
///
/// Implements [`io::Read`] and [`io::Write`] so the endpoint can be driven
/// like the device node it models.
pub struct EndpointFile<'a> {
    endpoint: &'a ControlEndpoint,
    pos: u64,
}

impl EndpointFile<'_> {
    /// Current cursor position.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Reset the cursor to start a new read cycle.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// The endpoint this file is open on.
    pub fn endpoint(&self) -> &ControlEndpoint {
        self.endpoint
    }
}

impl io::Read for EndpointFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.endpoint.read(buf, &mut self.pos))
    }
}

impl io::Write for EndpointFile<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.endpoint.write(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
