//! In-memory line controller.
//!
//! Simulates a bank of output lines with ownership tracking, so bring-up and
//! teardown can be exercised without hardware. Cloning a [`SimulatedLines`]
//! shares the same bank; tests keep a clone to observe levels and counters
//! after handing the controller to the driver.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::{LineController, LineError, LineHandle, LineRef};

#[derive(Debug, Default)]
struct SimLine {
    /// Physical level
    high: bool,
    owner: Option<String>,
}

#[derive(Debug)]
struct SimInner {
    lines: Mutex<Vec<SimLine>>,
    requests: AtomicUsize,
    releases: AtomicUsize,
}

/// Simulated bank of output lines.
#[derive(Clone, Debug)]
pub struct SimulatedLines {
    inner: Arc<SimInner>,
}

impl SimulatedLines {
    /// Create a bank of `count` lines, all low and unowned.
    pub fn new(count: u32) -> Self {
        let lines = (0..count).map(|_| SimLine::default()).collect();
        Self {
            inner: Arc::new(SimInner {
                lines: Mutex::new(lines),
                requests: AtomicUsize::new(0),
                releases: AtomicUsize::new(0),
            }),
        }
    }

    /// Number of lines in the bank.
    pub fn len(&self) -> u32 {
        u32::try_from(self.inner.lines.lock().len()).unwrap_or(u32::MAX)
    }

    /// Whether the bank has no lines.
    pub fn is_empty(&self) -> bool {
        self.inner.lines.lock().is_empty()
    }

    /// Physical level of a line, `None` if it does not exist.
    pub fn is_high(&self, offset: u32) -> Option<bool> {
        self.inner
            .lines
            .lock()
            .get(offset as usize)
            .map(|line| line.high)
    }

    /// Consumer currently owning a line.
    pub fn owner(&self, offset: u32) -> Option<String> {
        self.inner
            .lines
            .lock()
            .get(offset as usize)
            .and_then(|line| line.owner.clone())
    }

    /// Offsets of all currently owned lines.
    pub fn owned_lines(&self) -> Vec<u32> {
        self.inner
            .lines
            .lock()
            .iter()
            .enumerate()
            .filter(|(_, line)| line.owner.is_some())
            .map(|(i, _)| i as u32)
            .collect()
    }

    /// Total successful acquisitions.
    pub fn requested(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    /// Total releases.
    pub fn released(&self) -> usize {
        self.inner.releases.load(Ordering::SeqCst)
    }
}

impl LineController for SimulatedLines {
    fn request_output(
        &self,
        line: LineRef,
        consumer: &str,
    ) -> Result<Box<dyn LineHandle>, LineError> {
        let mut lines = self.inner.lines.lock();
        let slot = lines
            .get_mut(line.offset as usize)
            .ok_or(LineError::NotFound {
                offset: line.offset,
            })?;

        if let Some(owner) = &slot.owner {
            return Err(LineError::Busy {
                offset: line.offset,
                owner: owner.clone(),
            });
        }

        slot.owner = Some(consumer.to_string());
        slot.high = line.physical_level(false);
        self.inner.requests.fetch_add(1, Ordering::SeqCst);

        debug!(line = %line, consumer, "Simulated line acquired");

        Ok(Box::new(SimLineHandle {
            inner: Arc::clone(&self.inner),
            line,
        }))
    }
}

struct SimLineHandle {
    inner: Arc<SimInner>,
    line: LineRef,
}

impl LineHandle for SimLineHandle {
    fn line(&self) -> LineRef {
        self.line
    }

    fn set_active(&mut self, active: bool) {
        if let Some(slot) = self.inner.lines.lock().get_mut(self.line.offset as usize) {
            slot.high = self.line.physical_level(active);
        }
    }

    fn is_active(&self) -> bool {
        self.inner
            .lines
            .lock()
            .get(self.line.offset as usize)
            .map(|slot| slot.high != self.line.is_active_low())
            .unwrap_or(false)
    }
}

impl Drop for SimLineHandle {
    fn drop(&mut self) {
        if let Some(slot) = self.inner.lines.lock().get_mut(self.line.offset as usize) {
            slot.owner = None;
        }
        self.inner.releases.fetch_add(1, Ordering::SeqCst);
        debug!(line = %self.line, "Simulated line released");
    }
}

impl fmt::Debug for SimLineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimLineHandle")
            .field("line", &self.line)
            .finish()
    }
}
