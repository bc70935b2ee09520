//! Ledger clocks.
//!
//! The ledger, not the submitter, assigns revocation entry timestamps.
//! [`ManualClock`] makes revocation timelines reproducible in tests and
//! demos.

use parking_lot::Mutex;
use zkcred_core::{Timestamp, ValidationError};

/// Source of ledger time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time, truncated to whole seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that moves only when told to.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Start at `secs` after the Unix epoch.
    pub fn at_epoch_secs(secs: i64) -> Result<Self, ValidationError> {
        Ok(Self::new(Timestamp::from_epoch_secs(secs)?))
    }

    pub fn set(&self, ts: Timestamp) {
        *self.current.lock() = ts;
    }

    /// Move forward by `secs` and return the new time.
    pub fn advance(&self, secs: i64) -> Result<Timestamp, ValidationError> {
        let mut current = self.current.lock();
        *current = current.plus_secs(secs)?;
        Ok(*current)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.lock()
    }
}
