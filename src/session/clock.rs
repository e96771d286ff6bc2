//! The injectable time source used by the session manager.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds-since-epoch time source, overridable for deterministic
/// tests.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// The production clock, backed by [`SystemTime::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RealClock;

impl Clock for RealClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

/// A manually-advanced clock for deterministic session-lifecycle tests.
#[derive(Debug, Default)]
pub struct FakeClock {
    millis: AtomicU64,
}

impl FakeClock {
    /// Start the clock at `start_millis`.
    #[must_use]
    pub fn new(start_millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(start_millis),
        }
    }

    /// Move the clock forward by `delta_millis`.
    pub fn advance(&self, delta_millis: u64) { self.millis.fetch_add(delta_millis, Ordering::SeqCst); }
}

impl Clock for FakeClock {
    fn now_millis(&self) -> u64 { self.millis.load(Ordering::SeqCst) }
}
