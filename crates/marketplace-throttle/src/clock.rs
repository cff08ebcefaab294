//! Time sources for window accounting.
//!
//! [`SystemClock`] is used in production. [`ManualClock`] (tests, or the
//! `test-helpers` feature) lets callers step time explicitly.
use std::fmt::Debug;
use std::time::Instant;

/// Port for obtaining the current instant.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
///
/// Clones share the same underlying instant.
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: std::sync::Arc<std::sync::Mutex<Instant>>,
}

#[cfg(any(test, feature = "test-helpers"))]
impl ManualClock {
    pub fn new(start: Instant) -> Self {
        Self {
            current: std::sync::Arc::new(std::sync::Mutex::new(start)),
        }
    }

    pub fn advance(&self, duration: std::time::Duration) {
        let mut current = self
            .current
            .lock()
            .expect("ManualClock mutex poisoned by a panicking test thread");
        *current += duration;
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self
            .current
            .lock()
            .expect("ManualClock mutex poisoned by a panicking test thread")
    }
}
