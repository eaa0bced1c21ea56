//! Wall-clock source for event timestamps and TTL checks.

use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(any(test, feature = "test-util"))]
pub use manual::ManualClock;

/// Milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

#[cfg(any(test, feature = "test-util"))]
mod manual {
    use std::{
        sync::atomic::{AtomicU64, Ordering},
        time::Duration,
    };

    use super::Clock;

    /// A clock that only moves when told to. Used to drive TTL behaviour in tests.
    #[derive(Debug, Default)]
    pub struct ManualClock {
        now_ms: AtomicU64,
    }

    impl ManualClock {
        pub fn new(start_ms: u64) -> Self {
            Self {
                now_ms: AtomicU64::new(start_ms),
            }
        }

        pub fn set(&self, now_ms: u64) {
            self.now_ms.store(now_ms, Ordering::SeqCst);
        }

        pub fn advance(&self, by: Duration) {
            self.now_ms
                .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> u64 {
            self.now_ms.load(Ordering::SeqCst)
        }
    }
}
