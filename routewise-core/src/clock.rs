//! Time source abstraction so freshness and retry logic can be tested
//! without wall-clock waits.

use crate::Timestamp;
use chrono::Utc;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Suspends the calling task. Injected into the retry executor so tests
/// can record delays instead of waiting for them.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: std::time::Duration);
}
