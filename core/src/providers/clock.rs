//! Time source abstraction.

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Production code uses [`SystemClock`]; tests inject a manual clock so
/// submission and resolution timestamps are deterministic.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
