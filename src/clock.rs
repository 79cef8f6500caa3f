//! Wall-clock source used for segment timing and hour rotation

use chrono::{DateTime, Utc};

/// Source of the current UTC time
pub trait Clock: Send {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
