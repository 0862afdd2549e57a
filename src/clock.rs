// Two clock seams exist on purpose: window boundaries are anchored to a
// reference clock, while relative upload phrases ("3일 전") resolve against
// the wall clock. Keeping them separate lets a caller pin the reference to a
// fixed instant for reproducible output without bending the parser's "now".
use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the instant it was constructed with. Used in tests and for
/// historically-anchored demo windows.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
