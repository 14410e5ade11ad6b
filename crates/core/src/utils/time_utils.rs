use chrono::{DateTime, Local, TimeZone};

/// Source of "now" for the view-state holders.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Wall clock in the system time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<Local>);

impl FixedClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self(now)
    }

    /// Pins the clock to an epoch-millisecond instant, falling back to the
    /// current time when the instant is out of range.
    pub fn at_millis(instant: i64) -> Self {
        Self(
            Local
                .timestamp_millis_opt(instant)
                .earliest()
                .unwrap_or_else(Local::now),
        )
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// Current instant in epoch milliseconds.
pub fn now_millis() -> i64 {
    Local::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_returns_pinned_instant() {
        let clock = FixedClock::at_millis(1_700_000_000_000);
        assert_eq!(clock.now().timestamp_millis(), 1_700_000_000_000);
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn test_system_clock_tracks_wall_time() {
        let before = now_millis();
        let now = SystemClock.now().timestamp_millis();
        assert!(now >= before);
    }
}
