//! Time primitives for the pipeline
//!
//! Capture timestamps and engine tick time live in one shared clock domain:
//! microseconds since the pipeline epoch. The perception worker and the
//! engine loop each hold a clone of the same [`Clock`], so interpolation can
//! relate a tick instant to sample timestamps directly.

use std::ops::{Add, Sub};
use std::time::{Duration, Instant};

/// A point in pipeline time, in microseconds since the pipeline epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    #[inline]
    pub fn from_micros(micros: i64) -> Self {
        Timestamp(micros)
    }

    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        Timestamp(millis * 1000)
    }

    #[inline]
    pub fn as_micros(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn as_millis(self) -> i64 {
        self.0 / 1000
    }

    #[inline]
    pub fn as_secs_f32(self) -> f32 {
        self.0 as f32 / 1_000_000.0
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_add(duration.as_micros() as i64))
    }

    #[inline]
    pub fn saturating_sub(self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_sub(duration.as_micros() as i64))
    }

    /// Elapsed time since `earlier`, zero if `earlier` is in the future.
    #[inline]
    pub fn since(self, earlier: Timestamp) -> Duration {
        let diff = self.0 - earlier.0;
        if diff >= 0 {
            Duration::from_micros(diff as u64)
        } else {
            Duration::ZERO
        }
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        Timestamp(self.0 + rhs.as_micros() as i64)
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn sub(self, rhs: Duration) -> Self::Output {
        Timestamp(self.0 - rhs.as_micros() as i64)
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Timestamp) -> Self::Output {
        self.since(rhs)
    }
}

impl std::fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t({:.3}ms)", self.0 as f64 / 1000.0)
    }
}

/// Monotonic pipeline clock.
///
/// Cheap to clone; every clone shares the epoch fixed at construction, so
/// timestamps read on different threads are directly comparable.
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    epoch: Instant,
}

impl Clock {
    /// Create a clock whose epoch is the current instant.
    pub fn new() -> Self {
        Clock {
            epoch: Instant::now(),
        }
    }

    /// Current pipeline time.
    #[inline]
    pub fn now(&self) -> Timestamp {
        Timestamp(self.epoch.elapsed().as_micros() as i64)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_arithmetic() {
        let t = Timestamp::from_millis(100);
        let later = t + Duration::from_millis(50);

        assert_eq!(later.as_millis(), 150);
        assert_eq!(later - t, Duration::from_millis(50));
    }

    #[test]
    fn test_since_never_negative() {
        let t1 = Timestamp::from_millis(100);
        let t2 = Timestamp::from_millis(200);

        assert_eq!(t1.since(t2), Duration::ZERO);
        assert_eq!(t2.since(t1), Duration::from_millis(100));
    }

    #[test]
    fn test_clock_monotonic() {
        let clock = Clock::new();

        let t1 = clock.now();
        std::thread::sleep(Duration::from_millis(5));
        let t2 = clock.now();

        assert!(t2 > t1);
    }

    #[test]
    fn test_clock_clones_share_epoch() {
        let clock = Clock::new();
        let other = clock;

        let t1 = clock.now();
        let t2 = other.now();

        // Two reads back to back differ by far less than a millisecond.
        assert!(t2.since(t1) < Duration::from_millis(1));
    }
}
