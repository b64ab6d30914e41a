use std::thread;
use std::time::Duration;

use rand::Rng;

/// Wait between attempts that failed with a transient error.
pub trait Backoff {
    /// Block before the next attempt.
    ///
    /// `attempt` is the 1-based number of the attempt that just failed.
    fn pause(&mut self, attempt: u32);
}

impl<F: FnMut(u32)> Backoff for F {
    fn pause(&mut self, attempt: u32) {
        self(attempt)
    }
}

/// Sleeps the thread for a uniformly random time in `[min, max]`.
///
/// The default is 1 to 3 seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomBackoff {
    min: Duration,
    max: Duration,
}

impl RandomBackoff {
    /// Backoff between `min` and `max`, in whichever order they are given.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            RandomBackoff { min, max }
        } else {
            RandomBackoff { min: max, max: min }
        }
    }

    /// Shortest pause.
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Longest pause.
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draw the next delay.
    pub fn delay(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        let millis = rand::rng().random_range(min..=max);
        Duration::from_millis(millis)
    }
}

impl Default for RandomBackoff {
    fn default() -> Self {
        RandomBackoff::new(Duration::from_secs(1), Duration::from_secs(3))
    }
}

impl Backoff for RandomBackoff {
    fn pause(&mut self, attempt: u32) {
        let delay = self.delay();
        debug!("Backoff {:?} after attempt {}", delay, attempt);
        thread::sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_within_bounds() {
        let b = RandomBackoff::default();
        for _ in 0..200 {
            let d = b.delay();
            assert!(d >= Duration::from_secs(1), "{:?}", d);
            assert!(d <= Duration::from_secs(3), "{:?}", d);
        }
    }

    #[test]
    fn swapped_bounds() {
        let b = RandomBackoff::new(Duration::from_millis(20), Duration::from_millis(10));
        assert_eq!(b.min(), Duration::from_millis(10));
        assert_eq!(b.max(), Duration::from_millis(20));
    }

    #[test]
    fn closure_backoff() {
        let mut seen = vec![];
        {
            let mut b = |attempt: u32| seen.push(attempt);
            b.pause(1);
            b.pause(2);
        }
        assert_eq!(seen, [1, 2]);
    }

    #[test]
    fn zero_backoff_does_not_sleep_long() {
        let mut b = RandomBackoff::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(b.delay(), Duration::ZERO);
        b.pause(1);
    }
}
