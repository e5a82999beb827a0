use std::time::{Duration, Instant};

/// Monotonic clock shared by capture and the session.
///
/// Live camera frames are stamped with `elapsed()` so the measurement window
/// runs on wall-clock time.
pub struct MasterClock {
    start: Instant,
}

impl MasterClock {
    /// Create a new master clock starting at time zero
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    /// Time since the clock started
    pub fn elapsed(&self) -> Duration {
        Instant::now().duration_since(self.start)
    }
}

impl Default for MasterClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_is_monotonic() {
        let clock = MasterClock::new();
        let a = clock.elapsed();
        std::thread::sleep(Duration::from_millis(2));
        let b = clock.elapsed();
        assert!(b > a);
    }
}
