use std::time::{Duration, Instant};

/// Frame pacer for sources that would otherwise run faster than real time
/// (recorded video, synthetic signal).
///
/// Sleeps until the next frame slot; when far behind schedule it resyncs to
/// the current time instead of bursting to catch up.
pub struct VSync {
    frame_duration: Duration,
    next_frame_time: Instant,
}

impl VSync {
    /// Create a pacer for `fps` frames per second
    pub fn new(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 1.0 };
        let frame_duration = Duration::from_secs_f64(1.0 / fps);
        Self {
            frame_duration,
            next_frame_time: Instant::now() + frame_duration,
        }
    }

    /// Block until it is time to emit the next frame
    pub fn wait_for_next_frame(&mut self) {
        let now = Instant::now();

        // More than a few frames behind: start over from now
        if now > self.next_frame_time + self.frame_duration * 3 {
            self.next_frame_time = now + self.frame_duration;
            return;
        }

        if now < self.next_frame_time {
            std::thread::sleep(self.next_frame_time - now);
        }

        self.next_frame_time += self.frame_duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paces_to_frame_duration() {
        let mut vsync = VSync::new(200.0);
        let start = Instant::now();
        for _ in 0..10 {
            vsync.wait_for_next_frame();
        }
        // 10 frames at 5 ms each
        assert!(start.elapsed() >= Duration::from_millis(45));
    }

    #[test]
    fn test_invalid_fps_falls_back() {
        assert_eq!(VSync::new(0.0).frame_duration, Duration::from_secs(1));
        assert_eq!(VSync::new(f64::NAN).frame_duration, Duration::from_secs(1));
    }

    #[test]
    fn test_resyncs_instead_of_bursting() {
        let mut vsync = VSync::new(500.0);
        std::thread::sleep(Duration::from_millis(40));
        // 20 slots were missed; catching up would return all of them at once
        let start = Instant::now();
        for _ in 0..6 {
            vsync.wait_for_next_frame();
        }
        assert!(start.elapsed() >= Duration::from_millis(8));
    }
}
