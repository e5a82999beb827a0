use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::signal_buffer::SignalBuffer;
use crate::shared::constants;

/// Position of the latest sample relative to the window midline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossingState {
    Idle,
    BelowMidline,
    AboveMidline,
}

/// What a window expiry reports.
///
/// `PerWindow` restarts the count for every window. `Cumulative` keeps
/// counting from the moment skin contact began and scales that total by the
/// window length on every expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RatePolicy {
    #[default]
    PerWindow,
    Cumulative,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MeasurementWindow {
    deadline: Duration,
    beats: u32,
}

impl MeasurementWindow {
    fn open(at: Duration, length: Duration) -> Self {
        Self {
            deadline: at + length,
            beats: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    pub capacity: usize,
    pub window: Duration,
    pub policy: RatePolicy,
}

/// Result of feeding one sample
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DetectorOutput {
    /// A falling midline crossing happened on this sample
    pub beat: bool,
    /// Beats per minute, set when a measurement window expired
    pub rate: Option<f64>,
    /// An open window was thrown away because skin contact was lost
    pub discarded: bool,
}

/// Midline-crossing beat detector with a deadline-driven measurement window.
///
/// Owns the signal window and the measurement window; nothing here performs
/// I/O, so the same state can be driven from a camera, a recording or a test.
pub struct BeatDetector {
    signal: SignalBuffer,
    capacity: usize,
    crossing: CrossingState,
    window: Option<MeasurementWindow>,
    window_length: Duration,
    policy: RatePolicy,
}

impl BeatDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            signal: SignalBuffer::with_capacity(config.capacity),
            capacity: config.capacity,
            crossing: CrossingState::Idle,
            window: None,
            window_length: config.window.max(Duration::from_millis(1)),
            policy: config.policy,
        }
    }

    /// Feed one brightness sample captured at `timestamp`.
    ///
    /// `contact` is the caller's skin-contact verdict for this sample. When it
    /// is false the signal and any open window are dropped without reporting.
    pub fn process(&mut self, value: f64, timestamp: Duration, contact: bool) -> DetectorOutput {
        if !contact {
            let discarded = self.window.is_some();
            if discarded {
                crate::utils::logger::debug(&format!(
                    "Contact lost at {:.3}s, discarding window with {} beats",
                    timestamp.as_secs_f64(),
                    self.beat_count()
                ));
            }
            self.reset();
            return DetectorOutput {
                discarded,
                ..DetectorOutput::default()
            };
        }

        // Expiry is checked before the new sample so a beat landing exactly on
        // the deadline counts toward the next window.
        let rate = self.tick(timestamp);

        self.signal.append(value);
        self.signal.reduce_to_capacity(self.capacity);

        let beat = self.detect_crossing(value);
        if beat {
            self.register_beat(timestamp);
        }

        DetectorOutput {
            beat,
            rate,
            discarded: false,
        }
    }

    /// Check the measurement deadline against `now`, returning a rate on expiry.
    ///
    /// An expired window with beats is renewed back to back; an expired window
    /// without beats closes and the detector waits for the next beat.
    pub fn tick(&mut self, now: Duration) -> Option<f64> {
        let length = self.window_length;
        let policy = self.policy;
        let window = self.window.as_mut()?;
        if now < window.deadline {
            return None;
        }

        if window.beats == 0 {
            crate::utils::logger::debug("Measurement window expired without beats");
            self.window = None;
            return None;
        }

        let rate = beats_per_minute(window.beats, length);

        // Resync instead of replaying missed windows after a long stall
        let next_start = if now >= window.deadline + length {
            now
        } else {
            window.deadline
        };
        window.deadline = next_start + length;
        if policy == RatePolicy::PerWindow {
            window.beats = 0;
        }

        crate::utils::logger::info(&format!("Rate {:.1} BPM at {:.3}s", rate, now.as_secs_f64()));
        Some(rate)
    }

    /// Drop the signal and any measurement in progress
    pub fn reset(&mut self) {
        self.signal.clear();
        self.crossing = CrossingState::Idle;
        self.window = None;
    }

    pub fn signal(&self) -> &SignalBuffer {
        &self.signal
    }

    #[cfg(test)]
    pub fn crossing_state(&self) -> CrossingState {
        self.crossing
    }

    pub fn is_measuring(&self) -> bool {
        self.window.is_some()
    }

    pub fn beat_count(&self) -> u32 {
        self.window.map(|w| w.beats).unwrap_or(0)
    }

    /// Time left before the open window reports, if one is open
    pub fn remaining(&self, now: Duration) -> Option<Duration> {
        self.window.map(|w| w.deadline.saturating_sub(now))
    }

    fn detect_crossing(&mut self, value: f64) -> bool {
        if self.signal.len() < constants::MIN_DETECTION_SAMPLES {
            return false;
        }
        let Some(midline) = self.signal.midline() else {
            return false;
        };

        match self.crossing {
            CrossingState::BelowMidline => {
                if value >= midline {
                    self.crossing = CrossingState::AboveMidline;
                }
                false
            }
            CrossingState::Idle | CrossingState::AboveMidline if value < midline => {
                self.crossing = CrossingState::BelowMidline;
                true
            }
            _ => false,
        }
    }

    fn register_beat(&mut self, timestamp: Duration) {
        let length = self.window_length;
        let window = self.window.get_or_insert_with(|| {
            crate::utils::logger::debug(&format!(
                "Measurement window opened at {:.3}s",
                timestamp.as_secs_f64()
            ));
            MeasurementWindow::open(timestamp, length)
        });
        window.beats += 1;
    }
}

/// `beats * (60 / window_seconds)`
pub fn beats_per_minute(beats: u32, window: Duration) -> f64 {
    let secs = window.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    beats as f64 * (60.0 / secs)
}
