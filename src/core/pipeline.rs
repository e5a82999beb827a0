use std::fmt;
use std::time::Duration;

use super::beat_detector::{BeatDetector, DetectorConfig, RatePolicy};
use super::extractor;
use super::frame::Frame;
use super::signal_buffer::signal_capacity;
use crate::analyzer::SkinContactGate;
use crate::renderer::waveform;
use crate::shared::constants;
use crate::utils::config::PulserConfig;
use crate::utils::logger;

/// Counter-based frame decimation: keeps every `native / target`th frame
#[derive(Debug, Clone)]
pub struct Decimator {
    ratio: u64,
    frame_index: u64,
}

impl Decimator {
    pub fn new(native_fps: u32, target_fps: u32) -> Self {
        let ratio = (native_fps / target_fps.max(1)).max(1) as u64;
        Self { ratio, frame_index: 0 }
    }

    /// Count one arriving frame and say whether to process it
    pub fn admit(&mut self) -> bool {
        self.frame_index += 1;
        self.frame_index % self.ratio == 0
    }

    pub fn ratio(&self) -> u64 {
        self.ratio
    }

    pub fn frames_seen(&self) -> u64 {
        self.frame_index
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub native_fps: u32,
    pub target_fps: u32,
    pub capacity: usize,
    pub window: Duration,
    pub policy: RatePolicy,
    pub brightness_threshold: f64,
    pub volatility_threshold: f64,
}

impl From<&PulserConfig> for PipelineConfig {
    fn from(config: &PulserConfig) -> Self {
        Self {
            native_fps: config.camera_fps,
            target_fps: config.target_fps,
            capacity: signal_capacity(config.viewport_width, config.line_size),
            window: config.measurement_window(),
            policy: config.rate_policy,
            brightness_threshold: config.contact_brightness_threshold,
            volatility_threshold: config.contact_volatility_threshold,
        }
    }
}

/// Text shown in place of the heart rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLabel {
    /// No finger on the lens
    Idle,
    /// Window open, nothing reported yet
    Measuring,
    Bpm(u32),
}

impl fmt::Display for RateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLabel::Idle => f.write_str(constants::NO_CONTACT_LABEL),
            RateLabel::Measuring => f.write_str(constants::MEASURING_PLACEHOLDER),
            RateLabel::Bpm(bpm) => write!(f, "{}", bpm),
        }
    }
}

/// Everything the presentation side needs after one processed frame
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationUpdate {
    pub timestamp: Duration,
    pub brightness: f64,
    pub contact: bool,
    /// Current signal window, oldest first
    pub waveform: Vec<f64>,
    pub minimum: f64,
    pub maximum: f64,
    /// Heart pulse factor, set on frames that carried a beat
    pub heart_scale: Option<f64>,
    /// Set when a measurement window expired on this frame
    pub rate: Option<f64>,
    pub label: RateLabel,
    pub discarded: bool,
    pub beats_in_window: u32,
    pub remaining: Option<Duration>,
}

impl PresentationUpdate {
    pub fn beat(&self) -> bool {
        self.heart_scale.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Dropped by decimation
    Skipped,
    Processed(PresentationUpdate),
}

/// Extractor -> gate -> detector, driven one frame at a time
pub struct PulsePipeline {
    decimator: Decimator,
    gate: SkinContactGate,
    detector: BeatDetector,
    last_rate: Option<f64>,
}

impl PulsePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let decimator = Decimator::new(config.native_fps, config.target_fps);
        logger::debug(&format!(
            "Processing 1 of every {} frames at {} fps",
            decimator.ratio(),
            config.native_fps
        ));
        Self {
            decimator,
            gate: SkinContactGate::new(config.brightness_threshold, config.volatility_threshold),
            detector: BeatDetector::new(DetectorConfig {
                capacity: config.capacity,
                window: config.window,
                policy: config.policy,
            }),
            last_rate: None,
        }
    }

    /// Entry point for every captured frame, whatever its source
    pub fn on_frame<F: Frame + ?Sized>(&mut self, frame: Option<&F>, timestamp: Duration) -> FrameOutcome {
        if !self.decimator.admit() {
            return FrameOutcome::Skipped;
        }

        let brightness = extractor::extract_brightness(frame);
        FrameOutcome::Processed(self.on_sample(brightness, timestamp))
    }

    /// Feed an already extracted brightness sample
    pub fn on_sample(&mut self, brightness: f64, timestamp: Duration) -> PresentationUpdate {
        let contact = self.gate.assess(brightness);
        let output = self.detector.process(brightness, timestamp, contact);
        self.remember_rate(output.rate);

        let signal = self.detector.signal();
        let minimum = signal.current_minimum();
        let maximum = signal.current_maximum();
        let heart_scale = output
            .beat
            .then(|| waveform::heart_scale(brightness, minimum, maximum));

        PresentationUpdate {
            timestamp,
            brightness,
            contact,
            waveform: signal.to_vec(),
            minimum,
            maximum,
            heart_scale,
            rate: output.rate,
            label: self.label(),
            discarded: output.discarded,
            beats_in_window: self.detector.beat_count(),
            remaining: self.detector.remaining(timestamp),
        }
    }

    /// Check the measurement deadline without a new frame
    pub fn tick(&mut self, now: Duration) -> Option<f64> {
        let rate = self.detector.tick(now);
        self.remember_rate(rate);
        rate
    }

    // A rate is shown only while its window is still being renewed
    fn remember_rate(&mut self, rate: Option<f64>) {
        if rate.is_some() {
            self.last_rate = rate;
        }
        if !self.detector.is_measuring() {
            self.last_rate = None;
        }
    }

    pub fn label(&self) -> RateLabel {
        match self.last_rate {
            Some(rate) => RateLabel::Bpm(rate.round().max(0.0) as u32),
            None if self.detector.is_measuring() => RateLabel::Measuring,
            None => RateLabel::Idle,
        }
    }

    pub fn frames_seen(&self) -> u64 {
        self.decimator.frames_seen()
    }
}
