use anyhow::{anyhow, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::pipeline::{FrameOutcome, PipelineConfig, PulsePipeline};
use crate::decoder::{spawn_capture_thread, FrameData, FrameSource};
use crate::illumination::{Illumination, TorchStatus};
use crate::renderer::Presenter;
use crate::shared::constants;
use crate::sync::MasterClock;

/// How long the consumer waits for a frame before checking the deadline itself
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Totals reported when a session ends
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub frames_received: u64,
    pub frames_processed: u64,
    pub beats: u64,
    pub rates: Vec<f64>,
    pub discarded_windows: u64,
    #[serde(serialize_with = "as_secs")]
    pub elapsed: Duration,
}

impl SessionStats {
    pub fn last_rate(&self) -> Option<f64> {
        self.rates.last().copied()
    }
}

fn as_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// One measurement run: a capture thread feeding the pipeline, results
/// pushed to a presenter, torch held on for the duration.
pub struct Session<'a> {
    config: PipelineConfig,
    torch: &'a mut dyn Illumination,
    presenter: &'a mut dyn Presenter,
    running: Arc<AtomicBool>,
    torch_status: TorchStatus,
    stats: SessionStats,
}

impl<'a> Session<'a> {
    pub fn new(
        config: PipelineConfig,
        torch: &'a mut dyn Illumination,
        presenter: &'a mut dyn Presenter,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            torch,
            presenter,
            running,
            torch_status: TorchStatus::Unsupported,
            stats: SessionStats::default(),
        }
    }

    /// Drive `source` until it ends, the presenter asks to quit, or the
    /// running flag is cleared.
    pub fn run<S: FrameSource>(mut self, source: S) -> Result<SessionStats> {
        crate::utils::logger::info(&format!("Session started: {}", source.describe()));
        let clock = MasterClock::new();

        let native_fps = source.native_fps();
        if native_fps >= 1.0 {
            self.config.native_fps = native_fps.round() as u32;
        }
        let mut pipeline = PulsePipeline::new(self.config);

        let (tx, rx) = crossbeam_channel::bounded(constants::CAPTURE_QUEUE_DEPTH);
        let capture = spawn_capture_thread(source, tx, self.running.clone());

        self.request_torch();
        let run_result = self.consume(&mut pipeline, &rx);

        // Teardown runs whatever the consumer returned
        self.running.store(false, Ordering::SeqCst);
        drop(rx);
        let capture_result = capture
            .join()
            .map_err(|_| anyhow!("Capture thread panicked"))
            .and_then(|r| r);

        if let TorchStatus::Failed(reason) = self.torch.set_torch(false) {
            crate::utils::logger::error(&format!("Failed to turn torch off: {}", reason));
        }

        self.stats.frames_received = pipeline.frames_seen();
        self.stats.elapsed = clock.elapsed();
        let finish_result = self.presenter.finish(&self.stats);

        run_result?;
        let frames_sent = capture_result?;
        finish_result?;

        crate::utils::logger::info(&format!(
            "Session finished: {} frames captured, {} processed, {} beats, {} rates",
            frames_sent,
            self.stats.frames_processed,
            self.stats.beats,
            self.stats.rates.len()
        ));
        Ok(self.stats)
    }

    fn consume(&mut self, pipeline: &mut PulsePipeline, rx: &Receiver<FrameData>) -> Result<()> {
        // Source timestamp of the last frame and when it arrived
        let mut last_frame: Option<(Duration, Instant)> = None;

        while self.running.load(Ordering::SeqCst) {
            if self.presenter.should_quit()? {
                crate::utils::logger::debug("Presenter requested quit");
                break;
            }

            match rx.recv_timeout(IDLE_POLL_INTERVAL) {
                Ok(frame) => {
                    last_frame = Some((frame.timestamp, Instant::now()));
                    if let FrameOutcome::Processed(update) = pipeline.on_frame(Some(&frame), frame.timestamp) {
                        self.stats.frames_processed += 1;
                        if update.beat() {
                            self.stats.beats += 1;
                        }
                        if let Some(rate) = update.rate {
                            self.stats.rates.push(rate);
                        }
                        if update.discarded {
                            self.stats.discarded_windows += 1;
                        }
                        if matches!(self.torch_status, TorchStatus::Failed(_)) {
                            self.request_torch();
                        }
                        self.presenter.present(&update)?;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    // Stalled source: the window still has to close on time
                    if let Some((timestamp, arrived)) = last_frame {
                        let now = timestamp + arrived.elapsed();
                        if let Some(rate) = pipeline.tick(now) {
                            self.stats.rates.push(rate);
                            self.presenter.present_rate(now, rate, pipeline.label())?;
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        Ok(())
    }

    fn request_torch(&mut self) {
        self.torch_status = self.torch.set_torch(true);
        match &self.torch_status {
            TorchStatus::Applied => crate::utils::logger::debug(&format!("Torch on: {}", self.torch.describe())),
            TorchStatus::Unsupported => crate::utils::logger::debug("Torch unsupported, relying on ambient light"),
            TorchStatus::Failed(reason) => crate::utils::logger::error(&format!("Failed to turn torch on: {}", reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::beat_detector::RatePolicy;
    use crate::core::pipeline::{PresentationUpdate, RateLabel};
    use crate::decoder::SyntheticPulse;
    use crate::illumination::torch::NoTorch;

    #[derive(Default)]
    struct RecordingPresenter {
        updates: Vec<PresentationUpdate>,
        finished: Option<SessionStats>,
        quit_after: Option<usize>,
    }

    impl Presenter for RecordingPresenter {
        fn present(&mut self, update: &PresentationUpdate) -> Result<()> {
            self.updates.push(update.clone());
            Ok(())
        }

        fn present_rate(&mut self, _at: Duration, _rate: f64, _label: RateLabel) -> Result<()> {
            Ok(())
        }

        fn should_quit(&mut self) -> Result<bool> {
            Ok(self.quit_after.is_some_and(|n| self.updates.len() >= n))
        }

        fn finish(&mut self, stats: &SessionStats) -> Result<()> {
            self.finished = Some(stats.clone());
            Ok(())
        }
    }

    /// Torch that fails on the first request and works afterwards
    struct FlakyTorch {
        requests: Vec<bool>,
    }

    impl Illumination for FlakyTorch {
        fn set_torch(&mut self, on: bool) -> TorchStatus {
            self.requests.push(on);
            if self.requests.len() == 1 {
                TorchStatus::Failed("busy".to_string())
            } else {
                TorchStatus::Applied
            }
        }

        fn describe(&self) -> String {
            "flaky".to_string()
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            native_fps: 30,
            target_fps: 30,
            capacity: 125,
            window: Duration::from_secs(10),
            policy: RatePolicy::PerWindow,
            brightness_threshold: constants::CONTACT_BRIGHTNESS_THRESHOLD,
            volatility_threshold: constants::CONTACT_VOLATILITY_THRESHOLD,
        }
    }

    #[test]
    fn test_synthetic_session_reports_plausible_rates() {
        let source = SyntheticPulse::new(72.0, 30.0, Duration::from_secs(25)).with_lead_in(Duration::from_secs(1));
        let mut presenter = RecordingPresenter::default();
        let mut torch = NoTorch;

        let stats = Session::new(config(), &mut torch, &mut presenter, Arc::new(AtomicBool::new(true)))
            .run(source)
            .unwrap();

        assert_eq!(stats.frames_received, 780);
        assert_eq!(stats.frames_processed, 780);
        assert!(!stats.rates.is_empty());
        for rate in &stats.rates {
            assert!((60.0..=84.0).contains(rate), "rate {} out of range", rate);
        }
        assert!(stats.beats > 20);

        // Lead-in frames never have contact
        assert!(presenter.updates[..30].iter().all(|u| !u.contact));
        assert_eq!(presenter.finished, Some(stats));
    }

    #[test]
    fn test_presenter_quit_stops_session() {
        let source = SyntheticPulse::new(72.0, 30.0, Duration::from_secs(600));
        let mut presenter = RecordingPresenter {
            quit_after: Some(10),
            ..RecordingPresenter::default()
        };
        let mut torch = NoTorch;

        let stats = Session::new(config(), &mut torch, &mut presenter, Arc::new(AtomicBool::new(true)))
            .run(source)
            .unwrap();

        assert_eq!(stats.frames_processed, 10);
        assert!(presenter.finished.is_some());
    }

    #[test]
    fn test_decimation_halves_processed_frames() {
        let mut cfg = config();
        cfg.target_fps = 15;
        let source = SyntheticPulse::new(72.0, 30.0, Duration::from_secs(2));
        let mut presenter = RecordingPresenter::default();
        let mut torch = NoTorch;

        let stats = Session::new(cfg, &mut torch, &mut presenter, Arc::new(AtomicBool::new(true)))
            .run(source)
            .unwrap();

        assert_eq!(stats.frames_received, 60);
        assert_eq!(stats.frames_processed, 30);
    }

    #[test]
    fn test_failed_torch_is_retried_then_turned_off() {
        let source = SyntheticPulse::new(72.0, 30.0, Duration::from_secs(1));
        let mut presenter = RecordingPresenter::default();
        let mut torch = FlakyTorch { requests: Vec::new() };

        Session::new(config(), &mut torch, &mut presenter, Arc::new(AtomicBool::new(true)))
            .run(source)
            .unwrap();

        // Failed at start, retried once on the first processed frame, off at teardown
        assert_eq!(torch.requests, vec![true, true, false]);
    }
}
