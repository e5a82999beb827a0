pub mod display;
pub mod waveform;

pub use display::{DisplayMode, JsonPresenter, PlainPresenter};

use anyhow::Result;
use std::time::Duration;

use crate::core::pipeline::{PresentationUpdate, RateLabel};
use crate::core::session::SessionStats;

/// Receives the results of a running session
pub trait Presenter {
    /// Called for every processed frame
    fn present(&mut self, update: &PresentationUpdate) -> Result<()>;

    /// Called when a window expires while no frames are arriving
    fn present_rate(&mut self, at: Duration, rate: f64, label: RateLabel) -> Result<()>;

    /// Polled between frames; `true` ends the session
    fn should_quit(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn finish(&mut self, stats: &SessionStats) -> Result<()>;
}
