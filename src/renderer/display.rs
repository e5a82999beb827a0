use anyhow::Result;
use serde::Serialize;
use std::io::{self, Stdout, Write};
use std::time::Duration;

use super::Presenter;
use crate::core::pipeline::{PresentationUpdate, RateLabel};
use crate::core::session::SessionStats;
use crate::shared::constants;

#[derive(Debug, Copy, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum DisplayMode {
    /// Full-screen monitor with waveform and heart
    Tui,
    /// One line per event
    Plain,
    /// One JSON object per event
    Json,
}

/// Line-oriented output for pipes and terminals without a TUI
pub struct PlainPresenter<W: Write> {
    out: W,
}

impl PlainPresenter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> PlainPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presenter for PlainPresenter<W> {
    fn present(&mut self, update: &PresentationUpdate) -> Result<()> {
        let t = update.timestamp.as_secs_f64();
        if update.discarded {
            writeln!(self.out, "[{:>9.3}s] contact lost, window discarded", t)?;
        }
        if let Some(scale) = update.heart_scale {
            writeln!(
                self.out,
                "[{:>9.3}s] beat #{:<3} scale {:.2}",
                t, update.beats_in_window, scale
            )?;
        }
        if let Some(rate) = update.rate {
            writeln!(self.out, "[{:>9.3}s] rate {} BPM ({:.1})", t, update.label, rate)?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn present_rate(&mut self, at: Duration, rate: f64, label: RateLabel) -> Result<()> {
        writeln!(self.out, "[{:>9.3}s] rate {} BPM ({:.1})", at.as_secs_f64(), label, rate)?;
        self.out.flush()?;
        Ok(())
    }

    fn finish(&mut self, stats: &SessionStats) -> Result<()> {
        let last = stats
            .last_rate()
            .map(|r| format!("{:.0} BPM", r))
            .unwrap_or_else(|| constants::NO_CONTACT_LABEL.to_string());
        writeln!(
            self.out,
            "{} frames ({} processed) in {:.1}s, {} beats, {} rates, {} discarded, last {}",
            stats.frames_received,
            stats.frames_processed,
            stats.elapsed.as_secs_f64(),
            stats.beats,
            stats.rates.len(),
            stats.discarded_windows,
            last
        )?;
        self.out.flush()?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
enum Reading<'a> {
    Beat {
        t: f64,
        brightness: f64,
        heart_scale: f64,
        beats_in_window: u32,
    },
    Rate {
        t: f64,
        bpm: f64,
        label: String,
    },
    Discarded {
        t: f64,
    },
    Summary(&'a SessionStats),
}

/// Newline-delimited JSON, one object per beat, rate, discarded window and
/// a final summary
pub struct JsonPresenter<W: Write> {
    out: W,
}

impl JsonPresenter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, reading: &Reading<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.out, reading)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write> Presenter for JsonPresenter<W> {
    fn present(&mut self, update: &PresentationUpdate) -> Result<()> {
        let t = update.timestamp.as_secs_f64();
        if update.discarded {
            self.emit(&Reading::Discarded { t })?;
        }
        if let Some(heart_scale) = update.heart_scale {
            self.emit(&Reading::Beat {
                t,
                brightness: update.brightness,
                heart_scale,
                beats_in_window: update.beats_in_window,
            })?;
        }
        if let Some(bpm) = update.rate {
            self.emit(&Reading::Rate {
                t,
                bpm,
                label: update.label.to_string(),
            })?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn present_rate(&mut self, at: Duration, rate: f64, label: RateLabel) -> Result<()> {
        self.emit(&Reading::Rate {
            t: at.as_secs_f64(),
            bpm: rate,
            label: label.to_string(),
        })?;
        self.out.flush()?;
        Ok(())
    }

    fn finish(&mut self, stats: &SessionStats) -> Result<()> {
        self.emit(&Reading::Summary(stats))?;
        self.out.flush()?;
        Ok(())
    }
}
