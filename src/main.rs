mod analyzer;
mod core;
mod decoder;
mod illumination;
mod renderer;
mod shared;
mod sync;
mod ui;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::core::beat_detector::RatePolicy;
use crate::core::session::SessionStats;
use crate::decoder::SyntheticPulse;
use crate::renderer::DisplayMode;
use crate::utils::config::PulserConfig;

#[derive(Parser)]
#[command(author, version, about = "Heart rate from a fingertip held over the camera", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Config file (defaults to ./Pulser.config.json, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[arg(short, long, value_enum, global = true, default_value_t = DisplayMode::Tui)]
    mode: DisplayMode,
    /// How a window expiry turns beats into a rate
    #[arg(short, long, value_enum, global = true)]
    policy: Option<RatePolicy>,
    /// LED class device under /sys/class/leds to use as the torch
    #[arg(long, global = true)]
    torch: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure from a live camera
    Measure {
        #[arg(short = 'i', long)]
        camera: Option<i32>,
        #[arg(short, long)]
        fps: Option<u32>,
    },
    /// Run a recorded fingertip video through the pipeline
    Replay {
        video: PathBuf,
        /// Play back at the recorded frame rate instead of as fast as possible
        #[arg(long, default_value_t = false)]
        realtime: bool,
    },
    /// Measure a generated pulse signal
    Simulate {
        #[arg(short, long, default_value_t = 72.0)]
        bpm: f64,
        #[arg(short, long, default_value_t = 30.0)]
        seconds: f64,
        /// Seconds of bright "no finger" frames before the pulse
        #[arg(long, default_value_t = 1.0)]
        lead_in: f64,
        #[arg(long, default_value_t = false)]
        realtime: bool,
    },
    /// Print the effective config, optionally writing it to a file
    Config {
        #[arg(short, long)]
        write: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    crate::utils::logger::init();

    let cli = Cli::parse();

    if cli.mode == DisplayMode::Tui {
        // Leftover raw mode from a crashed run breaks the monitor layout
        let _ = crossterm::terminal::disable_raw_mode();
    }

    let mut config = PulserConfig::load(cli.config.as_deref())?;
    if let Some(policy) = cli.policy {
        config.rate_policy = policy;
    }
    if let Some(torch) = cli.torch.clone() {
        config.torch_led = Some(torch);
    }

    match cli.command {
        Commands::Measure { camera, fps } => {
            if let Some(index) = camera {
                config.camera_index = index;
            }
            if let Some(fps) = fps.filter(|f| *f > 0) {
                config.camera_fps = fps;
            }
            let stats = run_measure(cli.mode, &config)?;
            report(&stats);
        }
        Commands::Replay { video, realtime } => {
            let stats = run_replay(&video, realtime, cli.mode, &config)?;
            report(&stats);
        }
        Commands::Simulate { bpm, seconds, lead_in, realtime } => {
            let mut source = SyntheticPulse::new(bpm, config.camera_fps as f64, secs("seconds", seconds)?)
                .with_lead_in(secs("lead-in", lead_in)?);
            // The monitor is unreadable at full speed
            if realtime || cli.mode == DisplayMode::Tui {
                source = source.paced();
            }
            let stats = crate::core::launcher::run(source, cli.mode, &config, interrupt_flag()?)?;
            report(&stats);
        }
        Commands::Config { write } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if let Some(path) = write {
                config.save(&path)?;
                println!("Wrote {}", path.display());
            }
        }
    }

    Ok(())
}

/// Negative and NaN durations count as zero; values too large for a `Duration` are rejected
fn secs(flag: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value.max(0.0))
        .map_err(|_| anyhow::anyhow!("--{} is out of range: {}", flag, value))
}

/// Cleared on Ctrl-C so the session winds down and the torch goes off
fn interrupt_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;
    Ok(running)
}

fn report(stats: &SessionStats) {
    crate::utils::logger::info(&format!(
        "Done: {} beats, rates {:?}, {:.2}s",
        stats.beats,
        stats.rates,
        stats.elapsed.as_secs_f64()
    ));
}

#[cfg(feature = "camera")]
fn run_measure(mode: DisplayMode, config: &PulserConfig) -> Result<SessionStats> {
    let source = crate::decoder::CameraSource::open_device(config.camera_index, config.camera_fps)?;
    crate::core::launcher::run(source, mode, config, interrupt_flag()?)
}

#[cfg(not(feature = "camera"))]
fn run_measure(_mode: DisplayMode, _config: &PulserConfig) -> Result<SessionStats> {
    anyhow::bail!("Built without camera support; rebuild with `--features camera`")
}

#[cfg(feature = "camera")]
fn run_replay(video: &Path, realtime: bool, mode: DisplayMode, config: &PulserConfig) -> Result<SessionStats> {
    let source = crate::decoder::CameraSource::open_file(video, realtime || mode == DisplayMode::Tui)?;
    crate::core::launcher::run(source, mode, config, interrupt_flag()?)
}

#[cfg(not(feature = "camera"))]
fn run_replay(video: &Path, _realtime: bool, _mode: DisplayMode, _config: &PulserConfig) -> Result<SessionStats> {
    anyhow::bail!(
        "Cannot replay {}: built without camera support; rebuild with `--features camera`",
        video.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secs_clamps_negative_and_nan_to_zero() {
        assert_eq!(secs("seconds", 2.5).unwrap(), Duration::from_millis(2500));
        assert_eq!(secs("seconds", -3.0).unwrap(), Duration::ZERO);
        assert_eq!(secs("lead-in", f64::NAN).unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_secs_rejects_values_beyond_duration() {
        let err = secs("seconds", 1e20).unwrap_err();
        assert!(err.to_string().contains("--seconds"));
        assert!(secs("lead-in", f64::INFINITY).is_err());
    }
}
