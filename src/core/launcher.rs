use anyhow::Result;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::pipeline::PipelineConfig;
use super::session::{Session, SessionStats};
use crate::decoder::FrameSource;
use crate::illumination::torch;
use crate::renderer::{DisplayMode, JsonPresenter, PlainPresenter, Presenter};
use crate::utils::config::PulserConfig;

/// Wire a source to the presenter for `mode` and the configured torch, then
/// run the session to completion.
pub fn run<S: FrameSource>(
    source: S,
    mode: DisplayMode,
    config: &PulserConfig,
    running: Arc<AtomicBool>,
) -> Result<SessionStats> {
    let pipeline = PipelineConfig::from(config);

    crate::utils::logger::info(&format!(
        "launch: source={} mode={:?} policy={:?} window={:.1}s capacity={} torch={}",
        source.describe(),
        mode,
        config.rate_policy,
        config.measurement_window_secs,
        pipeline.capacity,
        config.torch_led.as_deref().unwrap_or("<none>")
    ));

    let mut presenter: Box<dyn Presenter> = match mode {
        DisplayMode::Tui => Box::new(crate::ui::TuiPresenter::new(
            source.describe(),
            pipeline.capacity,
            config.line_size,
        )?),
        DisplayMode::Plain => Box::new(PlainPresenter::stdout()),
        DisplayMode::Json => Box::new(JsonPresenter::stdout()),
    };
    let mut torch = torch::from_config(config.torch_led.as_deref());

    Session::new(pipeline, torch.as_mut(), presenter.as_mut(), running).run(source)
}
