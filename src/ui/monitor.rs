use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, Gauge, GraphType, Paragraph},
    Frame, Terminal,
};
use std::{io, time::Duration};

use crate::core::pipeline::{PresentationUpdate, RateLabel};
use crate::core::session::SessionStats;
use crate::renderer::waveform::WaveformProjector;
use crate::renderer::Presenter;
use crate::shared::constants;

type UiTerminal = Terminal<CrosstermBackend<io::Stderr>>;

/// Chart units; the projector maps samples into 0..WAVEFORM_HEIGHT
const WAVEFORM_HEIGHT: f64 = 100.0;
/// Heart shrink per processed frame after a beat
const HEART_DECAY: f64 = 0.04;

/// What the monitor shows; kept separate from the terminal so drawing is testable
struct MonitorState {
    source: String,
    projector: WaveformProjector,
    capacity: usize,
    points: Vec<(f64, f64)>,
    cursor: Option<(f64, f64)>,
    heart: f64,
    label: RateLabel,
    contact: bool,
    beats_in_window: u32,
    remaining: Option<Duration>,
    status: String,
}

impl MonitorState {
    fn new(source: String, capacity: usize, line_size: f64) -> Self {
        Self {
            source,
            projector: WaveformProjector::new(line_size, WAVEFORM_HEIGHT),
            capacity,
            points: Vec::new(),
            cursor: None,
            heart: constants::HEART_MIN_SIZE_PERCENT,
            label: RateLabel::Idle,
            contact: false,
            beats_in_window: 0,
            remaining: None,
            status: "Place a fingertip over the camera and torch".to_string(),
        }
    }

    fn apply(&mut self, update: &PresentationUpdate) {
        self.points = self.projector.project(&update.waveform, update.minimum, update.maximum);
        self.cursor = self.projector.cursor(&update.waveform, update.minimum, update.maximum);
        self.heart = match update.heart_scale {
            Some(scale) => scale,
            None => (self.heart - HEART_DECAY).max(constants::HEART_MIN_SIZE_PERCENT),
        };
        self.label = update.label;
        self.contact = update.contact;
        self.beats_in_window = update.beats_in_window;
        self.remaining = update.remaining;

        if update.discarded {
            self.status = "Contact lost, measurement discarded".to_string();
        } else if let Some(rate) = update.rate {
            self.status = format!("Measured {:.1} BPM", rate);
        } else if !update.contact && self.label == RateLabel::Idle {
            self.status = "Place a fingertip over the camera and torch".to_string();
        } else if update.contact && self.status.starts_with("Place") {
            self.status = "Hold still".to_string();
        }
    }

    fn apply_rate(&mut self, rate: f64, label: RateLabel) {
        self.label = label;
        self.status = format!("Measured {:.1} BPM", rate);
    }
}

/// Full-screen pulse monitor: waveform, heart and rate
pub struct TuiPresenter {
    terminal: UiTerminal,
    state: MonitorState,
    restored: bool,
}

impl TuiPresenter {
    pub fn new(source: String, capacity: usize, line_size: f64) -> Result<Self> {
        let terminal = setup_terminal()?;
        Ok(Self {
            terminal,
            state: MonitorState::new(source, capacity, line_size),
            restored: false,
        })
    }

    fn draw(&mut self) -> Result<()> {
        let state = &self.state;
        self.terminal.draw(|frame| draw_monitor(frame, state))?;
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        restore_terminal(&mut self.terminal)
    }
}

impl Presenter for TuiPresenter {
    fn present(&mut self, update: &PresentationUpdate) -> Result<()> {
        self.state.apply(update);
        self.draw()
    }

    fn present_rate(&mut self, _at: Duration, rate: f64, label: RateLabel) -> Result<()> {
        self.state.apply_rate(rate, label);
        self.draw()
    }

    fn should_quit(&mut self) -> Result<bool> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn finish(&mut self, stats: &SessionStats) -> Result<()> {
        self.restore()?;
        let last = stats
            .last_rate()
            .map(|r| format!("{:.0} BPM", r))
            .unwrap_or_else(|| constants::NO_CONTACT_LABEL.to_string());
        println!("\n=== Measurement Complete ===");
        println!("Frames: {} ({} processed)", stats.frames_received, stats.frames_processed);
        println!("Beats: {}", stats.beats);
        println!("Rates: {}", stats.rates.len());
        println!("Last rate: {}", last);
        println!("Total time: {:.2}s", stats.elapsed.as_secs_f64());
        Ok(())
    }
}

impl Drop for TuiPresenter {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            crate::utils::logger::error(&format!("Failed to restore terminal from monitor: {}", err));
        }
    }
}

fn setup_terminal() -> Result<UiTerminal> {
    enable_raw_mode().context("failed to enable raw mode")?;

    let mut stderr = io::stderr();
    execute!(stderr, EnterAlternateScreen, Hide).context("failed to switch to alternate screen")?;

    let backend = CrosstermBackend::new(stderr);
    let terminal = Terminal::new(backend).context("failed to initialize terminal backend")?;

    Ok(terminal)
}

fn restore_terminal(terminal: &mut UiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, Show)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

fn draw_monitor(frame: &mut Frame<'_>, state: &MonitorState) {
    let area = frame.size();

    let block = Block::default().borders(Borders::ALL).title(Span::styled(
        format!(" {} | {} ", constants::APP_NAME, state.source),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(constants::MONITOR_LOGO.len() as u16),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(inner);

    draw_logo(frame, layout[0]);
    draw_waveform(frame, layout[1], state);
    draw_readout(frame, layout[2], state);
    draw_footer(frame, layout[3], &state.status);
}

fn draw_logo(frame: &mut Frame<'_>, area: Rect) {
    let lines: Vec<Line<'_>> = constants::MONITOR_LOGO
        .iter()
        .map(|line| Line::from(Span::styled(*line, Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))))
        .collect();

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}

fn draw_waveform(frame: &mut Frame<'_>, area: Rect, state: &MonitorState) {
    let trace_color = if state.contact { Color::Red } else { Color::DarkGray };
    let mut datasets = vec![Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(trace_color))
        .data(&state.points)];

    let cursor = state.cursor.as_slice();
    if !cursor.is_empty() {
        datasets.push(
            Dataset::default()
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
                .data(cursor),
        );
    }

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title("Signal"))
        .x_axis(Axis::default().bounds([0.0, state.projector.width_for(state.capacity)]))
        .y_axis(Axis::default().bounds([0.0, WAVEFORM_HEIGHT]));

    frame.render_widget(chart, area);
}

fn draw_readout(frame: &mut Frame<'_>, area: Rect, state: &MonitorState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let heart = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("♥"))
        .gauge_style(Style::default().fg(Color::Red))
        .ratio(state.heart.clamp(0.0, 1.0))
        .label(format!("{:.0}", state.heart * constants::MAX_HEART_HEIGHT));
    frame.render_widget(heart, columns[0]);

    let remaining = state
        .remaining
        .map(|r| format!("  {} beats, {:.0}s left", state.beats_in_window, r.as_secs_f64().ceil()))
        .unwrap_or_default();
    let bpm = Paragraph::new(Line::from(vec![
        Span::styled(
            state.label.to_string(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw(if matches!(state.label, RateLabel::Bpm(_)) { " BPM" } else { "" }),
        Span::styled(remaining, Style::default().fg(Color::DarkGray)),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Rate"))
    .alignment(Alignment::Center);
    frame.render_widget(bpm, columns[1]);
}

fn draw_footer(frame: &mut Frame<'_>, area: Rect, status: &str) {
    let footer = Paragraph::new(Line::from(vec![
        Span::styled("[Esc/q] quit  ", Style::default().fg(Color::DarkGray)),
        Span::styled(status, Style::default().fg(Color::White)),
    ]));

    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn update() -> PresentationUpdate {
        PresentationUpdate {
            timestamp: Duration::from_secs(1),
            brightness: 0.31,
            contact: true,
            waveform: vec![0.30, 0.32, 0.31],
            minimum: 0.30,
            maximum: 0.32,
            heart_scale: None,
            rate: None,
            label: RateLabel::Measuring,
            discarded: false,
            beats_in_window: 2,
            remaining: Some(Duration::from_millis(7_400)),
        }
    }

    #[test]
    fn test_state_projects_waveform_and_decays_heart() {
        let mut state = MonitorState::new("test".to_string(), 125, 3.0);
        let mut beat = update();
        beat.heart_scale = Some(1.0);
        state.apply(&beat);
        assert_eq!(state.points.len(), 3);
        assert_eq!(state.cursor.map(|c| c.0), Some(6.0));
        assert_eq!(state.heart, 1.0);

        for _ in 0..100 {
            state.apply(&update());
        }
        assert_eq!(state.heart, constants::HEART_MIN_SIZE_PERCENT);
    }

    #[test]
    fn test_state_status_follows_events() {
        let mut state = MonitorState::new("test".to_string(), 125, 3.0);
        state.apply(&update());
        assert_eq!(state.status, "Hold still");

        let mut lost = update();
        lost.contact = false;
        lost.discarded = true;
        lost.label = RateLabel::Idle;
        state.apply(&lost);
        assert!(state.status.contains("discarded"));

        state.apply_rate(71.6, RateLabel::Bpm(72));
        assert_eq!(state.label, RateLabel::Bpm(72));
        assert!(state.status.contains("71.6"));
    }

    #[test]
    fn test_draw_shows_rate_label() {
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        let mut state = MonitorState::new("synthetic".to_string(), 125, 3.0);
        let mut rate = update();
        rate.rate = Some(72.0);
        rate.label = RateLabel::Bpm(72);
        state.apply(&rate);

        terminal.draw(|frame| draw_monitor(frame, &state)).unwrap();
        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("72 BPM"));
        assert!(text.contains("Measured 72.0 BPM"));
    }
}
