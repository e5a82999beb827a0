use crate::shared::constants;

/// Where `value` sits between `minimum` and `maximum`, 0.0 for a flat window
pub fn value_percent(value: f64, minimum: f64, maximum: f64) -> f64 {
    let range = maximum - minimum;
    if range <= f64::EPSILON || !range.is_finite() {
        return 0.0;
    }
    (value - minimum) / range
}

/// Heart icon scale for a sample: maps the window range onto
/// `HEART_MIN_SIZE_PERCENT..=HEART_MAX_SIZE_PERCENT`.
pub fn heart_scale(value: f64, minimum: f64, maximum: f64) -> f64 {
    let percent = value_percent(value, minimum, maximum);
    percent * (constants::HEART_MAX_SIZE_PERCENT - constants::HEART_MIN_SIZE_PERCENT)
        + constants::HEART_MIN_SIZE_PERCENT
}

/// Projects the signal window onto a `line_size`-spaced polyline of fixed height
pub struct WaveformProjector {
    pub line_size: f64,
    pub height: f64,
}

impl WaveformProjector {
    pub fn new(line_size: f64, height: f64) -> Self {
        Self { line_size, height }
    }

    /// Vertical position of a sample. The trace keeps a margin so the
    /// extrema never touch the edges.
    pub fn scale_y(&self, value: f64, minimum: f64, maximum: f64) -> f64 {
        let scaled = value_percent(value, minimum, maximum) * self.height;
        scaled * constants::WAVEFORM_SCALE + (1.0 - constants::WAVEFORM_SCALE) * self.height / 2.0
    }

    pub fn project(&self, samples: &[f64], minimum: f64, maximum: f64) -> Vec<(f64, f64)> {
        samples
            .iter()
            .enumerate()
            .map(|(i, &v)| (self.line_size * i as f64, self.scale_y(v, minimum, maximum)))
            .collect()
    }

    /// The most recent point, drawn as the trace cursor
    pub fn cursor(&self, samples: &[f64], minimum: f64, maximum: f64) -> Option<(f64, f64)> {
        let last = samples.len().checked_sub(1)?;
        Some((
            self.line_size * last as f64,
            self.scale_y(samples[last], minimum, maximum),
        ))
    }

    pub fn width_for(&self, capacity: usize) -> f64 {
        self.line_size * capacity.saturating_sub(1).max(1) as f64
    }
}
