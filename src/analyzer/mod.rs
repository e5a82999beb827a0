use crate::shared::constants;

/// Decides whether a brightness sample plausibly comes from a fingertip
/// pressed over the lens with the torch on.
///
/// Both conditions must hold: the frame is dark enough (skin absorbs most of
/// the light) and it moved less than the volatility threshold since the
/// previous frame.
#[derive(Debug, Clone)]
pub struct SkinContactGate {
    brightness_threshold: f64,
    volatility_threshold: f64,
    previous: Option<f64>,
}

impl SkinContactGate {
    pub fn new(brightness_threshold: f64, volatility_threshold: f64) -> Self {
        Self {
            brightness_threshold,
            volatility_threshold,
            previous: None,
        }
    }

    /// Judge `brightness` against the previous sample, then remember it
    pub fn assess(&mut self, brightness: f64) -> bool {
        let stable = match self.previous {
            Some(prev) => (brightness - prev).abs() < self.volatility_threshold,
            None => false,
        };
        self.previous = Some(brightness);
        stable && brightness < self.brightness_threshold
    }
}

impl Default for SkinContactGate {
    fn default() -> Self {
        Self::new(
            constants::CONTACT_BRIGHTNESS_THRESHOLD,
            constants::CONTACT_VOLATILITY_THRESHOLD,
        )
    }
}
