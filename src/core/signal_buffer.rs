use std::collections::VecDeque;

/// Bounded brightness time series backing the waveform and the beat detector.
///
/// Samples are appended at the tail and evicted from the head. The window's
/// minimum and maximum are rescanned every time the window changes.
#[derive(Debug, Clone, Default)]
pub struct SignalBuffer {
    samples: VecDeque<f64>,
    current_minimum: f64,
    current_maximum: f64,
}

impl SignalBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            ..Self::default()
        }
    }

    pub fn append(&mut self, sample: f64) {
        self.samples.push_back(sample);
        self.refresh_extrema();
    }

    /// Drop the oldest samples until at most `max_len` remain
    pub fn reduce_to_capacity(&mut self, max_len: usize) {
        if self.samples.len() <= max_len {
            return;
        }
        while self.samples.len() > max_len {
            self.samples.pop_front();
        }
        self.refresh_extrema();
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.refresh_extrema();
    }

    /// Minimum over the window, 0.0 when empty
    pub fn current_minimum(&self) -> f64 {
        self.current_minimum
    }

    /// Maximum over the window, 0.0 when empty
    pub fn current_maximum(&self) -> f64 {
        self.current_maximum
    }

    /// Average of the window extrema, `None` for an empty window
    pub fn midline(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some((self.current_minimum + self.current_maximum) / 2.0)
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn refresh_extrema(&mut self) {
        let mut iter = self.samples.iter().copied();
        let Some(first) = iter.next() else {
            self.current_minimum = 0.0;
            self.current_maximum = 0.0;
            return;
        };
        let (min, max) = iter.fold((first, first), |(min, max), v| (min.min(v), max.max(v)));
        self.current_minimum = min;
        self.current_maximum = max;
    }
}

/// Number of waveform points that fit a viewport: `floor(viewport_width / line_size)`
pub fn signal_capacity(viewport_width: f64, line_size: f64) -> usize {
    if !viewport_width.is_finite() || !line_size.is_finite() || line_size <= 0.0 || viewport_width <= 0.0 {
        return 0;
    }
    (viewport_width / line_size).floor() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer_extrema_default_to_zero() {
        let buf = SignalBuffer::default();
        assert_eq!(buf.current_minimum(), 0.0);
        assert_eq!(buf.current_maximum(), 0.0);
        assert_eq!(buf.midline(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_append_tracks_extrema() {
        let mut buf = SignalBuffer::default();
        for v in [0.5, 0.2, 0.9, 0.4] {
            buf.append(v);
        }
        assert_eq!(buf.current_minimum(), 0.2);
        assert_eq!(buf.current_maximum(), 0.9);
        assert!((buf.midline().unwrap() - 0.55).abs() < 1e-12);
        for v in buf.to_vec() {
            assert!(buf.current_minimum() <= v && v <= buf.current_maximum());
        }
    }

    #[test]
    fn test_reduce_evicts_oldest_first() {
        let mut buf = SignalBuffer::default();
        for i in 0..10 {
            buf.append(i as f64);
        }
        buf.reduce_to_capacity(4);
        assert_eq!(buf.to_vec(), vec![6.0, 7.0, 8.0, 9.0]);
        // Extrema follow the evicted window
        assert_eq!(buf.current_minimum(), 6.0);
        assert_eq!(buf.current_maximum(), 9.0);
    }

    #[test]
    fn test_length_never_exceeds_capacity() {
        let mut buf = SignalBuffer::default();
        for i in 0..200 {
            buf.append((i % 7) as f64 / 7.0);
            buf.reduce_to_capacity(25);
            assert!(buf.len() <= 25);
        }
        assert_eq!(buf.len(), 25);
    }

    #[test]
    fn test_reduce_is_idempotent() {
        let mut once = SignalBuffer::default();
        let mut twice = SignalBuffer::default();
        for v in [0.3, 0.1, 0.7, 0.2, 0.8, 0.6] {
            once.append(v);
            twice.append(v);
        }
        once.reduce_to_capacity(3);
        twice.reduce_to_capacity(3);
        twice.reduce_to_capacity(3);
        assert_eq!(once.to_vec(), twice.to_vec());
        assert_eq!(once.current_minimum(), twice.current_minimum());
        assert_eq!(once.current_maximum(), twice.current_maximum());
    }

    #[test]
    fn test_reduce_to_zero_empties() {
        let mut buf = SignalBuffer::default();
        buf.append(0.4);
        buf.reduce_to_capacity(0);
        assert!(buf.is_empty());
        assert_eq!(buf.current_maximum(), 0.0);
    }

    #[test]
    fn test_signal_capacity() {
        assert_eq!(signal_capacity(375.0, 3.0), 125);
        assert_eq!(signal_capacity(10.0, 3.0), 3);
        assert_eq!(signal_capacity(2.0, 3.0), 0);
        assert_eq!(signal_capacity(375.0, 0.0), 0);
        assert_eq!(signal_capacity(f64::NAN, 3.0), 0);
    }
}
