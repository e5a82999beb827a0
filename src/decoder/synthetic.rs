use anyhow::Result;
use std::f64::consts::PI;
use std::time::Duration;

use super::{FrameData, FrameSource};
use crate::shared::constants;
use crate::sync::VSync;

/// Generates the frames a fingertip over a lit camera would produce: uniform
/// gray frames whose brightness oscillates at the heart rate.
///
/// An optional lead-in emits bright frames first, as if the finger were
/// placed on the lens a moment after capture started.
pub struct SyntheticPulse {
    bpm: f64,
    fps: f64,
    total_frames: u64,
    lead_in_frames: u64,
    frame_index: u64,
    width: u32,
    height: u32,
    pacer: Option<VSync>,
}

impl SyntheticPulse {
    pub fn new(bpm: f64, fps: f64, duration: Duration) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { constants::CAMERA_FRAMES_PER_SECOND as f64 };
        Self {
            bpm: bpm.max(0.0),
            fps,
            total_frames: (duration.as_secs_f64() * fps).round() as u64,
            lead_in_frames: 0,
            frame_index: 0,
            width: constants::SYNTHETIC_FRAME_WIDTH,
            height: constants::SYNTHETIC_FRAME_HEIGHT,
            pacer: None,
        }
    }

    /// Emit bright "no finger" frames for `lead_in` before the pulse starts
    pub fn with_lead_in(mut self, lead_in: Duration) -> Self {
        self.lead_in_frames = (lead_in.as_secs_f64() * self.fps).round() as u64;
        self
    }

    /// Deliver frames in real time instead of as fast as possible
    pub fn paced(mut self) -> Self {
        self.pacer = Some(VSync::new(self.fps));
        self
    }

    /// Brightness of the frame at `index`
    pub fn brightness_at(&self, index: u64) -> f64 {
        if index < self.lead_in_frames {
            return constants::SYNTHETIC_NO_CONTACT_BRIGHTNESS;
        }
        let t = (index - self.lead_in_frames) as f64 / self.fps;
        let phase = 2.0 * PI * self.bpm / 60.0 * t;
        constants::SYNTHETIC_BASE_BRIGHTNESS + constants::SYNTHETIC_AMPLITUDE * phase.sin()
    }

    pub fn total_frames(&self) -> u64 {
        self.lead_in_frames.saturating_add(self.total_frames)
    }
}

impl FrameSource for SyntheticPulse {
    fn native_fps(&self) -> f64 {
        self.fps
    }

    fn read_frame(&mut self) -> Result<Option<FrameData>> {
        if self.frame_index >= self.total_frames() {
            return Ok(None);
        }
        if let Some(pacer) = self.pacer.as_mut() {
            pacer.wait_for_next_frame();
        }

        let level = (self.brightness_at(self.frame_index).clamp(0.0, 1.0) * 255.0).round() as u8;
        let timestamp = Duration::from_secs_f64(self.frame_index as f64 / self.fps);
        self.frame_index += 1;

        Ok(Some(FrameData::uniform(
            self.width,
            self.height,
            [level, level, level, 255],
            timestamp,
        )))
    }

    fn describe(&self) -> String {
        format!("synthetic pulse {:.0} BPM @ {:.0} fps", self.bpm, self.fps)
    }
}
