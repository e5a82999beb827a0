use std::time::Duration;

use crate::core::frame::Frame;

const BYTES_PER_PIXEL: usize = 4;

/// Captured frame: tightly packed RGBA rows plus the capture timestamp
#[derive(Clone)]
pub struct FrameData {
    pub buffer: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Duration,
}

impl FrameData {
    pub fn new(buffer: Vec<u8>, width: u32, height: u32, timestamp: Duration) -> Self {
        Self { buffer, width, height, timestamp }
    }

    /// Frame filled with a single color
    pub fn uniform(width: u32, height: u32, rgba: [u8; 4], timestamp: Duration) -> Self {
        let pixels = width as usize * height as usize;
        let mut buffer = Vec::with_capacity(pixels * BYTES_PER_PIXEL);
        for _ in 0..pixels {
            buffer.extend_from_slice(&rgba);
        }
        Self::new(buffer, width, height, timestamp)
    }
}

impl Frame for FrameData {
    fn width(&self) -> usize {
        self.width as usize
    }

    fn height(&self) -> usize {
        self.height as usize
    }

    fn rgba(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let offset = (y * self.width() + x) * BYTES_PER_PIXEL;
        let px = self.buffer.get(offset..offset + BYTES_PER_PIXEL)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}
