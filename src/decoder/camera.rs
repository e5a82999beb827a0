use anyhow::{anyhow, Context, Result};
#[cfg(target_os = "macos")]
use opencv::core;
use opencv::{imgproc, prelude::*, videoio};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{FrameData, FrameSource};
use crate::sync::{MasterClock, VSync};

enum CaptureOrigin {
    Device(i32),
    File(PathBuf),
}

/// OpenCV capture from a live camera or a recorded clip, delivered as RGBA.
pub struct CameraSource {
    capture: videoio::VideoCapture,
    origin: CaptureOrigin,
    fps: f64,
    clock: MasterClock,
    frame_counter: u64,
    pacer: Option<VSync>,
}

impl CameraSource {
    /// Open camera `index`, asking the driver for `requested_fps`
    pub fn open_device(index: i32, requested_fps: u32) -> Result<Self> {
        // CAP_ANY lets OpenCV pick the platform backend
        // (AVFoundation, Media Foundation, V4L2/GStreamer)
        let mut capture = videoio::VideoCapture::new(index, videoio::CAP_ANY)
            .with_context(|| format!("Failed to create capture for camera {}", index))?;
        if !capture.is_opened()? {
            return Err(anyhow!("Failed to open camera {}", index));
        }

        // Drivers are free to ignore this
        let _ = capture.set(videoio::CAP_PROP_FPS, requested_fps as f64);
        let reported = capture.get(videoio::CAP_PROP_FPS).unwrap_or(0.0);
        let fps = if reported > 0.0 { reported } else { requested_fps as f64 };

        crate::utils::logger::info(&format!(
            "Camera {} opened: {}x{} @ {:.1} fps",
            index,
            capture.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or(0.0),
            capture.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0),
            fps
        ));

        Ok(Self {
            capture,
            origin: CaptureOrigin::Device(index),
            fps,
            clock: MasterClock::new(),
            frame_counter: 0,
            pacer: None,
        })
    }

    /// Open a recorded clip. With `paced` the clip plays back in real time.
    pub fn open_file(path: &Path, paced: bool) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("Video path is not valid UTF-8: {}", path.display()))?;
        let capture = videoio::VideoCapture::from_file(path_str, videoio::CAP_ANY)
            .with_context(|| format!("Failed to create capture for {}", path.display()))?;
        if !capture.is_opened()? {
            return Err(anyhow!("Failed to open video file: {}", path.display()));
        }

        let reported = capture.get(videoio::CAP_PROP_FPS).unwrap_or(0.0);
        let fps = if reported > 0.0 {
            reported
        } else {
            crate::shared::constants::CAMERA_FRAMES_PER_SECOND as f64
        };

        crate::utils::logger::info(&format!("Video {} opened @ {:.2} fps", path.display(), fps));

        Ok(Self {
            capture,
            origin: CaptureOrigin::File(path.to_path_buf()),
            fps,
            clock: MasterClock::new(),
            frame_counter: 0,
            pacer: paced.then(|| VSync::new(fps)),
        })
    }

    fn timestamp(&self) -> Duration {
        match self.origin {
            CaptureOrigin::Device(_) => self.clock.elapsed(),
            CaptureOrigin::File(_) => Duration::from_secs_f64(self.frame_counter as f64 / self.fps),
        }
    }
}

impl FrameSource for CameraSource {
    fn native_fps(&self) -> f64 {
        self.fps
    }

    fn read_frame(&mut self) -> Result<Option<FrameData>> {
        if let Some(pacer) = self.pacer.as_mut() {
            pacer.wait_for_next_frame();
        }

        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? {
            return Ok(None);
        }
        if frame.empty() {
            return Ok(None);
        }

        let timestamp = self.timestamp();

        let mut rgba = Mat::default();
        #[cfg(target_os = "macos")]
        imgproc::cvt_color(&frame, &mut rgba, imgproc::COLOR_BGR2RGBA, 0, core::AlgorithmHint::ALGO_HINT_DEFAULT)?;

        #[cfg(not(target_os = "macos"))]
        imgproc::cvt_color(&frame, &mut rgba, imgproc::COLOR_BGR2RGBA, 0)?;

        if !rgba.is_continuous() {
            return Err(anyhow!("Frame is not continuous"));
        }

        let width = rgba.cols().max(0) as u32;
        let height = rgba.rows().max(0) as u32;
        let buffer = rgba.data_bytes()?.to_vec();
        self.frame_counter += 1;

        Ok(Some(FrameData::new(buffer, width, height, timestamp)))
    }

    fn describe(&self) -> String {
        match &self.origin {
            CaptureOrigin::Device(index) => format!("camera {}", index),
            CaptureOrigin::File(path) => format!("video {}", path.display()),
        }
    }
}
