pub mod frame_data;
pub mod synthetic;
#[cfg(feature = "camera")]
pub mod camera;

pub use frame_data::FrameData;
pub use synthetic::SyntheticPulse;
#[cfg(feature = "camera")]
pub use camera::CameraSource;

use anyhow::Result;
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Anything that produces timestamped frames: a camera, a recording, a generator
pub trait FrameSource: Send + 'static {
    /// Frames per second the source delivers
    fn native_fps(&self) -> f64;

    /// Next frame, or `None` once the source is exhausted
    fn read_frame(&mut self) -> Result<Option<FrameData>>;

    fn describe(&self) -> String;
}

/// Run `source` on its own thread, pushing frames into `sender`.
///
/// The thread ends when the source runs dry, the receiver is dropped, or
/// `running` is cleared. It returns the number of frames delivered.
pub fn spawn_capture_thread<S: FrameSource>(
    mut source: S,
    sender: Sender<FrameData>,
    running: Arc<AtomicBool>,
) -> JoinHandle<Result<u64>> {
    std::thread::spawn(move || {
        crate::utils::logger::debug(&format!("Capture thread started: {}", source.describe()));
        let mut frames_sent: u64 = 0;
        while running.load(Ordering::SeqCst) {
            match source.read_frame() {
                Ok(Some(frame)) => {
                    if sender.send(frame).is_err() {
                        crate::utils::logger::debug("Capture sender error (receiver dropped)");
                        break;
                    }
                    frames_sent += 1;
                }
                Ok(None) => {
                    crate::utils::logger::debug("Capture source exhausted");
                    break;
                }
                Err(e) => {
                    crate::utils::logger::error(&format!("Capture error: {}", e));
                    return Err(e);
                }
            }
        }
        crate::utils::logger::debug(&format!("Capture thread exiting after {} frames", frames_sent));
        Ok(frames_sent)
    })
}
