pub mod beat_detector;
pub mod extractor;
pub mod frame;
pub mod launcher;
pub mod pipeline;
pub mod session;
pub mod signal_buffer;
