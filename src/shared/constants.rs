pub const APP_NAME: &str = "Pulser";

pub const CONFIG_FILE: &str = "Pulser.config.json";
pub const CONFIG_DIR_NAME: &str = "pulser";
pub const CONFIG_DIR_FILE: &str = "config.json";
pub const ERROR_LOG_FILE: &str = "error.log";
pub const DEBUG_LOG_FILE: &str = "debug.log";

// Capture
pub const CAMERA_FRAMES_PER_SECOND: u32 = 30;
pub const IMAGES_PER_SECOND: u32 = 30;
pub const CAPTURE_QUEUE_DEPTH: usize = 120;

// Brightness extraction
pub const SAMPLE_STRIDE: usize = 10;

// Signal window (points of `LINE_SIZE` across a viewport of `VIEWPORT_WIDTH`)
pub const VIEWPORT_WIDTH: f64 = 375.0;
pub const LINE_SIZE: f64 = 3.0;

// Detection
pub const MIN_DETECTION_SAMPLES: usize = 3;
pub const MEASUREMENT_WINDOW_SECS: f64 = 10.0;
pub const MAX_MEASUREMENT_WINDOW_SECS: f64 = 3600.0;

// Skin-contact gate
pub const CONTACT_BRIGHTNESS_THRESHOLD: f64 = 0.4;
pub const CONTACT_VOLATILITY_THRESHOLD: f64 = 0.01;

// Presentation
pub const WAVEFORM_SCALE: f64 = 0.95;
pub const HEART_MIN_SIZE_PERCENT: f64 = 0.5;
pub const HEART_MAX_SIZE_PERCENT: f64 = 1.0;
pub const MAX_HEART_HEIGHT: f64 = 64.0;
pub const MEASURING_PLACEHOLDER: &str = "Measuring...";
pub const NO_CONTACT_LABEL: &str = "--";

// Synthetic PPG
pub const SYNTHETIC_FRAME_WIDTH: u32 = 64;
pub const SYNTHETIC_FRAME_HEIGHT: u32 = 48;
pub const SYNTHETIC_BASE_BRIGHTNESS: f64 = 0.3;
pub const SYNTHETIC_AMPLITUDE: f64 = 0.02;
pub const SYNTHETIC_NO_CONTACT_BRIGHTNESS: f64 = 0.9;

pub const MONITOR_LOGO: &[&str] = &[
    " ___      _             ",
    "| _ \\_  _| |___ ___ _ _ ",
    "|  _/ || | (_-</ -_) '_|",
    "|_|  \\_,_|_/__/\\___|_|  ",
];
