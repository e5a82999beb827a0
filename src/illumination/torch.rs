use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of a torch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TorchStatus {
    Applied,
    /// The device has no controllable torch
    Unsupported,
    Failed(String),
}

/// Controls the light source that illuminates the fingertip
pub trait Illumination: Send {
    fn set_torch(&mut self, on: bool) -> TorchStatus;

    fn describe(&self) -> String;
}

/// Stand-in for devices without a torch (most desktop webcams)
pub struct NoTorch;

impl Illumination for NoTorch {
    fn set_torch(&mut self, _on: bool) -> TorchStatus {
        TorchStatus::Unsupported
    }

    fn describe(&self) -> String {
        "no torch".to_string()
    }
}

/// Torch exposed through the Linux LED class (`/sys/class/leds/<name>`)
///
/// Turns the LED off again when dropped.
pub struct SysfsTorch {
    led_dir: PathBuf,
    lit: bool,
}

impl SysfsTorch {
    pub const LED_CLASS_DIR: &'static str = "/sys/class/leds";

    pub fn new(name: &str) -> Self {
        Self::at(Path::new(Self::LED_CLASS_DIR).join(name))
    }

    pub fn at(led_dir: PathBuf) -> Self {
        Self { led_dir, lit: false }
    }

    fn max_brightness(&self) -> String {
        fs::read_to_string(self.led_dir.join("max_brightness"))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "1".to_string())
    }
}

impl Illumination for SysfsTorch {
    fn set_torch(&mut self, on: bool) -> TorchStatus {
        let brightness = self.led_dir.join("brightness");
        if !brightness.exists() {
            return TorchStatus::Unsupported;
        }

        let value = if on { self.max_brightness() } else { "0".to_string() };
        match fs::write(&brightness, value) {
            Ok(()) => {
                self.lit = on;
                TorchStatus::Applied
            }
            Err(e) => TorchStatus::Failed(format!("{}: {}", brightness.display(), e)),
        }
    }

    fn describe(&self) -> String {
        format!("LED {}", self.led_dir.display())
    }
}

impl Drop for SysfsTorch {
    fn drop(&mut self) {
        if self.lit {
            let _ = self.set_torch(false);
        }
    }
}

/// Pick the torch configured by name, or none
pub fn from_config(led: Option<&str>) -> Box<dyn Illumination> {
    match led {
        Some(name) => Box::new(SysfsTorch::new(name)),
        None => Box::new(NoTorch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_led(name: &str, max: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("pulser_torch_test").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("brightness"), "0").unwrap();
        fs::write(dir.join("max_brightness"), max).unwrap();
        dir
    }

    #[test]
    fn test_sysfs_torch_writes_max_then_zero() {
        let dir = fake_led("on_off", "255\n");
        let mut torch = SysfsTorch::at(dir.clone());

        assert_eq!(torch.set_torch(true), TorchStatus::Applied);
        assert_eq!(fs::read_to_string(dir.join("brightness")).unwrap(), "255");
        assert!(torch.lit);

        assert_eq!(torch.set_torch(false), TorchStatus::Applied);
        assert_eq!(fs::read_to_string(dir.join("brightness")).unwrap(), "0");
    }

    #[test]
    fn test_drop_turns_torch_off() {
        let dir = fake_led("drop", "1");
        {
            let mut torch = SysfsTorch::at(dir.clone());
            torch.set_torch(true);
            assert_eq!(fs::read_to_string(dir.join("brightness")).unwrap(), "1");
        }
        assert_eq!(fs::read_to_string(dir.join("brightness")).unwrap(), "0");
    }

    #[test]
    fn test_missing_led_is_unsupported() {
        let mut torch = SysfsTorch::at(std::env::temp_dir().join("pulser_torch_test/missing_led"));
        assert_eq!(torch.set_torch(true), TorchStatus::Unsupported);
        assert_eq!(NoTorch.set_torch(true), TorchStatus::Unsupported);
    }

    #[test]
    fn test_from_config() {
        assert_eq!(from_config(None).describe(), "no torch");
        assert!(from_config(Some("white:flash")).describe().contains("white:flash"));
    }
}
