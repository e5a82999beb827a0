use crate::shared::constants;
use lazy_static::lazy_static;
use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Error => "ERROR",
        })
    }
}

#[derive(Debug, Clone)]
struct LogFiles {
    error: PathBuf,
    debug: PathBuf,
}

lazy_static! {
    static ref LOG_FILES: Mutex<Option<LogFiles>> = Mutex::new(None);
}

// A panic while logging must not disable logging for the rest of the run
fn log_files() -> MutexGuard<'static, Option<LogFiles>> {
    LOG_FILES.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn append_line(path: &Path, line: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{}", line);
    }
}

fn start_log(path: &Path, title: &str) {
    let file = OpenOptions::new().create(true).write(true).truncate(true).open(path);
    if let Ok(mut file) = file {
        let _ = writeln!(
            file,
            "=== {} {} Started: {} ===",
            constants::APP_NAME,
            title,
            chrono::Local::now()
        );
    }
}

/// Start `error.log` and `debug.log` in the working directory and install the
/// panic hook. Until this runs, every logging call is a no-op.
pub fn init() {
    init_in(&std::env::current_dir().unwrap_or_default());
    install_panic_hook();
}

/// Start fresh log files in `dir` without touching the panic hook
pub fn init_in(dir: &Path) {
    let files = LogFiles {
        error: dir.join(constants::ERROR_LOG_FILE),
        debug: dir.join(constants::DEBUG_LOG_FILE),
    };
    start_log(&files.error, "Error Log");
    start_log(&files.debug, "Debug Log");
    *log_files() = Some(files);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Box<Any>".to_string())
}

fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let report = format!(
            "\nCRITICAL PANIC at {}:\nMessage: {}\nBacktrace:\n{:?}\n",
            location,
            panic_message(info.payload()),
            Backtrace::capture()
        );

        let files = log_files().clone();
        if let Some(files) = &files {
            append_line(&files.error, &report);
            append_line(&files.debug, &report);
        }

        // The monitor may have left the terminal in raw mode
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(
            std::io::stderr(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::cursor::Show
        );
        match files {
            Some(files) => eprintln!("{} crashed. See {} for details.", constants::APP_NAME, files.error.display()),
            None => eprintln!("{} crashed.{}", constants::APP_NAME, report),
        }
    }));
}

pub fn log(level: Level, msg: &str) {
    if let Some(files) = log_files().as_ref() {
        let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
        let line = format!("[{}][{}] {}", timestamp, level, msg);
        append_line(&files.debug, &line);

        if level == Level::Error {
            append_line(&files.error, &line);
        }
    }
}

pub fn info(msg: &str) {
    log(Level::Info, msg);
}

pub fn error(msg: &str) {
    log(Level::Error, msg);
}

pub fn debug(msg: &str) {
    log(Level::Debug, msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    // The only test that initializes the global logger; others stay silent
    #[test]
    fn test_errors_reach_both_files() {
        let dir = std::env::temp_dir().join("pulser_logger_test");
        fs::create_dir_all(&dir).unwrap();
        init_in(&dir);

        info("window opened");
        error("torch failed");

        let debug_log = fs::read_to_string(dir.join(constants::DEBUG_LOG_FILE)).unwrap();
        let error_log = fs::read_to_string(dir.join(constants::ERROR_LOG_FILE)).unwrap();
        assert!(debug_log.starts_with("=== Pulser Debug Log Started"));
        assert!(debug_log.contains("[INFO] window opened"));
        assert!(debug_log.contains("[ERROR] torch failed"));
        assert!(!error_log.contains("window opened"));
        assert!(error_log.contains("[ERROR] torch failed"));
    }

    #[test]
    fn test_panic_message_from_payload() {
        let text: Box<dyn Any + Send> = Box::new("bad frame");
        let owned: Box<dyn Any + Send> = Box::new(String::from("bad window"));
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(text.as_ref()), "bad frame");
        assert_eq!(panic_message(owned.as_ref()), "bad window");
        assert_eq!(panic_message(other.as_ref()), "Box<Any>");
    }

    #[test]
    fn test_level_labels() {
        assert_eq!(Level::Debug.to_string(), "DEBUG");
        assert_eq!(Level::Error.to_string(), "ERROR");
    }
}
