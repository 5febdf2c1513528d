//! Logging setup.
//!
//! Library code logs through the `log` facade only. Applications call
//! [`init_logging`] to install `env_logger`, and may additionally open an
//! append-only file log that receives connection lifecycle events written with
//! the [`file_log!`](crate::file_log) macro.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use once_cell::sync::OnceCell;

/// Default file log name, created in the current directory.
pub const DEFAULT_LOG_FILE: &str = "htsp-client.log";

/// Global log file handle.
static LOG_FILE: OnceCell<Mutex<File>> = OnceCell::new();

/// Install `env_logger` (honours `RUST_LOG`, defaults to `info`).
///
/// Returns false if a logger was already installed.
pub fn init_logging() -> bool {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init()
        .is_ok()
}

/// Open the file log. `None` uses [`DEFAULT_LOG_FILE`].
pub fn init_file_logger(path: Option<&Path>) -> bool {
    if LOG_FILE.get().is_some() {
        return true;
    }

    let log_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));

    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => {
            let _ = LOG_FILE.set(Mutex::new(file));

            log_message("========================================");
            log_message(&format!("htsp-client {} log started", env!("CARGO_PKG_VERSION")));
            log_message(&format!("Log file: {:?}", log_path));
            log_message("========================================");
            true
        }
        Err(e) => {
            log::warn!("Cannot open log file {:?}: {}", log_path, e);
            false
        }
    }
}

/// Whether a file log is open.
pub fn file_logging_enabled() -> bool {
    LOG_FILE.get().is_some()
}

/// Log a message to the file. No-op until [`init_file_logger`] succeeds.
pub fn log_message(msg: &str) {
    if let Some(file_mutex) = LOG_FILE.get() {
        if let Ok(mut file) = file_mutex.lock() {
            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            let _ = writeln!(file, "[{}] {}", timestamp, msg);
            let _ = file.flush();
        }
    }
}

/// Log with level prefix.
#[macro_export]
macro_rules! file_log {
    (trace, $($arg:tt)*) => {
        $crate::logging::log_message(&format!("[TRACE] {}", format!($($arg)*)));
    };
    (debug, $($arg:tt)*) => {
        $crate::logging::log_message(&format!("[DEBUG] {}", format!($($arg)*)));
    };
    (info, $($arg:tt)*) => {
        $crate::logging::log_message(&format!("[INFO ] {}", format!($($arg)*)));
    };
    (warn, $($arg:tt)*) => {
        $crate::logging::log_message(&format!("[WARN ] {}", format!($($arg)*)));
    };
    (error, $($arg:tt)*) => {
        $crate::logging::log_message(&format!("[ERROR] {}", format!($($arg)*)));
    };
}

/// Log an error with context.
pub fn log_error(context: &str, error: &dyn std::fmt::Display) {
    log_message(&format!("[ERROR] {}: {}", context, error));
}
