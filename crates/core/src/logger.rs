use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use chrono::Local;

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

struct Logger {
    file: Option<File>,
    echo: bool,
}

/// Initialize the global logger. Clears the log file.
///
/// Until this runs every log call is a no-op, which keeps unit tests quiet.
pub fn init(log_dir: &Path) {
    fs::create_dir_all(log_dir).ok();
    let log_path = log_dir.join("app.log");
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_path);
    if let Err(e) = &file {
        eprintln!("cannot open {}: {}", log_path.display(), e);
    }

    LOGGER
        .set(Mutex::new(Logger { file: file.ok(), echo: false }))
        .ok();
}

/// Mirror every line to stderr (headless runs).
pub fn set_echo(echo: bool) {
    if let Some(logger) = LOGGER.get() {
        if let Ok(mut l) = logger.lock() {
            l.echo = echo;
        }
    }
}

fn write_log(level: &str, prefix: &str, msg: &str) {
    let Some(logger) = LOGGER.get() else { return };
    let ts = Local::now().format("%H:%M:%S%.3f").to_string();

    let line = if prefix.is_empty() {
        format!("[{}] [{}] {}", ts, level, msg)
    } else {
        format!("[{}] [{}] [{}] {}", ts, level, prefix, msg)
    };

    let mut l = logger.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(file) = l.file.as_mut() {
        writeln!(file, "{}", line).ok();
    }
    if l.echo {
        eprintln!("{}", line);
    }
}

pub fn info(msg: &str) {
    write_log("INFO", "", msg);
}

pub fn warn(msg: &str) {
    write_log("WARN", "", msg);
}

pub fn error(msg: &str) {
    write_log("ERROR", "", msg);
}

/// Log tagged with a component prefix, e.g. `scan` or `rule:heal`.
pub fn info_p(prefix: &str, msg: &str) {
    write_log("INFO", prefix, msg);
}

pub fn warn_p(prefix: &str, msg: &str) {
    write_log("WARN", prefix, msg);
}

pub fn error_p(prefix: &str, msg: &str) {
    write_log("ERROR", prefix, msg);
}
