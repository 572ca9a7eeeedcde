use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{mpsc, OnceLock};

use anyhow::{Context, Result};
use chrono::Local;
use parking_lot::Mutex;

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

struct Logger {
    file: Option<File>,
    tui_tx: Option<mpsc::Sender<LogLine>>,
    prefixes: HashMap<String, u8>, // prefix -> color index
}

// Color indices for TUI rendering (mapped in the tui crate)
pub const COLOR_DEFAULT: u8 = 0;
pub const COLOR_GRAY: u8 = 1;
pub const COLOR_BLUE: u8 = 2;
pub const COLOR_GREEN: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// One log record as forwarded to the TUI.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub level: Level,
    pub prefix: String,
    pub color: u8,
    pub timestamp: String,
    pub message: String,
}

/// Initialize the global logger. Truncates `<log_dir>/app.log`.
pub fn init(log_dir: &Path) -> Result<()> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log dir {}", log_dir.display()))?;
    let log_path = log_dir.join("app.log");
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_path)
        .with_context(|| format!("opening {}", log_path.display()))?;

    let logger = LOGGER.get_or_init(|| {
        Mutex::new(Logger { file: None, tui_tx: None, prefixes: HashMap::new() })
    });
    logger.lock().file = Some(file);
    Ok(())
}

/// Wire the TUI log channel.
pub fn set_tui_sender(tx: mpsc::Sender<LogLine>) {
    if let Some(logger) = LOGGER.get() {
        logger.lock().tui_tx = Some(tx);
    }
}

/// Register a prefix with a color used by the `*_p` functions.
pub fn register_prefix(prefix: &str, color: u8) {
    if let Some(logger) = LOGGER.get() {
        logger.lock().prefixes.insert(prefix.to_string(), color);
    }
}

fn write_log(level: Level, prefix: &str, msg: &str) {
    // Not initialized: library use and tests stay silent
    let Some(logger) = LOGGER.get() else { return };
    let ts = Local::now().format("%H:%M:%S").to_string();
    let mut l = logger.lock();

    if let Some(file) = l.file.as_mut() {
        if prefix.is_empty() {
            writeln!(file, "[{}] [{}] {}", ts, level.as_str(), msg).ok();
        } else {
            writeln!(file, "[{}] [{}] [{}] {}", ts, level.as_str(), prefix, msg).ok();
        }
    }

    let color = l.prefixes.get(prefix).copied().unwrap_or(COLOR_DEFAULT);
    let send_failed = l.tui_tx.as_ref().is_some_and(|tx| {
        tx.send(LogLine {
            level,
            prefix: prefix.to_string(),
            color,
            timestamp: ts,
            message: msg.to_string(),
        })
        .is_err()
    });
    if send_failed {
        l.tui_tx = None;
    }
}

pub fn info(msg: &str) {
    write_log(Level::Info, "", msg);
}

pub fn warn(msg: &str) {
    write_log(Level::Warn, "", msg);
}

pub fn error(msg: &str) {
    write_log(Level::Error, "", msg);
}

pub fn info_p(prefix: &str, msg: &str) {
    write_log(Level::Info, prefix, msg);
}

pub fn warn_p(prefix: &str, msg: &str) {
    write_log(Level::Warn, prefix, msg);
}

pub fn error_p(prefix: &str, msg: &str) {
    write_log(Level::Error, prefix, msg);
}
