// Tue Jan 13 2026 - Alex

use colored::*;
use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::panic;
use std::path::Path;

pub struct LoggingUtils;

impl LoggingUtils {
    /// Console logging at `level`, optionally mirrored (always at debug) to
    /// `file_path`.
    pub fn init_logger(level: LevelFilter, file_path: Option<&Path>, use_color: bool) -> std::io::Result<()> {
        let file = match file_path {
            Some(path) => Some(OpenOptions::new().create(true).write(true).truncate(true).open(path)?),
            None => None,
        };

        let max = if file.is_some() { level.max(LevelFilter::Debug) } else { level };
        let logger = Box::new(HostLogger::new(level, file, use_color));
        if log::set_boxed_logger(logger).is_ok() {
            log::set_max_level(max);
        }
        Ok(())
    }

    pub fn level_from_str(s: &str) -> LevelFilter {
        match s.to_lowercase().as_str() {
            "error" => LevelFilter::Error,
            "warn" | "warning" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Info,
        }
    }

    pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
        match verbosity {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Writes `[LEVEL:target] message` lines to the message sink (stderr), and
/// timestamped lines to an optional file.
struct HostLogger {
    console_level: LevelFilter,
    use_color: bool,
    file: Option<Mutex<File>>,
}

impl HostLogger {
    fn new(console_level: LevelFilter, file: Option<File>, use_color: bool) -> Self {
        Self {
            console_level,
            use_color,
            file: file.map(Mutex::new),
        }
    }

    fn format_level(&self, level: Level) -> ColoredString {
        match level {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARNING".yellow().bold(),
            Level::Info => "INFO".green().bold(),
            Level::Debug => "DEBUG".blue().bold(),
            Level::Trace => "TRACE".magenta().bold(),
        }
    }
}

impl Log for HostLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.console_level || (self.file.is_some() && metadata.level() <= LevelFilter::Debug)
    }

    fn log(&self, record: &Record) {
        if record.level() <= self.console_level {
            let level_str = if self.use_color {
                self.format_level(record.level()).to_string()
            } else {
                record.level().to_string()
            };
            eprintln!("{}", format_line(&level_str, record));
        }

        if let Some(file) = &self.file {
            if record.level() <= LevelFilter::Debug {
                let line = format!("{} {}\n", timestamp(), format_line(record.level().as_str(), record));
                let _ = file.lock().write_all(line.as_bytes());
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            let _ = file.lock().flush();
        }
    }
}

fn format_line(level: &str, record: &Record) -> String {
    format!("[{}:{}] {}", level, record.target(), record.args())
}

fn timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    format!("{}.{:03}", duration.as_secs(), duration.subsec_millis())
}

/// Routes panics through `log` before the default hook runs.
pub fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "<unknown>".to_string());
        let message = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "<non-string panic payload>".to_string());

        log::error!("Uncaught panic at {}: {}", location, message);
        log::logger().flush();
        previous(info);
    }));
}

/// `RUST_LOG`-driven logging, used instead of the console logger when the
/// variable is set and no level was asked for.
pub fn init_from_env() {
    let _ = env_logger::Builder::from_default_env().format_timestamp(None).try_init();
}
