use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Mutex, Once};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{LevelFilter, Log, Metadata, Record};

/// File tier: everything at or above `level` is appended to `path`.
#[derive(Debug, Clone)]
pub struct FileLogConfig {
    pub path: PathBuf,
    pub level: LevelFilter,
}

/// Logger configuration.
///
/// `console_filter` follows the `env_logger` filter syntax (e.g. "info", "warn",
/// "stagehand_engine=debug,wgpu=warn"). When it is `None` and `RUST_LOG` is unset, the
/// console shows `console_level` and above.
///
/// `write_style` controls ANSI coloring behavior.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub console_filter: Option<String>,
    pub console_level: LevelFilter,
    pub file: Option<FileLogConfig>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_filter: None,
            console_level: LevelFilter::Info,
            file: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    pub fn with_console_level(mut self, level: LevelFilter) -> Self {
        self.console_level = level;
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, level: LevelFilter) -> Self {
        self.file = Some(FileLogConfig { path: path.into(), level });
        self
    }
}

/// Two-tier logger: `env_logger` on the console plus an optional log file with its
/// own severity threshold.
pub struct TieredLogger {
    console: env_logger::Logger,
    file: Option<(Mutex<File>, LevelFilter)>,
}

impl TieredLogger {
    /// Builds the logger without installing it.
    ///
    /// A log file that cannot be opened is reported and the file tier is left out.
    pub fn new(config: LoggingConfig) -> (Self, Option<io::Error>) {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = &config.console_filter {
            builder.parse_filters(filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(config.console_level);
        }
        builder.write_style(config.write_style);

        let mut open_error = None;
        let file = config.file.and_then(|f| {
            match OpenOptions::new().create(true).append(true).open(&f.path) {
                Ok(file) => Some((Mutex::new(file), f.level)),
                Err(e) => {
                    open_error = Some(e);
                    None
                }
            }
        });

        (Self { console: builder.build(), file }, open_error)
    }

    /// Most verbose level either tier accepts.
    pub fn max_level(&self) -> LevelFilter {
        let file_level = self.file.as_ref().map_or(LevelFilter::Off, |(_, level)| *level);
        self.console.filter().max(file_level)
    }

    fn file_accepts(&self, metadata: &Metadata<'_>) -> bool {
        self.file.as_ref().is_some_and(|(_, level)| metadata.level() <= *level)
    }
}

impl Log for TieredLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.console.enabled(metadata) || self.file_accepts(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if self.console.matches(record) {
            self.console.log(record);
        }
        if !self.file_accepts(record.metadata()) {
            return;
        }
        if let Some((file, _)) = &self.file {
            let stamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs_f64())
                .unwrap_or_default();
            // A poisoned lock only means another thread panicked mid-write.
            let mut file = file.lock().unwrap_or_else(|e| e.into_inner());
            let _ = writeln!(
                file,
                "[{stamp:.3} {:<5} {}] {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        self.console.flush();
        if let Some((file, _)) = &self.file {
            let mut file = file.lock().unwrap_or_else(|e| e.into_inner());
            let _ = file.flush();
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// This function is idempotent; subsequent calls are ignored.
/// Intended usage is early in `main`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let file_path = config.file.as_ref().map(|f| f.path.clone());
        let (logger, open_error) = TieredLogger::new(config);
        let max_level = logger.max_level();

        if log::set_boxed_logger(Box::new(logger)).is_err() {
            // Someone else installed a logger first; leave it in place.
            return;
        }
        log::set_max_level(max_level);

        if let (Some(e), Some(path)) = (open_error, file_path) {
            log::warn!("log file {} unavailable: {e}", path.display());
        }
        log::debug!("logging initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_at(level: log::Level, logger: &TieredLogger, msg: &str) {
        logger.log(
            &Record::builder()
                .level(level)
                .target("stagehand_engine::test")
                .args(format_args!("{msg}"))
                .build(),
        );
    }

    #[test]
    fn file_tier_filters_independently_of_the_console() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.log");
        let config = LoggingConfig {
            console_filter: Some("off".into()),
            ..LoggingConfig::default()
        }
        .with_file(&path, LevelFilter::Warn);

        let (logger, err) = TieredLogger::new(config);
        assert!(err.is_none());
        assert_eq!(logger.max_level(), LevelFilter::Warn);

        record_at(log::Level::Info, &logger, "quiet");
        record_at(log::Level::Error, &logger, "loud");
        logger.flush();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("loud"));
        assert!(!text.contains("quiet"));
    }

    #[test]
    fn unopenable_file_drops_the_file_tier() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            console_filter: Some("debug".into()),
            ..LoggingConfig::default()
        }
        .with_file(dir.path(), LevelFilter::Trace);

        let (logger, err) = TieredLogger::new(config);
        assert!(err.is_some());
        assert_eq!(logger.max_level(), LevelFilter::Debug);
    }
}
