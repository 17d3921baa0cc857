//! Logging service
//!
//! Library code hanya memakai macro `tracing`. Sink-nya dibangun eksplisit
//! di sini dan di-inject oleh owner proses: di-scope ke satu closure atau
//! di-install global sekali saat startup, lalu `shutdown` saat exit.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use tracing::level_filters::LevelFilter;
use tracing::{error, Dispatch};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

use crate::error::LogError;

/// Tag yang muncul di setiap baris log.
pub const APP_NAME: &str = "SLS";

/// Severity, urut dari paling parah.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Fatal,
    #[default]
    Error,
    Warning,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Fatal,
        LogLevel::Error,
        LogLevel::Warning,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Fatal => "FATAL",
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    /// tracing tidak punya FATAL, jadi FATAL dan ERROR sama-sama ERROR.
    pub const fn filter(&self) -> LevelFilter {
        match self {
            LogLevel::Fatal | LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == upper)
            .ok_or_else(|| LogError::UnknownLevel(s.to_string()))
    }
}

/// Logger configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Append-mode log file, in addition to stdout.
    pub file: Option<PathBuf>,
    pub ansi: bool,
    /// Nama level yang ditolak, dilaporkan oleh `Logger::new`.
    rejected_levels: Vec<String>,
}

impl LogConfig {
    /// Set level dari nama. Nama yang tidak dikenal diabaikan (level lama
    /// dipertahankan).
    ///
    /// No sink exists yet at this point, so the rejection is recorded and
    /// reported through the logger built from this config.
    pub fn level_name(mut self, name: &str) -> Self {
        match name.parse() {
            Ok(level) => self.level = level,
            Err(_) => self.rejected_levels.push(name.to_string()),
        }
        self
    }

    /// Level names rejected by [`LogConfig::level_name`], in call order.
    pub fn rejected_levels(&self) -> &[String] {
        &self.rejected_levels
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }
}

/// `<rfc3339 timestamp> SLS`
struct TaggedTime;

impl FormatTime for TaggedTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        SystemTime.format_time(w)?;
        w.write_char(' ')?;
        w.write_str(APP_NAME)
    }
}

/// Explicitly constructed, level-filtered log sink.
///
/// Building a `Logger` does not touch process-wide state. The owner
/// either runs code under it with [`Logger::scoped`] or installs it once
/// with [`Logger::install_global`], and calls [`Logger::shutdown`] at the
/// process boundary to flush the log file.
pub struct Logger {
    dispatch: Dispatch,
    level: LogLevel,
    file: Option<Arc<File>>,
}

impl Logger {
    pub fn new(config: LogConfig) -> Result<Self, LogError> {
        let file = match &config.file {
            Some(path) => {
                let f = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| LogError::OpenFile {
                        path: path.display().to_string(),
                        source,
                    })?;
                Some(Arc::new(f))
            }
            None => None,
        };

        let writer = match &file {
            Some(f) => BoxMakeWriter::new(io::stdout.and(Arc::clone(f))),
            None => BoxMakeWriter::new(io::stdout),
        };

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(config.level.filter())
            .with_target(false)
            .with_ansi(config.ansi)
            .with_timer(TaggedTime)
            .with_writer(writer)
            .finish();

        let dispatch = Dispatch::new(subscriber);

        // ERROR supaya lolos filter level apa pun
        tracing::dispatcher::with_default(&dispatch, || {
            for name in &config.rejected_levels {
                error!(
                    "wrong log level '{}', keep current '{}'",
                    name, config.level
                );
            }
        });

        Ok(Self {
            dispatch,
            level: config.level,
            file,
        })
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Run `f` with this logger as the current thread's sink.
    pub fn scoped<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Install as the process-wide sink. Only the first install succeeds.
    pub fn install_global(&self) -> Result<(), LogError> {
        tracing::dispatcher::set_global_default(self.dispatch.clone())
            .map_err(|_| LogError::AlreadyInstalled)
    }

    /// Flush the log file. The global dispatcher, if installed, stays
    /// alive but nothing buffered is lost.
    pub fn shutdown(self) -> io::Result<()> {
        if let Some(file) = &self.file {
            (&**file).flush()?;
            file.sync_data()?;
        }
        Ok(())
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("file", &self.file.is_some())
            .finish()
    }
}
