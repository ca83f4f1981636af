//! Forwards this crate's `log` records to a logger supplied by the host app.
//!
//! ```swift
//! final class CredshimLog: Credshim.Logger {
//!     func log(level: Credshim.LogLevel, message: String) {
//!         os_log("%{public}@", message)
//!     }
//! }
//!
//! Credshim.setLogger(logger: CredshimLog(), level: .info)
//! ```

use std::sync::{Arc, OnceLock};

/// Receives log messages on the host side.
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Records one message.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a log message, most verbose first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Per-call tracing.
    Trace,
    /// Operation-level diagnostics.
    Debug,
    /// Noteworthy events.
    Info,
    /// Unexpected backing-store states.
    Warn,
    /// Failures.
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}

static HOST_LOGGER: OnceLock<Arc<dyn Logger>> = OnceLock::new();

struct ForeignLogger;

/// Debug and trace records from other crates are dropped.
fn forwards(metadata: &log::Metadata) -> bool {
    metadata.level() <= log::Level::Info || metadata.target().starts_with("credshim")
}

impl log::Log for ForeignLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        forwards(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(logger) = HOST_LOGGER.get() {
            logger.log(record.level().into(), record.args().to_string());
        }
    }

    fn flush(&self) {}
}

/// Installs `logger` as the destination of this crate's log records, at
/// `level` and above.
///
/// Only the first call installs a logger; later calls only change the level.
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>, level: LogLevel) {
    static BRIDGE: ForeignLogger = ForeignLogger;

    if HOST_LOGGER.set(logger).is_err() {
        log::debug!("host logger already installed");
    }
    if let Err(err) = log::set_logger(&BRIDGE) {
        // another `log` backend owns the process, e.g. in tests
        eprintln!("credshim: failed to install logger: {err}");
    }
    log::set_max_level(level.into());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwarded(level: log::Level, target: &str) -> bool {
        forwards(&log::Metadata::builder().level(level).target(target).build())
    }

    #[test]
    fn test_filters_foreign_debug_records() {
        assert!(forwarded(log::Level::Debug, "credshim_core::shim"));
        assert!(forwarded(log::Level::Warn, "uniffi"));
        assert!(!forwarded(log::Level::Debug, "uniffi::ffi"));
        assert!(!forwarded(log::Level::Trace, "security_framework"));
    }

    #[test]
    fn test_level_conversions() {
        assert_eq!(LogLevel::from(log::Level::Warn), LogLevel::Warn);
        assert_eq!(log::LevelFilter::from(LogLevel::Debug), log::LevelFilter::Debug);
    }
}
