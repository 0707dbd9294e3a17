//! Main logger implementation
//!
//! A [`Logger`] is a cheap-to-clone handle over an assembled [`Tee`] plus the
//! finalizer options fixed at build time. Records are encoded and written on
//! the caller's thread; the only runtime knob is the severity gate the cores
//! read.

use super::{
    caller,
    log_context::{Field, FieldValue, LogContext},
    log_core::{LogCore, Tee},
    log_entry::LogEntry,
    log_level::LogLevel,
    metrics::LoggerMetrics,
    error::Result,
};
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Records at or above this level carry a stack trace when enabled
pub const DEFAULT_STACKTRACE_LEVEL: LogLevel = LogLevel::Panic;

/// Cross-cutting options applied to every record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggerOptions {
    /// Capture the call site of each record
    pub add_caller: bool,
    /// Extra frames to skip past the tracked call site
    pub caller_skip: usize,
    /// Attach a stack trace to records at or above this level
    pub stacktrace_level: Option<LogLevel>,
}

impl LoggerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_caller(mut self, enabled: bool) -> Self {
        self.add_caller = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_caller_skip(mut self, skip: usize) -> Self {
        self.caller_skip = skip;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_stacktrace(mut self, level: Option<LogLevel>) -> Self {
        self.stacktrace_level = level;
        self
    }
}

#[derive(Clone)]
pub struct Logger {
    tee: Arc<Tee>,
    options: Arc<LoggerOptions>,
    fields: LogContext,
    metrics: Arc<LoggerMetrics>,
}

impl Logger {
    pub fn new(tee: Tee) -> Self {
        Self {
            tee: Arc::new(tee),
            options: Arc::new(LoggerOptions::default()),
            fields: LogContext::new(),
            metrics: Arc::new(LoggerMetrics::new()),
        }
    }

    pub fn from_cores(cores: Vec<LogCore>) -> Self {
        Self::new(Tee::new(cores))
    }

    /// A logger that drops everything
    pub fn noop() -> Self {
        Self::new(Tee::default())
    }

    #[must_use]
    pub fn with_options(mut self, options: LoggerOptions) -> Self {
        self.options = Arc::new(options);
        self
    }

    /// Child logger carrying additional fields on every record
    #[must_use]
    pub fn with<I: IntoIterator<Item = Field>>(&self, fields: I) -> Self {
        let mut child = self.clone();
        child.fields.extend(fields);
        child
    }

    /// Child logger carrying one additional field
    #[must_use]
    pub fn with_field(&self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.with([Field::new(key, value)])
    }

    pub fn options(&self) -> &LoggerOptions {
        &self.options
    }

    /// Fields bound to this logger
    pub fn fields(&self) -> &LogContext {
        &self.fields
    }

    pub fn tee(&self) -> &Tee {
        &self.tee
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    /// Whether a record at `level` would reach at least one sink
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.tee.enabled(level)
    }

    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        self.emit(level, message.as_ref(), std::iter::empty(), Location::caller());
    }

    #[track_caller]
    pub fn log_with<I>(&self, level: LogLevel, message: impl AsRef<str>, fields: I)
    where
        I: IntoIterator<Item = Field>,
    {
        self.emit(level, message.as_ref(), fields, Location::caller());
    }

    fn emit<I>(&self, level: LogLevel, message: &str, fields: I, location: &Location<'_>)
    where
        I: IntoIterator<Item = Field>,
    {
        if !self.tee.enabled(level) {
            self.metrics.record_filtered();
            return;
        }

        let mut entry = LogEntry::new(level, message)
            .with_context(self.fields.clone())
            .with_fields(fields);

        if self.options.add_caller {
            entry = entry.with_caller(caller::resolve(location, self.options.caller_skip));
        }
        if let Some(min) = self.options.stacktrace_level {
            if level >= min {
                entry = entry.with_stack(caller::capture_stack());
            }
        }

        self.dispatch(&entry);
    }

    fn dispatch(&self, entry: &LogEntry) {
        let delivery = self.tee.write(entry);
        for (sink, e) in &delivery.errors {
            self.metrics.record_write_error();
            eprintln!("[LOGGER ERROR] Sink '{}' failed: {}", sink, e);
        }
        if delivery.delivered > 0 {
            self.metrics.record_logged();
        } else if delivery.errors.is_empty() {
            // gate raised between the enabled check and delivery
            self.metrics.record_filtered();
        }
    }

    /// Flush every sink
    pub fn sync(&self) -> Result<()> {
        self.tee.sync()
    }

    #[inline]
    #[track_caller]
    pub fn trace(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Trace, message);
    }

    #[inline]
    #[track_caller]
    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    #[track_caller]
    pub fn info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    #[track_caller]
    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warn, message);
    }

    #[inline]
    #[track_caller]
    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message);
    }

    /// Log at panic level, then panic with the message
    #[track_caller]
    pub fn panic(&self, message: impl AsRef<str>) -> ! {
        let message = message.as_ref();
        self.log(LogLevel::Panic, message);
        panic!("{}", message);
    }

    /// Log at fatal level and flush every sink
    #[track_caller]
    pub fn fatal(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Fatal, message);
        if let Err(e) = self.sync() {
            eprintln!("[LOGGER ERROR] Failed to flush after fatal record: {}", e);
        }
    }

    #[track_caller]
    pub fn debug_with<I: IntoIterator<Item = Field>>(&self, message: impl AsRef<str>, fields: I) {
        self.log_with(LogLevel::Debug, message, fields);
    }

    #[track_caller]
    pub fn info_with<I: IntoIterator<Item = Field>>(&self, message: impl AsRef<str>, fields: I) {
        self.log_with(LogLevel::Info, message, fields);
    }

    #[track_caller]
    pub fn warn_with<I: IntoIterator<Item = Field>>(&self, message: impl AsRef<str>, fields: I) {
        self.log_with(LogLevel::Warn, message, fields);
    }

    #[track_caller]
    pub fn error_with<I: IntoIterator<Item = Field>>(&self, message: impl AsRef<str>, fields: I) {
        self.log_with(LogLevel::Error, message, fields);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("cores", &self.tee.len())
            .field("options", &self.options)
            .field("fields", &self.fields)
            .finish()
    }
}
