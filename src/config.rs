//! Declarative pipeline configuration
//!
//! A [`LoggerConfig`] is usually deserialized from JSON (camelCase keys) and
//! then turned into a [`Logger`](crate::core::Logger) with
//! [`LoggerConfig::build`].

use crate::core::{AtomicLevel, LogLevel, Logger, LoggerError, Result};
use crate::level_server::LevelServer;
use crate::pipeline;
use crate::sinks::rotating_file::{megabytes_to_bytes, MAX_AGE_DAYS_LIMIT};
use crate::sinks::{ReportConfig, RotationPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Destination selector, either stdout or rotating files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Console,
    File,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Console => "console",
            Mode::File => "file",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "console" => Ok(Mode::Console),
            "file" => Ok(Mode::File),
            _ => Err(LoggerError::config("mode", "mode must be console or file")),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Pipeline configuration
///
/// Cloning a config shares its severity gate: adjusting the level of either
/// copy changes both, and every logger built from them.
///
/// # Examples
///
/// ```
/// use rust_log_pipeline::config::{LoggerConfig, Mode};
/// use rust_log_pipeline::core::LogLevel;
///
/// let config = LoggerConfig::from_json_str(
///     r#"{"name":"billing","level":"debug","mode":"console","json":true}"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.mode, Mode::Console);
/// assert_eq!(config.level.level(), LogLevel::Debug);
/// assert!(config.add_caller);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerConfig {
    /// Project name bound to every record as `project`
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub level: AtomicLevel,
    /// Attach stack traces to panic and fatal records
    #[serde(default = "default_true")]
    pub stacktrace: bool,
    #[serde(default = "default_true")]
    pub add_caller: bool,
    /// Extra frames to skip past the logging call when reporting the caller.
    /// Resolving them needs debug info; builds without it report the logging
    /// call itself.
    #[serde(default, alias = "callerShip")]
    pub caller_skip: usize,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default, alias = "filename")]
    pub file_name: String,
    /// Second file receiving only error-and-above records
    #[serde(default)]
    pub error_file_name: String,
    /// Megabytes per file before rotation; zero means 100
    #[serde(default, alias = "maxSizeMB")]
    pub max_size: u64,
    #[serde(default, alias = "maxAgeDays")]
    pub max_age: u64,
    #[serde(default, alias = "maxBackUp")]
    pub max_backups: usize,
    #[serde(default)]
    pub compress: bool,
    /// Buffer the primary and error files in memory; the console copy and the
    /// report sink are always written directly
    #[serde(default, rename = "async")]
    pub async_write: bool,
    #[serde(default)]
    pub json: bool,
    /// Color the level in console encoding; ignored with `json`
    #[serde(default = "default_true")]
    pub color: bool,
    /// Also write to stdout in file mode
    #[serde(default, alias = "consoleAlso")]
    pub console: bool,
    /// Loopback port of the level-control endpoint; zero disables it
    #[serde(default)]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_config: Option<ReportConfig>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            level: AtomicLevel::default(),
            stacktrace: true,
            add_caller: true,
            caller_skip: 0,
            mode: Mode::Console,
            file_name: String::new(),
            error_file_name: String::new(),
            max_size: 0,
            max_age: 0,
            max_backups: 0,
            compress: false,
            async_write: false,
            json: false,
            color: true,
            console: false,
            port: 0,
            report_config: None,
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document; unknown modes and level names are rejected
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: LoggerConfig = serde_json::from_str(text)?;
        Ok(config)
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace the severity gate with a fresh one at `level`
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = AtomicLevel::new(level);
        self
    }

    /// Use an existing gate, so several pipelines follow one level
    #[must_use]
    pub fn with_gate(mut self, gate: AtomicLevel) -> Self {
        self.level = gate;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Switch to file mode writing `path`
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.mode = Mode::File;
        self.file_name = path.into();
        self
    }

    #[must_use]
    pub fn with_error_file(mut self, path: impl Into<String>) -> Self {
        self.error_file_name = path.into();
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, max_size_mb: u64, max_age_days: u64, max_backups: usize) -> Self {
        self.max_size = max_size_mb;
        self.max_age = max_age_days;
        self.max_backups = max_backups;
        self
    }

    #[must_use]
    pub fn with_compress(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    #[must_use]
    pub fn with_async(mut self, enabled: bool) -> Self {
        self.async_write = enabled;
        self
    }

    #[must_use]
    pub fn with_json(mut self, enabled: bool) -> Self {
        self.json = enabled;
        self
    }

    #[must_use]
    pub fn with_color(mut self, enabled: bool) -> Self {
        self.color = enabled;
        self
    }

    #[must_use]
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    #[must_use]
    pub fn with_caller(mut self, enabled: bool, skip: usize) -> Self {
        self.add_caller = enabled;
        self.caller_skip = skip;
        self
    }

    #[must_use]
    pub fn with_stacktrace(mut self, enabled: bool) -> Self {
        self.stacktrace = enabled;
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_report(mut self, report: ReportConfig) -> Self {
        self.report_config = Some(report);
        self
    }

    /// Change the minimum level of every logger built from this config
    pub fn update_level(&self, level: LogLevel) {
        self.level.set_level(level);
    }

    /// Rotation settings shared by the primary and error files
    pub fn rotation_policy(&self) -> RotationPolicy {
        RotationPolicy::new()
            .with_max_size_mb(self.max_size)
            .with_max_age_days(self.max_age)
            .with_max_backups(self.max_backups)
            .with_compression(self.compress)
            .with_local_time(true)
    }

    /// Check the settings that must hold before any sink is opened
    pub fn validate(&self) -> Result<()> {
        if self.mode == Mode::File && self.file_name.trim().is_empty() {
            return Err(LoggerError::config(
                "fileName",
                "file mode, but file name is empty",
            ));
        }
        if megabytes_to_bytes(self.max_size).is_none() {
            return Err(LoggerError::config(
                "maxSize",
                format!("{} megabytes does not fit in a byte count", self.max_size),
            ));
        }
        if self.max_age > MAX_AGE_DAYS_LIMIT {
            return Err(LoggerError::config(
                "maxAge",
                format!("{} days exceeds the limit of {}", self.max_age, MAX_AGE_DAYS_LIMIT),
            ));
        }
        if let Some(ref report) = self.report_config {
            report.validate()?;
        }
        Ok(())
    }

    /// Build the pipeline, starting the level endpoint through the process-wide latch
    pub fn build(&self) -> Result<Logger> {
        self.build_with(LevelServer::global())
    }

    /// Build the pipeline, starting the level endpoint through `server`
    pub fn build_with(&self, server: &LevelServer) -> Result<Logger> {
        pipeline::build(self, server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoggerConfig::new();
        assert!(config.stacktrace);
        assert!(config.add_caller);
        assert_eq!(config.caller_skip, 0);
        assert_eq!(config.mode, Mode::Console);
        assert!(config.color);
        assert!(!config.json);
        assert_eq!(config.level.level(), LogLevel::Info);
        assert_eq!(config.port, 0);
        assert!(config.report_config.is_none());
    }

    #[test]
    fn test_empty_json_matches_defaults() {
        let config = LoggerConfig::from_json_str("{}").unwrap();
        assert!(config.stacktrace);
        assert!(config.add_caller);
        assert!(config.color);
        assert_eq!(config.mode, Mode::Console);
        assert_eq!(config.level.level(), LogLevel::Info);
    }

    #[test]
    fn test_full_json_document() {
        let config = LoggerConfig::from_json_str(
            r#"{
                "name": "orders",
                "level": "warning",
                "mode": "file",
                "fileName": "/tmp/orders.log",
                "errorFileName": "/tmp/orders-error.log",
                "maxSize": 20,
                "maxAge": 7,
                "maxBackups": 3,
                "compress": true,
                "async": true,
                "json": true,
                "console": true,
                "callerSkip": 1,
                "port": 9090,
                "reportConfig": {"address": "127.0.0.1:7000", "level": "error"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.name, "orders");
        assert_eq!(config.level.level(), LogLevel::Warn);
        assert_eq!(config.mode, Mode::File);
        assert_eq!(config.file_name, "/tmp/orders.log");
        assert_eq!(config.max_backups, 3);
        assert!(config.async_write);
        assert!(config.console);
        assert_eq!(config.caller_skip, 1);
        assert_eq!(config.port, 9090);
        assert_eq!(
            config.report_config.as_ref().map(|r| r.level.level()),
            Some(LogLevel::Error)
        );
    }

    #[test]
    fn test_legacy_key_aliases() {
        let config = LoggerConfig::from_json_str(
            r#"{"mode":"file","filename":"a.log","maxBackUp":4,"callerShip":2,"maxSizeMB":8}"#,
        )
        .unwrap();
        assert_eq!(config.file_name, "a.log");
        assert_eq!(config.max_backups, 4);
        assert_eq!(config.caller_skip, 2);
        assert_eq!(config.max_size, 8);
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        assert!(LoggerConfig::from_json_str(r#"{"mode":"syslog"}"#).is_err());

        let err = "syslog".parse::<Mode>().unwrap_err();
        assert!(err.is_config());
        assert_eq!(" File ".parse::<Mode>().unwrap(), Mode::File);
    }

    #[test]
    fn test_unknown_level_is_rejected() {
        assert!(LoggerConfig::from_json_str(r#"{"level":"loud"}"#).is_err());
    }

    #[test]
    fn test_file_mode_requires_file_name() {
        let config = LoggerConfig::new().with_mode(Mode::File);
        let err = config.validate().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("file name is empty"));

        assert!(LoggerConfig::new().with_file("app.log").validate().is_ok());
    }

    #[test]
    fn test_out_of_range_rotation_limits_are_rejected() {
        let err = LoggerConfig::from_json_str(r#"{"mode":"file","fileName":"a.log","maxSize":18000000000000}"#)
            .unwrap()
            .validate()
            .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("maxSize"));

        let err = LoggerConfig::from_json_str(
            r#"{"mode":"file","fileName":"a.log","maxSize":1,"maxAge":9000000000000000000}"#,
        )
        .unwrap()
        .validate()
        .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("maxAge"));

        let config = LoggerConfig::new()
            .with_file("a.log")
            .with_rotation(u64::MAX / (1024 * 1024), MAX_AGE_DAYS_LIMIT, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_update_level_is_shared_by_clones() {
        let config = LoggerConfig::new();
        let copy = config.clone();

        config.update_level(LogLevel::Error);
        assert_eq!(copy.level.level(), LogLevel::Error);

        let fresh = copy.with_level(LogLevel::Debug);
        assert_eq!(config.level.level(), LogLevel::Error);
        assert_eq!(fresh.level.level(), LogLevel::Debug);
    }

    #[test]
    fn test_rotation_policy_uses_local_time() {
        let policy = LoggerConfig::new()
            .with_rotation(5, 2, 9)
            .with_compress(true)
            .rotation_policy();
        assert_eq!(policy.max_bytes(), 5 * 1024 * 1024);
        assert_eq!(policy.max_age_days, 2);
        assert_eq!(policy.max_backups, 9);
        assert!(policy.compress);
        assert!(policy.local_time);
    }

    #[test]
    fn test_serializes_with_camel_case_keys() {
        let config = LoggerConfig::new().with_file("svc.log").with_async(true);
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["mode"], "file");
        assert_eq!(value["fileName"], "svc.log");
        assert_eq!(value["async"], true);
        assert_eq!(value["level"], "info");
        assert!(value.get("reportConfig").is_none());
    }
}
