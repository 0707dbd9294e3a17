//! Leveled writer facade
//!
//! [`LogWriter`] is the interface a service framework logs through. The
//! [`LoggerWriter`] implementation maps its verbs onto pipeline levels:
//!
//! | verb   | level                  |
//! |--------|------------------------|
//! | alert  | error                  |
//! | debug  | debug                  |
//! | error  | error                  |
//! | info   | info                   |
//! | severe | panic                  |
//! | slow   | warn                   |
//! | stack  | error, with a `stack` field |
//! | stat   | info                   |

use crate::core::{caller, Field, FieldValue, Logger, Result};
use serde::Serialize;
use std::fmt;

pub const ERROR_KEY: &str = "error";
pub const DATA_KEY: &str = "data";
pub const PARAM_KEY: &str = "param";
pub const STACK_KEY: &str = "stack";

/// Field carrying an error's message
pub fn error_field(err: &dyn std::error::Error) -> Field {
    Field::new(ERROR_KEY, err.to_string())
}

/// Field carrying arbitrary data, serialized to JSON
pub fn data_field<T: Serialize + ?Sized>(data: &T) -> Field {
    Field::new(DATA_KEY, to_field_value(data))
}

/// Field carrying the input parameters of an operation
pub fn param_field<T: Serialize + ?Sized>(params: &T) -> Field {
    Field::new(PARAM_KEY, to_field_value(params))
}

fn to_field_value<T: Serialize + ?Sized>(value: &T) -> FieldValue {
    match serde_json::to_value(value) {
        Ok(json) => FieldValue::Json(json),
        Err(e) => FieldValue::String(format!("<unserializable: {}>", e)),
    }
}

/// Verbs a service framework logs through
///
/// Every logging verb is `#[track_caller]`, so records report the code that
/// called the facade.
pub trait LogWriter: Send + Sync {
    #[track_caller]
    fn alert(&self, v: &dyn fmt::Display);
    fn close(&self) -> Result<()>;
    #[track_caller]
    fn debug(&self, v: &dyn fmt::Display, fields: &[Field]);
    #[track_caller]
    fn error(&self, v: &dyn fmt::Display, fields: &[Field]);
    #[track_caller]
    fn info(&self, v: &dyn fmt::Display, fields: &[Field]);
    /// Log and abort the current thread with a panic
    #[track_caller]
    fn severe(&self, v: &dyn fmt::Display);
    #[track_caller]
    fn slow(&self, v: &dyn fmt::Display, fields: &[Field]);
    #[track_caller]
    fn stack(&self, v: &dyn fmt::Display);
    #[track_caller]
    fn stat(&self, v: &dyn fmt::Display, fields: &[Field]);
}

/// [`LogWriter`] backed by a pipeline [`Logger`]
#[derive(Debug, Clone)]
pub struct LoggerWriter {
    logger: Logger,
}

impl LoggerWriter {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

impl LogWriter for LoggerWriter {
    #[track_caller]
    fn alert(&self, v: &dyn fmt::Display) {
        self.logger.error(v.to_string());
    }

    fn close(&self) -> Result<()> {
        self.logger.sync()
    }

    #[track_caller]
    fn debug(&self, v: &dyn fmt::Display, fields: &[Field]) {
        self.logger.debug_with(v.to_string(), fields.iter().cloned());
    }

    #[track_caller]
    fn error(&self, v: &dyn fmt::Display, fields: &[Field]) {
        self.logger.error_with(v.to_string(), fields.iter().cloned());
    }

    #[track_caller]
    fn info(&self, v: &dyn fmt::Display, fields: &[Field]) {
        self.logger.info_with(v.to_string(), fields.iter().cloned());
    }

    #[track_caller]
    fn severe(&self, v: &dyn fmt::Display) {
        self.logger.panic(v.to_string());
    }

    #[track_caller]
    fn slow(&self, v: &dyn fmt::Display, fields: &[Field]) {
        self.logger.warn_with(v.to_string(), fields.iter().cloned());
    }

    #[track_caller]
    fn stack(&self, v: &dyn fmt::Display) {
        self.logger
            .error_with(v.to_string(), [Field::new(STACK_KEY, caller::capture_stack())]);
    }

    #[track_caller]
    fn stat(&self, v: &dyn fmt::Display, fields: &[Field]) {
        self.logger.info_with(v.to_string(), fields.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Encoder, LogCore, LogLevel, LoggerOptions, MemorySink, SharedSink};
    use serde_json::{json, Value};

    fn writer() -> (LoggerWriter, MemorySink) {
        let memory = MemorySink::new();
        let logger = Logger::from_cores(vec![LogCore::new(
            Encoder::Json,
            SharedSink::new(memory.clone()),
            LogLevel::Trace,
        )]);
        (LoggerWriter::new(logger), memory)
    }

    fn records(memory: &MemorySink) -> Vec<Value> {
        memory
            .lines()
            .iter()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_verbs_map_to_levels() {
        let (writer, memory) = writer();

        writer.alert(&"disk almost full");
        writer.debug(&"cache miss", &[]);
        writer.error(&"query failed", &[]);
        writer.info(&"started", &[]);
        writer.slow(&"slow call", &[]);
        writer.stat(&"qps=120", &[]);

        let levels: Vec<_> = records(&memory)
            .iter()
            .map(|r| r["level"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(levels, ["error", "debug", "error", "info", "warn", "info"]);
    }

    #[test]
    fn test_caller_is_the_code_using_the_facade() {
        let (writer, memory) = writer();
        let writer = LoggerWriter::new(
            writer
                .logger()
                .clone()
                .with_options(LoggerOptions::new().with_caller(true)),
        );

        let info_line = line!() + 1;
        writer.info(&"handled", &[]);
        let slow_line = line!() + 1;
        writer.slow(&"slow call", &[]);
        let stack_line = line!() + 1;
        writer.stack(&"odd state");

        let callers: Vec<_> = records(&memory)
            .iter()
            .map(|r| r["caller"].as_str().unwrap().to_string())
            .collect();
        for (caller, line) in callers.iter().zip([info_line, slow_line, stack_line]) {
            assert!(caller.ends_with(&format!("facade.rs:{}", line)), "{}", caller);
        }
    }

    #[test]
    fn test_stack_attaches_trace_field() {
        let (writer, memory) = writer();
        writer.stack(&"unexpected state");

        let record = &records(&memory)[0];
        assert_eq!(record["level"], "error");
        assert!(record[STACK_KEY].is_string());
    }

    #[test]
    #[should_panic(expected = "corrupted")]
    fn test_severe_panics_after_logging() {
        let (writer, _memory) = writer();
        writer.severe(&"corrupted");
    }

    #[test]
    fn test_field_helpers() {
        let (writer, memory) = writer();
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such user");

        writer.error(
            &"lookup failed",
            &[
                error_field(&err),
                data_field(&json!({"id": 7})),
                param_field(&["a", "b"]),
            ],
        );

        let record = &records(&memory)[0];
        assert_eq!(record[ERROR_KEY], "no such user");
        assert_eq!(record[DATA_KEY], json!({"id": 7}));
        assert_eq!(record[PARAM_KEY], json!(["a", "b"]));
    }

    #[test]
    fn test_close_syncs() {
        let (writer, _memory) = writer();
        assert!(writer.close().is_ok());
    }
}
