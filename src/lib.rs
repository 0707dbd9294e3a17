//! # Rust Log Pipeline
//!
//! Builds a structured logging pipeline from declarative configuration.
//!
//! ## Features
//!
//! - **Console or rotating files**: size, age and count based rotation with gzip
//! - **Error file**: an optional second file receiving only error-and-above records
//! - **Buffering**: optional in-memory buffer flushed on overflow and on a timer
//! - **Encodings**: JSON lines or tab-separated console lines with colored levels
//! - **Report sink**: JSON records shipped to a remote collector over TCP
//! - **Live level control**: a loopback HTTP endpoint reads and sets the minimum level
//!
//! ## Example
//!
//! ```no_run
//! use rust_log_pipeline::prelude::*;
//!
//! let config = LoggerConfig::from_json_str(
//!     r#"{"name":"billing","mode":"file","fileName":"logs/billing.log","async":true,"port":9090}"#,
//! )?;
//! let logger = config.build()?;
//!
//! logger.info_with("invoice sent", [Field::new("id", 1042)]);
//! logger.sync()?;
//! # Ok::<(), LoggerError>(())
//! ```

pub mod adapters;
pub mod config;
pub mod core;
pub mod level_server;
pub mod macros;
pub mod pipeline;
pub mod sinks;

pub mod prelude {
    pub use crate::config::{LoggerConfig, Mode};
    pub use crate::core::{
        AtomicLevel, Encoder, Field, FieldValue, LogContext, LogLevel, Logger, LoggerError,
        LoggerMetrics, Result,
    };
    pub use crate::level_server::LevelServer;
    pub use crate::sinks::ReportConfig;
}

pub use config::{LoggerConfig, Mode};
pub use core::{
    AtomicLevel, CallerLocation, Encoder, Field, FieldValue, LogContext, LogCore, LogEntry,
    LogLevel, Logger, LoggerError, LoggerMetrics, LoggerOptions, Result, SharedSink, Sink, Tee,
    TIME_FORMAT,
};
pub use level_server::{LevelServer, ServerState};
pub use sinks::{BufferedSink, ConsoleSink, ReportConfig, ReportSink, RotatingFileSink, RotationPolicy};
