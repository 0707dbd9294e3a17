//! Core logger types and traits

pub mod atomic_level;
pub mod caller;
pub mod encoder;
pub mod error;
pub mod log_context;
pub mod log_core;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod sink;

pub use atomic_level::AtomicLevel;
pub use caller::CallerLocation;
pub use encoder::{Encoder, TIME_FORMAT};
pub use error::{LoggerError, Result};
pub use log_context::{Field, FieldValue, LogContext};
pub use log_core::{Delivery, LogCore, Tee, Threshold};
pub use log_entry::LogEntry;
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerOptions, DEFAULT_STACKTRACE_LEVEL};
pub use metrics::LoggerMetrics;
pub use sink::{MemorySink, SharedSink, Sink};
