//! Sink implementations

pub mod buffered;
pub mod console;
pub mod report;
pub mod rotating_file;

pub use buffered::{BufferedSink, DEFAULT_BUFFER_SIZE, DEFAULT_FLUSH_INTERVAL};
pub use console::ConsoleSink;
pub use report::{ReportConfig, ReportSink};
pub use rotating_file::{RotatingFileSink, RotationPolicy, DEFAULT_MAX_SIZE_MB};

pub use crate::core::{MemorySink, SharedSink, Sink};
