//! Request logging for HTTP servers
//!
//! [`format_request`] renders one access-log line and [`LevelWriter`] lets a
//! framework that only knows `io::Write` feed those lines into a [`Logger`].

use crate::core::{LogLevel, Logger};
use std::fmt;
use std::io;
use std::time::Duration;

/// Latency above which the reported cost is truncated to whole seconds
pub const LATENCY_TRUNCATE_AFTER: Duration = Duration::from_secs(60);

/// What the server knows about a finished request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLogParams {
    pub status_code: u16,
    pub path: String,
    pub method: String,
    pub latency: Duration,
    pub client_ip: String,
}

impl RequestLogParams {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            path: path.into(),
            method: method.into(),
            latency: Duration::ZERO,
            client_ip: String::new(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    #[must_use]
    pub fn with_client_ip(mut self, client_ip: impl Into<String>) -> Self {
        self.client_ip = client_ip.into();
        self
    }
}

/// Render the access-log line for one request
///
/// ```
/// use rust_log_pipeline::adapters::request_log::{format_request, RequestLogParams};
/// use std::time::Duration;
///
/// let params = RequestLogParams::new("GET", "/health")
///     .with_latency(Duration::from_millis(3))
///     .with_client_ip("10.0.0.7");
///
/// assert_eq!(
///     format_request(&params),
///     "[HTTP] statusCode:200 path:/health method:GET cost:3ms clientIp:10.0.0.7"
/// );
/// ```
pub fn format_request(params: &RequestLogParams) -> String {
    let latency = if params.latency > LATENCY_TRUNCATE_AFTER {
        Duration::from_secs(params.latency.as_secs())
    } else {
        params.latency
    };

    format!(
        "[HTTP] statusCode:{} path:{} method:{} cost:{:?} clientIp:{}",
        params.status_code, params.path, params.method, latency, params.client_ip
    )
}

/// `io::Write` adapter logging every written line at a fixed level
///
/// `write`, `write_all` and `write_fmt` are `#[track_caller]`, so a
/// `writeln!` into the writer reports the line that wrote it.
#[derive(Debug, Clone)]
pub struct LevelWriter {
    logger: Logger,
    level: LogLevel,
}

impl LevelWriter {
    pub fn new(logger: Logger, level: LogLevel) -> Self {
        Self { logger, level }
    }

    /// Writer at debug level, the usual home of access logs
    pub fn debug(logger: Logger) -> Self {
        Self::new(logger, LogLevel::Debug)
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Format and log one finished request
    #[track_caller]
    pub fn log_request(&self, params: &RequestLogParams) {
        self.logger.log(self.level, format_request(params));
    }
}

impl io::Write for LevelWriter {
    #[track_caller]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            self.logger.log(self.level, line);
        }
        Ok(buf.len())
    }

    #[track_caller]
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.write(buf).map(|_| ())
    }

    #[track_caller]
    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> io::Result<()> {
        self.write_all(args.to_string().as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.logger
            .sync()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Encoder, LogCore, LoggerOptions, MemorySink, SharedSink};
    use std::io::Write;

    fn memory_logger(level: LogLevel) -> (Logger, MemorySink) {
        let memory = MemorySink::new();
        let logger = Logger::from_cores(vec![LogCore::new(
            Encoder::Json,
            SharedSink::new(memory.clone()),
            level,
        )]);
        (logger, memory)
    }

    #[test]
    fn test_format_short_latency() {
        let params = RequestLogParams::new("POST", "/orders")
            .with_status(201)
            .with_latency(Duration::from_micros(1500))
            .with_client_ip("127.0.0.1");
        assert_eq!(
            format_request(&params),
            "[HTTP] statusCode:201 path:/orders method:POST cost:1.5ms clientIp:127.0.0.1"
        );
    }

    #[test]
    fn test_format_truncates_long_latency() {
        let params = RequestLogParams::new("GET", "/export")
            .with_latency(Duration::from_millis(61_750))
            .with_client_ip("10.1.1.1");
        assert!(format_request(&params).contains("cost:61s "));

        let at_limit = RequestLogParams::new("GET", "/").with_latency(Duration::from_millis(59_500));
        assert!(format_request(&at_limit).contains("cost:59.5s "));
    }

    #[test]
    fn test_writer_logs_each_line_at_its_level() {
        let (logger, memory) = memory_logger(LogLevel::Debug);
        let mut writer = LevelWriter::debug(logger);

        writer.write_all(b"first line\nsecond line\n\n").unwrap();
        writer.flush().unwrap();

        let lines = memory.lines();
        assert_eq!(lines.len(), 2);
        let record: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(record["level"], "debug");
        assert_eq!(record["msg"], "second line");
    }

    #[test]
    fn test_writer_reports_writing_line_as_caller() {
        let (logger, memory) = memory_logger(LogLevel::Debug);
        let mut writer =
            LevelWriter::debug(logger.with_options(LoggerOptions::new().with_caller(true)));

        let writeln_line = line!() + 1;
        writeln!(writer, "GET /health 200").unwrap();
        let write_all_line = line!() + 1;
        writer.write_all(b"POST /orders 201\n").unwrap();
        let request_line = line!() + 1;
        writer.log_request(&RequestLogParams::new("GET", "/"));

        let callers: Vec<String> = memory
            .lines()
            .iter()
            .map(|l| {
                let record: serde_json::Value = serde_json::from_str(l).unwrap();
                record["caller"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(callers.len(), 3);
        for (caller, line) in callers.iter().zip([writeln_line, write_all_line, request_line]) {
            assert!(caller.ends_with(&format!("request_log.rs:{}", line)), "{}", caller);
        }
    }

    #[test]
    fn test_writer_respects_gate() {
        let (logger, memory) = memory_logger(LogLevel::Info);
        let writer = LevelWriter::debug(logger);

        writer.log_request(&RequestLogParams::new("GET", "/quiet"));
        assert!(memory.contents().is_empty());

        let (logger, memory) = memory_logger(LogLevel::Info);
        LevelWriter::new(logger, LogLevel::Warn).log_request(&RequestLogParams::new("GET", "/loud"));
        assert!(memory.contents().contains("path:/loud"));
    }
}
