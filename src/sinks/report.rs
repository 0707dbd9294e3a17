//! Report sink for remote collection
//!
//! Ships each encoded record as a JSON line to a collector over TCP.

use crate::core::{AtomicLevel, LogLevel, LoggerError, Result, Sink};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Threshold of the report core when its config leaves the level unset
pub const DEFAULT_REPORT_LEVEL: LogLevel = LogLevel::Warn;

fn default_report_level() -> AtomicLevel {
    AtomicLevel::new(DEFAULT_REPORT_LEVEL)
}

fn default_reconnect() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    5
}

/// Where and at what severity records are reported
///
/// `level` is the report core's own gate, `warn` unless configured. Clones
/// share it, so the level can be moved after the pipeline is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportConfig {
    /// Collector address as `host:port`
    pub address: String,
    #[serde(default = "default_report_level")]
    pub level: AtomicLevel,
    /// Reconnect and resend once when a write fails
    #[serde(default = "default_reconnect")]
    pub reconnect: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ReportConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            level: default_report_level(),
            reconnect: default_reconnect(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Use a fresh gate starting at `level`
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = AtomicLevel::new(level);
        self
    }

    /// Share an existing gate with the report core
    #[must_use]
    pub fn with_gate(mut self, gate: AtomicLevel) -> Self {
        self.level = gate;
        self
    }

    /// Move the report threshold of every pipeline built from this config
    pub fn update_level(&self, level: LogLevel) {
        self.level.set_level(level);
    }

    #[must_use]
    pub fn with_reconnect(mut self, enabled: bool) -> Self {
        self.reconnect = enabled;
        self
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(LoggerError::config("reportConfig", "address is empty"));
        }
        if !self.address.contains(':') {
            return Err(LoggerError::config(
                "reportConfig",
                format!("address '{}' is not host:port", self.address),
            ));
        }
        Ok(())
    }
}

/// Sink that sends records to a remote collector
///
/// The connection is opened on first write, so building a pipeline never
/// blocks on an unreachable collector.
pub struct ReportSink {
    stream: Option<TcpStream>,
    address: String,
    reconnect_on_error: bool,
    timeout: Duration,
}

impl ReportSink {
    pub fn new(config: &ReportConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            stream: None,
            address: config.address.clone(),
            reconnect_on_error: config.reconnect,
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Try each resolved address in turn, each bounded by the write timeout
    fn open(&self) -> io::Result<TcpStream> {
        let mut last_err = None;
        for addr in self.address.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "address resolved to nothing")
        }))
    }

    fn connect(&mut self) -> Result<()> {
        let stream = self.open().map_err(|e| {
            LoggerError::io_operation(
                "connect report sink",
                format!("Failed to connect to {}", self.address),
                e,
            )
        })?;
        stream.set_write_timeout(Some(self.timeout))?;
        stream.set_nodelay(true)?;

        self.stream = Some(stream);
        Ok(())
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<()> {
        match self.stream {
            Some(ref mut stream) => stream.write_all(buf),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "report stream not connected",
            )),
        }
    }
}

impl Sink for ReportSink {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        if self.stream.is_none() {
            self.connect()?;
        }

        match self.send(buf) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.stream = None;
                if !self.reconnect_on_error {
                    return Err(e.into());
                }

                match self.connect() {
                    Ok(()) => self.send(buf).map_err(|resend_err| {
                        self.stream = None;
                        LoggerError::writer(format!("Failed to resend report: {}", resend_err))
                    }),
                    Err(reconnect_err) => Err(LoggerError::writer(format!(
                        "Failed to send report and reconnect: {} (reconnect: {})",
                        e, reconnect_err
                    ))),
                }
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut stream) = self.stream {
            stream.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "report"
    }
}

impl Drop for ReportSink {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::io::{BufRead, BufReader};
    use std::net::{Shutdown, TcpListener};
    use std::thread;

    fn read_lines(stream: TcpStream) -> Vec<String> {
        BufReader::new(stream).lines().map_while(|l| l.ok()).collect()
    }

    fn break_connection(sink: &ReportSink) {
        sink.stream
            .as_ref()
            .unwrap()
            .shutdown(Shutdown::Write)
            .unwrap();
    }

    #[test]
    fn test_clones_share_the_level() {
        let config = ReportConfig::new("127.0.0.1:9000");
        let copy = config.clone();

        copy.update_level(LogLevel::Error);
        assert_eq!(config.level.level(), LogLevel::Error);

        let gate = AtomicLevel::new(LogLevel::Info);
        let config = ReportConfig::new("127.0.0.1:9000").with_gate(gate.clone());
        assert!(config.level.shares_cell_with(&gate));
    }

    #[test]
    fn test_unresolvable_address_is_a_write_error() {
        let mut sink =
            ReportSink::new(&ReportConfig::new("no-such-host.invalid:9000").with_reconnect(false))
                .unwrap();
        assert!(sink.write(b"lost\n").is_err());
        assert!(!sink.is_connected());
    }

    #[test]
    fn test_reconnects_and_resends_after_broken_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let collector = thread::spawn(move || {
            let (first, _) = listener.accept().unwrap();
            let first_lines = read_lines(first);
            let (second, _) = listener.accept().unwrap();
            let second_lines: Vec<String> = BufReader::new(second)
                .lines()
                .take(1)
                .map(|l| l.unwrap())
                .collect();
            (first_lines, second_lines)
        });

        let mut sink = ReportSink::new(&ReportConfig::new(&address)).unwrap();
        sink.write(b"{\"msg\":\"one\"}\n").unwrap();
        break_connection(&sink);

        sink.write(b"{\"msg\":\"two\"}\n").unwrap();
        assert!(sink.is_connected());

        let (first_lines, second_lines) = collector.join().unwrap();
        assert_eq!(first_lines, ["{\"msg\":\"one\"}"]);
        assert_eq!(second_lines, ["{\"msg\":\"two\"}"]);
    }

    #[test]
    fn test_failed_reconnect_reports_both_errors() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let (closed_tx, closed_rx) = bounded(1);

        let collector = thread::spawn(move || {
            let (first, _) = listener.accept().unwrap();
            drop(listener);
            closed_tx.send(()).unwrap();
            read_lines(first)
        });

        let mut sink = ReportSink::new(&ReportConfig::new(&address)).unwrap();
        sink.write(b"{\"msg\":\"one\"}\n").unwrap();
        closed_rx.recv().unwrap();
        break_connection(&sink);

        let err = sink.write(b"{\"msg\":\"two\"}\n").unwrap_err();
        assert!(err.to_string().contains("reconnect"), "{}", err);
        assert!(!sink.is_connected());
        assert_eq!(collector.join().unwrap(), ["{\"msg\":\"one\"}"]);
    }

    #[test]
    fn test_broken_connection_without_reconnect_fails_once() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let collector = thread::spawn(move || {
            let (first, _) = listener.accept().unwrap();
            read_lines(first)
        });

        let mut sink = ReportSink::new(&ReportConfig::new(&address).with_reconnect(false)).unwrap();
        sink.write(b"kept\n").unwrap();
        break_connection(&sink);

        assert!(sink.write(b"dropped\n").is_err());
        assert!(!sink.is_connected());
        assert_eq!(collector.join().unwrap(), ["kept"]);
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: ReportConfig = serde_json::from_str(r#"{"address":"127.0.0.1:9000"}"#).unwrap();
        assert_eq!(config.level.level(), DEFAULT_REPORT_LEVEL);
        assert!(config.reconnect);
        assert_eq!(config.timeout_secs, 5);

        let config: ReportConfig =
            serde_json::from_str(r#"{"address":"collector:9000","level":"error","timeoutSecs":2}"#)
                .unwrap();
        assert_eq!(config.level.level(), LogLevel::Error);
        assert_eq!(config.timeout_secs, 2);
    }

    #[test]
    fn test_config_validation() {
        assert!(ReportConfig::new("").validate().is_err());
        assert!(ReportConfig::new("no-port").validate().is_err());
        assert!(ReportConfig::new("127.0.0.1:9000").validate().is_ok());
    }

    #[test]
    fn test_connects_lazily_and_sends_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let reader = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut lines = Vec::new();
            for line in BufReader::new(stream).lines().take(2) {
                lines.push(line.unwrap());
            }
            lines
        });

        let mut sink = ReportSink::new(&ReportConfig::new(&address)).unwrap();
        assert!(!sink.is_connected());

        sink.write(b"{\"msg\":\"one\"}\n").unwrap();
        sink.write(b"{\"msg\":\"two\"}\n").unwrap();
        sink.flush().unwrap();
        assert!(sink.is_connected());

        let lines = reader.join().unwrap();
        assert_eq!(lines, ["{\"msg\":\"one\"}", "{\"msg\":\"two\"}"]);
    }

    #[test]
    fn test_unreachable_collector_is_a_write_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let mut sink = ReportSink::new(&ReportConfig::new(address).with_reconnect(false)).unwrap();
        assert!(sink.write(b"lost\n").is_err());
        assert!(!sink.is_connected());
    }
}
