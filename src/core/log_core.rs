//! Logging cores and the fan-out tee
//!
//! A [`LogCore`] binds an encoder, a sink and a threshold. A [`Tee`] holds the
//! ordered cores and hands every record to each core whose threshold admits it.

use super::atomic_level::AtomicLevel;
use super::encoder::Encoder;
use super::error::{LoggerError, Result};
use super::log_entry::LogEntry;
use super::log_level::LogLevel;
use super::sink::SharedSink;

/// Minimum severity of a core
#[derive(Debug, Clone)]
pub enum Threshold {
    /// Read from a shared gate on every record
    Live(AtomicLevel),
    /// Fixed for the lifetime of the core
    Fixed(LogLevel),
}

impl Threshold {
    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        match self {
            Threshold::Live(gate) => gate.enabled(level),
            Threshold::Fixed(min) => level >= *min,
        }
    }

    pub fn level(&self) -> LogLevel {
        match self {
            Threshold::Live(gate) => gate.level(),
            Threshold::Fixed(min) => *min,
        }
    }
}

impl From<AtomicLevel> for Threshold {
    fn from(gate: AtomicLevel) -> Self {
        Threshold::Live(gate)
    }
}

impl From<LogLevel> for Threshold {
    fn from(level: LogLevel) -> Self {
        Threshold::Fixed(level)
    }
}

#[derive(Debug, Clone)]
pub struct LogCore {
    encoder: Encoder,
    sink: SharedSink,
    threshold: Threshold,
}

impl LogCore {
    pub fn new(encoder: Encoder, sink: SharedSink, threshold: impl Into<Threshold>) -> Self {
        Self {
            encoder,
            sink,
            threshold: threshold.into(),
        }
    }

    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.threshold.enabled(level)
    }

    /// Encode and write the entry if the threshold admits it.
    ///
    /// Returns `Ok(false)` when the entry was filtered out.
    pub fn write(&self, entry: &LogEntry) -> Result<bool> {
        if !self.enabled(entry.level) {
            return Ok(false);
        }
        self.sink.write(&self.encoder.encode(entry))?;
        Ok(true)
    }

    pub fn sync(&self) -> Result<()> {
        self.sink.flush()
    }

    pub fn encoder(&self) -> Encoder {
        self.encoder
    }

    pub fn threshold(&self) -> &Threshold {
        &self.threshold
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }
}

/// Outcome of delivering one record through a tee
#[derive(Debug, Default)]
pub struct Delivery {
    pub delivered: usize,
    pub errors: Vec<(String, LoggerError)>,
}

/// Fan-out dispatcher over an ordered set of cores
#[derive(Debug, Clone, Default)]
pub struct Tee {
    cores: Vec<LogCore>,
}

impl Tee {
    pub fn new(cores: Vec<LogCore>) -> Self {
        Self { cores }
    }

    /// Whether any core would accept a record at `level`
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.cores.iter().any(|core| core.enabled(level))
    }

    /// Deliver to every qualifying core; one failing core does not stop the rest
    pub fn write(&self, entry: &LogEntry) -> Delivery {
        let mut delivery = Delivery::default();
        for core in &self.cores {
            match core.write(entry) {
                Ok(true) => delivery.delivered += 1,
                Ok(false) => {}
                Err(e) => delivery.errors.push((core.sink_name().to_string(), e)),
            }
        }
        delivery
    }

    /// Flush every core, returning the first error after trying them all
    pub fn sync(&self) -> Result<()> {
        let mut first_error = None;
        for core in &self.cores {
            if let Err(e) = core.sync() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn cores(&self) -> &[LogCore] {
        &self.cores
    }

    pub fn len(&self) -> usize {
        self.cores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }
}
