//! Sink trait for byte-oriented log destinations

use super::error::Result;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// A destination that accepts encoded records as raw bytes.
///
/// Decorators (buffering, locking) implement the same trait around an inner
/// sink, so they compose in any order.
pub trait Sink: Send {
    fn write(&mut self, buf: &[u8]) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}

impl Sink for Box<dyn Sink> {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        (**self).write(buf)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Lock wrapper serializing writes to one sink from any number of cores
#[derive(Clone)]
pub struct SharedSink {
    name: Arc<str>,
    inner: Arc<Mutex<Box<dyn Sink>>>,
}

impl SharedSink {
    pub fn new<S: Sink + 'static>(sink: S) -> Self {
        Self::from_boxed(Box::new(sink))
    }

    pub fn from_boxed(sink: Box<dyn Sink>) -> Self {
        Self {
            name: Arc::from(sink.name()),
            inner: Arc::new(Mutex::new(sink)),
        }
    }

    pub fn write(&self, buf: &[u8]) -> Result<()> {
        self.inner.lock().write(buf)
    }

    pub fn flush(&self) -> Result<()> {
        self.inner.lock().flush()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for SharedSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSink").field("name", &self.name).finish()
    }
}

/// In-memory sink, handy for tests and for capturing output
#[derive(Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
    writes: Arc<Mutex<usize>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, as text
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Written records split into lines
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    /// Number of write calls received
    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }
}

impl Sink for MemorySink {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.buffer.lock().extend_from_slice(buf);
        *self.writes.lock() += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
