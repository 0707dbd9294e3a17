//! Buffering decorator for sinks
//!
//! Collects encoded records in memory and hands them to the wrapped sink when
//! the buffer would overflow, on a fixed interval, on explicit flush, and when
//! the decorator is stopped or dropped.

use crate::core::{Result, Sink};
use crossbeam_channel::{bounded, select, tick, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Buffer capacity used by the pipeline (256 KiB)
pub const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// Interval between background flushes used by the pipeline
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

struct BufferState {
    inner: Box<dyn Sink>,
    buffer: Vec<u8>,
}

impl BufferState {
    fn drain(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let result = self.inner.write(&self.buffer);
        self.buffer.clear();
        result
    }
}

/// Sink decorator that batches writes in memory
///
/// # Examples
///
/// ```
/// use rust_log_pipeline::core::{MemorySink, Sink};
/// use rust_log_pipeline::sinks::BufferedSink;
///
/// let memory = MemorySink::new();
/// let mut sink = BufferedSink::new(memory.clone());
///
/// sink.write(b"held in memory\n").unwrap();
/// assert!(memory.contents().is_empty());
///
/// sink.flush().unwrap();
/// assert_eq!(memory.contents(), "held in memory\n");
/// ```
pub struct BufferedSink {
    name: String,
    state: Arc<Mutex<BufferState>>,
    capacity: usize,
    interval: Duration,
    stop_tx: Option<Sender<()>>,
    flusher: Option<thread::JoinHandle<()>>,
}

impl BufferedSink {
    /// Wrap `inner` with the default capacity and flush interval
    pub fn new<S: Sink + 'static>(inner: S) -> Self {
        Self::with_config(inner, DEFAULT_BUFFER_SIZE, DEFAULT_FLUSH_INTERVAL)
    }

    /// Wrap `inner` with an explicit capacity and flush interval
    pub fn with_config<S: Sink + 'static>(inner: S, capacity: usize, interval: Duration) -> Self {
        let name = format!("buffered({})", inner.name());
        let state = Arc::new(Mutex::new(BufferState {
            inner: Box::new(inner),
            buffer: Vec::with_capacity(capacity),
        }));

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let ticker = tick(interval);
        let flusher_state = Arc::clone(&state);
        let flusher = thread::Builder::new()
            .name("log-buffer-flusher".to_string())
            .spawn(move || loop {
                select! {
                    recv(ticker) -> _ => {
                        if let Err(e) = flusher_state.lock().drain() {
                            eprintln!("[LOGGER ERROR] Periodic flush failed: {}", e);
                        }
                    }
                    recv(stop_rx) -> _ => break,
                }
            });

        let flusher = match flusher {
            Ok(handle) => Some(handle),
            Err(e) => {
                eprintln!(
                    "[LOGGER WARNING] Could not start flush thread, buffer drains on overflow only: {}",
                    e
                );
                None
            }
        };

        Self {
            name,
            state,
            capacity,
            interval,
            stop_tx: Some(stop_tx),
            flusher,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        self.interval
    }

    /// Bytes waiting in the buffer
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    /// Stop the background flusher and drain whatever is buffered
    pub fn stop(&mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.flusher.take() {
            if let Err(e) = handle.join() {
                eprintln!("[LOGGER ERROR] Flush thread panicked: {:?}", e);
            }
        }

        let mut state = self.state.lock();
        state.drain()?;
        state.inner.flush()
    }
}

impl Sink for BufferedSink {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        let mut state = self.state.lock();

        if state.buffer.len() + buf.len() > self.capacity {
            state.drain()?;
        }
        if buf.len() >= self.capacity {
            return state.inner.write(buf);
        }

        state.buffer.extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.drain()?;
        state.inner.flush()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for BufferedSink {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            eprintln!("[LOGGER ERROR] Failed to drain buffer on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MemorySink;
    use std::time::Instant;

    const LONG: Duration = Duration::from_secs(3600);

    #[test]
    fn test_defaults() {
        let sink = BufferedSink::new(MemorySink::new());
        assert_eq!(sink.capacity(), 256 * 1024);
        assert_eq!(sink.flush_interval(), Duration::from_secs(30));
        assert_eq!(sink.name(), "buffered(memory)");
    }

    #[test]
    fn test_holds_writes_below_capacity() {
        let memory = MemorySink::new();
        let mut sink = BufferedSink::with_config(memory.clone(), 1024, LONG);

        sink.write(b"one\n").unwrap();
        sink.write(b"two\n").unwrap();

        assert_eq!(memory.write_count(), 0);
        assert_eq!(sink.buffered_len(), 8);
    }

    #[test]
    fn test_overflow_drains_previous_bytes() {
        let memory = MemorySink::new();
        let mut sink = BufferedSink::with_config(memory.clone(), 16, LONG);

        sink.write(b"0123456789\n").unwrap();
        sink.write(b"abcdefghij\n").unwrap();

        assert_eq!(memory.contents(), "0123456789\n");
        assert_eq!(sink.buffered_len(), 11);
    }

    #[test]
    fn test_oversized_write_goes_straight_through() {
        let memory = MemorySink::new();
        let mut sink = BufferedSink::with_config(memory.clone(), 8, LONG);

        sink.write(b"ab\n").unwrap();
        sink.write(b"much longer than capacity\n").unwrap();

        assert_eq!(memory.contents(), "ab\nmuch longer than capacity\n");
        assert_eq!(sink.buffered_len(), 0);
    }

    #[test]
    fn test_interval_flushes_in_background() {
        let memory = MemorySink::new();
        let mut sink = BufferedSink::with_config(memory.clone(), 1024, Duration::from_millis(20));

        sink.write(b"tick\n").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while memory.contents().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(memory.contents(), "tick\n");
    }

    #[test]
    fn test_stop_and_drop_drain() {
        let memory = MemorySink::new();
        let mut sink = BufferedSink::with_config(memory.clone(), 1024, LONG);
        sink.write(b"before stop\n").unwrap();
        sink.stop().unwrap();
        assert_eq!(memory.contents(), "before stop\n");

        let dropped = MemorySink::new();
        {
            let mut sink = BufferedSink::with_config(dropped.clone(), 1024, LONG);
            sink.write(b"before drop\n").unwrap();
        }
        assert_eq!(dropped.contents(), "before drop\n");
    }
}
