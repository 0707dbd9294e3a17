//! Console sink implementation

use crate::core::{Result, Sink};
use std::io::{self, Write};

/// Writes encoded records to the process's standard output.
///
/// Share it through a [`SharedSink`](crate::core::SharedSink) so concurrent
/// cores never interleave partial records.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    _private: (),
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sink for ConsoleSink {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        io::stdout().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
