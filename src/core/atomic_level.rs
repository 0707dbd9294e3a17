//! Shared, live-adjustable minimum severity
//!
//! An [`AtomicLevel`] is the gate every core reads on each record. Clones share
//! the same cell, so a level set through one handle (for example by the level
//! server) is observed by every core built from the same configuration.

use super::error::Result;
use super::log_level::LogLevel;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Clone)]
pub struct AtomicLevel {
    level: Arc<AtomicU8>,
}

impl AtomicLevel {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level: Arc::new(AtomicU8::new(level as u8)),
        }
    }

    /// Parse a level name into a fresh gate
    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self::new(text.parse()?))
    }

    #[inline]
    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level as u8, Ordering::Release);
    }

    /// Whether a record at `level` passes this gate right now
    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level()
    }

    /// Whether two handles point at the same cell
    pub fn shares_cell_with(&self, other: &AtomicLevel) -> bool {
        Arc::ptr_eq(&self.level, &other.level)
    }
}

impl Default for AtomicLevel {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

impl fmt::Debug for AtomicLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicLevel").field(&self.level()).finish()
    }
}

impl fmt::Display for AtomicLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.level(), f)
    }
}

impl From<LogLevel> for AtomicLevel {
    fn from(level: LogLevel) -> Self {
        Self::new(level)
    }
}

impl Serialize for AtomicLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.level().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AtomicLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        LogLevel::deserialize(deserializer).map(AtomicLevel::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clones_share_the_gate() {
        let gate = AtomicLevel::new(LogLevel::Warn);
        let view = gate.clone();

        assert!(!view.enabled(LogLevel::Info));
        gate.set_level(LogLevel::Info);
        assert!(view.enabled(LogLevel::Info));
        assert!(gate.shares_cell_with(&view));
        assert!(!gate.shares_cell_with(&AtomicLevel::new(LogLevel::Info)));
    }

    #[test]
    fn test_concurrent_reads_and_writes() {
        let gate = AtomicLevel::new(LogLevel::Debug);
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let gate = gate.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        if i == 0 {
                            gate.set_level(LogLevel::Error);
                            gate.set_level(LogLevel::Debug);
                        } else {
                            let level = gate.level();
                            assert!(level == LogLevel::Debug || level == LogLevel::Error);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(gate.level(), LogLevel::Debug);
    }

    #[test]
    fn test_deserialize_from_level_name() {
        let gate: AtomicLevel = serde_json::from_str("\"debug\"").unwrap();
        assert_eq!(gate.level(), LogLevel::Debug);
        assert!(serde_json::from_str::<AtomicLevel>("\"chatty\"").is_err());
        assert_eq!(serde_json::to_string(&gate).unwrap(), "\"debug\"");
    }
}
