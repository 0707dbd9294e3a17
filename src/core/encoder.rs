//! Record encoders
//!
//! Two encodings are supported:
//! - Json: one object per line, for machines and the report sink
//! - Console: tab-separated human-readable line, optionally with a colored level
//!
//! Both render time with [`TIME_FORMAT`], which downstream consumers rely on.

use super::log_entry::LogEntry;
use chrono::{DateTime, TimeZone};
use serde_json::{Map, Value};

/// Fixed timestamp layout: `YYYY-MM-DD-hh:mm:ss`, 24-hour clock
pub const TIME_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";

pub const MESSAGE_KEY: &str = "msg";
pub const LEVEL_KEY: &str = "level";
pub const TIME_KEY: &str = "time";
pub const CALLER_KEY: &str = "caller";
pub const STACKTRACE_KEY: &str = "stacktrace";

/// Render a timestamp with the fixed log layout
pub fn format_time<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    timestamp.format(TIME_FORMAT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoder {
    /// Machine-readable JSON lines
    Json,

    /// Human-readable tab-separated lines
    ///
    /// Example: `2025-01-08-10:30:45	info	src/main.rs:12	started	{"port":8080}`
    Console { color: bool },
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder::Console { color: false }
    }
}

impl Encoder {
    /// Pick the encoder for the configured format; `json` wins over `color`
    #[must_use]
    pub fn select(json: bool, color: bool) -> Self {
        if json {
            Encoder::Json
        } else {
            Encoder::Console { color }
        }
    }

    #[must_use]
    pub fn is_json(&self) -> bool {
        matches!(self, Encoder::Json)
    }

    /// Encode one record, newline terminated
    pub fn encode(&self, entry: &LogEntry) -> Vec<u8> {
        let mut line = match self {
            Encoder::Json => self.encode_json(entry),
            Encoder::Console { color } => self.encode_console(entry, *color),
        };
        line.push('\n');
        line.into_bytes()
    }

    fn encode_json(&self, entry: &LogEntry) -> String {
        let mut object = Map::new();
        object.insert(LEVEL_KEY.to_string(), Value::String(entry.level.as_str().to_string()));
        object.insert(TIME_KEY.to_string(), Value::String(format_time(&entry.timestamp)));
        if let Some(ref caller) = entry.caller {
            object.insert(CALLER_KEY.to_string(), Value::String(caller.to_string()));
        }
        object.insert(MESSAGE_KEY.to_string(), Value::String(entry.message.clone()));

        for field in entry.context.fields() {
            object.insert(field.key.clone(), field.value.to_json_value());
        }

        if let Some(ref stack) = entry.stack {
            object.insert(STACKTRACE_KEY.to_string(), Value::String(stack.clone()));
        }

        serde_json::to_string(&Value::Object(object)).unwrap_or_default()
    }

    fn encode_console(&self, entry: &LogEntry, color: bool) -> String {
        let mut parts = Vec::with_capacity(5);
        parts.push(format_time(&entry.timestamp));
        parts.push(Self::console_level(entry, color));
        if let Some(ref caller) = entry.caller {
            parts.push(caller.to_string());
        }
        parts.push(entry.message.clone());

        if !entry.context.is_empty() {
            let fields = Value::Object(entry.context.to_json_object());
            parts.push(fields.to_string());
        }

        let mut line = parts.join("\t");
        if let Some(ref stack) = entry.stack {
            line.push('\n');
            line.push_str(stack.trim_end());
        }
        line
    }

    #[cfg(feature = "console")]
    fn console_level(entry: &LogEntry, color: bool) -> String {
        use colored::Colorize;

        if color {
            entry
                .level
                .as_capital_str()
                .color(entry.level.color_code())
                .to_string()
        } else {
            entry.level.as_str().to_string()
        }
    }

    #[cfg(not(feature = "console"))]
    fn console_level(entry: &LogEntry, color: bool) -> String {
        if color {
            entry.level.as_capital_str().to_string()
        } else {
            entry.level.as_str().to_string()
        }
    }
}
