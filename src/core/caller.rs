//! Call-site and stack capture for log records

use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::fmt;
use std::panic::Location;

/// Source location of the code that emitted a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerLocation {
    pub file: String,
    pub line: u32,
}

impl CallerLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl From<&Location<'_>> for CallerLocation {
    fn from(location: &Location<'_>) -> Self {
        Self::new(location.file(), location.line())
    }
}

impl fmt::Display for CallerLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Resolve the reported call site.
///
/// `tracked` is the location recorded through `#[track_caller]`. With a skip
/// of zero it is reported as is; otherwise the tracked frame is looked up in a
/// captured backtrace and the frame `skip` levels further out is reported.
/// Builds without line information fall back to the tracked location.
/// Either way a leading `./` is dropped, so both paths report files alike.
pub fn resolve(tracked: &Location<'_>, skip: usize) -> CallerLocation {
    if skip == 0 {
        return CallerLocation::new(relative(tracked.file()), tracked.line());
    }

    let rendered = Backtrace::force_capture().to_string();
    let frames = parse_frame_locations(&rendered);
    let origin = frames
        .iter()
        .position(|frame| frame.line == tracked.line() && same_file(&frame.file, tracked.file()));

    origin
        .and_then(|idx| frames.get(idx + skip))
        .map(|frame| CallerLocation::new(relative(&frame.file), frame.line))
        .unwrap_or_else(|| CallerLocation::new(relative(tracked.file()), tracked.line()))
}

fn relative(file: &str) -> &str {
    file.trim_start_matches("./")
}

/// Capture the current stack as text
pub fn capture_stack() -> String {
    Backtrace::force_capture().to_string()
}

/// Pull `at <file>:<line>:<col>` locations out of a rendered backtrace
fn parse_frame_locations(rendered: &str) -> Vec<CallerLocation> {
    rendered
        .lines()
        .filter_map(|line| line.trim().strip_prefix("at "))
        .filter_map(|location| {
            let mut parts = location.rsplitn(3, ':');
            let _column = parts.next()?;
            let line = parts.next()?.parse().ok()?;
            let file = parts.next()?;
            Some(CallerLocation::new(file, line))
        })
        .collect()
}

fn same_file(frame_file: &str, tracked_file: &str) -> bool {
    let frame_file = relative(frame_file);
    let tracked_file = relative(tracked_file);
    frame_file.ends_with(tracked_file) || tracked_file.ends_with(frame_file)
}
