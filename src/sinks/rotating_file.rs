//! Rotating file sink
//!
//! Appends encoded records to a file and rotates it once the next write would
//! push it past the size limit. Rotated files are renamed with a timestamp
//! (`app-2025-01-08T10-30-45.123.log`), then pruned by count and age and
//! optionally gzip-compressed.

use crate::core::{LoggerError, Result, Sink};
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Size limit used when the policy leaves it at zero
pub const DEFAULT_MAX_SIZE_MB: u64 = 100;

/// Longest retention `max_age_days` may ask for
pub const MAX_AGE_DAYS_LIMIT: u64 = 1_000_000;

const MEGABYTE: u64 = 1024 * 1024;
const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";
const COMPRESS_SUFFIX: &str = ".gz";

/// Rotation settings for a [`RotatingFileSink`]
///
/// # Examples
///
/// ```
/// use rust_log_pipeline::sinks::RotationPolicy;
///
/// let policy = RotationPolicy::new()
///     .with_max_size_mb(50)
///     .with_max_backups(7)
///     .with_max_age_days(30)
///     .with_compression(true)
///     .with_local_time(true);
///
/// assert_eq!(policy.max_bytes(), 50 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    max_bytes: u64,
    /// Days to retain rotated files; zero keeps them regardless of age
    pub max_age_days: u64,
    /// Rotated files to retain; zero keeps all of them
    pub max_backups: usize,
    /// Gzip rotated files
    pub compress: bool,
    /// Stamp backups with local time instead of UTC
    pub local_time: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_SIZE_MB * MEGABYTE,
            max_age_days: 0,
            max_backups: 0,
            compress: false,
            local_time: false,
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the size limit in megabytes; zero selects [`DEFAULT_MAX_SIZE_MB`]
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_size_mb(mut self, megabytes: u64) -> Self {
        let megabytes = if megabytes == 0 {
            DEFAULT_MAX_SIZE_MB
        } else {
            megabytes
        };
        self.max_bytes = megabytes_to_bytes(megabytes).unwrap_or(u64::MAX);
        self
    }

    /// Set the size limit in bytes
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_bytes(mut self, bytes: u64) -> Self {
        self.max_bytes = bytes.max(1);
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_age_days(mut self, days: u64) -> Self {
        self.max_age_days = days;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_backups(mut self, count: usize) -> Self {
        self.max_backups = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_local_time(mut self, enabled: bool) -> Self {
        self.local_time = enabled;
        self
    }

    #[must_use]
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    fn now(&self) -> NaiveDateTime {
        if self.local_time {
            Local::now().naive_local()
        } else {
            Utc::now().naive_utc()
        }
    }

    /// Backups stamped before this are stale; `None` keeps them forever
    fn age_cutoff(&self) -> Option<NaiveDateTime> {
        if self.max_age_days == 0 {
            return None;
        }
        let window = i64::try_from(self.max_age_days)
            .ok()
            .and_then(ChronoDuration::try_days)?;
        self.now().checked_sub_signed(window)
    }
}

/// Byte count for a size limit in megabytes, `None` on overflow
pub fn megabytes_to_bytes(megabytes: u64) -> Option<u64> {
    megabytes.checked_mul(MEGABYTE)
}

/// A rotated file found next to the active log
#[derive(Debug, Clone)]
struct Backup {
    path: PathBuf,
    stamp: NaiveDateTime,
    compressed: bool,
}

/// Byte sink that appends to a file and rotates it by size
///
/// # Examples
///
/// ```no_run
/// use rust_log_pipeline::sinks::{RotatingFileSink, RotationPolicy};
///
/// let policy = RotationPolicy::new()
///     .with_max_size_mb(10)
///     .with_max_backups(5)
///     .with_compression(true);
/// let sink = RotatingFileSink::with_policy("/var/log/app.log", policy).unwrap();
/// ```
pub struct RotatingFileSink {
    path: PathBuf,
    policy: RotationPolicy,
    file: Option<File>,
    size: u64,
    last_stamp: Option<NaiveDateTime>,
}

impl RotatingFileSink {
    /// Create a sink with the default policy
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_policy(path, RotationPolicy::default())
    }

    /// Create a sink, creating the parent directory and opening the file for append
    pub fn with_policy<P: AsRef<Path>>(path: P, policy: RotationPolicy) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.as_os_str().is_empty() {
            return Err(LoggerError::config("RotatingFileSink", "file name is empty"));
        }

        let mut sink = Self {
            path,
            policy,
            file: None,
            size: 0,
            last_stamp: None,
        };
        sink.open_existing()?;
        Ok(sink)
    }

    fn open_existing(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation(
                    "create log directory",
                    format!("Failed to create directory '{}'", parent.display()),
                    e,
                )
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                LoggerError::file_sink(self.path.display().to_string(), format!("Failed to open: {}", e))
            })?;

        let metadata = file.metadata().map_err(|e| {
            LoggerError::file_sink(
                self.path.display().to_string(),
                format!("Cannot access file metadata: {}", e),
            )
        })?;

        self.size = metadata.len();
        self.file = Some(file);
        Ok(())
    }

    /// Close the active file, move it aside and start a fresh one
    pub fn rotate(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }

        if self.path.exists() {
            let backup = self.next_backup_path();
            fs::rename(&self.path, &backup).map_err(|e| {
                LoggerError::file_rotation(
                    self.path.display().to_string(),
                    format!("Failed to rotate current log file: {}", e),
                )
            })?;
        }

        self.open_existing()?;

        if let Err(e) = self.mill() {
            eprintln!("[LOGGER WARNING] Cleanup of rotated logs failed: {}", e);
        }
        Ok(())
    }

    /// `<stem>-<stamp><ext>` inside the log's directory
    fn backup_path(&self, stamp: &NaiveDateTime) -> PathBuf {
        let (stem, ext) = self.name_parts();
        let name = format!("{}-{}{}", stem, stamp.format(BACKUP_TIME_FORMAT), ext);
        self.path.with_file_name(name)
    }

    /// Backup stamps only move forward, even for rotations within one millisecond
    fn next_backup_path(&mut self) -> PathBuf {
        let mut stamp = self.policy.now();
        if let Some(last) = self.last_stamp {
            stamp = stamp.max(last + ChronoDuration::milliseconds(1));
        }
        loop {
            let candidate = self.backup_path(&stamp);
            let compressed = PathBuf::from(format!("{}{}", candidate.display(), COMPRESS_SUFFIX));
            if !candidate.exists() && !compressed.exists() {
                self.last_stamp = Some(stamp);
                return candidate;
            }
            stamp += ChronoDuration::milliseconds(1);
        }
    }

    fn name_parts(&self) -> (String, String) {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("app")
            .to_string();
        let ext = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        (stem, ext)
    }

    /// Rotated files of this log, newest first
    fn backups(&self) -> Result<Vec<Backup>> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from("."),
        };
        let (stem, ext) = self.name_parts();
        let prefix = format!("{}-", stem);

        let mut backups = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };

            let (rest, compressed) = match name.strip_suffix(COMPRESS_SUFFIX) {
                Some(rest) => (rest, true),
                None => (name, false),
            };
            let Some(stamp_text) = rest
                .strip_prefix(&prefix)
                .and_then(|r| r.strip_suffix(ext.as_str()))
            else {
                continue;
            };
            if let Ok(stamp) = NaiveDateTime::parse_from_str(stamp_text, BACKUP_TIME_FORMAT) {
                backups.push(Backup {
                    path: entry.path(),
                    stamp,
                    compressed,
                });
            }
        }

        backups.sort_by(|a, b| b.stamp.cmp(&a.stamp));
        Ok(backups)
    }

    /// Prune by count and age, then compress what is left
    fn mill(&self) -> Result<()> {
        let mut keep = self.backups()?;
        let mut remove = Vec::new();

        if self.policy.max_backups > 0 && keep.len() > self.policy.max_backups {
            remove.extend(keep.split_off(self.policy.max_backups));
        }

        if let Some(cutoff) = self.policy.age_cutoff() {
            let (fresh, stale): (Vec<_>, Vec<_>) = keep.into_iter().partition(|b| b.stamp >= cutoff);
            keep = fresh;
            remove.extend(stale);
        }

        for backup in remove {
            if let Err(e) = fs::remove_file(&backup.path) {
                eprintln!(
                    "[LOGGER WARNING] Failed to remove old log {}: {}",
                    backup.path.display(),
                    e
                );
            }
        }

        if self.policy.compress {
            for backup in keep.iter().filter(|b| !b.compressed) {
                compress_file(&backup.path)?;
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }
}

/// Gzip `path` into `path.gz`, removing the original only once the archive is complete
fn compress_file(path: &Path) -> Result<()> {
    let gz_path = PathBuf::from(format!("{}{}", path.display(), COMPRESS_SUFFIX));
    let temp_path = PathBuf::from(format!("{}.tmp", gz_path.display()));

    let input = File::open(path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to open file for compression: {}", path.display()),
            e,
        )
    })?;
    let output = File::create(&temp_path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to create temporary compressed file: {}", temp_path.display()),
            e,
        )
    })?;

    let mut reader = BufReader::with_capacity(64 * 1024, input);
    let mut encoder = flate2::write::GzEncoder::new(
        BufWriter::with_capacity(64 * 1024, output),
        flate2::Compression::default(),
    );

    let streamed = io::copy(&mut reader, &mut encoder)
        .and_then(|_| encoder.finish())
        .and_then(|mut writer| writer.flush());
    if let Err(e) = streamed {
        let _ = fs::remove_file(&temp_path);
        return Err(LoggerError::io_operation(
            "compress log file",
            format!("Failed to compress {}", path.display()),
            e,
        ));
    }

    fs::rename(&temp_path, &gz_path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to rename compressed file to: {}", gz_path.display()),
            e,
        )
    })?;

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[LOGGER WARNING] Compression succeeded but failed to remove original file {}: {}",
            path.display(),
            e
        );
    }
    Ok(())
}

impl Sink for RotatingFileSink {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        let len = buf.len() as u64;
        if len > self.policy.max_bytes {
            return Err(LoggerError::file_sink(
                self.path.display().to_string(),
                format!(
                    "write length {} exceeds maximum file size {}",
                    len, self.policy.max_bytes
                ),
            ));
        }

        if self.file.is_none() {
            self.open_existing()?;
        }
        if self.size + len > self.policy.max_bytes {
            self.rotate()?;
        }

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| LoggerError::writer("File not open"))?;
        file.write_all(buf).map_err(|e| {
            LoggerError::file_sink(
                self.path.display().to_string(),
                format!("Failed to write log entry: {}", e),
            )
        })?;
        self.size += len;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut file) = self.file {
            file.sync_data().map_err(|e| {
                LoggerError::file_sink(self.path.display().to_string(), format!("Failed to sync: {}", e))
            })?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "rotating_file"
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }
    }
}
