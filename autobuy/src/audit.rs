//! Date-partitioned, append-only audit log
//!
//! The audit log is the only durable record of a run. Each entry is written
//! with a single append call on a file opened in append mode, then flushed
//! and synced, so entries from runs sharing a day never interleave and prior
//! content is never truncated.

use chrono::{Local, NaiveDate};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Prefix of every audit log file name
pub const LOG_FILE_PREFIX: &str = "autobuy";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Indentation for lines of captured output under an entry
const CONTINUATION_INDENT: &str = "    ";

/// Severity of an audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    /// Normal progress and decisions
    Info,
    /// Failures
    Error,
}

impl AuditLevel {
    /// Label written between brackets
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditLevel::Info => "INFO",
            AuditLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for AuditLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit entry before it is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    /// Local wall-clock time, second precision
    pub timestamp: chrono::DateTime<Local>,
    /// Severity
    pub level: AuditLevel,
    /// Single-line message
    pub message: String,
    /// Captured step output written beneath the message
    pub detail: Option<String>,
}

impl AuditEntry {
    /// Create an entry stamped with the current time
    pub fn now(level: AuditLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            message: message.into(),
            detail: None,
        }
    }

    /// Attach captured output
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Render the entry as the exact bytes appended to the log
    pub fn render(&self) -> String {
        let mut rendered = format!(
            "{} [{}] {}\n",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.level,
            flatten(&self.message)
        );
        if let Some(detail) = &self.detail {
            for line in detail.lines() {
                rendered.push_str(CONTINUATION_INDENT);
                rendered.push_str(line);
                rendered.push('\n');
            }
        }
        rendered
    }
}

/// Keeps the header on one line so every entry starts with a timestamp
fn flatten(message: &str) -> String {
    message.replace(['\r', '\n'], " ")
}

/// Append-only audit log bound to one calendar day
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl AuditLog {
    /// Open the log for today's local date under `log_dir`
    pub fn open(log_dir: impl AsRef<Path>) -> io::Result<Self> {
        Self::open_for_date(log_dir, Local::now().date_naive())
    }

    /// Open the log for `date`, creating the directory and file if needed
    pub fn open_for_date(log_dir: impl AsRef<Path>, date: NaiveDate) -> io::Result<Self> {
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;
        let path = log_dir.join(Self::file_name_for(date));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::debug!("Audit log opened at {}", path.display());
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// File name used for `date`
    pub fn file_name_for(date: NaiveDate) -> String {
        format!("{}-{}.log", LOG_FILE_PREFIX, date.format("%Y-%m-%d"))
    }

    /// Path of the file this log appends to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a timestamped entry
    pub fn record(&self, level: AuditLevel, message: impl Into<String>) -> io::Result<()> {
        self.append(&AuditEntry::now(level, message))
    }

    /// Append a timestamped entry followed by captured step output
    pub fn record_with_output(
        &self,
        level: AuditLevel,
        message: impl Into<String>,
        output: &str,
    ) -> io::Result<()> {
        self.append(&AuditEntry::now(level, message).with_detail(output))
    }

    /// Append a prepared entry
    pub fn append(&self, entry: &AuditEntry) -> io::Result<()> {
        match entry.level {
            AuditLevel::Info => tracing::info!("{}", entry.message),
            AuditLevel::Error => tracing::error!("{}", entry.message),
        }

        let rendered = entry.render();
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "audit log lock poisoned"))?;
        file.write_all(rendered.as_bytes())?;
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn read(log: &AuditLog) -> String {
        fs::read_to_string(log.path()).unwrap()
    }

    #[test]
    fn test_file_name_encodes_date() {
        assert_eq!(
            AuditLog::file_name_for(date(2026, 3, 7)),
            "autobuy-2026-03-07.log"
        );
    }

    #[test]
    fn test_open_creates_directory_and_file() {
        let temp = TempDir::new().unwrap();
        let log_dir = temp.path().join("nested").join("logs");
        let log = AuditLog::open_for_date(&log_dir, date(2026, 1, 2)).unwrap();
        assert!(log.path().exists());
        assert_eq!(log.path(), log_dir.join("autobuy-2026-01-02.log"));
    }

    #[test]
    fn test_entry_format() {
        let temp = TempDir::new().unwrap();
        let log = AuditLog::open_for_date(temp.path(), date(2026, 1, 2)).unwrap();
        log.record(AuditLevel::Info, "run started").unwrap();
        log.record(AuditLevel::Error, "step 'balance' failed").unwrap();

        let content = read(&log);
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let (stamp, rest) = lines[0].split_at(19);
        assert!(chrono::NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).is_ok());
        assert_eq!(rest, " [INFO] run started");
        assert!(lines[1].ends_with(" [ERROR] step 'balance' failed"));
    }

    #[test]
    fn test_output_is_indented_under_header() {
        let temp = TempDir::new().unwrap();
        let log = AuditLog::open_for_date(temp.path(), date(2026, 1, 2)).unwrap();
        log.record_with_output(AuditLevel::Error, "step 'charge' failed", "line one\nline two\n")
            .unwrap();

        let content = read(&log);
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("[ERROR] step 'charge' failed"));
        assert_eq!(lines[1], "    line one");
        assert_eq!(lines[2], "    line two");
    }

    #[test]
    fn test_multiline_message_stays_on_one_line() {
        let entry = AuditEntry::now(AuditLevel::Info, "first\nsecond");
        let rendered = entry.render();
        assert_eq!(rendered.lines().count(), 1);
        assert!(rendered.ends_with("[INFO] first second\n"));
    }

    #[test]
    fn test_reopening_same_day_appends() {
        let temp = TempDir::new().unwrap();
        let day = date(2026, 5, 5);

        let first = AuditLog::open_for_date(temp.path(), day).unwrap();
        first.record(AuditLevel::Info, "first run").unwrap();
        drop(first);

        let second = AuditLog::open_for_date(temp.path(), day).unwrap();
        second.record(AuditLevel::Info, "second run").unwrap();

        let content = read(&second);
        assert!(content.contains("first run"));
        assert!(content.contains("second run"));
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_different_days_use_different_files() {
        let temp = TempDir::new().unwrap();
        let monday = AuditLog::open_for_date(temp.path(), date(2026, 5, 4)).unwrap();
        let tuesday = AuditLog::open_for_date(temp.path(), date(2026, 5, 5)).unwrap();
        monday.record(AuditLevel::Info, "monday").unwrap();
        tuesday.record(AuditLevel::Info, "tuesday").unwrap();

        assert_ne!(monday.path(), tuesday.path());
        assert!(!read(&monday).contains("tuesday"));
        assert!(!read(&tuesday).contains("monday"));
    }

    #[test]
    fn test_concurrent_writers_do_not_interleave_entries() {
        let temp = TempDir::new().unwrap();
        let day = date(2026, 6, 1);
        let writers: Vec<_> = (0..4)
            .map(|_| AuditLog::open_for_date(temp.path(), day).unwrap())
            .collect();

        std::thread::scope(|scope| {
            for (id, log) in writers.iter().enumerate() {
                scope.spawn(move || {
                    for n in 0..25 {
                        log.record_with_output(
                            AuditLevel::Info,
                            format!("writer {id} entry {n}"),
                            &format!("writer {id} detail a\nwriter {id} detail b"),
                        )
                        .unwrap();
                    }
                });
            }
        });

        let content = read(&writers[0]);
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4 * 25 * 3);
        for chunk in lines.chunks(3) {
            let id = chunk[0]
                .split("writer ")
                .nth(1)
                .and_then(|s| s.split(' ').next())
                .unwrap();
            assert_eq!(chunk[1], format!("    writer {id} detail a"));
            assert_eq!(chunk[2], format!("    writer {id} detail b"));
        }
    }
}
