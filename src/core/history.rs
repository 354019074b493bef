//! Timer history ledger
//!
//! Append-only record of timer actions that can be flushed to a
//! human-readable text file, one tab-separated entry per line.

use crate::{
    error::{Result, ToolboxError},
    utils::fs::FileSystemUtils,
};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info, instrument};

/// What happened to the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerAction {
    Create,
    Start,
    Pause,
    Unpause,
    Reset,
    /// A caller-supplied mark added through `Timer::add`
    Mark,
}

impl TimerAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Start => "START",
            Self::Pause => "PAUSE",
            Self::Unpause => "UNPAUSE",
            Self::Reset => "RESET",
            Self::Mark => "MARK",
        }
    }
}

impl fmt::Display for TimerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Wall-clock time the entry was recorded
    pub timestamp: DateTime<Local>,
    /// Timer running time at that moment
    pub elapsed: Duration,
    pub action: TimerAction,
    pub label: Option<String>,
}

impl HistoryEntry {
    /// Render as `<timestamp>\t<HH:MM:SS.mmm>\t<ACTION>\t<label>`
    pub fn to_line(&self) -> String {
        let label: String = self
            .label
            .as_deref()
            .unwrap_or("")
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();

        format!(
            "{}\t{}\t{}\t{}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, false),
            format_elapsed(self.elapsed),
            self.action,
            label
        )
    }
}

/// Ordered record of timer actions
#[derive(Debug, Default)]
pub struct TimerHistory {
    entries: Vec<HistoryEntry>,
    /// Number of leading entries already flushed by `write`
    written: usize,
    fs_utils: FileSystemUtils,
}

impl TimerHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry for `action`
    pub fn record(
        &mut self,
        action: TimerAction,
        elapsed: Duration,
        label: Option<String>,
    ) -> &HistoryEntry {
        debug!("History: {} at {:?}", action, elapsed);
        let index = self.entries.len();
        self.entries.push(HistoryEntry {
            timestamp: Local::now(),
            elapsed,
            action,
            label,
        });
        &self.entries[index]
    }

    /// Append a labelled mark
    pub fn add(&mut self, elapsed: Duration, label: impl Into<String>) -> &HistoryEntry {
        self.record(TimerAction::Mark, elapsed, Some(label.into()))
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries recorded since the last `write`
    pub fn pending(&self) -> &[HistoryEntry] {
        &self.entries[self.written..]
    }

    /// How many times the timer was reset
    pub fn num_resets(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.action == TimerAction::Reset)
            .count()
    }

    /// Forget every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.written = 0;
    }

    /// Append entries not yet written to `path`, creating the file if needed.
    /// Returns the number of lines appended.
    #[instrument(skip(self, path))]
    pub fn write<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let lines: Vec<String> = self.pending().iter().map(HistoryEntry::to_line).collect();

        self.fs_utils
            .append_lines(path, &lines)
            .map_err(|e| ToolboxError::file_system("append", path, e))?;

        self.written = self.entries.len();
        info!("Wrote {} history entries to {}", lines.len(), path.display());
        Ok(lines.len())
    }

    /// Write the whole ledger to a new `ledger_<unix-seconds>.txt` file in `dir`
    #[instrument(skip(self, dir))]
    pub fn write_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let path = dir
            .as_ref()
            .join(format!("ledger_{}.txt", Utc::now().timestamp()));

        let mut content = String::new();
        for entry in &self.entries {
            content.push_str(&entry.to_line());
            content.push('\n');
        }

        self.fs_utils
            .write_file(&path, content.as_bytes())
            .map_err(|e| ToolboxError::file_system("write", &path, e))?;

        info!("Wrote ledger snapshot to {}", path.display());
        Ok(path)
    }
}

/// Ledger files written by [`TimerHistory::write_to_dir`], sorted by name
pub fn list_ledgers<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let dir_str = dir.to_str().ok_or_else(|| {
        ToolboxError::validation(format!("Ledger directory is not valid UTF-8: {}", dir.display()))
    })?;

    let pattern = format!("{}/ledger_*.txt", glob::Pattern::escape(dir_str));
    let mut ledgers: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| ToolboxError::config(format!("Invalid ledger pattern '{pattern}': {e}")))?
        .filter_map(std::result::Result::ok)
        .filter(|path| path.is_file())
        .collect();

    ledgers.sort();
    debug!("Found {} ledgers in {}", ledgers.len(), dir.display());
    Ok(ledgers)
}

/// Format a duration as `HH:MM:SS.mmm`
pub fn format_elapsed(duration: Duration) -> String {
    let total = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        total / 3600,
        (total % 3600) / 60,
        total % 60,
        duration.subsec_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "00:00:00.000");
        assert_eq!(format_elapsed(Duration::from_millis(3_723_045)), "01:02:03.045");
    }

    #[test]
    fn test_entry_line_format() {
        let mut history = TimerHistory::new();
        let entry = history.add(Duration::from_millis(1500), "tab\there");
        let line = entry.to_line();

        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 4);
        assert!(DateTime::parse_from_rfc3339(fields[0]).is_ok());
        assert_eq!(fields[1], "00:00:01.500");
        assert_eq!(fields[2], "MARK");
        assert_eq!(fields[3], "tab here");
    }

    #[test]
    fn test_write_creates_file_and_appends_only_new_entries() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("ledger.txt");
        let mut history = TimerHistory::new();

        history.record(TimerAction::Create, Duration::ZERO, None);
        history.record(TimerAction::Start, Duration::ZERO, None);
        assert_eq!(history.write(&path).unwrap(), 2);
        assert!(history.pending().is_empty());

        history.add(Duration::from_secs(2), "checkpoint");
        assert_eq!(history.write(&path).unwrap(), 1);
        assert_eq!(history.write(&path).unwrap(), 0);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("\tCREATE\t"));
        assert!(lines[1].contains("\tSTART\t"));
        assert!(lines[2].ends_with("\tMARK\tcheckpoint"));
    }

    #[test]
    fn test_write_keeps_existing_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ledger.txt");
        fs::write(&path, "earlier line\n").unwrap();

        let mut history = TimerHistory::new();
        history.record(TimerAction::Reset, Duration::from_secs(9), None);
        history.write(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("earlier line\n"));
        assert!(content.contains("\t00:00:09.000\tRESET\t"));
    }

    #[test]
    fn test_write_to_dir_and_list() {
        let temp_dir = TempDir::new().unwrap();
        let mut history = TimerHistory::new();
        history.record(TimerAction::Create, Duration::ZERO, None);

        assert!(list_ledgers(temp_dir.path()).unwrap().is_empty());

        let written = history.write_to_dir(temp_dir.path()).unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        let ledgers = list_ledgers(temp_dir.path()).unwrap();
        assert_eq!(ledgers, vec![written]);
    }

    #[test]
    fn test_clear_and_counts() {
        let mut history = TimerHistory::new();
        history.record(TimerAction::Reset, Duration::ZERO, None);
        history.record(TimerAction::Start, Duration::ZERO, None);
        history.record(TimerAction::Reset, Duration::ZERO, None);

        assert_eq!(history.len(), 3);
        assert_eq!(history.num_resets(), 2);

        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.num_resets(), 0);
    }
}
