//! Failure log
//!
//! Append-only audit trail of permanently failed identifiers, kept separate
//! from the results dataset so operators can inspect failures without
//! scanning successful output. One tab-separated entry per failure:
//! timestamp, identifier, failure kind, attempt count, message.

use crate::ledger::FailureKind;
use crate::output::tsv::escape_field;
use crate::output::{OutputError, OutputResult};
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Append-only writer for the failure log
pub struct FailureLog {
    file: File,
}

impl FailureLog {
    /// Opens the failure log for appending, creating it if needed
    pub fn open(path: &Path) -> OutputResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    /// Appends one failure entry and syncs it to disk
    pub fn append(
        &mut self,
        identifier: &str,
        kind: FailureKind,
        attempts: u32,
        message: &str,
    ) -> OutputResult<()> {
        let line = format!(
            "{}\t{}\t{}\t{}\t{}\n",
            Utc::now().to_rfc3339(),
            escape_field(identifier),
            kind,
            attempts,
            escape_field(message),
        );
        self.file.write_all(line.as_bytes())?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Deletes the failure log if present (used by --fresh)
    pub fn remove(path: &Path) -> OutputResult<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OutputError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_append_entry_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("failures.log");

        let mut log = FailureLog::open(&path).unwrap();
        log.append("42", FailureKind::NotFound, 1, "HTTP 404").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1);

        let fields: Vec<&str> = lines[0].split('\t').collect();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[1], "42");
        assert_eq!(fields[2], "not_found");
        assert_eq!(fields[3], "1");
        assert_eq!(fields[4], "HTTP 404");
    }

    #[test]
    fn test_entries_accumulate_across_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("failures.log");

        {
            let mut log = FailureLog::open(&path).unwrap();
            log.append("1", FailureKind::RetryExhausted, 5, "HTTP 503")
                .unwrap();
        }
        {
            let mut log = FailureLog::open(&path).unwrap();
            log.append("2", FailureKind::MalformedResponse, 1, "not JSON")
                .unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_message_with_newline_stays_one_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("failures.log");

        let mut log = FailureLog::open(&path).unwrap();
        log.append("7", FailureKind::MalformedResponse, 1, "body:\nline two")
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
