//! Tab-separated result writer
//!
//! Appends one row per successfully fetched product. The column order is
//! fixed by `record::FIELDS`; embedded tabs, newlines and backslashes are
//! escaped so a field can never split a row. Each append is flushed and
//! synced before returning — there is no cross-call buffering to lose.

use crate::harvest::record::{ProductRecord, FIELDS};
use crate::output::{OutputError, OutputResult};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Append-only writer for the results dataset
pub struct TsvWriter {
    file: File,
}

impl TsvWriter {
    /// Opens the results file for appending, creating it (with a header row)
    /// if it does not exist or is empty
    pub fn open(path: &Path) -> OutputResult<Self> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        if file.metadata()?.len() == 0 {
            let header = format!("{}\n", FIELDS.join("\t"));
            file.write_all(header.as_bytes())?;
            file.sync_data()?;
        }

        Ok(Self { file })
    }

    /// Appends one record as a single row and syncs it to disk
    pub fn append(&mut self, record: &ProductRecord) -> OutputResult<()> {
        let line = format_row(record);
        self.file.write_all(line.as_bytes())?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Deletes the results file if present (used by --fresh)
    pub fn remove(path: &Path) -> OutputResult<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OutputError::Io(e)),
        }
    }
}

/// Formats one record as a terminated TSV row
fn format_row(record: &ProductRecord) -> String {
    let values = record.field_values();
    let mut line = String::new();
    for (index, value) in values.iter().enumerate() {
        if index > 0 {
            line.push('\t');
        }
        line.push_str(&escape_field(value));
    }
    line.push('\n');
    line
}

/// Escapes a field value so it cannot corrupt row boundaries
pub fn escape_field(value: &str) -> String {
    if !value.contains(['\\', '\t', '\n', '\r']) {
        return value.to_string();
    }

    let mut escaped = String::with_capacity(value.len() + 4);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Reads the identifier column of an existing results file
///
/// Used at startup to reconcile the ledger with rows that were appended but
/// not yet marked when a previous run was killed. Returns an empty list if
/// the file does not exist yet.
pub fn load_written_ids(path: &Path) -> OutputResult<Vec<String>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(OutputError::Io(e)),
    };

    let reader = BufReader::new(file);
    let mut ids = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if index == 0 && line.starts_with("id\t") {
            continue;
        }
        let id = line.split('\t').next().unwrap_or("").trim();
        if !id.is_empty() {
            ids.push(id.to_string());
        }
    }

    Ok(ids)
}
