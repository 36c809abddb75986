//! Identifier source
//!
//! Loads the list of product identifiers to process from a spreadsheet-style
//! text file (CSV or TSV). The pipeline only needs "one identifier per
//! logical row": the first column of each line is taken as the identifier,
//! everything else on the line is ignored.
//!
//! Duplicate identifiers are dropped here, preserving first-seen order, so
//! the run controller can treat the sequence as unique.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading the identifier list
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read identifier file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Identifier file '{0}' contains no identifiers")]
    Empty(String),
}

/// Loads identifiers from the given file
///
/// Takes the first tab- or comma-separated column of each line, trims it,
/// skips blank rows and (optionally) a header row, and deduplicates while
/// preserving order. A UTF-8 BOM on the first line is tolerated.
pub fn load_identifiers(path: &Path, has_header: bool) -> Result<Vec<String>, SourceError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut seen = HashSet::new();
    let mut identifiers = Vec::new();
    let mut total = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = if index == 0 {
            line.trim_start_matches('\u{feff}').to_string()
        } else {
            line
        };

        if index == 0 && has_header {
            continue;
        }

        let token = first_column(&line);
        if token.is_empty() {
            continue;
        }

        total += 1;
        if seen.insert(token.to_string()) {
            identifiers.push(token.to_string());
        }
    }

    let dropped = total - identifiers.len();
    if dropped > 0 {
        tracing::warn!(
            "Dropped {} duplicate identifiers at input stage ({} remain)",
            dropped,
            identifiers.len()
        );
    }

    if identifiers.is_empty() {
        return Err(SourceError::Empty(path.display().to_string()));
    }

    Ok(identifiers)
}

/// Extracts the first column of a CSV/TSV line
fn first_column(line: &str) -> &str {
    line.split(['\t', ',']).next().unwrap_or("").trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_input(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_plain_list() {
        let file = create_temp_input("100\n200\n300\n");
        let ids = load_identifiers(file.path(), false).unwrap();
        assert_eq!(ids, vec!["100", "200", "300"]);
    }

    #[test]
    fn test_first_column_of_tsv_and_csv() {
        let file = create_temp_input("100\tWidget\n200,Gadget,9.99\n");
        let ids = load_identifiers(file.path(), false).unwrap();
        assert_eq!(ids, vec!["100", "200"]);
    }

    #[test]
    fn test_header_skipped() {
        let file = create_temp_input("id\tname\n100\tWidget\n");
        let ids = load_identifiers(file.path(), true).unwrap();
        assert_eq!(ids, vec!["100"]);
    }

    #[test]
    fn test_duplicates_dropped_in_order() {
        let file = create_temp_input("300\n100\n300\n200\n100\n");
        let ids = load_identifiers(file.path(), false).unwrap();
        assert_eq!(ids, vec!["300", "100", "200"]);
    }

    #[test]
    fn test_blank_lines_ignored() {
        let file = create_temp_input("100\n\n   \n200\n");
        let ids = load_identifiers(file.path(), false).unwrap();
        assert_eq!(ids, vec!["100", "200"]);
    }

    #[test]
    fn test_bom_tolerated() {
        let file = create_temp_input("\u{feff}100\n200\n");
        let ids = load_identifiers(file.path(), false).unwrap();
        assert_eq!(ids, vec!["100", "200"]);
    }

    #[test]
    fn test_empty_file_is_an_error() {
        let file = create_temp_input("");
        assert!(matches!(
            load_identifiers(file.path(), false),
            Err(SourceError::Empty(_))
        ));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(matches!(
            load_identifiers(Path::new("/nonexistent/ids.tsv"), false),
            Err(SourceError::Io(_))
        ));
    }
}
