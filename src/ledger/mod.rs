//! Progress ledger module
//!
//! This module handles the durable record of per-identifier completion that
//! makes runs resumable, including:
//! - SQLite database initialization and schema management
//! - Per-identifier state transitions (claim, succeed, fail)
//! - Run tracking and resumption support
//! - Statistics queries for the stats report

mod schema;
mod sqlite;
mod state;
mod traits;

pub use sqlite::SqliteLedger;
pub use state::{FailureKind, ProcessingState};
pub use traits::{Ledger, LedgerError, LedgerResult};

use crate::HarvestError;
use std::path::Path;

/// Initializes or opens a ledger database
pub fn open_ledger(path: &Path) -> Result<SqliteLedger, HarvestError> {
    Ok(SqliteLedger::new(path)?)
}

/// Represents one identifier's entry in the ledger
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub identifier: String,
    pub state: ProcessingState,
    pub attempts: u32,
    pub first_seen_run: i64,
    pub last_attempt_at: Option<String>,
    pub message: Option<String>,
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_roundtrip() {
        for status in &[
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Interrupted,
        ] {
            let db_str = status.to_db_string();
            let parsed = RunStatus::from_db_string(db_str);
            assert_eq!(Some(*status), parsed);
        }
    }

    #[test]
    fn test_run_status_invalid() {
        assert_eq!(RunStatus::from_db_string("invalid"), None);
    }
}
