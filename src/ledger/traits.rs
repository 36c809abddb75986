//! Ledger trait and error types
//!
//! This module defines the trait interface for ledger backends and
//! associated error types.

use crate::ledger::{FailureKind, LedgerEntry, RunRecord, RunStatus};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger database is corrupt or unreadable: {0}")]
    Corrupt(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Trait for ledger backend implementations
///
/// The ledger is the single source of truth for which identifiers have been
/// fully processed. It must reflect all writes from the current and all
/// previous runs against the same output target; the run controller consults
/// it before every fetch.
pub trait Ledger {
    // ===== Run Management =====

    /// Creates a new run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> LedgerResult<i64>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> LedgerResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> LedgerResult<()>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> LedgerResult<()>;

    // ===== Identifier State =====

    /// Returns true if the identifier has reached a terminal state
    /// (succeeded or permanently failed) in this or any previous run
    fn is_completed(&self, identifier: &str) -> LedgerResult<bool>;

    /// Claims an identifier for fetching
    ///
    /// Inserts the identifier as pending (or re-claims an existing pending
    /// entry left over from an interrupted run). Never downgrades a terminal
    /// state; claiming a completed identifier is a no-op.
    fn claim(&mut self, identifier: &str, run_id: i64) -> LedgerResult<()>;

    /// Marks an identifier as succeeded
    ///
    /// Upserts, so ledger reconciliation can mark identifiers that exist in
    /// the output file but were never claimed in this ledger.
    fn mark_succeeded(&mut self, identifier: &str, attempts: u32, run_id: i64)
        -> LedgerResult<()>;

    /// Marks an identifier as permanently failed with the given kind
    fn mark_failed(
        &mut self,
        identifier: &str,
        kind: FailureKind,
        attempts: u32,
        message: &str,
        run_id: i64,
    ) -> LedgerResult<()>;

    /// Gets the full ledger entry for an identifier, if present
    fn get_entry(&self, identifier: &str) -> LedgerResult<Option<LedgerEntry>>;

    /// Deletes all failed entries so the next run re-attempts them
    ///
    /// This is the explicit re-attempt operation; the run loop itself never
    /// retries an identifier that reached a terminal state.
    fn reset_failed(&mut self) -> LedgerResult<u64>;

    /// Clears all identifier entries (used by --fresh)
    fn clear_products(&mut self) -> LedgerResult<()>;

    // ===== Statistics =====

    /// Counts identifiers currently marked succeeded
    fn count_succeeded(&self) -> LedgerResult<u64>;

    /// Counts identifiers currently pending (claimed, no terminal result)
    fn count_pending(&self) -> LedgerResult<u64>;

    /// Counts failed identifiers grouped by failure kind
    fn count_failed_by_kind(&self) -> LedgerResult<HashMap<FailureKind, u64>>;

    /// Counts all identifier entries
    fn count_total(&self) -> LedgerResult<u64>;
}
