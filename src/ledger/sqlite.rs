//! SQLite ledger implementation
//!
//! This module provides a SQLite-based implementation of the Ledger trait.

use crate::ledger::schema::initialize_schema;
use crate::ledger::traits::{Ledger, LedgerError, LedgerResult};
use crate::ledger::{FailureKind, LedgerEntry, ProcessingState, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

/// SQLite ledger backend
pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    /// Opens or creates a ledger database at the given path
    ///
    /// Fails fast if the database exists but does not pass an integrity
    /// check: a corrupt ledger silently treated as empty would re-fetch the
    /// entire identifier list and duplicate the output dataset.
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        let check: String = conn.query_row("PRAGMA quick_check", [], |row| row.get(0))?;
        if check != "ok" {
            return Err(LedgerError::Corrupt(format!(
                "{}: quick_check reported '{}'",
                path.display(),
                check
            )));
        }

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory ledger (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl Ledger for SqliteLedger {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> LedgerResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_latest_run(&self) -> LedgerResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
        )?;

        let run = stmt
            .query_row([], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    config_hash: row.get(3)?,
                    status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                        .unwrap_or(RunStatus::Running),
                })
            })
            .optional()?;

        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> LedgerResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        if updated == 0 {
            return Err(LedgerError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64) -> LedgerResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Completed.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(LedgerError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Identifier State =====

    fn is_completed(&self, identifier: &str) -> LedgerResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM products WHERE identifier = ?1 AND state IN ('succeeded', 'failed')",
            params![identifier],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn claim(&mut self, identifier: &str, run_id: i64) -> LedgerResult<()> {
        let now = Utc::now().to_rfc3339();
        // The conflict guard keeps terminal states terminal: a claim only
        // refreshes rows that are still pending.
        self.conn.execute(
            "INSERT INTO products (identifier, state, attempts, first_seen_run, last_attempt_at)
             VALUES (?1, 'pending', 0, ?2, ?3)
             ON CONFLICT(identifier) DO UPDATE SET last_attempt_at = excluded.last_attempt_at
             WHERE products.state = 'pending'",
            params![identifier, run_id, now],
        )?;
        Ok(())
    }

    fn mark_succeeded(
        &mut self,
        identifier: &str,
        attempts: u32,
        run_id: i64,
    ) -> LedgerResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO products (identifier, state, attempts, first_seen_run, last_attempt_at)
             VALUES (?1, 'succeeded', ?2, ?3, ?4)
             ON CONFLICT(identifier) DO UPDATE SET
                 state = 'succeeded',
                 failure_kind = NULL,
                 attempts = excluded.attempts,
                 last_attempt_at = excluded.last_attempt_at,
                 message = NULL
             WHERE products.state != 'succeeded'",
            params![identifier, attempts, run_id, now],
        )?;
        Ok(())
    }

    fn mark_failed(
        &mut self,
        identifier: &str,
        kind: FailureKind,
        attempts: u32,
        message: &str,
        run_id: i64,
    ) -> LedgerResult<()> {
        let now = Utc::now().to_rfc3339();
        // Only pending (or absent) rows can fail; a succeeded identifier
        // never regresses.
        self.conn.execute(
            "INSERT INTO products (identifier, state, failure_kind, attempts, first_seen_run, last_attempt_at, message)
             VALUES (?1, 'failed', ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(identifier) DO UPDATE SET
                 state = 'failed',
                 failure_kind = excluded.failure_kind,
                 attempts = excluded.attempts,
                 last_attempt_at = excluded.last_attempt_at,
                 message = excluded.message
             WHERE products.state = 'pending'",
            params![identifier, kind.to_db_string(), attempts, run_id, now, message],
        )?;
        Ok(())
    }

    fn get_entry(&self, identifier: &str) -> LedgerResult<Option<LedgerEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT identifier, state, failure_kind, attempts, first_seen_run, last_attempt_at, message
             FROM products WHERE identifier = ?1",
        )?;

        let entry = stmt
            .query_row(params![identifier], |row| {
                let state_str: String = row.get(1)?;
                let kind_str: Option<String> = row.get(2)?;
                Ok(LedgerEntry {
                    identifier: row.get(0)?,
                    state: ProcessingState::from_db_strings(&state_str, kind_str.as_deref())
                        .unwrap_or(ProcessingState::Pending),
                    attempts: row.get(3)?,
                    first_seen_run: row.get(4)?,
                    last_attempt_at: row.get(5)?,
                    message: row.get(6)?,
                })
            })
            .optional()?;

        Ok(entry)
    }

    fn reset_failed(&mut self) -> LedgerResult<u64> {
        let deleted = self
            .conn
            .execute("DELETE FROM products WHERE state = 'failed'", [])?;
        Ok(deleted as u64)
    }

    fn clear_products(&mut self) -> LedgerResult<()> {
        self.conn.execute("DELETE FROM products", [])?;
        Ok(())
    }

    // ===== Statistics =====

    fn count_succeeded(&self) -> LedgerResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM products WHERE state = 'succeeded'",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_pending(&self) -> LedgerResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM products WHERE state = 'pending'",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_failed_by_kind(&self) -> LedgerResult<HashMap<FailureKind, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT failure_kind, COUNT(*) FROM products WHERE state = 'failed' GROUP BY failure_kind",
        )?;

        let mut summary = HashMap::new();
        let rows = stmt.query_map([], |row| {
            let kind_str: Option<String> = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((kind_str, count))
        })?;

        for row in rows {
            let (kind_str, count) = row?;
            if let Some(kind) = kind_str.as_deref().and_then(FailureKind::from_db_string) {
                summary.insert(kind, count as u64);
            }
        }

        Ok(summary)
    }

    fn count_total(&self) -> LedgerResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_in_memory() {
        let ledger = SqliteLedger::new_in_memory();
        assert!(ledger.is_ok());
    }

    #[test]
    fn test_create_run() {
        let mut ledger = SqliteLedger::new_in_memory().unwrap();
        let run_id = ledger.create_run("test_hash").unwrap();
        assert!(run_id > 0);
    }

    #[test]
    fn test_claim_then_succeed() {
        let mut ledger = SqliteLedger::new_in_memory().unwrap();
        let run_id = ledger.create_run("test_hash").unwrap();

        ledger.claim("12345", run_id).unwrap();
        assert!(!ledger.is_completed("12345").unwrap());

        ledger.mark_succeeded("12345", 1, run_id).unwrap();
        assert!(ledger.is_completed("12345").unwrap());

        let entry = ledger.get_entry("12345").unwrap().unwrap();
        assert_eq!(entry.state, ProcessingState::Succeeded);
        assert_eq!(entry.attempts, 1);
    }

    #[test]
    fn test_claim_then_fail() {
        let mut ledger = SqliteLedger::new_in_memory().unwrap();
        let run_id = ledger.create_run("test_hash").unwrap();

        ledger.claim("12345", run_id).unwrap();
        ledger
            .mark_failed("12345", FailureKind::NotFound, 1, "HTTP 404", run_id)
            .unwrap();

        assert!(ledger.is_completed("12345").unwrap());
        let entry = ledger.get_entry("12345").unwrap().unwrap();
        assert_eq!(entry.state, ProcessingState::Failed(FailureKind::NotFound));
        assert_eq!(entry.message.as_deref(), Some("HTTP 404"));
    }

    #[test]
    fn test_claim_does_not_downgrade_terminal_state() {
        let mut ledger = SqliteLedger::new_in_memory().unwrap();
        let run_id = ledger.create_run("test_hash").unwrap();

        ledger.claim("12345", run_id).unwrap();
        ledger.mark_succeeded("12345", 1, run_id).unwrap();

        // Re-claiming a completed identifier must be a no-op
        ledger.claim("12345", run_id).unwrap();
        let entry = ledger.get_entry("12345").unwrap().unwrap();
        assert_eq!(entry.state, ProcessingState::Succeeded);
        assert!(ledger.is_completed("12345").unwrap());
    }

    #[test]
    fn test_failure_does_not_overwrite_success() {
        let mut ledger = SqliteLedger::new_in_memory().unwrap();
        let run_id = ledger.create_run("test_hash").unwrap();

        ledger.mark_succeeded("12345", 1, run_id).unwrap();
        ledger
            .mark_failed("12345", FailureKind::RetryExhausted, 5, "timeout", run_id)
            .unwrap();

        let entry = ledger.get_entry("12345").unwrap().unwrap();
        assert_eq!(entry.state, ProcessingState::Succeeded);
    }

    #[test]
    fn test_mark_succeeded_without_claim() {
        // Reconciliation marks identifiers found in the output file even if
        // they were never claimed in this ledger
        let mut ledger = SqliteLedger::new_in_memory().unwrap();
        let run_id = ledger.create_run("test_hash").unwrap();

        ledger.mark_succeeded("99999", 0, run_id).unwrap();
        assert!(ledger.is_completed("99999").unwrap());
    }

    #[test]
    fn test_pending_survives_as_incomplete() {
        // A pending entry left by an interrupted run is re-fetchable
        let mut ledger = SqliteLedger::new_in_memory().unwrap();
        let run_id = ledger.create_run("test_hash").unwrap();

        ledger.claim("777", run_id).unwrap();
        assert!(!ledger.is_completed("777").unwrap());
        assert_eq!(ledger.count_pending().unwrap(), 1);
    }

    #[test]
    fn test_reset_failed() {
        let mut ledger = SqliteLedger::new_in_memory().unwrap();
        let run_id = ledger.create_run("test_hash").unwrap();

        ledger.claim("1", run_id).unwrap();
        ledger.mark_succeeded("1", 1, run_id).unwrap();
        ledger.claim("2", run_id).unwrap();
        ledger
            .mark_failed("2", FailureKind::NotFound, 1, "HTTP 404", run_id)
            .unwrap();
        ledger.claim("3", run_id).unwrap();
        ledger
            .mark_failed("3", FailureKind::RetryExhausted, 5, "HTTP 503", run_id)
            .unwrap();

        let reset = ledger.reset_failed().unwrap();
        assert_eq!(reset, 2);

        // Failed identifiers become re-fetchable; success is untouched
        assert!(!ledger.is_completed("2").unwrap());
        assert!(!ledger.is_completed("3").unwrap());
        assert!(ledger.is_completed("1").unwrap());
    }

    #[test]
    fn test_count_failed_by_kind() {
        let mut ledger = SqliteLedger::new_in_memory().unwrap();
        let run_id = ledger.create_run("test_hash").unwrap();

        for (id, kind) in [
            ("1", FailureKind::NotFound),
            ("2", FailureKind::NotFound),
            ("3", FailureKind::RetryExhausted),
        ] {
            ledger.claim(id, run_id).unwrap();
            ledger.mark_failed(id, kind, 1, "err", run_id).unwrap();
        }

        let by_kind = ledger.count_failed_by_kind().unwrap();
        assert_eq!(by_kind.get(&FailureKind::NotFound), Some(&2));
        assert_eq!(by_kind.get(&FailureKind::RetryExhausted), Some(&1));
        assert_eq!(by_kind.get(&FailureKind::MalformedResponse), None);
    }

    #[test]
    fn test_complete_run() {
        let mut ledger = SqliteLedger::new_in_memory().unwrap();
        let run_id = ledger.create_run("test_hash").unwrap();

        ledger.complete_run(run_id).unwrap();

        let run = ledger.get_latest_run().unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_update_missing_run_fails() {
        let mut ledger = SqliteLedger::new_in_memory().unwrap();
        assert!(matches!(
            ledger.complete_run(42),
            Err(LedgerError::RunNotFound(42))
        ));
    }
}
