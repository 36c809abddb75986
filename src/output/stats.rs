//! Ledger statistics reporting
//!
//! Loads aggregate counts from the progress ledger for the --stats report
//! and the end-of-run summary.

use crate::ledger::{FailureKind, Ledger, LedgerResult};
use std::collections::HashMap;

/// Aggregate statistics over the progress ledger
#[derive(Debug, Clone, Default)]
pub struct LedgerStatistics {
    pub total: u64,
    pub succeeded: u64,
    pub pending: u64,
    pub failed_by_kind: HashMap<FailureKind, u64>,
}

impl LedgerStatistics {
    pub fn failed_total(&self) -> u64 {
        self.failed_by_kind.values().sum()
    }
}

/// Loads statistics from the ledger
pub fn load_statistics(ledger: &dyn Ledger) -> LedgerResult<LedgerStatistics> {
    Ok(LedgerStatistics {
        total: ledger.count_total()?,
        succeeded: ledger.count_succeeded()?,
        pending: ledger.count_pending()?,
        failed_by_kind: ledger.count_failed_by_kind()?,
    })
}

/// Prints statistics in a human-readable form
pub fn print_statistics(stats: &LedgerStatistics) {
    println!("=== Harvest Ledger Statistics ===");
    println!("Total identifiers seen: {}", stats.total);
    println!("  Succeeded:            {}", stats.succeeded);
    println!("  Failed:               {}", stats.failed_total());

    let mut kinds: Vec<_> = stats.failed_by_kind.iter().collect();
    kinds.sort_by_key(|(kind, _)| kind.to_db_string());
    for (kind, count) in kinds {
        println!("    {:<20} {}", format!("{}:", kind), count);
    }

    println!("  Pending (interrupted): {}", stats.pending);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::SqliteLedger;

    #[test]
    fn test_load_statistics() {
        let mut ledger = SqliteLedger::new_in_memory().unwrap();
        let run_id = ledger.create_run("hash").unwrap();

        ledger.claim("1", run_id).unwrap();
        ledger.mark_succeeded("1", 1, run_id).unwrap();
        ledger.claim("2", run_id).unwrap();
        ledger
            .mark_failed("2", FailureKind::NotFound, 1, "HTTP 404", run_id)
            .unwrap();
        ledger.claim("3", run_id).unwrap();

        let stats = load_statistics(&ledger).unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.failed_total(), 1);
        assert_eq!(stats.failed_by_kind.get(&FailureKind::NotFound), Some(&1));
    }

    #[test]
    fn test_empty_ledger_statistics() {
        let ledger = SqliteLedger::new_in_memory().unwrap();
        let stats = load_statistics(&ledger).unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.failed_total(), 0);
    }
}
