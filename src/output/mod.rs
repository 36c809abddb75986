//! Output module for the result dataset and the failure log
//!
//! This module handles the two durable sinks of the pipeline:
//! - The tab-separated results file (one row per fetched product)
//! - The failure log (one entry per permanently failed identifier)
//!
//! Both are append-only and fsync every entry before returning, so a crash
//! immediately after an append can neither lose the entry nor leave a
//! half-written line.

mod failures;
pub mod stats;
mod tsv;

pub use failures::FailureLog;
pub use stats::{load_statistics, print_statistics, LedgerStatistics};
pub use tsv::{escape_field, load_written_ids, TsvWriter};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
