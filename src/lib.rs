//! Catalog-Harvest: a resumable product catalog fetcher
//!
//! This crate fetches product records from a remote catalog API for a large
//! list of identifiers, appends each success to a tab-separated output file,
//! logs permanent failures, and tracks per-identifier completion in a durable
//! ledger so an interrupted run can be relaunched without losing data or
//! re-fetching finished work.

pub mod config;
pub mod harvest;
pub mod ledger;
pub mod output;
pub mod source;

use thiserror::Error;

/// Main error type for Catalog-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger::LedgerError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Identifier source error: {0}")]
    Source(#[from] source::SourceError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid endpoint template: {0}")]
    InvalidEndpoint(String),
}

/// Result type alias for Catalog-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use harvest::{Controller, FetchOutcome, FetchReport, ProductRecord};
pub use ledger::{FailureKind, ProcessingState};
