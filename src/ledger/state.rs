/// Processing state definitions for tracking per-identifier progress
///
/// This module defines the states an identifier moves through during a run,
/// and the failure taxonomy recorded for permanently failed identifiers.
use std::fmt;

/// Why an identifier permanently failed
///
/// Recorded in the ledger and the failure log. `RetryExhausted` is kept
/// distinct from the true permanent kinds so an operator can tell "the API
/// was down" apart from "this identifier is invalid".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The API reported the identifier does not exist (HTTP 404)
    NotFound,

    /// The response payload could not be mapped to a product record
    MalformedResponse,

    /// A non-retryable HTTP status other than 404 (4xx, excluding 429)
    HttpStatus,

    /// A transient error persisted past the retry budget
    RetryExhausted,
}

impl FailureKind {
    /// Converts the failure kind to its database/log string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::MalformedResponse => "malformed_response",
            Self::HttpStatus => "http_status",
            Self::RetryExhausted => "retry_exhausted",
        }
    }

    /// Parses a failure kind from its database/log string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "not_found" => Some(Self::NotFound),
            "malformed_response" => Some(Self::MalformedResponse),
            "http_status" => Some(Self::HttpStatus),
            "retry_exhausted" => Some(Self::RetryExhausted),
            _ => None,
        }
    }

    /// Returns all failure kinds
    pub fn all_kinds() -> Vec<Self> {
        vec![
            Self::NotFound,
            Self::MalformedResponse,
            Self::HttpStatus,
            Self::RetryExhausted,
        ]
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Represents the current state of an identifier in the pipeline
///
/// State is monotonic: once an identifier reaches a terminal state it never
/// returns to `Pending` within the same ledger. Re-attempting failures is an
/// explicit operation (`Ledger::reset_failed`), not something the run loop
/// does on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingState {
    /// Identifier has been claimed for fetching but has no terminal result yet
    Pending,

    /// Record fetched and appended to the output dataset
    Succeeded,

    /// Identifier permanently failed with the given kind
    Failed(FailureKind),
}

impl ProcessingState {
    /// Returns true if this is a terminal state (skip on resume)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns true if this represents a permanent failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Converts the state to its database string representation
    ///
    /// The failure kind is stored in a separate column, so all failed states
    /// map to a single string here.
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed(_) => "failed",
        }
    }

    /// Parses a state from its database representation plus the optional
    /// failure kind column
    pub fn from_db_strings(state: &str, kind: Option<&str>) -> Option<Self> {
        match state {
            "pending" => Some(Self::Pending),
            "succeeded" => Some(Self::Succeeded),
            "failed" => {
                let kind = kind.and_then(FailureKind::from_db_string)?;
                Some(Self::Failed(kind))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(kind) => write!(f, "failed({})", kind),
            other => write!(f, "{}", other.to_db_string()),
        }
    }
}
