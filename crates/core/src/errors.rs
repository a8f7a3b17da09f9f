//! Core error types for the bond dashboard.
//!
//! This module defines backend-agnostic error types. Storage-specific errors
//! (Diesel, SQLite) are converted to [`DatabaseError`] by the storage layer,
//! and transport-specific errors (reqwest, WebDriver) are converted to
//! [`FetchError`] by the scrape layer.

use chrono::ParseError as ChronoParseError;
use std::num::{ParseFloatError, ParseIntError};
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the application.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Sync run failed: {0}")]
    Orchestration(#[from] OrchestrationError),

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Database-agnostic error type for storage operations.
///
/// All details are carried as `String` so the storage layer can convert
/// Diesel/SQLite errors into this format without leaking backend types.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique constraint was violated (e.g., duplicate identity key).
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// A foreign key constraint was violated.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A database transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Database migration failed.
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Errors surfaced by the source fetchers.
///
/// Transport-specific causes are stringified at the scrape-crate boundary so
/// this type stays free of reqwest/WebDriver dependencies. Each variant is
/// classified by [`is_transient`](Self::is_transient), which the retry policy
/// uses to decide whether another attempt can help.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network-level failure: timeout, connection reset, non-2xx status.
    #[error("Transport failure from {source_name}: {message}")]
    Transport { source_name: String, message: String },

    /// A UI element did not appear within the bounded wait.
    /// Distinct from transport failures for diagnostics.
    #[error("Timed out after {waited_secs}s waiting for element {selector} on {source_name}")]
    ElementWaitTimeout {
        source_name: String,
        selector: String,
        waited_secs: u64,
    },

    /// The whole page/payload could not be parsed (missing table, bad JSON).
    /// Individual bad rows are NOT this error; they are logged and skipped.
    #[error("Failed to parse {source_name} response: {message}")]
    PageParse { source_name: String, message: String },

    /// Browser session could not be established or an interaction step
    /// failed after all its fallbacks.
    #[error("Browser session failure on {source_name}: {message}")]
    Session { source_name: String, message: String },

    /// All retry attempts were exhausted; carries the last underlying cause.
    #[error("All {attempts} attempts failed for {source_name}: {last}")]
    RetriesExhausted {
        source_name: String,
        attempts: usize,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    pub fn transport(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn page_parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PageParse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn session(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Session {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Whether another attempt at the same request can plausibly succeed.
    ///
    /// Transport failures, element-wait timeouts, and session hiccups are
    /// transient; a page that parsed into garbage will parse into garbage
    /// again, and exhausted retries are terminal by definition.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::ElementWaitTimeout { .. } | Self::Session { .. } => true,
            Self::PageParse { .. } | Self::RetriesExhausted { .. } => false,
        }
    }
}

/// Validation errors for data parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Failed to parse number: {0}")]
    NumberParse(#[from] ParseFloatError),

    #[error("Failed to parse integer: {0}")]
    IntegerParse(#[from] ParseIntError),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),
}

/// Pipeline states of a synchronization run.
///
/// Used to label where a failed run died; the scheduler logs the stage and
/// owns the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    DeterminingMode,
    FetchingBse,
    StoringBse,
    FetchingNse,
    StoringNse,
    RecomputingSummaries,
}

impl std::fmt::Display for SyncStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncStage::DeterminingMode => "determining-mode",
            SyncStage::FetchingBse => "fetching-bse",
            SyncStage::StoringBse => "storing-bse",
            SyncStage::FetchingNse => "fetching-nse",
            SyncStage::StoringNse => "storing-nse",
            SyncStage::RecomputingSummaries => "recomputing-summaries",
        };
        f.write_str(s)
    }
}

/// Wraps any error that escapes a sync state and fails the run.
///
/// The orchestrator never self-retries; this error is reported to the
/// scheduler, which applies its own backoff.
#[derive(Error, Debug)]
#[error("sync failed in state {stage}: {source}")]
pub struct OrchestrationError {
    pub stage: SyncStage,
    #[source]
    pub source: Box<Error>,
}

impl OrchestrationError {
    pub fn new(stage: SyncStage, source: Error) -> Self {
        Self {
            stage,
            source: Box::new(source),
        }
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_is_transient() {
        let err = FetchError::transport("BSE", "connection reset");
        assert!(err.is_transient());
    }

    #[test]
    fn test_element_wait_timeout_is_transient() {
        let err = FetchError::ElementWaitTimeout {
            source_name: "BSE".to_string(),
            selector: "#ContentPlaceHolder1_gvDebt".to_string(),
            waited_secs: 180,
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_page_parse_is_terminal() {
        let err = FetchError::page_parse("NSE", "missing data field");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_retries_exhausted_is_terminal_and_keeps_cause() {
        let err = FetchError::RetriesExhausted {
            source_name: "BSE".to_string(),
            attempts: 3,
            last: Box::new(FetchError::transport("BSE", "timeout")),
        };
        assert!(!err.is_transient());
        assert!(err.to_string().contains("3 attempts"));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_orchestration_error_names_stage() {
        let err = OrchestrationError::new(
            SyncStage::FetchingBse,
            Error::Fetch(FetchError::transport("BSE", "boom")),
        );
        assert_eq!(err.stage, SyncStage::FetchingBse);
        assert!(err.to_string().contains("fetching-bse"));
    }

    #[test]
    fn test_sync_stage_display() {
        assert_eq!(SyncStage::DeterminingMode.to_string(), "determining-mode");
        assert_eq!(
            SyncStage::RecomputingSummaries.to_string(),
            "recomputing-summaries"
        );
    }
}
