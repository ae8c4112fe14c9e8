//! Error types for Cohort Lens

use thiserror::Error;

/// Errors that can occur while ingesting or deriving analytics
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Dataset contains no usable rows")]
    EmptyDataset,

    #[error("Malformed row at line {line}: expected {expected} fields, found {found}")]
    MalformedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Behavior for user {0} has no matching profile")]
    OrphanBehavior(String),

    #[error("An ingestion is already in progress")]
    IngestionInProgress,

    #[error("No ingestion is in progress")]
    NoIngestionInFlight,

    #[error("Source text unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Interaction record not found: {0}")]
    HistoryRecordNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
