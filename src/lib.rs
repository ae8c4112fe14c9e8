//! Cohort Lens - derivation engine for account activity analytics
//!
//! Cohort Lens turns delimited account records into population-relative scores
//! and a set of dependent views through a deterministic pipeline:
//! record parsing → scoring → view materialization → filtering → report encoding.
//!
//! ## Modules
//!
//! - **Ingestion**: [`parser`] reads CSV rows into paired profile/behavior accounts
//! - **Scoring**: [`scoring`] normalizes counters against the batch maxima
//! - **Views**: [`views`] builds the time series, heatmap, scatter, network and summaries
//! - **State**: [`state`] owns the population, filter, selection and interaction history

pub mod config;
pub mod encoder;
pub mod error;
pub mod filter;
pub mod history;
pub mod merge;
pub mod parser;
pub mod pipeline;
pub mod scoring;
pub mod state;
pub mod stats;
pub mod types;
pub mod views;

pub use config::AnalyticsConfig;
pub use error::AnalyticsError;
pub use filter::{DateRange, FilterCondition, FilterPatch, ScoreRange, SelectionPatch, SelectionState};
pub use history::{InteractionAction, InteractionHistory, InteractionRecord, ViewKind};
pub use merge::{reconcile, ImportBatch, MergeCounts};
pub use parser::RecordParser;
pub use pipeline::{csv_to_report, AnalysisPipeline};
pub use scoring::ScoringEngine;
pub use state::{AnalysisStore, IngestReport};
pub use views::{materialize, MaterializedViews};

/// Cohort Lens version embedded in every report
pub const LENS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "cohort-lens";
