//! Report encoding
//!
//! Packages the state of an [`AnalysisStore`] into a self-describing JSON
//! report: producer metadata, the active filter, every materialized view, the
//! filtered subsets with their statistics, and the ingest or merge summary.

use crate::error::AnalyticsError;
use crate::filter::FilterCondition;
use crate::merge::MergeCounts;
use crate::scoring::BatchMaxima;
use crate::state::{AnalysisStore, FilteredSubsets, IngestReport};
use crate::views::MaterializedViews;
use crate::{LENS_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report layout version
pub const REPORT_VERSION: &str = "1.0.0";

/// Who produced a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Population-level summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_accounts: usize,
    pub filtered_accounts: usize,
    pub maxima: BatchMaxima,
    pub history_len: usize,
}

/// Full analysis report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub summary: ReportSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingest: Option<IngestReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeCounts>,
    pub filter: FilterCondition,
    pub views: MaterializedViews,
    pub filtered: FilteredSubsets,
}

/// Encoder stamping reports with a stable instance id
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create an encoder with a fresh instance id
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Snapshot the store into a report
    pub fn encode(
        &self,
        store: &AnalysisStore,
        ingest: Option<IngestReport>,
        merge: Option<MergeCounts>,
    ) -> AnalysisReport {
        let filtered = store.filtered().clone();
        AnalysisReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: LENS_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            summary: ReportSummary {
                total_accounts: store.population().len(),
                filtered_accounts: filtered.behaviors.len(),
                maxima: *store.maxima(),
                history_len: store.history().len(),
            },
            ingest,
            merge,
            filter: store.filter().clone(),
            views: store.views().clone(),
            filtered,
        }
    }

    /// Encode to a compact JSON string
    pub fn encode_to_json(
        &self,
        store: &AnalysisStore,
        ingest: Option<IngestReport>,
        merge: Option<MergeCounts>,
    ) -> Result<String, AnalyticsError> {
        let report = self.encode(store, ingest, merge);
        Ok(serde_json::to_string(&report)?)
    }
}
