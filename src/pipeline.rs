//! Pipeline orchestration
//!
//! Public entry points chaining parse → score → materialize → filter → encode.

use crate::config::AnalyticsConfig;
use crate::encoder::{AnalysisReport, ReportEncoder};
use crate::error::AnalyticsError;
use crate::filter::FilterCondition;
use crate::merge::{ImportBatch, MergeCounts};
use crate::state::{AnalysisStore, IngestReport};

/// Convert CSV account records into a JSON analysis report.
///
/// # Arguments
/// * `csv_text` - CSV document with a header line
/// * `config` - Scoring weights, caps and reference time
///
/// # Example
/// ```ignore
/// let json = csv_to_report(&std::fs::read_to_string("accounts.csv")?, AnalyticsConfig::default())?;
/// ```
pub fn csv_to_report(csv_text: &str, config: AnalyticsConfig) -> Result<String, AnalyticsError> {
    let mut pipeline = AnalysisPipeline::new(config)?;
    let ingest = pipeline.ingest_csv(csv_text)?;
    pipeline.report_json(Some(ingest), None)
}

/// Stateful pipeline keeping a store and an encoder across calls.
///
/// Use this when a dataset is ingested once and then filtered, merged or
/// reported several times.
pub struct AnalysisPipeline {
    store: AnalysisStore,
    encoder: ReportEncoder,
}

impl AnalysisPipeline {
    pub fn new(config: AnalyticsConfig) -> Result<Self, AnalyticsError> {
        Ok(Self {
            store: AnalysisStore::new(config)?,
            encoder: ReportEncoder::new(),
        })
    }

    /// Create a pipeline from a JSON configuration document
    pub fn from_config_json(json: &str) -> Result<Self, AnalyticsError> {
        Self::new(AnalyticsConfig::from_json(json)?)
    }

    /// Stage 1-3: parse, score and invalidate views
    pub fn ingest_csv(&mut self, csv_text: &str) -> Result<IngestReport, AnalyticsError> {
        self.store.load_csv(csv_text)
    }

    /// Merge a JSON import batch into the current population
    pub fn import_json(&mut self, json: &str) -> Result<MergeCounts, AnalyticsError> {
        let batch = ImportBatch::from_json(json)?;
        self.store.import_batch(batch)
    }

    /// Replace the filter from a JSON document
    pub fn apply_filter_json(&mut self, json: &str) -> Result<(), AnalyticsError> {
        let filter: FilterCondition = serde_json::from_str(json)?;
        self.store.replace_filter(filter);
        Ok(())
    }

    pub fn report(&self, ingest: Option<IngestReport>, merge: Option<MergeCounts>) -> AnalysisReport {
        self.encoder.encode(&self.store, ingest, merge)
    }

    pub fn report_json(
        &self,
        ingest: Option<IngestReport>,
        merge: Option<MergeCounts>,
    ) -> Result<String, AnalyticsError> {
        self.encoder.encode_to_json(&self.store, ingest, merge)
    }

    pub fn store(&self) -> &AnalysisStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AnalysisStore {
        &mut self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_csv() -> &'static str {
        "user_id,registration_date,location,last_active_date,role,interests,post_count,interactions,follower_count,following_count
user1,2024-01-01,Paris,2024-06-01T09:00:00Z,information-source,\"technology;sports\",50,400,9000,12
user2,2024-01-02,Paris,2024-06-01T21:00:00Z,information-seeker,\"entertainment;fashion\",3,40,15,400
user3,2024-02-11,Rome,2024-05-28T13:00:00Z,general,technology,N/A,120,300,50
"
    }

    fn fixed_config() -> AnalyticsConfig {
        AnalyticsConfig::from_json(r#"{"reference_time": "2024-06-02T00:00:00Z"}"#).unwrap()
    }

    #[test]
    fn test_csv_to_report() {
        let json = csv_to_report(sample_csv(), fixed_config()).unwrap();
        let report: AnalysisReport = serde_json::from_str(&json).unwrap();

        assert_eq!(report.summary.total_accounts, 3);
        assert_eq!(report.views.network.edges.len(), 1);
        assert_eq!(report.views.network.edges[0].source, "user1");
        assert_eq!(report.views.network.edges[0].target, "user3");

        // "N/A" post count reads as zero
        let user3 = report
            .views
            .scatter
            .iter()
            .find(|p| p.user_id == "user3")
            .unwrap();
        assert_eq!(user3.post_count, 0);

        let ingest = report.ingest.unwrap();
        assert_eq!(ingest.accepted, 3);
        assert_eq!(ingest.warnings.len(), 1);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let first = csv_to_report(sample_csv(), fixed_config()).unwrap();
        let second = csv_to_report(sample_csv(), fixed_config()).unwrap();
        let a: AnalysisReport = serde_json::from_str(&first).unwrap();
        let b: AnalysisReport = serde_json::from_str(&second).unwrap();

        assert_eq!(a.views.scatter, b.views.scatter);
        assert_eq!(a.views.time_series, b.views.time_series);
        assert_eq!(a.filtered.stats, b.filtered.stats);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let result = csv_to_report("", AnalyticsConfig::default());
        assert!(matches!(result, Err(AnalyticsError::EmptyDataset)));
    }

    #[test]
    fn test_pipeline_filter_and_merge() {
        let mut pipeline = AnalysisPipeline::new(fixed_config()).unwrap();
        pipeline.ingest_csv(sample_csv()).unwrap();

        pipeline
            .apply_filter_json(r#"{"regions": ["Paris"]}"#)
            .unwrap();
        let report = pipeline.report(None, None);
        assert_eq!(report.summary.filtered_accounts, 2);
        assert_eq!(report.filter.regions, vec!["Paris"]);

        let counts = pipeline
            .import_json(
                r#"{
                    "profiles": [{"user_id": "user4", "role": "general", "interests": ["sports"], "location": "Paris"}],
                    "behaviors": [{"user_id": "user4", "post_count": 7, "interaction_count": 1, "follower_count": 0, "following_count": 0}]
                }"#,
            )
            .unwrap();
        assert_eq!(counts.inserted, 1);

        let report = pipeline.report(None, Some(counts));
        assert_eq!(report.summary.total_accounts, 4);
        assert_eq!(report.summary.filtered_accounts, 3);
        assert_eq!(report.merge.map(|m| m.inserted), Some(1));
    }

    #[test]
    fn test_invalid_config_json() {
        let result = AnalysisPipeline::from_config_json(r#"{"history_capacity": 0}"#);
        assert!(matches!(result, Err(AnalyticsError::InvalidConfig(_))));
    }
}
