//! Analysis store: the owner of the population and the filter state
//!
//! All mutation goes through the store. Ingestion and import re-score the whole
//! population and drop every cached view; filter changes drop only the
//! filtered subsets. Views and subsets are rebuilt lazily on first access.
//!
//! Fetching source text is the caller's business. A fetch is bracketed by
//! [`AnalysisStore::begin_ingest`] and [`AnalysisStore::complete_ingest`];
//! while one is in flight no other ingestion or import is accepted.

use crate::config::AnalyticsConfig;
use crate::error::AnalyticsError;
use crate::filter::{
    filter_accounts, filter_profiles, filter_time_series, DateRange, FilterCondition, FilterPatch,
    SelectionPatch, SelectionState,
};
use crate::history::{InteractionAction, InteractionHistory, InteractionRecord, ViewKind};
use crate::merge::{overlay_series, reconcile, ImportBatch, MergeCounts};
use crate::parser::{FieldWarning, RecordParser, SkippedRow};
use crate::scoring::{BatchMaxima, ScoringEngine};
use crate::stats::aggregate;
use crate::types::{AggregatedStats, Behavior, Population, Profile, TimeSeriesPoint};
use crate::views::{materialize, MaterializedViews, ViewSettings};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Handle for an in-flight ingestion
#[derive(Debug, PartialEq, Eq)]
pub struct IngestTicket {
    id: u64,
}

/// Outcome of a CSV ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Accounts in the new population
    pub accepted: usize,
    pub skipped_rows: Vec<SkippedRow>,
    pub warnings: Vec<FieldWarning>,
    /// Normalization denominators of the batch
    pub maxima: BatchMaxima,
}

/// Population subsets passing the current filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilteredSubsets {
    pub profiles: Vec<Profile>,
    pub behaviors: Vec<Behavior>,
    pub time_series: Vec<TimeSeriesPoint>,
    pub stats: AggregatedStats,
}

/// Stateful analytics store
#[derive(Debug)]
pub struct AnalysisStore {
    config: AnalyticsConfig,
    settings: ViewSettings,
    engine: ScoringEngine,
    population: Population,
    imported_series: Vec<TimeSeriesPoint>,
    maxima: BatchMaxima,
    filter: FilterCondition,
    selection: SelectionState,
    history: InteractionHistory,
    in_flight: Option<u64>,
    next_ticket: u64,
    population_version: u64,
    filter_version: u64,
    last_update: Option<DateTime<Utc>>,
    views: OnceCell<MaterializedViews>,
    filtered: OnceCell<FilteredSubsets>,
}

impl AnalysisStore {
    /// Create an empty store after validating the configuration
    pub fn new(config: AnalyticsConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        let settings = ViewSettings::from_config(&config)?;
        Ok(Self {
            engine: ScoringEngine::new(config.weights),
            history: InteractionHistory::new(config.history_capacity),
            settings,
            config,
            population: Population::default(),
            imported_series: Vec::new(),
            maxima: BatchMaxima::default(),
            filter: FilterCondition::default(),
            selection: SelectionState::default(),
            in_flight: None,
            next_ticket: 0,
            population_version: 0,
            filter_version: 0,
            last_update: None,
            views: OnceCell::new(),
            filtered: OnceCell::new(),
        })
    }

    // ------------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------------

    /// Mark an ingestion as started
    pub fn begin_ingest(&mut self) -> Result<IngestTicket, AnalyticsError> {
        if self.in_flight.is_some() {
            return Err(AnalyticsError::IngestionInProgress);
        }
        self.next_ticket += 1;
        self.in_flight = Some(self.next_ticket);
        debug!(ticket = self.next_ticket, "ingestion started");
        Ok(IngestTicket {
            id: self.next_ticket,
        })
    }

    /// Finish an ingestion with the fetched text or the fetch failure.
    ///
    /// The loading flag is cleared whatever the outcome. On failure the
    /// previous population stays in place.
    pub fn complete_ingest(
        &mut self,
        ticket: IngestTicket,
        source: Result<String, String>,
    ) -> Result<IngestReport, AnalyticsError> {
        if self.in_flight != Some(ticket.id) {
            return Err(AnalyticsError::NoIngestionInFlight);
        }
        self.in_flight = None;

        let text = source.map_err(|reason| {
            warn!(%reason, "source fetch failed");
            AnalyticsError::SourceUnavailable(reason)
        })?;
        self.ingest_text(&text)
    }

    /// Ingest CSV text that is already in memory
    pub fn load_csv(&mut self, text: &str) -> Result<IngestReport, AnalyticsError> {
        let ticket = self.begin_ingest()?;
        self.complete_ingest(ticket, Ok(text.to_string()))
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    fn ingest_text(&mut self, text: &str) -> Result<IngestReport, AnalyticsError> {
        let parsed = RecordParser::parse(text)?;

        let mut population = Population::from_accounts(parsed.accounts);
        let maxima = self
            .engine
            .score_population(&mut population, self.config.reference_now());

        let report = IngestReport {
            accepted: population.len(),
            skipped_rows: parsed.skipped_rows,
            warnings: parsed.warnings,
            maxima,
        };

        self.imported_series.clear();
        self.replace_population(population, maxima);
        info!(
            accepted = report.accepted,
            skipped = report.skipped_rows.len(),
            warnings = report.warnings.len(),
            "ingested dataset"
        );
        Ok(report)
    }

    /// Merge pre-parsed records into the population and re-score it
    pub fn import_batch(&mut self, batch: ImportBatch) -> Result<MergeCounts, AnalyticsError> {
        if self.in_flight.is_some() {
            return Err(AnalyticsError::IngestionInProgress);
        }

        let outcome = reconcile(
            &self.population,
            batch,
            &self.imported_series,
            self.settings.reference_offset,
        )?;
        let mut population = outcome.population;
        let maxima = self
            .engine
            .score_population(&mut population, self.config.reference_now());

        self.imported_series = outcome.time_series;
        self.replace_population(population, maxima);
        info!(
            inserted = outcome.counts.inserted,
            updated = outcome.counts.updated,
            series_inserted = outcome.counts.series_inserted,
            series_dropped = outcome.counts.series_dropped,
            "imported batch"
        );
        Ok(outcome.counts)
    }

    fn replace_population(&mut self, population: Population, maxima: BatchMaxima) {
        self.population = population;
        self.maxima = maxima;
        self.population_version += 1;
        self.last_update = Some(Utc::now());
        self.views.take();
        self.filtered.take();
    }

    // ------------------------------------------------------------------
    // Filter and selection
    // ------------------------------------------------------------------

    /// Overlay a partial filter and log it
    pub fn update_filter(&mut self, patch: FilterPatch) {
        let mut filter = self.filter.clone();
        filter.apply(patch);
        self.set_filter(filter, "update filter");
    }

    /// Replace the whole filter and log it
    pub fn replace_filter(&mut self, filter: FilterCondition) {
        self.set_filter(filter, "replace filter");
    }

    /// Drop every constraint and clear the selection. One record holds both.
    pub fn reset_filter(&mut self) {
        self.install_filter(FilterCondition::default());
        self.selection = SelectionState::default();
        self.record(
            InteractionRecord::new(InteractionAction::Filter, ViewKind::Global, "reset filter")
                .with_filter(self.filter.clone())
                .with_selection(self.selection.clone()),
        );
    }

    fn set_filter(&mut self, filter: FilterCondition, description: &str) {
        self.install_filter(filter);
        self.record(
            InteractionRecord::new(InteractionAction::Filter, ViewKind::Global, description)
                .with_filter(self.filter.clone()),
        );
    }

    fn install_filter(&mut self, filter: FilterCondition) {
        self.filter = filter;
        self.filter_version += 1;
        self.filtered.take();
    }

    pub fn update_selection(&mut self, patch: SelectionPatch) {
        let mut selection = self.selection.clone();
        selection.apply(patch);
        self.set_selection(selection, InteractionAction::Select, ViewKind::Global, "update selection");
    }

    pub fn clear_selection(&mut self) {
        self.set_selection(
            SelectionState::default(),
            InteractionAction::Select,
            ViewKind::Global,
            "clear selection",
        );
    }

    /// Select a set of accounts from one view
    pub fn highlight(&mut self, view: ViewKind, user_ids: Vec<String>) {
        let mut selection = self.selection.clone();
        selection.selected_user_ids = user_ids;
        self.set_selection(selection, InteractionAction::Highlight, view, "highlight accounts");
    }

    /// Narrow the selected time range from one view
    pub fn zoom(&mut self, view: ViewKind, range: DateRange) {
        let mut selection = self.selection.clone();
        selection.selected_time_range = Some(range);
        self.set_selection(selection, InteractionAction::Zoom, view, "zoom time range");
    }

    fn set_selection(
        &mut self,
        selection: SelectionState,
        action: InteractionAction,
        view: ViewKind,
        description: &str,
    ) {
        self.selection = selection;
        self.record(
            InteractionRecord::new(action, view, description).with_selection(self.selection.clone()),
        );
    }

    /// Re-apply the filter and selection captured by a past record.
    ///
    /// This is a replay: one new record is appended and nothing is removed.
    pub fn revert_to_history(&mut self, id: Uuid) -> Result<(), AnalyticsError> {
        let record = self
            .history
            .get(id)
            .cloned()
            .ok_or_else(|| AnalyticsError::HistoryRecordNotFound(id.to_string()))?;

        let mut replay = InteractionRecord::new(record.action, record.view, "replay");
        if let Some(filter) = record.filter {
            self.install_filter(filter);
            replay = replay.with_filter(self.filter.clone());
        }
        if let Some(selection) = record.selection {
            self.selection = selection;
            replay = replay.with_selection(self.selection.clone());
        }
        self.record(replay);
        Ok(())
    }

    fn record(&mut self, record: InteractionRecord) {
        debug!(action = ?record.action, view = ?record.view, id = %record.id, "interaction recorded");
        self.history.push(record);
    }

    // ------------------------------------------------------------------
    // Derived data
    // ------------------------------------------------------------------

    /// Views over the whole population
    pub fn views(&self) -> &MaterializedViews {
        self.views.get_or_init(|| {
            debug!(version = self.population_version, "rebuilding views");
            let mut views = materialize(&self.population, &self.settings);
            if !self.imported_series.is_empty() {
                views.time_series = overlay_series(&views.time_series, &self.imported_series);
            }
            views
        })
    }

    /// Subsets and statistics under the current filter
    pub fn filtered(&self) -> &FilteredSubsets {
        self.filtered.get_or_init(|| {
            debug!(
                population_version = self.population_version,
                filter_version = self.filter_version,
                "rebuilding filtered subsets"
            );
            let time_series = filter_time_series(&self.views().time_series, &self.filter)
                .cloned()
                .collect();
            let accounts: Vec<_> = filter_accounts(&self.population, &self.filter).collect();

            FilteredSubsets {
                profiles: filter_profiles(&self.population, &self.filter)
                    .cloned()
                    .collect(),
                behaviors: accounts.iter().map(|a| a.behavior().clone()).collect(),
                time_series,
                stats: aggregate(accounts, self.config.active_user_threshold),
            }
        })
    }

    pub fn filtered_profiles(&self) -> &[Profile] {
        &self.filtered().profiles
    }

    pub fn filtered_behaviors(&self) -> &[Behavior] {
        &self.filtered().behaviors
    }

    pub fn filtered_time_series(&self) -> &[TimeSeriesPoint] {
        &self.filtered().time_series
    }

    pub fn stats(&self) -> &AggregatedStats {
        &self.filtered().stats
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn maxima(&self) -> &BatchMaxima {
        &self.maxima
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn filter(&self) -> &FilterCondition {
        &self.filter
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn history(&self) -> &InteractionHistory {
        &self.history
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }
}
