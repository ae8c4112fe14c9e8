//! View materializers
//!
//! Each view is a pure function of the scored population. They are independent
//! of each other and can be recomputed in any order:
//!
//! - [`timeseries`]: daily activity buckets
//! - [`heatmap`]: hour × weekday activity cells
//! - [`scatter`]: flat per-account points
//! - [`network`]: shared-interest graph
//! - [`regions`] and [`interests`]: supplementary summaries

pub mod heatmap;
pub mod interests;
pub mod network;
pub mod regions;
pub mod scatter;
pub mod timeseries;

use crate::config::AnalyticsConfig;
use crate::error::AnalyticsError;
use crate::types::{
    HeatmapCell, InterestCloudItem, NetworkGraph, Population, RegionSummary, ScatterPoint,
    TimeSeriesPoint,
};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters the materializers need from the configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSettings {
    pub network_edge_cap: usize,
    pub reference_offset: FixedOffset,
}

impl ViewSettings {
    pub fn from_config(config: &AnalyticsConfig) -> Result<Self, AnalyticsError> {
        Ok(Self {
            network_edge_cap: config.network_edge_cap,
            reference_offset: config.reference_offset()?,
        })
    }
}

/// All views derived from one population snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterializedViews {
    pub time_series: Vec<TimeSeriesPoint>,
    pub heatmap: Vec<HeatmapCell>,
    pub scatter: Vec<ScatterPoint>,
    pub network: NetworkGraph,
    pub regions: Vec<RegionSummary>,
    pub interest_cloud: Vec<InterestCloudItem>,
}

/// Run every materializer over the population
pub fn materialize(population: &Population, settings: &ViewSettings) -> MaterializedViews {
    let views = MaterializedViews {
        time_series: timeseries::bucket_by_day(population, settings.reference_offset),
        heatmap: heatmap::bin_by_hour_of_week(population, settings.reference_offset),
        scatter: scatter::project(population),
        network: network::synthesize(population, settings.network_edge_cap),
        regions: regions::summarize(population),
        interest_cloud: interests::interest_cloud(population),
    };

    debug!(
        accounts = population.len(),
        buckets = views.time_series.len(),
        cells = views.heatmap.len(),
        edges = views.network.edges.len(),
        "materialized views"
    );

    views
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Account, ActivityCounters, Interest, Profile, Role};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_materialize_empty_population() {
        let settings = ViewSettings::from_config(&AnalyticsConfig::default()).unwrap();
        let views = materialize(&Population::default(), &settings);
        assert_eq!(views, MaterializedViews::default());
    }

    #[test]
    fn test_views_cover_population() {
        let when = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let population = Population::from_accounts((0..5).map(|i| {
            Account::new(
                Profile::new(
                    format!("u{i}"),
                    Role::General,
                    vec![Interest::Sports],
                    None,
                    Some("Lagos".to_string()),
                ),
                ActivityCounters::default(),
                Some(when),
            )
        }));

        let settings = ViewSettings {
            network_edge_cap: 3,
            reference_offset: FixedOffset::east_opt(0).unwrap(),
        };
        let views = materialize(&population, &settings);

        assert_eq!(views.scatter.len(), 5);
        assert_eq!(views.network.nodes.len(), 5);
        assert_eq!(views.network.edges.len(), 3);
        assert_eq!(views.time_series.len(), 1);
        assert_eq!(views.heatmap.len(), 1);
        assert_eq!(views.regions[0].user_count, 5);
        assert_eq!(views.interest_cloud[0].value, 5);
    }
}
