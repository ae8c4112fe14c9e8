//! Per-region account summary

use super::timeseries::incremental_mean;
use crate::types::{Population, RegionSummary, Role};
use std::collections::HashMap;

/// Group accounts by location.
///
/// Accounts without a location are left out. Regions are ordered by user
/// count, largest first, then by name.
pub fn summarize(population: &Population) -> Vec<RegionSummary> {
    let mut regions: HashMap<&str, RegionSummary> = HashMap::new();

    for account in population.accounts() {
        let Some(region) = account.profile().location.as_deref() else {
            continue;
        };
        let behavior = account.behavior();

        let summary = regions.entry(region).or_insert_with(|| RegionSummary {
            region: region.to_string(),
            user_count: 0,
            avg_activity_score: 0.0,
            avg_influence_score: 0.0,
            role_distribution: Role::ALL.iter().map(|role| (*role, 0)).collect(),
        });

        summary.user_count += 1;
        let n = summary.user_count as f64;
        summary.avg_activity_score =
            incremental_mean(summary.avg_activity_score, behavior.activity_score as f64, n);
        summary.avg_influence_score =
            incremental_mean(summary.avg_influence_score, behavior.influence_score as f64, n);
        *summary
            .role_distribution
            .entry(account.profile().role)
            .or_insert(0) += 1;
    }

    let mut summaries: Vec<RegionSummary> = regions.into_values().collect();
    summaries.sort_by(|a, b| {
        b.user_count
            .cmp(&a.user_count)
            .then_with(|| a.region.cmp(&b.region))
    });
    summaries
}
