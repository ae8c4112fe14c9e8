//! Merge-by-key bulk import
//!
//! [`reconcile`] folds a batch of pre-parsed records into a population without
//! touching the original. Profiles and behaviors are matched by `user_id`
//! (existing accounts updated in place, new ones appended); time-series points
//! are matched by `timestamp`. A point is dropped when its day was already
//! imported or is covered by a bucket derived from the merged population.
//!
//! Pairing is checked up front: a behavior with no profile in the batch or the
//! population rejects the whole batch.

use crate::error::AnalyticsError;
use crate::types::{
    normalize_interests, Account, ActivityCounters, Behavior, Population, Profile, TimeSeriesPoint,
};
use crate::views::timeseries::bucket_by_day;
use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Externally supplied records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportBatch {
    pub profiles: Vec<Profile>,
    pub behaviors: Vec<Behavior>,
    pub time_series: Vec<TimeSeriesPoint>,
}

impl ImportBatch {
    pub fn from_json(json: &str) -> Result<Self, AnalyticsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty() && self.behaviors.is_empty() && self.time_series.is_empty()
    }
}

/// Counts reported by a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeCounts {
    /// Accounts appended to the population
    pub inserted: usize,
    /// Existing accounts whose profile or behavior was replaced
    pub updated: usize,
    /// Time-series points added
    pub series_inserted: usize,
    /// Time-series points dropped for a day already imported or derived
    pub series_dropped: usize,
}

/// Result of a successful merge. Scores are not yet re-derived.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub population: Population,
    /// Imported time-series points, ascending by timestamp
    pub time_series: Vec<TimeSeriesPoint>,
    pub counts: MergeCounts,
}

/// Merge `batch` into `current` and into the previously imported series.
///
/// `offset` is the reference zone used to bucket the merged population by day.
pub fn reconcile(
    current: &Population,
    batch: ImportBatch,
    imported_series: &[TimeSeriesPoint],
    offset: FixedOffset,
) -> Result<MergeOutcome, AnalyticsError> {
    let ImportBatch {
        profiles,
        behaviors,
        time_series,
    } = batch;

    let batch_ids: HashSet<&str> = profiles.iter().map(|p| p.user_id.as_str()).collect();
    if let Some(orphan) = behaviors.iter().find(|behavior| {
        !batch_ids.contains(behavior.user_id.as_str()) && current.get(&behavior.user_id).is_none()
    }) {
        return Err(AnalyticsError::OrphanBehavior(orphan.user_id.clone()));
    }

    let mut accounts: Vec<Account> = current.accounts().to_vec();
    let mut positions: HashMap<String, usize> = accounts
        .iter()
        .enumerate()
        .map(|(idx, account)| (account.user_id().to_string(), idx))
        .collect();
    let original_len = accounts.len();
    let mut touched: HashSet<usize> = HashSet::new();

    // Last behavior per id wins
    let mut incoming_behaviors: HashMap<String, Behavior> = behaviors
        .into_iter()
        .map(|behavior| (behavior.user_id.clone(), behavior))
        .collect();

    for profile in profiles {
        // Deserialized profiles skip the constructor's interest normalization
        let profile = Profile {
            interests: normalize_interests(profile.interests),
            ..profile
        };
        let behavior = incoming_behaviors.remove(&profile.user_id);
        match positions.get(&profile.user_id) {
            Some(&idx) => {
                let kept = behavior.unwrap_or_else(|| accounts[idx].behavior().clone());
                accounts[idx] = Account::from_parts(profile, kept);
                touched.insert(idx);
            }
            None => {
                let account = match behavior {
                    Some(behavior) => Account::from_parts(profile, behavior),
                    None => Account::new(profile, ActivityCounters::default(), None),
                };
                positions.insert(account.user_id().to_string(), accounts.len());
                accounts.push(account);
            }
        }
    }

    // Remaining behaviors belong to accounts already in the population
    for (user_id, behavior) in incoming_behaviors {
        if let Some(&idx) = positions.get(&user_id) {
            let profile = accounts[idx].profile().clone();
            accounts[idx] = Account::from_parts(profile, behavior);
            touched.insert(idx);
        }
    }

    let population = Population::from_accounts(accounts);
    let derived_days: BTreeSet<NaiveDate> = bucket_by_day(&population, offset)
        .into_iter()
        .map(|point| point.timestamp)
        .collect();
    let (time_series, series_inserted, series_dropped) =
        merge_series(imported_series, time_series, &derived_days);

    let counts = MergeCounts {
        inserted: population.len() - original_len,
        updated: touched.iter().filter(|&&idx| idx < original_len).count(),
        series_inserted,
        series_dropped,
    };
    debug!(?counts, "reconciled import batch");

    Ok(MergeOutcome {
        population,
        time_series,
        counts,
    })
}

/// Add incoming points whose day is neither imported nor derived
fn merge_series(
    existing: &[TimeSeriesPoint],
    incoming: Vec<TimeSeriesPoint>,
    derived_days: &BTreeSet<NaiveDate>,
) -> (Vec<TimeSeriesPoint>, usize, usize) {
    let mut by_day: BTreeMap<NaiveDate, TimeSeriesPoint> = existing
        .iter()
        .map(|point| (point.timestamp, point.clone()))
        .collect();

    let mut inserted = 0;
    let mut dropped = 0;
    for point in incoming {
        if by_day.contains_key(&point.timestamp) || derived_days.contains(&point.timestamp) {
            dropped += 1;
        } else {
            by_day.insert(point.timestamp, point);
            inserted += 1;
        }
    }

    (by_day.into_values().collect(), inserted, dropped)
}

/// Combine derived buckets with imported points.
///
/// A derived bucket wins over an imported point for the same day.
pub fn overlay_series(
    derived: &[TimeSeriesPoint],
    imported: &[TimeSeriesPoint],
) -> Vec<TimeSeriesPoint> {
    let mut by_day: BTreeMap<NaiveDate, TimeSeriesPoint> = imported
        .iter()
        .map(|point| (point.timestamp, point.clone()))
        .collect();
    for point in derived {
        by_day.insert(point.timestamp, point.clone());
    }
    by_day.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Interest, Role};
    use chrono::{Datelike, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn profile(id: &str, role: Role) -> Profile {
        Profile::new(id, role, vec![Interest::Travel], None, None)
    }

    fn behavior(id: &str, posts: u64) -> Behavior {
        Behavior::new(
            id,
            ActivityCounters {
                post_count: posts,
                ..ActivityCounters::default()
            },
            None,
        )
    }

    fn base() -> Population {
        Population::from_accounts([
            Account::new(profile("a", Role::General), ActivityCounters::default(), None),
            Account::new(profile("b", Role::General), ActivityCounters::default(), None),
        ])
    }

    fn point(day: u32, active: u32) -> TimeSeriesPoint {
        TimeSeriesPoint {
            active_user_count: active,
            ..TimeSeriesPoint::empty(NaiveDate::from_ymd_opt(2024, 7, day).unwrap())
        }
    }

    #[test]
    fn test_update_in_place_and_append() {
        let batch = ImportBatch {
            profiles: vec![profile("b", Role::InformationSource), profile("c", Role::Inactive)],
            behaviors: vec![behavior("c", 9), behavior("a", 4)],
            time_series: Vec::new(),
        };

        let outcome = reconcile(&base(), batch, &[], utc()).unwrap();
        let ids: Vec<&str> = outcome.population.accounts().iter().map(Account::user_id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(outcome.counts.inserted, 1);
        assert_eq!(outcome.counts.updated, 2);

        let population = &outcome.population;
        assert_eq!(population.get("a").unwrap().behavior().post_count, 4);
        assert_eq!(population.get("b").unwrap().profile().role, Role::InformationSource);
        assert_eq!(population.get("c").unwrap().behavior().post_count, 9);
    }

    #[test]
    fn test_new_profile_without_behavior_gets_zero_counters() {
        let batch = ImportBatch {
            profiles: vec![profile("z", Role::General)],
            ..ImportBatch::default()
        };
        let outcome = reconcile(&base(), batch, &[], utc()).unwrap();
        let z = outcome.population.get("z").unwrap();
        assert_eq!(z.behavior().counters(), ActivityCounters::default());
        assert_eq!(z.behavior().user_id, "z");
    }

    #[test]
    fn test_orphan_behavior_rejects_batch() {
        let current = base();
        let batch = ImportBatch {
            profiles: vec![profile("c", Role::General)],
            behaviors: vec![behavior("c", 1), behavior("ghost", 1)],
            time_series: Vec::new(),
        };

        let err = reconcile(&current, batch, &[], utc()).unwrap_err();
        assert!(matches!(err, AnalyticsError::OrphanBehavior(ref id) if id == "ghost"));
        assert_eq!(current.len(), 2);
    }

    #[test]
    fn test_series_duplicates_dropped() {
        let existing = vec![point(1, 5), point(3, 7)];
        let batch = ImportBatch {
            time_series: vec![point(3, 99), point(2, 1), point(2, 50)],
            ..ImportBatch::default()
        };

        let outcome = reconcile(&base(), batch, &existing, utc()).unwrap();
        assert_eq!(outcome.counts.series_inserted, 1);
        assert_eq!(outcome.counts.series_dropped, 2);

        let actives: Vec<u32> = outcome.time_series.iter().map(|p| p.active_user_count).collect();
        assert_eq!(actives, vec![5, 1, 7]);
    }

    #[test]
    fn test_series_point_on_derived_day_dropped() {
        let active_day = Utc.with_ymd_and_hms(2024, 7, 2, 9, 0, 0).unwrap();
        let current = Population::from_accounts([Account::new(
            profile("a", Role::General),
            ActivityCounters::default(),
            Some(active_day),
        )]);
        let batch = ImportBatch {
            time_series: vec![point(2, 999), point(4, 3)],
            ..ImportBatch::default()
        };

        let outcome = reconcile(&current, batch, &[], utc()).unwrap();
        assert_eq!(outcome.counts.series_inserted, 1);
        assert_eq!(outcome.counts.series_dropped, 1);

        let days: Vec<u32> = outcome.time_series.iter().map(|p| p.timestamp.day()).collect();
        assert_eq!(days, vec![4]);
    }

    #[test]
    fn test_series_point_on_day_derived_from_same_batch_dropped() {
        let active_day = Utc.with_ymd_and_hms(2024, 7, 5, 23, 30, 0).unwrap();
        let batch = ImportBatch {
            profiles: vec![profile("n", Role::General)],
            behaviors: vec![Behavior::new("n", ActivityCounters::default(), Some(active_day))],
            time_series: vec![point(5, 42)],
        };

        let outcome = reconcile(&base(), batch, &[], utc()).unwrap();
        assert_eq!(outcome.counts.series_inserted, 0);
        assert_eq!(outcome.counts.series_dropped, 1);
        assert!(outcome.time_series.is_empty());
    }

    #[test]
    fn test_overlay_prefers_derived() {
        let merged = overlay_series(&[point(2, 10)], &[point(1, 1), point(2, 2)]);
        let actives: Vec<u32> = merged.iter().map(|p| p.active_user_count).collect();
        assert_eq!(actives, vec![1, 10]);
    }

    #[test]
    fn test_batch_from_json() {
        let batch = ImportBatch::from_json(
            r#"{"profiles": [{"user_id": "q", "role": "general", "interests": ["travel"]}]}"#,
        )
        .unwrap();
        assert_eq!(batch.profiles.len(), 1);
        assert!(batch.behaviors.is_empty());
        assert!(!batch.is_empty());

        let empty_interests = ImportBatch::from_json(
            r#"{"profiles": [{"user_id": "r", "role": "general", "interests": []}]}"#,
        )
        .unwrap();
        let outcome = reconcile(&base(), empty_interests, &[], utc()).unwrap();
        assert_eq!(
            outcome.population.get("r").unwrap().profile().interests,
            vec![crate::types::DEFAULT_INTEREST]
        );
    }
}
