//! Daily time-series bucketing
//!
//! Accounts are folded into calendar-day buckets keyed by their last activity.
//! Score averages are maintained as incremental means so the fold order does
//! not affect the result. Registrations add to `new_user_count` of their day.

use crate::types::{Behavior, Population, TimeSeriesPoint};
use chrono::{FixedOffset, NaiveDate};
use std::collections::BTreeMap;

/// Running bucket state
#[derive(Debug, Clone)]
struct Bucket {
    point: TimeSeriesPoint,
}

impl Bucket {
    fn new(day: NaiveDate) -> Self {
        Self {
            point: TimeSeriesPoint::empty(day),
        }
    }

    /// Fold one active account into the bucket
    fn add_active(&mut self, behavior: &Behavior) {
        let point = &mut self.point;
        point.active_user_count += 1;
        point.post_count = point.post_count.saturating_add(behavior.post_count);
        point.interaction_count = point
            .interaction_count
            .saturating_add(behavior.interaction_count);

        let n = point.active_user_count as f64;
        point.avg_activity_score =
            incremental_mean(point.avg_activity_score, behavior.activity_score as f64, n);
        point.avg_influence_score =
            incremental_mean(point.avg_influence_score, behavior.influence_score as f64, n);
    }

    fn add_registration(&mut self) {
        self.point.new_user_count += 1;
    }
}

/// Online mean update: `avg + (value − avg) / n`
pub fn incremental_mean(avg: f64, value: f64, n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    avg + (value - avg) / n
}

/// Bucket the population by calendar day in the reference zone.
///
/// Output is sorted ascending by day. Accounts without a last activity only
/// contribute through their registration day.
pub fn bucket_by_day(population: &Population, offset: FixedOffset) -> Vec<TimeSeriesPoint> {
    let mut buckets: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();

    for account in population.accounts() {
        let behavior = account.behavior();
        if let Some(last_active) = behavior.last_active_date {
            let day = last_active.with_timezone(&offset).date_naive();
            buckets
                .entry(day)
                .or_insert_with(|| Bucket::new(day))
                .add_active(behavior);
        }

        if let Some(registered) = account.profile().registration_date {
            buckets
                .entry(registered)
                .or_insert_with(|| Bucket::new(registered))
                .add_registration();
        }
    }

    buckets.into_values().map(|bucket| bucket.point).collect()
}
