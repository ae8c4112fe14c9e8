//! Hour × weekday activity heatmap

use crate::types::{HeatmapCell, Population};
use chrono::{Datelike, FixedOffset, Timelike};
use std::collections::BTreeMap;

/// Sums collected in the first pass
#[derive(Debug, Default, Clone, Copy)]
struct CellTotals {
    activity_sum: u64,
    user_count: u32,
    post_count: u64,
}

/// Bin accounts by the hour-of-week of their last activity.
///
/// Cells are ordered by weekday (Sunday first), then hour. Slots with no
/// activity are omitted; accounts without a last activity are not binned.
pub fn bin_by_hour_of_week(population: &Population, offset: FixedOffset) -> Vec<HeatmapCell> {
    // Keyed (day_of_week, hour)
    let mut totals: BTreeMap<(u8, u8), CellTotals> = BTreeMap::new();

    for behavior in population.behaviors() {
        let Some(last_active) = behavior.last_active_date else {
            continue;
        };
        let local = last_active.with_timezone(&offset);
        let key = (
            local.weekday().num_days_from_sunday() as u8,
            local.hour() as u8,
        );

        let cell = totals.entry(key).or_default();
        cell.activity_sum += behavior.activity_score as u64;
        cell.user_count += 1;
        cell.post_count = cell.post_count.saturating_add(behavior.post_count);
    }

    // Averages need the per-cell count, so divide only once every account is binned
    totals
        .into_iter()
        .map(|((day_of_week, hour), cell)| HeatmapCell {
            hour,
            day_of_week,
            value: if cell.user_count > 0 {
                cell.activity_sum as f64 / cell.user_count as f64
            } else {
                0.0
            },
            user_count: cell.user_count,
            post_count: cell.post_count,
        })
        .collect()
}
