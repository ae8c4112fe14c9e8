//! Interest cloud: how many accounts declare each interest

use crate::types::{Interest, InterestCloudItem, Population};
use std::collections::BTreeMap;

/// Count interest membership across the population.
///
/// Items are ordered by member count, largest first; ties follow category
/// order. Interests nobody declares are omitted.
pub fn interest_cloud(population: &Population) -> Vec<InterestCloudItem> {
    let mut members: BTreeMap<Interest, Vec<String>> = BTreeMap::new();
    for profile in population.profiles() {
        for interest in &profile.interests {
            members
                .entry(*interest)
                .or_default()
                .push(profile.user_id.clone());
        }
    }

    let mut items: Vec<InterestCloudItem> = members
        .into_iter()
        .map(|(interest, related_user_ids)| InterestCloudItem {
            interest,
            value: related_user_ids.len() as u32,
            related_user_ids,
        })
        .collect();
    items.sort_by(|a, b| b.value.cmp(&a.value));
    items
}
