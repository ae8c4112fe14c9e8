//! Scatter projection: one flat point per account

use crate::types::{Account, Population, ScatterPoint};

/// Project every account into a scatter point.
///
/// Profiles and behaviors are stored as pairs, so the join cannot miss.
pub fn project(population: &Population) -> Vec<ScatterPoint> {
    population.accounts().iter().map(to_point).collect()
}

pub fn to_point(account: &Account) -> ScatterPoint {
    let profile = account.profile();
    let behavior = account.behavior();
    ScatterPoint {
        user_id: profile.user_id.clone(),
        activity_score: behavior.activity_score,
        influence_score: behavior.influence_score,
        role: profile.role,
        interests: profile.interests.clone(),
        post_count: behavior.post_count,
        interaction_count: behavior.interaction_count,
    }
}
