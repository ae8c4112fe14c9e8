//! Shared-interest network synthesis
//!
//! Two accounts are linked when they declare at least one common interest; the
//! edge weight is the number of interests they share. Pairs are enumerated
//! through an inverted interest → accounts index, so the cost is driven by
//! interest bucket sizes rather than all pairs of accounts.

use crate::config::NODE_SIZE_DIVISOR;
use crate::types::{Interest, NetworkEdge, NetworkGraph, NetworkNode, Population, Profile};
use std::collections::BTreeMap;
use tracing::debug;

/// Build nodes and the capped edge list
pub fn synthesize(population: &Population, edge_cap: usize) -> NetworkGraph {
    let nodes = build_nodes(population);
    let profiles: Vec<&Profile> = population.profiles().collect();
    let edges = rank_edges(shared_interest_edges(&profiles), edge_cap);

    NetworkGraph { nodes, edges }
}

/// One node per account, sized by influence
pub fn build_nodes(population: &Population) -> Vec<NetworkNode> {
    population
        .accounts()
        .iter()
        .map(|account| {
            let profile = account.profile();
            let behavior = account.behavior();
            NetworkNode {
                id: profile.user_id.clone(),
                activity_score: behavior.activity_score,
                influence_score: behavior.influence_score,
                role: profile.role,
                primary_interest: profile.primary_interest(),
                size: behavior.influence_score as f64 / NODE_SIZE_DIVISOR,
            }
        })
        .collect()
}

/// All shared-interest edges, uncapped.
///
/// Edges come out in all-pairs enumeration order: by the first account's
/// position, then the second's. Each unordered pair appears at most once.
pub fn shared_interest_edges(profiles: &[&Profile]) -> Vec<NetworkEdge> {
    let mut index: BTreeMap<Interest, Vec<usize>> = BTreeMap::new();
    for (position, profile) in profiles.iter().enumerate() {
        for interest in &profile.interests {
            let members = index.entry(*interest).or_default();
            // Interests are deduplicated per profile, but guard against hand-built ones
            if members.last() != Some(&position) {
                members.push(position);
            }
        }
    }

    // (lower position, higher position) → shared interests
    let mut pairs: BTreeMap<(usize, usize), Vec<Interest>> = BTreeMap::new();
    for (interest, members) in &index {
        for (offset, &first) in members.iter().enumerate() {
            for &second in &members[offset + 1..] {
                pairs.entry((first, second)).or_default().push(*interest);
            }
        }
    }

    debug!(
        profiles = profiles.len(),
        interests = index.len(),
        pairs = pairs.len(),
        "enumerated shared-interest pairs"
    );

    pairs
        .into_iter()
        .map(|((first, second), shared)| NetworkEdge {
            source: profiles[first].user_id.clone(),
            target: profiles[second].user_id.clone(),
            weight: shared.len() as u32,
            shared_interests: shared,
        })
        .collect()
}

/// Keep the `cap` heaviest edges; equal weights keep their incoming order
pub fn rank_edges(mut edges: Vec<NetworkEdge>, cap: usize) -> Vec<NetworkEdge> {
    edges.sort_by(|a, b| b.weight.cmp(&a.weight));
    edges.truncate(cap);
    edges
}
