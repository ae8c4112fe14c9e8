//! Summary statistics over a filtered set of accounts

use crate::types::{Account, AggregatedStats, Interest, Role};
use std::collections::BTreeMap;

impl AggregatedStats {
    /// All-zero statistics with every role and interest present
    pub fn empty() -> Self {
        Self {
            total_users: 0,
            active_users: 0,
            total_posts: 0,
            total_interactions: 0,
            avg_activity_score: 0.0,
            avg_influence_score: 0.0,
            role_distribution: Role::ALL.iter().map(|role| (*role, 0)).collect(),
            interest_distribution: empty_interest_distribution(),
        }
    }
}

impl Default for AggregatedStats {
    fn default() -> Self {
        Self::empty()
    }
}

fn empty_interest_distribution() -> BTreeMap<Interest, usize> {
    Interest::CATEGORIES
        .iter()
        .chain(std::iter::once(&crate::types::DEFAULT_INTEREST))
        .map(|interest| (*interest, 0))
        .collect()
}

/// Aggregate the given accounts.
///
/// `active_users` counts activity scores strictly above `active_threshold`.
/// An empty input yields [`AggregatedStats::empty`].
pub fn aggregate<'a>(
    accounts: impl IntoIterator<Item = &'a Account>,
    active_threshold: u8,
) -> AggregatedStats {
    let mut stats = AggregatedStats::empty();
    let mut activity_sum = 0u64;
    let mut influence_sum = 0u64;

    for account in accounts {
        let behavior = account.behavior();
        let profile = account.profile();

        stats.total_users += 1;
        if behavior.activity_score > active_threshold {
            stats.active_users += 1;
        }
        stats.total_posts = stats.total_posts.saturating_add(behavior.post_count);
        stats.total_interactions = stats
            .total_interactions
            .saturating_add(behavior.interaction_count);
        activity_sum += behavior.activity_score as u64;
        influence_sum += behavior.influence_score as u64;

        *stats.role_distribution.entry(profile.role).or_insert(0) += 1;
        for interest in &profile.interests {
            *stats.interest_distribution.entry(*interest).or_insert(0) += 1;
        }
    }

    if stats.total_users > 0 {
        let n = stats.total_users as f64;
        stats.avg_activity_score = activity_sum as f64 / n;
        stats.avg_influence_score = influence_sum as f64 / n;
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ACTIVE_USER_THRESHOLD;
    use crate::types::{ActivityCounters, Profile};
    use pretty_assertions::assert_eq;

    fn account(id: &str, role: Role, interests: &[Interest], activity: u8, posts: u64) -> Account {
        let mut account = Account::new(
            Profile::new(id, role, interests.to_vec(), None, None),
            ActivityCounters {
                post_count: posts,
                interaction_count: posts * 2,
                ..ActivityCounters::default()
            },
            None,
        );
        account.set_scores(activity, 100 - activity);
        account
    }

    #[test]
    fn test_empty_input_yields_zeros() {
        let stats = aggregate(std::iter::empty(), ACTIVE_USER_THRESHOLD);
        assert_eq!(stats, AggregatedStats::empty());
        assert_eq!(stats.role_distribution.len(), 4);
        assert_eq!(stats.interest_distribution.len(), 13);
        assert_eq!(stats.avg_activity_score, 0.0);
    }

    #[test]
    fn test_aggregate_counts_and_averages() {
        let accounts = [
            account("a", Role::General, &[Interest::Sports, Interest::Travel], 30, 4),
            account("b", Role::General, &[Interest::Sports], 31, 6),
            account("c", Role::InformationSeeker, &[Interest::Politics], 90, 10),
        ];

        let stats = aggregate(&accounts, ACTIVE_USER_THRESHOLD);
        assert_eq!(stats.total_users, 3);
        // 30 is not above the threshold
        assert_eq!(stats.active_users, 2);
        assert_eq!(stats.total_posts, 20);
        assert_eq!(stats.total_interactions, 40);
        assert!((stats.avg_activity_score - 50.333_333).abs() < 1e-5);
        assert!((stats.avg_influence_score - 49.666_666).abs() < 1e-5);

        assert_eq!(stats.role_distribution[&Role::General], 2);
        assert_eq!(stats.role_distribution[&Role::Inactive], 0);
        assert_eq!(stats.role_distribution.values().sum::<usize>(), 3);
        assert_eq!(stats.interest_distribution[&Interest::Sports], 2);
        assert_eq!(stats.interest_distribution[&Interest::Animals], 0);
    }
}
