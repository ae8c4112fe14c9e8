//! Population-relative activity and influence scoring
//!
//! Scores are min-max style normalizations against the maxima of the current
//! batch, so the same account scores differently in a different population.
//! Every ingest and merge re-runs the engine over the whole population.

use crate::config::ScoringWeights;
use crate::types::{Behavior, Population};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

const SECONDS_PER_DAY: i64 = 86_400;

/// Batch maxima used as normalization denominators (each at least 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMaxima {
    pub max_posts: u64,
    pub max_interactions: u64,
    pub max_followers: u64,
    pub max_days_since_active: i64,
}

impl Default for BatchMaxima {
    fn default() -> Self {
        Self {
            max_posts: 1,
            max_interactions: 1,
            max_followers: 1,
            max_days_since_active: 1,
        }
    }
}

impl BatchMaxima {
    /// First pass: collect the maxima of a batch relative to `now`
    pub fn collect<'a>(behaviors: impl IntoIterator<Item = &'a Behavior>, now: DateTime<Utc>) -> Self {
        behaviors
            .into_iter()
            .fold(Self::default(), |mut maxima, behavior| {
                maxima.max_posts = maxima.max_posts.max(behavior.post_count);
                maxima.max_interactions = maxima.max_interactions.max(behavior.interaction_count);
                maxima.max_followers = maxima.max_followers.max(behavior.follower_count);
                if let Some(last_active) = behavior.last_active_date {
                    maxima.max_days_since_active = maxima
                        .max_days_since_active
                        .max(days_since(last_active, now));
                }
                maxima
            })
    }
}

/// Whole days elapsed from `then` to `now`, rounded down
pub fn days_since(then: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - then).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Scoring engine applying the weighted formulas
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine {
    weights: ScoringWeights,
}

impl ScoringEngine {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Annotate every behavior in the population with fresh scores.
    ///
    /// Returns the maxima the scores were normalized against.
    pub fn score_population(&self, population: &mut Population, now: DateTime<Utc>) -> BatchMaxima {
        let maxima = BatchMaxima::collect(population.behaviors(), now);

        for account in population.accounts_mut() {
            let activity = self.activity_score(account.behavior(), &maxima, now);
            let influence = self.influence_score(account.behavior(), &maxima);
            account.set_scores(activity, influence);
        }

        debug!(
            accounts = population.len(),
            max_posts = maxima.max_posts,
            max_interactions = maxima.max_interactions,
            max_followers = maxima.max_followers,
            max_days_since_active = maxima.max_days_since_active,
            "scored population"
        );

        maxima
    }

    /// Activity score (0-100)
    ///
    /// Formula: `100 × (w_posts·posts/maxPosts + w_inter·inter/maxInter + w_recency·recency)`
    /// where `recency = clamp01(1 − days/maxDays)`, zero when the last activity is unknown
    pub fn activity_score(&self, behavior: &Behavior, maxima: &BatchMaxima, now: DateTime<Utc>) -> u8 {
        let recency = behavior
            .last_active_date
            .map(|last_active| {
                let days = days_since(last_active, now) as f64;
                (1.0 - days / maxima.max_days_since_active.max(1) as f64).clamp(0.0, 1.0)
            })
            .unwrap_or(0.0);

        let raw = self.weights.activity_posts * ratio(behavior.post_count, maxima.max_posts)
            + self.weights.activity_interactions
                * ratio(behavior.interaction_count, maxima.max_interactions)
            + self.weights.activity_recency * recency;

        to_score(raw)
    }

    /// Influence score (0-100)
    ///
    /// Formula: `100 × (w_followers·followers/maxFollowers + w_inter·inter/maxInter)`
    pub fn influence_score(&self, behavior: &Behavior, maxima: &BatchMaxima) -> u8 {
        let raw = self.weights.influence_followers
            * ratio(behavior.follower_count, maxima.max_followers)
            + self.weights.influence_interactions
                * ratio(behavior.interaction_count, maxima.max_interactions);

        to_score(raw)
    }
}

fn ratio(value: u64, max: u64) -> f64 {
    value as f64 / max.max(1) as f64
}

/// Scale a 0-1 composite to an integer score, clamped against overshoot
fn to_score(raw: f64) -> u8 {
    if !raw.is_finite() {
        return 0;
    }
    (raw * 100.0).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Account, ActivityCounters, Interest, Profile, Role};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    fn account(id: &str, posts: u64, interactions: u64, followers: u64, days_ago: Option<i64>) -> Account {
        Account::new(
            Profile::new(id, Role::General, vec![Interest::Sports], None, None),
            ActivityCounters {
                post_count: posts,
                interaction_count: interactions,
                follower_count: followers,
                following_count: 0,
            },
            days_ago.map(|days| now() - Duration::days(days)),
        )
    }

    fn scores(population: &Population) -> Vec<(u8, u8)> {
        population
            .behaviors()
            .map(|b| (b.activity_score, b.influence_score))
            .collect()
    }

    #[test]
    fn test_top_account_scores_full_marks() {
        let mut population = Population::from_accounts([
            account("top", 100, 500, 9000, Some(0)),
            account("low", 10, 50, 900, Some(10)),
        ]);
        ScoringEngine::default().score_population(&mut population, now());

        let top = population.get("top").unwrap().behavior();
        assert_eq!(top.activity_score, 100);
        assert_eq!(top.influence_score, 100);

        // activity: 0.4*0.1 + 0.3*0.1 + 0.3*0 = 0.07
        // influence: 0.6*0.1 + 0.4*0.1 = 0.10
        let low = population.get("low").unwrap().behavior();
        assert_eq!(low.activity_score, 7);
        assert_eq!(low.influence_score, 10);
    }

    #[test]
    fn test_scores_within_bounds() {
        let mut population = Population::from_accounts([
            account("a", 0, 0, 0, None),
            account("b", u64::MAX, 0, 3, Some(-5)),
            account("c", 7, 7, 7, Some(400)),
            account("d", 1, 1_000_000, 0, Some(1)),
        ]);
        ScoringEngine::default().score_population(&mut population, now());

        for (activity, influence) in scores(&population) {
            assert!(activity <= 100);
            assert!(influence <= 100);
        }
    }

    #[test]
    fn test_all_zero_counters() {
        let mut population = Population::from_accounts([
            account("fresh", 0, 0, 0, Some(0)),
            account("unknown", 0, 0, 0, None),
        ]);
        let maxima = ScoringEngine::default().score_population(&mut population, now());

        assert_eq!(maxima, BatchMaxima::default());
        // Only recency contributes: active today → 0.3
        assert_eq!(population.get("fresh").unwrap().behavior().activity_score, 30);
        assert_eq!(population.get("unknown").unwrap().behavior().activity_score, 0);
        assert_eq!(population.get("fresh").unwrap().behavior().influence_score, 0);
    }

    #[test]
    fn test_rescoring_is_deterministic() {
        let mut population = Population::from_accounts([
            account("a", 12, 80, 300, Some(3)),
            account("b", 40, 20, 1200, Some(9)),
            account("c", 3, 400, 50, Some(1)),
        ]);
        let engine = ScoringEngine::default();

        engine.score_population(&mut population, now());
        let first = scores(&population);
        engine.score_population(&mut population, now());
        assert_eq!(first, scores(&population));
    }

    #[test]
    fn test_scores_are_population_relative() {
        let mut small = Population::from_accounts([account("a", 10, 10, 10, Some(0))]);
        ScoringEngine::default().score_population(&mut small, now());
        assert_eq!(small.get("a").unwrap().behavior().influence_score, 100);

        let mut larger = Population::from_accounts([
            account("a", 10, 10, 10, Some(0)),
            account("b", 20, 20, 20, Some(0)),
        ]);
        ScoringEngine::default().score_population(&mut larger, now());
        assert_eq!(larger.get("a").unwrap().behavior().influence_score, 50);
    }

    #[test]
    fn test_future_activity_clamps_recency() {
        let mut population = Population::from_accounts([account("a", 0, 0, 0, Some(-3))]);
        ScoringEngine::default().score_population(&mut population, now());
        assert_eq!(population.get("a").unwrap().behavior().activity_score, 30);
    }

    #[test]
    fn test_custom_weights() {
        let weights = ScoringWeights {
            activity_posts: 1.0,
            activity_interactions: 0.0,
            activity_recency: 0.0,
            influence_followers: 0.0,
            influence_interactions: 1.0,
        };
        let mut population = Population::from_accounts([
            account("a", 5, 1, 100, Some(0)),
            account("b", 10, 4, 0, Some(0)),
        ]);
        ScoringEngine::new(weights).score_population(&mut population, now());

        let a = population.get("a").unwrap().behavior();
        assert_eq!(a.activity_score, 50);
        assert_eq!(a.influence_score, 25);
    }

    #[test]
    fn test_days_since_rounds_down() {
        let then = now() - Duration::hours(47);
        assert_eq!(days_since(then, now()), 1);
        let future = now() + Duration::hours(1);
        assert_eq!(days_since(future, now()), -1);
    }
}
