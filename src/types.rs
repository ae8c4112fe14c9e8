//! Core data types for account activity analytics
//!
//! These types flow through the derivation pipeline:
//! raw CSV rows → Account (Profile + Behavior) → scored Population → views.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Account role classification
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Inactive,
    InformationSeeker,
    InformationSource,
    #[default]
    General,
}

impl Role {
    /// All roles in declaration order
    pub const ALL: [Role; 4] = [
        Role::Inactive,
        Role::InformationSeeker,
        Role::InformationSource,
        Role::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Inactive => "inactive",
            Role::InformationSeeker => "information-seeker",
            Role::InformationSource => "information-source",
            Role::General => "general",
        }
    }

    /// Parse a role label (case-insensitive, surrounding whitespace ignored)
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_lowercase();
        Self::ALL.into_iter().find(|role| role.as_str() == label)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interest category
///
/// Twelve real categories plus `General`, which is only ever assigned when a
/// row carries no recognizable interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Interest {
    #[serde(rename = "animals")]
    Animals,
    #[serde(rename = "arts and culture")]
    ArtsAndCulture,
    #[serde(rename = "business and finance")]
    BusinessAndFinance,
    #[serde(rename = "entertainment")]
    Entertainment,
    #[serde(rename = "fashion and beauty")]
    FashionAndBeauty,
    #[serde(rename = "fitness and health")]
    FitnessAndHealth,
    #[serde(rename = "food and dining")]
    FoodAndDining,
    #[serde(rename = "learning and educational")]
    LearningAndEducational,
    #[serde(rename = "politics")]
    Politics,
    #[serde(rename = "science and technology")]
    ScienceAndTechnology,
    #[serde(rename = "sports")]
    Sports,
    #[serde(rename = "travel")]
    Travel,
    #[serde(rename = "general")]
    General,
}

/// Interest assigned when none of a row's tokens is recognized
pub const DEFAULT_INTEREST: Interest = Interest::General;

impl Interest {
    /// The twelve enumerated categories (excludes the fallback)
    pub const CATEGORIES: [Interest; 12] = [
        Interest::Animals,
        Interest::ArtsAndCulture,
        Interest::BusinessAndFinance,
        Interest::Entertainment,
        Interest::FashionAndBeauty,
        Interest::FitnessAndHealth,
        Interest::FoodAndDining,
        Interest::LearningAndEducational,
        Interest::Politics,
        Interest::ScienceAndTechnology,
        Interest::Sports,
        Interest::Travel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interest::Animals => "animals",
            Interest::ArtsAndCulture => "arts and culture",
            Interest::BusinessAndFinance => "business and finance",
            Interest::Entertainment => "entertainment",
            Interest::FashionAndBeauty => "fashion and beauty",
            Interest::FitnessAndHealth => "fitness and health",
            Interest::FoodAndDining => "food and dining",
            Interest::LearningAndEducational => "learning and educational",
            Interest::Politics => "politics",
            Interest::ScienceAndTechnology => "science and technology",
            Interest::Sports => "sports",
            Interest::Travel => "travel",
            Interest::General => "general",
        }
    }

    /// Parse one interest token.
    ///
    /// Accepts the canonical label or a common short form ("technology",
    /// "fashion", "food", ...). The fallback `general` is not accepted here;
    /// it is assigned by the parser, never read from input.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim().to_lowercase();
        if let Some(interest) = Self::CATEGORIES
            .into_iter()
            .find(|interest| interest.as_str() == token)
        {
            return Some(interest);
        }

        let alias = match token.as_str() {
            "animal" | "pets" => Interest::Animals,
            "arts" | "art" | "culture" => Interest::ArtsAndCulture,
            "business" | "finance" => Interest::BusinessAndFinance,
            "fashion" | "beauty" => Interest::FashionAndBeauty,
            "fitness" | "health" => Interest::FitnessAndHealth,
            "food" | "dining" => Interest::FoodAndDining,
            "learning" | "education" | "educational" => Interest::LearningAndEducational,
            "science" | "technology" | "tech" => Interest::ScienceAndTechnology,
            "sport" => Interest::Sports,
            _ => return None,
        };
        Some(alias)
    }
}

impl fmt::Display for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account profile (identity and categorical attributes)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique account identifier
    pub user_id: String,
    /// Account role
    pub role: Role,
    /// Interests, first entry is the primary interest. Never empty.
    pub interests: Vec<Interest>,
    /// Registration day, if it could be parsed
    #[serde(default)]
    pub registration_date: Option<NaiveDate>,
    /// Free-form region label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Profile {
    /// Build a profile, enforcing the non-empty, duplicate-free interest list
    pub fn new(
        user_id: impl Into<String>,
        role: Role,
        interests: Vec<Interest>,
        registration_date: Option<NaiveDate>,
        location: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            interests: normalize_interests(interests),
            registration_date,
            location,
        }
    }

    /// First interest, used where only one label can be shown
    pub fn primary_interest(&self) -> Interest {
        self.interests.first().copied().unwrap_or(DEFAULT_INTEREST)
    }
}

/// Deduplicate interests keeping first occurrence; substitute the default when empty
pub fn normalize_interests(interests: Vec<Interest>) -> Vec<Interest> {
    let mut seen = Vec::with_capacity(interests.len());
    for interest in interests {
        if !seen.contains(&interest) {
            seen.push(interest);
        }
    }
    if seen.is_empty() {
        seen.push(DEFAULT_INTEREST);
    }
    seen
}

/// Raw activity counters for an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActivityCounters {
    pub post_count: u64,
    pub interaction_count: u64,
    pub follower_count: u64,
    pub following_count: u64,
}

/// Behavior record: raw counters plus population-relative scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Behavior {
    /// Account identifier (same as the owning profile)
    pub user_id: String,
    /// Activity score (0-100), relative to the current population
    #[serde(default)]
    pub activity_score: u8,
    /// Influence score (0-100), relative to the current population
    #[serde(default)]
    pub influence_score: u8,
    pub post_count: u64,
    pub interaction_count: u64,
    pub follower_count: u64,
    pub following_count: u64,
    /// Last activity instant, absent when the source value was unparseable
    #[serde(default)]
    pub last_active_date: Option<DateTime<Utc>>,
}

impl Behavior {
    /// Unscored behavior built from counters
    pub fn new(
        user_id: impl Into<String>,
        counters: ActivityCounters,
        last_active_date: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            activity_score: 0,
            influence_score: 0,
            post_count: counters.post_count,
            interaction_count: counters.interaction_count,
            follower_count: counters.follower_count,
            following_count: counters.following_count,
            last_active_date,
        }
    }

    pub fn counters(&self) -> ActivityCounters {
        ActivityCounters {
            post_count: self.post_count,
            interaction_count: self.interaction_count,
            follower_count: self.follower_count,
            following_count: self.following_count,
        }
    }
}

/// A profile together with its behavior. The pair always shares one user id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    profile: Profile,
    behavior: Behavior,
}

impl Account {
    /// Pair a profile with counters; the behavior inherits the profile's id
    pub fn new(
        profile: Profile,
        counters: ActivityCounters,
        last_active_date: Option<DateTime<Utc>>,
    ) -> Self {
        let behavior = Behavior::new(profile.user_id.clone(), counters, last_active_date);
        Self { profile, behavior }
    }

    /// Pair an existing behavior with a profile, rewriting the behavior id
    pub fn from_parts(profile: Profile, mut behavior: Behavior) -> Self {
        behavior.user_id = profile.user_id.clone();
        Self { profile, behavior }
    }

    pub fn user_id(&self) -> &str {
        &self.profile.user_id
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub(crate) fn set_scores(&mut self, activity_score: u8, influence_score: u8) {
        self.behavior.activity_score = activity_score;
        self.behavior.influence_score = influence_score;
    }

    pub fn into_parts(self) -> (Profile, Behavior) {
        (self.profile, self.behavior)
    }
}

/// The full set of accounts: the single source of truth for every view
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Population {
    accounts: Vec<Account>,
}

impl Population {
    /// Build a population; a repeated user id replaces the earlier account in place
    pub fn from_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let mut population = Self::default();
        let mut index: HashMap<String, usize> = HashMap::new();
        for account in accounts {
            match index.get(account.user_id()) {
                Some(&position) => population.accounts[position] = account,
                None => {
                    index.insert(account.user_id().to_string(), population.accounts.len());
                    population.accounts.push(account);
                }
            }
        }
        population
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub(crate) fn accounts_mut(&mut self) -> &mut [Account] {
        &mut self.accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn get(&self, user_id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.user_id() == user_id)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.accounts.iter().map(Account::profile)
    }

    pub fn behaviors(&self) -> impl Iterator<Item = &Behavior> {
        self.accounts.iter().map(Account::behavior)
    }

    pub fn into_accounts(self) -> Vec<Account> {
        self.accounts
    }
}

// ============================================================================
// Materialized view types
// ============================================================================

/// One time bucket (calendar day) of aggregated activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// Bucket key
    pub timestamp: NaiveDate,
    /// Accounts whose last activity falls in this bucket
    pub active_user_count: u32,
    /// Accounts registered in this bucket
    pub new_user_count: u32,
    pub post_count: u64,
    pub interaction_count: u64,
    /// Mean activity score of the active accounts
    pub avg_activity_score: f64,
    /// Mean influence score of the active accounts
    pub avg_influence_score: f64,
}

impl TimeSeriesPoint {
    pub fn empty(timestamp: NaiveDate) -> Self {
        Self {
            timestamp,
            active_user_count: 0,
            new_user_count: 0,
            post_count: 0,
            interaction_count: 0,
            avg_activity_score: 0.0,
            avg_influence_score: 0.0,
        }
    }
}

/// One hour-of-week slot of the activity heatmap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    /// Hour of day (0-23)
    pub hour: u8,
    /// Day of week (0-6, Sunday = 0)
    pub day_of_week: u8,
    /// Mean activity score of accounts last active in this slot
    pub value: f64,
    pub user_count: u32,
    pub post_count: u64,
}

/// Flat profile + behavior point for scatter plots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub user_id: String,
    pub activity_score: u8,
    pub influence_score: u8,
    pub role: Role,
    pub interests: Vec<Interest>,
    pub post_count: u64,
    pub interaction_count: u64,
}

/// Network node, one per account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: String,
    pub activity_score: u8,
    pub influence_score: u8,
    pub role: Role,
    pub primary_interest: Interest,
    /// Visual size derived from influence
    pub size: f64,
}

/// Undirected shared-interest edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub source: String,
    pub target: String,
    /// Number of shared interests (always >= 1)
    pub weight: u32,
    /// The shared interests themselves
    pub shared_interests: Vec<Interest>,
}

/// Interest network: nodes plus capped edge list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkGraph {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
}

/// Per-region summary of accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub region: String,
    pub user_count: u32,
    pub avg_activity_score: f64,
    pub avg_influence_score: f64,
    pub role_distribution: BTreeMap<Role, usize>,
}

/// Interest frequency with the accounts that declare it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestCloudItem {
    pub interest: Interest,
    pub value: u32,
    pub related_user_ids: Vec<String>,
}

/// Summary statistics over the filtered population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedStats {
    pub total_users: usize,
    /// Accounts whose activity score exceeds the active threshold
    pub active_users: usize,
    pub total_posts: u64,
    pub total_interactions: u64,
    pub avg_activity_score: f64,
    pub avg_influence_score: f64,
    pub role_distribution: BTreeMap<Role, usize>,
    pub interest_distribution: BTreeMap<Interest, usize>,
}
