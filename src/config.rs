//! Tunable parameters for scoring, network synthesis and history
//!
//! Every knob has a named default so the algorithms never carry magic numbers.

use crate::error::AnalyticsError;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of edges kept in the interest network
pub const DEFAULT_NETWORK_EDGE_CAP: usize = 200;

/// Number of interaction records retained by the history ring buffer
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Activity score above which an account counts as active
pub const ACTIVE_USER_THRESHOLD: u8 = 30;

/// Divisor turning an influence score into a network node size
pub const NODE_SIZE_DIVISOR: f64 = 10.0;

/// Default activity weight for post volume
pub const DEFAULT_ACTIVITY_POST_WEIGHT: f64 = 0.4;
/// Default activity weight for interaction volume
pub const DEFAULT_ACTIVITY_INTERACTION_WEIGHT: f64 = 0.3;
/// Default activity weight for recency
pub const DEFAULT_ACTIVITY_RECENCY_WEIGHT: f64 = 0.3;
/// Default influence weight for follower count
pub const DEFAULT_INFLUENCE_FOLLOWER_WEIGHT: f64 = 0.6;
/// Default influence weight for interaction volume
pub const DEFAULT_INFLUENCE_INTERACTION_WEIGHT: f64 = 0.4;

/// Weights of the activity and influence formulas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub activity_posts: f64,
    pub activity_interactions: f64,
    pub activity_recency: f64,
    pub influence_followers: f64,
    pub influence_interactions: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            activity_posts: DEFAULT_ACTIVITY_POST_WEIGHT,
            activity_interactions: DEFAULT_ACTIVITY_INTERACTION_WEIGHT,
            activity_recency: DEFAULT_ACTIVITY_RECENCY_WEIGHT,
            influence_followers: DEFAULT_INFLUENCE_FOLLOWER_WEIGHT,
            influence_interactions: DEFAULT_INFLUENCE_INTERACTION_WEIGHT,
        }
    }
}

impl ScoringWeights {
    fn all(&self) -> [(&'static str, f64); 5] {
        [
            ("activity_posts", self.activity_posts),
            ("activity_interactions", self.activity_interactions),
            ("activity_recency", self.activity_recency),
            ("influence_followers", self.influence_followers),
            ("influence_interactions", self.influence_interactions),
        ]
    }
}

/// Analytics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Score formula weights
    pub weights: ScoringWeights,
    /// Maximum number of network edges kept after ranking
    pub network_edge_cap: usize,
    /// Interaction history capacity
    pub history_capacity: usize,
    /// Activity threshold for the `active_users` statistic
    pub active_user_threshold: u8,
    /// Offset of the reference time zone (day buckets, heatmap slots) from UTC, in minutes
    pub reference_utc_offset_minutes: i32,
    /// Fixed "now" used for recency; current time when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_time: Option<DateTime<Utc>>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            network_edge_cap: DEFAULT_NETWORK_EDGE_CAP,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            active_user_threshold: ACTIVE_USER_THRESHOLD,
            reference_utc_offset_minutes: 0,
            reference_time: None,
        }
    }
}

impl AnalyticsConfig {
    /// Check weights, capacities and the reference offset
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        for (name, weight) in self.weights.all() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(AnalyticsError::InvalidConfig(format!(
                    "weight {name} must be a non-negative number, got {weight}"
                )));
            }
        }
        if self.history_capacity == 0 {
            return Err(AnalyticsError::InvalidConfig(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if self.active_user_threshold > 100 {
            return Err(AnalyticsError::InvalidConfig(format!(
                "active_user_threshold must be within 0-100, got {}",
                self.active_user_threshold
            )));
        }
        self.reference_offset()?;
        Ok(())
    }

    /// Reference zone for day buckets and hour/weekday extraction
    pub fn reference_offset(&self) -> Result<FixedOffset, AnalyticsError> {
        FixedOffset::east_opt(self.reference_utc_offset_minutes.saturating_mul(60)).ok_or_else(
            || {
                AnalyticsError::InvalidConfig(format!(
                    "reference_utc_offset_minutes out of range: {}",
                    self.reference_utc_offset_minutes
                ))
            },
        )
    }

    /// The fixed reference time, or now
    pub fn reference_now(&self) -> DateTime<Utc> {
        self.reference_time.unwrap_or_else(Utc::now)
    }

    /// Load and validate configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, AnalyticsError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, AnalyticsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_named_constants() {
        let config = AnalyticsConfig::default();
        assert_eq!(config.network_edge_cap, 200);
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.active_user_threshold, 30);
        assert!((config.weights.activity_posts - 0.4).abs() < f64::EPSILON);
        assert!((config.weights.influence_followers - 0.6).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config = AnalyticsConfig::from_json(r#"{"network_edge_cap": 10}"#).unwrap();
        assert_eq!(config.network_edge_cap, 10);
        assert_eq!(config.history_capacity, DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let json = r#"{"weights": {"activity_posts": -0.5}}"#;
        let err = AnalyticsConfig::from_json(json).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_history_capacity_rejected() {
        let config = AnalyticsConfig {
            history_capacity: 0,
            ..AnalyticsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reference_offset() {
        let config = AnalyticsConfig {
            reference_utc_offset_minutes: 480,
            ..AnalyticsConfig::default()
        };
        assert_eq!(config.reference_offset().unwrap().local_minus_utc(), 8 * 3600);

        let config = AnalyticsConfig {
            reference_utc_offset_minutes: 100_000,
            ..AnalyticsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrip_json() {
        let config = AnalyticsConfig::default();
        let json = config.to_json().unwrap();
        let loaded = AnalyticsConfig::from_json(&json).unwrap();
        assert_eq!(config, loaded);
    }
}
