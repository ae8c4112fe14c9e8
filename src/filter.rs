//! Filter predicates and selection state
//!
//! A [`FilterCondition`] is a conjunction of optional constraints. An absent
//! range or an empty inclusion list does not constrain anything, so the
//! default condition is the identity filter.
//!
//! Profiles are checked against the categorical constraints (role, interests,
//! region, user id). Behaviors additionally need their score ranges to match.
//! The date range only applies to time-series points.

use crate::types::{Account, Behavior, Interest, Population, Profile, Role, TimeSeriesPoint};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Inclusive calendar-day range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// Inclusive score range on the 0-100 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: u8,
    pub max: u8,
}

impl ScoreRange {
    pub fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, score: u8) -> bool {
        self.min <= score && score <= self.max
    }
}

/// Current filter predicate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_range: Option<ScoreRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub influence_range: Option<ScoreRange>,
    pub roles: Vec<Role>,
    /// A profile passes when it shares at least one of these
    pub interests: Vec<Interest>,
    pub regions: Vec<String>,
    pub user_ids: Vec<String>,
}

impl FilterCondition {
    /// True when no constraint is set
    pub fn is_unconstrained(&self) -> bool {
        *self == Self::default()
    }

    /// Check the categorical constraints
    pub fn matches_profile(&self, profile: &Profile) -> bool {
        if !self.roles.is_empty() && !self.roles.contains(&profile.role) {
            return false;
        }

        if !self.interests.is_empty()
            && !profile
                .interests
                .iter()
                .any(|interest| self.interests.contains(interest))
        {
            return false;
        }

        if !self.regions.is_empty() {
            match &profile.location {
                Some(location) if self.regions.contains(location) => {}
                _ => return false,
            }
        }

        if !self.user_ids.is_empty() && !self.user_ids.contains(&profile.user_id) {
            return false;
        }

        true
    }

    /// Check the score ranges only
    pub fn matches_scores(&self, behavior: &Behavior) -> bool {
        let activity_ok = self
            .activity_range
            .map_or(true, |range| range.contains(behavior.activity_score));
        let influence_ok = self
            .influence_range
            .map_or(true, |range| range.contains(behavior.influence_score));
        activity_ok && influence_ok
    }

    /// A behavior passes when its profile and its scores both pass
    pub fn matches_account(&self, account: &Account) -> bool {
        self.matches_profile(account.profile()) && self.matches_scores(account.behavior())
    }

    pub fn matches_point(&self, point: &TimeSeriesPoint) -> bool {
        self.date_range
            .map_or(true, |range| range.contains(point.timestamp))
    }

    /// Overlay the fields a patch sets
    pub fn apply(&mut self, patch: FilterPatch) {
        if let Some(range) = patch.date_range {
            self.date_range = range;
        }
        if let Some(range) = patch.activity_range {
            self.activity_range = range;
        }
        if let Some(range) = patch.influence_range {
            self.influence_range = range;
        }
        if let Some(roles) = patch.roles {
            self.roles = roles;
        }
        if let Some(interests) = patch.interests {
            self.interests = interests;
        }
        if let Some(regions) = patch.regions {
            self.regions = regions;
        }
        if let Some(user_ids) = patch.user_ids {
            self.user_ids = user_ids;
        }
    }
}

/// Partial filter update; unset fields keep their current value.
///
/// Ranges take `Some(None)` (JSON `null`) to drop the constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterPatch {
    #[serde(deserialize_with = "present_or_null", skip_serializing_if = "Option::is_none")]
    pub date_range: Option<Option<DateRange>>,
    #[serde(deserialize_with = "present_or_null", skip_serializing_if = "Option::is_none")]
    pub activity_range: Option<Option<ScoreRange>>,
    #[serde(deserialize_with = "present_or_null", skip_serializing_if = "Option::is_none")]
    pub influence_range: Option<Option<ScoreRange>>,
    pub roles: Option<Vec<Role>>,
    pub interests: Option<Vec<Interest>>,
    pub regions: Option<Vec<String>>,
    pub user_ids: Option<Vec<String>>,
}

// A present key is `Some`, even when its value is null
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Profiles passing the categorical constraints, in population order
pub fn filter_profiles<'a>(
    population: &'a Population,
    filter: &'a FilterCondition,
) -> impl Iterator<Item = &'a Profile> + 'a {
    population
        .profiles()
        .filter(move |profile| filter.matches_profile(profile))
}

/// Accounts whose profile and scores pass, in population order
pub fn filter_accounts<'a>(
    population: &'a Population,
    filter: &'a FilterCondition,
) -> impl Iterator<Item = &'a Account> + 'a {
    population
        .accounts()
        .iter()
        .filter(move |account| filter.matches_account(account))
}

/// Time-series points inside the date range
pub fn filter_time_series<'a>(
    points: &'a [TimeSeriesPoint],
    filter: &'a FilterCondition,
) -> impl Iterator<Item = &'a TimeSeriesPoint> + 'a {
    points.iter().filter(move |point| filter.matches_point(point))
}

/// What the user currently has selected across views
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionState {
    pub selected_user_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_interest: Option<Interest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_time_range: Option<DateRange>,
}

impl SelectionState {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&mut self, patch: SelectionPatch) {
        if let Some(user_ids) = patch.selected_user_ids {
            self.selected_user_ids = user_ids;
        }
        if let Some(role) = patch.selected_role {
            self.selected_role = Some(role);
        }
        if let Some(interest) = patch.selected_interest {
            self.selected_interest = Some(interest);
        }
        if let Some(region) = patch.selected_region {
            self.selected_region = Some(region);
        }
        if let Some(range) = patch.selected_time_range {
            self.selected_time_range = Some(range);
        }
    }
}

/// Partial selection update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionPatch {
    pub selected_user_ids: Option<Vec<String>>,
    pub selected_role: Option<Role>,
    pub selected_interest: Option<Interest>,
    pub selected_region: Option<String>,
    pub selected_time_range: Option<DateRange>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActivityCounters;
    use pretty_assertions::assert_eq;

    fn account(
        id: &str,
        role: Role,
        interests: &[Interest],
        location: Option<&str>,
        scores: (u8, u8),
    ) -> Account {
        let mut account = Account::new(
            Profile::new(
                id,
                role,
                interests.to_vec(),
                None,
                location.map(str::to_string),
            ),
            ActivityCounters::default(),
            None,
        );
        account.set_scores(scores.0, scores.1);
        account
    }

    fn sample() -> Population {
        Population::from_accounts([
            account("a", Role::General, &[Interest::Sports], Some("Oslo"), (80, 20)),
            account(
                "b",
                Role::InformationSource,
                &[Interest::Politics, Interest::Travel],
                Some("Lima"),
                (40, 90),
            ),
            account("c", Role::Inactive, &[Interest::Travel], None, (5, 5)),
            account("d", Role::General, &[Interest::Animals], Some("Oslo"), (55, 60)),
        ])
    }

    fn ids<'a>(accounts: impl Iterator<Item = &'a Account>) -> Vec<&'a str> {
        accounts.map(Account::user_id).collect()
    }

    #[test]
    fn test_unconstrained_filter_is_identity() {
        let population = sample();
        let filter = FilterCondition::default();
        assert!(filter.is_unconstrained());

        assert_eq!(filter_profiles(&population, &filter).count(), population.len());
        assert_eq!(
            ids(filter_accounts(&population, &filter)),
            vec!["a", "b", "c", "d"]
        );

        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let points = vec![TimeSeriesPoint::empty(day)];
        assert_eq!(filter_time_series(&points, &filter).count(), 1);
    }

    #[test]
    fn test_constraints_are_conjunctive() {
        let population = sample();
        let filter = FilterCondition {
            roles: vec![Role::General, Role::InformationSource],
            regions: vec!["Oslo".to_string()],
            ..FilterCondition::default()
        };
        assert_eq!(ids(filter_accounts(&population, &filter)), vec!["a", "d"]);

        let filter = FilterCondition {
            interests: vec![Interest::Travel],
            activity_range: Some(ScoreRange::new(10, 100)),
            ..FilterCondition::default()
        };
        assert_eq!(ids(filter_accounts(&population, &filter)), vec!["b"]);
    }

    #[test]
    fn test_score_ranges_only_restrict_behaviors() {
        let population = sample();
        let filter = FilterCondition {
            influence_range: Some(ScoreRange::new(50, 100)),
            ..FilterCondition::default()
        };

        assert_eq!(filter_profiles(&population, &filter).count(), 4);
        assert_eq!(ids(filter_accounts(&population, &filter)), vec!["b", "d"]);
    }

    #[test]
    fn test_unlocated_profile_fails_region_constraint() {
        let population = sample();
        let filter = FilterCondition {
            regions: vec!["Oslo".to_string(), "Lima".to_string()],
            ..FilterCondition::default()
        };
        let located: Vec<&str> = filter_profiles(&population, &filter)
            .map(|p| p.user_id.as_str())
            .collect();
        assert_eq!(located, vec!["a", "b", "d"]);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 2, d).unwrap();
        let points: Vec<TimeSeriesPoint> = (1..=5).map(|d| TimeSeriesPoint::empty(day(d))).collect();
        let filter = FilterCondition {
            date_range: Some(DateRange::new(day(2), day(4))),
            ..FilterCondition::default()
        };

        let kept: Vec<NaiveDate> = filter_time_series(&points, &filter)
            .map(|p| p.timestamp)
            .collect();
        assert_eq!(kept, vec![day(2), day(3), day(4)]);
    }

    #[test]
    fn test_patch_overlays_set_fields() {
        let mut filter = FilterCondition {
            roles: vec![Role::Inactive],
            user_ids: vec!["a".to_string()],
            ..FilterCondition::default()
        };
        filter.apply(FilterPatch {
            roles: Some(vec![]),
            activity_range: Some(Some(ScoreRange::new(30, 70))),
            ..FilterPatch::default()
        });

        assert_eq!(
            filter,
            FilterCondition {
                activity_range: Some(ScoreRange::new(30, 70)),
                user_ids: vec!["a".to_string()],
                ..FilterCondition::default()
            }
        );
    }

    #[test]
    fn test_patch_clears_ranges() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
        let mut filter = FilterCondition {
            date_range: Some(DateRange::new(day(1), day(9))),
            activity_range: Some(ScoreRange::new(10, 20)),
            influence_range: Some(ScoreRange::new(30, 40)),
            ..FilterCondition::default()
        };

        filter.apply(FilterPatch {
            date_range: Some(None),
            activity_range: Some(None),
            ..FilterPatch::default()
        });
        assert_eq!(filter.date_range, None);
        assert_eq!(filter.activity_range, None);
        assert_eq!(filter.influence_range, Some(ScoreRange::new(30, 40)));

        let patch: FilterPatch = serde_json::from_str(r#"{"influence_range": null}"#).unwrap();
        assert_eq!(patch.influence_range, Some(None));
        assert_eq!(patch.date_range, None);
        filter.apply(patch);
        assert!(filter.is_unconstrained());
    }

    #[test]
    fn test_selection_patch() {
        let mut selection = SelectionState::default();
        assert!(selection.is_empty());

        selection.apply(SelectionPatch {
            selected_user_ids: Some(vec!["a".to_string()]),
            selected_role: Some(Role::General),
            ..SelectionPatch::default()
        });
        selection.apply(SelectionPatch {
            selected_region: Some("Oslo".to_string()),
            ..SelectionPatch::default()
        });

        assert_eq!(selection.selected_user_ids, vec!["a"]);
        assert_eq!(selection.selected_role, Some(Role::General));
        assert_eq!(selection.selected_region.as_deref(), Some("Oslo"));
    }

    #[test]
    fn test_filter_json_defaults() {
        let filter: FilterCondition =
            serde_json::from_str(r#"{"roles": ["information-seeker"], "activity_range": {"min": 10, "max": 20}}"#)
                .unwrap();
        assert_eq!(filter.roles, vec![Role::InformationSeeker]);
        assert_eq!(filter.activity_range, Some(ScoreRange::new(10, 20)));
        assert!(filter.interests.is_empty());
    }
}
