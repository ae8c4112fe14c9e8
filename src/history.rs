//! Interaction history
//!
//! A bounded log of state-changing actions. Each record carries the full filter
//! or selection that resulted from the action, so replaying it restores that
//! exact state. Once the capacity is reached the oldest record is evicted.

use crate::config::DEFAULT_HISTORY_CAPACITY;
use crate::filter::{FilterCondition, SelectionState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// Kind of logged action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionAction {
    Filter,
    Select,
    Highlight,
    Zoom,
}

/// View an action originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    #[default]
    Global,
    TimeSeries,
    Heatmap,
    Scatter,
    Network,
    Regions,
    InterestCloud,
}

/// One logged action with its replay payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: InteractionAction,
    pub view: ViewKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionState>,
}

impl InteractionRecord {
    pub fn new(action: InteractionAction, view: ViewKind, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            view,
            description: description.into(),
            filter: None,
            selection: None,
        }
    }

    pub fn with_filter(mut self, filter: FilterCondition) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_selection(mut self, selection: SelectionState) -> Self {
        self.selection = Some(selection);
        self
    }
}

/// Fixed-capacity ring buffer of interaction records, oldest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionHistory {
    records: VecDeque<InteractionRecord>,
    capacity: usize,
}

impl Default for InteractionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl InteractionHistory {
    /// Create an empty history. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record, evicting the oldest ones past capacity
    pub fn push(&mut self, record: InteractionRecord) {
        self.records.push_back(record);
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&InteractionRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Records from oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &InteractionRecord> {
        self.records.iter()
    }

    /// Records from newest to oldest
    pub fn newest_first(&self) -> impl Iterator<Item = &InteractionRecord> {
        self.records.iter().rev()
    }

    pub fn latest(&self) -> Option<&InteractionRecord> {
        self.records.back()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
