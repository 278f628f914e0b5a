// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured filters over FireWorks and Workflows

use crate::firework::FireWork;
use crate::ids::FwId;
use crate::state::FwState;
use crate::workflow::Workflow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Timestamp used to order query results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedOn,
    UpdatedOn,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub key: SortKey,
    pub order: SortOrder,
}

impl Sort {
    pub fn ascending(key: SortKey) -> Self {
        Self {
            key,
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(key: SortKey) -> Self {
        Self {
            key,
            order: SortOrder::Descending,
        }
    }

    /// Compare two timestamp pairs `(created_on, updated_on)`, id as tiebreak
    pub fn compare(
        &self,
        a: (DateTime<Utc>, DateTime<Utc>, i64),
        b: (DateTime<Utc>, DateTime<Utc>, i64),
    ) -> Ordering {
        let primary = match self.key {
            SortKey::CreatedOn => a.0.cmp(&b.0),
            SortKey::UpdatedOn => a.1.cmp(&b.1),
        };
        let ordering = primary.then(a.2.cmp(&b.2));
        match self.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

/// Truncate to `limit` entries; zero means unlimited
pub fn apply_limit<T>(mut items: Vec<T>, limit: usize) -> Vec<T> {
    if limit > 0 {
        items.truncate(limit);
    }
    items
}

/// Filter over FireWork documents; every set field must match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FwQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fw_ids: Option<Vec<FwId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub states: Option<Vec<FwState>>,
    /// JSON pointer into the spec and the value it must equal
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spec_equals: Vec<(String, Value)>,
    #[serde(default)]
    pub include_archived: bool,
}

impl FwQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(ids: impl IntoIterator<Item = FwId>) -> Self {
        Self::new().with_ids(ids)
    }

    pub fn with_ids(mut self, ids: impl IntoIterator<Item = FwId>) -> Self {
        self.fw_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_state(mut self, state: FwState) -> Self {
        self.states.get_or_insert_with(Vec::new).push(state);
        self
    }

    pub fn with_spec(mut self, pointer: impl Into<String>, value: impl Into<Value>) -> Self {
        self.spec_equals.push((pointer.into(), value.into()));
        self
    }

    pub fn including_archived(mut self) -> Self {
        self.include_archived = true;
        self
    }

    /// Archived documents match only when asked for explicitly
    fn admits_archived(&self) -> bool {
        self.include_archived
            || self
                .states
                .as_ref()
                .is_some_and(|states| states.contains(&FwState::Archived))
    }

    pub fn matches(&self, fw: &FireWork) -> bool {
        if fw.state == FwState::Archived && !self.admits_archived() {
            return false;
        }
        if let Some(ids) = &self.fw_ids {
            if !ids.contains(&fw.fw_id) {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if &fw.name != name {
                return false;
            }
        }
        if let Some(states) = &self.states {
            if !states.contains(&fw.state) {
                return false;
            }
        }
        self.spec_equals
            .iter()
            .all(|(pointer, value)| fw.spec.lookup(pointer).as_ref() == Some(value))
    }
}

/// Filter over Workflow documents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WfQuery {
    /// Workflows containing any of these FireWorks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fw_ids: Option<Vec<FwId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Aggregate states
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub states: Option<Vec<FwState>>,
    #[serde(default)]
    pub include_archived: bool,
}

impl WfQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fw_ids(mut self, ids: impl IntoIterator<Item = FwId>) -> Self {
        self.fw_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_state(mut self, state: FwState) -> Self {
        self.states.get_or_insert_with(Vec::new).push(state);
        self
    }

    pub fn including_archived(mut self) -> Self {
        self.include_archived = true;
        self
    }

    pub fn matches(&self, wf: &Workflow) -> bool {
        let state = wf.state();
        let admits_archived = self.include_archived
            || self
                .states
                .as_ref()
                .is_some_and(|states| states.contains(&FwState::Archived));
        if state == FwState::Archived && !admits_archived {
            return false;
        }
        if let Some(ids) = &self.fw_ids {
            if !ids.iter().any(|id| wf.contains(*id)) {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if &wf.name != name {
                return false;
            }
        }
        if let Some(states) = &self.states {
            if !states.contains(&state) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
