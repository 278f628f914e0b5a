// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FireWork: the atomic job document
//!
//! The engine never interprets a FireWork's spec beyond the typed envelope
//! (`_priority` and the optional queue/duplicate hints); the payload passes
//! through untouched.

use crate::ids::{FwId, LaunchId};
use crate::state::FwState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key of the priority field inside a spec
pub const PRIORITY_KEY: &str = "_priority";
const DUPEFINDER_KEY: &str = "_dupefinder";
const QUEUEADAPTER_KEY: &str = "_queueadapter";

/// Job description: a small typed envelope plus an opaque payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FwSpec {
    #[serde(rename = "_priority", default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(rename = "_dupefinder", default, skip_serializing_if = "Option::is_none")]
    pub dupefinder: Option<Value>,
    #[serde(rename = "_queueadapter", default, skip_serializing_if = "Option::is_none")]
    pub queueadapter: Option<Value>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl FwSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Add an opaque payload entry
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// The spec as a single JSON object, envelope fields included
    pub fn to_value(&self) -> Value {
        let mut map = self.payload.clone();
        if let Some(priority) = self.priority {
            map.insert(PRIORITY_KEY.to_string(), Value::from(priority));
        }
        if let Some(dupefinder) = &self.dupefinder {
            map.insert(DUPEFINDER_KEY.to_string(), dupefinder.clone());
        }
        if let Some(queueadapter) = &self.queueadapter {
            map.insert(QUEUEADAPTER_KEY.to_string(), queueadapter.clone());
        }
        Value::Object(map)
    }

    /// Look up a value by JSON pointer (e.g. `/params/temperature`)
    pub fn lookup(&self, pointer: &str) -> Option<Value> {
        self.to_value().pointer(pointer).cloned()
    }

    /// Merge top-level keys into the spec, routing envelope keys to their fields
    pub fn merge(&mut self, updates: &Map<String, Value>) {
        for (key, value) in updates {
            match key.as_str() {
                PRIORITY_KEY => self.priority = value.as_i64(),
                DUPEFINDER_KEY => self.dupefinder = Some(value.clone()).filter(|v| !v.is_null()),
                QUEUEADAPTER_KEY => {
                    self.queueadapter = Some(value.clone()).filter(|v| !v.is_null())
                }
                _ => {
                    self.payload.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

/// An atomic unit of work with its own state and launch history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireWork {
    pub fw_id: FwId,
    pub name: String,
    pub spec: FwSpec,
    pub state: FwState,
    /// Active launch history, oldest first
    #[serde(default)]
    pub launches: Vec<LaunchId>,
    /// Launches superseded by a rerun, kept for audit
    #[serde(default)]
    pub archived_launches: Vec<LaunchId>,
    /// State recorded by defuse or pause, restored by reignite or resume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub held_from: Option<FwState>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

impl FireWork {
    /// Create a WAITING FireWork
    pub fn new(fw_id: impl Into<FwId>, name: impl Into<String>, spec: FwSpec, now: DateTime<Utc>) -> Self {
        Self {
            fw_id: fw_id.into(),
            name: name.into(),
            spec,
            state: FwState::Waiting,
            launches: Vec::new(),
            archived_launches: Vec::new(),
            held_from: None,
            created_on: now,
            updated_on: now,
        }
    }

    pub fn priority(&self) -> Option<i64> {
        self.spec.priority
    }

    /// Set the state and refresh `updated_on`
    pub fn set_state(&mut self, state: FwState, now: DateTime<Utc>) {
        self.state = state;
        self.updated_on = now;
    }

    /// Move active launches to the archived history; returns the moved ids
    pub fn archive_launches(&mut self, now: DateTime<Utc>) -> Vec<LaunchId> {
        let moved: Vec<LaunchId> = self.launches.drain(..).collect();
        self.archived_launches.extend(moved.iter().copied());
        if !moved.is_empty() {
            self.updated_on = now;
        }
        moved
    }

    /// Reset for re-execution: WAITING, no active launches, no held state
    pub fn reset_for_rerun(&mut self, now: DateTime<Utc>) -> Vec<LaunchId> {
        let moved = self.archive_launches(now);
        self.held_from = None;
        self.set_state(FwState::Waiting, now);
        moved
    }

    /// Drop active launches of a held FireWork without lifting the hold
    ///
    /// The hold now restores to WAITING so readiness is recomputed on
    /// release.
    pub fn reset_under_hold(&mut self, now: DateTime<Utc>) -> Vec<LaunchId> {
        let moved = self.archive_launches(now);
        if self.state.is_reversible_hold() {
            self.held_from = Some(FwState::Waiting);
            self.updated_on = now;
        }
        moved
    }

    /// Put the FireWork on hold, remembering where it was
    pub fn hold(&mut self, held: FwState, now: DateTime<Utc>) {
        if !self.state.is_held() {
            self.held_from = Some(self.state);
        }
        self.set_state(held, now);
    }

    /// Lift a hold; returns the state to restore (WAITING if none was recorded)
    pub fn release_hold(&mut self, now: DateTime<Utc>) -> FwState {
        let restored = self.held_from.take().unwrap_or(FwState::Waiting);
        self.set_state(restored, now);
        restored
    }

    pub fn has_active_launch(&self, launch_id: LaunchId) -> bool {
        self.launches.contains(&launch_id)
    }
}

#[cfg(test)]
#[path = "firework_tests.rs"]
mod tests;
