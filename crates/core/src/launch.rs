// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launch: one execution attempt of a FireWork
//!
//! A launch carries its own state history. Heartbeats refresh the
//! `updated_on` of the latest history entry, which is what the lost-run
//! sweep measures staleness against.

use crate::action::FwAction;
use crate::clock::elapsed_since;
use crate::ids::{FwId, LaunchId};
use crate::state::LaunchState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// One entry of a launch's append-only state history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateHistoryEntry {
    pub state: LaunchState,
    pub created_on: DateTime<Utc>,
    /// Last heartbeat while in this state
    pub updated_on: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// A named file-tail watcher, observability only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracker {
    pub filename: String,
    pub nlines: usize,
    #[serde(default)]
    pub content: String,
}

impl Tracker {
    pub fn new(filename: impl Into<String>, nlines: usize) -> Self {
        Self {
            filename: filename.into(),
            nlines,
            content: String::new(),
        }
    }
}

/// Where and by whom a launch is executed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaunchContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_dir: Option<PathBuf>,
    #[serde(default)]
    pub trackers: Vec<Tracker>,
    /// Executed without a live store connection; reconciled by offline recovery
    #[serde(default)]
    pub offline: bool,
}

impl LaunchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_worker(mut self, worker: impl Into<String>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_launch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.launch_dir = Some(dir.into());
        self
    }

    pub fn with_tracker(mut self, tracker: Tracker) -> Self {
        self.trackers.push(tracker);
        self
    }

    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }
}

/// One execution attempt of a FireWork
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Launch {
    pub launch_id: LaunchId,
    pub fw_id: FwId,
    pub state: LaunchState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<String>,
    pub state_history: Vec<StateHistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<FwAction>,
    #[serde(flatten)]
    pub context: LaunchContext,
    /// Superseded by a rerun; excluded from active queries
    #[serde(default)]
    pub archived: bool,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

impl Launch {
    /// Create a launch in RESERVED or RUNNING state
    pub fn new(
        launch_id: LaunchId,
        fw_id: FwId,
        state: LaunchState,
        context: LaunchContext,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            launch_id,
            fw_id,
            state,
            reservation_id: None,
            state_history: vec![StateHistoryEntry {
                state,
                created_on: now,
                updated_on: now,
                metadata: None,
            }],
            action: None,
            context,
            archived: false,
            created_on: now,
            updated_on: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move to a new state, appending to the history
    pub fn transition(&mut self, state: LaunchState, now: DateTime<Utc>, metadata: Option<Value>) {
        self.state = state;
        self.state_history.push(StateHistoryEntry {
            state,
            created_on: now,
            updated_on: now,
            metadata,
        });
        self.updated_on = now;
    }

    /// Heartbeat: refresh the current history entry
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if let Some(entry) = self.state_history.last_mut() {
            entry.updated_on = now;
        }
        self.updated_on = now;
    }

    fn latest_entry(&self, state: LaunchState) -> Option<&StateHistoryEntry> {
        self.state_history.iter().rev().find(|e| e.state == state)
    }

    /// When the reservation was made, if this launch was ever reserved
    pub fn reserved_on(&self) -> Option<DateTime<Utc>> {
        self.latest_entry(LaunchState::Reserved).map(|e| e.created_on)
    }

    /// When execution started
    pub fn running_since(&self) -> Option<DateTime<Utc>> {
        self.latest_entry(LaunchState::Running).map(|e| e.created_on)
    }

    /// Last heartbeat of the current state
    pub fn last_update(&self) -> DateTime<Utc> {
        self.state_history
            .last()
            .map(|e| e.updated_on)
            .unwrap_or(self.updated_on)
    }

    /// Elapsed runtime: from the RUNNING transition to the latest heartbeat or completion
    pub fn runtime(&self) -> Option<Duration> {
        let since = self.running_since()?;
        Some(elapsed_since(self.last_update(), since))
    }

    /// Reserved longer than `expiration` without ever starting
    pub fn is_stale_reservation(&self, now: DateTime<Utc>, expiration: Duration) -> bool {
        if self.state != LaunchState::Reserved || self.running_since().is_some() {
            return false;
        }
        self.reserved_on()
            .is_some_and(|reserved| elapsed_since(now, reserved) > expiration)
    }

    /// Running with a heartbeat older than `expiration`, or a runtime beyond `max_runtime`
    pub fn is_lost(&self, now: DateTime<Utc>, expiration: Duration, max_runtime: Option<Duration>) -> bool {
        if self.state != LaunchState::Running {
            return false;
        }
        let stalled = elapsed_since(now, self.last_update()) > expiration;
        let overran = match (max_runtime, self.running_since()) {
            (Some(limit), Some(since)) => elapsed_since(now, since) > limit,
            _ => false,
        };
        stalled || overran
    }
}

#[cfg(test)]
#[path = "launch_tests.rs"]
mod tests;
