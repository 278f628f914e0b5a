// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FireWork and Launch states

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// State of a FireWork
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FwState {
    /// Has at least one unmet parent
    Waiting,
    /// Eligible to be claimed
    Ready,
    /// Claimed against an external queue slot, not yet started
    Reserved,
    Running,
    Completed,
    /// Terminal failure of the latest attempt
    Fizzled,
    /// Cancelled by an operator; reversible via reignite
    Defused,
    /// Irreversibly removed from active consideration
    Archived,
    /// Held by an operator; reversible via resume
    Paused,
}

impl FwState {
    pub const ALL: [FwState; 9] = [
        FwState::Waiting,
        FwState::Ready,
        FwState::Reserved,
        FwState::Running,
        FwState::Completed,
        FwState::Fizzled,
        FwState::Defused,
        FwState::Archived,
        FwState::Paused,
    ];

    /// Rank used for aggregate workflow state, most blocking first
    pub fn rank(self) -> u8 {
        match self {
            FwState::Archived => 0,
            FwState::Defused => 1,
            FwState::Paused => 2,
            FwState::Waiting => 3,
            FwState::Ready => 4,
            FwState::Reserved => 5,
            FwState::Running => 6,
            FwState::Fizzled => 7,
            FwState::Completed => 8,
        }
    }

    /// States an operator has put on hold; they block children and are never claimed
    pub fn is_held(self) -> bool {
        matches!(self, FwState::Defused | FwState::Paused | FwState::Archived)
    }

    /// Operator holds that can be lifted again
    pub fn is_reversible_hold(self) -> bool {
        matches!(self, FwState::Defused | FwState::Paused)
    }

    /// States that have advanced past WAITING and go stale when an ancestor reruns
    pub fn is_advanced(self) -> bool {
        matches!(
            self,
            FwState::Ready
                | FwState::Reserved
                | FwState::Running
                | FwState::Completed
                | FwState::Fizzled
        )
    }

    /// States with a live attempt
    pub fn is_active(self) -> bool {
        matches!(self, FwState::Reserved | FwState::Running)
    }

    /// States defuse may act on
    pub fn is_defusable(self) -> bool {
        matches!(self, FwState::Waiting | FwState::Ready | FwState::Reserved)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FwState::Waiting => "WAITING",
            FwState::Ready => "READY",
            FwState::Reserved => "RESERVED",
            FwState::Running => "RUNNING",
            FwState::Completed => "COMPLETED",
            FwState::Fizzled => "FIZZLED",
            FwState::Defused => "DEFUSED",
            FwState::Archived => "ARCHIVED",
            FwState::Paused => "PAUSED",
        }
    }
}

impl fmt::Display for FwState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a state name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown state: {0}")]
pub struct UnknownState(pub String);

impl FromStr for FwState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        FwState::ALL
            .into_iter()
            .find(|state| state.as_str() == upper)
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}

/// State of a single Launch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaunchState {
    Reserved,
    Running,
    Completed,
    Fizzled,
}

impl LaunchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LaunchState::Completed | LaunchState::Fizzled)
    }

    /// The FireWork state this launch implies
    pub fn fw_state(self) -> FwState {
        match self {
            LaunchState::Reserved => FwState::Reserved,
            LaunchState::Running => FwState::Running,
            LaunchState::Completed => FwState::Completed,
            LaunchState::Fizzled => FwState::Fizzled,
        }
    }

    /// Precedence when several active launches disagree: a completed attempt wins
    pub fn precedence(self) -> u8 {
        match self {
            LaunchState::Reserved => 0,
            LaunchState::Running => 1,
            LaunchState::Fizzled => 2,
            LaunchState::Completed => 3,
        }
    }
}

impl fmt::Display for LaunchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fw_state().fmt(f)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
