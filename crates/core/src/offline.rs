// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bookkeeping for launches executed without a store connection
//!
//! An offline launch writes its progress to a local record file; recovery
//! reads that record back and applies it as if the run had been online.

use crate::action::FwAction;
use crate::ids::{FwId, LaunchId};
use crate::state::LaunchState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name of the completion record inside a launch directory
pub const OFFLINE_RECORD_FILE: &str = "FW_offline.json";

/// Store document tracking one offline launch until it is reconciled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineRun {
    pub launch_id: LaunchId,
    pub fw_id: FwId,
    /// The record has been fully applied
    #[serde(default)]
    pub completed: bool,
    /// Forgotten by an operator; never recovered
    #[serde(default)]
    pub deprecated: bool,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

impl OfflineRun {
    pub fn new(launch_id: LaunchId, fw_id: FwId, now: DateTime<Utc>) -> Self {
        Self {
            launch_id,
            fw_id,
            completed: false,
            deprecated: false,
            created_on: now,
            updated_on: now,
        }
    }

    /// Still waiting to be recovered
    pub fn is_pending(&self) -> bool {
        !self.completed && !self.deprecated
    }
}

/// Progress written locally by an offline launch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineRecord {
    pub launch_id: LaunchId,
    pub state: LaunchState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_on: Option<DateTime<Utc>>,
    /// Last heartbeat written by the running job
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinged_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<FwAction>,
}

/// Why an offline record could not be applied
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OfflineRecordError {
    #[error("no offline record for {0}")]
    Missing(LaunchId),
    #[error("offline record for {launch_id} unreadable: {reason}")]
    Unreadable { launch_id: LaunchId, reason: String },
    #[error("offline record for {launch_id} malformed: {reason}")]
    Malformed { launch_id: LaunchId, reason: String },
    #[error("offline record names {found}, expected {expected}")]
    LaunchMismatch { expected: LaunchId, found: LaunchId },
}

impl OfflineRecord {
    /// Parse and check a record for `expected`
    pub fn parse(raw: &str, expected: LaunchId) -> Result<Self, OfflineRecordError> {
        let record: OfflineRecord =
            serde_json::from_str(raw).map_err(|e| OfflineRecordError::Malformed {
                launch_id: expected,
                reason: e.to_string(),
            })?;
        record.validate(expected)?;
        Ok(record)
    }

    pub fn validate(&self, expected: LaunchId) -> Result<(), OfflineRecordError> {
        if self.launch_id != expected {
            return Err(OfflineRecordError::LaunchMismatch {
                expected,
                found: self.launch_id,
            });
        }
        if self.state == LaunchState::Reserved {
            return Err(OfflineRecordError::Malformed {
                launch_id: expected,
                reason: "record never left RESERVED".to_string(),
            });
        }
        if self.state.is_terminal() && self.completed_on.is_none() {
            return Err(OfflineRecordError::Malformed {
                launch_id: expected,
                reason: format!("{} record has no completed_on", self.state),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "offline_tests.rs"]
mod tests;
