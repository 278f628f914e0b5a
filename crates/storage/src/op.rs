// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journaled write operations

use crate::store::Counter;
use fw_core::{FireWork, FwId, Launch, LaunchId, OfflineRun, WfId, Workflow};
use serde::{Deserialize, Serialize};

/// One write against the store; puts carry the whole new document
///
/// Externally tagged: workflow documents carry integer-keyed maps, which
/// do not survive the buffering an internal tag needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentOp {
    PutFireWork { fw: Box<FireWork> },
    DeleteFireWork { fw_id: FwId },
    PutLaunch { launch: Box<Launch> },
    DeleteLaunch { launch_id: LaunchId },
    PutWorkflow { wf: Box<Workflow> },
    DeleteWorkflow { wf_id: WfId },
    PutOfflineRun { run: OfflineRun },
    DeleteOfflineRun { launch_id: LaunchId },
    SetCounter { counter: Counter, value: i64 },
    /// Drop every document and counter
    Reset,
}
