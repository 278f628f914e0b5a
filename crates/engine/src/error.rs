// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for LaunchPad operations

use fw_core::{FwId, FwState, LaunchId, OfflineRecordError, WfId, WorkflowError};
use fw_storage::StoreError;
use thiserror::Error;

/// Errors that can occur in LaunchPad operations
#[derive(Debug, Error)]
pub enum LaunchPadError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("invalid workflow: {0}")]
    Workflow(#[from] WorkflowError),
    #[error("firework not found: {0}")]
    FwNotFound(FwId),
    #[error("launch not found: {0}")]
    LaunchNotFound(LaunchId),
    #[error("workflow not found: {0}")]
    WfNotFound(WfId),
    #[error("no workflow contains {0}")]
    NoWorkflow(FwId),
    #[error("{0} is archived")]
    Archived(FwId),
    #[error("cannot {action} {fw_id} while {state}")]
    InvalidTransition {
        fw_id: FwId,
        state: FwState,
        action: &'static str,
    },
    #[error("{0} already exists")]
    DuplicateId(FwId),
    #[error("ambiguous selector: {0}")]
    AmbiguousSelector(String),
    #[error("{count} entities selected; confirmation required above {threshold}")]
    ConfirmationRequired { count: usize, threshold: usize },
    #[error("incorrect reset password")]
    BadPassword,
    #[error("timed out locking {wf_id} held by {holder}")]
    LockTimeout { wf_id: WfId, holder: String },
    #[error("offline recovery failed: {0}")]
    Offline(#[from] OfflineRecordError),
    #[error("no offline run registered for {0}")]
    OfflineRunNotFound(LaunchId),
}

pub type Result<T> = std::result::Result<T, LaunchPadError>;
