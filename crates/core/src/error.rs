// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validation errors for workflow graphs

use crate::ids::FwId;
use thiserror::Error;

/// A workflow graph that cannot be accepted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("workflow has no fireworks")]
    Empty,
    #[error("duplicate fw_id in workflow: {0}")]
    DuplicateFwId(FwId),
    #[error("link {parent} -> {child} references a firework outside the workflow")]
    UnknownNode { parent: FwId, child: FwId },
    #[error("firework {0} links to itself")]
    SelfLink(FwId),
    #[error("link {parent} -> {child} is listed twice")]
    DuplicateLink { parent: FwId, child: FwId },
    #[error("links contain a cycle through {0:?}")]
    Cycle(Vec<FwId>),
    #[error("firework {0} is not part of the workflow")]
    NotInWorkflow(FwId),
}
