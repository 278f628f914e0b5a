// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion payload returned by a finished launch

use crate::workflow::WorkflowDraft;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What a completed launch asks the engine to do next
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FwAction {
    /// Result data, stored with the launch and never interpreted
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub stored_data: Map<String, Value>,
    /// Keys merged into the spec of every direct child
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub update_spec: Map<String, Value>,
    /// Sub-workflows appended as new children of the completed FireWork
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additions: Vec<WorkflowDraft>,
    /// Sub-workflows inserted between the completed FireWork and its children
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detours: Vec<WorkflowDraft>,
    #[serde(default)]
    pub defuse_children: bool,
    #[serde(default)]
    pub defuse_workflow: bool,
}

impl FwAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stored_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.stored_data.insert(key.into(), value.into());
        self
    }

    pub fn with_update_spec(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.update_spec.insert(key.into(), value.into());
        self
    }

    pub fn with_addition(mut self, wf: WorkflowDraft) -> Self {
        self.additions.push(wf);
        self
    }

    pub fn with_detour(mut self, wf: WorkflowDraft) -> Self {
        self.detours.push(wf);
        self
    }

    pub fn defusing_children(mut self) -> Self {
        self.defuse_children = true;
        self
    }

    pub fn defusing_workflow(mut self) -> Self {
        self.defuse_workflow = true;
        self
    }

    /// Whether applying this action changes the workflow graph or other FireWorks
    pub fn mutates_workflow(&self) -> bool {
        !self.update_spec.is_empty()
            || !self.additions.is_empty()
            || !self.detours.is_empty()
            || self.defuse_children
            || self.defuse_workflow
    }
}
