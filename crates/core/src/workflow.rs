// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow: a DAG of FireWork ids with a denormalized state cache
//!
//! `fw_states` is a projection of the FireWork documents, rewritten by every
//! refresh. It is never the source of truth; `tuneup` repairs it when it
//! drifts.

use crate::dag::{Dag, Links};
use crate::error::WorkflowError;
use crate::firework::FireWork;
use crate::ids::{FwId, WfId};
use crate::state::FwState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// How a FIZZLED or DEFUSED parent affects its children
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Children wait until the parent is rerun or reignited
    #[default]
    Block,
    /// FIZZLED and DEFUSED parents count as settled
    ContinuePastFailure,
}

impl FailurePolicy {
    /// Whether a parent in `state` lets its children proceed
    pub fn parent_settled(self, state: FwState) -> bool {
        match state {
            FwState::Completed => true,
            FwState::Fizzled | FwState::Defused => self == FailurePolicy::ContinuePastFailure,
            _ => false,
        }
    }
}

/// Holder of a workflow's refresh lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    pub holder: String,
    pub acquired_on: DateTime<Utc>,
}

/// Persisted workflow document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub wf_id: WfId,
    pub name: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub nodes: BTreeSet<FwId>,
    #[serde(default)]
    pub links: Links,
    /// Cached FireWork states, synchronized by refresh
    pub fw_states: BTreeMap<FwId, FwState>,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock: Option<LockRecord>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

impl Workflow {
    pub fn dag(&self) -> Dag<'_> {
        Dag::new(self.nodes.iter().copied(), &self.links)
    }

    pub fn contains(&self, fw_id: FwId) -> bool {
        self.nodes.contains(&fw_id)
    }

    /// Aggregate state over the cached FireWork states
    pub fn state(&self) -> FwState {
        aggregate_state(self.fw_states.values().copied())
    }

    pub fn is_archived(&self) -> bool {
        !self.fw_states.is_empty() && self.fw_states.values().all(|s| *s == FwState::Archived)
    }

    /// Add a sub-workflow below `parent`
    ///
    /// Additions become extra children of `parent`. Detours take over
    /// `parent`'s current children: those are re-linked below the detour's
    /// leaves, so they wait for the detour to finish.
    pub fn splice(
        &mut self,
        parent: FwId,
        sub: &WorkflowDraft,
        detour: bool,
    ) -> Result<(), WorkflowError> {
        if !self.contains(parent) {
            return Err(WorkflowError::NotInWorkflow(parent));
        }
        for fw in &sub.fireworks {
            if self.contains(fw.fw_id) {
                return Err(WorkflowError::DuplicateFwId(fw.fw_id));
            }
        }

        let sub_dag = sub.dag();
        let sub_roots = sub_dag.roots();
        let sub_leaves = sub_dag.leaves();

        for fw in &sub.fireworks {
            self.nodes.insert(fw.fw_id);
            self.fw_states.insert(fw.fw_id, fw.state);
        }
        for (from, children) in &sub.links {
            self.links.entry(*from).or_default().extend(children.iter().copied());
        }

        let previous_children = if detour {
            self.links.remove(&parent).unwrap_or_default()
        } else {
            Vec::new()
        };
        for leaf in sub_leaves.iter().filter(|_| !previous_children.is_empty()) {
            let entry = self.links.entry(*leaf).or_default();
            for child in &previous_children {
                if !entry.contains(child) {
                    entry.push(*child);
                }
            }
        }
        let entry = self.links.entry(parent).or_default();
        for root in sub_roots {
            if !entry.contains(&root) {
                entry.push(root);
            }
        }

        self.dag().validate()
    }
}

/// Aggregate state of a set of FireWork states
///
/// COMPLETED iff every node is COMPLETED. Otherwise the most blocking hold
/// wins (ARCHIVED, then DEFUSED, then PAUSED); failing that, the most
/// advanced non-completed state describes where the workflow is.
pub fn aggregate_state(states: impl IntoIterator<Item = FwState>) -> FwState {
    let states: Vec<FwState> = states.into_iter().collect();
    if states.iter().all(|s| *s == FwState::Completed) {
        return FwState::Completed;
    }
    if let Some(held) = states
        .iter()
        .copied()
        .filter(|s| s.is_held())
        .min_by_key(|s| s.rank())
    {
        return held;
    }
    states
        .iter()
        .copied()
        .filter(|s| *s != FwState::Completed)
        .max_by_key(|s| s.rank())
        .unwrap_or(FwState::Waiting)
}

/// A workflow as submitted: FireWorks plus links, ids not yet final
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDraft {
    pub name: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub fireworks: Vec<FireWork>,
    #[serde(default)]
    pub links: Links,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_policy: Option<FailurePolicy>,
}

impl WorkflowDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A chain where each FireWork depends on the previous one
    pub fn linear(name: impl Into<String>, fireworks: Vec<FireWork>) -> Self {
        let mut draft = Self::new(name);
        let ids: Vec<FwId> = fireworks.iter().map(|fw| fw.fw_id).collect();
        draft.fireworks = fireworks;
        for pair in ids.windows(2) {
            draft.links.entry(pair[0]).or_default().push(pair[1]);
        }
        draft
    }

    pub fn with_firework(mut self, fw: FireWork) -> Self {
        self.fireworks.push(fw);
        self
    }

    pub fn with_link(mut self, parent: impl Into<FwId>, child: impl Into<FwId>) -> Self {
        self.links.entry(parent.into()).or_default().push(child.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }

    pub fn dag(&self) -> Dag<'_> {
        Dag::new(self.fireworks.iter().map(|fw| fw.fw_id), &self.links)
    }

    /// Reject empty workflows, duplicate ids and malformed links
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.fireworks.is_empty() {
            return Err(WorkflowError::Empty);
        }
        let mut seen = BTreeSet::new();
        for fw in &self.fireworks {
            if !seen.insert(fw.fw_id) {
                return Err(WorkflowError::DuplicateFwId(fw.fw_id));
            }
        }
        self.dag().validate()
    }

    /// Rewrite FireWork ids through `assign`, returning the old-to-new map
    ///
    /// `assign` receives each current id and returns the id to use; links are
    /// rewritten to match.
    pub fn reassign_ids<E>(
        &mut self,
        mut assign: impl FnMut(FwId) -> Result<FwId, E>,
    ) -> Result<BTreeMap<FwId, FwId>, E> {
        let mut mapping = BTreeMap::new();
        for fw in &mut self.fireworks {
            let new_id = assign(fw.fw_id)?;
            mapping.insert(fw.fw_id, new_id);
            fw.fw_id = new_id;
        }
        let remap = |id: &FwId| mapping.get(id).copied().unwrap_or(*id);
        self.links = self
            .links
            .iter()
            .map(|(parent, children)| (remap(parent), children.iter().map(remap).collect()))
            .collect();
        Ok(mapping)
    }

    /// Build the persisted document; FireWork states must already be set
    pub fn to_workflow(&self, wf_id: WfId, default_policy: FailurePolicy, now: DateTime<Utc>) -> Workflow {
        Workflow {
            wf_id,
            name: self.name.clone(),
            metadata: self.metadata.clone(),
            nodes: self.fireworks.iter().map(|fw| fw.fw_id).collect(),
            links: self.links.clone(),
            fw_states: self
                .fireworks
                .iter()
                .map(|fw| (fw.fw_id, fw.state))
                .collect(),
            failure_policy: self.failure_policy.unwrap_or(default_policy),
            lock: None,
            created_on: now,
            updated_on: now,
        }
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
