// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Readiness propagation over a workflow DAG
//!
//! These functions are pure: they take the authoritative FireWork states and
//! return the transitions to apply. The engine persists the result under the
//! workflow lock.

use crate::dag::Dag;
use crate::error::WorkflowError;
use crate::ids::FwId;
use crate::state::FwState;
use crate::workflow::FailurePolicy;
use std::collections::{BTreeMap, BTreeSet};

/// FireWork states keyed by id
pub type StateMap = BTreeMap<FwId, FwState>;

/// One state transition produced by a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub fw_id: FwId,
    pub from: FwState,
    pub to: FwState,
}

/// Whether every parent of `fw_id` lets it run
pub fn parents_settled(dag: &Dag<'_>, states: &StateMap, policy: FailurePolicy, fw_id: FwId) -> bool {
    dag.parents(fw_id).iter().all(|parent| {
        states
            .get(parent)
            .is_some_and(|state| policy.parent_settled(*state))
    })
}

/// Re-evaluate `starts` and everything downstream of them
///
/// Nodes are visited in topological order, so a node sees its parents'
/// updated states. Only WAITING and READY nodes move; held and in-flight
/// nodes are left alone.
pub fn refresh_from(
    dag: &Dag<'_>,
    states: &StateMap,
    policy: FailurePolicy,
    starts: &[FwId],
) -> Result<Vec<StateChange>, WorkflowError> {
    let mut affected = BTreeSet::new();
    for start in starts {
        if !dag.contains(*start) {
            return Err(WorkflowError::NotInWorkflow(*start));
        }
        affected.insert(*start);
        affected.extend(dag.descendants(*start));
    }

    let mut working = states.clone();
    let mut changes = Vec::new();
    for fw_id in dag.order_subset(&affected)? {
        let Some(current) = working.get(&fw_id).copied() else {
            continue;
        };
        if !matches!(current, FwState::Waiting | FwState::Ready) {
            continue;
        }
        let target = if parents_settled(dag, &working, policy, fw_id) {
            FwState::Ready
        } else {
            FwState::Waiting
        };
        if target != current {
            working.insert(fw_id, target);
            changes.push(StateChange {
                fw_id,
                from: current,
                to: target,
            });
        }
    }
    Ok(changes)
}

/// Re-evaluate every node of the workflow
pub fn full_refresh(
    dag: &Dag<'_>,
    states: &StateMap,
    policy: FailurePolicy,
) -> Result<Vec<StateChange>, WorkflowError> {
    refresh_from(dag, states, policy, &dag.roots())
}

/// Apply changes to a state map
pub fn apply(states: &mut StateMap, changes: &[StateChange]) {
    for change in changes {
        states.insert(change.fw_id, change.to);
    }
}

/// Nodes a rerun of `target` resets: the target and its advanced descendants
///
/// Held descendants keep their hold; WAITING ones are already reset.
pub fn rerun_set(dag: &Dag<'_>, states: &StateMap, target: FwId) -> Vec<FwId> {
    let mut reset = vec![target];
    reset.extend(dag.descendants(target).into_iter().filter(|id| {
        states.get(id).is_some_and(|state| state.is_advanced())
    }));
    reset
}

/// Nodes archived along with `target`: the target and every descendant
pub fn archive_set(dag: &Dag<'_>, target: FwId) -> BTreeSet<FwId> {
    let mut set = dag.descendants(target);
    set.insert(target);
    set
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
