// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisting refresh results
//!
//! Runs the pure refresh over authoritative FireWork states and writes the
//! transitions back with conditional updates. A transition whose FireWork
//! moved underneath us (a claim, say) is dropped and the pass recomputed.
//! The workflow's state cache is then rewritten from the FireWork documents.

use crate::error::{LaunchPadError, Result};
use crate::launchpad::LaunchPad;
use crate::lock::WorkflowLock;
use fw_core::refresh::{self, StateMap};
use fw_core::{Clock, FwId, FwState, Workflow};
use fw_storage::EntityStore;

impl<S: EntityStore, C: Clock> LaunchPad<S, C> {
    /// Authoritative states of every node of a workflow
    pub(crate) fn read_states(&self, wf: &Workflow) -> Result<StateMap> {
        let mut states = StateMap::new();
        for fw_id in &wf.nodes {
            if let Some(fw) = self.store.get_fw(*fw_id)? {
                states.insert(*fw_id, fw.state);
            }
        }
        Ok(states)
    }

    /// Refresh downstream of `starts` and resync the state cache
    ///
    /// The caller holds the workflow lock. Returns the updated workflow.
    pub(crate) fn refresh_locked(&self, guard: &WorkflowLock<'_, S>, starts: &[FwId]) -> Result<Workflow> {
        let wf_id = guard.wf_id();
        let mut attempts = 0;

        let states = loop {
            let wf = self.get_wf_by_id(wf_id)?;
            let states = self.read_states(&wf)?;
            let dag = wf.dag();
            let starts: Vec<FwId> = starts.iter().copied().filter(|id| wf.contains(*id)).collect();
            let changes = refresh::refresh_from(&dag, &states, wf.failure_policy, &starts)?;

            let now = self.now();
            let mut conflicted = false;
            for change in &changes {
                let update = self.store.update_fw(change.fw_id, &mut |fw| {
                    if fw.state != change.from {
                        return false;
                    }
                    fw.set_state(change.to, now);
                    true
                })?;
                if update.is_applied() {
                    tracing::debug!(
                        fw_id = %change.fw_id,
                        from = %change.from,
                        to = %change.to,
                        "refreshed"
                    );
                } else {
                    conflicted = true;
                }
            }

            attempts += 1;
            if !conflicted || attempts > self.config.claim_retries {
                if conflicted {
                    tracing::warn!(wf_id = %wf_id, attempts, "refresh kept conflicting, syncing cache as-is");
                }
                break self.read_states(&wf)?;
            }
        };

        self.write_cache(guard, states)
    }

    /// Replace the workflow's state cache
    pub(crate) fn write_cache(&self, guard: &WorkflowLock<'_, S>, states: StateMap) -> Result<Workflow> {
        let now = self.now();
        self.store
            .update_wf(guard.wf_id(), &mut |wf| {
                wf.fw_states = states.clone();
                wf.updated_on = now;
                true
            })?
            .applied()
            .ok_or(LaunchPadError::WfNotFound(guard.wf_id()))
    }

    /// Recompute a whole workflow; returns its aggregate state
    pub fn refresh_wf(&self, fw_id: FwId) -> Result<FwState> {
        let span = tracing::info_span!("launchpad.refresh", fw_id = %fw_id);
        let _guard = span.enter();

        let wf_id = self.wf_id_for_fw(fw_id)?;
        let guard = self.lock_workflow(wf_id)?;
        let roots = self.get_wf_by_id(wf_id)?.dag().roots();
        let wf = self.refresh_locked(&guard, &roots)?;
        let state = wf.state();
        tracing::info!(wf_id = %wf_id, state = %state, "workflow refreshed");
        Ok(state)
    }

    /// Lock, refresh downstream of `fw_id`, unlock
    pub(crate) fn refresh_from_fw(&self, fw_id: FwId) -> Result<Workflow> {
        let wf_id = self.wf_id_for_fw(fw_id)?;
        let guard = self.lock_workflow(wf_id)?;
        self.refresh_locked(&guard, &[fw_id])
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
