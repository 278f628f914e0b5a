// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator state mutations: rerun, defuse, reignite, pause, archive, purge
//!
//! Every mutation runs under the workflow lock and ends with a refresh, so
//! overlapping mutations on one workflow never interleave.

use crate::error::{LaunchPadError, Result};
use crate::launchpad::LaunchPad;
use crate::lock::WorkflowLock;
use fw_core::refresh;
use fw_core::{Clock, FireWork, FwId, FwState, LaunchId, WfId};
use fw_storage::{EntityStore, Update};
use std::collections::BTreeSet;

impl<S: EntityStore, C: Clock> LaunchPad<S, C> {
    /// Reset a FireWork and its advanced descendants to re-execute
    ///
    /// Returns every FireWork that was reset. Active launches move to the
    /// archived history.
    pub fn rerun_fw(&self, fw_id: FwId) -> Result<Vec<FwId>> {
        let span = tracing::info_span!("launchpad.rerun", fw_id = %fw_id);
        let _guard = span.enter();

        let fw = self.get_fw_by_id(fw_id)?;
        if fw.state == FwState::Archived {
            return Err(LaunchPadError::Archived(fw_id));
        }
        let wf_id = self.wf_id_for_fw(fw_id)?;
        let guard = self.lock_workflow(wf_id)?;

        let wf = self.get_wf_by_id(wf_id)?;
        let states = self.read_states(&wf)?;
        let targets = refresh::rerun_set(&wf.dag(), &states, fw_id);

        let now = self.now();
        let mut reset = Vec::new();
        for target in targets {
            let mut superseded = Vec::new();
            let update = self.store.update_fw(target, &mut |fw| {
                let eligible = if fw.fw_id == fw_id {
                    fw.state != FwState::Archived
                } else {
                    fw.state.is_advanced()
                };
                if !eligible {
                    return false;
                }
                superseded = fw.reset_for_rerun(now);
                true
            })?;
            if !update.is_applied() {
                continue;
            }
            self.archive_superseded(&superseded)?;
            reset.push(target);
        }

        // Held descendants keep their hold but lose launches fed by stale inputs
        let mut held = 0;
        for node in wf.dag().descendants(fw_id) {
            let held_state = states.get(&node).is_some_and(|state| state.is_reversible_hold());
            if held_state && self.supersede_under_hold(node, None)? {
                held += 1;
            }
        }

        self.refresh_locked(&guard, &[fw_id])?;
        tracing::info!(reset = reset.len(), held, "rerun");
        Ok(reset)
    }

    /// Archive the launches of a held FireWork, keeping the hold
    ///
    /// With `launch_id`, only acts while that launch is still active. The
    /// caller holds the workflow lock.
    pub(crate) fn supersede_under_hold(
        &self,
        fw_id: FwId,
        launch_id: Option<LaunchId>,
    ) -> Result<bool> {
        let now = self.now();
        let mut superseded = Vec::new();
        let update = self.store.update_fw(fw_id, &mut |fw| {
            if !fw.state.is_reversible_hold() {
                return false;
            }
            if launch_id.is_some_and(|id| !fw.has_active_launch(id)) {
                return false;
            }
            let advanced = fw.held_from.is_some_and(FwState::is_advanced);
            if fw.launches.is_empty() && !advanced {
                return false;
            }
            superseded = fw.reset_under_hold(now);
            true
        })?;
        if !update.is_applied() {
            return Ok(false);
        }
        self.archive_superseded(&superseded)?;
        tracing::debug!(fw_id = %fw_id, launches = superseded.len(), "launches superseded under hold");
        Ok(true)
    }

    fn archive_superseded(&self, launch_ids: &[LaunchId]) -> Result<()> {
        let now = self.now();
        for launch_id in launch_ids {
            self.store.update_launch(*launch_id, &mut |launch| {
                launch.archived = true;
                launch.updated_on = now;
                true
            })?;
        }
        Ok(())
    }

    /// Put a WAITING, READY or RESERVED FireWork on hold
    ///
    /// Returns `false` if it was already defused.
    pub fn defuse_fw(&self, fw_id: FwId) -> Result<bool> {
        self.hold_fw(fw_id, FwState::Defused, "defuse", FwState::is_defusable)
    }

    /// Pause a WAITING or READY FireWork
    pub fn pause_fw(&self, fw_id: FwId) -> Result<bool> {
        self.hold_fw(fw_id, FwState::Paused, "pause", |state| {
            matches!(state, FwState::Waiting | FwState::Ready)
        })
    }

    fn hold_fw(
        &self,
        fw_id: FwId,
        held: FwState,
        action: &'static str,
        allowed: fn(FwState) -> bool,
    ) -> Result<bool> {
        let span = tracing::info_span!("launchpad.hold", fw_id = %fw_id, action);
        let _guard = span.enter();

        let wf_id = self.wf_id_for_fw(fw_id)?;
        let guard = self.lock_workflow(wf_id)?;
        let now = self.now();

        match self.store.update_fw(fw_id, &mut |fw| {
            if !allowed(fw.state) {
                return false;
            }
            fw.hold(held, now);
            true
        })? {
            Update::Applied(_) => {}
            Update::Unchanged(fw) if fw.state == held => return Ok(false),
            Update::Unchanged(fw) if fw.state == FwState::Archived => {
                return Err(LaunchPadError::Archived(fw_id))
            }
            Update::Unchanged(fw) => {
                return Err(LaunchPadError::InvalidTransition {
                    fw_id,
                    state: fw.state,
                    action,
                })
            }
            Update::NotFound => return Err(LaunchPadError::FwNotFound(fw_id)),
        }

        self.refresh_locked(&guard, &[fw_id])?;
        tracing::info!(state = %held, "held");
        Ok(true)
    }

    /// Defuse every defusable FireWork of the workflow containing `fw_id`
    pub fn defuse_wf(&self, fw_id: FwId) -> Result<Vec<FwId>> {
        let span = tracing::info_span!("launchpad.defuse_wf", fw_id = %fw_id);
        let _guard = span.enter();

        let wf_id = self.wf_id_for_fw(fw_id)?;
        let guard = self.lock_workflow(wf_id)?;
        let now = self.now();
        let mut defused = Vec::new();
        for node in self.get_wf_by_id(wf_id)?.nodes {
            let update = self.store.update_fw(node, &mut |fw| {
                if !fw.state.is_defusable() {
                    return false;
                }
                fw.hold(FwState::Defused, now);
                true
            })?;
            if update.is_applied() {
                defused.push(node);
            }
        }
        let roots = self.get_wf_by_id(wf_id)?.dag().roots();
        self.refresh_locked(&guard, &roots)?;
        tracing::info!(wf_id = %wf_id, defused = defused.len(), "workflow defused");
        Ok(defused)
    }

    /// Lift a defuse; `false` if the FireWork was not defused
    pub fn reignite_fw(&self, fw_id: FwId) -> Result<bool> {
        self.release_fw(fw_id, FwState::Defused, "reignite")
    }

    /// Lift a pause; `false` if the FireWork was not paused
    pub fn resume_fw(&self, fw_id: FwId) -> Result<bool> {
        self.release_fw(fw_id, FwState::Paused, "resume")
    }

    fn release_fw(&self, fw_id: FwId, held: FwState, action: &'static str) -> Result<bool> {
        let span = tracing::info_span!("launchpad.release", fw_id = %fw_id, action);
        let _guard = span.enter();

        let fw = self.get_fw_by_id(fw_id)?;
        if fw.state == FwState::Archived {
            return Err(LaunchPadError::Archived(fw_id));
        }
        if fw.state != held {
            return Ok(false);
        }
        let wf_id = self.wf_id_for_fw(fw_id)?;
        let guard = self.lock_workflow(wf_id)?;
        let released = self.release_locked(fw_id, held)?;
        self.refresh_locked(&guard, &[fw_id])?;
        tracing::info!(released, "released");
        Ok(released)
    }

    /// Restore a held FireWork; the caller holds the workflow lock
    ///
    /// A hold placed on an in-flight FireWork restores to whatever its
    /// launches now say, since they may have finished meanwhile.
    fn release_locked(&self, fw_id: FwId, held: FwState) -> Result<bool> {
        let fw = self.get_fw_by_id(fw_id)?;
        let derived = self.launch_derived_state(&fw)?;
        let now = self.now();
        let update = self.store.update_fw(fw_id, &mut |fw| {
            if fw.state != held {
                return false;
            }
            let restored = fw.release_hold(now);
            if restored.is_active() {
                if let Some(derived) = derived {
                    fw.set_state(derived, now);
                }
            }
            true
        })?;
        Ok(update.is_applied())
    }

    /// Reignite every defused FireWork of the workflow containing `fw_id`
    pub fn reignite_wf(&self, fw_id: FwId) -> Result<Vec<FwId>> {
        let span = tracing::info_span!("launchpad.reignite_wf", fw_id = %fw_id);
        let _guard = span.enter();

        let wf_id = self.wf_id_for_fw(fw_id)?;
        let guard = self.lock_workflow(wf_id)?;
        let wf = self.get_wf_by_id(wf_id)?;
        let states = self.read_states(&wf)?;
        if !states.is_empty() && states.values().all(|s| *s == FwState::Archived) {
            return Err(LaunchPadError::Archived(fw_id));
        }

        let mut reignited = Vec::new();
        for (node, state) in &states {
            if *state == FwState::Defused && self.release_locked(*node, FwState::Defused)? {
                reignited.push(*node);
            }
        }
        self.refresh_locked(&guard, &wf.dag().roots())?;
        tracing::info!(wf_id = %wf_id, reignited = reignited.len(), "workflow reignited");
        Ok(reignited)
    }

    /// Archive every FireWork of the workflow containing `fw_id`
    pub fn archive_wf(&self, fw_id: FwId) -> Result<Vec<FwId>> {
        let span = tracing::info_span!("launchpad.archive_wf", fw_id = %fw_id);
        let _guard = span.enter();

        let wf_id = self.wf_id_for_fw(fw_id)?;
        self.archive_workflow(wf_id)
    }

    pub(crate) fn archive_workflow(&self, wf_id: WfId) -> Result<Vec<FwId>> {
        let guard = self.lock_workflow(wf_id)?;
        let nodes: BTreeSet<FwId> = self.get_wf_by_id(wf_id)?.nodes;
        self.archive_locked(&guard, nodes)
    }

    /// Archive a FireWork and every descendant
    pub fn archive_fw(&self, fw_id: FwId) -> Result<Vec<FwId>> {
        let span = tracing::info_span!("launchpad.archive_fw", fw_id = %fw_id);
        let _guard = span.enter();

        let wf_id = self.wf_id_for_fw(fw_id)?;
        let guard = self.lock_workflow(wf_id)?;
        let wf = self.get_wf_by_id(wf_id)?;
        let targets = refresh::archive_set(&wf.dag(), fw_id);
        self.archive_locked(&guard, targets)
    }

    fn archive_locked(&self, guard: &WorkflowLock<'_, S>, targets: BTreeSet<FwId>) -> Result<Vec<FwId>> {
        let now = self.now();
        let mut archived = Vec::new();
        for target in targets {
            let update = self.store.update_fw(target, &mut |fw| {
                if fw.state == FwState::Archived {
                    return false;
                }
                fw.held_from = None;
                fw.set_state(FwState::Archived, now);
                true
            })?;
            if update.is_applied() {
                archived.push(target);
            }
        }
        let wf = self.get_wf_by_id(guard.wf_id())?;
        let states = self.read_states(&wf)?;
        self.write_cache(guard, states)?;
        tracing::info!(wf_id = %guard.wf_id(), archived = archived.len(), "archived");
        Ok(archived)
    }

    /// Delete the workflow containing `fw_id`, its FireWorks and all their launches
    pub fn purge_wf(&self, fw_id: FwId) -> Result<WfId> {
        let span = tracing::info_span!("launchpad.purge", fw_id = %fw_id);
        let _guard = span.enter();

        let wf_id = self.wf_id_for_fw(fw_id)?;
        self.purge_workflow(wf_id)
    }

    pub(crate) fn purge_workflow(&self, wf_id: WfId) -> Result<WfId> {
        let guard = self.lock_workflow(wf_id)?;
        let wf = self.get_wf_by_id(wf_id)?;

        let mut launches = 0;
        for node in &wf.nodes {
            let Some(fw) = self.store.get_fw(*node)? else {
                continue;
            };
            for launch_id in all_launches(&fw) {
                self.store.delete_offline_run(launch_id)?;
                if self.store.delete_launch(launch_id)? {
                    launches += 1;
                }
            }
            self.store.delete_fw(*node)?;
        }
        self.store.delete_wf(wf_id)?;
        drop(guard);

        tracing::warn!(wf_id = %wf_id, fireworks = wf.nodes.len(), launches, "workflow purged");
        Ok(wf_id)
    }
}

fn all_launches(fw: &FireWork) -> Vec<fw_core::LaunchId> {
    fw.launches
        .iter()
        .chain(fw.archived_launches.iter())
        .copied()
        .collect()
}

#[cfg(test)]
#[path = "mutations_tests.rs"]
mod tests;
