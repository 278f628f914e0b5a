// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launch lifecycle: start, heartbeat, reservation bookkeeping, completion

use crate::error::{LaunchPadError, Result};
use crate::launchpad::LaunchPad;
use crate::lock::WorkflowLock;
use fw_core::{Clock, FireWork, FwAction, FwId, FwState, LaunchId, LaunchState, WorkflowDraft};
use fw_storage::{Counter, EntityStore, Update};
use serde_json::Value;
use std::time::Instant;

/// How a launch ended
#[derive(Debug, Clone, PartialEq)]
pub enum LaunchOutcome {
    Completed(FwAction),
    /// Failed; optional detail is kept in the state history
    Fizzled(Option<Value>),
}

impl LaunchOutcome {
    fn state(&self) -> LaunchState {
        match self {
            LaunchOutcome::Completed(_) => LaunchState::Completed,
            LaunchOutcome::Fizzled(_) => LaunchState::Fizzled,
        }
    }
}

/// Result of reporting a launch outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Recorded; the FireWork is now in `state`
    Applied { fw_id: FwId, state: FwState },
    /// Recorded on the launch, but the FireWork is held and kept its state
    Held { fw_id: FwId, state: FwState },
    /// The launch had already finished; nothing changed
    Duplicate,
    /// The launch was superseded by a rerun; nothing changed
    Stale,
}

impl<S: EntityStore, C: Clock> LaunchPad<S, C> {
    /// A reserved launch started executing
    pub fn mark_running(&self, launch_id: LaunchId) -> Result<bool> {
        let now = self.now();
        let update = self.store.update_launch(launch_id, &mut |launch| {
            if launch.state != LaunchState::Reserved || launch.archived {
                return false;
            }
            launch.transition(LaunchState::Running, now, None);
            true
        })?;
        let launch = match update {
            Update::Applied(launch) => launch,
            Update::Unchanged(_) => return Ok(false),
            Update::NotFound => return Err(LaunchPadError::LaunchNotFound(launch_id)),
        };

        let wf_id = self.wf_id_for_fw(launch.fw_id)?;
        let guard = self.lock_workflow(wf_id)?;
        self.store.update_fw(launch.fw_id, &mut |fw| {
            if fw.state != FwState::Reserved || !fw.has_active_launch(launch_id) {
                return false;
            }
            fw.set_state(FwState::Running, now);
            true
        })?;
        self.refresh_locked(&guard, &[launch.fw_id])?;
        tracing::info!(launch_id = %launch_id, fw_id = %launch.fw_id, "launch running");
        Ok(true)
    }

    /// Heartbeat from a live launch
    pub fn ping_launch(&self, launch_id: LaunchId) -> Result<bool> {
        let now = self.now();
        match self.store.update_launch(launch_id, &mut |launch| {
            if launch.is_terminal() || launch.archived {
                return false;
            }
            launch.touch(now);
            true
        })? {
            Update::Applied(_) => Ok(true),
            Update::Unchanged(_) => Ok(false),
            Update::NotFound => Err(LaunchPadError::LaunchNotFound(launch_id)),
        }
    }

    /// Record the external queue id of a reserved launch
    pub fn set_reservation_id(&self, launch_id: LaunchId, reservation_id: &str) -> Result<bool> {
        let now = self.now();
        match self.store.update_launch(launch_id, &mut |launch| {
            if launch.state != LaunchState::Reserved || launch.archived {
                return false;
            }
            launch.reservation_id = Some(reservation_id.to_string());
            launch.updated_on = now;
            true
        })? {
            Update::Applied(_) => Ok(true),
            Update::Unchanged(_) => Ok(false),
            Update::NotFound => Err(LaunchPadError::LaunchNotFound(launch_id)),
        }
    }

    /// Drop a reservation that never started; the FireWork is rerun
    ///
    /// A defused or paused FireWork keeps its hold and restores to WAITING.
    /// Returns the FireWork if the reservation was still live. The external
    /// queue is not contacted.
    pub fn cancel_reservation(&self, launch_id: LaunchId) -> Result<Option<FwId>> {
        let launch = self.get_launch_by_id(launch_id)?;
        if launch.state != LaunchState::Reserved || launch.archived {
            return Ok(None);
        }
        let fw = self.get_fw_by_id(launch.fw_id)?;
        if !fw.has_active_launch(launch_id) || fw.state == FwState::Archived {
            return Ok(None);
        }
        if fw.state.is_reversible_hold() {
            let wf_id = self.wf_id_for_fw(launch.fw_id)?;
            let guard = self.lock_workflow(wf_id)?;
            if !self.supersede_under_hold(launch.fw_id, Some(launch_id))? {
                return Ok(None);
            }
            self.refresh_locked(&guard, &[launch.fw_id])?;
            tracing::info!(launch_id = %launch_id, fw_id = %launch.fw_id, "held reservation cancelled");
            return Ok(Some(launch.fw_id));
        }
        self.rerun_fw(launch.fw_id)?;
        tracing::info!(launch_id = %launch_id, fw_id = %launch.fw_id, "reservation cancelled");
        Ok(Some(launch.fw_id))
    }

    pub fn cancel_reservation_by_reservation_id(&self, reservation_id: &str) -> Result<Vec<FwId>> {
        let mut cancelled = Vec::new();
        for launch_id in self.store.launch_ids_for_reservation(reservation_id)? {
            if let Some(fw_id) = self.cancel_reservation(launch_id)? {
                cancelled.push(fw_id);
            }
        }
        Ok(cancelled)
    }

    /// Report a launch's outcome and propagate it
    ///
    /// Completing a launch twice is a no-op reported as `Duplicate`; a
    /// launch superseded by a rerun reports `Stale`.
    pub fn complete_launch(&self, launch_id: LaunchId, outcome: LaunchOutcome) -> Result<Completion> {
        let span = tracing::info_span!("launchpad.complete", launch_id = %launch_id);
        let _guard = span.enter();
        let start = Instant::now();

        let launch = self.get_launch_by_id(launch_id)?;
        let fw_id = launch.fw_id;
        let wf_id = self.wf_id_for_fw(fw_id)?;
        let guard = self.lock_workflow(wf_id)?;

        let now = self.now();
        let state = outcome.state();
        let (metadata, action) = match &outcome {
            LaunchOutcome::Completed(action) => (None, Some(action.clone())),
            LaunchOutcome::Fizzled(detail) => (detail.clone(), None),
        };
        let recorded = self.store.update_launch(launch_id, &mut |launch| {
            if launch.archived || launch.is_terminal() {
                return false;
            }
            launch.transition(state, now, metadata.clone());
            launch.action = action.clone();
            true
        })?;
        match recorded {
            Update::Applied(_) => {}
            Update::Unchanged(launch) if launch.archived => {
                tracing::info!(fw_id = %fw_id, "launch superseded by rerun");
                return Ok(Completion::Stale);
            }
            Update::Unchanged(_) => {
                tracing::info!(fw_id = %fw_id, "launch already finished");
                return Ok(Completion::Duplicate);
            }
            Update::NotFound => return Err(LaunchPadError::LaunchNotFound(launch_id)),
        }

        let derived = self.launch_derived_state(&self.get_fw_by_id(fw_id)?)?;
        let updated = self.store.update_fw(fw_id, &mut |fw| {
            if fw.state.is_held() || !fw.has_active_launch(launch_id) {
                return false;
            }
            match derived {
                Some(derived) => fw.set_state(derived, now),
                None => return false,
            }
            true
        })?;
        let fw = match updated {
            Update::Applied(fw) => fw,
            Update::Unchanged(fw) => {
                tracing::info!(fw_id = %fw_id, state = %fw.state, "firework held, outcome recorded only");
                return Ok(Completion::Held {
                    fw_id,
                    state: fw.state,
                });
            }
            Update::NotFound => return Err(LaunchPadError::FwNotFound(fw_id)),
        };

        if let LaunchOutcome::Completed(action) = &outcome {
            if fw.state == FwState::Completed && action.mutates_workflow() {
                self.apply_action(&guard, fw_id, action)?;
            }
        }
        self.refresh_locked(&guard, &[fw_id])?;

        tracing::info!(
            fw_id = %fw_id,
            state = %fw.state,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "launch completed"
        );
        Ok(Completion::Applied {
            fw_id,
            state: fw.state,
        })
    }

    /// FireWork state implied by its active launches: the highest-precedence one
    pub(crate) fn launch_derived_state(&self, fw: &FireWork) -> Result<Option<FwState>> {
        let mut best: Option<LaunchState> = None;
        for launch_id in &fw.launches {
            if let Some(launch) = self.store.get_launch(*launch_id)? {
                let better = match best {
                    Some(current) => launch.state.precedence() > current.precedence(),
                    None => true,
                };
                if better {
                    best = Some(launch.state);
                }
            }
        }
        Ok(best.map(LaunchState::fw_state))
    }

    /// Apply a completed launch's action to its workflow
    fn apply_action(&self, guard: &WorkflowLock<'_, S>, fw_id: FwId, action: &FwAction) -> Result<()> {
        let now = self.now();
        let wf = self.get_wf_by_id(guard.wf_id())?;
        let children: Vec<FwId> = wf.dag().children(fw_id).to_vec();

        if !action.update_spec.is_empty() {
            for child in &children {
                self.store.update_fw(*child, &mut |fw| {
                    fw.spec.merge(&action.update_spec);
                    fw.updated_on = now;
                    true
                })?;
            }
        }

        for (draft, detour) in action
            .additions
            .iter()
            .map(|d| (d, false))
            .chain(action.detours.iter().map(|d| (d, true)))
        {
            self.splice_draft(guard, fw_id, draft.clone(), detour)?;
        }

        let defuse_targets: Vec<FwId> = if action.defuse_workflow {
            self.get_wf_by_id(guard.wf_id())?.nodes.into_iter().collect()
        } else if action.defuse_children {
            children
        } else {
            Vec::new()
        };
        for target in defuse_targets {
            self.store.update_fw(target, &mut |fw| {
                if !fw.state.is_defusable() {
                    return false;
                }
                fw.hold(FwState::Defused, now);
                true
            })?;
        }
        Ok(())
    }

    /// Insert a sub-workflow below `parent` with freshly allocated ids
    fn splice_draft(
        &self,
        guard: &WorkflowLock<'_, S>,
        parent: FwId,
        mut draft: WorkflowDraft,
        detour: bool,
    ) -> Result<()> {
        draft.validate()?;
        draft.reassign_ids(|_| {
            self.store
                .next_id(Counter::FwId)
                .map(FwId)
                .map_err(LaunchPadError::from)
        })?;
        let now = self.now();
        for fw in &mut draft.fireworks {
            fw.state = FwState::Waiting;
            fw.held_from = None;
            fw.launches.clear();
            fw.archived_launches.clear();
            fw.created_on = now;
            fw.updated_on = now;
        }

        // Check the splice before any FireWork is written
        let mut preview = self.get_wf_by_id(guard.wf_id())?;
        preview.splice(parent, &draft, detour)?;

        for fw in &draft.fireworks {
            self.store.insert_fw(fw.clone())?;
        }
        self.store.update_wf(guard.wf_id(), &mut |wf| {
            wf.splice(parent, &draft, detour).is_ok()
        })?;
        tracing::info!(
            parent = %parent,
            added = draft.fireworks.len(),
            detour,
            "spliced sub-workflow"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
