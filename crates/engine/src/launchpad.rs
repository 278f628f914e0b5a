// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LaunchPad: submission and queries
//!
//! The LaunchPad holds no state of its own beyond configuration; every call
//! reads and writes the store. Other operations live in sibling modules as
//! further `impl` blocks.

use crate::error::{LaunchPadError, Result};
use chrono::{DateTime, Utc};
use fw_core::query::apply_limit;
use fw_core::{
    Clock, FireWork, FwId, FwQuery, FwState, LaunchId, LaunchPadConfig, Links, Sort, Tracker,
    WfId, WfQuery, Workflow, WorkflowDraft,
};
use fw_storage::{Counter, EntityStore};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// Orchestration façade over an entity store
#[derive(Clone)]
pub struct LaunchPad<S: EntityStore, C: Clock> {
    pub(crate) store: S,
    pub(crate) clock: C,
    pub(crate) config: LaunchPadConfig,
}

/// Result of a workflow submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub wf_id: WfId,
    /// Submitted id to stored id
    pub id_map: BTreeMap<FwId, FwId>,
}

/// Read-only view of a workflow for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSummary {
    pub wf_id: WfId,
    pub name: String,
    pub state: FwState,
    pub metadata: Map<String, Value>,
    /// Per node: name and state
    pub nodes: BTreeMap<FwId, (String, FwState)>,
    pub links: Links,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// Trackers of one active launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackerData {
    pub launch_id: LaunchId,
    pub trackers: Vec<Tracker>,
}

impl<S: EntityStore, C: Clock> LaunchPad<S, C> {
    pub fn new(store: S, clock: C, config: LaunchPadConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &LaunchPadConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Submit a workflow, assigning fresh ids to every FireWork
    pub fn add_workflow(&self, draft: WorkflowDraft) -> Result<Submitted> {
        let span = tracing::info_span!("launchpad.add_workflow", name = %draft.name);
        let _guard = span.enter();

        draft.validate()?;
        let mut draft = draft;
        let id_map = draft.reassign_ids(|_| {
            self.store
                .next_id(Counter::FwId)
                .map(FwId)
                .map_err(LaunchPadError::from)
        })?;
        self.persist_workflow(draft, id_map)
    }

    /// Submit a workflow keeping positive ids; only placeholders are reassigned
    pub fn add_workflow_keep_ids(&self, draft: WorkflowDraft) -> Result<Submitted> {
        let span = tracing::info_span!("launchpad.add_workflow", name = %draft.name, keep_ids = true);
        let _guard = span.enter();

        draft.validate()?;
        for fw in draft.fireworks.iter().filter(|fw| !fw.fw_id.is_placeholder()) {
            if self.store.get_fw(fw.fw_id)?.is_some() {
                return Err(LaunchPadError::DuplicateId(fw.fw_id));
            }
        }
        if let Some(max) = draft.fireworks.iter().map(|fw| fw.fw_id.get()).max() {
            self.store.bump_counter(Counter::FwId, max)?;
        }

        let mut draft = draft;
        let id_map = draft.reassign_ids(|id| {
            if id.is_placeholder() {
                self.store
                    .next_id(Counter::FwId)
                    .map(FwId)
                    .map_err(LaunchPadError::from)
            } else {
                Ok(id)
            }
        })?;
        self.persist_workflow(draft, id_map)
    }

    /// Store FireWorks WAITING, then the workflow, then refresh from the roots
    fn persist_workflow(&self, mut draft: WorkflowDraft, id_map: BTreeMap<FwId, FwId>) -> Result<Submitted> {
        let start = Instant::now();
        let now = self.now();
        let wf_id = WfId(self.store.next_id(Counter::WfId)?);

        for fw in &mut draft.fireworks {
            prepare_submitted(fw, now);
        }
        let wf = draft.to_workflow(wf_id, self.config.failure_policy, now);
        let roots = wf.dag().roots();

        for fw in draft.fireworks {
            self.store.insert_fw(fw)?;
        }
        self.store.insert_wf(wf)?;

        let guard = self.lock_workflow(wf_id)?;
        let wf = self.refresh_locked(&guard, &roots)?;

        tracing::info!(
            wf_id = %wf_id,
            fireworks = wf.nodes.len(),
            state = %wf.state(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "workflow added"
        );
        Ok(Submitted { wf_id, id_map })
    }

    pub fn get_fw_by_id(&self, fw_id: FwId) -> Result<FireWork> {
        self.store
            .get_fw(fw_id)?
            .ok_or(LaunchPadError::FwNotFound(fw_id))
    }

    pub fn get_launch_by_id(&self, launch_id: LaunchId) -> Result<fw_core::Launch> {
        self.store
            .get_launch(launch_id)?
            .ok_or(LaunchPadError::LaunchNotFound(launch_id))
    }

    pub fn get_wf_by_id(&self, wf_id: WfId) -> Result<Workflow> {
        self.store
            .get_wf(wf_id)?
            .ok_or(LaunchPadError::WfNotFound(wf_id))
    }

    pub fn wf_id_for_fw(&self, fw_id: FwId) -> Result<WfId> {
        self.store
            .wf_id_for_fw(fw_id)?
            .ok_or(LaunchPadError::NoWorkflow(fw_id))
    }

    pub fn get_wf_by_fw_id(&self, fw_id: FwId) -> Result<Workflow> {
        self.get_wf_by_id(self.wf_id_for_fw(fw_id)?)
    }

    pub fn get_wf_summary(&self, fw_id: FwId) -> Result<WorkflowSummary> {
        let wf = self.get_wf_by_fw_id(fw_id)?;
        let mut nodes = BTreeMap::new();
        for id in &wf.nodes {
            if let Some(fw) = self.store.get_fw(*id)? {
                nodes.insert(*id, (fw.name, fw.state));
            }
        }
        Ok(WorkflowSummary {
            wf_id: wf.wf_id,
            state: wf.state(),
            name: wf.name,
            metadata: wf.metadata,
            nodes,
            links: wf.links,
            created_on: wf.created_on,
            updated_on: wf.updated_on,
        })
    }

    /// FireWork ids matching `query`, sorted, capped at `limit` (0 = all)
    pub fn get_fw_ids(&self, query: &FwQuery, sort: Sort, limit: usize) -> Result<Vec<FwId>> {
        let mut fws = self.store.find_fws(&|fw| query.matches(fw))?;
        fws.sort_by(|a, b| {
            sort.compare(
                (a.created_on, a.updated_on, a.fw_id.get()),
                (b.created_on, b.updated_on, b.fw_id.get()),
            )
        });
        Ok(apply_limit(fws.into_iter().map(|fw| fw.fw_id).collect(), limit))
    }

    pub fn count_fws(&self, query: &FwQuery) -> Result<usize> {
        Ok(self.store.find_fws(&|fw| query.matches(fw))?.len())
    }

    /// READY FireWorks matching `query`
    pub fn get_ready_fw_ids(&self, query: &FwQuery, sort: Sort, limit: usize) -> Result<Vec<FwId>> {
        let mut ready = query.clone();
        ready.states = Some(vec![FwState::Ready]);
        if let Some(states) = &query.states {
            if !states.contains(&FwState::Ready) {
                return Ok(Vec::new());
            }
        }
        self.get_fw_ids(&ready, sort, limit)
    }

    pub fn get_wf_ids(&self, query: &WfQuery, sort: Sort, limit: usize) -> Result<Vec<WfId>> {
        let mut wfs = self.store.find_wfs(&|wf| query.matches(wf))?;
        wfs.sort_by(|a, b| {
            sort.compare(
                (a.created_on, a.updated_on, a.wf_id.get()),
                (b.created_on, b.updated_on, b.wf_id.get()),
            )
        });
        Ok(apply_limit(wfs.into_iter().map(|wf| wf.wf_id).collect(), limit))
    }

    /// Change claim priority; nothing else is touched
    pub fn set_priority(&self, fw_id: FwId, priority: i64) -> Result<()> {
        let now = self.now();
        let update = self.store.update_fw(fw_id, &mut |fw| {
            fw.spec.priority = Some(priority);
            fw.updated_on = now;
            true
        })?;
        if update.is_applied() {
            tracing::info!(fw_id = %fw_id, priority, "priority set");
            Ok(())
        } else {
            Err(LaunchPadError::FwNotFound(fw_id))
        }
    }

    /// Trackers of each active launch of a FireWork
    pub fn get_tracker_data(&self, fw_id: FwId) -> Result<Vec<TrackerData>> {
        let fw = self.get_fw_by_id(fw_id)?;
        let mut data = Vec::new();
        for launch_id in &fw.launches {
            if let Some(launch) = self.store.get_launch(*launch_id)? {
                data.push(TrackerData {
                    launch_id: launch.launch_id,
                    trackers: launch.context.trackers,
                });
            }
        }
        Ok(data)
    }

    /// Reservation id of the latest reserved launch of a FireWork
    pub fn get_reservation_id_from_fw_id(&self, fw_id: FwId) -> Result<Option<String>> {
        let fw = self.get_fw_by_id(fw_id)?;
        for launch_id in fw.launches.iter().rev() {
            if let Some(qid) = self
                .store
                .get_launch(*launch_id)?
                .and_then(|launch| launch.reservation_id)
            {
                return Ok(Some(qid));
            }
        }
        Ok(None)
    }

    pub fn get_fw_ids_from_reservation_id(&self, reservation_id: &str) -> Result<Vec<FwId>> {
        let mut fw_ids = BTreeSet::new();
        for launch_id in self.store.launch_ids_for_reservation(reservation_id)? {
            if let Some(launch) = self.store.get_launch(launch_id)? {
                fw_ids.insert(launch.fw_id);
            }
        }
        Ok(fw_ids.into_iter().collect())
    }

    /// Wipe every document; `password` must be today's date (YYYY-MM-DD, UTC)
    pub fn reset(&self, password: &str) -> Result<()> {
        let today = self.now().format("%Y-%m-%d").to_string();
        if password != today {
            tracing::warn!("reset rejected: bad password");
            return Err(LaunchPadError::BadPassword);
        }
        self.store.reset()?;
        tracing::info!("launchpad reset");
        Ok(())
    }
}

/// Normalize a submitted FireWork: fresh history, WAITING unless held
fn prepare_submitted(fw: &mut FireWork, now: DateTime<Utc>) {
    if !fw.state.is_reversible_hold() {
        fw.state = FwState::Waiting;
        fw.held_from = None;
    }
    fw.launches.clear();
    fw.archived_launches.clear();
    fw.created_on = now;
    fw.updated_on = now;
}

#[cfg(test)]
#[path = "launchpad_tests.rs"]
mod tests;
