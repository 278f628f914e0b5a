// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized documents built from operations

use crate::op::DocumentOp;
use crate::store::Counter;
use fw_core::{FireWork, FwId, FwState, Launch, LaunchId, OfflineRun, WfId, Workflow};
use std::collections::{BTreeMap, BTreeSet};

/// Every collection plus its secondary indexes
#[derive(Debug, Default, Clone)]
pub struct Documents {
    pub fireworks: BTreeMap<FwId, FireWork>,
    pub launches: BTreeMap<LaunchId, Launch>,
    pub workflows: BTreeMap<WfId, Workflow>,
    pub offline_runs: BTreeMap<LaunchId, OfflineRun>,
    pub counters: BTreeMap<Counter, i64>,
    by_state: BTreeMap<FwState, BTreeSet<FwId>>,
    by_reservation: BTreeMap<String, BTreeSet<LaunchId>>,
    by_node: BTreeMap<FwId, WfId>,
}

impl Documents {
    /// Apply an operation to update the documents and indexes
    pub fn apply(&mut self, op: &DocumentOp) {
        match op {
            DocumentOp::PutFireWork { fw } => {
                self.remove_fw(fw.fw_id);
                self.by_state.entry(fw.state).or_default().insert(fw.fw_id);
                self.fireworks.insert(fw.fw_id, (**fw).clone());
            }

            DocumentOp::DeleteFireWork { fw_id } => self.remove_fw(*fw_id),

            DocumentOp::PutLaunch { launch } => {
                self.remove_launch(launch.launch_id);
                if let Some(qid) = &launch.reservation_id {
                    self.by_reservation
                        .entry(qid.clone())
                        .or_default()
                        .insert(launch.launch_id);
                }
                self.launches.insert(launch.launch_id, (**launch).clone());
            }

            DocumentOp::DeleteLaunch { launch_id } => self.remove_launch(*launch_id),

            DocumentOp::PutWorkflow { wf } => {
                self.remove_wf(wf.wf_id);
                for node in &wf.nodes {
                    self.by_node.insert(*node, wf.wf_id);
                }
                self.workflows.insert(wf.wf_id, (**wf).clone());
            }

            DocumentOp::DeleteWorkflow { wf_id } => self.remove_wf(*wf_id),

            DocumentOp::PutOfflineRun { run } => {
                self.offline_runs.insert(run.launch_id, run.clone());
            }

            DocumentOp::DeleteOfflineRun { launch_id } => {
                self.offline_runs.remove(launch_id);
            }

            DocumentOp::SetCounter { counter, value } => {
                self.counters.insert(*counter, *value);
            }

            DocumentOp::Reset => *self = Self::default(),
        }
    }

    fn remove_fw(&mut self, fw_id: FwId) {
        if let Some(old) = self.fireworks.remove(&fw_id) {
            if let Some(ids) = self.by_state.get_mut(&old.state) {
                ids.remove(&fw_id);
            }
        }
    }

    fn remove_launch(&mut self, launch_id: LaunchId) {
        if let Some(old) = self.launches.remove(&launch_id) {
            if let Some(qid) = &old.reservation_id {
                if let Some(ids) = self.by_reservation.get_mut(qid) {
                    ids.remove(&launch_id);
                    if ids.is_empty() {
                        self.by_reservation.remove(qid);
                    }
                }
            }
        }
    }

    fn remove_wf(&mut self, wf_id: WfId) {
        if let Some(old) = self.workflows.remove(&wf_id) {
            for node in &old.nodes {
                if self.by_node.get(node) == Some(&wf_id) {
                    self.by_node.remove(node);
                }
            }
        }
    }

    pub fn fw_ids_in_state(&self, state: FwState) -> Vec<FwId> {
        self.by_state
            .get(&state)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn launch_ids_for_reservation(&self, reservation_id: &str) -> Vec<LaunchId> {
        self.by_reservation
            .get(reservation_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn wf_id_for_fw(&self, fw_id: FwId) -> Option<WfId> {
        self.by_node.get(&fw_id).copied()
    }

    /// Recompute every index from the primary collections
    pub fn rebuild_indexes(&mut self) {
        self.by_state.clear();
        self.by_reservation.clear();
        self.by_node.clear();
        for fw in self.fireworks.values() {
            self.by_state.entry(fw.state).or_default().insert(fw.fw_id);
        }
        for launch in self.launches.values() {
            if let Some(qid) = &launch.reservation_id {
                self.by_reservation
                    .entry(qid.clone())
                    .or_default()
                    .insert(launch.launch_id);
            }
        }
        for wf in self.workflows.values() {
            for node in &wf.nodes {
                self.by_node.insert(*node, wf.wf_id);
            }
        }
    }

    /// Operations that rebuild these documents from empty
    pub fn snapshot(&self) -> Vec<DocumentOp> {
        let mut ops: Vec<DocumentOp> = self
            .counters
            .iter()
            .map(|(counter, value)| DocumentOp::SetCounter {
                counter: *counter,
                value: *value,
            })
            .collect();
        ops.extend(self.fireworks.values().map(|fw| DocumentOp::PutFireWork {
            fw: Box::new(fw.clone()),
        }));
        ops.extend(self.launches.values().map(|launch| DocumentOp::PutLaunch {
            launch: Box::new(launch.clone()),
        }));
        ops.extend(self.workflows.values().map(|wf| DocumentOp::PutWorkflow {
            wf: Box::new(wf.clone()),
        }));
        ops.extend(
            self.offline_runs
                .values()
                .map(|run| DocumentOp::PutOfflineRun { run: run.clone() }),
        );
        ops
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
