// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process document store with optional write-ahead journaling
//!
//! All collections sit behind one mutex, which makes each call atomic. When
//! a WAL is attached, an operation is appended and synced before it is
//! applied; if the append fails the documents are left as they were.

use crate::op::DocumentOp;
use crate::state::Documents;
use crate::store::{Counter, EntityStore, Mutator, StoreError, StoreResult, Update};
use crate::wal::Wal;
use fw_core::{FireWork, FwId, FwState, Launch, LaunchId, OfflineRun, WfId, Workflow};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

struct Inner {
    docs: Documents,
    wal: Option<Wal>,
    available: bool,
    /// Writes allowed before the store goes unavailable
    writes_left: Option<usize>,
}

impl Inner {
    fn check(&self) -> StoreResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }

    fn commit(&mut self, op: DocumentOp) -> StoreResult<()> {
        match self.writes_left {
            Some(0) => {
                self.available = false;
                self.writes_left = None;
                return Err(StoreError::Unavailable);
            }
            Some(left) => self.writes_left = Some(left - 1),
            None => {}
        }
        if let Some(wal) = &mut self.wal {
            wal.append(&op)?;
        }
        self.docs.apply(&op);
        Ok(())
    }
}

/// Shared handle to the document collections
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<Mutex<Inner>>,
}

impl DocumentStore {
    /// A store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::with_parts(Documents::default(), None)
    }

    /// Open a journaled store, replaying any existing log
    pub fn open(path: &Path) -> StoreResult<Self> {
        let ops = Wal::replay(path)?;
        let mut docs = Documents::default();
        for op in &ops {
            docs.apply(op);
        }
        let wal = Wal::open(path)?;
        tracing::info!(
            path = %path.display(),
            ops = ops.len(),
            fireworks = docs.fireworks.len(),
            workflows = docs.workflows.len(),
            "replayed write-ahead log"
        );
        Ok(Self::with_parts(docs, Some(wal)))
    }

    fn with_parts(docs: Documents, wal: Option<Wal>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                docs,
                wal,
                available: true,
                writes_left: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Simulate an outage: while unavailable every call fails
    pub fn set_available(&self, available: bool) {
        let mut inner = self.lock();
        inner.available = available;
        inner.writes_left = None;
    }

    /// Simulate an outage that starts after `writes` more successful writes
    pub fn fail_after_writes(&self, writes: usize) {
        self.lock().writes_left = Some(writes);
    }

    /// Copy of every collection, for inspection
    pub fn documents(&self) -> Documents {
        self.lock().docs.clone()
    }

    fn read<T>(&self, f: impl FnOnce(&Documents) -> T) -> StoreResult<T> {
        let inner = self.lock();
        inner.check()?;
        Ok(f(&inner.docs))
    }

    fn insert_with(
        &self,
        exists: impl FnOnce(&Documents) -> bool,
        key: impl FnOnce() -> String,
        op: DocumentOp,
    ) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.check()?;
        if exists(&inner.docs) {
            return Err(StoreError::DuplicateKey(key()));
        }
        inner.commit(op)
    }

    fn update_with<T: Clone>(
        &self,
        get: impl for<'d> FnOnce(&'d Documents) -> Option<&'d T>,
        f: Mutator<'_, T>,
        put: impl FnOnce(&T) -> DocumentOp,
    ) -> StoreResult<Update<T>> {
        let mut inner = self.lock();
        inner.check()?;
        let Some(mut doc) = get(&inner.docs).cloned() else {
            return Ok(Update::NotFound);
        };
        if !f(&mut doc) {
            return Ok(Update::Unchanged(doc));
        }
        inner.commit(put(&doc))?;
        Ok(Update::Applied(doc))
    }

    fn delete_with(&self, exists: impl FnOnce(&Documents) -> bool, op: DocumentOp) -> StoreResult<bool> {
        let mut inner = self.lock();
        inner.check()?;
        if !exists(&inner.docs) {
            return Ok(false);
        }
        inner.commit(op)?;
        Ok(true)
    }
}

impl EntityStore for DocumentStore {
    fn next_id(&self, counter: Counter) -> StoreResult<i64> {
        let mut inner = self.lock();
        inner.check()?;
        let value = inner.docs.counters.get(&counter).copied().unwrap_or(0) + 1;
        inner.commit(DocumentOp::SetCounter { counter, value })?;
        Ok(value)
    }

    fn bump_counter(&self, counter: Counter, floor: i64) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.check()?;
        let current = inner.docs.counters.get(&counter).copied().unwrap_or(0);
        if current < floor {
            inner.commit(DocumentOp::SetCounter {
                counter,
                value: floor,
            })?;
        }
        Ok(())
    }

    fn insert_fw(&self, fw: FireWork) -> StoreResult<()> {
        let fw_id = fw.fw_id;
        self.insert_with(
            |d| d.fireworks.contains_key(&fw_id),
            || fw_id.to_string(),
            DocumentOp::PutFireWork { fw: Box::new(fw) },
        )
    }

    fn get_fw(&self, fw_id: FwId) -> StoreResult<Option<FireWork>> {
        self.read(|d| d.fireworks.get(&fw_id).cloned())
    }

    fn update_fw(&self, fw_id: FwId, f: Mutator<'_, FireWork>) -> StoreResult<Update<FireWork>> {
        self.update_with(
            |d| d.fireworks.get(&fw_id),
            f,
            |fw| DocumentOp::PutFireWork {
                fw: Box::new(fw.clone()),
            },
        )
    }

    fn delete_fw(&self, fw_id: FwId) -> StoreResult<bool> {
        self.delete_with(
            |d| d.fireworks.contains_key(&fw_id),
            DocumentOp::DeleteFireWork { fw_id },
        )
    }

    fn find_fws(&self, filter: &dyn Fn(&FireWork) -> bool) -> StoreResult<Vec<FireWork>> {
        self.read(|d| d.fireworks.values().filter(|fw| filter(*fw)).cloned().collect())
    }

    fn fw_ids_in_state(&self, state: FwState) -> StoreResult<Vec<FwId>> {
        self.read(|d| d.fw_ids_in_state(state))
    }

    fn wf_id_for_fw(&self, fw_id: FwId) -> StoreResult<Option<WfId>> {
        self.read(|d| d.wf_id_for_fw(fw_id))
    }

    fn insert_launch(&self, launch: Launch) -> StoreResult<()> {
        let launch_id = launch.launch_id;
        self.insert_with(
            |d| d.launches.contains_key(&launch_id),
            || launch_id.to_string(),
            DocumentOp::PutLaunch {
                launch: Box::new(launch),
            },
        )
    }

    fn get_launch(&self, launch_id: LaunchId) -> StoreResult<Option<Launch>> {
        self.read(|d| d.launches.get(&launch_id).cloned())
    }

    fn update_launch(&self, launch_id: LaunchId, f: Mutator<'_, Launch>) -> StoreResult<Update<Launch>> {
        self.update_with(
            |d| d.launches.get(&launch_id),
            f,
            |launch| DocumentOp::PutLaunch {
                launch: Box::new(launch.clone()),
            },
        )
    }

    fn delete_launch(&self, launch_id: LaunchId) -> StoreResult<bool> {
        self.delete_with(
            |d| d.launches.contains_key(&launch_id),
            DocumentOp::DeleteLaunch { launch_id },
        )
    }

    fn find_launches(&self, filter: &dyn Fn(&Launch) -> bool) -> StoreResult<Vec<Launch>> {
        self.read(|d| d.launches.values().filter(|l| filter(*l)).cloned().collect())
    }

    fn launch_ids_for_reservation(&self, reservation_id: &str) -> StoreResult<Vec<LaunchId>> {
        self.read(|d| d.launch_ids_for_reservation(reservation_id))
    }

    fn insert_wf(&self, wf: Workflow) -> StoreResult<()> {
        let wf_id = wf.wf_id;
        self.insert_with(
            |d| d.workflows.contains_key(&wf_id),
            || wf_id.to_string(),
            DocumentOp::PutWorkflow { wf: Box::new(wf) },
        )
    }

    fn get_wf(&self, wf_id: WfId) -> StoreResult<Option<Workflow>> {
        self.read(|d| d.workflows.get(&wf_id).cloned())
    }

    fn update_wf(&self, wf_id: WfId, f: Mutator<'_, Workflow>) -> StoreResult<Update<Workflow>> {
        self.update_with(
            |d| d.workflows.get(&wf_id),
            f,
            |wf| DocumentOp::PutWorkflow {
                wf: Box::new(wf.clone()),
            },
        )
    }

    fn delete_wf(&self, wf_id: WfId) -> StoreResult<bool> {
        self.delete_with(
            |d| d.workflows.contains_key(&wf_id),
            DocumentOp::DeleteWorkflow { wf_id },
        )
    }

    fn find_wfs(&self, filter: &dyn Fn(&Workflow) -> bool) -> StoreResult<Vec<Workflow>> {
        self.read(|d| d.workflows.values().filter(|wf| filter(*wf)).cloned().collect())
    }

    fn put_offline_run(&self, run: OfflineRun) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.check()?;
        inner.commit(DocumentOp::PutOfflineRun { run })
    }

    fn get_offline_run(&self, launch_id: LaunchId) -> StoreResult<Option<OfflineRun>> {
        self.read(|d| d.offline_runs.get(&launch_id).cloned())
    }

    fn update_offline_run(
        &self,
        launch_id: LaunchId,
        f: Mutator<'_, OfflineRun>,
    ) -> StoreResult<Update<OfflineRun>> {
        self.update_with(
            |d| d.offline_runs.get(&launch_id),
            f,
            |run| DocumentOp::PutOfflineRun { run: run.clone() },
        )
    }

    fn delete_offline_run(&self, launch_id: LaunchId) -> StoreResult<bool> {
        self.delete_with(
            |d| d.offline_runs.contains_key(&launch_id),
            DocumentOp::DeleteOfflineRun { launch_id },
        )
    }

    fn find_offline_runs(&self, filter: &dyn Fn(&OfflineRun) -> bool) -> StoreResult<Vec<OfflineRun>> {
        self.read(|d| d.offline_runs.values().filter(|r| filter(*r)).cloned().collect())
    }

    fn reset(&self) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.check()?;
        inner.commit(DocumentOp::Reset)
    }

    fn rebuild_indexes(&self) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.check()?;
        inner.docs.rebuild_indexes();
        Ok(())
    }

    fn compact(&self) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.check()?;
        let ops = inner.docs.snapshot();
        if let Some(wal) = &mut inner.wal {
            let before = wal.sequence();
            wal.rewrite(&ops)?;
            tracing::info!(before, after = wal.sequence(), "compacted write-ahead log");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
