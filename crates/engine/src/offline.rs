// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciling launches that ran without a store connection
//!
//! An offline launch leaves a record file in its launch directory. Recovery
//! reads it through an [`OfflineRecordReader`] and replays it with the same
//! primitives an online launch uses.

use crate::error::{LaunchPadError, Result};
use crate::launchpad::LaunchPad;
use crate::lifecycle::{Completion, LaunchOutcome};
use fw_core::{
    Clock, FwId, Launch, LaunchId, LaunchState, OfflineRecord, OfflineRecordError,
    OfflineRun, OFFLINE_RECORD_FILE,
};
use fw_storage::{EntityStore, Update};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::Mutex;

/// Source of offline completion records
pub trait OfflineRecordReader: Send + Sync {
    fn read(&self, launch: &Launch) -> std::result::Result<OfflineRecord, OfflineRecordError>;
}

/// Reads `FW_offline.json` from the launch directory
#[derive(Debug, Clone, Copy, Default)]
pub struct LaunchDirReader;

impl OfflineRecordReader for LaunchDirReader {
    fn read(&self, launch: &Launch) -> std::result::Result<OfflineRecord, OfflineRecordError> {
        let Some(dir) = &launch.context.launch_dir else {
            return Err(OfflineRecordError::Missing(launch.launch_id));
        };
        let path = dir.join(OFFLINE_RECORD_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(OfflineRecordError::Missing(launch.launch_id))
            }
            Err(e) => {
                return Err(OfflineRecordError::Unreadable {
                    launch_id: launch.launch_id,
                    reason: format!("{}: {e}", path.display()),
                })
            }
        };
        OfflineRecord::parse(&raw, launch.launch_id)
    }
}

/// Records held in memory, keyed by launch
#[derive(Debug, Default)]
pub struct InMemoryRecords {
    raw: Mutex<HashMap<LaunchId, String>>,
}

impl InMemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record as the raw text the launch would have written
    pub fn put_raw(&self, launch_id: LaunchId, raw: impl Into<String>) {
        self.raw
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(launch_id, raw.into());
    }

    pub fn put(&self, record: &OfflineRecord) {
        let raw = serde_json::to_string(record).unwrap_or_default();
        self.put_raw(record.launch_id, raw);
    }
}

impl OfflineRecordReader for InMemoryRecords {
    fn read(&self, launch: &Launch) -> std::result::Result<OfflineRecord, OfflineRecordError> {
        let raw = self
            .raw
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&launch.launch_id)
            .cloned()
            .ok_or(OfflineRecordError::Missing(launch.launch_id))?;
        OfflineRecord::parse(&raw, launch.launch_id)
    }
}

/// Outcome of reconciling one offline launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    /// The record reached a terminal state and was applied
    Finished { fw_id: FwId, state: LaunchState },
    /// The launch is still running; its heartbeat was applied
    InProgress { fw_id: FwId },
    /// The record was bad and skipped
    Failed { fw_id: FwId, error: OfflineRecordError },
    /// Already reconciled or forgotten
    Skipped,
}

/// Totals from [`LaunchPad::recover_all_offline`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub recovered: Vec<FwId>,
    pub in_progress: Vec<FwId>,
    pub failed: Vec<FwId>,
}

impl<S: EntityStore, C: Clock> LaunchPad<S, C> {
    /// Track a launch for offline recovery
    pub fn register_offline_run(&self, launch_id: LaunchId) -> Result<()> {
        let launch = self.get_launch_by_id(launch_id)?;
        if self.store.get_offline_run(launch_id)?.is_some() {
            return Ok(());
        }
        self.store
            .put_offline_run(OfflineRun::new(launch_id, launch.fw_id, self.now()))?;
        tracing::info!(launch_id = %launch_id, fw_id = %launch.fw_id, "offline run registered");
        Ok(())
    }

    /// Apply the local record of one offline launch
    ///
    /// A bad record is an error unless `ignore_errors` is set, in which case
    /// it is reported as [`Recovery::Failed`] and left pending.
    pub fn recover_offline(
        &self,
        launch_id: LaunchId,
        ignore_errors: bool,
        reader: &dyn OfflineRecordReader,
    ) -> Result<Recovery> {
        let span = tracing::info_span!("launchpad.recover_offline", launch_id = %launch_id);
        let _guard = span.enter();

        let run = self
            .store
            .get_offline_run(launch_id)?
            .ok_or(LaunchPadError::OfflineRunNotFound(launch_id))?;
        if !run.is_pending() {
            return Ok(Recovery::Skipped);
        }
        let launch = self.get_launch_by_id(launch_id)?;

        let record = match reader.read(&launch) {
            Ok(record) => record,
            Err(error) if ignore_errors => {
                tracing::warn!(fw_id = %run.fw_id, %error, "skipping bad offline record");
                return Ok(Recovery::Failed {
                    fw_id: run.fw_id,
                    error,
                });
            }
            Err(error) => return Err(error.into()),
        };

        if launch.state == LaunchState::Reserved {
            self.mark_running(launch_id)?;
        }
        if let Some(pinged_on) = record.pinged_on {
            self.store.update_launch(launch_id, &mut |launch| {
                if launch.is_terminal() || launch.last_update() >= pinged_on {
                    return false;
                }
                launch.touch(pinged_on);
                true
            })?;
        }

        if !record.state.is_terminal() {
            tracing::info!(fw_id = %run.fw_id, "offline run still in progress");
            return Ok(Recovery::InProgress { fw_id: run.fw_id });
        }

        let outcome = match record.state {
            LaunchState::Completed => LaunchOutcome::Completed(record.action.clone().unwrap_or_default()),
            _ => LaunchOutcome::Fizzled(None),
        };
        let completion = self.complete_launch(launch_id, outcome)?;
        let now = self.now();
        self.store.update_offline_run(launch_id, &mut |run| {
            run.completed = true;
            run.updated_on = now;
            true
        })?;
        tracing::info!(fw_id = %run.fw_id, ?completion, "offline run recovered");
        if let Completion::Stale = completion {
            tracing::warn!(fw_id = %run.fw_id, "offline launch was superseded by a rerun");
        }
        Ok(Recovery::Finished {
            fw_id: run.fw_id,
            state: record.state,
        })
    }

    /// Reconcile every pending offline run, oldest launch first
    pub fn recover_all_offline(
        &self,
        ignore_errors: bool,
        reader: &dyn OfflineRecordReader,
    ) -> Result<RecoveryReport> {
        let mut pending = self.store.find_offline_runs(&|run| run.is_pending())?;
        pending.sort_by_key(|run| run.launch_id);

        let mut report = RecoveryReport::default();
        for run in pending {
            match self.recover_offline(run.launch_id, ignore_errors, reader)? {
                Recovery::Finished { fw_id, .. } => report.recovered.push(fw_id),
                Recovery::InProgress { fw_id } => report.in_progress.push(fw_id),
                Recovery::Failed { fw_id, .. } => report.failed.push(fw_id),
                Recovery::Skipped => {}
            }
        }
        if !report.failed.is_empty() {
            tracing::warn!(failed = ?report.failed, "offline recovery incomplete");
        }
        tracing::info!(
            recovered = report.recovered.len(),
            in_progress = report.in_progress.len(),
            failed = report.failed.len(),
            "offline recovery done"
        );
        Ok(report)
    }

    /// Stop tracking the offline runs of a FireWork; returns how many were dropped
    pub fn forget_offline(&self, fw_id: FwId) -> Result<usize> {
        self.get_fw_by_id(fw_id)?;
        let now = self.now();
        let mut forgotten = 0;
        for run in self.store.find_offline_runs(&|run| run.fw_id == fw_id && run.is_pending())? {
            if let Update::Applied(_) = self.store.update_offline_run(run.launch_id, &mut |run| {
                if !run.is_pending() {
                    return false;
                }
                run.deprecated = true;
                run.updated_on = now;
                true
            })? {
                forgotten += 1;
            }
        }
        tracing::info!(fw_id = %fw_id, forgotten, "offline runs forgotten");
        Ok(forgotten)
    }
}

#[cfg(test)]
#[path = "offline_tests.rs"]
mod tests;
