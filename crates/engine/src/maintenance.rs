// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic maintenance and store repair
//!
//! A maintenance pass runs both expiration sweeps with repair enabled.
//! `tuneup` rebuilds indexes and resyncs workflow state caches.

use crate::error::Result;
use crate::launchpad::LaunchPad;
use crate::sweeps::LostRuns;
use fw_core::{Clock, FwId, FwState, LaunchPadConfig, WfId};
use fw_storage::EntityStore;
use std::future::Future;
use std::time::{Duration, Instant};

/// Thresholds for a maintenance pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaintenanceConfig {
    /// Sleep between passes in infinite mode
    pub interval: Duration,
    /// Reservations older than this are cancelled
    pub reservation_expiration: Duration,
    /// Running launches silent for longer than this are lost
    pub run_expiration: Duration,
    /// Running launches older than this are lost regardless of heartbeat
    pub max_runtime: Option<Duration>,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self::from_launchpad(&LaunchPadConfig::default())
    }
}

impl MaintenanceConfig {
    pub fn from_launchpad(config: &LaunchPadConfig) -> Self {
        Self {
            interval: config.maintain_interval,
            reservation_expiration: config.reservation_expiration,
            run_expiration: config.run_expiration,
            max_runtime: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_reservation_expiration(mut self, expiration: Duration) -> Self {
        self.reservation_expiration = expiration;
        self
    }

    pub fn with_run_expiration(mut self, expiration: Duration) -> Self {
        self.run_expiration = expiration;
        self
    }

    pub fn with_max_runtime(mut self, max_runtime: Duration) -> Self {
        self.max_runtime = Some(max_runtime);
        self
    }
}

/// What one maintenance pass repaired
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub unreserved: Vec<FwId>,
    pub lost: LostRuns,
}

impl MaintenanceReport {
    pub fn is_clean(&self) -> bool {
        self.unreserved.is_empty() && self.lost.is_empty()
    }
}

/// What `tuneup` repaired
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TuneupReport {
    /// FireWorks left RESERVED or RUNNING with no live launch
    pub repaired: Vec<FwId>,
    /// Workflows whose state cache disagreed with their FireWorks
    pub resynced: Vec<WfId>,
    pub compacted: bool,
}

impl<S: EntityStore, C: Clock> LaunchPad<S, C> {
    /// One pass of both sweeps, rerunning whatever they find
    pub fn maintain_once(&self, config: &MaintenanceConfig) -> Result<MaintenanceReport> {
        let span = tracing::info_span!("launchpad.maintain");
        let _guard = span.enter();
        let start = Instant::now();

        let lost = self.detect_lostruns(config.run_expiration, true, true, config.max_runtime)?;
        let unreserved = self.detect_unreserved(config.reservation_expiration, true)?;
        let report = MaintenanceReport { unreserved, lost };

        tracing::info!(
            unreserved = report.unreserved.len(),
            lost_launches = report.lost.launch_ids.len(),
            lost_fireworks = report.lost.fw_ids.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "maintenance pass"
        );
        Ok(report)
    }

    /// Run maintenance once, or until `shutdown` resolves
    ///
    /// In infinite mode a failed pass is logged and the loop continues.
    /// Returns the number of passes that succeeded. Needs the multi-threaded
    /// runtime.
    pub async fn maintain<F>(&self, infinite: bool, config: &MaintenanceConfig, shutdown: F) -> Result<usize>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut passes = 0;
        loop {
            // Sweeps take the store mutex and sleep on lock retries
            match tokio::task::block_in_place(|| self.maintain_once(config)) {
                Ok(_) => passes += 1,
                Err(e) if infinite => tracing::error!(error = %e, "maintenance pass failed"),
                Err(e) => return Err(e),
            }
            if !infinite {
                return Ok(passes);
            }
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(passes, "maintenance stopped");
                    return Ok(passes);
                }
                _ = tokio::time::sleep(config.interval) => {}
            }
        }
    }

    /// Rebuild indexes and resync every workflow state cache
    ///
    /// `full` also repairs FireWorks stuck in flight and compacts the store.
    pub fn tuneup(&self, full: bool) -> Result<TuneupReport> {
        let span = tracing::info_span!("launchpad.tuneup", full);
        let _guard = span.enter();
        let start = Instant::now();

        self.store.rebuild_indexes()?;
        let mut report = TuneupReport::default();

        if full {
            for state in [FwState::Reserved, FwState::Running] {
                for fw_id in self.store.fw_ids_in_state(state)? {
                    if self.repair_in_flight(fw_id)? {
                        report.repaired.push(fw_id);
                    }
                }
            }
        }

        for wf in self.store.find_wfs(&|_| true)? {
            let states = self.read_states(&wf)?;
            if states == wf.fw_states {
                continue;
            }
            tracing::warn!(wf_id = %wf.wf_id, "workflow state cache out of sync");
            let guard = self.lock_workflow(wf.wf_id)?;
            self.refresh_locked(&guard, &wf.dag().roots())?;
            report.resynced.push(wf.wf_id);
        }

        if full {
            self.store.compact()?;
            report.compacted = true;
        }

        tracing::info!(
            repaired = report.repaired.len(),
            resynced = report.resynced.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "tuneup done"
        );
        Ok(report)
    }

    /// Move an in-flight FireWork whose launches all ended to the state they imply
    fn repair_in_flight(&self, fw_id: FwId) -> Result<bool> {
        let fw = self.get_fw_by_id(fw_id)?;
        let target = match self.launch_derived_state(&fw)? {
            Some(derived) if derived.is_active() => return Ok(false),
            Some(derived) => derived,
            None => FwState::Waiting,
        };
        let wf_id = self.wf_id_for_fw(fw_id)?;
        let guard = self.lock_workflow(wf_id)?;
        let now = self.now();
        let from = fw.state;
        let update = self.store.update_fw(fw_id, &mut |fw| {
            if fw.state != from {
                return false;
            }
            fw.set_state(target, now);
            true
        })?;
        if !update.is_applied() {
            return Ok(false);
        }
        self.refresh_locked(&guard, &[fw_id])?;
        tracing::warn!(fw_id = %fw_id, from = %from, to = %target, "repaired in-flight firework");
        Ok(true)
    }
}

#[cfg(test)]
#[path = "maintenance_tests.rs"]
mod tests;
