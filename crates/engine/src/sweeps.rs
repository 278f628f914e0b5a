// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expiration sweeps over launches
//!
//! Detection is read-only. The repairing branches go through the same
//! conditional primitives as operator actions, so concurrent sweeps agree.

use crate::error::Result;
use crate::launchpad::LaunchPad;
use crate::lifecycle::LaunchOutcome;
use fw_core::{Clock, FwId, FwState, LaunchId, LaunchState};
use fw_storage::EntityStore;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

/// Launches found stalled and the FireWorks they leave stuck
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LostRuns {
    pub launch_ids: Vec<LaunchId>,
    /// FireWorks whose every running launch is lost
    pub fw_ids: Vec<FwId>,
}

impl LostRuns {
    pub fn is_empty(&self) -> bool {
        self.launch_ids.is_empty() && self.fw_ids.is_empty()
    }
}

impl<S: EntityStore, C: Clock> LaunchPad<S, C> {
    /// Reservations older than `expiration` that never started
    ///
    /// With `rerun`, each reservation is cancelled and its FireWork rerun.
    pub fn detect_unreserved(&self, expiration: Duration, rerun: bool) -> Result<Vec<FwId>> {
        let span = tracing::info_span!("launchpad.detect_unreserved", rerun);
        let _guard = span.enter();
        let start = Instant::now();

        let now = self.now();
        let stale = self.store.find_launches(&|launch| {
            !launch.archived && launch.is_stale_reservation(now, expiration)
        })?;

        let mut fw_ids = BTreeSet::new();
        for launch in stale {
            tracing::warn!(
                launch_id = %launch.launch_id,
                fw_id = %launch.fw_id,
                reservation_id = ?launch.reservation_id,
                "stale reservation"
            );
            fw_ids.insert(launch.fw_id);
            if rerun {
                self.cancel_reservation(launch.launch_id)?;
            }
        }

        tracing::info!(
            found = fw_ids.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "unreserved sweep done"
        );
        Ok(fw_ids.into_iter().collect())
    }

    /// Running launches with a stale heartbeat, or over `max_runtime`
    ///
    /// `fizzle` marks the lost launches FIZZLED; `rerun` does that and then
    /// reruns the FireWorks they left stuck.
    pub fn detect_lostruns(
        &self,
        expiration: Duration,
        fizzle: bool,
        rerun: bool,
        max_runtime: Option<Duration>,
    ) -> Result<LostRuns> {
        let span = tracing::info_span!("launchpad.detect_lostruns", fizzle, rerun);
        let _guard = span.enter();
        let start = Instant::now();

        let now = self.now();
        let lost = self
            .store
            .find_launches(&|launch| !launch.archived && launch.is_lost(now, expiration, max_runtime))?;

        let mut by_fw: BTreeMap<FwId, Vec<LaunchId>> = BTreeMap::new();
        for launch in &lost {
            tracing::warn!(
                launch_id = %launch.launch_id,
                fw_id = %launch.fw_id,
                last_update = %launch.last_update(),
                "lost run"
            );
            by_fw.entry(launch.fw_id).or_default().push(launch.launch_id);
        }

        let mut report = LostRuns {
            launch_ids: lost.iter().map(|l| l.launch_id).collect(),
            fw_ids: Vec::new(),
        };
        for (fw_id, lost_ids) in &by_fw {
            if self.is_stuck(*fw_id, lost_ids)? {
                report.fw_ids.push(*fw_id);
            }
        }

        if fizzle || rerun {
            for launch_id in &report.launch_ids {
                let detail = json!({ "fizzled_by": "detect_lostruns" });
                let completion = self.complete_launch(*launch_id, LaunchOutcome::Fizzled(Some(detail)))?;
                tracing::debug!(launch_id = %launch_id, ?completion, "lost run fizzled");
            }
        }
        if rerun {
            for fw_id in &report.fw_ids {
                let fw = self.get_fw_by_id(*fw_id)?;
                if fw.state == FwState::Archived {
                    continue;
                }
                self.rerun_fw(*fw_id)?;
            }
        }

        tracing::info!(
            launches = report.launch_ids.len(),
            fireworks = report.fw_ids.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "lost-run sweep done"
        );
        Ok(report)
    }

    /// RUNNING with no running active launch outside `lost`
    fn is_stuck(&self, fw_id: FwId, lost: &[LaunchId]) -> Result<bool> {
        let Some(fw) = self.store.get_fw(fw_id)? else {
            return Ok(false);
        };
        if fw.state != FwState::Running {
            return Ok(false);
        }
        for launch_id in &fw.launches {
            if lost.contains(launch_id) {
                continue;
            }
            if let Some(launch) = self.store.get_launch(*launch_id)? {
                if launch.state == LaunchState::Running {
                    return Ok(false);
                }
            }
        }
        Ok(fw.launches.iter().any(|id| lost.contains(id)))
    }
}

#[cfg(test)]
#[path = "sweeps_tests.rs"]
mod tests;
