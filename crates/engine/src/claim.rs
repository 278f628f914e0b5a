// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Priority-ordered claims
//!
//! A claim is a conditional update on the FireWork that re-checks
//! `state == READY`, so at most one caller moves a FireWork out of READY.
//! Losers move on to the next candidate and, once the candidate list is
//! exhausted, reselect from a fresh read.

use crate::error::Result;
use crate::launchpad::LaunchPad;
use fw_core::{
    Clock, FireWork, FwId, FwQuery, FwState, Launch, LaunchContext, LaunchId, LaunchState,
    OfflineRun,
};
use fw_storage::{Counter, EntityStore};
use std::cmp::Reverse;

/// State a claimed FireWork moves to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClaimMode {
    /// Reserve a queue slot; the launch starts later via `mark_running`
    Reserve,
    /// Start executing immediately
    #[default]
    Run,
}

impl ClaimMode {
    fn launch_state(self) -> LaunchState {
        match self {
            ClaimMode::Reserve => LaunchState::Reserved,
            ClaimMode::Run => LaunchState::Running,
        }
    }
}

/// What a worker asks for
#[derive(Debug, Clone, Default)]
pub struct ClaimRequest {
    pub mode: ClaimMode,
    /// Restricts candidates beyond READY
    pub query: FwQuery,
    pub context: LaunchContext,
    pub reservation_id: Option<String>,
}

impl ClaimRequest {
    pub fn run() -> Self {
        Self::default()
    }

    pub fn reserve() -> Self {
        Self {
            mode: ClaimMode::Reserve,
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: FwQuery) -> Self {
        self.query = query;
        self
    }

    pub fn with_context(mut self, context: LaunchContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_reservation_id(mut self, reservation_id: impl Into<String>) -> Self {
        self.reservation_id = Some(reservation_id.into());
        self
    }
}

/// A won claim: the FireWork as claimed and its new launch
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    pub fw: FireWork,
    pub launch: Launch,
}

impl Claim {
    pub fn fw_id(&self) -> FwId {
        self.fw.fw_id
    }

    pub fn launch_id(&self) -> LaunchId {
        self.launch.launch_id
    }
}

/// Highest priority first (unset sorts lowest), then lowest id
fn claim_order(fw: &FireWork) -> (Reverse<Option<i64>>, FwId) {
    (Reverse(fw.priority()), fw.fw_id)
}

impl<S: EntityStore, C: Clock> LaunchPad<S, C> {
    /// READY FireWorks matching `query`, in claim order
    pub(crate) fn claim_candidates(&self, query: &FwQuery) -> Result<Vec<FireWork>> {
        let mut candidates = Vec::new();
        for fw_id in self.store.fw_ids_in_state(FwState::Ready)? {
            if let Some(fw) = self.store.get_fw(fw_id)? {
                if fw.state == FwState::Ready && query.matches(&fw) {
                    candidates.push(fw);
                }
            }
        }
        candidates.sort_by_key(claim_order);
        Ok(candidates)
    }

    /// Claim the best READY FireWork, or `None` if nothing qualifies
    pub fn claim_next_ready_fw(&self, request: &ClaimRequest) -> Result<Option<Claim>> {
        let span = tracing::info_span!("launchpad.claim", mode = ?request.mode);
        let _guard = span.enter();

        for round in 0..=self.config.claim_retries {
            let candidates = self.claim_candidates(&request.query)?;
            if candidates.is_empty() {
                tracing::debug!(round, "no ready fireworks");
                return Ok(None);
            }
            for candidate in candidates {
                if let Some(claim) = self.try_claim(candidate.fw_id, request)? {
                    return Ok(Some(claim));
                }
                tracing::debug!(fw_id = %candidate.fw_id, "lost claim race");
            }
        }
        tracing::warn!(retries = self.config.claim_retries, "claim retries exhausted");
        Ok(None)
    }

    /// Claim a specific FireWork; `None` if it is not READY
    pub fn checkout_fw(&self, fw_id: FwId, request: &ClaimRequest) -> Result<Option<Claim>> {
        let span = tracing::info_span!("launchpad.checkout", fw_id = %fw_id);
        let _guard = span.enter();

        let fw = self.get_fw_by_id(fw_id)?;
        if fw.state != FwState::Ready {
            tracing::debug!(state = %fw.state, "not ready");
            return Ok(None);
        }
        self.try_claim(fw_id, request)
    }

    /// One conditional claim attempt
    ///
    /// The launch documents are written before the FireWork points at them
    /// and removed again if the claim is lost.
    fn try_claim(&self, fw_id: FwId, request: &ClaimRequest) -> Result<Option<Claim>> {
        let launch_id = LaunchId(self.store.next_id(Counter::LaunchId)?);
        let launch_state = request.mode.launch_state();
        let now = self.now();

        let mut launch = Launch::new(launch_id, fw_id, launch_state, request.context.clone(), now);
        launch.reservation_id = request.reservation_id.clone();

        let claimed = self
            .record_launch(&launch)
            .and_then(|()| self.claim_fw(fw_id, launch_id, launch_state.fw_state()));
        let fw = match claimed {
            Ok(Some(fw)) => fw,
            Ok(None) => {
                self.discard_launch(launch_id)?;
                return Ok(None);
            }
            Err(e) => {
                if let Err(cleanup) = self.discard_launch(launch_id) {
                    tracing::warn!(launch_id = %launch_id, error = %cleanup, "orphaned launch left behind");
                }
                return Err(e);
            }
        };

        self.refresh_from_fw(fw_id)?;

        tracing::info!(
            fw_id = %fw_id,
            launch_id = %launch_id,
            state = %launch_state,
            priority = ?fw.priority(),
            "claimed"
        );
        Ok(Some(Claim { fw, launch }))
    }

    fn record_launch(&self, launch: &Launch) -> Result<()> {
        self.store.insert_launch(launch.clone())?;
        if launch.context.offline {
            self.store
                .put_offline_run(OfflineRun::new(launch.launch_id, launch.fw_id, launch.created_on))?;
        }
        Ok(())
    }

    /// Move a READY FireWork onto `launch_id`; `None` if it is no longer READY
    fn claim_fw(&self, fw_id: FwId, launch_id: LaunchId, state: FwState) -> Result<Option<FireWork>> {
        let now = self.now();
        let claimed = self.store.update_fw(fw_id, &mut |fw| {
            if fw.state != FwState::Ready {
                return false;
            }
            fw.set_state(state, now);
            fw.launches.push(launch_id);
            true
        })?;
        Ok(claimed.applied())
    }

    fn discard_launch(&self, launch_id: LaunchId) -> Result<()> {
        self.store.delete_offline_run(launch_id)?;
        self.store.delete_launch(launch_id)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "claim_tests.rs"]
mod tests;
