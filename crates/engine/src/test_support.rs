// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine unit tests

use crate::{ClaimRequest, LaunchOutcome, LaunchPad};
use fw_core::{
    Clock, FakeClock, FireWork, FwAction, FwId, FwSpec, FwState, LaunchId, LaunchPadConfig,
    WfId, WorkflowDraft,
};
use fw_storage::DocumentStore;
use std::time::Duration;

pub(crate) type TestPad = LaunchPad<DocumentStore, FakeClock>;

pub(crate) struct Fixture {
    pub pad: TestPad,
    pub clock: FakeClock,
    pub store: DocumentStore,
}

/// Defaults with a short lock timeout so contention tests fail fast
pub(crate) fn test_config() -> LaunchPadConfig {
    LaunchPadConfig::default().with_lock_timeout(Duration::from_millis(200))
}

pub(crate) fn fixture() -> Fixture {
    fixture_with(test_config())
}

pub(crate) fn fixture_with(config: LaunchPadConfig) -> Fixture {
    let clock = FakeClock::new();
    let store = DocumentStore::in_memory();
    let pad = LaunchPad::new(store.clone(), clock.clone(), config);
    Fixture { pad, clock, store }
}

pub(crate) fn fw(id: i64, name: &str) -> FireWork {
    FireWork::new(id, name, FwSpec::new(), FakeClock::new().now())
}

/// A -> B, A -> C, B -> D, C -> D with ids 1..=4
pub(crate) fn diamond() -> WorkflowDraft {
    WorkflowDraft::new("diamond")
        .with_firework(fw(1, "A"))
        .with_firework(fw(2, "B"))
        .with_firework(fw(3, "C"))
        .with_firework(fw(4, "D"))
        .with_link(1, 2)
        .with_link(1, 3)
        .with_link(2, 4)
        .with_link(3, 4)
}

/// 1 -> 2 -> ... -> n
pub(crate) fn chain(n: i64) -> WorkflowDraft {
    WorkflowDraft::linear("chain", (1..=n).map(|id| fw(id, &format!("step-{id}"))).collect())
}

impl Fixture {
    /// Submit keeping the draft's ids
    pub fn submit(&self, draft: WorkflowDraft) -> WfId {
        self.pad.add_workflow_keep_ids(draft).unwrap().wf_id
    }

    pub fn state(&self, fw_id: i64) -> FwState {
        self.pad.get_fw_by_id(FwId(fw_id)).unwrap().state
    }

    pub fn states(&self, ids: &[i64]) -> Vec<FwState> {
        ids.iter().map(|id| self.state(*id)).collect()
    }

    /// Claim a specific FireWork in run mode
    pub fn start(&self, fw_id: i64) -> LaunchId {
        self.pad
            .checkout_fw(FwId(fw_id), &ClaimRequest::run())
            .unwrap()
            .unwrap_or_else(|| panic!("fw-{fw_id} was not claimable"))
            .launch_id()
    }

    /// Claim a specific FireWork in reserve mode
    pub fn reserve(&self, fw_id: i64) -> LaunchId {
        self.pad
            .checkout_fw(FwId(fw_id), &ClaimRequest::reserve())
            .unwrap()
            .unwrap_or_else(|| panic!("fw-{fw_id} was not claimable"))
            .launch_id()
    }

    pub fn finish(&self, launch_id: LaunchId, action: FwAction) {
        self.pad
            .complete_launch(launch_id, LaunchOutcome::Completed(action))
            .unwrap();
    }

    /// Claim and complete in one step
    pub fn run(&self, fw_id: i64) -> LaunchId {
        let launch_id = self.start(fw_id);
        self.finish(launch_id, FwAction::new());
        launch_id
    }

    pub fn fail(&self, fw_id: i64) -> LaunchId {
        let launch_id = self.start(fw_id);
        self.pad
            .complete_launch(launch_id, LaunchOutcome::Fizzled(None))
            .unwrap();
        launch_id
    }
}
