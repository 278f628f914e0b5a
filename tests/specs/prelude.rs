//! Test helpers for behavioral specifications.

#![allow(dead_code)]

pub use fw_core::{
    Clock, FakeClock, FireWork, FwAction, FwId, FwSpec, FwState, LaunchContext, LaunchId,
    LaunchPadConfig, LaunchState, OfflineRecord, WorkflowDraft,
};
pub use fw_engine::{ClaimRequest, LaunchOutcome, LaunchPad, LaunchPadError};
pub use fw_storage::DocumentStore;
pub use std::time::Duration;

/// An in-memory LaunchPad on a controllable clock
pub struct Pad {
    pub lp: LaunchPad<DocumentStore, FakeClock>,
    pub clock: FakeClock,
}

impl Pad {
    pub fn new() -> Self {
        Self::with_config(LaunchPadConfig::default())
    }

    pub fn with_config(config: LaunchPadConfig) -> Self {
        let clock = FakeClock::new();
        let lp = LaunchPad::new(DocumentStore::in_memory(), clock.clone(), config);
        Self { lp, clock }
    }

    /// Submit keeping the draft's ids
    pub fn submit(&self, draft: WorkflowDraft) -> &Self {
        self.lp.add_workflow_keep_ids(draft).unwrap();
        self
    }

    pub fn state(&self, fw_id: i64) -> FwState {
        self.lp.get_fw_by_id(FwId(fw_id)).unwrap().state
    }

    pub fn states(&self, ids: &[i64]) -> Vec<FwState> {
        ids.iter().map(|id| self.state(*id)).collect()
    }

    pub fn wf_state(&self, fw_id: i64) -> FwState {
        self.lp.get_wf_by_fw_id(FwId(fw_id)).unwrap().state()
    }

    pub fn claim(&self, fw_id: i64, request: &ClaimRequest) -> LaunchId {
        self.lp
            .checkout_fw(FwId(fw_id), request)
            .unwrap()
            .unwrap_or_else(|| panic!("fw-{fw_id} was not claimable"))
            .launch_id()
    }

    pub fn start(&self, fw_id: i64) -> LaunchId {
        self.claim(fw_id, &ClaimRequest::run())
    }

    pub fn reserve(&self, fw_id: i64) -> LaunchId {
        self.claim(fw_id, &ClaimRequest::reserve())
    }

    pub fn run(&self, fw_id: i64) -> LaunchId {
        let launch_id = self.start(fw_id);
        self.lp
            .complete_launch(launch_id, LaunchOutcome::Completed(FwAction::new()))
            .unwrap();
        launch_id
    }

    pub fn fail(&self, fw_id: i64) -> LaunchId {
        let launch_id = self.start(fw_id);
        self.lp
            .complete_launch(launch_id, LaunchOutcome::Fizzled(None))
            .unwrap();
        launch_id
    }
}

pub fn fw(id: i64, name: &str) -> FireWork {
    FireWork::new(id, name, FwSpec::new(), FakeClock::new().now())
}

/// A -> B, A -> C, B -> D, C -> D with ids 1..=4
pub fn diamond() -> WorkflowDraft {
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
pub fn chain(n: i64) -> WorkflowDraft {
    WorkflowDraft::linear("chain", (1..=n).map(|id| fw(id, &format!("step-{id}"))).collect())
}
