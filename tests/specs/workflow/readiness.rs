//! Workflow readiness specs
//!
//! Verify FireWorks become READY exactly when their parents allow it and
//! that the workflow state follows its members.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[test]
fn only_roots_are_ready_after_submission() {
    let pad = Pad::new();
    pad.submit(diamond());

    assert_eq!(
        pad.states(&[1, 2, 3, 4]),
        vec![FwState::Ready, FwState::Waiting, FwState::Waiting, FwState::Waiting]
    );
    assert_eq!(pad.wf_state(1), FwState::Ready);
}

#[test]
fn join_waits_for_every_parent() {
    let pad = Pad::new();
    pad.submit(diamond());

    pad.run(1);
    assert_eq!(pad.states(&[2, 3, 4]), vec![FwState::Ready, FwState::Ready, FwState::Waiting]);
    assert_eq!(pad.wf_state(1), FwState::Ready);

    pad.run(2);
    assert_eq!(pad.state(4), FwState::Waiting);

    pad.run(3);
    assert_eq!(pad.state(4), FwState::Ready);
}

#[test]
fn workflow_reports_its_most_advanced_member() {
    let pad = Pad::new();
    pad.submit(diamond());
    pad.run(1);

    pad.start(2);
    assert_eq!(pad.wf_state(1), FwState::Running);

    pad.lp.defuse_fw(FwId(3)).unwrap();
    assert_eq!(pad.wf_state(1), FwState::Defused);
}

#[test]
fn workflow_completes_when_every_member_completes() {
    let pad = Pad::new();
    pad.submit(diamond());
    for id in 1..=4 {
        pad.run(id);
    }

    assert_eq!(pad.wf_state(1), FwState::Completed);
}

#[test]
fn fizzled_parent_blocks_children() {
    let pad = Pad::new();
    pad.submit(chain(3));
    pad.fail(1);

    assert_eq!(pad.states(&[1, 2, 3]), vec![FwState::Fizzled, FwState::Waiting, FwState::Waiting]);
    assert_eq!(pad.wf_state(1), FwState::Fizzled);
}

#[test]
fn continue_past_failure_lets_children_run() {
    let pad = Pad::new();
    pad.submit(chain(2).with_failure_policy(fw_core::FailurePolicy::ContinuePastFailure));
    pad.fail(1);

    assert_eq!(pad.state(2), FwState::Ready);
}

#[test]
fn additions_extend_the_running_workflow() {
    let pad = Pad::new();
    pad.submit(chain(1));
    let launch_id = pad.start(1);

    let extra = WorkflowDraft::new("extra").with_firework(fw(-1, "cleanup"));
    pad.lp
        .complete_launch(launch_id, LaunchOutcome::Completed(FwAction::new().with_addition(extra)))
        .unwrap();

    let wf = pad.lp.get_wf_by_fw_id(FwId(1)).unwrap();
    assert_eq!(wf.nodes.len(), 2);
    let added = wf.links.get(&FwId(1)).unwrap()[0];
    assert_eq!(pad.lp.get_fw_by_id(added).unwrap().state, FwState::Ready);
    assert_eq!(pad.wf_state(1), FwState::Ready);
}

#[test]
fn cyclic_workflows_are_rejected() {
    let pad = Pad::new();
    let draft = chain(2).with_link(2, 1);

    let err = pad.lp.add_workflow(draft).unwrap_err();
    assert!(matches!(err, LaunchPadError::Workflow(_)));
}
