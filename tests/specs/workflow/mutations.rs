//! Workflow mutation specs
//!
//! Verify rerun, defuse, pause and archive move FireWorks between states
//! and that archived work stays frozen.

use crate::prelude::*;

#[test]
fn rerun_resets_the_target_and_its_descendants() {
    let pad = Pad::new();
    pad.submit(chain(3));
    for id in 1..=3 {
        pad.run(id);
    }
    assert_eq!(pad.wf_state(1), FwState::Completed);

    let mut reset = pad.lp.rerun_fw(FwId(1)).unwrap();
    reset.sort();

    assert_eq!(reset, vec![FwId(1), FwId(2), FwId(3)]);
    assert_eq!(pad.states(&[1, 2, 3]), vec![FwState::Ready, FwState::Waiting, FwState::Waiting]);
    assert_eq!(pad.wf_state(1), FwState::Ready);
}

#[test]
fn rerun_twice_leaves_the_same_states() {
    let pad = Pad::new();
    pad.submit(diamond());
    for id in 1..=4 {
        pad.run(id);
    }

    pad.lp.rerun_fw(FwId(2)).unwrap();
    let first = pad.states(&[1, 2, 3, 4]);
    pad.lp.rerun_fw(FwId(2)).unwrap();

    assert_eq!(first, vec![FwState::Completed, FwState::Ready, FwState::Completed, FwState::Waiting]);
    assert_eq!(pad.states(&[1, 2, 3, 4]), first);
}

#[test]
fn rerun_archives_superseded_launches() {
    let pad = Pad::new();
    pad.submit(chain(1));
    let launch_id = pad.run(1);

    pad.lp.rerun_fw(FwId(1)).unwrap();

    assert!(pad.lp.get_launch_by_id(launch_id).unwrap().archived);
    let relaunch = pad.run(1);
    assert_ne!(relaunch, launch_id);
    assert_eq!(pad.state(1), FwState::Completed);
}

#[test]
fn defuse_holds_until_reignited() {
    let pad = Pad::new();
    pad.submit(chain(2));

    assert!(pad.lp.defuse_fw(FwId(1)).unwrap());
    assert!(!pad.lp.defuse_fw(FwId(1)).unwrap());
    assert!(pad.lp.claim_next_ready_fw(&ClaimRequest::run()).unwrap().is_none());

    assert!(pad.lp.reignite_fw(FwId(1)).unwrap());
    assert_eq!(pad.state(1), FwState::Ready);
}

#[test]
fn pause_is_rejected_for_running_fireworks() {
    let pad = Pad::new();
    pad.submit(chain(1));
    pad.start(1);

    let err = pad.lp.pause_fw(FwId(1)).unwrap_err();
    assert!(matches!(err, LaunchPadError::InvalidTransition { .. }));
}

#[test]
fn pause_and_resume_restore_readiness() {
    let pad = Pad::new();
    pad.submit(chain(2));

    assert!(pad.lp.pause_fw(FwId(1)).unwrap());
    assert_eq!(pad.wf_state(1), FwState::Paused);

    assert!(pad.lp.resume_fw(FwId(1)).unwrap());
    assert_eq!(pad.states(&[1, 2]), vec![FwState::Ready, FwState::Waiting]);
}

#[test]
fn archive_freezes_the_whole_workflow() {
    let pad = Pad::new();
    pad.submit(diamond());
    pad.run(1);

    let archived = pad.lp.archive_wf(FwId(2)).unwrap();

    assert_eq!(archived.len(), 4);
    assert_eq!(pad.states(&[1, 2, 3, 4]), vec![FwState::Archived; 4]);
    assert_eq!(pad.wf_state(1), FwState::Archived);
    assert!(pad.lp.claim_next_ready_fw(&ClaimRequest::run()).unwrap().is_none());

    assert!(matches!(pad.lp.rerun_fw(FwId(1)), Err(LaunchPadError::Archived(_))));
    assert!(matches!(pad.lp.reignite_fw(FwId(3)), Err(LaunchPadError::Archived(_))));
    assert!(matches!(pad.lp.defuse_fw(FwId(4)), Err(LaunchPadError::Archived(_))));
}

#[test]
fn purge_removes_every_trace() {
    let pad = Pad::new();
    pad.submit(chain(2));
    let launch_id = pad.run(1);

    let wf_id = pad.lp.purge_wf(FwId(1)).unwrap();

    assert!(matches!(pad.lp.get_wf_by_id(wf_id), Err(LaunchPadError::WfNotFound(_))));
    assert!(matches!(pad.lp.get_fw_by_id(FwId(2)), Err(LaunchPadError::FwNotFound(_))));
    assert!(matches!(
        pad.lp.get_launch_by_id(launch_id),
        Err(LaunchPadError::LaunchNotFound(_))
    ));
}
