// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rerun, hold, archive and purge tests

use super::*;
use crate::test_support::{chain, diamond, fixture};
use fw_core::{FwAction, FwQuery, LaunchId};
use similar_asserts::assert_eq;

#[test]
fn rerun_resets_target_and_advanced_descendants() {
    let fx = fixture();
    fx.submit(diamond());
    for id in [1, 2, 3] {
        fx.run(id);
    }
    assert_eq!(fx.state(4), FwState::Ready);

    let mut reset = fx.pad.rerun_fw(FwId(1)).unwrap();
    reset.sort();

    assert_eq!(reset, vec![FwId(1), FwId(2), FwId(3), FwId(4)]);
    assert_eq!(
        fx.states(&[1, 2, 3, 4]),
        vec![FwState::Ready, FwState::Waiting, FwState::Waiting, FwState::Waiting]
    );
}

#[test]
fn rerun_archives_launch_history() {
    let fx = fixture();
    fx.submit(chain(2));
    let first = fx.run(1);

    fx.pad.rerun_fw(FwId(1)).unwrap();

    let fw = fx.pad.get_fw_by_id(FwId(1)).unwrap();
    assert!(fw.launches.is_empty());
    assert_eq!(fw.archived_launches, vec![first]);
    assert!(fx.pad.get_launch_by_id(first).unwrap().archived);
    assert!(fx.pad.get_tracker_data(FwId(1)).unwrap().is_empty());
}

#[test]
fn rerun_is_idempotent() {
    let fx = fixture();
    fx.submit(diamond());
    fx.run(1);
    fx.run(2);

    fx.pad.rerun_fw(FwId(2)).unwrap();
    let once = fx.states(&[1, 2, 3, 4]);
    let again = fx.pad.rerun_fw(FwId(2)).unwrap();

    assert_eq!(again, vec![FwId(2)]);
    assert_eq!(fx.states(&[1, 2, 3, 4]), once);
    assert_eq!(once, vec![FwState::Completed, FwState::Ready, FwState::Ready, FwState::Waiting]);
}

#[test]
fn rerun_leaves_unadvanced_descendants_alone() {
    let fx = fixture();
    fx.submit(chain(3));
    fx.run(1);
    fx.pad.defuse_fw(FwId(3)).unwrap();

    fx.pad.rerun_fw(FwId(1)).unwrap();

    assert_eq!(fx.states(&[1, 2, 3]), vec![FwState::Ready, FwState::Waiting, FwState::Defused]);
}

#[test]
fn rerun_drops_reservation_of_a_defused_descendant() {
    let fx = fixture();
    fx.submit(chain(2));
    fx.run(1);
    let launch_id = fx.reserve(2);
    fx.pad.defuse_fw(FwId(2)).unwrap();

    fx.pad.rerun_fw(FwId(1)).unwrap();

    assert_eq!(fx.states(&[1, 2]), vec![FwState::Ready, FwState::Defused]);
    let fw = fx.pad.get_fw_by_id(FwId(2)).unwrap();
    assert!(fw.launches.is_empty());
    assert_eq!(fw.archived_launches, vec![launch_id]);
    assert!(fx.pad.get_launch_by_id(launch_id).unwrap().archived);

    assert!(fx.pad.reignite_fw(FwId(2)).unwrap());
    assert_eq!(fx.states(&[1, 2]), vec![FwState::Ready, FwState::Waiting]);
}

#[test]
fn rerun_forgets_readiness_of_a_paused_descendant() {
    let fx = fixture();
    fx.submit(chain(2));
    fx.run(1);
    fx.pad.pause_fw(FwId(2)).unwrap();

    fx.pad.rerun_fw(FwId(1)).unwrap();

    assert_eq!(fx.state(2), FwState::Paused);
    assert!(fx.pad.resume_fw(FwId(2)).unwrap());
    assert_eq!(fx.state(2), FwState::Waiting);
}

#[test]
fn rerun_clears_a_hold_on_the_target() {
    let fx = fixture();
    fx.submit(chain(1));
    fx.pad.pause_fw(FwId(1)).unwrap();

    fx.pad.rerun_fw(FwId(1)).unwrap();

    let fw = fx.pad.get_fw_by_id(FwId(1)).unwrap();
    assert_eq!(fw.state, FwState::Ready);
    assert_eq!(fw.held_from, None);
}

#[test]
fn defuse_blocks_claims_and_children() {
    let fx = fixture();
    fx.submit(chain(2));

    assert!(fx.pad.defuse_fw(FwId(1)).unwrap());
    assert!(!fx.pad.defuse_fw(FwId(1)).unwrap());

    assert!(fx
        .pad
        .claim_next_ready_fw(&crate::ClaimRequest::run())
        .unwrap()
        .is_none());
    assert_eq!(fx.pad.get_fw_by_id(FwId(1)).unwrap().held_from, Some(FwState::Ready));
}

#[test]
fn defuse_rejects_finished_fireworks() {
    let fx = fixture();
    fx.submit(chain(1));
    fx.run(1);

    let err = fx.pad.defuse_fw(FwId(1)).unwrap_err();

    assert!(matches!(
        err,
        LaunchPadError::InvalidTransition {
            state: FwState::Completed,
            action: "defuse",
            ..
        }
    ));
}

#[test]
fn reignite_restores_and_propagates() {
    let fx = fixture();
    fx.submit(chain(2));
    fx.pad.defuse_fw(FwId(1)).unwrap();

    assert!(fx.pad.reignite_fw(FwId(1)).unwrap());
    assert!(!fx.pad.reignite_fw(FwId(1)).unwrap());

    assert_eq!(fx.state(1), FwState::Ready);
    fx.run(1);
    assert_eq!(fx.state(2), FwState::Ready);
}

#[test]
fn defuse_wf_and_reignite_wf_round_trip() {
    let fx = fixture();
    fx.submit(diamond());
    fx.run(1);

    let mut defused = fx.pad.defuse_wf(FwId(4)).unwrap();
    defused.sort();
    assert_eq!(defused, vec![FwId(2), FwId(3), FwId(4)]);
    assert_eq!(fx.pad.get_wf_by_fw_id(FwId(1)).unwrap().state(), FwState::Defused);

    let mut reignited = fx.pad.reignite_wf(FwId(1)).unwrap();
    reignited.sort();
    assert_eq!(reignited, defused);
    assert_eq!(
        fx.states(&[1, 2, 3, 4]),
        vec![FwState::Completed, FwState::Ready, FwState::Ready, FwState::Waiting]
    );
}

#[test]
fn pause_applies_to_waiting_and_ready_only() {
    let fx = fixture();
    fx.submit(chain(2));
    fx.start(1);

    assert!(matches!(
        fx.pad.pause_fw(FwId(1)),
        Err(LaunchPadError::InvalidTransition { action: "pause", .. })
    ));
    assert!(fx.pad.pause_fw(FwId(2)).unwrap());
    assert!(fx.pad.resume_fw(FwId(2)).unwrap());
    assert!(!fx.pad.resume_fw(FwId(2)).unwrap());
    assert_eq!(fx.state(2), FwState::Waiting);
}

#[test]
fn paused_parent_blocks_children() {
    let fx = fixture();
    fx.submit(diamond());
    fx.run(1);
    fx.pad.pause_fw(FwId(2)).unwrap();
    fx.run(3);

    assert_eq!(fx.state(4), FwState::Waiting);
    fx.pad.resume_fw(FwId(2)).unwrap();
    fx.run(2);
    assert_eq!(fx.state(4), FwState::Ready);
}

#[test]
fn archive_wf_is_final() {
    let fx = fixture();
    fx.submit(diamond());
    fx.run(1);

    let archived = fx.pad.archive_wf(FwId(2)).unwrap();

    assert_eq!(archived.len(), 4);
    assert_eq!(fx.pad.get_wf_by_fw_id(FwId(1)).unwrap().state(), FwState::Archived);
    assert!(matches!(fx.pad.rerun_fw(FwId(1)), Err(LaunchPadError::Archived(FwId(1)))));
    assert!(matches!(fx.pad.reignite_fw(FwId(2)), Err(LaunchPadError::Archived(FwId(2)))));
    assert!(matches!(fx.pad.defuse_fw(FwId(3)), Err(LaunchPadError::Archived(FwId(3)))));
    assert!(matches!(fx.pad.reignite_wf(FwId(3)), Err(LaunchPadError::Archived(FwId(3)))));
    assert_eq!(fx.pad.count_fws(&FwQuery::new()).unwrap(), 0);
    assert_eq!(fx.pad.count_fws(&FwQuery::new().including_archived()).unwrap(), 4);
}

#[test]
fn archive_fw_cascades_to_descendants() {
    let fx = fixture();
    fx.submit(diamond());
    fx.run(1);

    let mut archived = fx.pad.archive_fw(FwId(2)).unwrap();
    archived.sort();

    assert_eq!(archived, vec![FwId(2), FwId(4)]);
    assert_eq!(fx.states(&[1, 3]), vec![FwState::Completed, FwState::Ready]);
    assert_eq!(fx.pad.get_wf_by_fw_id(FwId(1)).unwrap().fw_states.get(&FwId(4)), Some(&FwState::Archived));
}

#[test]
fn archived_fireworks_are_never_claimed() {
    let fx = fixture();
    fx.submit(chain(1));
    fx.pad.archive_wf(FwId(1)).unwrap();

    assert!(fx
        .pad
        .claim_next_ready_fw(&crate::ClaimRequest::run())
        .unwrap()
        .is_none());
}

#[test]
fn purge_removes_every_document() {
    let fx = fixture();
    let wf_id = fx.submit(chain(2));
    let first = fx.run(1);
    fx.pad.rerun_fw(FwId(1)).unwrap();
    let second = fx.start(1);

    assert_eq!(fx.pad.purge_wf(FwId(2)).unwrap(), wf_id);

    assert!(matches!(fx.pad.get_wf_by_id(wf_id), Err(LaunchPadError::WfNotFound(_))));
    assert!(matches!(fx.pad.get_fw_by_id(FwId(1)), Err(LaunchPadError::FwNotFound(_))));
    for launch_id in [first, second] {
        assert!(fx.store.get_launch(launch_id).unwrap().is_none());
    }
    assert!(fx.store.get_launch(LaunchId(99)).unwrap().is_none());
    assert_eq!(fx.pad.count_fws(&FwQuery::new().including_archived()).unwrap(), 0);
}

#[test]
fn purge_leaves_other_workflows_alone() {
    let fx = fixture();
    fx.submit(chain(1));
    let other = fx.submit(fw_core::WorkflowDraft::new("other").with_firework(crate::test_support::fw(5, "kept")));
    fx.finish(fx.start(5), FwAction::new());

    fx.pad.purge_wf(FwId(1)).unwrap();

    assert_eq!(fx.pad.get_wf_by_id(other).unwrap().state(), FwState::Completed);
}
