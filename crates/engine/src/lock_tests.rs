// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow lock tests

use super::*;
use crate::test_support::{chain, fixture, fixture_with, test_config};
use std::time::Duration;

#[test]
fn lock_is_recorded_and_released_on_drop() {
    let fx = fixture();
    let wf_id = fx.submit(chain(2));

    {
        let guard = fx.pad.lock_workflow(wf_id).unwrap();
        let wf = fx.pad.get_wf_by_id(wf_id).unwrap();
        assert_eq!(wf.lock.map(|l| l.holder), Some(guard.holder().to_string()));
    }

    assert!(fx.pad.get_wf_by_id(wf_id).unwrap().lock.is_none());
}

#[test]
fn second_locker_times_out_while_held() {
    let fx = fixture_with(test_config());
    let wf_id = fx.submit(chain(1));
    let guard = fx.pad.lock_workflow(wf_id).unwrap();

    let err = fx.pad.lock_workflow(wf_id).err().unwrap();

    match err {
        LaunchPadError::LockTimeout { wf_id: locked, holder } => {
            assert_eq!(locked, wf_id);
            assert_eq!(holder, guard.holder());
        }
        other => panic!("expected lock timeout, got {other:?}"),
    }
}

#[test]
fn stale_lock_is_reclaimed() {
    let fx = fixture_with(test_config().with_lock_expiration(Duration::from_secs(60)));
    let wf_id = fx.submit(chain(1));
    let stale = fx.pad.lock_workflow(wf_id).unwrap();
    let stale_holder = stale.holder().to_string();
    std::mem::forget(stale);

    fx.clock.advance(Duration::from_secs(61));
    let fresh = fx.pad.lock_workflow(wf_id).unwrap();

    assert_ne!(fresh.holder(), stale_holder);
}

#[test]
fn reclaimed_lock_is_not_released_by_previous_holder() {
    let fx = fixture_with(test_config().with_lock_expiration(Duration::from_secs(60)));
    let wf_id = fx.submit(chain(1));
    let first = fx.pad.lock_workflow(wf_id).unwrap();

    fx.clock.advance(Duration::from_secs(61));
    let second = fx.pad.lock_workflow(wf_id).unwrap();
    let second_holder = second.holder().to_string();
    drop(first);

    let wf = fx.pad.get_wf_by_id(wf_id).unwrap();
    assert_eq!(wf.lock.map(|l| l.holder), Some(second_holder));
    drop(second);
}

#[test]
fn locking_a_missing_workflow_fails() {
    let fx = fixture();
    assert!(matches!(
        fx.pad.lock_workflow(WfId(7)),
        Err(LaunchPadError::WfNotFound(WfId(7)))
    ));
}

#[test]
fn operations_wait_for_a_held_lock() {
    let fx = fixture_with(test_config());
    let wf_id = fx.submit(chain(2));
    let guard = fx.pad.lock_workflow(wf_id).unwrap();

    let err = fx.pad.rerun_fw(fw_core::FwId(1)).unwrap_err();
    assert!(matches!(err, LaunchPadError::LockTimeout { .. }));

    drop(guard);
    assert!(fx.pad.rerun_fw(fw_core::FwId(1)).is_ok());
}
