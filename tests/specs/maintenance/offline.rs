//! Offline recovery specs
//!
//! Verify launches that report through files are reconciled, and that bad
//! records are reported by FireWork id instead of aborting the sweep.

use crate::prelude::*;
use fw_engine::{InMemoryRecords, Recovery};

fn start_offline(pad: &Pad, fw_id: i64) -> LaunchId {
    pad.claim(fw_id, &ClaimRequest::reserve().with_context(LaunchContext::new().offline()))
}

fn finished(pad: &Pad, launch_id: LaunchId) -> OfflineRecord {
    let now = pad.clock.now();
    OfflineRecord {
        launch_id,
        state: LaunchState::Completed,
        started_on: Some(now),
        pinged_on: Some(now),
        completed_on: Some(now),
        action: None,
    }
}

#[test]
fn finished_record_completes_the_firework() {
    let pad = Pad::new();
    pad.submit(chain(2));
    let launch_id = start_offline(&pad, 1);
    let records = InMemoryRecords::new();
    records.put(&finished(&pad, launch_id));

    let recovery = pad.lp.recover_offline(launch_id, false, &records).unwrap();

    assert!(matches!(recovery, Recovery::Finished { fw_id: FwId(1), .. }));
    assert_eq!(pad.states(&[1, 2]), vec![FwState::Completed, FwState::Ready]);
}

#[test]
fn ignore_errors_reports_the_bad_firework() {
    let pad = Pad::new();
    pad.submit(
        WorkflowDraft::new("offline")
            .with_firework(fw(1, "garbled"))
            .with_firework(fw(2, "done")),
    );
    let garbled = start_offline(&pad, 1);
    let done = start_offline(&pad, 2);
    let records = InMemoryRecords::new();
    records.put_raw(garbled, "{ not json");
    records.put(&finished(&pad, done));

    let report = pad.lp.recover_all_offline(true, &records).unwrap();

    assert_eq!(report.failed, vec![FwId(1)]);
    assert_eq!(report.recovered, vec![FwId(2)]);
    assert_eq!(pad.states(&[1, 2]), vec![FwState::Reserved, FwState::Completed]);
}

#[test]
fn bad_record_is_an_error_without_ignore_errors() {
    let pad = Pad::new();
    pad.submit(chain(1));
    let launch_id = start_offline(&pad, 1);
    let records = InMemoryRecords::new();
    records.put_raw(launch_id, "{ not json");

    let err = pad.lp.recover_offline(launch_id, false, &records).unwrap_err();

    assert!(matches!(err, LaunchPadError::Offline(_)));
}

#[test]
fn forgotten_runs_are_not_recovered() {
    let pad = Pad::new();
    pad.submit(chain(1));
    let launch_id = start_offline(&pad, 1);

    assert_eq!(pad.lp.forget_offline(FwId(1)).unwrap(), 1);
    let recovery = pad.lp.recover_offline(launch_id, false, &InMemoryRecords::new()).unwrap();

    assert_eq!(recovery, Recovery::Skipped);
}
