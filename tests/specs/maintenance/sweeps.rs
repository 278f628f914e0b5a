//! Maintenance sweep specs
//!
//! Verify stale reservations and lost runs are found and recycled.

use crate::prelude::*;
use fw_engine::MaintenanceConfig;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

#[test]
fn stale_reservation_returns_to_ready() {
    let pad = Pad::new();
    pad.submit(chain(1));
    let launch_id = pad.reserve(1);

    pad.clock.advance(2 * MINUTE);
    let found = pad.lp.detect_unreserved(MINUTE, true).unwrap();

    assert_eq!(found, vec![FwId(1)]);
    assert_eq!(pad.state(1), FwState::Ready);
    assert!(pad.lp.get_launch_by_id(launch_id).unwrap().archived);
}

#[test]
fn fresh_reservation_is_kept() {
    let pad = Pad::new();
    pad.submit(chain(1));
    pad.reserve(1);

    pad.clock.advance(30 * Duration::from_secs(1));

    assert!(pad.lp.detect_unreserved(MINUTE, true).unwrap().is_empty());
    assert_eq!(pad.state(1), FwState::Reserved);
}

#[test]
fn silent_run_is_reported_without_changes() {
    let pad = Pad::new();
    pad.submit(chain(1));
    let launch_id = pad.start(1);

    pad.clock.advance(2 * HOUR);
    let lost = pad.lp.detect_lostruns(HOUR, false, false, None).unwrap();

    assert_eq!(lost.launch_ids, vec![launch_id]);
    assert_eq!(lost.fw_ids, vec![FwId(1)]);
    assert_eq!(pad.state(1), FwState::Running);
}

#[test]
fn heartbeat_keeps_a_run_alive() {
    let pad = Pad::new();
    pad.submit(chain(1));
    let launch_id = pad.start(1);

    pad.clock.advance(50 * MINUTE);
    pad.lp.ping_launch(launch_id).unwrap();
    pad.clock.advance(50 * MINUTE);

    assert!(pad.lp.detect_lostruns(HOUR, true, true, None).unwrap().is_empty());
    assert_eq!(pad.state(1), FwState::Running);
}

#[test]
fn lost_run_is_fizzled_and_rerun() {
    let pad = Pad::new();
    pad.submit(chain(2));
    let launch_id = pad.start(1);

    pad.clock.advance(2 * HOUR);
    pad.lp.detect_lostruns(HOUR, true, true, None).unwrap();

    let launch = pad.lp.get_launch_by_id(launch_id).unwrap();
    assert_eq!(launch.state, LaunchState::Fizzled);
    assert_eq!(pad.states(&[1, 2]), vec![FwState::Ready, FwState::Waiting]);
}

#[test]
fn max_runtime_catches_runs_that_still_ping() {
    let pad = Pad::new();
    pad.submit(chain(1));
    let launch_id = pad.start(1);

    pad.clock.advance(3 * HOUR);
    pad.lp.ping_launch(launch_id).unwrap();

    assert!(pad.lp.detect_lostruns(HOUR, false, false, None).unwrap().is_empty());
    let lost = pad.lp.detect_lostruns(HOUR, false, false, Some(2 * HOUR)).unwrap();
    assert_eq!(lost.fw_ids, vec![FwId(1)]);
}

#[test]
fn maintenance_pass_recycles_both_kinds() {
    let pad = Pad::new();
    pad.submit(
        WorkflowDraft::new("pair")
            .with_firework(fw(1, "reserved"))
            .with_firework(fw(2, "running")),
    );
    pad.reserve(1);
    pad.start(2);

    let config = MaintenanceConfig::default()
        .with_reservation_expiration(MINUTE)
        .with_run_expiration(HOUR);
    pad.clock.advance(2 * HOUR);
    let report = pad.lp.maintain_once(&config).unwrap();

    assert_eq!(report.unreserved, vec![FwId(1)]);
    assert_eq!(report.lost.fw_ids, vec![FwId(2)]);
    assert_eq!(pad.states(&[1, 2]), vec![FwState::Ready, FwState::Ready]);
    assert!(pad.lp.maintain_once(&config).unwrap().is_clean());
}

#[tokio::test(flavor = "multi_thread")]
async fn maintain_loop_runs_until_shutdown() {
    let pad = Pad::new();
    pad.submit(chain(1));
    pad.reserve(1);
    pad.clock.advance(2 * MINUTE);

    let config = MaintenanceConfig::default()
        .with_reservation_expiration(MINUTE)
        .with_interval(Duration::from_millis(5));
    let shutdown = tokio::time::sleep(Duration::from_millis(50));
    let passes = pad.lp.maintain(true, &config, shutdown).await.unwrap();

    assert!(passes >= 1);
    assert_eq!(pad.state(1), FwState::Ready);
}
