//! Claim specs
//!
//! Verify workers receive READY FireWorks in priority order and never the
//! same one twice.

use crate::prelude::*;
use std::collections::BTreeSet;
use std::sync::Mutex;

fn prioritized(id: i64, priority: Option<i64>) -> FireWork {
    let spec = match priority {
        Some(p) => FwSpec::new().with_priority(p),
        None => FwSpec::new(),
    };
    FireWork::new(id, format!("job-{id}"), spec, FakeClock::new().now())
}

#[test]
fn highest_priority_is_claimed_first() {
    let pad = Pad::new();
    pad.submit(
        WorkflowDraft::new("batch")
            .with_firework(prioritized(1, None))
            .with_firework(prioritized(2, Some(1)))
            .with_firework(prioritized(3, Some(10)))
            .with_firework(prioritized(4, Some(10))),
    );

    let order: Vec<FwId> = std::iter::from_fn(|| {
        pad.lp
            .claim_next_ready_fw(&ClaimRequest::reserve())
            .unwrap()
            .map(|claim| claim.fw_id())
    })
    .collect();

    assert_eq!(order, vec![FwId(3), FwId(4), FwId(2), FwId(1)]);
}

#[test]
fn nothing_to_claim_when_no_fw_is_ready() {
    let pad = Pad::new();
    pad.submit(chain(2));
    pad.start(1);

    assert!(pad.lp.claim_next_ready_fw(&ClaimRequest::run()).unwrap().is_none());
}

#[test]
fn waiting_fireworks_cannot_be_checked_out() {
    let pad = Pad::new();
    pad.submit(chain(2));

    assert!(pad.lp.checkout_fw(FwId(2), &ClaimRequest::run()).unwrap().is_none());
}

#[test]
fn concurrent_workers_never_share_a_firework() {
    let pad = Pad::new();
    let mut batch = WorkflowDraft::new("batch");
    for id in 1..=30 {
        batch = batch.with_firework(fw(id, "job"));
    }
    pad.submit(batch);

    let claimed = Mutex::new(Vec::new());
    std::thread::scope(|s| {
        for _ in 0..6 {
            s.spawn(|| {
                while let Some(claim) = pad.lp.claim_next_ready_fw(&ClaimRequest::run()).unwrap() {
                    claimed.lock().unwrap().push(claim.fw_id());
                }
            });
        }
    });

    let claimed = claimed.into_inner().unwrap();
    let unique: BTreeSet<FwId> = claimed.iter().copied().collect();
    assert_eq!(claimed.len(), 30);
    assert_eq!(unique.len(), 30);
    assert!(pad.states(&(1..=30).collect::<Vec<_>>()).iter().all(|s| *s == FwState::Running));
}

#[test]
fn reserved_launch_moves_to_running_when_started() {
    let pad = Pad::new();
    pad.submit(chain(1));
    let launch_id = pad.reserve(1);
    assert_eq!(pad.state(1), FwState::Reserved);

    assert!(pad.lp.mark_running(launch_id).unwrap());
    assert_eq!(pad.state(1), FwState::Running);
    assert_eq!(pad.lp.get_launch_by_id(launch_id).unwrap().state, LaunchState::Running);
}
