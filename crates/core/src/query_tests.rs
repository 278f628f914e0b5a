// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::{Clock, FakeClock};
use crate::firework::FwSpec;
use crate::ids::WfId;
use crate::workflow::{FailurePolicy, WorkflowDraft};
use serde_json::json;
use std::time::Duration;

fn fw(id: i64, name: &str, state: FwState, clock: &FakeClock) -> FireWork {
    let mut fw = FireWork::new(
        id,
        name,
        FwSpec::new().with("params", json!({"temperature": 300})),
        clock.now(),
    );
    fw.state = state;
    fw
}

#[test]
fn empty_query_matches_everything_but_archived() {
    let clock = FakeClock::new();
    let query = FwQuery::new();
    assert!(query.matches(&fw(1, "a", FwState::Ready, &clock)));
    assert!(!query.matches(&fw(2, "a", FwState::Archived, &clock)));
    assert!(query
        .clone()
        .including_archived()
        .matches(&fw(2, "a", FwState::Archived, &clock)));
}

#[test]
fn naming_archived_state_admits_archived() {
    let clock = FakeClock::new();
    let query = FwQuery::new().with_state(FwState::Archived);
    assert!(query.matches(&fw(1, "a", FwState::Archived, &clock)));
    assert!(!query.matches(&fw(2, "a", FwState::Ready, &clock)));
}

#[test]
fn fields_are_conjunctive() {
    let clock = FakeClock::new();
    let query = FwQuery::new()
        .with_name("relax")
        .with_state(FwState::Ready)
        .with_spec("/params/temperature", 300);

    assert!(query.matches(&fw(1, "relax", FwState::Ready, &clock)));
    assert!(!query.matches(&fw(1, "static", FwState::Ready, &clock)));
    assert!(!query.matches(&fw(1, "relax", FwState::Waiting, &clock)));
    assert!(!FwQuery::new()
        .with_spec("/params/temperature", 400)
        .matches(&fw(1, "relax", FwState::Ready, &clock)));
}

#[test]
fn id_filter_restricts_matches() {
    let clock = FakeClock::new();
    let query = FwQuery::ids([FwId(3), FwId(4)]);
    assert!(query.matches(&fw(3, "a", FwState::Waiting, &clock)));
    assert!(!query.matches(&fw(5, "a", FwState::Waiting, &clock)));
}

#[test]
fn sort_orders_by_key_then_id() {
    let clock = FakeClock::new();
    let t0 = clock.now();
    clock.advance(Duration::from_secs(10));
    let t1 = clock.now();

    let asc = Sort::ascending(SortKey::CreatedOn);
    assert_eq!(asc.compare((t0, t1, 2), (t1, t0, 1)), Ordering::Less);
    assert_eq!(asc.compare((t0, t0, 2), (t0, t0, 1)), Ordering::Greater);

    let desc = Sort::descending(SortKey::UpdatedOn);
    assert_eq!(desc.compare((t0, t1, 2), (t1, t0, 1)), Ordering::Less);
}

#[test]
fn limit_zero_is_unlimited() {
    assert_eq!(apply_limit(vec![1, 2, 3], 0), vec![1, 2, 3]);
    assert_eq!(apply_limit(vec![1, 2, 3], 2), vec![1, 2]);
}

#[test]
fn wf_query_matches_aggregate_state_and_members() {
    let clock = FakeClock::new();
    let mut wf = WorkflowDraft::new("wf")
        .with_firework(fw(1, "a", FwState::Completed, &clock))
        .with_firework(fw(2, "b", FwState::Ready, &clock))
        .with_link(1, 2)
        .to_workflow(WfId(1), FailurePolicy::Block, clock.now());

    assert!(WfQuery::new().with_state(FwState::Ready).matches(&wf));
    assert!(WfQuery::new().with_fw_ids([FwId(2)]).matches(&wf));
    assert!(!WfQuery::new().with_fw_ids([FwId(9)]).matches(&wf));
    assert!(!WfQuery::new().with_name("other").matches(&wf));

    wf.fw_states.values_mut().for_each(|s| *s = FwState::Archived);
    assert!(!WfQuery::new().matches(&wf));
    assert!(WfQuery::new().including_archived().matches(&wf));
}
