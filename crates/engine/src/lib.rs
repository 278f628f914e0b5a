// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! FireWorks LaunchPad: claims, propagation and maintenance over a shared store

mod claim;
mod error;
mod launchpad;
mod lifecycle;
mod lock;
mod maintenance;
mod mutations;
mod offline;
mod refresh;
mod selector;
mod sweeps;

#[cfg(test)]
mod test_support;

pub use claim::{Claim, ClaimMode, ClaimRequest};
pub use error::{LaunchPadError, Result};
pub use launchpad::{LaunchPad, Submitted, TrackerData, WorkflowSummary};
pub use lifecycle::{Completion, LaunchOutcome};
pub use lock::WorkflowLock;
pub use maintenance::{MaintenanceConfig, MaintenanceReport, TuneupReport};
pub use offline::{InMemoryRecords, LaunchDirReader, OfflineRecordReader, Recovery, RecoveryReport};
pub use selector::{Confirmation, Selector};
pub use sweeps::LostRuns;
