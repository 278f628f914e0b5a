// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fw-core: data model and pure algorithms for the FireWorks engine
//!
//! This crate provides:
//! - FireWork, Launch and Workflow documents
//! - DAG validation and the readiness refresh algorithm
//! - Query filters, offline-run records and configuration

pub mod action;
pub mod clock;
pub mod config;
pub mod dag;
pub mod error;
pub mod firework;
pub mod ids;
pub mod launch;
pub mod offline;
pub mod query;
pub mod refresh;
pub mod state;
pub mod workflow;

pub use action::FwAction;
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, LaunchPadConfig};
pub use dag::{Dag, Links};
pub use error::WorkflowError;
pub use firework::{FireWork, FwSpec};
pub use ids::{FwId, LaunchId, WfId};
pub use launch::{Launch, LaunchContext, StateHistoryEntry, Tracker};
pub use offline::{OfflineRecord, OfflineRecordError, OfflineRun, OFFLINE_RECORD_FILE};
pub use query::{FwQuery, Sort, SortKey, SortOrder, WfQuery};
pub use refresh::{StateChange, StateMap};
pub use state::{FwState, LaunchState, UnknownState};
pub use workflow::{aggregate_state, FailurePolicy, LockRecord, Workflow, WorkflowDraft};
