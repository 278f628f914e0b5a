// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fw-storage: document store for FireWorks, Launches and Workflows
//!
//! The engine talks to storage only through [`EntityStore`]. The in-tree
//! [`DocumentStore`] keeps documents in memory and, when opened on a path,
//! journals every write to a JSONL write-ahead log.

mod memory;
mod op;
mod state;
mod store;
mod wal;

pub use memory::DocumentStore;
pub use op::DocumentOp;
pub use state::Documents;
pub use store::{Counter, EntityStore, Mutator, StoreError, StoreResult, Update};
pub use wal::{Wal, WalError};
