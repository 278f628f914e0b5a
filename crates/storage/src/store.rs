// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage capability the engine is written against

use crate::wal::WalError;
use fw_core::{FireWork, FwId, FwState, Launch, LaunchId, OfflineRun, WfId, Workflow};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the entity store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable")]
    Unavailable,
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Monotonic id sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Counter {
    FwId,
    LaunchId,
    WfId,
}

/// Outcome of a conditional update
#[derive(Debug, Clone, PartialEq)]
pub enum Update<T> {
    /// The closure accepted the document; carries the stored result
    Applied(T),
    /// The closure declined; carries the document as it was
    Unchanged(T),
    NotFound,
}

impl<T> Update<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Update::Applied(_))
    }

    /// The stored document if the update went through
    pub fn applied(self) -> Option<T> {
        match self {
            Update::Applied(doc) => Some(doc),
            _ => None,
        }
    }

    /// The current document, whether or not the update went through
    pub fn into_inner(self) -> Option<T> {
        match self {
            Update::Applied(doc) | Update::Unchanged(doc) => Some(doc),
            Update::NotFound => None,
        }
    }
}

/// Mutation closure for conditional updates
///
/// Runs on a copy of the stored document while the store is locked. Return
/// `true` to commit the copy, `false` to leave the document untouched; this
/// is the compare half of compare-and-update.
pub type Mutator<'a, T> = &'a mut dyn FnMut(&mut T) -> bool;

/// A shared, atomically-updatable document store
///
/// Every method is a single atomic step. Updates are atomic per document;
/// nothing spans documents.
pub trait EntityStore: Send + Sync {
    /// Allocate the next id of a sequence (first id is 1)
    fn next_id(&self, counter: Counter) -> StoreResult<i64>;
    /// Ensure future ids of a sequence are greater than `floor`
    fn bump_counter(&self, counter: Counter, floor: i64) -> StoreResult<()>;

    fn insert_fw(&self, fw: FireWork) -> StoreResult<()>;
    fn get_fw(&self, fw_id: FwId) -> StoreResult<Option<FireWork>>;
    fn update_fw(&self, fw_id: FwId, f: Mutator<'_, FireWork>) -> StoreResult<Update<FireWork>>;
    fn delete_fw(&self, fw_id: FwId) -> StoreResult<bool>;
    fn find_fws(&self, filter: &dyn Fn(&FireWork) -> bool) -> StoreResult<Vec<FireWork>>;
    /// Indexed lookup by state
    fn fw_ids_in_state(&self, state: FwState) -> StoreResult<Vec<FwId>>;
    /// Indexed lookup of the owning workflow
    fn wf_id_for_fw(&self, fw_id: FwId) -> StoreResult<Option<WfId>>;

    fn insert_launch(&self, launch: Launch) -> StoreResult<()>;
    fn get_launch(&self, launch_id: LaunchId) -> StoreResult<Option<Launch>>;
    fn update_launch(&self, launch_id: LaunchId, f: Mutator<'_, Launch>) -> StoreResult<Update<Launch>>;
    fn delete_launch(&self, launch_id: LaunchId) -> StoreResult<bool>;
    fn find_launches(&self, filter: &dyn Fn(&Launch) -> bool) -> StoreResult<Vec<Launch>>;
    /// Indexed lookup by external reservation id
    fn launch_ids_for_reservation(&self, reservation_id: &str) -> StoreResult<Vec<LaunchId>>;

    fn insert_wf(&self, wf: Workflow) -> StoreResult<()>;
    fn get_wf(&self, wf_id: WfId) -> StoreResult<Option<Workflow>>;
    fn update_wf(&self, wf_id: WfId, f: Mutator<'_, Workflow>) -> StoreResult<Update<Workflow>>;
    fn delete_wf(&self, wf_id: WfId) -> StoreResult<bool>;
    fn find_wfs(&self, filter: &dyn Fn(&Workflow) -> bool) -> StoreResult<Vec<Workflow>>;

    fn put_offline_run(&self, run: OfflineRun) -> StoreResult<()>;
    fn get_offline_run(&self, launch_id: LaunchId) -> StoreResult<Option<OfflineRun>>;
    fn update_offline_run(
        &self,
        launch_id: LaunchId,
        f: Mutator<'_, OfflineRun>,
    ) -> StoreResult<Update<OfflineRun>>;
    fn delete_offline_run(&self, launch_id: LaunchId) -> StoreResult<bool>;
    fn find_offline_runs(&self, filter: &dyn Fn(&OfflineRun) -> bool) -> StoreResult<Vec<OfflineRun>>;

    /// Drop every document and counter
    fn reset(&self) -> StoreResult<()>;
    /// Rebuild secondary indexes from the documents
    fn rebuild_indexes(&self) -> StoreResult<()>;
    /// Shrink durable storage to one entry per live document
    fn compact(&self) -> StoreResult<()>;
}
