// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-workflow lock for refresh serialization
//!
//! The lock lives on the workflow document and is taken with a conditional
//! update, so it works across processes sharing a store. A holder that
//! crashed leaves its record behind; once the record is older than
//! `lock_expiration` the next caller reclaims it.

use crate::error::{LaunchPadError, Result};
use crate::launchpad::LaunchPad;
use fw_core::clock::elapsed_since;
use fw_core::{Clock, LockRecord, WfId};
use fw_storage::{EntityStore, Update};
use std::time::Instant;

/// Held workflow lock; released on drop
pub struct WorkflowLock<'a, S: EntityStore> {
    store: &'a S,
    wf_id: WfId,
    holder: String,
}

impl<S: EntityStore> WorkflowLock<'_, S> {
    pub fn wf_id(&self) -> WfId {
        self.wf_id
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }
}

impl<S: EntityStore> Drop for WorkflowLock<'_, S> {
    fn drop(&mut self) {
        let holder = self.holder.clone();
        let released = self.store.update_wf(self.wf_id, &mut |wf| {
            if wf.lock.as_ref().is_some_and(|lock| lock.holder == holder) {
                wf.lock = None;
                true
            } else {
                false
            }
        });
        match released {
            Ok(Update::Applied(_)) | Ok(Update::NotFound) => {}
            Ok(Update::Unchanged(_)) => tracing::warn!(
                wf_id = %self.wf_id,
                holder = %self.holder,
                "workflow lock was reclaimed while held"
            ),
            Err(e) => tracing::error!(
                wf_id = %self.wf_id,
                holder = %self.holder,
                error = %e,
                "failed to release workflow lock"
            ),
        }
    }
}

impl<S: EntityStore, C: Clock> LaunchPad<S, C> {
    /// Take the lock on a workflow, waiting up to `lock_timeout`
    pub fn lock_workflow(&self, wf_id: WfId) -> Result<WorkflowLock<'_, S>> {
        let holder = uuid::Uuid::new_v4().to_string();
        let deadline = Instant::now() + self.config.lock_timeout;
        let expiration = self.config.lock_expiration;

        loop {
            let now = self.now();
            let mut reclaimed_from = None;
            let attempt = self.store.update_wf(wf_id, &mut |wf| {
                match &wf.lock {
                    Some(lock) if elapsed_since(now, lock.acquired_on) <= expiration => {
                        return false;
                    }
                    Some(lock) => reclaimed_from = Some(lock.holder.clone()),
                    None => {}
                }
                wf.lock = Some(LockRecord {
                    holder: holder.clone(),
                    acquired_on: now,
                });
                true
            })?;

            match attempt {
                Update::Applied(_) => {
                    if let Some(previous) = reclaimed_from {
                        tracing::warn!(
                            wf_id = %wf_id,
                            previous_holder = %previous,
                            new_holder = %holder,
                            "reclaimed stale workflow lock"
                        );
                    }
                    return Ok(WorkflowLock {
                        store: &self.store,
                        wf_id,
                        holder,
                    });
                }
                Update::NotFound => return Err(LaunchPadError::WfNotFound(wf_id)),
                Update::Unchanged(wf) => {
                    if Instant::now() >= deadline {
                        let current = wf.lock.map(|lock| lock.holder).unwrap_or_default();
                        return Err(LaunchPadError::LockTimeout {
                            wf_id,
                            holder: current,
                        });
                    }
                    std::thread::sleep(self.config.lock_retry_interval);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
