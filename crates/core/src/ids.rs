// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integer identities for FireWorks, Launches and Workflows
//!
//! Ids are allocated from store counters. Non-positive FireWork ids are
//! placeholders used while a workflow is being assembled and are replaced on
//! submission.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! int_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

int_id!(
    /// Identity of a FireWork, unique across the store
    FwId,
    "fw-"
);

int_id!(
    /// Identity of one execution attempt
    LaunchId,
    "launch-"
);

int_id!(
    /// Identity of a Workflow document
    WfId,
    "wf-"
);

impl FwId {
    /// Placeholder ids are replaced with counter-allocated ids on submission
    pub fn is_placeholder(self) -> bool {
        self.0 <= 0
    }
}
