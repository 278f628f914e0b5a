// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LaunchPad configuration
//!
//! Loaded from TOML. Every key is optional; durations use humantime syntax
//! (`"4h"`, `"14days"`, `"300s"`).

use crate::workflow::FailurePolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TOML syntax error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchPadConfig {
    /// RESERVED launches older than this are considered stale
    #[serde(with = "humantime_serde")]
    pub reservation_expiration: Duration,
    /// RUNNING launches without a heartbeat for this long are considered lost
    #[serde(with = "humantime_serde")]
    pub run_expiration: Duration,
    /// Sleep between maintenance passes
    #[serde(with = "humantime_serde")]
    pub maintain_interval: Duration,
    /// Workflow locks older than this are reclaimed
    #[serde(with = "humantime_serde")]
    pub lock_expiration: Duration,
    #[serde(with = "humantime_serde")]
    pub lock_retry_interval: Duration,
    /// Give up acquiring a workflow lock after this long
    #[serde(with = "humantime_serde")]
    pub lock_timeout: Duration,
    /// Reselection attempts after losing a claim race
    pub claim_retries: usize,
    /// Destructive bulk operations above this many entities need confirmation
    pub confirmation_threshold: usize,
    /// Policy for workflows submitted without one
    pub failure_policy: FailurePolicy,
}

impl Default for LaunchPadConfig {
    fn default() -> Self {
        Self {
            reservation_expiration: Duration::from_secs(14 * 24 * 60 * 60),
            run_expiration: Duration::from_secs(4 * 60 * 60),
            maintain_interval: Duration::from_secs(60),
            lock_expiration: Duration::from_secs(300),
            lock_retry_interval: Duration::from_millis(10),
            lock_timeout: Duration::from_secs(30),
            claim_retries: 32,
            confirmation_threshold: 10,
            failure_policy: FailurePolicy::Block,
        }
    }
}

impl LaunchPadConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_lock_expiration(mut self, expiration: Duration) -> Self {
        self.lock_expiration = expiration;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_confirmation_threshold(mut self, threshold: usize) -> Self {
        self.confirmation_threshold = threshold;
        self
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
