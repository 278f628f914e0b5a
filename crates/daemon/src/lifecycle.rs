// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use fw_core::{ConfigError, FwQuery, FwState, LaunchPadConfig, SystemClock};
use fw_engine::{LaunchPad, LaunchPadError};
use fw_storage::{DocumentStore, EntityStore, StoreError};
use thiserror::Error;
use tracing::{info, warn};

/// LaunchPad over the journaled store and wall-clock time
pub type DaemonLaunchPad = LaunchPad<DocumentStore, SystemClock>;

/// Daemon configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonConfig {
    /// Directory holding every file the daemon writes
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the document write-ahead log
    pub wal_path: PathBuf,
    /// Optional LaunchPad TOML file
    pub launchpad_path: Option<PathBuf>,
}

impl DaemonConfig {
    /// Resolve paths from the process environment
    pub fn from_env(launchpad_path: Option<PathBuf>) -> Result<Self, LifecycleError> {
        let state_dir = resolve_state_dir(|key| std::env::var(key).ok())?;
        Ok(Self::in_dir(state_dir, launchpad_path))
    }

    /// Lay out daemon files under `state_dir`
    pub fn in_dir(state_dir: PathBuf, launchpad_path: Option<PathBuf>) -> Self {
        Self {
            lock_path: state_dir.join("fwd.pid"),
            log_path: state_dir.join("fwd.log"),
            wal_path: state_dir.join("wal").join("documents.wal"),
            launchpad_path,
            state_dir,
        }
    }

    /// Load the LaunchPad configuration, falling back to defaults
    pub fn launchpad_config(&self) -> Result<LaunchPadConfig, LifecycleError> {
        match &self.launchpad_path {
            Some(path) => Ok(LaunchPadConfig::load(path)?),
            None => Ok(LaunchPadConfig::default()),
        }
    }
}

/// Daemon state during operation
pub struct DaemonState {
    pub config: DaemonConfig,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub launchpad: DaemonLaunchPad,
}

impl DaemonState {
    /// Shutdown the daemon gracefully
    pub fn shutdown(&self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        if let Err(e) = self.launchpad.store().compact() {
            warn!("Failed to compact write-ahead log: {}", e);
        }

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("LaunchPad error: {0}")]
    LaunchPad(#[from] LaunchPadError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub fn startup(config: &DaemonConfig) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config) {
        Ok(state) => Ok(state),
        // The PID file belongs to the running daemon
        Err(e @ LifecycleError::LockFailed(_)) => Err(e),
        Err(e) => {
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

fn startup_inner(config: &DaemonConfig) -> Result<DaemonState, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Lock before touching the log so two daemons never share a journal
    let mut lock_file = File::create(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // Fail fast on a bad config before replaying anything
    let launchpad_config = config.launchpad_config()?;

    if let Some(parent) = config.wal_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = DocumentStore::open(&config.wal_path)?;
    let launchpad = LaunchPad::new(store, SystemClock, launchpad_config);

    reconcile_state(&launchpad)?;

    info!("Daemon started in {}", config.state_dir.display());

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        launchpad,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &DaemonConfig) {
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

/// Bring the replayed documents back to a consistent state
///
/// A crash can leave workflow caches behind their FireWorks. Launches
/// still in flight are left for the maintenance sweeps.
pub(crate) fn reconcile_state(launchpad: &DaemonLaunchPad) -> Result<(), LifecycleError> {
    let report = launchpad.tuneup(false)?;
    if !report.resynced.is_empty() {
        warn!(
            "Resynced {} workflow state caches from previous session",
            report.resynced.len()
        );
    }

    let in_flight = launchpad.count_fws(
        &FwQuery::new()
            .with_state(FwState::Reserved)
            .with_state(FwState::Running),
    )?;
    if in_flight > 0 {
        warn!(
            "Found {} in-flight FireWorks from previous session (maintenance will reclaim stale ones)",
            in_flight
        );
    }
    Ok(())
}

/// Get the state directory for fwd
///
/// `FW_STATE_DIR` wins, then `XDG_STATE_HOME`, then `~/.local/state`.
pub(crate) fn resolve_state_dir(
    var: impl Fn(&str) -> Option<String>,
) -> Result<PathBuf, LifecycleError> {
    if let Some(dir) = var("FW_STATE_DIR").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = var("XDG_STATE_HOME").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(xdg).join("fireworks"));
    }
    let home = var("HOME").ok_or(LifecycleError::NoStateDir)?;
    Ok(Path::new(&home).join(".local/state/fireworks"))
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
