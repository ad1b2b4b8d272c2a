//! Whole-state snapshots and their on-disk store.
//!
//! A snapshot is always written in full. The store writes to a temporary
//! file in the target directory and renames it over the previous snapshot,
//! so a reader sees either the old file or the new one.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subathon_types::GrantConfig;
use tempfile::NamedTempFile;

use super::ActivityLog;
use crate::error::PersistenceError;
use crate::timer::{Goal, Recovery, TimerState, recover};

/// File name used inside a data directory.
pub const SNAPSHOT_FILE: &str = "timer-data.json";

/// Everything needed to bring a timer back after a restart.
///
/// Timer fields are flattened to the top level:
/// `{ remainingSeconds, running, totalContributions, totalSecondsGranted, lastObservedAt, config, ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(flatten)]
    pub timer: TimerState,
    #[serde(default)]
    pub config: GrantConfig,
    #[serde(default)]
    pub total_bits: u64,
    #[serde(default)]
    pub goal: Goal,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub start_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub activity: ActivityLog,
}

impl Snapshot {
    pub fn fresh(now: DateTime<Utc>, config: GrantConfig) -> Self {
        Self {
            timer: TimerState::new(now),
            config,
            total_bits: 0,
            goal: Goal::default(),
            start_timestamp: None,
            activity: ActivityLog::new(),
        }
    }

    /// Drift-correct the timer to `now` and repair anything out of bounds.
    pub fn recover(mut self, now: DateTime<Utc>) -> (Self, Recovery) {
        let (timer, recovery) = recover(self.timer, now);
        self.timer = timer;
        self.activity.trim();
        (self, recovery)
    }
}

/// Reads and atomically replaces one snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(SNAPSHOT_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the last snapshot. A missing file is `Ok(None)`, not an error.
    pub fn load(&self) -> Result<Option<Snapshot>, PersistenceError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| PersistenceError::Decode {
                path: self.path.clone(),
                source,
            })
    }

    /// Write `snapshot` over the previous file via temp file + rename.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        let json = serde_json::to_vec_pretty(snapshot).map_err(PersistenceError::Encode)?;
        let write_err = |source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(write_err)?;

        let mut temp = NamedTempFile::new_in(dir).map_err(write_err)?;
        temp.write_all(&json).map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;
        temp.persist(&self.path)
            .map_err(|source| PersistenceError::Replace {
                path: self.path.clone(),
                source,
            })?;
        Ok(())
    }

    /// Load and drift-correct the last snapshot.
    ///
    /// An unreadable or corrupt file is treated as "no prior run": a warning
    /// is logged and a fresh state with `defaults` is returned.
    pub fn restore(&self, now: DateTime<Utc>, defaults: &GrantConfig) -> (Snapshot, Recovery) {
        match self.load() {
            Ok(Some(snapshot)) => snapshot.recover(now),
            Ok(None) => (Snapshot::fresh(now, defaults.clone()), Recovery::Fresh),
            Err(e) => {
                tracing::warn!(error = %e, "Snapshot unreadable, starting from a fresh timer");
                (Snapshot::fresh(now, defaults.clone()), Recovery::Fresh)
            }
        }
    }
}
