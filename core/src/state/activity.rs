use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subathon_types::{GrantKind, Tier};

use crate::events::TimeGrant;

/// Maximum number of entries kept in the activity log.
pub const ACTIVITY_CAPACITY: usize = 100;

/// One applied contribution as shown in the control panel's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub username: String,
    #[serde(rename = "type")]
    pub kind: GrantKind,
    pub tier: Tier,
    #[serde(default)]
    pub gift_count: u32,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub is_prime: bool,
    #[serde(default)]
    pub months: u32,
    #[serde(default)]
    pub bits: u64,
    /// Seconds actually added (after any goal clamp).
    pub time_added: u64,
}

impl ActivityEntry {
    pub fn from_grant(grant: &TimeGrant, time_added: u64, at: DateTime<Utc>) -> Self {
        Self {
            timestamp: at,
            username: grant.contributor_name.clone(),
            kind: grant.kind,
            tier: grant.tier,
            gift_count: if grant.unit_count > 1 { grant.unit_count } else { 0 },
            recipient: grant.recipient.clone(),
            is_prime: false,
            months: 0,
            bits: grant.bits,
            time_added,
        }
    }
}

/// Bounded, newest-first list of applied contributions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the front, dropping the oldest entry past capacity.
    pub fn push(&mut self, entry: ActivityEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(ACTIVITY_CAPACITY);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<ActivityEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Enforce the capacity on a log that came from disk.
    pub fn trim(&mut self) {
        self.entries.truncate(ACTIVITY_CAPACITY);
    }
}

impl From<Vec<ActivityEntry>> for ActivityLog {
    fn from(entries: Vec<ActivityEntry>) -> Self {
        let mut log = Self {
            entries: entries.into(),
        };
        log.trim();
        log
    }
}
