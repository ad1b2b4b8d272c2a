use serde::{Deserialize, Serialize};
use subathon_types::{GrantKind, Tier};

/// One canonical "add N seconds, record contributions" operation.
///
/// Produced once per notification (or synthesized for a manual add-time
/// request) and consumed once by [`crate::TimerState::apply`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeGrant {
    /// Originating notification id, if the feed supplied one. Not deduplicated.
    pub source_event_id: Option<String>,
    pub contributor_name: String,
    pub tier: Tier,
    /// Number of contributions this grant counts for (>= 1).
    pub unit_count: u32,
    pub seconds_to_add: u64,
    pub kind: GrantKind,
    /// Gift recipient, for the activity log.
    pub recipient: Option<String>,
    /// Cheered amount, for the activity log and bits total.
    pub bits: u64,
}

impl TimeGrant {
    pub fn is_empty(&self) -> bool {
        self.seconds_to_add == 0
    }
}
