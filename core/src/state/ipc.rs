//! Request/response types shared by the sync service and its clients.
//!
//! Both sides use these exact structs for (de)serialization so the HTTP
//! contract cannot drift between server, overlay and control CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use subathon_types::{GrantConfig, GrantKind, Tier};

use super::{ActivityEntry, Snapshot};
use crate::error::{ConfigError, RequestError};
use crate::events::TimeGrant;
use crate::timer::{Goal, TimerState};

/// Counters kept by the service for operator visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceStats {
    pub total_requests: u64,
    pub processed_grants: u64,
    pub rejected_by_goal: u64,
    pub dropped_notifications: u64,
}

/// Full read model returned by "get state" and by mutating requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    #[serde(flatten)]
    pub timer: TimerState,
    pub config: GrantConfig,
    #[serde(default)]
    pub total_bits: u64,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub goal_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub goal_reached: bool,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub start_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sub_list: Vec<ActivityEntry>,
    /// Seconds that can still be granted before the goal; `None` without a goal.
    #[serde(default)]
    pub max_addable: Option<u64>,
    #[serde(default)]
    pub stats: ServiceStats,
}

impl TimerView {
    pub fn from_snapshot(snapshot: &Snapshot, stats: ServiceStats, now: DateTime<Utc>) -> Self {
        Self {
            timer: snapshot.timer.clone(),
            config: snapshot.config.clone(),
            total_bits: snapshot.total_bits,
            goal_timestamp: snapshot.goal.deadline,
            goal_reached: snapshot.goal.reached,
            start_timestamp: snapshot.start_timestamp,
            sub_list: snapshot.activity.to_vec(),
            max_addable: snapshot
                .goal
                .max_addable(snapshot.timer.remaining_seconds(), now),
            stats,
        }
    }

    /// Rebuild a persistable snapshot (used by replicas adopting server state).
    pub fn into_snapshot(self) -> Snapshot {
        Snapshot {
            timer: self.timer,
            config: self.config,
            total_bits: self.total_bits,
            goal: Goal {
                deadline: self.goal_timestamp,
                reached: self.goal_reached,
            },
            start_timestamp: self.start_timestamp,
            activity: self.sub_list.into(),
        }
    }
}

/// Partial update for "merge state". Absent fields are left alone.
///
/// The two timestamps distinguish "absent" from an explicit `null`, which
/// clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_contributions: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_seconds_granted: Option<u64>,
    /// Replaces the whole grant config after validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<GrantConfig>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "nullable_millis::serialize",
        deserialize_with = "nullable_millis::deserialize"
    )]
    pub goal_timestamp: Option<Option<DateTime<Utc>>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "nullable_millis::serialize",
        deserialize_with = "nullable_millis::deserialize"
    )]
    pub start_timestamp: Option<Option<DateTime<Utc>>>,
}

impl StatePatch {
    pub fn validate(&self) -> Result<(), RequestError> {
        if let Some(config) = &self.config {
            config.validate().map_err(ConfigError::InvalidGrants)?;
        }
        Ok(())
    }
}

/// Extra details about who triggered an add-time request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContributorInfo {
    pub username: Option<String>,
    pub tier: Option<Tier>,
    pub gift_count: u32,
    pub recipient: Option<String>,
    pub months: u32,
    pub bits: u64,
    pub is_prime: bool,
}

/// Largest single add-time request: one year.
pub const MAX_ADD_SECONDS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTimeRequest {
    pub seconds: i64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default, alias = "subInfo", skip_serializing_if = "Option::is_none")]
    pub contributor_info: Option<ContributorInfo>,
}

impl AddTimeRequest {
    pub fn is_sub(&self) -> bool {
        self.reason.as_deref() == Some("sub")
    }

    /// Contributions this request counts for: the gift count for a gift bomb, else one.
    pub fn unit_count(&self) -> u32 {
        let gifts = self.contributor_info.as_ref().map_or(0, |info| info.gift_count);
        if self.is_sub() && gifts > 0 { gifts } else { 1 }
    }

    /// Synthesize the grant this request stands for.
    pub fn to_grant(&self) -> Result<TimeGrant, RequestError> {
        if self.seconds < 0 {
            return Err(RequestError::malformed(
                "seconds",
                format!("must not be negative (got {})", self.seconds),
            ));
        }
        if self.seconds > MAX_ADD_SECONDS {
            return Err(RequestError::malformed(
                "seconds",
                format!("must be at most {MAX_ADD_SECONDS} (got {})", self.seconds),
            ));
        }

        let info = self.contributor_info.clone().unwrap_or_default();
        let kind = match self.reason.as_deref() {
            Some("sub") if info.gift_count > 0 || info.recipient.is_some() => GrantKind::Gift,
            Some("sub") => GrantKind::Subscription,
            Some("bits") => GrantKind::Bits,
            _ => GrantKind::Manual,
        };

        Ok(TimeGrant {
            source_event_id: None,
            contributor_name: info
                .username
                .unwrap_or_else(|| self.reason.clone().unwrap_or_else(|| "manual".to_string())),
            tier: info.tier.unwrap_or_default(),
            unit_count: self.unit_count(),
            seconds_to_add: self.seconds as u64,
            kind,
            recipient: info.recipient,
            bits: info.bits,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetTimeRequest {
    pub seconds: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetGoalRequest {
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddBitsRequest {
    pub bits: u64,
}

/// Acknowledgement for lifecycle commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub const OK: Ack = Ack { success: true };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationResponse {
    pub success: bool,
    pub data: TimerView,
}

impl MutationResponse {
    pub fn ok(data: TimerView) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

mod nullable_millis {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<Option<DateTime<Utc>>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value
            .flatten()
            .map(|dt| dt.timestamp_millis())
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Option<DateTime<Utc>>>, D::Error> {
        let millis = Option::<i64>::deserialize(deserializer)?;
        match millis {
            None => Ok(Some(None)),
            Some(ms) => DateTime::from_timestamp_millis(ms)
                .map(|dt| Some(Some(dt)))
                .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {ms}"))),
        }
    }
}
