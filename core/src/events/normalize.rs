use subathon_types::{GrantConfig, GrantKind, Tier};

use super::{RawEvent, TimeGrant};
use crate::error::NormalizationError;

/// Result of normalizing one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Grant(TimeGrant),
    Notice(FeedNotice),
}

/// Notifications that are observed but never extend the timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedNotice {
    /// Announces `count` gifts; each one is granted when its own
    /// `GiftSubscription` arrives, so the bundle itself grants nothing.
    MysteryGift {
        gifter: Option<String>,
        count: u32,
        tier: Tier,
    },
    Raid { raider: Option<String>, viewers: u32 },
}

/// Convert a raw notification into a grant or an informational notice.
///
/// Pure: reads `config` and nothing else. On error no partial grant exists.
pub fn normalize(event: &RawEvent, config: &GrantConfig) -> Result<Normalized, NormalizationError> {
    let source_event_id = event.id().map(str::to_string);

    match event {
        RawEvent::Subscription { username, plan, .. }
        | RawEvent::Resubscription { username, plan, .. } => {
            let contributor_name = required(username, event.kind(), "username")?;
            let tier = Tier::from_plan(plan.as_deref());
            Ok(Normalized::Grant(TimeGrant {
                source_event_id,
                contributor_name,
                tier,
                unit_count: 1,
                seconds_to_add: non_negative(config.seconds_per_tier.get(tier)),
                kind: GrantKind::Subscription,
                recipient: None,
                bits: 0,
            }))
        }
        RawEvent::GiftSubscription {
            gifter,
            recipient,
            plan,
            ..
        } => {
            let contributor_name = required(gifter, event.kind(), "gifter")?;
            let recipient = required(recipient, event.kind(), "recipient")?;
            let tier = Tier::from_plan(plan.as_deref());
            let seconds = config
                .gift_seconds_per_unit
                .saturating_mul(tier.gift_multiplier());
            Ok(Normalized::Grant(TimeGrant {
                source_event_id,
                contributor_name,
                tier,
                unit_count: 1,
                seconds_to_add: non_negative(seconds),
                kind: GrantKind::Gift,
                recipient: Some(recipient),
                bits: 0,
            }))
        }
        RawEvent::MysteryGiftBundle {
            gifter,
            count,
            plan,
            ..
        } => Ok(Normalized::Notice(FeedNotice::MysteryGift {
            gifter: gifter.clone(),
            count: *count,
            tier: Tier::from_plan(plan.as_deref()),
        })),
        RawEvent::BitsCheer { username, bits, .. } => {
            let contributor_name = required(username, event.kind(), "username")?;
            let bits = bits.ok_or(NormalizationError::MissingField {
                kind: event.kind(),
                field: "bits",
            })?;
            if bits < 0 {
                return Err(NormalizationError::NegativeBits(bits));
            }
            Ok(Normalized::Grant(TimeGrant {
                source_event_id,
                contributor_name,
                tier: Tier::One,
                unit_count: 1,
                seconds_to_add: bits_seconds(bits, config),
                kind: GrantKind::Bits,
                recipient: None,
                bits: bits as u64,
            }))
        }
        RawEvent::Raid {
            raider, viewers, ..
        } => Ok(Normalized::Notice(FeedNotice::Raid {
            raider: raider.clone(),
            viewers: *viewers,
        })),
    }
}

/// `floor(bits / 100) * secondsPer100Bits`, or zero below the threshold or when disabled.
fn bits_seconds(bits: i64, config: &GrantConfig) -> u64 {
    if !config.bits_enabled() || bits < config.bits_threshold {
        return 0;
    }
    non_negative((bits / 100).saturating_mul(config.seconds_per_100_bits))
}

fn required(
    value: &Option<String>,
    kind: &'static str,
    field: &'static str,
) -> Result<String, NormalizationError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(NormalizationError::MissingField { kind, field }),
    }
}

#[inline]
fn non_negative(seconds: i64) -> u64 {
    seconds.max(0) as u64
}
