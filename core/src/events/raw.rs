use serde::{Deserialize, Serialize};

/// A notification from the chat feed, decoded once at the boundary.
///
/// Contributor fields are optional at decode time so a notification with a
/// known type but missing data still reaches the normalizer, which reports
/// exactly which field was absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RawEvent {
    Subscription {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        plan: Option<String>,
    },
    Resubscription {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        plan: Option<String>,
        #[serde(default)]
        months: u32,
    },
    GiftSubscription {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        gifter: Option<String>,
        #[serde(default)]
        recipient: Option<String>,
        #[serde(default)]
        plan: Option<String>,
    },
    /// Community gift announcement. The individual gifts arrive separately.
    MysteryGiftBundle {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        gifter: Option<String>,
        #[serde(default)]
        count: u32,
        #[serde(default)]
        plan: Option<String>,
    },
    BitsCheer {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        bits: Option<i64>,
    },
    Raid {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        raider: Option<String>,
        #[serde(default)]
        viewers: u32,
    },
}

impl RawEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            RawEvent::Subscription { .. } => "subscription",
            RawEvent::Resubscription { .. } => "resubscription",
            RawEvent::GiftSubscription { .. } => "giftSubscription",
            RawEvent::MysteryGiftBundle { .. } => "mysteryGiftBundle",
            RawEvent::BitsCheer { .. } => "bitsCheer",
            RawEvent::Raid { .. } => "raid",
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            RawEvent::Subscription { id, .. }
            | RawEvent::Resubscription { id, .. }
            | RawEvent::GiftSubscription { id, .. }
            | RawEvent::MysteryGiftBundle { id, .. }
            | RawEvent::BitsCheer { id, .. }
            | RawEvent::Raid { id, .. } => id.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_tagged_events() {
        let sub: RawEvent =
            serde_json::from_str(r#"{"type":"resubscription","username":"ada","plan":"2000","months":7}"#)
                .unwrap();
        assert_eq!(
            sub,
            RawEvent::Resubscription {
                id: None,
                username: Some("ada".into()),
                plan: Some("2000".into()),
                months: 7,
            }
        );

        let gift: RawEvent = serde_json::from_str(
            r#"{"type":"giftSubscription","id":"n-1","gifter":"bob","recipient":"cy"}"#,
        )
        .unwrap();
        assert_eq!(gift.kind(), "giftSubscription");
        assert_eq!(gift.id(), Some("n-1"));
    }

    #[test]
    fn test_unknown_type_is_rejected_at_decode() {
        let result = serde_json::from_str::<RawEvent>(r#"{"type":"follow","username":"x"}"#);
        assert!(result.is_err());
    }
}
