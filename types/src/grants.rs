//! Grant configuration shared by the normalizer, the service and its clients.
//!
//! The whole [`GrantConfig`] is replaced on update; there is no field-level merge.

use serde::{Deserialize, Serialize};

/// Subscription level. Serialized as the bare number `1`, `2` or `3`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    #[default]
    One,
    Two,
    Three,
}

impl Tier {
    /// Map a platform plan identifier to a tier.
    ///
    /// Only `"2000"` and `"3000"` are recognized; `"1000"`, `"Prime"`, unknown
    /// identifiers and a missing plan all fall back to tier 1.
    pub fn from_plan(plan: Option<&str>) -> Self {
        match plan {
            Some("2000") => Tier::Two,
            Some("3000") => Tier::Three,
            _ => Tier::One,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Tier::One => 1,
            Tier::Two => 2,
            Tier::Three => 3,
        }
    }

    /// Gifted subs scale super-linearly: tier 3 is worth five tier 1 gifts.
    pub fn gift_multiplier(self) -> i64 {
        match self {
            Tier::One => 1,
            Tier::Two => 2,
            Tier::Three => 5,
        }
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Tier::One),
            2 => Ok(Tier::Two),
            3 => Ok(Tier::Three),
            other => Err(format!("tier must be 1, 2 or 3 (got {other})")),
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.number()
    }
}

/// What produced a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GrantKind {
    Subscription,
    Gift,
    Bits,
    /// Operator-issued time from the control panel.
    Manual,
}

impl GrantKind {
    pub fn label(self) -> &'static str {
        match self {
            GrantKind::Subscription => "sub",
            GrantKind::Gift => "gift",
            GrantKind::Bits => "bits",
            GrantKind::Manual => "manual",
        }
    }
}

/// Seconds granted per subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierSeconds {
    pub tier1: i64,
    pub tier2: i64,
    pub tier3: i64,
}

impl Default for TierSeconds {
    fn default() -> Self {
        Self {
            tier1: 60,
            tier2: 120,
            tier3: 300,
        }
    }
}

impl TierSeconds {
    pub fn get(&self, tier: Tier) -> i64 {
        match tier {
            Tier::One => self.tier1,
            Tier::Two => self.tier2,
            Tier::Three => self.tier3,
        }
    }
}

/// How much time each kind of contribution is worth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GrantConfig {
    pub seconds_per_tier: TierSeconds,
    /// Base value of one gifted sub, scaled by [`Tier::gift_multiplier`].
    pub gift_seconds_per_unit: i64,
    /// Cheers below this many bits grant nothing.
    pub bits_threshold: i64,
    /// Zero or negative disables time for bits entirely.
    pub seconds_per_100_bits: i64,
}

impl Default for GrantConfig {
    fn default() -> Self {
        Self {
            seconds_per_tier: TierSeconds::default(),
            gift_seconds_per_unit: 60,
            bits_threshold: 100,
            seconds_per_100_bits: 6,
        }
    }
}

impl GrantConfig {
    /// Reject values that would produce negative grants.
    ///
    /// `seconds_per_100_bits` is exempt: non-positive means "bits disabled".
    pub fn validate(&self) -> Result<(), String> {
        let checks = [
            ("secondsPerTier.tier1", self.seconds_per_tier.tier1),
            ("secondsPerTier.tier2", self.seconds_per_tier.tier2),
            ("secondsPerTier.tier3", self.seconds_per_tier.tier3),
            ("giftSecondsPerUnit", self.gift_seconds_per_unit),
            ("bitsThreshold", self.bits_threshold),
        ];
        for (field, value) in checks {
            if value < 0 {
                return Err(format!("{field} must not be negative (got {value})"));
            }
        }
        Ok(())
    }

    pub fn bits_enabled(&self) -> bool {
        self.seconds_per_100_bits > 0
    }
}
