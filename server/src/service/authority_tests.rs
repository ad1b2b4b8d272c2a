//! Tests for the authoritative timer
//!
//! Drives `TimerAuthority` directly with a fixed clock so the goal maths and
//! the feed path are deterministic.

use chrono::{DateTime, Duration, TimeZone, Utc};
use subathon_core::events::TimeGrant;
use subathon_core::state::{AddTimeRequest, ContributorInfo, MAX_ADD_SECONDS, Snapshot, StatePatch};
use subathon_core::{RawEvent, RequestError};
use subathon_core::timer::Tick;
use subathon_types::{GrantConfig, GrantKind, Tier};

use super::{TimerAuthority, WriteError, WriteOp};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 8, 18, 0, 0).unwrap()
}

fn authority() -> TimerAuthority {
    TimerAuthority::new(Snapshot::fresh(now(), GrantConfig::default()), GrantConfig::default())
}

fn add(seconds: i64) -> WriteOp {
    WriteOp::AddTime(AddTimeRequest {
        seconds,
        reason: Some("manual".into()),
        contributor_info: None,
    })
}

fn sub(name: &str, plan: &str) -> WriteOp {
    WriteOp::Feed(RawEvent::Subscription {
        id: Some(format!("evt-{name}")),
        username: Some(name.into()),
        plan: Some(plan.into()),
    })
}

fn cheer(bits: i64) -> WriteOp {
    WriteOp::Feed(RawEvent::BitsCheer {
        id: None,
        username: Some("cheerer".into()),
        bits: Some(bits),
    })
}

fn remaining(authority: &TimerAuthority) -> u64 {
    authority.snapshot().timer.remaining_seconds()
}

// ─────────────────────────────────────────────────────────────────────────────
// Add time
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_gift_bomb_add_time_counts_every_gift() {
    let mut auth = authority();
    let request = AddTimeRequest {
        seconds: 300,
        reason: Some("sub".into()),
        contributor_info: Some(ContributorInfo {
            username: Some("whale".into()),
            gift_count: 5,
            ..Default::default()
        }),
    };
    auth.execute(WriteOp::AddTime(request), now()).unwrap();

    let snap = auth.snapshot();
    assert_eq!(snap.timer.remaining_seconds(), 300);
    assert_eq!(snap.timer.total_contributions(), 5);
    let entry = snap.activity.iter().next().unwrap();
    assert_eq!(entry.username, "whale");
    assert_eq!(entry.gift_count, 5);
    assert_eq!(entry.kind, GrantKind::Gift);
}

#[test]
fn test_manual_add_time_is_not_listed() {
    let mut auth = authority();
    auth.execute(add(600), now()).unwrap();

    assert_eq!(remaining(&auth), 600);
    assert_eq!(auth.snapshot().timer.total_contributions(), 1);
    assert!(auth.snapshot().activity.is_empty());
    assert_eq!(auth.stats().processed_grants, 1);
}

#[test]
fn test_negative_add_time_leaves_state_untouched() {
    let mut auth = authority();
    auth.execute(add(60), now()).unwrap();
    let before = auth.snapshot().clone();

    let err = auth.execute(add(-30), now() + Duration::seconds(5)).unwrap_err();
    assert!(matches!(err, WriteError::Request(_)));
    assert_eq!(auth.snapshot(), &before);
}

#[test]
fn test_add_time_does_not_start() {
    let mut auth = authority();
    auth.execute(add(60), now()).unwrap();
    assert!(!auth.snapshot().timer.is_running());
    assert_eq!(auth.tick(now()), Tick::Idle);
}

// ─────────────────────────────────────────────────────────────────────────────
// Feed
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_feed_subscription_grants_tier_time() {
    let mut auth = authority();
    auth.execute(sub("alice", "2000"), now()).unwrap();
    auth.execute(sub("bob", "Prime"), now()).unwrap();

    assert_eq!(remaining(&auth), 180);
    assert_eq!(auth.snapshot().timer.total_contributions(), 2);

    let newest = auth.snapshot().activity.iter().next().unwrap();
    assert_eq!(newest.username, "bob");
    assert_eq!(newest.tier, Tier::One);
    assert_eq!(newest.time_added, 60);
    assert!(newest.is_prime);

    let older = auth.snapshot().activity.iter().nth(1).unwrap();
    assert!(!older.is_prime);
}

#[test]
fn test_add_time_records_prime_flag() {
    let mut auth = authority();
    let request = AddTimeRequest {
        seconds: 60,
        reason: Some("sub".into()),
        contributor_info: Some(ContributorInfo {
            username: Some("twitchprime".into()),
            months: 3,
            is_prime: true,
            ..Default::default()
        }),
    };
    auth.execute(WriteOp::AddTime(request), now()).unwrap();

    let entry = auth.snapshot().activity.iter().next().unwrap();
    assert!(entry.is_prime);
    assert_eq!(entry.months, 3);
    assert_eq!(entry.kind, GrantKind::Subscription);
}

#[test]
fn test_feed_resubscription_records_months() {
    let mut auth = authority();
    let resub = RawEvent::Resubscription {
        id: None,
        username: Some("loyal".into()),
        plan: Some("3000".into()),
        months: 14,
    };
    auth.execute(WriteOp::Feed(resub), now()).unwrap();

    assert_eq!(remaining(&auth), 300);
    assert_eq!(auth.snapshot().activity.iter().next().unwrap().months, 14);
}

#[test]
fn test_feed_cheer_below_threshold_counts_bits_only() {
    let mut auth = authority();
    auth.execute(cheer(50), now()).unwrap();

    assert_eq!(remaining(&auth), 0);
    assert_eq!(auth.snapshot().timer.total_contributions(), 0);
    assert_eq!(auth.snapshot().total_bits, 50);
    assert!(auth.snapshot().activity.is_empty());

    auth.execute(cheer(250), now()).unwrap();
    assert_eq!(remaining(&auth), 12);
    assert_eq!(auth.snapshot().total_bits, 300);
}

#[test]
fn test_feed_bundle_and_raid_grant_nothing() {
    let mut auth = authority();
    let bundle = RawEvent::MysteryGiftBundle {
        id: None,
        gifter: Some("santa".into()),
        count: 10,
        plan: Some("1000".into()),
    };
    let raid = RawEvent::Raid {
        id: None,
        raider: Some("friend".into()),
        viewers: 250,
    };
    auth.execute(WriteOp::Feed(bundle), now()).unwrap();
    auth.execute(WriteOp::Feed(raid), now()).unwrap();

    assert_eq!(remaining(&auth), 0);
    assert_eq!(auth.snapshot().timer.total_contributions(), 0);
    assert_eq!(auth.stats().processed_grants, 0);
}

#[test]
fn test_malformed_notification_is_dropped() {
    let mut auth = authority();
    auth.execute(add(60), now()).unwrap();
    let before = auth.snapshot().clone();

    let gift_without_recipient = RawEvent::GiftSubscription {
        id: None,
        gifter: Some("gifter".into()),
        recipient: None,
        plan: None,
    };
    let err = auth
        .execute(WriteOp::Feed(gift_without_recipient), now())
        .unwrap_err();

    assert!(matches!(err, WriteError::Notification(_)));
    assert_eq!(auth.snapshot(), &before);
    assert_eq!(auth.stats().dropped_notifications, 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Goal
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_goal_truncates_then_rejects() {
    let mut auth = authority();
    let goal = now() + Duration::seconds(100);
    auth.execute(WriteOp::SetGoal(Some(goal)), now()).unwrap();
    auth.execute(add(60), now()).unwrap();
    assert_eq!(auth.view(now()).max_addable, Some(40));

    auth.execute(add(60), now()).unwrap();
    assert_eq!(remaining(&auth), 100);
    assert!(auth.snapshot().goal.reached);
    assert_eq!(auth.snapshot().timer.total_seconds_granted(), 100);

    auth.execute(add(60), now()).unwrap();
    assert_eq!(remaining(&auth), 100);
    assert_eq!(auth.stats().rejected_by_goal, 1);
    assert_eq!(auth.stats().processed_grants, 2);
}

#[test]
fn test_goal_limits_set_time() {
    let mut auth = authority();
    auth.execute(WriteOp::SetGoal(Some(now() + Duration::hours(1))), now())
        .unwrap();
    auth.execute(WriteOp::SetTime(7_200), now()).unwrap();
    assert_eq!(remaining(&auth), 3_600);
    assert!(auth.snapshot().goal.reached);

    auth.execute(WriteOp::SetGoal(Some(now() + Duration::hours(2))), now())
        .unwrap();
    assert!(!auth.snapshot().goal.reached);
}

#[test]
fn test_oversized_add_time_is_refused() {
    let mut auth = authority();
    let err = auth.execute(add(i64::MAX), now()).unwrap_err();
    assert!(matches!(
        err,
        WriteError::Request(RequestError::Malformed { field: "seconds", .. })
    ));
    assert_eq!(remaining(&auth), 0);

    auth.execute(add(MAX_ADD_SECONDS), now()).unwrap();
    assert_eq!(remaining(&auth), MAX_ADD_SECONDS as u64);
}

#[test]
fn test_goal_holds_when_clock_exceeds_i64() {
    let mut snapshot = Snapshot::fresh(now(), GrantConfig::default());
    snapshot.timer.apply(&TimeGrant {
        source_event_id: None,
        contributor_name: "import".into(),
        tier: Tier::One,
        unit_count: 1,
        seconds_to_add: u64::MAX - 1,
        kind: GrantKind::Manual,
        recipient: None,
        bits: 0,
    });
    let mut auth = TimerAuthority::new(snapshot, GrantConfig::default());

    auth.execute(WriteOp::SetGoal(Some(now() + Duration::hours(1))), now())
        .unwrap();
    assert_eq!(auth.view(now()).max_addable, Some(0));

    auth.execute(add(60), now()).unwrap();
    assert_eq!(remaining(&auth), u64::MAX - 1);
    assert_eq!(auth.stats().rejected_by_goal, 1);
    assert!(auth.snapshot().goal.reached);
}

#[test]
fn test_without_goal_nothing_is_clamped() {
    let mut auth = authority();
    auth.execute(add(1_000_000), now()).unwrap();
    assert_eq!(remaining(&auth), 1_000_000);
    assert_eq!(auth.view(now()).max_addable, None);
}

// ─────────────────────────────────────────────────────────────────────────────
// Merge and resets
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_merge_overwrites_only_given_fields() {
    let mut auth = authority();
    auth.execute(add(120), now()).unwrap();

    let patch = StatePatch {
        total_contributions: Some(42),
        start_timestamp: Some(Some(now())),
        ..Default::default()
    };
    auth.execute(WriteOp::Merge(patch), now()).unwrap();

    let snap = auth.snapshot();
    assert_eq!(snap.timer.remaining_seconds(), 120);
    assert_eq!(snap.timer.total_contributions(), 42);
    assert_eq!(snap.timer.total_seconds_granted(), 120);
    assert_eq!(snap.start_timestamp, Some(now()));
}

#[test]
fn test_merge_running_respects_floor() {
    let mut auth = authority();
    let patch = StatePatch {
        running: Some(true),
        ..Default::default()
    };
    auth.execute(WriteOp::Merge(patch), now()).unwrap();
    assert!(!auth.snapshot().timer.is_running());

    let patch = StatePatch {
        remaining_seconds: Some(90),
        running: Some(true),
        ..Default::default()
    };
    auth.execute(WriteOp::Merge(patch), now()).unwrap();
    assert!(auth.snapshot().timer.is_running());
    assert_eq!(remaining(&auth), 90);
}

#[test]
fn test_merge_with_invalid_config_changes_nothing() {
    let mut auth = authority();
    auth.execute(add(30), now()).unwrap();
    let before = auth.snapshot().clone();

    let patch = StatePatch {
        remaining_seconds: Some(999),
        config: Some(GrantConfig {
            bits_threshold: -1,
            ..GrantConfig::default()
        }),
        ..Default::default()
    };
    assert!(auth.execute(WriteOp::Merge(patch), now()).is_err());
    assert_eq!(auth.snapshot(), &before);
}

#[test]
fn test_merge_config_changes_later_grants() {
    let mut auth = authority();
    let mut config = GrantConfig::default();
    config.seconds_per_tier.tier1 = 90;
    let patch = StatePatch {
        config: Some(config),
        ..Default::default()
    };
    auth.execute(WriteOp::Merge(patch), now()).unwrap();
    auth.execute(sub("carol", "1000"), now()).unwrap();
    assert_eq!(remaining(&auth), 90);
}

#[test]
fn test_reset_keeps_goal_but_clears_reached() {
    let mut auth = authority();
    let goal = now() + Duration::seconds(30);
    auth.execute(WriteOp::SetGoal(Some(goal)), now()).unwrap();
    auth.execute(add(60), now()).unwrap();
    assert!(auth.snapshot().goal.reached);

    auth.execute(WriteOp::Reset, now()).unwrap();
    assert_eq!(remaining(&auth), 0);
    assert_eq!(auth.snapshot().goal.deadline, Some(goal));
    assert!(!auth.snapshot().goal.reached);
}

#[test]
fn test_reset_list_keeps_clock() {
    let mut auth = authority();
    auth.execute(sub("dave", "1000"), now()).unwrap();
    auth.execute(WriteOp::AddBits(500), now()).unwrap();
    auth.execute(WriteOp::Start, now()).unwrap();

    auth.execute(WriteOp::ResetList, now()).unwrap();
    let snap = auth.snapshot();
    assert_eq!(snap.timer.remaining_seconds(), 60);
    assert!(snap.timer.is_running());
    assert_eq!(snap.timer.total_contributions(), 0);
    assert_eq!(snap.timer.total_seconds_granted(), 0);
    assert_eq!(snap.total_bits, 0);
    assert!(snap.activity.is_empty());
}

#[test]
fn test_full_reset_restores_defaults() {
    let defaults = GrantConfig {
        gift_seconds_per_unit: 75,
        ..GrantConfig::default()
    };
    let mut auth = TimerAuthority::new(Snapshot::fresh(now(), GrantConfig::default()), defaults.clone());
    auth.execute(sub("erin", "3000"), now()).unwrap();
    auth.execute(WriteOp::SetGoal(Some(now() + Duration::days(3))), now())
        .unwrap();
    auth.execute(WriteOp::FullReset, now()).unwrap();

    let snap = auth.snapshot();
    assert_eq!(snap.timer.remaining_seconds(), 0);
    assert_eq!(snap.goal.deadline, None);
    assert_eq!(snap.config, defaults);
    assert!(snap.activity.is_empty());
    assert_eq!(auth.stats().processed_grants, 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Ordering
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_same_sequence_same_result() {
    let ops = vec![
        sub("a", "1000"),
        WriteOp::Start,
        cheer(1_000),
        add(45),
        WriteOp::Pause,
        WriteOp::SetTime(500),
        sub("b", "3000"),
    ];

    let run = |ops: &[WriteOp]| {
        let mut auth = authority();
        for (i, op) in ops.iter().enumerate() {
            auth.execute(op.clone(), now()).unwrap();
            if i % 2 == 0 {
                auth.tick(now());
            }
        }
        auth.snapshot().clone()
    };

    let first = run(&ops);
    let second = run(&ops);
    assert_eq!(first, second);
    assert_eq!(first.timer.remaining_seconds(), 800);
    assert_eq!(first.timer.total_seconds_granted(), 60 + 60 + 45 + 300);
}
