//! Tests for the timer state engine
//!
//! Covers the run-state transitions and the counter invariants that must hold
//! for any interleaving of grants and ticks.

use chrono::{DateTime, TimeZone, Utc};
use subathon_types::{GrantConfig, GrantKind, Tier};

use super::{Phase, Tick, TimerState};
use crate::events::{Normalized, RawEvent, TimeGrant, normalize};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).unwrap()
}

fn grant(seconds: u64, units: u32) -> TimeGrant {
    TimeGrant {
        source_event_id: None,
        contributor_name: "tester".to_string(),
        tier: Tier::One,
        unit_count: units,
        seconds_to_add: seconds,
        kind: GrantKind::Subscription,
        recipient: None,
        bits: 0,
    }
}

/// Every observable invariant of a `TimerState`.
fn assert_invariants(state: &TimerState) {
    if state.remaining_seconds() == 0 {
        assert!(!state.is_running(), "running with nothing left: {:?}", state);
    }
}

#[test]
fn test_new_state_is_idle() {
    let state = TimerState::new(now());
    assert_eq!(state.phase(), Phase::Idle);
    assert_eq!(state.remaining_seconds(), 0);
    assert_eq!(state.total_contributions(), 0);
}

#[test]
fn test_start_requires_time() {
    let mut state = TimerState::new(now());
    assert!(!state.start());
    assert_eq!(state.phase(), Phase::Idle);

    state.set_remaining(30);
    assert_eq!(state.phase(), Phase::Paused);
    assert!(state.start());
    assert_eq!(state.phase(), Phase::Running);
}

#[test]
fn test_start_and_pause_are_idempotent() {
    let mut state = TimerState::new(now());
    state.set_remaining(90);

    assert!(state.start());
    let after_first = state.clone();
    assert!(!state.start());
    assert_eq!(state, after_first);

    assert!(state.pause());
    let after_pause = state.clone();
    assert!(!state.pause());
    assert_eq!(state, after_pause);
}

#[test]
fn test_apply_does_not_auto_start() {
    let mut state = TimerState::new(now());
    state.apply(&grant(120, 1));
    assert_eq!(state.remaining_seconds(), 120);
    assert!(!state.is_running());
    assert_eq!(state.phase(), Phase::Paused);
}

#[test]
fn test_gift_bundle_counts_each_unit() {
    let mut state = TimerState::new(now());
    state.apply(&grant(300, 5));
    assert_eq!(state.total_contributions(), 5);
    assert_eq!(state.total_seconds_granted(), 300);
}

#[test]
fn test_set_remaining_clamps_and_keeps_run_state() {
    let mut state = TimerState::new(now());
    state.set_remaining(-40);
    assert_eq!(state.remaining_seconds(), 0);

    state.set_remaining(500);
    state.start();
    state.set_remaining(200);
    assert!(state.is_running());
    assert_eq!(state.remaining_seconds(), 200);

    state.set_remaining(0);
    assert!(!state.is_running());
    assert_invariants(&state);
}

#[test]
fn test_reset_clears_everything() {
    let mut state = TimerState::new(now());
    state.apply(&grant(600, 3));
    state.start();
    state.tick();

    state.reset();
    assert_eq!(state.phase(), Phase::Idle);
    assert_eq!(state.remaining_seconds(), 0);
    assert_eq!(state.total_contributions(), 0);
    assert_eq!(state.total_seconds_granted(), 0);
}

#[test]
fn test_tick_is_noop_when_paused() {
    let mut state = TimerState::new(now());
    state.set_remaining(10);
    assert_eq!(state.tick(), Tick::Idle);
    assert_eq!(state.remaining_seconds(), 10);
}

#[test]
fn test_tick_expires_at_zero() {
    let mut state = TimerState::new(now());
    state.set_remaining(2);
    state.start();

    assert_eq!(state.tick(), Tick::Decremented { remaining: 1 });
    assert_eq!(state.tick(), Tick::Expired);
    assert_eq!(state.phase(), Phase::Idle);
    assert_eq!(state.tick(), Tick::Idle);
    assert_eq!(state.remaining_seconds(), 0);
}

#[test]
fn test_tick_snapshot_cadence() {
    assert!(Tick::Decremented { remaining: 20 }.wants_snapshot());
    assert!(!Tick::Decremented { remaining: 19 }.wants_snapshot());
    assert!(Tick::Expired.wants_snapshot());
    assert!(!Tick::Idle.wants_snapshot());
}

#[test]
fn test_grant_total_is_sum_regardless_of_ticks() {
    let mut state = TimerState::new(now());
    let amounts = [60u64, 0, 300, 12, 120, 7, 60];
    let mut expected = 0;

    for (i, amount) in amounts.iter().enumerate() {
        state.apply(&grant(*amount, 1));
        expected += amount;
        if i == 1 {
            state.start();
        }
        for _ in 0..(i * 25) {
            state.tick();
            assert_invariants(&state);
        }
    }

    assert_eq!(state.total_seconds_granted(), expected);
    assert_eq!(state.total_contributions(), amounts.len() as u64);
}

#[test]
fn test_subscription_then_run_out() {
    let config = GrantConfig::default();
    let event = RawEvent::Subscription {
        id: None,
        username: Some("first_sub".into()),
        plan: Some("1000".into()),
    };
    let Ok(Normalized::Grant(sub)) = normalize(&event, &config) else {
        panic!("subscription should normalize to a grant");
    };

    let mut state = TimerState::new(now());
    state.apply(&sub);
    assert_eq!(state.remaining_seconds(), 60);
    assert_eq!(state.total_contributions(), 1);

    assert!(state.start());
    for _ in 0..61 {
        state.tick();
        assert_invariants(&state);
    }
    assert_eq!(state.remaining_seconds(), 0);
    assert!(!state.is_running());
}
