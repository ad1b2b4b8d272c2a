use std::fmt::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use subathon_core::RawEvent;
use subathon_core::state::{AddTimeRequest, ContributorInfo, TimerView};
use subathon_overlay::{SyncClient, TimerBackend};
use subathon_types::formatting::{format_added, format_clock, format_count};

const RECENT_ENTRIES: usize = 5;

pub async fn show_state(client: &SyncClient) -> Result<String, String> {
    let view = client.state().await.map_err(|e| e.to_string())?;
    Ok(summarize(&view))
}

pub async fn start(client: &SyncClient) -> Result<String, String> {
    client.start().await.map_err(|e| e.to_string())?;
    Ok("Timer started".to_string())
}

pub async fn pause(client: &SyncClient) -> Result<String, String> {
    client.pause().await.map_err(|e| e.to_string())?;
    Ok("Timer paused".to_string())
}

pub async fn reset(client: &SyncClient) -> Result<String, String> {
    client.reset().await.map_err(|e| e.to_string())?;
    Ok("Timer reset".to_string())
}

pub async fn set_time(client: &SyncClient, seconds: i64) -> Result<String, String> {
    let view = client.set_time(seconds).await.map_err(|e| e.to_string())?;
    Ok(summarize(&view))
}

pub async fn add_time(
    client: &SyncClient,
    seconds: i64,
    reason: String,
    gifts: Option<u32>,
    user: Option<String>,
) -> Result<String, String> {
    let contributor_info = (gifts.is_some() || user.is_some()).then(|| ContributorInfo {
        username: user,
        gift_count: gifts.unwrap_or(0),
        ..Default::default()
    });
    let request = AddTimeRequest {
        seconds,
        reason: Some(reason),
        contributor_info,
    };
    let view = client.add_time(request).await.map_err(|e| e.to_string())?;
    Ok(summarize(&view))
}

pub async fn set_goal(client: &SyncClient, when: &str) -> Result<String, String> {
    let deadline = parse_goal(when)?;
    let view = client.set_goal(deadline).await.map_err(|e| e.to_string())?;
    Ok(summarize(&view))
}

pub async fn add_bits(client: &SyncClient, bits: u64) -> Result<String, String> {
    let view = client.add_bits(bits).await.map_err(|e| e.to_string())?;
    Ok(format!("Bits total: {}", format_count(view.total_bits, false)))
}

pub async fn reset_list(client: &SyncClient) -> Result<String, String> {
    client.reset_list().await.map_err(|e| e.to_string())?;
    Ok("Activity list and totals cleared".to_string())
}

pub async fn full_reset(client: &SyncClient) -> Result<String, String> {
    client.full_reset().await.map_err(|e| e.to_string())?;
    Ok("Everything reset".to_string())
}

/// Submit every notification in `path`. Rejected ones are reported, not fatal.
pub async fn feed_file(client: &SyncClient, path: &Path) -> Result<String, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let events = parse_feed(&contents)?;

    let mut out = String::new();
    let mut last = None;
    for event in &events {
        match client.feed(event).await {
            Ok(view) => last = Some(view),
            Err(e) => {
                let _ = writeln!(out, "{} rejected: {e}", event.kind());
            }
        }
    }
    let _ = write!(out, "Submitted {} notification(s)", events.len());
    if let Some(view) = last {
        let _ = write!(out, "\n{}", summarize(&view));
    }
    Ok(out)
}

/// `none` clears the goal; anything else must be RFC 3339.
pub fn parse_goal(when: &str) -> Result<Option<DateTime<Utc>>, String> {
    if when.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(when)
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(|e| format!("invalid goal `{when}`: {e}"))
}

/// Accepts a JSON array, a single JSON object, or one object per line.
pub fn parse_feed(contents: &str) -> Result<Vec<RawEvent>, String> {
    if let Ok(events) = serde_json::from_str::<Vec<RawEvent>>(contents) {
        return Ok(events);
    }
    if let Ok(event) = serde_json::from_str::<RawEvent>(contents) {
        return Ok(vec![event]);
    }
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line.trim()).map_err(|e| format!("line {}: {e}", i + 1))
        })
        .collect()
}

pub fn summarize(view: &TimerView) -> String {
    let timer = &view.timer;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Remaining  {} ({})",
        format_clock(timer.remaining_seconds()),
        if timer.is_running() { "running" } else { "paused" }
    );
    let _ = writeln!(
        out,
        "Subs       {}   granted +{}   bits {}",
        format_count(timer.total_contributions(), false),
        format_added(timer.total_seconds_granted()),
        format_count(view.total_bits, false)
    );
    match view.goal_timestamp {
        Some(goal) => {
            let _ = write!(out, "Goal       {}", goal.format("%Y-%m-%d %H:%M UTC"));
            if view.goal_reached {
                out.push_str(" (reached)");
            }
            if let Some(max) = view.max_addable {
                let _ = write!(out, ", room for +{}", format_added(max));
            }
        }
        None => out.push_str("Goal       none"),
    }

    for entry in view.sub_list.iter().take(RECENT_ENTRIES) {
        let _ = write!(
            out,
            "\n  {:<6} {:<20} +{}",
            entry.kind.label(),
            entry.username,
            format_added(entry.time_added)
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use subathon_core::state::{ServiceStats, Snapshot};
    use subathon_types::GrantConfig;

    #[test]
    fn test_parse_goal() {
        assert_eq!(parse_goal("none").unwrap(), None);
        assert_eq!(parse_goal("NONE").unwrap(), None);
        assert_eq!(
            parse_goal("2025-03-10T20:00:00+01:00").unwrap(),
            Some(Utc.with_ymd_and_hms(2025, 3, 10, 19, 0, 0).unwrap())
        );
        assert!(parse_goal("tomorrow").is_err());
    }

    #[test]
    fn test_parse_feed_forms() {
        let single = r#"{"type":"raid","raider":"x","viewers":3}"#;
        assert_eq!(parse_feed(single).unwrap().len(), 1);

        let array = r#"[{"type":"raid","viewers":3},{"type":"bitsCheer","username":"c","bits":100}]"#;
        assert_eq!(parse_feed(array).unwrap().len(), 2);

        let lines = "{\"type\":\"raid\",\"viewers\":3}\n\n{\"type\":\"subscription\",\"username\":\"s\"}\n";
        let events = parse_feed(lines).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind(), "subscription");

        let bad = "{\"type\":\"raid\"}\nnope\n";
        assert!(parse_feed(bad).unwrap_err().starts_with("line 2"));
    }

    #[test]
    fn test_summarize() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let mut snapshot = Snapshot::fresh(now, GrantConfig::default());
        snapshot.timer.set_remaining(3_725);
        snapshot.total_bits = 12_500;
        let view = TimerView::from_snapshot(&snapshot, ServiceStats::default(), now);

        let text = summarize(&view);
        assert!(text.starts_with("Remaining  01:02:05 (paused)"));
        assert!(text.contains("bits 12,500"));
        assert!(text.ends_with("Goal       none"));
    }
}
