//! Terminal overlay for the subathon timer
//!
//! Run with: cargo run -p subathon-overlay -- [server-url] [poll-seconds]
//!
//! Ticks a local replica every second and re-pulls the service state every
//! poll interval (5 s by default). Each tick prints one status line.

use std::env;
use std::time::Duration;

use chrono::Utc;
use subathon_core::AppConfig;
use subathon_core::state::SnapshotStore;
use subathon_overlay::{Replica, SyncClient, TimerBackend};
use subathon_types::formatting::{format_clock, format_count, is_warning};
use tracing_subscriber::filter::EnvFilter;

const DEFAULT_POLL_SECS: u64 = 5;

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn status_line<B: TimerBackend>(replica: &Replica<B>) -> String {
    let timer = replica.timer();
    let remaining = timer.remaining_seconds();
    let marker = if is_warning(remaining) { " !" } else { "" };
    let state = if timer.is_running() { "running" } else { "paused" };
    format!(
        "{}{}  [{}]  subs {}  bits {}",
        format_clock(remaining),
        marker,
        state,
        format_count(timer.total_contributions(), false),
        format_count(replica.snapshot().total_bits, false),
    )
}

#[tokio::main]
async fn main() {
    init_logging();

    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Config unusable, continuing with defaults");
        AppConfig::default()
    });

    let args: Vec<String> = env::args().collect();
    let server = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| format!("http://{}", config.listen_addr));
    let poll_secs = args
        .get(2)
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_POLL_SECS);

    let store = SnapshotStore::in_dir(&config.data_dir().join("overlay"));
    let (mut replica, recovery) = Replica::open(SyncClient::new(server), store, Utc::now());
    tracing::info!(
        server = replica.backend().base_url(),
        poll_secs,
        ?recovery,
        "Overlay started"
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
        }
    };
    replica
        .run(Duration::from_secs(poll_secs), shutdown, |replica| {
            println!("{}", status_line(replica))
        })
        .await;
    tracing::info!("Overlay stopping");
}
