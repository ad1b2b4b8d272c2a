mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use subathon_core::AppConfig;
use subathon_overlay::SyncClient;
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Control the subathon timer")]
struct Cli {
    /// Base URL of the timer service (defaults to the configured listen address)
    #[arg(long, env = "SUBATHON_SERVER")]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current state
    State,
    Start,
    Pause,
    /// Zero the clock and the counters
    Reset,
    /// Overwrite the remaining time
    Set {
        #[arg(allow_negative_numbers = true)]
        seconds: i64,
    },
    /// Grant time
    Add {
        seconds: i64,
        #[arg(short, long, default_value = "manual")]
        reason: String,
        /// Gift count for a gift bomb (with --reason sub)
        #[arg(short, long)]
        gifts: Option<u32>,
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Set the goal deadline (RFC 3339) or `none` to clear it
    Goal { when: String },
    /// Add to the bits total
    Bits { bits: u64 },
    /// Clear the activity list and totals, keep the clock
    ResetList,
    /// Reset everything, including goal and grant config
    FullReset,
    /// Submit notifications from a JSON or JSON-lines file
    Feed { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::WARN.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let server = match cli.server {
        Some(server) => server,
        None => {
            let config = AppConfig::load().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Config unusable, using defaults");
                AppConfig::default()
            });
            format!("http://{}", config.listen_addr)
        }
    };
    let client = SyncClient::new(server);

    let output = match cli.command {
        Commands::State => commands::show_state(&client).await,
        Commands::Start => commands::start(&client).await,
        Commands::Pause => commands::pause(&client).await,
        Commands::Reset => commands::reset(&client).await,
        Commands::Set { seconds } => commands::set_time(&client, seconds).await,
        Commands::Add {
            seconds,
            reason,
            gifts,
            user,
        } => commands::add_time(&client, seconds, reason, gifts, user).await,
        Commands::Goal { when } => commands::set_goal(&client, &when).await,
        Commands::Bits { bits } => commands::add_bits(&client, bits).await,
        Commands::ResetList => commands::reset_list(&client).await,
        Commands::FullReset => commands::full_reset(&client).await,
        Commands::Feed { path } => commands::feed_file(&client, &path).await,
    }?;

    println!("{output}");
    Ok(())
}
