//! Logging setup: stderr plus a size-rotated file under the data directory.

use std::path::{Path, PathBuf};

use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_FILE: &str = "subathon-server.log";
const MAX_LOG_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

/// Where the log file goes: `SUBATHON_LOG_PATH` if set, else `<data_dir>/logs`.
pub fn log_path(data_dir: &Path) -> PathBuf {
    std::env::var_os("SUBATHON_LOG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.join("logs").join(LOG_FILE))
}

/// Initialize the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process. If the file cannot be opened, logging continues
/// on stderr only.
pub fn init_logging(data_dir: &Path) -> Option<WorkerGuard> {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();
    let stderr = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    let path = log_path(data_dir);
    match open_appender(&path) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(true)
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            tracing::debug!(path = %path.display(), "File logging enabled");
            Some(guard)
        }
        Err(e) => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            tracing::warn!(path = %path.display(), error = %e, "File logging disabled");
            None
        }
    }
}

fn open_appender(path: &Path) -> std::io::Result<BasicRollingFileAppender> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    BasicRollingFileAppender::new(
        path,
        RollingConditionBasic::new().max_size(MAX_LOG_BYTES),
        MAX_LOG_FILES,
    )
}
