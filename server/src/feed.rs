//! Follow a JSON-lines notification file written by the chat bridge.
//!
//! Reading starts at the end of the file: notifications written before the
//! server started were already granted by the previous run or are stale.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use subathon_core::RawEvent;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::time::sleep;

use crate::service::{ServiceError, ServiceHandle};

pub const DEFAULT_POLL: Duration = Duration::from_millis(250);

/// Decode one line. Blank lines are `None`.
pub fn parse_line(line: &str) -> Option<Result<RawEvent, serde_json::Error>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(serde_json::from_str(trimmed))
}

/// Tail `path` and forward every notification to the service until it shuts down.
pub async fn follow(path: PathBuf, handle: ServiceHandle, poll: Duration) {
    loop {
        match tail(&path, &handle, poll).await {
            Ok(()) => return,
            Err(TailError::Closed) => return,
            Err(TailError::Io(e)) => {
                tracing::warn!(path = %path.display(), error = %e, "Feed file unavailable, retrying");
                sleep(poll.max(Duration::from_secs(1))).await;
            }
        }
    }
}

enum TailError {
    Io(std::io::Error),
    Closed,
}

impl From<std::io::Error> for TailError {
    fn from(e: std::io::Error) -> Self {
        TailError::Io(e)
    }
}

impl From<ServiceError> for TailError {
    fn from(_: ServiceError) -> Self {
        TailError::Closed
    }
}

async fn tail(path: &Path, handle: &ServiceHandle, poll: Duration) -> Result<(), TailError> {
    let file = File::open(path).await?;
    let mut reader = BufReader::new(file);
    let mut pos = reader.seek(SeekFrom::End(0)).await?;
    tracing::info!(path = %path.display(), offset = pos, "Following feed");

    let mut line = String::new();
    loop {
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            if handle.is_closed() {
                return Ok(());
            }
            // Truncated or replaced: start over from the top of the new file.
            if tokio::fs::metadata(path).await?.len() < pos {
                tracing::info!(path = %path.display(), "Feed file truncated");
                pos = reader.seek(SeekFrom::Start(0)).await?;
                line.clear();
                continue;
            }
            sleep(poll).await;
            continue;
        }
        pos += read as u64;

        // A partial write; wait for the rest of the line.
        if !line.ends_with('\n') {
            continue;
        }

        match parse_line(&line) {
            None => {}
            Some(Ok(event)) => match handle.ingest(event).await {
                Ok(_) | Err(ServiceError::Write(_)) => {}
                Err(e @ ServiceError::Closed) => return Err(e.into()),
            },
            Some(Err(e)) => {
                tracing::warn!(error = %e, line = line.trim(), "Undecodable feed line");
                handle.notification_dropped().await?;
            }
        }
        line.clear();
    }
}
