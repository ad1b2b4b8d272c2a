//! Process configuration loaded through confy.
//!
//! This only seeds a fresh timer. Once a snapshot exists, the grant config
//! stored in it wins over the one here.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use subathon_types::GrantConfig;

use crate::error::ConfigError;
use crate::state::SnapshotStore;

pub const APP_NAME: &str = "subathon";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    /// Where the snapshot and logs live. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    /// Channel the notification feed is subscribed to.
    pub channel: String,
    /// Optional JSON-lines file of raw notifications to follow.
    pub feed_path: Option<PathBuf>,
    pub grants: GrantConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            data_dir: None,
            channel: String::new(),
            feed_path: None,
            grants: GrantConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the per-user config location, creating it with defaults if missing.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = confy::load(APP_NAME, None)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = confy::load_path(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grants.validate().map_err(ConfigError::InvalidGrants)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_NAME)
        })
    }

    pub fn snapshot_store(&self) -> SnapshotStore {
        SnapshotStore::in_dir(&self.data_dir())
    }

    /// Problems worth a startup warning that do not prevent running.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.channel.trim().is_empty() {
            warnings.push(
                "no channel configured; only POST /api/feed and manual grants will add time"
                    .to_string(),
            );
        }
        if let Some(path) = &self.feed_path
            && !path.exists()
        {
            warnings.push(format!("feed file {} does not exist yet", path.display()));
        }
        warnings
    }
}
