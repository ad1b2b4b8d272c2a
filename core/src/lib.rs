pub mod context;
pub mod error;
pub mod events;
pub mod state;
pub mod timer;

// Re-exports for convenience
pub use context::AppConfig;
pub use error::{ConfigError, NormalizationError, PersistenceError, RequestError};
pub use events::{FeedNotice, Normalized, RawEvent, TimeGrant, normalize};
pub use state::{Snapshot, SnapshotStore};
pub use subathon_types::{GrantConfig, GrantKind, Tier};
pub use timer::{Phase, Recovery, Tick, TimerState};
