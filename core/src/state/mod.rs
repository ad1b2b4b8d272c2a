pub mod activity;
pub mod ipc;
pub mod snapshot;

pub use activity::{ACTIVITY_CAPACITY, ActivityEntry, ActivityLog};
pub use ipc::{
    Ack, AddBitsRequest, AddTimeRequest, ContributorInfo, ErrorBody, MAX_ADD_SECONDS,
    MutationResponse, ServiceStats, SetGoalRequest, SetTimeRequest, StatePatch, TimerView,
};
pub use snapshot::{SNAPSHOT_FILE, Snapshot, SnapshotStore};
