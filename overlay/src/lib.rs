//! Client side of the subathon timer.
//!
//! A [`Replica`] keeps its own [`subathon_core::TimerState`] ticking between
//! syncs and persists it locally, so a restart of the display does not reset
//! the visible countdown. Writes go to the authoritative service through a
//! [`TimerBackend`]; [`SyncClient`] is the HTTP implementation.

mod backend;
mod client;
mod replica;

pub use backend::{BackendError, TimerBackend};
pub use client::SyncClient;
pub use replica::Replica;
