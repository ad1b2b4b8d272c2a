//! Authoritative subathon timer service: the single owner loop, its HTTP
//! surface and the feed follower.

pub mod feed;
pub mod logging;
pub mod router;
pub mod service;
