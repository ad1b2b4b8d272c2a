//! Event normalization.
//!
//! Raw chat-feed notifications arrive as a closed set of tagged variants
//! ([`RawEvent`]). [`normalize`] turns each one into at most one
//! [`TimeGrant`]; informational notifications (raids, gift bundle
//! announcements) become a [`FeedNotice`] and never touch the timer.
//!
//! ```text
//!   RawEvent ──normalize(config)──▶ Normalized::Grant(TimeGrant) ──▶ TimerState::apply
//!                                 └▶ Normalized::Notice(FeedNotice) ──▶ log only
//! ```

mod grant;
mod normalize;
mod raw;

pub use grant::TimeGrant;
pub use normalize::{FeedNotice, Normalized, normalize};
pub use raw::RawEvent;
