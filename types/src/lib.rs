pub mod formatting;
mod grants;

pub use grants::{GrantConfig, GrantKind, Tier, TierSeconds};
