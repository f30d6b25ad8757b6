//! # GhoulRP Core Library
//!
//! Player progression and persistence for a role-play community bot.
//!
//! Two progression tracks live side by side:
//!
//! - **XP track** ([`Player`]): fractional XP earned passively by role-playing
//!   in flagged channels, a geometric level curve, and stat points as reward.
//! - **Character track** ([`Character`]): integer experience, a square-root
//!   level curve capped at 50, and attribute increases as reward.
//!
//! Every storage primitive runs inside a single [`gate::Gate`], so only one
//! operation touches the database at a time. Read-modify-write sequences that
//! must not interleave use the combined `mutate_*` primitives of
//! [`store::Store`], which hold the gate for the whole sequence.
//!
//! ## Components
//!
//! | Module          | Responsibility                                  |
//! |-----------------|-------------------------------------------------|
//! | [`curve`]       | Pure level/threshold math for both tracks       |
//! | [`store`]       | SQLite record store for the four record kinds   |
//! | [`gate`]        | Process-wide serialization of storage access    |
//! | [`engine`]      | Applies deltas, detects level-ups, pays rewards |
//! | [`cooldown`]    | Per-user, per-action expiry with lazy eviction  |
//! | [`eligibility`] | Per-channel passive-XP flag                     |

#![deny(clippy::unwrap_used)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod config;
pub mod cooldown;
pub mod curve;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod gate;
pub mod records;
pub mod store;
pub mod types;

pub use config::GhoulConfig;
pub use engine::ProgressionEngine;
pub use error::{ProgressionError, Result};
pub use records::{Character, NewCharacter, Player};
pub use store::Store;
pub use types::*;
