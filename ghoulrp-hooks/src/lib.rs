//! # ghoulrp-hooks: chat-platform integration for GhoulRP
//!
//! This crate sits between the platform adapter (message events, slash
//! commands, embeds) and the platform-agnostic `ghoulrp-core` engine.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │           Chat platform adapter          │
//! │  ┌────────────────────────────────────┐  │
//! │  │          ghoulrp-hooks             │  │
//! │  │  ┌────────────┐  ┌──────────────┐  │  │
//! │  │  │   hooks    │  │   creation   │  │  │
//! │  │  └─────┬──────┘  └──────┬───────┘  │  │
//! │  │        ▼                ▼          │  │
//! │  │   ┌────────────────────────────┐   │  │
//! │  │   │        ghoulrp-core        │   │  │
//! │  │   └────────────────────────────┘   │  │
//! │  └────────────────────────────────────┘  │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `events`: inbound text events and outbound notices
//! - `hooks`: passive XP accrual, channel administration, progress reports
//! - `creation`: character-creation drafts, families and starter abilities

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod creation;
pub mod events;
pub mod hooks;
