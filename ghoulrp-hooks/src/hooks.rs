//! Integration hooks for the chat platform.
//!
//! These translate platform events and administrator commands into engine
//! calls. Rendering (embeds, mentions) stays in the platform adapter; the
//! hooks only return data.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use ghoulrp_core::config::AccrualConfig;
use ghoulrp_core::curve::LevelProgress;
use ghoulrp_core::eligibility::{EligibilityRegistry, Toggle};
use ghoulrp_core::engine::ProgressionEngine;
use ghoulrp_core::types::{ChannelId, GuildId, UserId};
use ghoulrp_core::Result;

use crate::events::{IgnoreReason, LevelUpNotice, PassiveOutcome, TextEvent};

/// Cells in the text progress bar.
pub const PROGRESS_BAR_WIDTH: usize = 20;

// ---------------------------------------------------------------------------
// Passive XP
// ---------------------------------------------------------------------------

/// Awards a small random amount of XP for role-play messages in flagged
/// channels.
#[derive(Debug)]
pub struct PassiveXpHook {
    engine: ProgressionEngine,
    registry: EligibilityRegistry,
    accrual: AccrualConfig,
    rng: Mutex<StdRng>,
}

impl PassiveXpHook {
    /// Create a hook with an entropy-seeded RNG.
    #[must_use]
    pub fn new(engine: ProgressionEngine, accrual: AccrualConfig) -> Self {
        Self::with_rng(engine, accrual, StdRng::from_entropy())
    }

    /// Create a hook with a fixed seed, for reproducible deltas.
    #[must_use]
    pub fn with_seed(engine: ProgressionEngine, accrual: AccrualConfig, seed: u64) -> Self {
        Self::with_rng(engine, accrual, StdRng::seed_from_u64(seed))
    }

    fn with_rng(engine: ProgressionEngine, accrual: AccrualConfig, rng: StdRng) -> Self {
        let registry = EligibilityRegistry::new(std::sync::Arc::clone(engine.store()));
        Self {
            engine,
            registry,
            accrual,
            rng: Mutex::new(rng),
        }
    }

    /// Handle one text message.
    ///
    /// Checks run cheapest first: bot author, command prefix, channel flag,
    /// then content length. Only a message passing all four reaches the
    /// engine.
    ///
    /// # Errors
    ///
    /// Returns a storage error from the eligibility lookup or the XP write.
    pub async fn on_passive_text_event(&self, event: &TextEvent) -> Result<PassiveOutcome> {
        if event.author_is_bot {
            return Ok(PassiveOutcome::Ignored(IgnoreReason::BotAuthor));
        }
        if event.content.starts_with(&self.accrual.command_prefix) {
            return Ok(PassiveOutcome::Ignored(IgnoreReason::Command));
        }
        if !self.registry.is_enabled(event.channel_id).await? {
            trace!(channel = %event.channel_id, "Message in non-XP channel");
            return Ok(PassiveOutcome::Ignored(IgnoreReason::IneligibleChannel));
        }
        if event.content.trim().chars().count() < self.accrual.min_content_chars {
            return Ok(PassiveOutcome::Ignored(IgnoreReason::TooShort));
        }

        let delta = self.roll_delta();
        let outcome = self.engine.apply_xp_delta(event.author, delta).await?;
        debug!(
            user = %event.author,
            channel = %event.channel_id,
            delta,
            "Passive XP awarded"
        );

        let notice = outcome.leveled_up.then_some(LevelUpNotice {
            user_id: event.author,
            channel_id: event.channel_id,
            old_level: outcome.old_level,
            new_level: outcome.new_level,
            reward: outcome.reward,
        });
        Ok(PassiveOutcome::Accrued {
            delta,
            outcome,
            notice,
        })
    }

    /// Draw a delta uniformly from the configured range, rounded to one
    /// decimal place.
    pub fn roll_delta(&self) -> f64 {
        let raw = self
            .rng
            .lock()
            .gen_range(self.accrual.min_delta..=self.accrual.max_delta);
        (raw * 10.0).round() / 10.0
    }
}

// ---------------------------------------------------------------------------
// Channel administration
// ---------------------------------------------------------------------------

/// Backs the administrator commands that manage XP channels.
#[derive(Debug, Clone)]
pub struct ChannelAdmin {
    registry: EligibilityRegistry,
}

impl ChannelAdmin {
    /// Create an admin facade over `registry`.
    #[must_use]
    pub fn new(registry: EligibilityRegistry) -> Self {
        Self { registry }
    }

    /// Flip the XP flag of the channel the command was issued in.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn toggle(&self, channel_id: ChannelId, guild_id: GuildId) -> Result<Toggle> {
        self.registry.toggle(channel_id, guild_id).await
    }

    /// The guild's XP channels by registration time.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list(&self, guild_id: GuildId) -> Result<Vec<ChannelId>> {
        self.registry.list(guild_id).await
    }
}

// ---------------------------------------------------------------------------
// Progress report
// ---------------------------------------------------------------------------

/// Everything the `xp` command shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Whose progress this is.
    pub user_id: UserId,
    /// Position inside the current level.
    pub progress: LevelProgress,
    /// Unspent stat points.
    pub stat_points: u32,
    /// Text bar of [`PROGRESS_BAR_WIDTH`] cells.
    pub bar: String,
}

/// Progress for `user_id`, provisioning a player for first-time users.
///
/// # Errors
///
/// Returns a storage error.
pub async fn progress_report(engine: &ProgressionEngine, user_id: UserId) -> Result<ProgressReport> {
    let snapshot = engine.player_progress(user_id).await?;
    Ok(ProgressReport {
        user_id,
        progress: snapshot.progress,
        stat_points: snapshot.stat_points,
        bar: render_bar(&snapshot.progress, PROGRESS_BAR_WIDTH),
    })
}

/// `█` for filled cells, `░` for the rest.
#[must_use]
pub fn render_bar(progress: &LevelProgress, width: usize) -> String {
    let filled = progress.filled_cells(width).min(width);
    let mut bar = "█".repeat(filled);
    bar.push_str(&"░".repeat(width - filled));
    bar
}
