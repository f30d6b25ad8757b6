//! Per-channel passive-XP flag. A channel is eligible exactly when it is
//! registered.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::store::Store;
use crate::types::{ChannelId, GuildId};

/// State of a channel after [`EligibilityRegistry::toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Toggle {
    /// The channel now earns passive XP.
    Enabled,
    /// The channel no longer earns passive XP.
    Disabled,
}

/// Registry of XP-eligible channels.
#[derive(Debug, Clone)]
pub struct EligibilityRegistry {
    store: Arc<Store>,
}

impl EligibilityRegistry {
    /// Create a registry over `store`.
    #[must_use]
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Flag a channel. Returns `false` if it was already flagged.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn enable(&self, channel_id: ChannelId, guild_id: GuildId) -> Result<bool> {
        let added = self.store.add_channel(channel_id, guild_id).await?;
        if added {
            info!(channel = %channel_id, guild = %guild_id, "XP channel enabled");
        }
        Ok(added)
    }

    /// Unflag a channel. Returns `false` if nothing was removed.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn disable(&self, channel_id: ChannelId) -> Result<bool> {
        let removed = self.store.remove_channel(channel_id).await?;
        if removed {
            info!(channel = %channel_id, "XP channel disabled");
        }
        Ok(removed)
    }

    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn is_enabled(&self, channel_id: ChannelId) -> Result<bool> {
        self.store.channel_exists(channel_id).await
    }

    /// Flagged channels of a guild by registration time.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list(&self, guild_id: GuildId) -> Result<Vec<ChannelId>> {
        self.store.channels_for_guild(guild_id).await
    }

    /// Flip a channel's flag in one gated step.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn toggle(&self, channel_id: ChannelId, guild_id: GuildId) -> Result<Toggle> {
        let state = if self.store.toggle_channel(channel_id, guild_id).await? {
            Toggle::Enabled
        } else {
            Toggle::Disabled
        };
        info!(channel = %channel_id, guild = %guild_id, ?state, "XP channel toggled");
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> EligibilityRegistry {
        EligibilityRegistry::new(Arc::new(Store::open_in_memory().expect("open")))
    }

    #[tokio::test]
    async fn double_enable_and_disable() {
        let registry = registry();
        assert!(registry.enable(ChannelId(1), GuildId(9)).await.expect("enable"));
        assert!(!registry.enable(ChannelId(1), GuildId(9)).await.expect("enable again"));
        assert!(registry.is_enabled(ChannelId(1)).await.expect("enabled"));

        assert!(registry.disable(ChannelId(1)).await.expect("disable"));
        assert!(!registry.disable(ChannelId(1)).await.expect("disable again"));
        assert!(!registry.is_enabled(ChannelId(1)).await.expect("enabled"));
    }

    #[tokio::test]
    async fn toggle_round_trip() {
        let registry = registry();
        assert_eq!(
            registry.toggle(ChannelId(2), GuildId(9)).await.expect("toggle"),
            Toggle::Enabled
        );
        assert_eq!(registry.list(GuildId(9)).await.expect("list"), vec![ChannelId(2)]);
        assert_eq!(
            registry.toggle(ChannelId(2), GuildId(9)).await.expect("toggle"),
            Toggle::Disabled
        );
        assert!(registry.list(GuildId(9)).await.expect("list").is_empty());
    }
}
