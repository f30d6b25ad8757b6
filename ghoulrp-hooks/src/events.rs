//! Platform events consumed by the hooks, and the notices they produce.

use ghoulrp_core::engine::XpOutcome;
use ghoulrp_core::types::{ChannelId, GuildId, UserId};
use serde::{Deserialize, Serialize};

/// A text message seen by the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEvent {
    /// Author of the message.
    pub author: UserId,
    /// Whether the author is a bot account.
    pub author_is_bot: bool,
    /// Channel the message was posted in.
    pub channel_id: ChannelId,
    /// Guild of the channel; `None` for direct messages.
    pub guild_id: Option<GuildId>,
    /// Raw message text.
    pub content: String,
}

impl TextEvent {
    /// A direct message from a human author. Chain [`TextEvent::in_guild`]
    /// for guild channels.
    #[must_use]
    pub fn new(author: UserId, channel_id: ChannelId, content: impl Into<String>) -> Self {
        Self {
            author,
            author_is_bot: false,
            channel_id,
            guild_id: None,
            content: content.into(),
        }
    }

    /// Set the guild the channel belongs to.
    #[must_use]
    pub fn in_guild(mut self, guild_id: GuildId) -> Self {
        self.guild_id = Some(guild_id);
        self
    }
}

/// Why a text event earned no XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IgnoreReason {
    /// Posted by a bot account.
    BotAuthor,
    /// Starts with the command prefix.
    Command,
    /// The channel is not flagged for passive XP.
    IneligibleChannel,
    /// Trimmed content is shorter than the configured minimum.
    TooShort,
}

/// Data for a level-up announcement in the originating channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUpNotice {
    /// Who leveled up.
    pub user_id: UserId,
    /// Where to announce it.
    pub channel_id: ChannelId,
    /// Level before the message.
    pub old_level: u32,
    /// Level after the message.
    pub new_level: u32,
    /// Stat points granted.
    pub reward: u32,
}

/// What the passive XP hook did with an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PassiveOutcome {
    /// No XP was awarded.
    Ignored(IgnoreReason),
    /// XP was awarded; `notice` is set when a level was gained.
    Accrued {
        /// XP granted for the message.
        delta: f64,
        /// Engine result.
        outcome: XpOutcome,
        /// Announcement to send, if any.
        notice: Option<LevelUpNotice>,
    },
}

impl PassiveOutcome {
    /// The level-up notice, if this event produced one.
    #[must_use]
    pub fn notice(&self) -> Option<&LevelUpNotice> {
        match self {
            Self::Accrued { notice, .. } => notice.as_ref(),
            Self::Ignored(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_event_is_a_direct_message() {
        let dm = TextEvent::new(UserId(1), ChannelId(2), "hello there");
        assert_eq!(dm.guild_id, None);
        assert!(!dm.author_is_bot);

        let guild = dm.in_guild(GuildId(3));
        assert_eq!(guild.guild_id, Some(GuildId(3)));
        assert_eq!(guild.channel_id, ChannelId(2));
    }
}
