//! XP-channel eligibility primitives.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use super::{Store, created, insert_unique};
use crate::error::Result;
use crate::records::EligibleChannel;
use crate::types::{ChannelId, GuildId, RecordKind, SqlTime};

fn insert(conn: &Connection, channel_id: ChannelId, guild_id: GuildId) -> Result<()> {
    let result = conn.execute(
        "INSERT INTO xp_channels (channel_id, guild_id, added_at) VALUES (?1, ?2, ?3)",
        params![channel_id, guild_id, SqlTime(Utc::now())],
    );
    insert_unique(result, RecordKind::EligibleChannel, channel_id)
}

fn delete(conn: &Connection, channel_id: ChannelId) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM xp_channels WHERE channel_id = ?1",
        params![channel_id],
    )?;
    Ok(removed > 0)
}

fn exists(conn: &Connection, channel_id: ChannelId) -> Result<bool> {
    let mut stmt = conn.prepare_cached("SELECT 1 FROM xp_channels WHERE channel_id = ?1")?;
    Ok(stmt.exists(params![channel_id])?)
}

impl Store {
    /// Mark a channel as XP-eligible. Returns `false` if it already was.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProgressionError::StorageUnavailable`] on SQLite failures.
    pub async fn add_channel(&self, channel_id: ChannelId, guild_id: GuildId) -> Result<bool> {
        self.gate
            .run("add_channel", |conn| created(insert(conn, channel_id, guild_id)))
            .await
    }

    /// Remove a channel. Returns `false` if it was not registered.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProgressionError::StorageUnavailable`] on SQLite failures.
    pub async fn remove_channel(&self, channel_id: ChannelId) -> Result<bool> {
        self.gate
            .run("remove_channel", |conn| delete(conn, channel_id))
            .await
    }

    /// Whether the channel is registered.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProgressionError::StorageUnavailable`] on SQLite failures.
    pub async fn channel_exists(&self, channel_id: ChannelId) -> Result<bool> {
        self.gate
            .run("channel_exists", |conn| exists(conn, channel_id))
            .await
    }

    /// Full registration record for a channel.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProgressionError::StorageUnavailable`] on SQLite failures.
    pub async fn get_channel(&self, channel_id: ChannelId) -> Result<Option<EligibleChannel>> {
        self.gate
            .run("get_channel", |conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT channel_id, guild_id, added_at FROM xp_channels WHERE channel_id = ?1",
                )?;
                let channel = stmt
                    .query_row(params![channel_id], |row| {
                        Ok(EligibleChannel {
                            channel_id: row.get("channel_id")?,
                            guild_id: row.get("guild_id")?,
                            added_at: row.get::<_, SqlTime>("added_at")?.0,
                        })
                    })
                    .optional()?;
                Ok(channel)
            })
            .await
    }

    /// Registered channels of a guild by registration time, ties broken by
    /// channel id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProgressionError::StorageUnavailable`] on SQLite failures.
    pub async fn channels_for_guild(&self, guild_id: GuildId) -> Result<Vec<ChannelId>> {
        self.gate
            .run("channels_for_guild", |conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT channel_id FROM xp_channels
                     WHERE guild_id = ?1
                     ORDER BY added_at, channel_id",
                )?;
                let ids = stmt
                    .query_map(params![guild_id], |row| row.get::<_, ChannelId>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(ids)
            })
            .await
    }

    /// Flip a channel's registration. Returns `true` if the channel is
    /// enabled afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProgressionError::StorageUnavailable`] on SQLite failures.
    pub async fn toggle_channel(&self, channel_id: ChannelId, guild_id: GuildId) -> Result<bool> {
        self.gate
            .run("toggle_channel", |conn| {
                let enabled = if delete(conn, channel_id)? {
                    false
                } else {
                    insert(conn, channel_id, guild_id)?;
                    true
                };
                debug!(channel = %channel_id, guild = %guild_id, enabled, "Channel toggled");
                Ok(enabled)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_is_idempotent() {
        let store = Store::open_in_memory().expect("open");
        assert!(store.add_channel(ChannelId(10), GuildId(1)).await.expect("add"));
        assert!(!store.add_channel(ChannelId(10), GuildId(1)).await.expect("again"));
        assert!(store.channel_exists(ChannelId(10)).await.expect("exists"));

        let record = store.get_channel(ChannelId(10)).await.expect("get").expect("Some");
        assert_eq!(record.guild_id, GuildId(1));
    }

    #[tokio::test]
    async fn remove_reports_absence() {
        let store = Store::open_in_memory().expect("open");
        assert!(!store.remove_channel(ChannelId(11)).await.expect("remove"));
        store.add_channel(ChannelId(11), GuildId(1)).await.expect("add");
        assert!(store.remove_channel(ChannelId(11)).await.expect("remove"));
        assert!(!store.channel_exists(ChannelId(11)).await.expect("exists"));
    }

    #[tokio::test]
    async fn listing_is_scoped_to_guild() {
        let store = Store::open_in_memory().expect("open");
        store.add_channel(ChannelId(30), GuildId(1)).await.expect("add");
        store.add_channel(ChannelId(20), GuildId(1)).await.expect("add");
        store.add_channel(ChannelId(40), GuildId(2)).await.expect("add");

        let mut listed = store.channels_for_guild(GuildId(1)).await.expect("list");
        listed.sort_by_key(|c| c.0);
        assert_eq!(listed, vec![ChannelId(20), ChannelId(30)]);
        assert!(store.channels_for_guild(GuildId(3)).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn listing_follows_registration_time() {
        let store = Store::open_in_memory().expect("open");
        store
            .gate
            .run("seed_channels", |conn| {
                conn.execute_batch(
                    "INSERT INTO xp_channels (channel_id, guild_id, added_at) VALUES
                         (70, 1, '2026-01-03T00:00:00.000000Z'),
                         (90, 1, '2026-01-01T00:00:00.000000Z'),
                         (80, 1, '2026-01-02T00:00:00.000000Z'),
                         (60, 1, '2026-01-02T00:00:00.000000Z');",
                )
            })
            .await
            .expect("seed");

        assert_eq!(
            store.channels_for_guild(GuildId(1)).await.expect("list"),
            vec![ChannelId(90), ChannelId(60), ChannelId(80), ChannelId(70)],
            "ties on registration time fall back to channel id"
        );
    }

    #[tokio::test]
    async fn toggle_flips_state() {
        let store = Store::open_in_memory().expect("open");
        assert!(store.toggle_channel(ChannelId(50), GuildId(1)).await.expect("on"));
        assert!(store.channel_exists(ChannelId(50)).await.expect("exists"));
        assert!(!store.toggle_channel(ChannelId(50), GuildId(1)).await.expect("off"));
        assert!(!store.channel_exists(ChannelId(50)).await.expect("exists"));
    }
}
