//! Cooldown primitives. Expired rows are only removed by an explicit delete
//! or by [`Store::check_cooldown`].

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use super::Store;
use crate::error::Result;
use crate::records::Cooldown;
use crate::types::{SqlTime, UserId};

fn select(conn: &Connection, user_id: UserId, action: &str) -> Result<Option<Cooldown>> {
    let mut stmt = conn.prepare_cached(
        "SELECT user_id, command_type, expires_at FROM cooldowns
         WHERE user_id = ?1 AND command_type = ?2",
    )?;
    let row = stmt
        .query_row(params![user_id, action], |row| {
            Ok(Cooldown {
                user_id: row.get("user_id")?,
                command_type: row.get("command_type")?,
                expires_at: row.get::<_, SqlTime>("expires_at")?.0,
            })
        })
        .optional()?;
    Ok(row)
}

fn delete(conn: &Connection, user_id: UserId, action: &str) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM cooldowns WHERE user_id = ?1 AND command_type = ?2",
        params![user_id, action],
    )?;
    Ok(removed > 0)
}

impl Store {
    /// Set (or replace) the expiry of `action` for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProgressionError::StorageUnavailable`] on SQLite failures.
    pub async fn set_cooldown(
        &self,
        user_id: UserId,
        action: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.gate
            .run("set_cooldown", |conn| {
                conn.execute(
                    "INSERT INTO cooldowns (user_id, command_type, expires_at)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(user_id, command_type) DO UPDATE SET
                        expires_at = excluded.expires_at",
                    params![user_id, action, SqlTime(expires_at)],
                )?;
                debug!(user = %user_id, action, %expires_at, "Cooldown set");
                Ok(())
            })
            .await
    }

    /// Stored cooldown for `action`, expired or not.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProgressionError::StorageUnavailable`] on SQLite
    /// failures or an undecodable expiry.
    pub async fn get_cooldown(&self, user_id: UserId, action: &str) -> Result<Option<Cooldown>> {
        self.gate
            .run("get_cooldown", |conn| select(conn, user_id, action))
            .await
    }

    /// Remove a cooldown. Returns `false` if none was stored.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProgressionError::StorageUnavailable`] on SQLite failures.
    pub async fn delete_cooldown(&self, user_id: UserId, action: &str) -> Result<bool> {
        self.gate
            .run("delete_cooldown", |conn| delete(conn, user_id, action))
            .await
    }

    /// Expiry of a still-active cooldown, or `None`.
    ///
    /// A cooldown that has expired by `now` is deleted in the same gate hold.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProgressionError::StorageUnavailable`] on SQLite failures.
    pub async fn check_cooldown(
        &self,
        user_id: UserId,
        action: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        self.gate
            .run("check_cooldown", |conn| {
                let Some(cooldown) = select(conn, user_id, action)? else {
                    return Ok(None);
                };
                if cooldown.expires_at > now {
                    return Ok(Some(cooldown.expires_at));
                }
                delete(conn, user_id, action)?;
                debug!(user = %user_id, action, "Expired cooldown removed");
                Ok(None)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[tokio::test]
    async fn set_replaces_previous_expiry() {
        let store = Store::open_in_memory().expect("open");
        let now = Utc::now();
        store
            .set_cooldown(UserId(1), "duel", now + TimeDelta::minutes(5))
            .await
            .expect("set");
        store
            .set_cooldown(UserId(1), "duel", now + TimeDelta::minutes(1))
            .await
            .expect("replace");

        let cooldown = store
            .get_cooldown(UserId(1), "duel")
            .await
            .expect("get")
            .expect("Some");
        assert_eq!(cooldown.command_type, "duel");
        assert!((cooldown.expires_at - (now + TimeDelta::minutes(1))).num_milliseconds().abs() < 1);
    }

    #[tokio::test]
    async fn actions_are_independent() {
        let store = Store::open_in_memory().expect("open");
        let later = Utc::now() + TimeDelta::hours(1);
        store.set_cooldown(UserId(2), "duel", later).await.expect("set");
        assert!(store.get_cooldown(UserId(2), "train").await.expect("get").is_none());
        assert!(store.get_cooldown(UserId(3), "duel").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn check_deletes_expired_rows() {
        let store = Store::open_in_memory().expect("open");
        let now = Utc::now();
        store
            .set_cooldown(UserId(4), "duel", now - TimeDelta::seconds(1))
            .await
            .expect("set");

        assert!(store.check_cooldown(UserId(4), "duel", now).await.expect("check").is_none());
        assert!(store.get_cooldown(UserId(4), "duel").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn check_keeps_active_rows() {
        let store = Store::open_in_memory().expect("open");
        let now = Utc::now();
        let expires = now + TimeDelta::minutes(5);
        store.set_cooldown(UserId(5), "duel", expires).await.expect("set");

        let active = store
            .check_cooldown(UserId(5), "duel", now)
            .await
            .expect("check")
            .expect("active");
        assert!((active - expires).num_milliseconds().abs() < 1);
        assert!(store.delete_cooldown(UserId(5), "duel").await.expect("delete"));
        assert!(!store.delete_cooldown(UserId(5), "duel").await.expect("delete again"));
    }
}
