//! Player (XP track) primitives.

use std::time::Instant;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use super::{Store, column_or, created, insert_unique};
use crate::error::Result;
use crate::records::{Player, PlayerSeed, PlayerUpdate};
use crate::types::{RecordKind, SqlTime, UserId};

const SELECT_PLAYER: &str =
    "SELECT user_id, level, xp, stat_points, created_at FROM players WHERE user_id = ?1";

fn map_player(row: &rusqlite::Row<'_>) -> rusqlite::Result<Player> {
    Ok(Player {
        user_id: row.get("user_id")?,
        level: column_or(row, "level", 1u32)?.max(1),
        xp: column_or(row, "xp", 0.0f64)?,
        stat_points: column_or(row, "stat_points", 0u32)?,
        created_at: row.get::<_, SqlTime>("created_at")?.0,
    })
}

fn select(conn: &Connection, user_id: UserId) -> Result<Option<Player>> {
    let mut stmt = conn.prepare_cached(SELECT_PLAYER)?;
    Ok(stmt.query_row(params![user_id], map_player).optional()?)
}

fn insert(conn: &Connection, user_id: UserId, stat_points: u32) -> Result<()> {
    let result = conn.execute(
        "INSERT INTO players (user_id, level, xp, stat_points, created_at)
         VALUES (?1, 1, 0.0, ?2, ?3)",
        params![user_id, stat_points, SqlTime(Utc::now())],
    );
    insert_unique(result, RecordKind::Player, user_id)
}

fn apply(conn: &Connection, user_id: UserId, update: &PlayerUpdate) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE players SET
            level       = COALESCE(?2, level),
            xp          = COALESCE(?3, xp),
            stat_points = COALESCE(?4, stat_points)
         WHERE user_id = ?1",
        params![user_id, update.level, update.xp, update.stat_points],
    )?;
    Ok(changed > 0)
}

/// Existing row, or a freshly inserted default one.
fn select_or_insert(conn: &Connection, user_id: UserId) -> Result<Player> {
    if let Some(player) = select(conn, user_id)? {
        return Ok(player);
    }
    insert(conn, user_id, 0)?;
    debug!(user = %user_id, "Provisioned player on first use");
    select(conn, user_id)?.ok_or_else(|| crate::ProgressionError::not_found(RecordKind::Player, user_id))
}

/// Insert the player with bonus points, or credit the bonus to an existing
/// row. XP and level are never reset.
pub(super) fn upsert_seeded(conn: &Connection, user_id: UserId, seed: PlayerSeed) -> Result<Player> {
    conn.execute(
        "INSERT INTO players (user_id, level, xp, stat_points, created_at)
         VALUES (?1, 1, 0.0, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET
            stat_points = COALESCE(stat_points, 0) + excluded.stat_points",
        params![user_id, seed.bonus_stat_points, SqlTime(Utc::now())],
    )?;
    select(conn, user_id)?.ok_or_else(|| crate::ProgressionError::not_found(RecordKind::Player, user_id))
}

impl Store {
    /// Insert a default player. Returns `false` if one already exists.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProgressionError::StorageUnavailable`] on SQLite failures.
    pub async fn create_player(&self, user_id: UserId) -> Result<bool> {
        self.gate
            .run("create_player", |conn| created(insert(conn, user_id, 0)))
            .await
    }

    /// Load a player, or `None` if the user has never been seen.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProgressionError::StorageUnavailable`] on SQLite
    /// failures or an undecodable row.
    pub async fn get_player(&self, user_id: UserId) -> Result<Option<Player>> {
        self.gate.run("get_player", |conn| select(conn, user_id)).await
    }

    /// Apply a validated column update. Returns `false` if no row matched.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProgressionError::InvalidUpdate`] before touching
    /// storage if the request is empty or out of range.
    pub async fn update_player(&self, user_id: UserId, update: PlayerUpdate) -> Result<bool> {
        update.validate()?;
        self.gate
            .run("update_player", |conn| apply(conn, user_id, &update))
            .await
    }

    /// Create the player with `seed` applied, or credit the seed's bonus
    /// points to an existing player.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProgressionError::StorageUnavailable`] on SQLite failures.
    pub async fn create_or_update_player(&self, user_id: UserId, seed: PlayerSeed) -> Result<Player> {
        self.gate
            .run("create_or_update_player", |conn| upsert_seeded(conn, user_id, seed))
            .await
    }

    /// Get-or-create the player, let `f` compute an update, and write it,
    /// all inside one gate hold.
    ///
    /// `f` returns the update to apply (empty means "write nothing") and a
    /// value handed back to the caller. If `f` fails nothing is written.
    ///
    /// # Errors
    ///
    /// Propagates errors from `f`, update validation, or SQLite.
    pub async fn mutate_player<R>(
        &self,
        user_id: UserId,
        f: impl FnOnce(&Player) -> Result<(PlayerUpdate, R)>,
    ) -> Result<R> {
        self.gate
            .run("mutate_player", |conn| {
                let start = Instant::now();
                let player = select_or_insert(conn, user_id)?;
                let (update, out) = f(&player)?;
                if !update.is_empty() {
                    update.validate()?;
                    apply(conn, user_id, &update)?;
                }
                debug!(
                    user = %user_id,
                    wrote = !update.is_empty(),
                    elapsed_us = start.elapsed().as_micros(),
                    "Mutated player"
                );
                Ok(out)
            })
            .await
    }

    /// Number of stored players.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProgressionError::StorageUnavailable`] on SQLite failures.
    pub async fn player_count(&self) -> Result<usize> {
        self.gate
            .run("player_count", |conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))?;
                Ok(usize::try_from(count).unwrap_or(0))
            })
            .await
    }
}
