//! SQLite record store for players, characters, cooldowns and XP channels.
//!
//! ```sql
//! players     (user_id PK, level, xp, stat_points, created_at)
//! characters  (user_id PK, name, faction, level, experience, attributes…,
//!              kagune_quinque, profile…, wins, losses, status,
//!              created_at, last_combat)
//! cooldowns   (user_id, command_type, expires_at, PK(user_id, command_type))
//! xp_channels (channel_id PK, guild_id, added_at)
//! ```
//!
//! The single connection lives inside a [`Gate`]; every public method is one
//! gated operation. Methods named `mutate_*`, `check_cooldown`,
//! `toggle_channel` and `create_character_with_player` keep the gate for a
//! whole read-compute-write sequence. Composing two plain methods does not:
//! another caller may run in between.
//!
//! Schema evolution is additive only. Columns missing from an older database
//! are added on open, and `NULL`s in such rows are replaced by per-column
//! defaults when a record is read.

mod channel;
mod character;
mod cooldown;
mod player;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use crate::config::PersistenceConfig;
use crate::error::{ProgressionError, Result};
use crate::gate::Gate;
use crate::types::RecordKind;

/// Base tables, as created by the first bot release.
const BASE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS players (
        user_id     INTEGER PRIMARY KEY,
        level       INTEGER DEFAULT 1,
        xp          REAL DEFAULT 0.0,
        stat_points INTEGER DEFAULT 0,
        created_at  TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS characters (
        user_id        INTEGER PRIMARY KEY,
        name           TEXT NOT NULL,
        faction        TEXT NOT NULL,
        level          INTEGER DEFAULT 1,
        experience     INTEGER DEFAULT 0,
        strength       INTEGER DEFAULT 10,
        agility        INTEGER DEFAULT 10,
        resistance     INTEGER DEFAULT 10,
        health         INTEGER DEFAULT 100,
        max_health     INTEGER DEFAULT 100,
        kagune_quinque TEXT,
        wins           INTEGER DEFAULT 0,
        losses         INTEGER DEFAULT 0,
        created_at     TEXT NOT NULL,
        last_combat    TEXT,
        status         TEXT DEFAULT 'active'
    );
    CREATE TABLE IF NOT EXISTS cooldowns (
        user_id      INTEGER,
        command_type TEXT,
        expires_at   TEXT,
        PRIMARY KEY (user_id, command_type)
    );
    CREATE TABLE IF NOT EXISTS xp_channels (
        channel_id INTEGER PRIMARY KEY,
        guild_id   INTEGER NOT NULL,
        added_at   TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS xp_channels_guild ON xp_channels (guild_id);
";

/// Columns added after the first release: `(table, column, declaration)`.
const ADDITIVE_COLUMNS: &[(&str, &str, &str)] = &[
    ("characters", "stamina", "INTEGER DEFAULT 50"),
    ("characters", "max_stamina", "INTEGER DEFAULT 50"),
    ("characters", "perception", "INTEGER DEFAULT 10"),
    ("characters", "rc_control", "INTEGER DEFAULT 10"),
    ("characters", "regeneration", "INTEGER DEFAULT 10"),
    ("characters", "quinque_aptitude", "INTEGER DEFAULT 10"),
    ("characters", "intellect", "INTEGER DEFAULT 10"),
    ("characters", "age", "TEXT"),
    ("characters", "gender", "TEXT"),
    ("characters", "appearance", "TEXT"),
    ("characters", "backstory", "TEXT"),
];

/// Handle to the progression database.
///
/// # Usage
///
/// ```no_run
/// # use ghoulrp_core::store::Store;
/// # use ghoulrp_core::config::PersistenceConfig;
/// # use ghoulrp_core::types::UserId;
/// # async fn demo() -> ghoulrp_core::Result<()> {
/// let store = Store::open("ghoulrp.db", &PersistenceConfig::default())?;
/// store.create_player(UserId(42)).await?;
/// let player = store.get_player(UserId(42)).await?;
/// # Ok(())
/// # }
/// ```
pub struct Store {
    gate: Gate<Connection>,
    db_path: PathBuf,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("db_path", &self.db_path)
            .field("gate_acquisitions", &self.gate.acquisitions())
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::StorageUnavailable`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.busy_timeout(Duration::from_millis(u64::from(config.busy_timeout_ms)))?;

        let added = init_schema(&conn)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            columns_added = added,
            "Progression store opened"
        );

        Ok(Self {
            gate: Gate::new(conn),
            db_path,
        })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::StorageUnavailable`] on SQLite failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            gate: Gate::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Path to the database file (or `:memory:`).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// How many storage operations have entered the gate so far.
    #[must_use]
    pub fn gate_acquisitions(&self) -> u64 {
        self.gate.acquisitions()
    }

    /// Run SQLite's integrity check.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::StorageUnavailable`] if the check itself
    /// cannot run.
    pub async fn integrity_check(&self) -> Result<bool> {
        self.gate
            .run("integrity_check", |conn| {
                let result: String =
                    conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
                Ok(result == "ok")
            })
            .await
    }

    /// Copy the database to `dest_path` with SQLite's online-backup API.
    ///
    /// Holds the gate for the duration, so the copy is consistent.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::StorageUnavailable`] on SQLite failures.
    pub async fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let dest_path = dest_path.as_ref();
        self.gate
            .run("backup", |conn| {
                let start = Instant::now();
                let mut dest = Connection::open(dest_path)?;
                let backup = rusqlite::backup::Backup::new(conn, &mut dest)?;
                backup.run_to_completion(256, Duration::from_millis(10), None)?;
                info!(
                    dest = %dest_path.display(),
                    elapsed_ms = start.elapsed().as_millis(),
                    "Database backup completed"
                );
                Ok(())
            })
            .await
    }
}

/// Create base tables and add any missing columns. Returns how many columns
/// were added.
fn init_schema(conn: &Connection) -> Result<usize> {
    conn.execute_batch(BASE_SCHEMA)?;

    let mut added = 0;
    for table in ["players", "characters", "cooldowns", "xp_channels"] {
        let existing = table_columns(conn, table)?;
        for &(_, column, decl) in ADDITIVE_COLUMNS.iter().filter(|(t, _, _)| *t == table) {
            if !existing.contains(column) {
                conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl};"))?;
                debug!(table, column, "Added missing column");
                added += 1;
            }
        }
    }
    Ok(added)
}

fn table_columns(conn: &Connection, table: &str) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<rusqlite::Result<HashSet<_>>>()?;
    Ok(names)
}

/// Map a primary-key or unique violation to [`ProgressionError::DuplicateKey`].
fn insert_unique(
    result: rusqlite::Result<usize>,
    kind: RecordKind,
    key: impl ToString,
) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Err(ProgressionError::DuplicateKey {
                kind,
                key: key.to_string(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Fold a duplicate insert into a `false` outcome.
fn created(result: Result<()>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(ProgressionError::DuplicateKey { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Read a nullable column, substituting `default` for `NULL`.
fn column_or<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    column: &str,
    default: T,
) -> rusqlite::Result<T> {
    Ok(row.get::<_, Option<T>>(column)?.unwrap_or(default))
}
