//! Character (attribute track) primitives.

use std::time::Instant;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use super::{Store, column_or, created, insert_unique, player};
use crate::error::{ProgressionError, Result};
use crate::records::{
    Attributes, Character, CharacterUpdate, NewCharacter, Player, PlayerSeed, Profile,
};
use crate::types::{CharacterStatus, RecordKind, SqlTime, UserId};

const SELECT_CHARACTER: &str = "
    SELECT user_id, name, faction, level, experience,
           strength, agility, resistance, health, max_health,
           stamina, max_stamina, perception,
           rc_control, regeneration, quinque_aptitude, intellect,
           kagune_quinque, age, gender, appearance, backstory,
           wins, losses, status, created_at, last_combat
      FROM characters
     WHERE user_id = ?1";

fn map_character(row: &rusqlite::Row<'_>) -> rusqlite::Result<Character> {
    let base = Attributes::default();
    let attributes = Attributes {
        strength: column_or(row, "strength", base.strength)?,
        agility: column_or(row, "agility", base.agility)?,
        resistance: column_or(row, "resistance", base.resistance)?,
        health: column_or(row, "health", base.health)?,
        max_health: column_or(row, "max_health", base.max_health)?,
        stamina: column_or(row, "stamina", base.stamina)?,
        max_stamina: column_or(row, "max_stamina", base.max_stamina)?,
        perception: column_or(row, "perception", base.perception)?,
        rc_control: column_or(row, "rc_control", base.rc_control)?,
        regeneration: column_or(row, "regeneration", base.regeneration)?,
        quinque_aptitude: column_or(row, "quinque_aptitude", base.quinque_aptitude)?,
        intellect: column_or(row, "intellect", base.intellect)?,
    };
    let profile = Profile {
        name: row.get("name")?,
        age: column_or(row, "age", String::new())?,
        gender: column_or(row, "gender", String::new())?,
        appearance: column_or(row, "appearance", String::new())?,
        backstory: column_or(row, "backstory", String::new())?,
    };
    Ok(Character {
        user_id: row.get("user_id")?,
        faction: row.get("faction")?,
        level: column_or(row, "level", 1u32)?.max(1),
        experience: column_or(row, "experience", 0u64)?,
        attributes,
        kagune_quinque: column_or(row, "kagune_quinque", "Basic".to_string())?,
        profile,
        wins: column_or(row, "wins", 0u32)?,
        losses: column_or(row, "losses", 0u32)?,
        status: column_or(row, "status", CharacterStatus::Active)?,
        created_at: row.get::<_, SqlTime>("created_at")?.0,
        last_combat: row.get::<_, Option<SqlTime>>("last_combat")?.map(|t| t.0),
    })
}

fn select(conn: &Connection, user_id: UserId) -> Result<Option<Character>> {
    let mut stmt = conn.prepare_cached(SELECT_CHARACTER)?;
    Ok(stmt.query_row(params![user_id], map_character).optional()?)
}

fn insert(conn: &Connection, new: &NewCharacter) -> Result<()> {
    let a = &new.attributes;
    let p = &new.profile;
    let result = conn.execute(
        "INSERT INTO characters (
            user_id, name, faction, level, experience,
            strength, agility, resistance, health, max_health,
            stamina, max_stamina, perception,
            rc_control, regeneration, quinque_aptitude, intellect,
            kagune_quinque, age, gender, appearance, backstory,
            wins, losses, status, created_at
         ) VALUES (
            ?1, ?2, ?3, 1, 0,
            ?4, ?5, ?6, ?7, ?8,
            ?9, ?10, ?11,
            ?12, ?13, ?14, ?15,
            ?16, ?17, ?18, ?19, ?20,
            0, 0, ?21, ?22
         )",
        params![
            new.user_id,
            p.name,
            new.faction,
            a.strength,
            a.agility,
            a.resistance,
            a.health,
            a.max_health,
            a.stamina,
            a.max_stamina,
            a.perception,
            a.rc_control,
            a.regeneration,
            a.quinque_aptitude,
            a.intellect,
            new.kagune_quinque,
            p.age,
            p.gender,
            p.appearance,
            p.backstory,
            CharacterStatus::Active,
            SqlTime(Utc::now()),
        ],
    );
    insert_unique(result, RecordKind::Character, new.user_id)
}

fn apply(conn: &Connection, user_id: UserId, u: &CharacterUpdate) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE characters SET
            level          = COALESCE(?2, level),
            experience     = COALESCE(?3, experience),
            strength       = COALESCE(?4, strength),
            agility        = COALESCE(?5, agility),
            resistance     = COALESCE(?6, resistance),
            health         = COALESCE(?7, health),
            max_health     = COALESCE(?8, max_health),
            stamina        = COALESCE(?9, stamina),
            max_stamina    = COALESCE(?10, max_stamina),
            perception     = COALESCE(?11, perception),
            kagune_quinque = COALESCE(?12, kagune_quinque),
            wins           = COALESCE(?13, wins),
            losses         = COALESCE(?14, losses),
            status         = COALESCE(?15, status),
            last_combat    = COALESCE(?16, last_combat)
         WHERE user_id = ?1",
        params![
            user_id,
            u.level,
            u.experience,
            u.strength,
            u.agility,
            u.resistance,
            u.health,
            u.max_health,
            u.stamina,
            u.max_stamina,
            u.perception,
            u.kagune_quinque,
            u.wins,
            u.losses,
            u.status,
            u.last_combat.map(SqlTime),
        ],
    )?;
    Ok(changed > 0)
}

impl Store {
    /// Insert a character. Returns `false` if the user already has one.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::InvalidProfile`] before touching storage if
    /// the bundle fails validation.
    pub async fn create_character(&self, new: &NewCharacter) -> Result<bool> {
        new.validate()?;
        self.gate
            .run("create_character", |conn| created(insert(conn, new)))
            .await
    }

    /// Load a character, or `None` if the user never created one.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::StorageUnavailable`] on SQLite failures or
    /// an undecodable row.
    pub async fn get_character(&self, user_id: UserId) -> Result<Option<Character>> {
        self.gate.run("get_character", |conn| select(conn, user_id)).await
    }

    /// Apply a validated column update. Returns `false` if no row matched.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::InvalidUpdate`] before touching storage if
    /// the request is empty or out of range.
    pub async fn update_character(&self, user_id: UserId, update: &CharacterUpdate) -> Result<bool> {
        update.validate()?;
        self.gate
            .run("update_character", |conn| apply(conn, user_id, update))
            .await
    }

    /// Read the character, let `f` compute an update, and write it, all
    /// inside one gate hold. Characters are never auto-created.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::NotFound`] if the user has no character,
    /// and propagates errors from `f`, validation, or SQLite.
    pub async fn mutate_character<R>(
        &self,
        user_id: UserId,
        f: impl FnOnce(&Character) -> Result<(CharacterUpdate, R)>,
    ) -> Result<R> {
        self.gate
            .run("mutate_character", |conn| {
                let start = Instant::now();
                let character = select(conn, user_id)?
                    .ok_or_else(|| ProgressionError::not_found(RecordKind::Character, user_id))?;
                let (update, out) = f(&character)?;
                if !update.is_empty() {
                    update.validate()?;
                    apply(conn, user_id, &update)?;
                }
                debug!(
                    user = %user_id,
                    wrote = !update.is_empty(),
                    elapsed_us = start.elapsed().as_micros(),
                    "Mutated character"
                );
                Ok(out)
            })
            .await
    }

    /// Insert the character and create-or-credit its paired player in one
    /// gate hold.
    ///
    /// Returns `None` if the user already has a character; the player is
    /// then left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::InvalidProfile`] for an invalid bundle, or
    /// [`ProgressionError::StorageUnavailable`] on SQLite failures.
    pub async fn create_character_with_player(
        &self,
        new: &NewCharacter,
    ) -> Result<Option<(Character, Player)>> {
        new.validate()?;
        self.gate
            .run("create_character_with_player", |conn| {
                if !created(insert(conn, new))? {
                    return Ok(None);
                }
                let seed = PlayerSeed {
                    bonus_stat_points: new.bonus_stat_points,
                };
                let player = player::upsert_seeded(conn, new.user_id, seed)?;
                let character = select(conn, new.user_id)?
                    .ok_or_else(|| ProgressionError::not_found(RecordKind::Character, new.user_id))?;
                info!(
                    user = %new.user_id,
                    faction = %new.faction,
                    name = %new.profile.name,
                    "Character created"
                );
                Ok(Some((character, player)))
            })
            .await
    }
}
