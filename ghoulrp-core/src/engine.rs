//! Progression engine: applies XP and experience deltas, detects level-ups
//! and pays rewards.
//!
//! The engine holds no state of its own beyond configuration. Every operation
//! re-reads the record inside the gate through the store's combined
//! `mutate_*` primitives, so concurrent deltas for the same user are applied
//! one after the other and none is lost.
//!
//! Rewards are computed from the level difference, so a delta that spans
//! several thresholds is paid in a single pass.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{GhoulConfig, RewardConfig};
use crate::curve::{self, LevelProgress};
use crate::error::{ProgressionError, Result};
use crate::records::{Attributes, Character, CharacterUpdate, NewCharacter, Player, PlayerUpdate};
use crate::store::Store;
use crate::types::{RecordKind, UserId};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of [`ProgressionEngine::apply_xp_delta`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XpOutcome {
    /// Whether at least one level was gained.
    pub leveled_up: bool,
    /// Level before the delta.
    pub old_level: u32,
    /// Level after the delta.
    pub new_level: u32,
    /// Stat points granted by this delta.
    pub reward: u32,
    /// Total XP after the delta.
    pub xp: f64,
}

impl XpOutcome {
    /// Levels gained by this delta.
    #[must_use]
    pub fn levels_gained(&self) -> u32 {
        self.new_level.saturating_sub(self.old_level)
    }
}

/// Result of [`ProgressionEngine::apply_experience_delta`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceOutcome {
    /// Whether at least one level was gained.
    pub leveled_up: bool,
    /// Level before the delta.
    pub old_level: u32,
    /// Level after the delta.
    pub new_level: u32,
    /// Total experience after the delta.
    pub experience: u64,
    /// Attributes after any level-up reward.
    pub attributes: Attributes,
}

/// Result of [`ProgressionEngine::create_character`].
#[derive(Debug, Clone, PartialEq)]
pub enum CharacterCreation {
    /// Character inserted; `player` is the paired XP record after the bonus
    /// stat points were credited.
    Created {
        /// The stored character.
        character: Box<Character>,
        /// The paired player.
        player: Player,
    },
    /// The user already has a character. Nothing was written.
    AlreadyExists,
}

/// Player progress snapshot for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerProgress {
    /// Position inside the current level.
    pub progress: LevelProgress,
    /// Unspent stat points.
    pub stat_points: u32,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Applies progression rules on top of a [`Store`].
#[derive(Debug, Clone)]
pub struct ProgressionEngine {
    store: Arc<Store>,
    rewards: RewardConfig,
}

impl ProgressionEngine {
    /// Create an engine over an already opened store.
    #[must_use]
    pub fn new(store: Arc<Store>, rewards: RewardConfig) -> Self {
        Self { store, rewards }
    }

    /// Open the configured database and build an engine on top of it.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::Config`] for an invalid configuration, or
    /// [`ProgressionError::StorageUnavailable`] if the database cannot be
    /// opened.
    pub fn from_config(config: &GhoulConfig) -> Result<Self> {
        config.validate()?;
        let store = Store::open(&config.persistence.database_path, &config.persistence)?;
        Ok(Self::new(Arc::new(store), config.rewards.clone()))
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Reward settings in effect.
    #[must_use]
    pub fn rewards(&self) -> &RewardConfig {
        &self.rewards
    }

    // -----------------------------------------------------------------------
    // XP track
    // -----------------------------------------------------------------------

    /// Add `delta` XP to the user's player, creating the player on first use.
    ///
    /// A zero delta provisions the player but writes nothing else.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::InvalidDelta`] for a negative or
    /// non-finite delta (storage is not touched), or a storage error.
    pub async fn apply_xp_delta(&self, user_id: UserId, delta: f64) -> Result<XpOutcome> {
        if !delta.is_finite() || delta < 0.0 {
            warn!(user = %user_id, delta, "Rejected XP delta");
            return Err(ProgressionError::InvalidDelta(format!(
                "XP delta must be finite and non-negative, got {delta}"
            )));
        }

        let start = Instant::now();
        let per_level = self.rewards.stat_points_per_level;
        let outcome = self
            .store
            .mutate_player(user_id, |player| Ok(xp_step(player, delta, per_level)))
            .await?;

        if outcome.leveled_up {
            info!(
                user = %user_id,
                old_level = outcome.old_level,
                new_level = outcome.new_level,
                reward = outcome.reward,
                "Player leveled up"
            );
        }
        debug!(
            user = %user_id,
            delta,
            xp = outcome.xp,
            elapsed_us = start.elapsed().as_micros(),
            "Applied XP delta"
        );
        Ok(outcome)
    }

    /// Load the player, creating a default one if the user is new.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn get_or_create_player(&self, user_id: UserId) -> Result<Player> {
        self.store
            .mutate_player(user_id, |player| Ok((PlayerUpdate::default(), player.clone())))
            .await
    }

    /// Load an existing player.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::NotFound`] if the user has no player.
    pub async fn player(&self, user_id: UserId) -> Result<Player> {
        self.store
            .get_player(user_id)
            .await?
            .ok_or_else(|| ProgressionError::not_found(RecordKind::Player, user_id))
    }

    /// Progress snapshot for the user, provisioning the player if needed.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn player_progress(&self, user_id: UserId) -> Result<PlayerProgress> {
        let player = self.get_or_create_player(user_id).await?;
        Ok(PlayerProgress {
            progress: LevelProgress::for_player(player.level, player.xp),
            stat_points: player.stat_points,
        })
    }

    // -----------------------------------------------------------------------
    // Character track
    // -----------------------------------------------------------------------

    /// Add `delta` experience to the user's character.
    ///
    /// Each level gained adds the configured attribute points to strength,
    /// agility and resistance, raises max health, and refills health.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::InvalidDelta`] for a negative delta,
    /// [`ProgressionError::NotFound`] if the user has no character, or a
    /// storage error.
    pub async fn apply_experience_delta(
        &self,
        user_id: UserId,
        delta: i64,
    ) -> Result<ExperienceOutcome> {
        let Ok(delta) = u64::try_from(delta) else {
            warn!(user = %user_id, delta, "Rejected experience delta");
            return Err(ProgressionError::InvalidDelta(format!(
                "experience delta must be non-negative, got {delta}"
            )));
        };

        let outcome = self
            .store
            .mutate_character(user_id, |character| {
                Ok(experience_step(character, delta, &self.rewards))
            })
            .await?;

        if outcome.leveled_up {
            info!(
                user = %user_id,
                old_level = outcome.old_level,
                new_level = outcome.new_level,
                "Character leveled up"
            );
        }
        Ok(outcome)
    }

    /// Load an existing character.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::NotFound`] if the user has no character.
    pub async fn character(&self, user_id: UserId) -> Result<Character> {
        self.store
            .get_character(user_id)
            .await?
            .ok_or_else(|| ProgressionError::not_found(RecordKind::Character, user_id))
    }

    /// Create a character and credit its bonus stat points to the paired
    /// player, in one gated operation.
    ///
    /// An existing player keeps its XP and level.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::InvalidProfile`] for an invalid bundle, or
    /// a storage error.
    pub async fn create_character(&self, new: NewCharacter) -> Result<CharacterCreation> {
        match self.store.create_character_with_player(&new).await? {
            Some((character, player)) => Ok(CharacterCreation::Created {
                character: Box::new(character),
                player,
            }),
            None => {
                debug!(user = %new.user_id, "Character already exists");
                Ok(CharacterCreation::AlreadyExists)
            }
        }
    }

    /// Apply an administrative column update to a character.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::InvalidUpdate`] for an empty or
    /// out-of-range request, [`ProgressionError::NotFound`] if the user has
    /// no character, or a storage error.
    pub async fn update_character(&self, user_id: UserId, update: CharacterUpdate) -> Result<()> {
        if self.store.update_character(user_id, &update).await? {
            Ok(())
        } else {
            Err(ProgressionError::not_found(RecordKind::Character, user_id))
        }
    }
}

// ---------------------------------------------------------------------------
// Pure steps
// ---------------------------------------------------------------------------

#[allow(clippy::float_cmp)]
fn xp_step(player: &Player, delta: f64, per_level: u32) -> (PlayerUpdate, XpOutcome) {
    if delta == 0.0 {
        let unchanged = XpOutcome {
            leveled_up: false,
            old_level: player.level,
            new_level: player.level,
            reward: 0,
            xp: player.xp,
        };
        return (PlayerUpdate::default(), unchanged);
    }

    let xp = player.xp + delta;
    let new_level = player.level.max(curve::level_for_xp(xp));
    let gained = new_level - player.level;
    let reward = gained.saturating_mul(per_level);

    let update = PlayerUpdate {
        xp: Some(xp),
        level: (gained > 0).then_some(new_level),
        stat_points: (reward > 0).then(|| player.stat_points.saturating_add(reward)),
    };
    let outcome = XpOutcome {
        leveled_up: gained > 0,
        old_level: player.level,
        new_level,
        reward,
        xp,
    };
    (update, outcome)
}

fn experience_step(
    character: &Character,
    delta: u64,
    rewards: &RewardConfig,
) -> (CharacterUpdate, ExperienceOutcome) {
    let experience = character.experience.saturating_add(delta);
    let computed = curve::level_for_experience(i64::try_from(experience).unwrap_or(i64::MAX));
    let new_level = character.level.max(computed);
    let gained = new_level - character.level;

    let mut attributes = character.attributes;
    let mut update = CharacterUpdate::default();
    if delta > 0 {
        update.experience = Some(experience);
    }
    if gained > 0 {
        let points = gained.saturating_mul(rewards.attribute_points_per_level);
        attributes.strength = attributes.strength.saturating_add(points);
        attributes.agility = attributes.agility.saturating_add(points);
        attributes.resistance = attributes.resistance.saturating_add(points);
        attributes.max_health = attributes
            .max_health
            .saturating_add(gained.saturating_mul(rewards.max_health_per_level));
        attributes.health = attributes.max_health;

        update.level = Some(new_level);
        update.strength = Some(attributes.strength);
        update.agility = Some(attributes.agility);
        update.resistance = Some(attributes.resistance);
        update.max_health = Some(attributes.max_health);
        update.health = Some(attributes.health);
    }

    let outcome = ExperienceOutcome {
        leveled_up: gained > 0,
        old_level: character.level,
        new_level,
        experience,
        attributes,
    };
    (update, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Profile;
    use crate::types::Faction;

    fn engine() -> ProgressionEngine {
        let store = Store::open_in_memory().expect("open");
        ProgressionEngine::new(Arc::new(store), RewardConfig::default())
    }

    fn new_character(user: u64) -> NewCharacter {
        NewCharacter {
            user_id: UserId(user),
            faction: Faction::Investigator,
            attributes: Attributes::default(),
            kagune_quinque: "Basic".to_string(),
            profile: Profile {
                name: "Kotaro Amon".to_string(),
                ..Profile::default()
            },
            bonus_stat_points: 0,
        }
    }

    #[tokio::test]
    async fn zero_delta_changes_nothing() {
        let engine = engine();
        let outcome = engine.apply_xp_delta(UserId(1), 0.0).await.expect("apply");
        assert!(!outcome.leveled_up);
        assert_eq!(outcome.reward, 0);

        let player = engine.player(UserId(1)).await.expect("player");
        assert_eq!(player.level, 1);
        assert_eq!(player.stat_points, 0);
        assert!(player.xp.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn reaching_threshold_exactly_levels_once() {
        let engine = engine();
        let outcome = engine.apply_xp_delta(UserId(2), 100.0).await.expect("apply");
        assert!(outcome.leveled_up);
        assert_eq!((outcome.old_level, outcome.new_level), (1, 2));
        assert_eq!(outcome.reward, 3);

        let player = engine.player(UserId(2)).await.expect("player");
        assert_eq!(player.level, 2);
        assert_eq!(player.stat_points, 3);
    }

    #[tokio::test]
    async fn spanning_three_thresholds_pays_once() {
        let engine = engine();
        let outcome = engine.apply_xp_delta(UserId(3), 364.0).await.expect("apply");
        assert_eq!(outcome.levels_gained(), 3);
        assert_eq!(outcome.new_level, 4);
        assert_eq!(outcome.reward, 9);
        assert_eq!(engine.player(UserId(3)).await.expect("player").stat_points, 9);
    }

    #[tokio::test]
    async fn just_below_threshold_does_not_level() {
        let engine = engine();
        let outcome = engine.apply_xp_delta(UserId(4), 99.9).await.expect("apply");
        assert!(!outcome.leveled_up);
        assert_eq!(outcome.new_level, 1);
    }

    #[tokio::test]
    async fn invalid_xp_delta_never_touches_storage() {
        let engine = engine();
        let before = engine.store().gate_acquisitions();
        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let err = engine.apply_xp_delta(UserId(5), bad).await.expect_err("rejected");
            assert!(matches!(err, ProgressionError::InvalidDelta(_)));
        }
        assert_eq!(engine.store().gate_acquisitions(), before);
    }

    #[tokio::test]
    async fn stored_level_never_drops() {
        let engine = engine();
        engine.get_or_create_player(UserId(6)).await.expect("create");
        engine
            .store()
            .update_player(
                UserId(6),
                PlayerUpdate {
                    level: Some(5),
                    ..PlayerUpdate::default()
                },
            )
            .await
            .expect("update");

        let outcome = engine.apply_xp_delta(UserId(6), 10.0).await.expect("apply");
        assert_eq!(outcome.new_level, 5);
        assert!(!outcome.leveled_up);
    }

    #[tokio::test]
    async fn progress_provisions_player() {
        let engine = engine();
        engine.apply_xp_delta(UserId(7), 150.0).await.expect("apply");
        let report = engine.player_progress(UserId(7)).await.expect("progress");
        assert_eq!(report.progress.level, 2);
        assert_eq!(report.stat_points, 3);
        assert!((report.progress.progress - 50.0).abs() < 1e-9);

        let fresh = engine.player_progress(UserId(8)).await.expect("fresh");
        assert_eq!(fresh.progress.level, 1);
        assert!(engine.player(UserId(8)).await.is_ok());
    }

    #[tokio::test]
    async fn experience_requires_character() {
        let engine = engine();
        let err = engine
            .apply_experience_delta(UserId(9), 10)
            .await
            .expect_err("missing");
        assert!(matches!(
            err,
            ProgressionError::NotFound {
                kind: RecordKind::Character,
                ..
            }
        ));
        let err = engine
            .apply_experience_delta(UserId(9), -10)
            .await
            .expect_err("negative");
        assert!(matches!(err, ProgressionError::InvalidDelta(_)));
    }

    #[tokio::test]
    async fn experience_level_up_pays_attributes() {
        let engine = engine();
        let created = engine.create_character(new_character(10)).await.expect("create");
        assert!(matches!(created, CharacterCreation::Created { .. }));

        // 400 experience: sqrt(4) + 1 = level 3, two levels gained.
        let outcome = engine
            .apply_experience_delta(UserId(10), 400)
            .await
            .expect("apply");
        assert_eq!((outcome.old_level, outcome.new_level), (1, 3));
        assert_eq!(outcome.attributes.strength, 14);
        assert_eq!(outcome.attributes.agility, 14);
        assert_eq!(outcome.attributes.resistance, 14);
        assert_eq!(outcome.attributes.max_health, 120);
        assert_eq!(outcome.attributes.health, 120);

        let character = engine.character(UserId(10)).await.expect("character");
        assert_eq!(character.level, 3);
        assert_eq!(character.experience, 400);
        assert_eq!(character.attributes, outcome.attributes);
    }

    #[tokio::test]
    async fn experience_without_level_up_keeps_attributes() {
        let engine = engine();
        engine.create_character(new_character(11)).await.expect("create");
        let outcome = engine.apply_experience_delta(UserId(11), 50).await.expect("apply");
        assert!(!outcome.leveled_up);
        let character = engine.character(UserId(11)).await.expect("character");
        assert_eq!(character.experience, 50);
        assert_eq!(character.attributes, Attributes::default());
    }

    #[tokio::test]
    async fn creation_credits_existing_player() {
        let engine = engine();
        engine.apply_xp_delta(UserId(12), 120.0).await.expect("apply");
        let mut bundle = new_character(12);
        bundle.bonus_stat_points = 2;

        let CharacterCreation::Created { player, .. } =
            engine.create_character(bundle.clone()).await.expect("create")
        else {
            panic!("expected creation");
        };
        assert_eq!(player.level, 2);
        assert_eq!(player.stat_points, 5);
        assert!((player.xp - 120.0).abs() < f64::EPSILON);

        assert_eq!(
            engine.create_character(bundle).await.expect("again"),
            CharacterCreation::AlreadyExists
        );
    }

    #[tokio::test]
    async fn update_missing_character_is_not_found() {
        let engine = engine();
        let update = CharacterUpdate {
            wins: Some(1),
            ..CharacterUpdate::default()
        };
        let err = engine
            .update_character(UserId(13), update.clone())
            .await
            .expect_err("missing");
        assert!(matches!(err, ProgressionError::NotFound { .. }));

        engine.create_character(new_character(13)).await.expect("create");
        engine.update_character(UserId(13), update).await.expect("update");
        assert_eq!(engine.character(UserId(13)).await.expect("character").wins, 1);
    }
}
