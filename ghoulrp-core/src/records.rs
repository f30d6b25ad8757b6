//! Record types held by the store, and the enumerated update requests that
//! mutate them.
//!
//! Updates are never open-ended key/value maps: each mutable column has an
//! `Option` field, and a request is validated before it reaches SQL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::curve::CHARACTER_LEVEL_CAP;
use crate::error::{ProgressionError, Result};
use crate::types::{ChannelId, CharacterStatus, Faction, GuildId, UserId};

// ---------------------------------------------------------------------------
// Player (XP track)
// ---------------------------------------------------------------------------

/// XP-track record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Owner.
    pub user_id: UserId,
    /// Current level, always `curve::level_for_xp(xp)` after an engine write.
    pub level: u32,
    /// Total accumulated XP.
    pub xp: f64,
    /// Unspent reward points.
    pub stat_points: u32,
    /// First time the player was seen.
    pub created_at: DateTime<Utc>,
}

/// Column changes for a [`Player`] row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerUpdate {
    /// New level.
    pub level: Option<u32>,
    /// New total XP.
    pub xp: Option<f64>,
    /// New stat-point balance.
    pub stat_points: Option<u32>,
}

impl PlayerUpdate {
    /// `true` when no column would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.level.is_none() && self.xp.is_none() && self.stat_points.is_none()
    }

    /// Reject empty requests and out-of-range values.
    ///
    /// # Errors
    /// Returns [`ProgressionError::InvalidUpdate`].
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(ProgressionError::InvalidUpdate(
                "player update sets no fields".to_string(),
            ));
        }
        if self.level == Some(0) {
            return Err(ProgressionError::InvalidUpdate(
                "player level must be at least 1".to_string(),
            ));
        }
        if let Some(xp) = self.xp {
            if !xp.is_finite() || xp < 0.0 {
                return Err(ProgressionError::InvalidUpdate(format!(
                    "player xp must be finite and non-negative (got {xp})"
                )));
            }
        }
        Ok(())
    }
}

/// Initial values for a player created alongside a character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerSeed {
    /// Stat points granted on top of any existing balance.
    pub bonus_stat_points: u32,
}

// ---------------------------------------------------------------------------
// Character (attribute track)
// ---------------------------------------------------------------------------

/// Combat attributes of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    /// Physical power.
    pub strength: u32,
    /// Speed and evasion.
    pub agility: u32,
    /// Damage reduction.
    pub resistance: u32,
    /// Current health.
    pub health: u32,
    /// Health ceiling.
    pub max_health: u32,
    /// Current stamina.
    pub stamina: u32,
    /// Stamina ceiling.
    pub max_stamina: u32,
    /// Awareness.
    pub perception: u32,
    /// Ghoul: control over RC cells.
    pub rc_control: u32,
    /// Ghoul: healing speed.
    pub regeneration: u32,
    /// Investigator: skill with quinque weapons.
    pub quinque_aptitude: u32,
    /// Investigator: tactical knowledge.
    pub intellect: u32,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            strength: 10,
            agility: 10,
            resistance: 10,
            health: 100,
            max_health: 100,
            stamina: 50,
            max_stamina: 50,
            perception: 10,
            rc_control: 10,
            regeneration: 10,
            quinque_aptitude: 10,
            intellect: 10,
        }
    }
}

/// Free-text role-play profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// In-character name.
    pub name: String,
    /// Age as the player wrote it.
    pub age: String,
    /// Gender and pronouns.
    pub gender: String,
    /// Appearance description or image link.
    pub appearance: String,
    /// Short backstory.
    pub backstory: String,
}

impl Profile {
    /// Maximum lengths in characters, matching the creation form.
    pub const NAME_MAX: usize = 50;
    /// See [`Profile::NAME_MAX`].
    pub const AGE_MAX: usize = 10;
    /// See [`Profile::NAME_MAX`].
    pub const GENDER_MAX: usize = 50;
    /// See [`Profile::NAME_MAX`].
    pub const APPEARANCE_MAX: usize = 300;
    /// See [`Profile::NAME_MAX`].
    pub const BACKSTORY_MAX: usize = 1000;

    /// Check the name is present and every field fits its limit.
    ///
    /// # Errors
    /// Returns [`ProgressionError::InvalidProfile`] naming the field.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ProgressionError::InvalidProfile(
                "character name is required".to_string(),
            ));
        }
        let fields = [
            ("name", &self.name, Self::NAME_MAX),
            ("age", &self.age, Self::AGE_MAX),
            ("gender", &self.gender, Self::GENDER_MAX),
            ("appearance", &self.appearance, Self::APPEARANCE_MAX),
            ("backstory", &self.backstory, Self::BACKSTORY_MAX),
        ];
        for (field, value, max) in fields {
            let len = value.chars().count();
            if len > max {
                return Err(ProgressionError::InvalidProfile(format!(
                    "{field} is {len} characters (limit {max})"
                )));
            }
        }
        Ok(())
    }
}

/// Attribute-track record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Owner; one character per user.
    pub user_id: UserId,
    /// Side of the conflict.
    pub faction: Faction,
    /// Current level, `1..=50`.
    pub level: u32,
    /// Total experience.
    pub experience: u64,
    /// Combat attributes.
    pub attributes: Attributes,
    /// Kagune type or quinque weapon.
    pub kagune_quinque: String,
    /// Role-play profile.
    pub profile: Profile,
    /// Duels won.
    pub wins: u32,
    /// Duels lost.
    pub losses: u32,
    /// Whether the character is in play.
    pub status: CharacterStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last duel, if any.
    pub last_combat: Option<DateTime<Utc>>,
}

/// A fully validated creation bundle.
///
/// Rolled bonuses are already folded into `attributes`; this core does not
/// roll anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCharacter {
    /// Owner.
    pub user_id: UserId,
    /// Side of the conflict.
    pub faction: Faction,
    /// Starting attributes.
    pub attributes: Attributes,
    /// Kagune type or quinque weapon.
    pub kagune_quinque: String,
    /// Role-play profile.
    pub profile: Profile,
    /// Stat points credited to the paired player.
    pub bonus_stat_points: u32,
}

impl NewCharacter {
    /// Validate the bundle before it reaches storage.
    ///
    /// # Errors
    /// Returns [`ProgressionError::InvalidProfile`].
    pub fn validate(&self) -> Result<()> {
        self.profile.validate()?;
        if self.kagune_quinque.trim().is_empty() {
            return Err(ProgressionError::InvalidProfile(
                "kagune/quinque label is required".to_string(),
            ));
        }
        let a = &self.attributes;
        if a.max_health == 0 || a.health > a.max_health {
            return Err(ProgressionError::InvalidProfile(format!(
                "health {} must be within 1..={}",
                a.health, a.max_health
            )));
        }
        if a.stamina > a.max_stamina {
            return Err(ProgressionError::InvalidProfile(format!(
                "stamina {} exceeds max stamina {}",
                a.stamina, a.max_stamina
            )));
        }
        Ok(())
    }
}

/// Column changes for a [`Character`] row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterUpdate {
    /// New level.
    pub level: Option<u32>,
    /// New total experience.
    pub experience: Option<u64>,
    /// New strength.
    pub strength: Option<u32>,
    /// New agility.
    pub agility: Option<u32>,
    /// New resistance.
    pub resistance: Option<u32>,
    /// New current health.
    pub health: Option<u32>,
    /// New health ceiling.
    pub max_health: Option<u32>,
    /// New current stamina.
    pub stamina: Option<u32>,
    /// New stamina ceiling.
    pub max_stamina: Option<u32>,
    /// New perception.
    pub perception: Option<u32>,
    /// New equipment label.
    pub kagune_quinque: Option<String>,
    /// New win count.
    pub wins: Option<u32>,
    /// New loss count.
    pub losses: Option<u32>,
    /// New status.
    pub status: Option<CharacterStatus>,
    /// New last-duel time.
    pub last_combat: Option<DateTime<Utc>>,
}

impl CharacterUpdate {
    /// `true` when no column would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Reject empty requests and out-of-range values.
    ///
    /// # Errors
    /// Returns [`ProgressionError::InvalidUpdate`].
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(ProgressionError::InvalidUpdate(
                "character update sets no fields".to_string(),
            ));
        }
        if let Some(level) = self.level {
            if !(1..=CHARACTER_LEVEL_CAP).contains(&level) {
                return Err(ProgressionError::InvalidUpdate(format!(
                    "character level {level} outside 1..={CHARACTER_LEVEL_CAP}"
                )));
            }
        }
        if let (Some(health), Some(max)) = (self.health, self.max_health) {
            if health > max {
                return Err(ProgressionError::InvalidUpdate(format!(
                    "health {health} exceeds max health {max}"
                )));
            }
        }
        if matches!(&self.kagune_quinque, Some(label) if label.trim().is_empty()) {
            return Err(ProgressionError::InvalidUpdate(
                "kagune/quinque label cannot be blank".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Cooldown & EligibleChannel
// ---------------------------------------------------------------------------

/// Expiry of one gated action for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooldown {
    /// Owner.
    pub user_id: UserId,
    /// Gated action, e.g. `"attack"`.
    pub command_type: String,
    /// Moment the action becomes available again.
    pub expires_at: DateTime<Utc>,
}

/// A channel where passive XP accrues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibleChannel {
    /// The channel.
    pub channel_id: ChannelId,
    /// Owning community.
    pub guild_id: GuildId,
    /// When the flag was set.
    pub added_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_player_update_rejected() {
        assert!(matches!(
            PlayerUpdate::default().validate(),
            Err(ProgressionError::InvalidUpdate(_))
        ));
    }

    #[test]
    fn negative_xp_update_rejected() {
        let update = PlayerUpdate {
            xp: Some(-1.0),
            ..PlayerUpdate::default()
        };
        assert!(update.validate().is_err());
        let update = PlayerUpdate {
            xp: Some(f64::NAN),
            ..PlayerUpdate::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn character_level_cap_enforced() {
        let update = CharacterUpdate {
            level: Some(51),
            ..CharacterUpdate::default()
        };
        assert!(update.validate().is_err());
        let update = CharacterUpdate {
            level: Some(50),
            ..CharacterUpdate::default()
        };
        assert!(update.validate().is_ok());
    }

    #[test]
    fn profile_limits() {
        let mut profile = Profile {
            name: "Kaneki".to_string(),
            ..Profile::default()
        };
        assert!(profile.validate().is_ok());

        profile.backstory = "x".repeat(Profile::BACKSTORY_MAX + 1);
        let err = profile.validate().expect_err("too long");
        assert!(err.to_string().contains("backstory"));

        profile.backstory.clear();
        profile.name = "   ".to_string();
        assert!(profile.validate().is_err());
    }

    #[test]
    fn new_character_health_checked() {
        let bundle = NewCharacter {
            user_id: UserId(1),
            faction: Faction::Ghoul,
            attributes: Attributes {
                health: 150,
                ..Attributes::default()
            },
            kagune_quinque: "Rinkaku".to_string(),
            profile: Profile {
                name: "Rize".to_string(),
                ..Profile::default()
            },
            bonus_stat_points: 0,
        };
        assert!(matches!(
            bundle.validate(),
            Err(ProgressionError::InvalidProfile(_))
        ));
    }
}
