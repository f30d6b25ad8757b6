//! Character-creation drafts.
//!
//! The platform walks a user through faction, family roll, starter ability
//! roll and a profile form. The resulting [`CharacterDraft`] is turned into a
//! validated [`NewCharacter`] here; persisting it is the engine's job.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use ghoulrp_core::records::{Attributes, NewCharacter, Profile};
use ghoulrp_core::types::{Faction, UserId};
use ghoulrp_core::Result;

/// Equipment label used when no starter ability was chosen.
pub const DEFAULT_EQUIPMENT: &str = "Basic";

/// Family rolls allowed per creation.
pub const FAMILY_ROLLS: usize = 3;

/// Starter-ability rolls allowed per creation.
pub const ABILITY_ROLLS: usize = 2;

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// An attribute a family bonus can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Physical power.
    Strength,
    /// Speed.
    Agility,
    /// Damage reduction.
    Resistance,
    /// Awareness.
    Perception,
    /// Ghoul only.
    RcControl,
    /// Ghoul only.
    Regeneration,
    /// Investigator only.
    QuinqueAptitude,
    /// Investigator only.
    Intellect,
}

impl AttributeKind {
    /// The faction that may raise this attribute, or `None` if any may.
    #[must_use]
    pub fn faction(self) -> Option<Faction> {
        match self {
            Self::RcControl | Self::Regeneration => Some(Faction::Ghoul),
            Self::QuinqueAptitude | Self::Intellect => Some(Faction::Investigator),
            _ => None,
        }
    }

    fn slot(self, attributes: &mut Attributes) -> &mut u32 {
        match self {
            Self::Strength => &mut attributes.strength,
            Self::Agility => &mut attributes.agility,
            Self::Resistance => &mut attributes.resistance,
            Self::Perception => &mut attributes.perception,
            Self::RcControl => &mut attributes.rc_control,
            Self::Regeneration => &mut attributes.regeneration,
            Self::QuinqueAptitude => &mut attributes.quinque_aptitude,
            Self::Intellect => &mut attributes.intellect,
        }
    }
}

// ---------------------------------------------------------------------------
// Families & starter abilities
// ---------------------------------------------------------------------------

/// How rare a family is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rarity {
    /// Common.
    Common,
    /// Rare.
    Rare,
}

/// A lineage with attribute bonuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    /// Display name.
    pub name: String,
    /// Rarity tier.
    pub rarity: Rarity,
    /// Flavor text.
    pub description: String,
    /// Attribute increases applied at creation.
    pub bonuses: Vec<(AttributeKind, u32)>,
    /// Stat points credited to the paired player.
    #[serde(default)]
    pub bonus_stat_points: u32,
}

impl Family {
    fn new(
        name: &str,
        rarity: Rarity,
        description: &str,
        bonuses: &[(AttributeKind, u32)],
    ) -> Self {
        Self {
            name: name.to_string(),
            rarity,
            description: description.to_string(),
            bonuses: bonuses.to_vec(),
            bonus_stat_points: 0,
        }
    }

    /// Built-in families for `faction`.
    #[must_use]
    pub fn catalogue(faction: Faction) -> Vec<Self> {
        use AttributeKind::{
            Agility, Intellect, Perception, QuinqueAptitude, RcControl, Resistance, Strength,
        };
        match faction {
            Faction::Ghoul => vec![
                Self::new(
                    "Alley Rat",
                    Rarity::Common,
                    "Quick and stealthy.",
                    &[(Strength, 1), (Agility, 2)],
                ),
                Self::new(
                    "Child of Darkness",
                    Rarity::Rare,
                    "Affinity with RC cells.",
                    &[(Strength, 2), (RcControl, 1)],
                ),
            ],
            Faction::Investigator => vec![
                Self::new(
                    "Promising Cadet",
                    Rarity::Common,
                    "Sharp-eyed and resilient.",
                    &[(Resistance, 1), (Perception, 2)],
                ),
                Self::new(
                    "Heir of Duty",
                    Rarity::Rare,
                    "A family tradition in the CCG.",
                    &[(Intellect, 2), (QuinqueAptitude, 1)],
                ),
            ],
        }
    }

    /// Pick one family of `faction` uniformly at random.
    pub fn roll<R: Rng + ?Sized>(faction: Faction, rng: &mut R) -> Option<Self> {
        Self::catalogue(faction).choose(rng).cloned()
    }
}

/// A starting technique or weapon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarterAbility {
    /// Display name.
    pub name: String,
    /// Kind, stored as the character's equipment label.
    pub kind: String,
    /// Flavor text.
    pub description: String,
}

impl StarterAbility {
    fn new(name: &str, kind: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            description: description.to_string(),
        }
    }

    /// Built-in starter abilities for `faction`.
    #[must_use]
    pub fn catalogue(faction: Faction) -> Vec<Self> {
        match faction {
            Faction::Ghoul => vec![
                Self::new("Sharp Claw", "Light Rinkaku", "A fast strike with a small claw."),
                Self::new("Shard Burst", "Rudimentary Ukaku", "Fires small RC shards."),
            ],
            Faction::Investigator => vec![
                Self::new("Precise Cut", "Light Quinque (Blade)", "A quick strike with a standard quinque."),
                Self::new("Defensive Stance", "CCG Technique", "Raises defense for a short time."),
            ],
        }
    }

    /// Pick one starter ability of `faction` uniformly at random.
    pub fn roll<R: Rng + ?Sized>(faction: Faction, rng: &mut R) -> Option<Self> {
        Self::catalogue(faction).choose(rng).cloned()
    }
}

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

/// Choices collected by the creation flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterDraft {
    /// Owner.
    pub user_id: UserId,
    /// Chosen side.
    pub faction: Faction,
    /// Chosen family, if any was picked.
    pub family: Option<Family>,
    /// Chosen starter ability, if any was picked.
    pub starter: Option<StarterAbility>,
    /// Profile form contents.
    pub profile: Profile,
}

impl CharacterDraft {
    /// Start an empty draft.
    #[must_use]
    pub fn new(user_id: UserId, faction: Faction) -> Self {
        Self {
            user_id,
            faction,
            family: None,
            starter: None,
            profile: Profile::default(),
        }
    }

    /// Attributes after family bonuses. Bonuses to another faction's
    /// attributes are dropped.
    #[must_use]
    pub fn attributes(&self) -> Attributes {
        let mut attributes = Attributes::default();
        let Some(family) = &self.family else {
            return attributes;
        };
        for &(kind, bonus) in &family.bonuses {
            if kind.faction().is_some_and(|owner| owner != self.faction) {
                continue;
            }
            let slot = kind.slot(&mut attributes);
            *slot = slot.saturating_add(bonus);
        }
        attributes
    }

    /// Build the validated creation bundle.
    ///
    /// # Errors
    ///
    /// Returns [`ghoulrp_core::ProgressionError::InvalidProfile`] if the
    /// profile is missing a name or exceeds a length limit.
    pub fn into_new_character(self) -> Result<NewCharacter> {
        let attributes = self.attributes();
        let new = NewCharacter {
            user_id: self.user_id,
            faction: self.faction,
            attributes,
            kagune_quinque: self
                .starter
                .map_or_else(|| DEFAULT_EQUIPMENT.to_string(), |s| s.kind),
            profile: self.profile,
            bonus_stat_points: self.family.map_or(0, |f| f.bonus_stat_points),
        };
        new.validate()?;
        Ok(new)
    }
}
