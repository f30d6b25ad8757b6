//! Core type definitions: identifiers, enums, and timestamp encoding.
//!
//! Identifiers are 64-bit platform snowflakes stored as SQLite integers.
//! Timestamps are stored as fixed-width RFC 3339 strings so that lexical
//! order in the database equals chronological order. Offset-less values from
//! the first bot release are still accepted on read.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                self.0.to_sql()
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                u64::column_result(value).map(Self)
            }
        }
    };
}

snowflake_id!(
    /// A participant on the chat platform.
    UserId
);
snowflake_id!(
    /// A text channel.
    ChannelId
);
snowflake_id!(
    /// The community (guild) that owns channels.
    GuildId
);

/// The four record kinds held by the store, used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// XP-track record.
    Player,
    /// Attribute-track record.
    Character,
    /// Per-user, per-action expiry.
    Cooldown,
    /// Passive-XP channel flag.
    EligibleChannel,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Player => "Player",
            Self::Character => "Character",
            Self::Cooldown => "Cooldown",
            Self::EligibleChannel => "XP channel",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Character enums
// ---------------------------------------------------------------------------

/// Which side of the conflict a character belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
    /// Ghouls: kagune users, with RC control and regeneration.
    Ghoul,
    /// Investigators: quinque users, with aptitude and intellect.
    Investigator,
}

impl Faction {
    /// Canonical storage label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ghoul => "ghoul",
            Self::Investigator => "investigator",
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Faction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ghoul" => Ok(Self::Ghoul),
            "investigator" => Ok(Self::Investigator),
            // Rows written by the first bot release.
            "ccg" => {
                warn!(value = s, "Normalising legacy faction label");
                Ok(Self::Investigator)
            }
            other => Err(format!("unknown faction '{other}'")),
        }
    }
}

/// Whether a character is in play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterStatus {
    /// Playable.
    #[default]
    Active,
    /// Retired or suspended.
    Inactive,
}

impl CharacterStatus {
    /// Canonical storage label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for CharacterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CharacterStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" | "ativo" => Ok(Self::Active),
            "inactive" | "inativo" => Ok(Self::Inactive),
            other => Err(format!("unknown character status '{other}'")),
        }
    }
}

macro_rules! text_enum_sql {
    ($name:ident) => {
        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    };
}

text_enum_sql!(Faction);
text_enum_sql!(CharacterStatus);

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Encode a timestamp in the sortable storage format
/// (`2026-01-31T12:00:00.000000Z`).
#[must_use]
pub fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Wrapper that moves [`DateTime<Utc>`] through SQLite as sortable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SqlTime(pub DateTime<Utc>);

impl ToSql for SqlTime {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(encode_timestamp(&self.0)))
    }
}

/// Offset-less format written by the first bot release.
const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Decode a stored timestamp. Offset-less legacy values are read as UTC.
pub(crate) fn decode_timestamp(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(text) {
        Ok(ts) => Ok(ts.with_timezone(&Utc)),
        Err(err) => match NaiveDateTime::parse_from_str(text, LEGACY_TIMESTAMP_FORMAT) {
            Ok(naive) => {
                warn!(value = text, "Reading legacy timestamp without offset as UTC");
                Ok(naive.and_utc())
            }
            Err(_) => Err(err),
        },
    }
}

impl FromSql for SqlTime {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        decode_timestamp(value.as_str()?)
            .map(Self)
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn faction_accepts_legacy_label() {
        assert_eq!("ccg".parse::<Faction>(), Ok(Faction::Investigator));
        assert_eq!("Ghoul".parse::<Faction>(), Ok(Faction::Ghoul));
        assert!("dove".parse::<Faction>().is_err());
    }

    #[test]
    fn status_accepts_legacy_label() {
        assert_eq!("ativo".parse::<CharacterStatus>(), Ok(CharacterStatus::Active));
        assert_eq!("inactive".parse::<CharacterStatus>(), Ok(CharacterStatus::Inactive));
    }

    #[test]
    fn offsetless_timestamps_read_as_utc() {
        let expected = Utc
            .with_ymd_and_hms(2025, 3, 1, 12, 34, 56)
            .single()
            .expect("valid")
            + chrono::TimeDelta::microseconds(789_012);
        assert_eq!(decode_timestamp("2025-03-01T12:34:56.789012"), Ok(expected));
        assert_eq!(
            decode_timestamp("2025-03-01T12:34:56"),
            Ok(expected - chrono::TimeDelta::microseconds(789_012))
        );
        assert_eq!(decode_timestamp(&encode_timestamp(&expected)), Ok(expected));
        assert!(decode_timestamp("yesterday").is_err());
    }

    #[test]
    fn timestamps_sort_lexically() {
        let early = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).single().expect("valid");
        let late = Utc.with_ymd_and_hms(2026, 11, 2, 3, 4, 5).single().expect("valid");
        let (a, b) = (encode_timestamp(&early), encode_timestamp(&late));
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert!(a.ends_with('Z'));
    }
}
