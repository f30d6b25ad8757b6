//! Configuration for the progression core.
//!
//! Maps directly to `ghoulrp.toml`. Every field has a serde default, so an
//! empty file is a valid configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ProgressionError, Result};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GhoulConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Database location and pragmas.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Level-up reward sizes.
    #[serde(default)]
    pub rewards: RewardConfig,
    /// Passive XP accrual from chat messages.
    #[serde(default)]
    pub accrual: AccrualConfig,
}

impl GhoulConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ProgressionError::Config` if the TOML is invalid or fails
    /// [`GhoulConfig::validate`].
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| ProgressionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check cross-field constraints serde cannot express.
    ///
    /// # Errors
    /// Returns `ProgressionError::Config` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        let accrual = &self.accrual;
        if !(accrual.min_delta.is_finite() && accrual.max_delta.is_finite()) {
            return Err(ProgressionError::Config(
                "accrual deltas must be finite".to_string(),
            ));
        }
        if accrual.min_delta < 0.0 {
            return Err(ProgressionError::Config(format!(
                "accrual.min_delta must be non-negative (got {})",
                accrual.min_delta
            )));
        }
        if accrual.min_delta > accrual.max_delta {
            return Err(ProgressionError::Config(format!(
                "accrual.min_delta ({}) exceeds accrual.max_delta ({})",
                accrual.min_delta, accrual.max_delta
            )));
        }
        if accrual.command_prefix.is_empty() {
            return Err(ProgressionError::Config(
                "accrual.command_prefix must not be empty".to_string(),
            ));
        }
        if self.rewards.stat_points_per_level == 0 {
            return Err(ProgressionError::Config(
                "rewards.stat_points_per_level must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path to the SQLite file.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Use WAL journaling.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

/// Level-up reward sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Stat points per Player level gained.
    #[serde(default = "default_3")]
    pub stat_points_per_level: u32,
    /// Strength, agility and resistance gained per Character level.
    #[serde(default = "default_2")]
    pub attribute_points_per_level: u32,
    /// Max health gained per Character level.
    #[serde(default = "default_10")]
    pub max_health_per_level: u32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            stat_points_per_level: 3,
            attribute_points_per_level: 2,
            max_health_per_level: 10,
        }
    }
}

/// Passive XP accrual from chat messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccrualConfig {
    /// Minimum trimmed message length, in characters.
    #[serde(default = "default_10_usize")]
    pub min_content_chars: usize,
    /// Lower bound of the per-message XP roll.
    #[serde(default = "default_min_delta")]
    pub min_delta: f64,
    /// Upper bound of the per-message XP roll.
    #[serde(default = "default_max_delta")]
    pub max_delta: f64,
    /// Messages starting with this prefix are commands and earn nothing.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            min_content_chars: 10,
            min_delta: default_min_delta(),
            max_delta: default_max_delta(),
            command_prefix: default_command_prefix(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_database_path() -> PathBuf { PathBuf::from("ghoulrp.db") }
fn default_command_prefix() -> String { "!".to_string() }
fn default_min_delta() -> f64 { 0.5 }
fn default_max_delta() -> f64 { 3.0 }
fn default_2() -> u32 { 2 }
fn default_3() -> u32 { 3 }
fn default_10() -> u32 { 10 }
fn default_10_usize() -> usize { 10 }
fn default_busy_timeout() -> u32 { 5000 }
