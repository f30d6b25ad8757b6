//! ghoulrp-admin: inspect and adjust progression data from the shell.
//!
//! Reads `ghoulrp.toml` (or `--config`), opens the configured database, runs
//! one command and prints the result as text or, with `--json`, as JSON.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ghoulrp_core::clock::SystemClock;
use ghoulrp_core::cooldown::{CooldownManager, CooldownStatus};
use ghoulrp_core::curve::LevelProgress;
use ghoulrp_core::eligibility::EligibilityRegistry;
use ghoulrp_core::{ChannelId, GhoulConfig, GuildId, ProgressionEngine, UserId};
use ghoulrp_hooks::hooks::{ChannelAdmin, PROGRESS_BAR_WIDTH, render_bar};

/// GhoulRP administration tool
#[derive(Parser)]
#[command(name = "ghoulrp-admin")]
#[command(about = "Inspect and adjust GhoulRP progression data", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults apply when absent)
    #[arg(long, global = true, default_value = "ghoulrp.toml")]
    config: PathBuf,

    /// Database path (overrides the configuration)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Output JSON only
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a player's level, XP and stat points
    Player {
        /// User snowflake
        user: u64,
    },

    /// Show a character sheet
    Character {
        /// User snowflake
        user: u64,
    },

    /// Add XP to a player (creates the player if needed)
    GrantXp {
        /// User snowflake
        user: u64,
        /// Non-negative amount of XP
        delta: f64,
    },

    /// Add experience to a character
    GrantExperience {
        /// User snowflake
        user: u64,
        /// Non-negative amount of experience
        delta: i64,
    },

    /// List a guild's XP channels
    Channels {
        /// Guild snowflake
        guild: u64,
    },

    /// Flip a channel's XP flag
    ToggleChannel {
        /// Channel snowflake
        channel: u64,
        /// Guild owning the channel
        guild: u64,
    },

    /// Start a cooldown
    Cooldown {
        /// User snowflake
        user: u64,
        /// Action name, e.g. "duel"
        action: String,
        /// Length in seconds
        seconds: u64,
    },

    /// Check whether an action is off cooldown
    Check {
        /// User snowflake
        user: u64,
        /// Action name
        action: String,
    },

    /// Copy the database with SQLite's online backup
    Backup {
        /// Destination file
        dest: PathBuf,
    },
}

#[derive(Serialize)]
struct PlayerView {
    user_id: UserId,
    stat_points: u32,
    progress: LevelProgress,
    bar: String,
}

fn load_config(cli: &Cli) -> Result<GhoulConfig> {
    let mut config = if cli.config.exists() {
        GhoulConfig::from_file(&cli.config)
            .with_context(|| format!("loading {}", cli.config.display()))?
    } else {
        GhoulConfig::default()
    };
    if let Some(db) = &cli.db {
        config.persistence.database_path.clone_from(db);
    }
    Ok(config)
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text(value));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let engine = ProgressionEngine::from_config(&config)
        .with_context(|| format!("opening {}", config.persistence.database_path.display()))?;
    let store = Arc::clone(engine.store());
    info!(db = %store.db_path().display(), "Admin session started");

    match cli.command {
        Commands::Player { user } => {
            let player = engine.player(UserId(user)).await?;
            let progress = LevelProgress::for_player(player.level, player.xp);
            let view = PlayerView {
                user_id: player.user_id,
                stat_points: player.stat_points,
                bar: render_bar(&progress, PROGRESS_BAR_WIDTH),
                progress,
            };
            emit(cli.json, &view, |v| {
                format!(
                    "user {}: level {} ({:.1} XP), {} stat points\n{} {:.1}/{} ({:.1}%)",
                    v.user_id,
                    v.progress.level,
                    v.progress.xp,
                    v.stat_points,
                    v.bar,
                    v.progress.progress,
                    v.progress.threshold,
                    v.progress.percent
                )
            })?;
        }
        Commands::Character { user } => {
            let character = engine.character(UserId(user)).await?;
            emit(cli.json, &character, |c| {
                let a = &c.attributes;
                format!(
                    "{} ({}, {}) level {} / {} exp\n\
                     STR {} AGI {} RES {} PER {}\n\
                     HP {}/{} STA {}/{}\n\
                     equipment: {}  record: {}W {}L",
                    c.profile.name,
                    c.faction,
                    c.status,
                    c.level,
                    c.experience,
                    a.strength,
                    a.agility,
                    a.resistance,
                    a.perception,
                    a.health,
                    a.max_health,
                    a.stamina,
                    a.max_stamina,
                    c.kagune_quinque,
                    c.wins,
                    c.losses
                )
            })?;
        }
        Commands::GrantXp { user, delta } => {
            let outcome = engine.apply_xp_delta(UserId(user), delta).await?;
            emit(cli.json, &outcome, |o| {
                if o.leveled_up {
                    format!(
                        "level {} -> {} (+{} stat points), {:.1} XP",
                        o.old_level, o.new_level, o.reward, o.xp
                    )
                } else {
                    format!("level {}, {:.1} XP", o.new_level, o.xp)
                }
            })?;
        }
        Commands::GrantExperience { user, delta } => {
            let outcome = engine.apply_experience_delta(UserId(user), delta).await?;
            emit(cli.json, &outcome, |o| {
                format!(
                    "level {} -> {}, {} exp",
                    o.old_level, o.new_level, o.experience
                )
            })?;
        }
        Commands::Channels { guild } => {
            let admin = ChannelAdmin::new(EligibilityRegistry::new(store));
            let channels = admin.list(GuildId(guild)).await?;
            emit(cli.json, &channels, |list| {
                if list.is_empty() {
                    "no XP channels configured".to_string()
                } else {
                    list.iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            })?;
        }
        Commands::ToggleChannel { channel, guild } => {
            let admin = ChannelAdmin::new(EligibilityRegistry::new(store));
            let state = admin.toggle(ChannelId(channel), GuildId(guild)).await?;
            emit(cli.json, &state, |s| format!("channel {channel}: {s:?}"))?;
        }
        Commands::Cooldown {
            user,
            action,
            seconds,
        } => {
            let cooldowns = CooldownManager::new(store, Arc::new(SystemClock));
            let expires_at = cooldowns
                .set(UserId(user), &action, Duration::from_secs(seconds))
                .await?;
            emit(cli.json, &expires_at, |t| format!("{action} blocked until {t}"))?;
        }
        Commands::Check { user, action } => {
            let cooldowns = CooldownManager::new(store, Arc::new(SystemClock));
            let status = cooldowns.check(UserId(user), &action).await?;
            emit(cli.json, &status, |s| match s {
                CooldownStatus::Ready => format!("{action}: ready"),
                CooldownStatus::Active { .. } => {
                    format!("{action}: {}s remaining", s.remaining_secs())
                }
            })?;
        }
        Commands::Backup { dest } => {
            store.backup(&dest).await?;
            emit(cli.json, &dest, |d| format!("backup written to {}", d.display()))?;
        }
    }

    Ok(())
}
