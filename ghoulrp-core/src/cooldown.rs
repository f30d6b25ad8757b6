//! Per-user, per-action cooldowns with lazy eviction.
//!
//! Expiry is measured against an injected [`Clock`], so tests can advance
//! time instead of sleeping.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::Clock;
use crate::error::{ProgressionError, Result};
use crate::store::Store;
use crate::types::UserId;

/// Whether an action may run now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CooldownStatus {
    /// No active cooldown.
    Ready,
    /// The action is blocked for `remaining` more.
    Active {
        /// Time left until expiry.
        remaining: Duration,
    },
}

impl CooldownStatus {
    /// `true` when the action may run.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Whole seconds remaining, rounded up; zero when ready.
    #[must_use]
    pub fn remaining_secs(&self) -> u64 {
        match self {
            Self::Ready => 0,
            Self::Active { remaining } => {
                remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
            }
        }
    }
}

/// Cooldown operations on top of a [`Store`].
#[derive(Clone)]
pub struct CooldownManager {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CooldownManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CooldownManager")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl CooldownManager {
    /// Create a manager reading time from `clock`.
    #[must_use]
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Block `action` for `duration` from now, replacing any earlier entry.
    /// Returns the new expiry.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::InvalidUpdate`] for an empty action name,
    /// [`ProgressionError::InvalidDelta`] for a duration that cannot be
    /// represented, or a storage error.
    pub async fn set(
        &self,
        user_id: UserId,
        action: &str,
        duration: Duration,
    ) -> Result<DateTime<Utc>> {
        check_action(action)?;
        let expires_at = TimeDelta::from_std(duration)
            .ok()
            .and_then(|delta| self.clock.now().checked_add_signed(delta))
            .ok_or_else(|| {
                warn!(user = %user_id, action, ?duration, "Rejected cooldown duration");
                ProgressionError::InvalidDelta(format!("cooldown of {duration:?} is out of range"))
            })?;
        self.store.set_cooldown(user_id, action, expires_at).await?;
        Ok(expires_at)
    }

    /// Current status of `action`. An expired entry is removed.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::InvalidUpdate`] for an empty action name,
    /// or a storage error.
    pub async fn check(&self, user_id: UserId, action: &str) -> Result<CooldownStatus> {
        check_action(action)?;
        let now = self.clock.now();
        let status = match self.store.check_cooldown(user_id, action, now).await? {
            Some(expires_at) => CooldownStatus::Active {
                remaining: (expires_at - now).to_std().unwrap_or_default(),
            },
            None => CooldownStatus::Ready,
        };
        Ok(status)
    }

    /// Drop a cooldown early. Returns `false` if none was stored.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError::InvalidUpdate`] for an empty action name,
    /// or a storage error.
    pub async fn clear(&self, user_id: UserId, action: &str) -> Result<bool> {
        check_action(action)?;
        self.store.delete_cooldown(user_id, action).await
    }
}

fn check_action(action: &str) -> Result<()> {
    if action.trim().is_empty() {
        return Err(ProgressionError::InvalidUpdate(
            "cooldown action name cannot be empty".to_string(),
        ));
    }
    Ok(())
}
