//! Level curves for both progression tracks.
//!
//! **XP track (geometric).** Level 1 needs 0 XP. Advancing from level `n` to
//! `n + 1` costs a threshold that starts at 100 and grows by a factor of 1.2
//! per level, truncated after every step:
//!
//! ```text
//! t(1) = 100,  t(n + 1) = floor(t(n) × 1.2)
//! 100, 120, 144, 172, 206, 247, 296, ...
//! ```
//!
//! **Character track (square root).**
//!
//! ```text
//! level(x) = min(50, floor(sqrt(x / 100)) + 1)
//! ```
//!
//! Everything here is pure and saturating; no input panics.

use serde::{Deserialize, Serialize};

/// XP needed to go from level 1 to level 2.
pub const BASE_THRESHOLD: u64 = 100;

/// Hard level cap on the character track.
pub const CHARACTER_LEVEL_CAP: u32 = 50;

/// Experience per squared level on the character track.
const EXPERIENCE_SCALE: u64 = 100;

/// Past this many steps every threshold is already `u64::MAX`.
const SATURATED_STEPS: usize = 256;

// ---------------------------------------------------------------------------
// XP track
// ---------------------------------------------------------------------------

/// `floor(t × 1.2)` in exact integer arithmetic, saturating at `u64::MAX`.
fn grow(threshold: u64) -> u64 {
    u64::try_from(u128::from(threshold) * 6 / 5).unwrap_or(u64::MAX)
}

/// Threshold sequence `t(1), t(2), ...`.
fn thresholds() -> impl Iterator<Item = u64> {
    std::iter::successors(Some(BASE_THRESHOLD), |&t| Some(grow(t)))
}

/// XP required to advance from `level` to `level + 1`.
#[must_use]
pub fn next_threshold(level: u32) -> u64 {
    let steps = level.saturating_sub(1) as usize;
    if steps >= SATURATED_STEPS {
        return u64::MAX;
    }
    thresholds().nth(steps).unwrap_or(u64::MAX)
}

/// Total XP required to reach `level` from zero.
#[must_use]
pub fn cumulative_xp_for_level(level: u32) -> u64 {
    let steps = level.saturating_sub(1) as usize;
    if steps > SATURATED_STEPS {
        return u64::MAX;
    }
    thresholds()
        .take(steps)
        .fold(0u64, u64::saturating_add)
}

/// Highest level reachable with `xp` whole experience points.
#[must_use]
pub fn level_for_whole_xp(xp: u64) -> u32 {
    let mut level = 1u32;
    let mut used: u128 = 0;
    for threshold in thresholds() {
        used += u128::from(threshold);
        if used > u128::from(xp) {
            break;
        }
        level += 1;
    }
    level
}

/// Highest level reachable with `xp`.
///
/// Thresholds are whole numbers, so the fractional part of `xp` never
/// matters. Negative, zero and NaN input all map to level 1.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn level_for_xp(xp: f64) -> u32 {
    if xp.is_nan() || xp < BASE_THRESHOLD as f64 {
        return 1;
    }
    // `as` saturates for values beyond u64::MAX.
    level_for_whole_xp(xp.floor() as u64)
}

/// Where a player stands inside their current level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelProgress {
    /// Current level.
    pub level: u32,
    /// Total XP.
    pub xp: f64,
    /// Cumulative XP at which `level` started.
    pub level_floor: u64,
    /// XP needed to cross from `level` to `level + 1`.
    pub threshold: u64,
    /// XP earned since `level_floor`.
    pub progress: f64,
    /// XP still missing for the next level.
    pub remaining: f64,
    /// `progress / threshold` as a percentage, clamped to `[0, 100]`.
    pub percent: f64,
}

impl LevelProgress {
    /// Compute progress for a stored `(level, xp)` pair.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn for_player(level: u32, xp: f64) -> Self {
        let level = level.max(1);
        let xp = if xp.is_finite() { xp.max(0.0) } else { 0.0 };
        let level_floor = cumulative_xp_for_level(level);
        let threshold = next_threshold(level);
        let progress = (xp - level_floor as f64).max(0.0);
        let remaining = (threshold as f64 - progress).max(0.0);
        let percent = if threshold == 0 {
            100.0
        } else {
            (progress / threshold as f64 * 100.0).clamp(0.0, 100.0)
        };
        Self {
            level,
            xp,
            level_floor,
            threshold,
            progress,
            remaining,
            percent,
        }
    }

    /// Number of filled cells in a progress bar `width` cells wide.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn filled_cells(&self, width: usize) -> usize {
        ((self.percent / 100.0) * width as f64).floor() as usize
    }
}

// ---------------------------------------------------------------------------
// Character track
// ---------------------------------------------------------------------------

/// Character level for a total `experience`, capped at
/// [`CHARACTER_LEVEL_CAP`]. Negative input maps to level 1.
#[must_use]
pub fn level_for_experience(experience: i64) -> u32 {
    let Ok(experience) = u64::try_from(experience) else {
        return 1;
    };
    // floor(sqrt(x / 100)) == isqrt(floor(x / 100)) for integer x.
    let root = (experience / EXPERIENCE_SCALE).isqrt();
    let level = u32::try_from(root.saturating_add(1)).unwrap_or(u32::MAX);
    level.min(CHARACTER_LEVEL_CAP)
}

/// Experience at which a character reaches `level`.
///
/// Display only: levels above the cap are never produced by
/// [`level_for_experience`].
#[must_use]
pub fn experience_for_level(level: u32) -> u64 {
    let steps = u64::from(level.saturating_sub(1));
    steps.saturating_mul(steps).saturating_mul(EXPERIENCE_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_thresholds() {
        assert_eq!(next_threshold(0), 100);
        assert_eq!(next_threshold(1), 100);
        assert_eq!(next_threshold(2), 120);
        assert_eq!(next_threshold(3), 144);
        assert_eq!(next_threshold(4), 172);
        assert_eq!(next_threshold(5), 206);
    }

    #[test]
    fn cumulative_sums() {
        assert_eq!(cumulative_xp_for_level(0), 0);
        assert_eq!(cumulative_xp_for_level(1), 0);
        assert_eq!(cumulative_xp_for_level(2), 100);
        assert_eq!(cumulative_xp_for_level(3), 220);
        assert_eq!(cumulative_xp_for_level(4), 364);
    }

    #[test]
    fn curve_round_trip_to_level_200() {
        for level in 1..=200u32 {
            let floor = cumulative_xp_for_level(level);
            assert_eq!(level_for_whole_xp(floor), level, "at level {level}");
            if level > 1 {
                assert_eq!(level_for_whole_xp(floor - 1), level - 1, "below level {level}");
            }
        }
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn float_form_matches_where_exact() {
        for level in 1..=150u32 {
            let floor = cumulative_xp_for_level(level);
            assert!(floor < (1u64 << 53));
            assert_eq!(level_for_xp(floor as f64), level);
            if level > 1 {
                assert_eq!(level_for_xp((floor - 1) as f64), level - 1);
                assert_eq!(level_for_xp(floor as f64 - 0.5), level - 1);
            }
        }
    }

    #[test]
    fn degenerate_xp_is_level_one() {
        assert_eq!(level_for_xp(0.0), 1);
        assert_eq!(level_for_xp(-50.0), 1);
        assert_eq!(level_for_xp(f64::NAN), 1);
        assert_eq!(level_for_xp(99.9), 1);
        assert_eq!(level_for_xp(100.0), 2);
    }

    #[test]
    fn huge_xp_terminates() {
        let level = level_for_whole_xp(u64::MAX);
        assert!(level > 200);
        assert_eq!(level_for_xp(f64::INFINITY), level);
    }

    #[test]
    fn extreme_levels_saturate() {
        assert_eq!(next_threshold(u32::MAX), u64::MAX);
        assert_eq!(cumulative_xp_for_level(u32::MAX), u64::MAX);
    }

    #[test]
    fn character_curve_examples() {
        assert_eq!(level_for_experience(0), 1);
        assert_eq!(level_for_experience(-10), 1);
        assert_eq!(level_for_experience(99), 1);
        assert_eq!(level_for_experience(100), 2);
        assert_eq!(level_for_experience(25_600), 17);
        assert_eq!(level_for_experience(240_099), 49);
        assert_eq!(level_for_experience(240_100), 50);
        assert_eq!(level_for_experience(10_000_000), 50);
        assert_eq!(level_for_experience(i64::MAX), 50);
    }

    #[test]
    fn character_inverse_below_cap() {
        for level in 1..=CHARACTER_LEVEL_CAP {
            let exp = i64::try_from(experience_for_level(level)).expect("fits");
            assert_eq!(level_for_experience(exp), level);
        }
        assert_eq!(experience_for_level(0), 0);
        assert_eq!(experience_for_level(50), 240_100);
    }

    #[test]
    fn progress_inside_level() {
        let p = LevelProgress::for_player(1, 50.0);
        assert_eq!(p.threshold, 100);
        assert_eq!(p.level_floor, 0);
        assert!((p.progress - 50.0).abs() < 1e-9);
        assert!((p.remaining - 50.0).abs() < 1e-9);
        assert!((p.percent - 50.0).abs() < 1e-9);
        assert_eq!(p.filled_cells(20), 10);

        let p = LevelProgress::for_player(2, 160.0);
        assert_eq!(p.level_floor, 100);
        assert_eq!(p.threshold, 120);
        assert!((p.progress - 60.0).abs() < 1e-9);
        assert!((p.percent - 50.0).abs() < 1e-9);
    }
}
