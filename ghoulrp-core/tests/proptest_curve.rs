//! Property-based tests for the level curves and the engine's zero-delta
//! behavior.

use std::sync::Arc;

use proptest::prelude::*;

use ghoulrp_core::config::RewardConfig;
use ghoulrp_core::curve::{
    CHARACTER_LEVEL_CAP, LevelProgress, cumulative_xp_for_level, experience_for_level,
    level_for_experience, level_for_whole_xp, level_for_xp, next_threshold,
};
use ghoulrp_core::{ProgressionEngine, Store, UserId};

// ---------------------------------------------------------------------------
// XP track
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn cumulative_requirement_maps_back_to_level(level in 1u32..=200) {
        let floor = cumulative_xp_for_level(level);
        prop_assert_eq!(level_for_whole_xp(floor), level);
        if level > 1 {
            prop_assert_eq!(level_for_whole_xp(floor - 1), level - 1);
        }
    }

    #[test]
    fn float_form_agrees_with_integer_form(xp in 0u64..1_000_000_000, frac in 0.0..1.0f64) {
        #[allow(clippy::cast_precision_loss)]
        let fractional = xp as f64 + frac;
        // Guard against `xp + frac` rounding up to the next integer.
        prop_assume!(fractional.floor() as u64 == xp);
        prop_assert_eq!(level_for_xp(fractional), level_for_whole_xp(xp));
    }

    #[test]
    fn level_is_monotonic_in_xp(a in 0u64..10_000_000, b in 0u64..10_000_000) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(level_for_whole_xp(lo) <= level_for_whole_xp(hi));
    }

    #[test]
    fn thresholds_never_shrink(level in 1u32..500) {
        prop_assert!(next_threshold(level + 1) >= next_threshold(level));
    }

    #[test]
    fn progress_stays_in_range(level in 1u32..60, extra in 0.0..1.0f64) {
        #[allow(clippy::cast_precision_loss)]
        let xp = cumulative_xp_for_level(level) as f64 + extra * 99.0;
        let progress = LevelProgress::for_player(level, xp);
        prop_assert!((0.0..=100.0).contains(&progress.percent));
        prop_assert!(progress.remaining >= 0.0);
        prop_assert!(progress.filled_cells(10) <= 10);
    }
}

#[test]
fn float_form_is_exact_on_thresholds() {
    for level in 1..=150u32 {
        let floor = cumulative_xp_for_level(level);
        #[allow(clippy::cast_precision_loss)]
        let at = floor as f64;
        assert_eq!(level_for_xp(at), level, "level {level}");
        if level > 1 {
            assert_eq!(level_for_xp(at - 1.0), level - 1, "level {level}");
        }
    }
}

// ---------------------------------------------------------------------------
// Character track
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn experience_level_is_bounded(experience in any::<i64>()) {
        let level = level_for_experience(experience);
        prop_assert!((1..=CHARACTER_LEVEL_CAP).contains(&level));
    }

    #[test]
    fn experience_curve_round_trips_below_cap(level in 1u32..=CHARACTER_LEVEL_CAP) {
        let at = i64::try_from(experience_for_level(level)).expect("fits");
        prop_assert_eq!(level_for_experience(at), level);
        if level > 1 {
            prop_assert_eq!(level_for_experience(at - 1), level - 1);
        }
    }
}

// ---------------------------------------------------------------------------
// Engine: zero delta is a no-op
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn zero_delta_is_idempotent(seed_xp in 0.0..5_000.0f64) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        runtime.block_on(async {
            let store = Arc::new(Store::open_in_memory().expect("open"));
            let engine = ProgressionEngine::new(store, RewardConfig::default());
            let before = engine.apply_xp_delta(UserId(1), seed_xp).await.expect("seed");
            let player_before = engine.player(UserId(1)).await.expect("player");

            let after = engine.apply_xp_delta(UserId(1), 0.0).await.expect("zero");
            let player_after = engine.player(UserId(1)).await.expect("player");

            assert_eq!(after.new_level, before.new_level);
            assert!(!after.leveled_up);
            assert_eq!(after.reward, 0);
            assert_eq!(player_after, player_before);
        });
    }
}
