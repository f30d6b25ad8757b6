//! GhoulRP benchmark suite.
//!
//! Targets:
//!   level_for_xp_1e9 ................. < 1μs
//!   level_for_experience_max ......... < 100ns
//!   apply_xp_delta_in_memory ......... < 50μs
//!   passive_text_event_eligible ...... < 100μs

use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use ghoulrp_core::config::{AccrualConfig, RewardConfig};
use ghoulrp_core::curve::{LevelProgress, cumulative_xp_for_level, level_for_experience, level_for_xp};
use ghoulrp_core::eligibility::EligibilityRegistry;
use ghoulrp_core::{ChannelId, GuildId, ProgressionEngine, Store, UserId};
use ghoulrp_hooks::events::TextEvent;
use ghoulrp_hooks::hooks::PassiveXpHook;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
}

fn engine() -> ProgressionEngine {
    let store = Store::open_in_memory().expect("open");
    ProgressionEngine::new(Arc::new(store), RewardConfig::default())
}

/// Benchmark: curve lookups at small and large XP.
fn bench_curve(c: &mut Criterion) {
    c.bench_function("level_for_xp_1e9", |b| {
        b.iter(|| level_for_xp(black_box(1.0e9)));
    });
    c.bench_function("level_for_xp_level_30", |b| {
        #[allow(clippy::cast_precision_loss)]
        let xp = cumulative_xp_for_level(30) as f64 + 0.5;
        b.iter(|| level_for_xp(black_box(xp)));
    });
    c.bench_function("level_for_experience_max", |b| {
        b.iter(|| level_for_experience(black_box(i64::MAX)));
    });
    c.bench_function("level_progress_report", |b| {
        b.iter(|| LevelProgress::for_player(black_box(12), black_box(4_321.5)));
    });
}

/// Benchmark: one XP delta through the gate and SQLite.
fn bench_apply_xp(c: &mut Criterion) {
    let rt = runtime();
    let engine = engine();
    c.bench_function("apply_xp_delta_in_memory", |b| {
        b.iter(|| {
            rt.block_on(engine.apply_xp_delta(UserId(1), black_box(1.5)))
                .expect("apply")
        });
    });
}

/// Benchmark: full passive-XP path for an eligible message.
fn bench_passive_event(c: &mut Criterion) {
    let rt = runtime();
    let engine = engine();
    rt.block_on(
        EligibilityRegistry::new(Arc::clone(engine.store())).enable(ChannelId(10), GuildId(1)),
    )
    .expect("enable");
    let hook = PassiveXpHook::with_seed(engine, AccrualConfig::default(), 7);
    let event = TextEvent::new(UserId(2), ChannelId(10), "Kaneki sips coffee at Anteiku.");

    c.bench_function("passive_text_event_eligible", |b| {
        b.iter(|| {
            rt.block_on(hook.on_passive_text_event(black_box(&event)))
                .expect("event")
        });
    });
}

criterion_group!(benches, bench_curve, bench_apply_xp, bench_passive_event);
criterion_main!(benches);
