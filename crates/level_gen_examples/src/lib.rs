#![forbid(unsafe_code)]

use level_gen::prelude::*;
use tracing_subscriber::EnvFilter;

/// Installs a formatting subscriber honoring `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// A modest adventurer used by every example.
pub fn sample_player() -> Weight {
    Weight {
        hp: 40.0,
        max_hp: 60.0,
        mana: 10.0,
        max_mana: 30.0,
        armor: 5.0,
        max_armor: 12.0,
        attack: 8.0,
        gold_bonus: 2.0,
        arcane_magic: 0.4,
        divine_magic: 0.2,
        ..Weight::default()
    }
}

/// One line per room type with its count, sorted by type.
pub fn room_histogram(level: &Level) -> String {
    let mut counts = std::collections::BTreeMap::new();
    for ty in level.room_types() {
        *counts.entry(ty).or_insert(0usize) += 1;
    }
    counts
        .into_iter()
        .map(|(ty, n)| format!("{} {:<28} {n}\n", ty.glyph(), format!("{ty:?}")))
        .collect()
}
