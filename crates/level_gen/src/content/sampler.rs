//! Weighted room-type sampler.
//!
//! A room type is drawn in two stages. First a three-way categorical draw over
//! [`RoomCategory`] decides between a deficiency (monster), filler (empty) or bonus
//! room, based on the walker's progress. Then the category is resolved to a concrete
//! [`RoomType`] from the expected [`Weight`].
use std::f64::consts::PI;

use rand::RngCore;

use super::selection::{normalized, pick_weighted_random};
use super::{MonsterClass, RoomType, Weight};
use crate::random::index;

/// Coarse room category chosen before the concrete type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoomCategory {
    Deficiency,
    Filler,
    Bonus,
}

/// Raw categorical weights for `step` out of `total` steps.
///
/// These are used as-is; the draw itself is proportional to the raw values.
pub fn category_weights(step: u32, total: u32) -> [(RoomCategory, f64); 3] {
    let phase = (PI * step as f64 / 2.0).cos();
    let filler = if total == 0 {
        0.0
    } else {
        step as f64 / total as f64
    };
    [
        (RoomCategory::Bonus, (phase + 1.0) / 2.0),
        (RoomCategory::Deficiency, (1.0 - phase) / 2.0),
        (RoomCategory::Filler, filler),
    ]
}

pub fn sample_category(step: u32, total: u32, rng: &mut dyn RngCore) -> RoomCategory {
    pick_weighted_random(&category_weights(step, total), rng).unwrap_or(RoomCategory::Filler)
}

/// Normalized probabilities over the five bonus room types, or `None` if all are zero.
pub fn bonus_weights(expected: &Weight, step: u32, total: u32) -> Option<[(RoomType, f64); 5]> {
    let step = step as f64;
    let total = total as f64;
    let progress = if total > 0.0 {
        (step / total).min(1.0)
    } else {
        1.0
    };
    let near = |target: f64| (-(step - target).abs()).exp();

    normalized([
        (
            RoomType::Treasure,
            (1.0 - progress).sqrt() * expected.gold_bonus,
        ),
        (
            RoomType::HealthShrine,
            near(total * expected.hp_deficiency_ratio()) * expected.hp_ratio(),
        ),
        (
            RoomType::ManaShrine,
            near(total * expected.mana_deficiency_ratio()) * expected.mana_ratio(),
        ),
        (RoomType::Merchant, (-step).exp() * expected.gold_bonus),
        (RoomType::Anvil, (-step).exp() * expected.armor_ratio()),
    ])
}

pub fn sample_bonus(
    expected: &Weight,
    step: u32,
    total: u32,
    rng: &mut dyn RngCore,
) -> RoomType {
    bonus_weights(expected, step, total)
        .and_then(|w| pick_weighted_random(&w, rng))
        .unwrap_or(RoomType::Normal)
}

/// Normalized probabilities over the monster classes by inverse affinity distance.
///
/// Returns `None` when the expected affinity is the origin or every weight vanishes;
/// callers then draw uniformly.
pub fn monster_weights(expected: &Weight) -> Option<[(MonsterClass, f64); 5]> {
    let affinity = expected.magic_affinity();
    if affinity.x == 0.0 && affinity.y == 0.0 {
        return None;
    }
    normalized(MonsterClass::ALL.map(|class| {
        let distance = affinity.distance(class.affinity());
        let w = if distance == 0.0 { 1.0 } else { 1.0 / distance };
        (class, w)
    }))
}

pub fn sample_monster(expected: &Weight, rng: &mut dyn RngCore) -> MonsterClass {
    match monster_weights(expected).and_then(|w| pick_weighted_random(&w, rng)) {
        Some(class) => class,
        None => MonsterClass::ALL[index(rng, MonsterClass::ALL.len())],
    }
}

/// Draws a concrete room type for a walker at `step` of `total`.
pub fn sample_room_type(
    expected: &Weight,
    step: u32,
    total: u32,
    rng: &mut dyn RngCore,
) -> RoomType {
    match sample_category(step, total, rng) {
        RoomCategory::Filler => RoomType::Normal,
        RoomCategory::Bonus => sample_bonus(expected, step, total, rng),
        RoomCategory::Deficiency => RoomType::Monster(sample_monster(expected, rng)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::random::tests::FixedRng;

    #[test]
    fn category_weights_follow_phase() {
        let w = category_weights(0, 10);
        assert!((w[0].1 - 1.0).abs() < 1e-12);
        assert!(w[1].1.abs() < 1e-12);
        assert_eq!(w[2].1, 0.0);

        let w = category_weights(2, 10);
        assert!(w[0].1.abs() < 1e-12);
        assert!((w[1].1 - 1.0).abs() < 1e-12);
        assert!((w[2].1 - 0.2).abs() < 1e-12);

        let w = category_weights(1, 4);
        assert!((w[0].1 - 0.5).abs() < 1e-12);
        assert!((w[1].1 - 0.5).abs() < 1e-12);
        assert!((w[2].1 - 0.25).abs() < 1e-12);
    }

    #[test]
    fn zero_total_disables_filler() {
        let w = category_weights(3, 0);
        assert_eq!(w[2].1, 0.0);
    }

    #[test]
    fn bonus_falls_back_to_normal_on_zero_weight() {
        let mut rng = FixedRng { value: 0 };
        assert!(bonus_weights(&Weight::ZERO, 1, 5).is_none());
        assert_eq!(sample_bonus(&Weight::ZERO, 1, 5, &mut rng), RoomType::Normal);
    }

    #[test]
    fn bonus_with_only_gold_prefers_treasure_late_and_merchant_early() {
        let w = Weight {
            gold_bonus: 1.0,
            ..Weight::default()
        };
        let early = bonus_weights(&w, 0, 10).expect("gold");
        let treasure = early.iter().find(|(t, _)| *t == RoomType::Treasure).expect("t");
        let merchant = early.iter().find(|(t, _)| *t == RoomType::Merchant).expect("m");
        assert!((treasure.1 - 0.5).abs() < 1e-12);
        assert!((merchant.1 - 0.5).abs() < 1e-12);

        let late = bonus_weights(&w, 8, 10).expect("gold");
        let treasure = late.iter().find(|(t, _)| *t == RoomType::Treasure).expect("t");
        assert!(treasure.1 > 0.99);
    }

    #[test]
    fn monster_on_affinity_point_dominates() {
        let w = Weight {
            arcane_magic: 1.0,
            divine_magic: 0.0,
            ..Weight::default()
        };
        let weights = monster_weights(&w).expect("non-zero affinity");
        let werewolf = weights[0];
        assert_eq!(werewolf.0, MonsterClass::Werewolf);
        assert!(weights.iter().all(|(_, p)| *p <= werewolf.1));
        let total: f64 = weights.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_affinity_draws_uniformly() {
        let mut rng = StdRng::seed_from_u64(123);
        let trials = 10_000;
        let mut counts: HashMap<MonsterClass, usize> = HashMap::new();
        for _ in 0..trials {
            *counts.entry(sample_monster(&Weight::ZERO, &mut rng)).or_default() += 1;
        }
        assert_eq!(counts.len(), 5);
        for class in MonsterClass::ALL {
            let freq = counts[&class] as f64 / trials as f64;
            assert!((freq - 0.2).abs() < 0.02, "{class:?} drawn with {freq}");
        }
    }

    #[test]
    fn filler_step_with_fixed_draw_yields_normal() {
        // step 1 of 1: bonus 0.5, deficiency 0.5, filler 1.0; top of the roll lands in filler.
        let mut rng = FixedRng { value: u64::MAX };
        assert_eq!(
            sample_room_type(&Weight::ZERO, 1, 1, &mut rng),
            RoomType::Normal
        );
    }

    #[test]
    fn seeded_sampling_is_deterministic() {
        let w = Weight {
            hp: 10.0,
            max_hp: 20.0,
            gold_bonus: 1.5,
            arcane_magic: 0.3,
            ..Weight::default()
        };
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..64)
                .map(|i| sample_room_type(&w, i % 9, 8, &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(9), draw(9));
    }
}
