//! Balance weight vectors.
//!
//! A [`Weight`] summarizes a desired or expected balance state (health, mana, armor,
//! offense, gold and magic affinity) and supports the vector-space operations the
//! distributor and sampler need: addition, negation, scaling and the Euclidean norm.
use std::ops::{Add, AddAssign, Mul, Neg};

use glam::DVec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of components in a [`Weight`].
pub const WEIGHT_DIMENSIONS: usize = 15;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Weight {
    pub hp: f64,
    pub max_hp: f64,
    pub mana: f64,
    pub max_mana: f64,
    pub armor: f64,
    pub max_armor: f64,
    pub chance_to_dodge: f64,
    pub gold_bonus: f64,
    pub xp_bonus: f64,
    pub attack: f64,
    pub critical_hit_chance: f64,
    pub critical_hit_multiplier: f64,
    pub chance_to_knockout: f64,
    pub arcane_magic: f64,
    pub divine_magic: f64,
}

impl Weight {
    pub const ZERO: Weight = Weight {
        hp: 0.0,
        max_hp: 0.0,
        mana: 0.0,
        max_mana: 0.0,
        armor: 0.0,
        max_armor: 0.0,
        chance_to_dodge: 0.0,
        gold_bonus: 0.0,
        xp_bonus: 0.0,
        attack: 0.0,
        critical_hit_chance: 0.0,
        critical_hit_multiplier: 0.0,
        chance_to_knockout: 0.0,
        arcane_magic: 0.0,
        divine_magic: 0.0,
    };

    pub fn to_array(&self) -> [f64; WEIGHT_DIMENSIONS] {
        [
            self.hp,
            self.max_hp,
            self.mana,
            self.max_mana,
            self.armor,
            self.max_armor,
            self.chance_to_dodge,
            self.gold_bonus,
            self.xp_bonus,
            self.attack,
            self.critical_hit_chance,
            self.critical_hit_multiplier,
            self.chance_to_knockout,
            self.arcane_magic,
            self.divine_magic,
        ]
    }

    pub fn from_array(v: [f64; WEIGHT_DIMENSIONS]) -> Self {
        Self {
            hp: v[0],
            max_hp: v[1],
            mana: v[2],
            max_mana: v[3],
            armor: v[4],
            max_armor: v[5],
            chance_to_dodge: v[6],
            gold_bonus: v[7],
            xp_bonus: v[8],
            attack: v[9],
            critical_hit_chance: v[10],
            critical_hit_multiplier: v[11],
            chance_to_knockout: v[12],
            arcane_magic: v[13],
            divine_magic: v[14],
        }
    }

    fn zip_with(self, other: Weight, f: impl Fn(f64, f64) -> f64) -> Weight {
        let a = self.to_array();
        let b = other.to_array();
        Weight::from_array(std::array::from_fn(|i| f(a[i], b[i])))
    }

    /// Euclidean norm over all components.
    pub fn norm(&self) -> f64 {
        self.to_array().iter().map(|c| c * c).sum::<f64>().sqrt()
    }

    pub fn is_zero(&self) -> bool {
        self.to_array().iter().all(|c| *c == 0.0)
    }

    /// Scales the vector so its norm does not exceed `limit`.
    pub fn clamp_norm(self, limit: f64) -> Weight {
        let norm = self.norm();
        if norm > limit && norm > 0.0 {
            self * (limit.max(0.0) / norm)
        } else {
            self
        }
    }

    /// The (arcane, divine) magic affinity point.
    pub fn magic_affinity(&self) -> DVec2 {
        DVec2::new(self.arcane_magic, self.divine_magic)
    }

    /// `hp / max_hp`, or 0 when `max_hp` is not positive.
    pub fn hp_ratio(&self) -> f64 {
        ratio(self.hp, self.max_hp)
    }

    /// `mana / max_mana`, or 0 when `max_mana` is not positive.
    pub fn mana_ratio(&self) -> f64 {
        ratio(self.mana, self.max_mana)
    }

    /// `armor / max_armor`, or 0 when `max_armor` is not positive.
    pub fn armor_ratio(&self) -> f64 {
        ratio(self.armor, self.max_armor)
    }

    /// Missing share of health, in `[0, 1]`.
    pub fn hp_deficiency_ratio(&self) -> f64 {
        deficiency(self.hp, self.max_hp)
    }

    /// Missing share of mana, in `[0, 1]`.
    pub fn mana_deficiency_ratio(&self) -> f64 {
        deficiency(self.mana, self.max_mana)
    }
}

#[inline]
fn ratio(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}

#[inline]
fn deficiency(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        (1.0 - value / max).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

impl Add for Weight {
    type Output = Weight;

    fn add(self, rhs: Weight) -> Weight {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl AddAssign for Weight {
    fn add_assign(&mut self, rhs: Weight) {
        *self = *self + rhs;
    }
}

impl Neg for Weight {
    type Output = Weight;

    fn neg(self) -> Weight {
        Weight::from_array(self.to_array().map(|c| -c))
    }
}

impl Mul<f64> for Weight {
    type Output = Weight;

    fn mul(self, rhs: f64) -> Weight {
        Weight::from_array(self.to_array().map(|c| c * rhs))
    }
}

impl std::iter::Sum for Weight {
    fn sum<I: Iterator<Item = Weight>>(iter: I) -> Weight {
        iter.fold(Weight::ZERO, |acc, w| acc + w)
    }
}
