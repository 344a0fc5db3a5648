//! Selection utilities for weighted categorical draws.
//!
//! - [pick_weighted_random]: draws an option proportionally to its raw weight.
//! - [normalized]: scales weights to sum to one.
//!
//! Weights do not need to be normalized. Non-positive and non-finite weights never win
//! a random draw.
use rand::RngCore;

use crate::random::rand01;

pub fn pick_weighted_random<T: Copy>(options: &[(T, f64)], rng: &mut dyn RngCore) -> Option<T> {
    let placeable: Vec<_> = options
        .iter()
        .filter(|(_, w)| w.is_finite() && *w > 0.0)
        .collect();
    if placeable.is_empty() {
        return None;
    }

    let total_weight: f64 = placeable.iter().map(|(_, w)| *w).sum();
    if total_weight <= 0.0 {
        return None;
    }

    let mut roll = rand01(rng) * total_weight;
    for (value, w) in &placeable {
        roll -= *w;
        if roll < 0.0 {
            return Some(*value);
        }
    }

    placeable.last().map(|(value, _)| *value)
}

/// Scales weights so they sum to 1. Returns `None` when the sum is not positive.
pub fn normalized<T: Copy, const N: usize>(options: [(T, f64); N]) -> Option<[(T, f64); N]> {
    let total: f64 = options
        .iter()
        .map(|(_, w)| if w.is_finite() { w.max(0.0) } else { 0.0 })
        .sum();
    if total <= 0.0 {
        return None;
    }
    Some(options.map(|(value, w)| {
        let w = if w.is_finite() { w.max(0.0) } else { 0.0 };
        (value, w / total)
    }))
}
