//! Random helpers shared by the partitioner, walkers and sampler.
//!
//! Everything takes `&mut dyn RngCore` so a single seeded source can be threaded
//! through a whole generation run.
use rand::RngCore;

/// Generate a random float in the range [0, 1).
#[inline]
pub(crate) fn rand01(rng: &mut dyn RngCore) -> f64 {
    (rng.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}

/// Uniform integer in `[lo, hi]`, both ends inclusive.
#[inline]
pub(crate) fn range_inclusive(rng: &mut dyn RngCore, lo: i32, hi: i32) -> i32 {
    debug_assert!(lo <= hi, "empty range [{lo}, {hi}]");
    let span = (hi as i64 - lo as i64 + 1) as u64;
    lo + (rng.next_u64() % span) as i32
}

/// Uniform index in `[0, len)`. `len` must be non-zero.
#[inline]
pub(crate) fn index(rng: &mut dyn RngCore, len: usize) -> usize {
    debug_assert!(len > 0, "index over an empty slice");
    (rng.next_u64() % len as u64) as usize
}

/// Derives a per-cluster seed from a base seed and the cluster's index.
///
/// The same `(base_seed, index)` always yields the same seed, so clusters can be
/// carved in any order or in parallel without changing the result.
pub fn seed_for_cluster(base_seed: u64, index: usize) -> u64 {
    let i = index as u64;
    let mixed = base_seed ^ i.wrapping_mul(0x9E3779B97F4A7C15) ^ 0xBF58476D1CE4E5B9;
    mix_u64(mixed)
}

#[inline]
fn mix_u64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58476D1CE4E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D049BB133111EB);
    x ^ (x >> 31)
}
