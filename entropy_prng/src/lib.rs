// Deterministic, portable pseudo-random number generator.
//
// Implements a 32-bit xorshift generator (Marsaglia, 2003, triple 13/17/5).
// The whole generator state is one `u32`, which is stored verbatim in saved
// games as `meta.rng_state`. Resuming a save re-seeds from that integer and
// must continue the exact same stream, so every draw is specified down to
// the bit and must never change.
//
// This crate is the single PRNG used by `entropy_sim`. The turn resolver
// builds one `GameRng` per resolved week from the stored state and writes
// the final state back into the new `GameState`.
//
// **Critical constraint: determinism.** Every method on `GameRng` must produce
// identical output given the same prior state, regardless of platform,
// compiler version, or optimization level. Float draws are a single exact
// division of a `u32` by 2^32, which is representable without rounding in
// an `f64`.

use serde::{Deserialize, Serialize};

/// Replacement state used whenever a seed or a draw would be zero. Zero is a
/// fixed point of xorshift and would lock the stream.
pub const ZERO_SEED_REPLACEMENT: u32 = 0x9e37_79b9;

const TWO_POW_32: f64 = 4_294_967_296.0;

/// Normalize an arbitrary seed into a valid generator state.
///
/// The seed is truncated to its low 32 bits; a zero result is remapped to
/// [`ZERO_SEED_REPLACEMENT`].
pub fn normalize_seed(seed: u64) -> u32 {
    let truncated = seed as u32;
    if truncated == 0 {
        ZERO_SEED_REPLACEMENT
    } else {
        truncated
    }
}

fn xorshift32(state: u32) -> u32 {
    let mut x = state;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    if x == 0 { ZERO_SEED_REPLACEMENT } else { x }
}

/// Xorshift32 PRNG, the engine's sole source of randomness.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameRng {
    state: u32,
}

impl GameRng {
    /// Create a generator from a seed (normalized via [`normalize_seed`]).
    pub fn new(seed: u64) -> Self {
        Self {
            state: normalize_seed(seed),
        }
    }

    /// Resume a generator from a previously persisted state.
    pub fn from_state(state: u32) -> Self {
        Self::new(u64::from(state))
    }

    /// Current integer state, for persistence.
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Advance the generator and return the raw draw.
    pub fn next_u32(&mut self) -> u32 {
        self.state = xorshift32(self.state);
        self.state
    }

    /// Uniform `f64` in (0, 1): the raw draw divided by 2^32.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / TWO_POW_32
    }

    /// Uniform integer in the inclusive range spanned by `a` and `b`.
    ///
    /// The bounds are order-independent: `next_int(3, 1)` behaves exactly like
    /// `next_int(1, 3)`. Always consumes one draw.
    pub fn next_int(&mut self, a: i64, b: i64) -> i64 {
        let lower = a.min(b);
        let upper = a.max(b);
        let span = (upper - lower + 1) as f64;
        lower + (self.next_f64() * span).floor() as i64
    }

    /// Pick one item with probability proportional to `weight(item)`.
    ///
    /// Negative weights count as zero. If the total weight is not positive
    /// the first item is returned without consuming a draw; an empty slice
    /// yields `None`. Otherwise one float is drawn, scaled by the total, and
    /// items are walked in order subtracting their weight until the remainder
    /// is `<= 0`. The last item absorbs any floating-point leftover.
    pub fn pick_weighted<'a, T>(
        &mut self,
        items: &'a [T],
        weight: impl Fn(&T) -> f64,
    ) -> Option<&'a T> {
        let total: f64 = items.iter().map(|item| weight(item).max(0.0)).sum();
        if total <= 0.0 {
            return items.first();
        }

        let mut roll = self.next_f64() * total;
        for item in items {
            roll -= weight(item).max(0.0);
            if roll <= 0.0 {
                return Some(item);
            }
        }
        items.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_seed_is_remapped() {
        assert_eq!(normalize_seed(0), 0x9e37_79b9);
        assert_eq!(GameRng::new(0).state(), 0x9e37_79b9);
        // Low 32 bits of 2^32 are zero as well.
        assert_eq!(normalize_seed(1 << 32), ZERO_SEED_REPLACEMENT);
    }

    #[test]
    fn seed_truncates_to_low_bits() {
        assert_eq!(normalize_seed((7 << 32) | 5), 5);
    }

    /// Golden vector: if this ever breaks, saved games no longer resume
    /// identically.
    #[test]
    fn known_sequence_from_seed_one() {
        let mut rng = GameRng::new(1);
        let vals: Vec<u32> = (0..5).map(|_| rng.next_u32()).collect();
        assert_eq!(vals, vec![270_369, 67_634_689, 2_647_435_461, 307_599_695, 2_398_689_233]);
        assert_eq!(rng.state(), 2_398_689_233);
    }

    #[test]
    fn float_is_raw_draw_over_two_pow_32() {
        let mut rng = GameRng::new(1);
        assert_eq!(rng.next_f64(), 270_369.0 / 4_294_967_296.0);
    }

    #[test]
    fn determinism_same_seed_same_output() {
        let mut a = GameRng::new(42);
        let mut b = GameRng::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn from_state_resumes_stream() {
        let mut original = GameRng::new(99);
        for _ in 0..17 {
            original.next_u32();
        }
        let mut resumed = GameRng::from_state(original.state());
        for _ in 0..100 {
            assert_eq!(original.next_u32(), resumed.next_u32());
        }
    }

    #[test]
    fn f64_in_unit_range() {
        let mut rng = GameRng::new(12345);
        for _ in 0..10_000 {
            let v = rng.next_f64();
            assert!(v > 0.0 && v < 1.0, "f64 out of range: {v}");
        }
    }

    #[test]
    fn next_int_is_inclusive_and_order_independent() {
        let mut a = GameRng::new(7);
        let mut b = GameRng::new(7);
        let mut saw_low = false;
        let mut saw_high = false;
        for _ in 0..10_000 {
            let v = a.next_int(1, 3);
            assert_eq!(v, b.next_int(3, 1));
            assert!((1..=3).contains(&v), "next_int out of range: {v}");
            saw_low |= v == 1;
            saw_high |= v == 3;
        }
        assert!(saw_low && saw_high);
    }

    #[test]
    fn next_int_single_value_range() {
        let mut rng = GameRng::new(5);
        assert_eq!(rng.next_int(4, 4), 4);
        // Still consumes a draw.
        assert_ne!(rng.state(), 5);
    }

    #[test]
    fn pick_weighted_zero_total_returns_first_without_drawing() {
        let mut rng = GameRng::new(11);
        let items = [("a", 0.0), ("b", -3.0)];
        let picked = rng.pick_weighted(&items, |item| item.1);
        assert_eq!(picked.map(|item| item.0), Some("a"));
        assert_eq!(rng.state(), 11);
    }

    #[test]
    fn pick_weighted_empty_is_none() {
        let mut rng = GameRng::new(11);
        let items: [f64; 0] = [];
        assert!(rng.pick_weighted(&items, |w| *w).is_none());
    }

    #[test]
    fn pick_weighted_skips_non_positive_weights() {
        let mut rng = GameRng::new(3);
        let items = [("never", 0.0), ("always", 5.0), ("negative", -1.0)];
        for _ in 0..500 {
            let picked = rng.pick_weighted(&items, |item| item.1);
            assert_eq!(picked.map(|item| item.0), Some("always"));
        }
    }

    #[test]
    fn pick_weighted_follows_cumulative_scan() {
        // Seed 1 first float is ~0.000063, so the first positive item wins.
        let mut rng = GameRng::new(1);
        let items = [10.0, 20.0, 30.0];
        assert_eq!(rng.pick_weighted(&items, |w| *w), Some(&10.0));
        // Second float is ~0.01575 * 60 = 0.94, still inside the first bucket.
        assert_eq!(rng.pick_weighted(&items, |w| *w), Some(&10.0));
        // Third float is ~0.6164 * 60 = 36.98, which lands in the third bucket.
        assert_eq!(rng.pick_weighted(&items, |w| *w), Some(&30.0));
    }

    #[test]
    fn serialization_roundtrip() {
        let mut rng = GameRng::new(42);
        for _ in 0..100 {
            rng.next_u32();
        }
        let json = serde_json::to_string(&rng).unwrap();
        // Serialized as the bare integer state.
        assert_eq!(json, rng.state().to_string());
        let mut restored: GameRng = serde_json::from_str(&json).unwrap();
        for _ in 0..100 {
            assert_eq!(rng.next_u32(), restored.next_u32());
        }
    }
}
