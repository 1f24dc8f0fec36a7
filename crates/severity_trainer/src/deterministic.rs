//! Deterministic utilities for reproducible training
//!
//! A seeded LCG drives every random choice (split, bootstrap, feature order),
//! so the same seed and data always produce the same forest on any platform.

use std::num::Wrapping;

/// Linear Congruential Generator (glibc constants)
#[derive(Clone, Debug)]
pub struct LcgRng {
    state: Wrapping<i64>,
}

impl LcgRng {
    const MULTIPLIER: i64 = 1103515245;
    const INCREMENT: i64 = 12345;
    const MODULUS: i64 = 1 << 31;

    pub fn new(seed: i64) -> Self {
        Self {
            state: Wrapping(seed.rem_euclid(Self::MODULUS)),
        }
    }

    /// Next value in [0, 2^31)
    pub fn next_i64(&mut self) -> i64 {
        self.state = self.state * Wrapping(Self::MULTIPLIER) + Wrapping(Self::INCREMENT);
        self.state.0 & (Self::MODULUS - 1)
    }

    /// Uniform index in [0, n)
    ///
    /// Scales by the high bits; the low bits of an LCG cycle with short periods.
    pub fn next_index(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        ((self.next_i64() as u64 * n as u64) >> 31) as usize
    }

    /// Fisher-Yates shuffle
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_index(i + 1);
            items.swap(i, j);
        }
    }
}

/// Deterministic xxhash64-style mix over i64 words
pub fn xxhash64_i64(data: &[i64], seed: i64) -> i64 {
    const PRIME1: i64 = 0x9E3779B185EBCA87_u64 as i64;
    const PRIME2: i64 = 0xC2B2AE3D27D4EB4F_u64 as i64;
    const PRIME3: i64 = 0x165667B19E3779F9_u64 as i64;
    const PRIME5: i64 = 0x85EBCA77C2B2AE63_u64 as i64;

    let mut h = seed.wrapping_add(PRIME5);

    for &val in data {
        h = h.wrapping_add(val.wrapping_mul(PRIME3));
        h = h.rotate_left(17).wrapping_mul(PRIME2);
    }

    h ^= ((h as u64) >> 33) as i64;
    h = h.wrapping_mul(PRIME1);
    h ^= ((h as u64) >> 29) as i64;
    h = h.wrapping_mul(PRIME2);
    h ^= ((h as u64) >> 32) as i64;

    h
}

/// Independent seed for the `index`-th tree of a forest
pub fn mix_seed(seed: i64, index: usize) -> i64 {
    xxhash64_i64(&[index as i64], seed)
}

/// Deterministic ordering among equally good splits
///
/// The smallest `(feature_idx, threshold)` wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SplitTieBreaker {
    pub feature_idx: usize,
    pub threshold: i64,
}

impl SplitTieBreaker {
    pub fn new(feature_idx: usize, threshold: i64) -> Self {
        Self {
            feature_idx,
            threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcg_determinism() {
        let mut rng1 = LcgRng::new(42);
        let mut rng2 = LcgRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.next_i64(), rng2.next_i64());
        }
    }

    #[test]
    fn test_lcg_negative_seed() {
        let mut rng = LcgRng::new(i64::MIN);
        let value = rng.next_i64();
        assert!((0..1 << 31).contains(&value));
    }

    #[test]
    fn test_next_index_range() {
        let mut rng = LcgRng::new(42);
        let mut seen = [false; 10];
        for _ in 0..1000 {
            let idx = rng.next_index(10);
            assert!(idx < 10);
            seen[idx] = true;
        }
        assert!(seen.iter().all(|s| *s));
        assert_eq!(rng.next_index(0), 0);
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut items: Vec<usize> = (0..50).collect();
        LcgRng::new(7).shuffle(&mut items);

        let mut again: Vec<usize> = (0..50).collect();
        LcgRng::new(7).shuffle(&mut again);
        assert_eq!(items, again);

        assert_ne!(items, (0..50).collect::<Vec<_>>());
        items.sort_unstable();
        assert_eq!(items, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_xxhash64_different_seeds() {
        let data = vec![1, 2, 3, 4, 5];
        assert_eq!(xxhash64_i64(&data, 42), xxhash64_i64(&data, 42));
        assert_ne!(xxhash64_i64(&data, 42), xxhash64_i64(&data, 43));
    }

    #[test]
    fn test_mix_seed_distinct_per_tree() {
        let seeds: std::collections::BTreeSet<i64> = (0..200).map(|i| mix_seed(42, i)).collect();
        assert_eq!(seeds.len(), 200);
    }

    #[test]
    fn test_tie_breaker_ordering() {
        let t1 = SplitTieBreaker::new(0, 100);
        let t2 = SplitTieBreaker::new(0, 200);
        let t3 = SplitTieBreaker::new(1, 50);

        assert!(t1 < t2);
        assert!(t2 < t3);
    }
}
