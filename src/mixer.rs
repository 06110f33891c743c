//! Mixers turn one item into the `k` bit positions it occupies.
//!
//! Both mixers hash the item once and expand the two digests with double
//! hashing (Kirsch–Mitzenmacher): position `i` is `h1 + i * h2` reduced into
//! range. The sequence depends only on the item bytes, `k` and `m`.
use crate::hash::{HashFunction, default_hash_function};
use std::iter::FusedIterator;

pub trait Mixer {
    /// Bit-count alignment the mixer needs, `0` for none. Filters round their
    /// bit count up to a multiple of it.
    const ALIGN_BITS: usize;

    type Positions: Iterator<Item = usize>;

    fn with_hash_function(hash_function: HashFunction) -> Self
    where
        Self: Sized;

    fn hash_function(&self) -> HashFunction;

    /// Yields exactly `num_hashes` positions, each in `[0, bit_count)`.
    fn positions(
        &self,
        item: &[u8],
        num_hashes: usize,
        bit_count: usize,
    ) -> Self::Positions;
}

/// Standard layout: positions spread over the whole bit array.
#[derive(Debug, Clone, Copy)]
pub struct DoubleHashMixer {
    hash_function: HashFunction,
}

impl Default for DoubleHashMixer {
    fn default() -> Self {
        Self::with_hash_function(default_hash_function)
    }
}

impl Mixer for DoubleHashMixer {
    const ALIGN_BITS: usize = 0;

    type Positions = DoubleHashPositions;

    fn with_hash_function(hash_function: HashFunction) -> Self {
        Self { hash_function }
    }

    fn hash_function(&self) -> HashFunction {
        self.hash_function
    }

    fn positions(
        &self,
        item: &[u8],
        num_hashes: usize,
        bit_count: usize,
    ) -> DoubleHashPositions {
        assert!(bit_count > 0, "cannot mix into an empty bit array");
        let (h1, h2) = (self.hash_function)(item);
        DoubleHashPositions {
            h1,
            h2,
            bit_count: bit_count as u64,
            index: 0,
            remaining: num_hashes,
        }
    }
}

/// `(h1 + i * h2) mod m` for `i = 0..k`, with wrapping 64-bit arithmetic.
#[derive(Debug, Clone)]
pub struct DoubleHashPositions {
    h1: u64,
    h2: u64,
    bit_count: u64,
    index: u64,
    remaining: usize,
}

impl Iterator for DoubleHashPositions {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let position =
            self.h1.wrapping_add(self.index.wrapping_mul(self.h2)) % self.bit_count;
        self.index += 1;
        self.remaining -= 1;
        Some(position as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for DoubleHashPositions {}
impl FusedIterator for DoubleHashPositions {}

/// Size of one cache-aligned segment, in bits (a 64-byte cache line).
pub const CACHE_LINE_BITS: usize = 512;

/// Blocked layout: all positions of an item land in one 512-bit segment.
///
/// `h1` picks the segment; the low and high halves of `h2` drive the double
/// hashing inside it. A query touches a single cache line, at the cost of a
/// somewhat higher false positive rate than [`DoubleHashMixer`] for the same
/// size.
#[derive(Debug, Clone, Copy)]
pub struct CacheAlignedMixer {
    hash_function: HashFunction,
}

impl Default for CacheAlignedMixer {
    fn default() -> Self {
        Self::with_hash_function(default_hash_function)
    }
}

impl Mixer for CacheAlignedMixer {
    const ALIGN_BITS: usize = CACHE_LINE_BITS;

    type Positions = CacheAlignedPositions;

    fn with_hash_function(hash_function: HashFunction) -> Self {
        Self { hash_function }
    }

    fn hash_function(&self) -> HashFunction {
        self.hash_function
    }

    fn positions(
        &self,
        item: &[u8],
        num_hashes: usize,
        bit_count: usize,
    ) -> CacheAlignedPositions {
        assert!(
            bit_count >= CACHE_LINE_BITS && bit_count % CACHE_LINE_BITS == 0,
            "bit count {bit_count} is not a multiple of {CACHE_LINE_BITS}"
        );
        let (h1, h2) = (self.hash_function)(item);
        let segments = (bit_count / CACHE_LINE_BITS) as u64;
        CacheAlignedPositions {
            base: (h1 % segments) as usize * CACHE_LINE_BITS,
            a: h2 & 0xffff_ffff,
            // Odd, so the stride never collapses onto a single offset.
            b: (h2 >> 32) | 1,
            index: 0,
            remaining: num_hashes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheAlignedPositions {
    base: usize,
    a: u64,
    b: u64,
    index: u64,
    remaining: usize,
}

impl CacheAlignedPositions {
    /// First bit of the segment every position falls in.
    pub fn base_offset(&self) -> usize {
        self.base
    }
}

impl Iterator for CacheAlignedPositions {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let offset = self.a.wrapping_add(self.index.wrapping_mul(self.b))
            % CACHE_LINE_BITS as u64;
        self.index += 1;
        self.remaining -= 1;
        Some(self.base + offset as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for CacheAlignedPositions {}
impl FusedIterator for CacheAlignedPositions {}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_hash(_: &[u8]) -> (u64, u64) {
        (3, 5)
    }

    fn wrapping_hash(_: &[u8]) -> (u64, u64) {
        (u64::MAX, 2)
    }

    #[test]
    fn test_double_hash_formula() {
        let mixer = DoubleHashMixer::with_hash_function(fixed_hash);
        let positions: Vec<_> = mixer.positions(b"anything", 4, 16).collect();
        assert_eq!(positions, vec![3, 8, 13, 2]);
    }

    #[test]
    fn test_double_hash_wraps_instead_of_overflowing() {
        let mixer = DoubleHashMixer::with_hash_function(wrapping_hash);
        let positions: Vec<_> = mixer.positions(b"x", 3, 10).collect();
        // u64::MAX % 10 = 5; u64::MAX + 2 wraps to 1; u64::MAX + 4 wraps to 3.
        assert_eq!(positions, vec![5, 1, 3]);
    }

    #[test]
    fn test_positions_are_deterministic_and_in_range() {
        let mixer = DoubleHashMixer::default();
        for bit_count in [1, 7, 64, 1000, 9586] {
            let first: Vec<_> = mixer.positions(b"item", 7, bit_count).collect();
            let second: Vec<_> = mixer.positions(b"item", 7, bit_count).collect();
            assert_eq!(first, second);
            assert_eq!(first.len(), 7);
            assert!(first.iter().all(|&p| p < bit_count));
        }
    }

    #[test]
    fn test_exact_size() {
        let mixer = DoubleHashMixer::default();
        let mut positions = mixer.positions(b"item", 5, 100);
        assert_eq!(positions.len(), 5);
        positions.next();
        assert_eq!(positions.len(), 4);
        assert_eq!(mixer.positions(b"item", 0, 100).count(), 0);
    }

    #[test]
    fn test_cache_aligned_positions_share_a_segment() {
        let mixer = CacheAlignedMixer::default();
        for i in 0u32..200 {
            let item = i.to_le_bytes();
            let positions = mixer.positions(&item, 8, 4096);
            let base = positions.base_offset();
            assert_eq!(base % CACHE_LINE_BITS, 0);
            for p in positions {
                assert!((base..base + CACHE_LINE_BITS).contains(&p));
                assert!(p < 4096);
            }
        }
    }

    #[test]
    fn test_cache_aligned_formula() {
        let mixer = CacheAlignedMixer::with_hash_function(fixed_hash);
        // Two segments, h1 = 3 picks segment 1; a = 5, b = 0 | 1.
        let positions: Vec<_> = mixer.positions(b"", 3, 1024).collect();
        assert_eq!(positions, vec![517, 518, 519]);
    }

    #[test]
    #[should_panic(expected = "is not a multiple of")]
    fn test_cache_aligned_rejects_unaligned_bit_count() {
        let mixer = CacheAlignedMixer::default();
        let _ = mixer.positions(b"item", 3, 1000);
    }
}
