//! Block-based Bloom filter with sequential and lock-free concurrent storage.
//!
//! A Bloom filter answers "have I seen this before?" with no false negatives
//! and a tunable false positive rate, using a fixed amount of memory. It is
//! meant as an existence pre-check in front of something expensive: a disk
//! read, a network lookup, a dedup table.
//!
//! HowTo:
//!    * Sizing: [`BloomParams`] derives the bit count `m` and hash count `k`
//!      from an expected element count and target false positive rate, or
//!      takes them as given.
//!    * Mixing: a [`Mixer`] hashes an item once into two 64-bit digests and
//!      expands them into `k` positions with double hashing.
//!    * Storage: a [`BitStorage`] holds the bits in fixed-width blocks.
//!      [`BlockStorage`] is single-threaded; [`AtomicBlockStorage`] sets bits
//!      with an atomic OR so many threads can insert at once.
//!
//! Insertion sets the `k` bits of an item; a query reports the item present
//! only if all `k` bits are set. Elements cannot be removed; `clear` resets
//! the whole filter.
//!
//! ```
//! use blockbloom::BloomFilter;
//!
//! let mut filter = BloomFilter::<str>::from_capacity(1000, 0.01)?;
//! filter.insert("apple");
//! assert!(filter.might_contain("apple"));
//! # Ok::<(), blockbloom::BloomError>(())
//! ```

mod config;
mod error;
mod filter;
mod hash;
mod mixer;
pub mod storage;

pub use config::{
    BloomFilterConfig, BloomFilterConfigBuilder, BloomFilterConfigBuilderError,
    BloomParams, optimal_bit_vector_size, optimal_num_hashes,
};
pub use error::{BloomError, Result};
pub use filter::{BloomFilter, CacheAlignedBloomFilter, ThreadSafeBloomFilter};
pub use hash::{BloomItem, HashFunction, default_hash_function};
pub use mixer::{
    CACHE_LINE_BITS, CacheAlignedMixer, CacheAlignedPositions, DoubleHashMixer,
    DoubleHashPositions, Mixer,
};
pub use storage::{
    AtomicBlockStorage, BitStorage, Block, BlockStorage, SharedBitStorage,
};
