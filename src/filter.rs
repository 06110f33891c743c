use crate::config::{BloomFilterConfig, BloomParams};
use crate::error::{BloomError, Result};
use crate::hash::BloomItem;
use crate::mixer::{CacheAlignedMixer, DoubleHashMixer, Mixer};
use crate::storage::{AtomicBlockStorage, BitStorage, BlockStorage, SharedBitStorage};
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, trace};

/// A Bloom filter over items of type `T`.
///
/// `M` maps an item to its bit positions and `S` holds the bits. With the
/// default [`BlockStorage`] the filter is single-threaded; with
/// [`AtomicBlockStorage`] (see [`ThreadSafeBloomFilter`]) items can be
/// inserted from many threads through `&self`.
///
/// The filter has no false negatives: an inserted item is reported present
/// until the next `clear`. Items never inserted may be reported present with
/// a probability that approaches the configured rate as the filter fills.
pub struct BloomFilter<T: ?Sized, M = DoubleHashMixer, S = BlockStorage> {
    params: BloomParams,
    mixer: M,
    storage: S,
    _item: PhantomData<fn(&T)>,
}

/// Filter whose inserts are lock-free atomic ORs.
pub type ThreadSafeBloomFilter<T, M = DoubleHashMixer> =
    BloomFilter<T, M, AtomicBlockStorage>;

/// Filter keeping every item's bits inside one cache line.
pub type CacheAlignedBloomFilter<T, S = BlockStorage> =
    BloomFilter<T, CacheAlignedMixer, S>;

impl<T, M, S> BloomFilter<T, M, S>
where
    T: BloomItem + ?Sized,
    M: Mixer + Default,
    S: BitStorage,
{
    pub fn new(params: BloomParams) -> Result<Self> {
        Self::with_mixer(params, M::default())
    }

    /// Sizes the filter for `estimated_count` items at `expected_fpr`.
    pub fn from_capacity(estimated_count: usize, expected_fpr: f64) -> Result<Self> {
        Self::new(BloomParams::from_capacity(estimated_count, expected_fpr)?)
    }

    pub fn from_explicit(bit_count: usize, num_hashes: usize) -> Result<Self> {
        Self::new(BloomParams::from_explicit(bit_count, num_hashes)?)
    }
}

impl<T, M, S> BloomFilter<T, M, S>
where
    T: BloomItem + ?Sized,
    M: Mixer,
    S: BitStorage,
{
    pub fn from_config(config: BloomFilterConfig) -> Result<Self> {
        config.validate()?;
        let mixer = M::with_hash_function(config.hash_function);
        Self::with_mixer(config.params()?, mixer)
    }

    /// Allocates zeroed storage for `params`. Mixers that need alignment get
    /// the bit count rounded up first.
    pub fn with_mixer(params: BloomParams, mixer: M) -> Result<Self> {
        params.validate()?;

        let params = if M::ALIGN_BITS > 0 && params.bit_count() % M::ALIGN_BITS != 0
        {
            let aligned = params.aligned_to(M::ALIGN_BITS)?;
            debug!(
                requested = params.bit_count(),
                aligned = aligned.bit_count(),
                align_bits = M::ALIGN_BITS,
                "Rounded bit count up to mixer alignment"
            );
            aligned
        } else {
            params
        };

        let storage = S::with_bit_count(params.bit_count())?;
        debug!(
            bit_count = params.bit_count(),
            num_hashes = params.num_hashes(),
            block_count = storage.block_count(),
            block_bits = <S::Block as crate::storage::Block>::BITS,
            "Created Bloom filter"
        );

        Ok(Self {
            params,
            mixer,
            storage,
            _item: PhantomData,
        })
    }

    /// Wraps an existing storage, which is not cleared. Positions are taken
    /// modulo the storage's bit count, which must cover `params`.
    pub fn with_storage(params: BloomParams, mixer: M, storage: S) -> Result<Self> {
        params.validate()?;
        if params.bit_count() > storage.bit_count() {
            return Err(BloomError::InvalidParameter(format!(
                "Parameters cannot fit into storage: params.bit_count={} storage.bit_count={}",
                params.bit_count(),
                storage.bit_count()
            )));
        }
        if M::ALIGN_BITS > 0 && storage.bit_count() % M::ALIGN_BITS != 0 {
            return Err(BloomError::InvalidParameter(format!(
                "storage.bit_count={} is not a multiple of the mixer alignment {}",
                storage.bit_count(),
                M::ALIGN_BITS
            )));
        }

        Ok(Self {
            params,
            mixer,
            storage,
            _item: PhantomData,
        })
    }

    pub fn params(&self) -> &BloomParams {
        &self.params
    }

    pub fn mixer(&self) -> &M {
        &self.mixer
    }

    /// The underlying bit storage.
    pub fn data(&self) -> &S {
        &self.storage
    }

    /// Copies the raw blocks out; bit `i` is bit `i % W` of block `i / W`.
    pub fn to_blocks(&self) -> Vec<S::Block> {
        self.storage.to_blocks()
    }

    /// Gives the storage back, e.g. to hand its blocks to a persistence layer.
    pub fn into_storage(self) -> S {
        self.storage
    }

    fn positions(&self, item: &T) -> M::Positions {
        item.with_bytes(|bytes| {
            self.mixer.positions(
                bytes,
                self.params.num_hashes(),
                self.storage.bit_count(),
            )
        })
    }

    /// Inserting the same item again changes nothing.
    pub fn insert(&mut self, item: &T) {
        for position in self.positions(item) {
            self.storage.set(position);
        }
    }

    /// `false` means the item was definitely never inserted since the last
    /// `clear`; `true` means it probably was.
    pub fn might_contain(&self, item: &T) -> bool {
        self.positions(item).all(|position| self.storage.get(position))
    }

    pub fn clear(&mut self) {
        trace!("Clearing Bloom filter");
        self.storage.clear();
    }

    /// Number of bits currently set. This is a saturation statistic, not an
    /// element count; see [`estimated_len`](Self::estimated_len).
    pub fn count(&self) -> usize {
        self.storage.count_ones()
    }

    /// Alias for [`count`](Self::count).
    pub fn set_bit_count(&self) -> usize {
        self.count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Fraction of bits set, in `[0, 1]`.
    pub fn saturation(&self) -> f64 {
        self.count() as f64 / self.storage.bit_count() as f64
    }

    /// Approximate number of distinct items inserted, from the set-bit count.
    pub fn estimated_len(&self) -> usize {
        self.effective_params().estimate_elements(self.count())
    }

    /// Probability that a never-inserted item is reported present, given the
    /// bits set right now: `(X/m)^k`.
    pub fn current_fpr(&self) -> f64 {
        self.saturation().powf(self.params.num_hashes() as f64)
    }

    // Positions range over the storage, which may be larger than `params`.
    fn effective_params(&self) -> BloomParams {
        BloomParams::from_explicit(self.storage.bit_count(), self.params.num_hashes())
            .unwrap_or(self.params)
    }
}

impl<T, M, S> BloomFilter<T, M, S>
where
    T: BloomItem + ?Sized,
    M: Mixer,
    S: SharedBitStorage,
{
    /// Inserts through a shared reference. Safe to call from many threads at
    /// once; each bit is set with one atomic OR.
    pub fn insert_shared(&self, item: &T) {
        for position in self.positions(item) {
            self.storage.set_shared(position);
        }
    }

    /// Clears through a shared reference. Not atomic with respect to
    /// concurrent inserts, which may survive partially.
    pub fn clear_shared(&self) {
        trace!("Clearing Bloom filter");
        self.storage.clear_shared();
    }
}

impl<'a, T, M, S> Extend<&'a T> for BloomFilter<T, M, S>
where
    T: BloomItem + ?Sized + 'a,
    M: Mixer,
    S: BitStorage,
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        for item in iter {
            self.insert(item);
        }
    }
}

impl<T: ?Sized, M: Clone, S: Clone> Clone for BloomFilter<T, M, S> {
    fn clone(&self) -> Self {
        Self {
            params: self.params,
            mixer: self.mixer.clone(),
            storage: self.storage.clone(),
            _item: PhantomData,
        }
    }
}

impl<T: ?Sized, M, S: BitStorage> fmt::Debug for BloomFilter<T, M, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BloomFilter {{ bit_count: {}, num_hashes: {}, block_count: {}, set_bits: {} }}",
            self.storage.bit_count(),
            self.params.num_hashes(),
            self.storage.block_count(),
            self.storage.count_ones()
        )
    }
}

impl<T: ?Sized, M, S: fmt::Display> fmt::Display for BloomFilter<T, M, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{params={} data={}}}", self.params, self.storage)
    }
}
