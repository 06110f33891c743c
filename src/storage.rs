//! Bit array storage for Bloom filters.
//!
//! A storage owns `bit_count` bits laid out in fixed-width blocks: block `i`
//! holds bits `[i * W, (i + 1) * W)`, bit `j` of a block being `1 << j`.
//! Both implementations share that layout, so their block dumps compare equal
//! when the same bits are set.
mod atomic;
mod block;
mod sequential;

pub use atomic::AtomicBlockStorage;
pub use block::Block;
pub use sequential::BlockStorage;

use crate::error::{BloomError, Result};
use std::fmt;

/// Largest bit count a storage may address.
pub const MAX_BITS: usize = usize::MAX >> 3;

// Trait for the storage backend
pub trait BitStorage: Sized {
    type Block: Block;

    /// Allocates a zeroed storage holding `bit_count` bits.
    fn with_bit_count(bit_count: usize) -> Result<Self>;
    /// Rebuilds a storage from blocks previously returned by `to_blocks`.
    fn from_blocks(bit_count: usize, blocks: Vec<Self::Block>) -> Result<Self>;

    fn bit_count(&self) -> usize;
    fn block_count(&self) -> usize;
    /// Loads the block at `block_index`.
    fn block(&self, block_index: usize) -> Self::Block;
    /// ORs `mask` into the block at `block_index`.
    fn set_mask(&mut self, block_index: usize, mask: Self::Block);
    /// Resets every bit to zero.
    fn clear(&mut self);

    fn get(&self, index: usize) -> bool {
        check_index(index, self.bit_count());
        let (block_index, mask) = locate::<Self::Block>(index);
        self.block(block_index) & mask != Self::Block::EMPTY
    }

    fn set(&mut self, index: usize) {
        check_index(index, self.bit_count());
        let (block_index, mask) = locate::<Self::Block>(index);
        self.set_mask(block_index, mask);
    }

    /// Number of bits currently set.
    fn count_ones(&self) -> usize {
        (0..self.block_count())
            .map(|i| self.block(i).ones() as usize)
            .sum()
    }

    /// Copies the blocks out, block 0 first.
    fn to_blocks(&self) -> Vec<Self::Block> {
        (0..self.block_count()).map(|i| self.block(i)).collect()
    }
}

/// Storage whose bits can be set through a shared reference.
///
/// `set_shared` and `set_mask_shared` are atomic ORs, so concurrent setters
/// never lose each other's bits. `clear_shared` and reads are not atomic with
/// respect to concurrent setters; stop writers first when a consistent view
/// is needed.
pub trait SharedBitStorage: BitStorage + Sync {
    fn set_mask_shared(&self, block_index: usize, mask: Self::Block);
    fn clear_shared(&self);

    fn set_shared(&self, index: usize) {
        check_index(index, self.bit_count());
        let (block_index, mask) = locate::<Self::Block>(index);
        self.set_mask_shared(block_index, mask);
    }
}

/// Number of `B` blocks needed for `bit_count` bits.
pub fn block_count_for<B: Block>(bit_count: usize) -> usize {
    bit_count.div_ceil(B::BITS)
}

pub(crate) fn locate<B: Block>(index: usize) -> (usize, B) {
    (index / B::BITS, B::ONE << (index % B::BITS))
}

#[track_caller]
pub(crate) fn check_index(index: usize, bit_count: usize) {
    assert!(
        index < bit_count,
        "bit index out of bounds: {index} >= {bit_count}"
    );
}

/// A mask may only touch live bits of an existing block.
#[track_caller]
pub(crate) fn check_mask<B: Block>(block_index: usize, mask: B, bit_count: usize) {
    let block_count = block_count_for::<B>(bit_count);
    assert!(
        block_index < block_count,
        "block index out of bounds: {block_index} >= {block_count}"
    );
    let used = bit_count % B::BITS;
    assert!(
        block_index + 1 < block_count || used == 0 || mask >> used == B::EMPTY,
        "mask {mask:#x} reaches past bit {bit_count}"
    );
}

pub(crate) fn check_bit_count(bit_count: usize) -> Result<()> {
    if bit_count == 0 {
        return Err(BloomError::InvalidParameter(
            "bit_count must be at least 1".into(),
        ));
    }
    if bit_count > MAX_BITS {
        return Err(BloomError::AllocationFailure {
            bit_count,
            reason: format!("more than {MAX_BITS} bits are not addressable"),
        });
    }
    Ok(())
}

/// Validates `bit_count` and reserves room for its blocks without aborting
/// on allocation failure.
pub(crate) fn reserve_blocks<B: Block, X>(bit_count: usize) -> Result<Vec<X>> {
    check_bit_count(bit_count)?;
    let mut blocks = Vec::new();
    blocks
        .try_reserve_exact(block_count_for::<B>(bit_count))
        .map_err(|e| BloomError::AllocationFailure {
            bit_count,
            reason: e.to_string(),
        })?;
    Ok(blocks)
}

pub(crate) fn check_blocks<B: Block>(bit_count: usize, blocks: &[B]) -> Result<()> {
    let expected = block_count_for::<B>(bit_count);
    if blocks.len() != expected {
        return Err(BloomError::InvalidParameter(format!(
            "{bit_count} bits need {expected} blocks, got {}",
            blocks.len()
        )));
    }
    let used = bit_count % B::BITS;
    if let Some(&last) = blocks.last() {
        if used != 0 && last >> used != B::EMPTY {
            return Err(BloomError::InvalidParameter(format!(
                "last block {last:#x} has bits set past bit {bit_count}"
            )));
        }
    }
    Ok(())
}

/// Writes every block as zero-padded hex, block 0 first.
pub(crate) fn write_hex<B: Block>(
    f: &mut fmt::Formatter<'_>,
    blocks: impl Iterator<Item = B>,
) -> fmt::Result {
    let width = B::BITS / 4;
    for block in blocks {
        write!(f, "{block:0width$x}")?;
    }
    Ok(())
}
