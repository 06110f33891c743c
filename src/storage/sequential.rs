use super::{
    BitStorage, Block, block_count_for, check_bit_count, check_blocks,
    check_index, check_mask, reserve_blocks, write_hex,
};
use crate::error::Result;
use bitvec::{order::Lsb0, slice::BitSlice, vec::BitVec};
use std::fmt;

/// Single-threaded storage backed by a `BitVec`.
///
/// No synchronization: callers sharing it across threads must provide their
/// own exclusion.
#[derive(Clone)]
pub struct BlockStorage<B: Block = usize> {
    bits: BitVec<B, Lsb0>,
}

impl<B: Block> BlockStorage<B> {
    fn from_raw(blocks: Vec<B>, bit_count: usize) -> Self {
        let mut bits = BitVec::from_vec(blocks);
        bits.truncate(bit_count);
        Self { bits }
    }

    /// Raw blocks, without copying.
    pub fn as_blocks(&self) -> &[B] {
        self.bits.as_raw_slice()
    }

    pub fn as_bitslice(&self) -> &BitSlice<B, Lsb0> {
        self.bits.as_bitslice()
    }
}

impl<B: Block> BitStorage for BlockStorage<B> {
    type Block = B;

    fn with_bit_count(bit_count: usize) -> Result<Self> {
        let mut blocks = reserve_blocks::<B, B>(bit_count)?;
        blocks.resize(block_count_for::<B>(bit_count), B::EMPTY);
        Ok(Self::from_raw(blocks, bit_count))
    }

    fn from_blocks(bit_count: usize, blocks: Vec<B>) -> Result<Self> {
        check_bit_count(bit_count)?;
        check_blocks(bit_count, &blocks)?;
        Ok(Self::from_raw(blocks, bit_count))
    }

    fn bit_count(&self) -> usize {
        self.bits.len()
    }

    fn block_count(&self) -> usize {
        self.bits.as_raw_slice().len()
    }

    fn block(&self, block_index: usize) -> B {
        self.bits.as_raw_slice()[block_index]
    }

    fn set_mask(&mut self, block_index: usize, mask: B) {
        check_mask(block_index, mask, self.bits.len());
        self.bits.as_raw_mut_slice()[block_index] |= mask;
    }

    fn clear(&mut self) {
        self.bits.fill(false);
    }

    fn get(&self, index: usize) -> bool {
        check_index(index, self.bits.len());
        self.bits[index]
    }

    fn set(&mut self, index: usize) {
        check_index(index, self.bits.len());
        self.bits.set(index, true);
    }

    fn count_ones(&self) -> usize {
        self.bits.count_ones()
    }

    fn to_blocks(&self) -> Vec<B> {
        self.bits.as_raw_slice().to_vec()
    }
}

impl<B: Block> fmt::Display for BlockStorage<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, self.as_blocks().iter().copied())
    }
}

impl<B: Block> fmt::Debug for BlockStorage<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockStorage")
            .field("bit_count", &self.bit_count())
            .field("block_count", &self.block_count())
            .field("set_bits", &self.count_ones())
            .finish()
    }
}
