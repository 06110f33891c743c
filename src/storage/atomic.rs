use super::{
    BitStorage, Block, SharedBitStorage, block_count_for, check_blocks,
    check_mask, reserve_blocks, write_hex,
};
use crate::error::Result;
use std::fmt;

/// Storage whose bits are set with an atomic OR per block.
///
/// Any number of threads may call [`SharedBitStorage::set_shared`] at once;
/// each call is a single wait-free `fetch_or`, so no set bit is ever lost.
/// Clearing and reading are plain relaxed per-block accesses.
pub struct AtomicBlockStorage<B: Block = usize> {
    blocks: Box<[B::Atomic]>,
    bit_count: usize,
}

impl<B: Block> BitStorage for AtomicBlockStorage<B> {
    type Block = B;

    fn with_bit_count(bit_count: usize) -> Result<Self> {
        let mut blocks = reserve_blocks::<B, B::Atomic>(bit_count)?;
        let count = block_count_for::<B>(bit_count);
        blocks.extend((0..count).map(|_| B::new_atomic(B::EMPTY)));
        Ok(Self {
            blocks: blocks.into_boxed_slice(),
            bit_count,
        })
    }

    fn from_blocks(bit_count: usize, values: Vec<B>) -> Result<Self> {
        let mut blocks = reserve_blocks::<B, B::Atomic>(bit_count)?;
        check_blocks(bit_count, &values)?;
        blocks.extend(values.into_iter().map(B::new_atomic));
        Ok(Self {
            blocks: blocks.into_boxed_slice(),
            bit_count,
        })
    }

    fn bit_count(&self) -> usize {
        self.bit_count
    }

    fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn block(&self, block_index: usize) -> B {
        B::load(&self.blocks[block_index])
    }

    fn set_mask(&mut self, block_index: usize, mask: B) {
        self.set_mask_shared(block_index, mask);
    }

    fn clear(&mut self) {
        self.clear_shared();
    }

    fn set(&mut self, index: usize) {
        self.set_shared(index);
    }
}

impl<B: Block> SharedBitStorage for AtomicBlockStorage<B> {
    fn set_mask_shared(&self, block_index: usize, mask: B) {
        check_mask(block_index, mask, self.bit_count);
        B::fetch_or(&self.blocks[block_index], mask);
    }

    fn clear_shared(&self) {
        for block in self.blocks.iter() {
            B::store(block, B::EMPTY);
        }
    }
}

impl<B: Block> fmt::Display for AtomicBlockStorage<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, self.blocks.iter().map(B::load))
    }
}

impl<B: Block> fmt::Debug for AtomicBlockStorage<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicBlockStorage")
            .field("bit_count", &self.bit_count)
            .field("block_count", &self.blocks.len())
            .field("set_bits", &self.count_ones())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BlockStorage;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_new_storage_is_zeroed() {
        let storage = AtomicBlockStorage::<u32>::with_bit_count(70).unwrap();
        assert_eq!(storage.bit_count(), 70);
        assert_eq!(storage.block_count(), 3);
        assert_eq!(storage.count_ones(), 0);
    }

    #[test]
    fn test_set_shared_and_get() {
        let storage = AtomicBlockStorage::<u8>::with_bit_count(12).unwrap();
        storage.set_shared(3);
        storage.set_shared(11);
        storage.set_shared(11);
        assert!(storage.get(3));
        assert!(storage.get(11));
        assert!(!storage.get(4));
        assert_eq!(storage.to_blocks(), vec![0b0000_1000, 0b0000_1000]);
    }

    #[test]
    fn test_same_layout_as_sequential() {
        let mut sequential = BlockStorage::<u16>::with_bit_count(100).unwrap();
        let mut atomic = AtomicBlockStorage::<u16>::with_bit_count(100).unwrap();
        for i in (0..100).filter(|i| i % 3 == 0) {
            sequential.set(i);
            atomic.set(i);
        }
        assert_eq!(sequential.to_blocks(), atomic.to_blocks());
        assert_eq!(sequential.to_string(), atomic.to_string());
        assert_eq!(sequential.count_ones(), atomic.count_ones());
    }

    #[test]
    fn test_concurrent_sets_are_not_lost() {
        const THREADS: usize = 8;
        const BITS: usize = 4096;

        let storage =
            Arc::new(AtomicBlockStorage::<u64>::with_bit_count(BITS).unwrap());

        // Interleaved indices so every block is contended by all threads.
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let storage = Arc::clone(&storage);
                thread::spawn(move || {
                    for i in (t..BITS).step_by(THREADS) {
                        storage.set_shared(i);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(storage.count_ones(), BITS);
        assert!(storage.to_blocks().iter().all(|&b| b == u64::MAX));
    }

    #[test]
    fn test_clear_shared() {
        let storage = AtomicBlockStorage::<usize>::with_bit_count(200).unwrap();
        storage.set_shared(0);
        storage.set_shared(199);
        storage.clear_shared();
        assert_eq!(storage.count_ones(), 0);
    }

    #[test]
    fn test_from_blocks() {
        let storage =
            AtomicBlockStorage::<u8>::from_blocks(10, vec![0xff, 0x03]).unwrap();
        assert_eq!(storage.count_ones(), 10);
        assert!(AtomicBlockStorage::<u8>::from_blocks(10, vec![0, 0x04]).is_err());
    }

    #[test]
    #[should_panic(expected = "bit index out of bounds")]
    fn test_set_out_of_range_panics() {
        let storage = AtomicBlockStorage::<u64>::with_bit_count(10).unwrap();
        storage.set_shared(10);
    }

    #[test]
    #[should_panic(expected = "bit index out of bounds")]
    fn test_get_out_of_range_panics() {
        let storage = AtomicBlockStorage::<u32>::with_bit_count(40).unwrap();
        storage.get(40);
    }
}
