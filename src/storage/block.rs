use bitvec::store::BitStore;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Shl, Shr};
use std::sync::atomic::{
    AtomicU8, AtomicU16, AtomicU32, AtomicU64, AtomicUsize, Ordering,
};

/// Fixed-width unsigned word the bit array is made of.
///
/// `Atomic` is the matching atomic integer used by
/// [`AtomicBlockStorage`](super::AtomicBlockStorage). All atomic accesses are
/// `Relaxed`: a set bit only ever has to become visible, it never publishes
/// other memory.
pub trait Block:
    BitStore
    + Copy
    + Eq
    + Default
    + fmt::Debug
    + fmt::LowerHex
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitOrAssign
    + Shl<usize, Output = Self>
    + Shr<usize, Output = Self>
    + Send
    + Sync
    + 'static
{
    const BITS: usize;
    const EMPTY: Self;
    const ONE: Self;

    type Atomic: Send + Sync + fmt::Debug;

    fn ones(self) -> u32;
    fn new_atomic(value: Self) -> Self::Atomic;
    fn load(atomic: &Self::Atomic) -> Self;
    fn store(atomic: &Self::Atomic, value: Self);
    fn fetch_or(atomic: &Self::Atomic, mask: Self);
}

macro_rules! impl_block {
    ($($t:ty => $atomic:ty),* $(,)?) => {
        $(
            impl Block for $t {
                const BITS: usize = <$t>::BITS as usize;
                const EMPTY: Self = 0;
                const ONE: Self = 1;

                type Atomic = $atomic;

                #[inline]
                fn ones(self) -> u32 {
                    self.count_ones()
                }

                #[inline]
                fn new_atomic(value: Self) -> Self::Atomic {
                    <$atomic>::new(value)
                }

                #[inline]
                fn load(atomic: &Self::Atomic) -> Self {
                    atomic.load(Ordering::Relaxed)
                }

                #[inline]
                fn store(atomic: &Self::Atomic, value: Self) {
                    atomic.store(value, Ordering::Relaxed)
                }

                #[inline]
                fn fetch_or(atomic: &Self::Atomic, mask: Self) {
                    atomic.fetch_or(mask, Ordering::Relaxed);
                }
            }
        )*
    };
}

impl_block!(
    u8 => AtomicU8,
    u16 => AtomicU16,
    u32 => AtomicU32,
    usize => AtomicUsize,
);

#[cfg(target_pointer_width = "64")]
impl_block!(u64 => AtomicU64);
