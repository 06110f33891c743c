use fnv::FnvHasher;
use murmur3::murmur3_x64_128;
use std::hash::Hasher;
use std::io::Cursor;

/// A type alias for the digest function used by the mixers.
///
/// **Parameters:**
///
/// - `item: &[u8]`
///   - A byte slice representing the item to be hashed.
///
/// **Returns:**
///
/// - `(u64, u64)`
///   - Two independent 64-bit digests of the item. Mixers expand this pair
///     into as many bit positions as the filter needs, so the item is read
///     only once per operation.
///
/// The function must be deterministic: the same bytes always produce the
/// same pair, otherwise inserted items would stop being found.
pub type HashFunction = fn(&[u8]) -> (u64, u64);

pub(crate) fn hash_murmur64(key: &[u8]) -> u64 {
    let mut cursor = Cursor::new(key);
    // Only the lower half of the 128-bit digest is used.
    murmur3_x64_128(&mut cursor, 0).expect("Failed to compute Murmur3 hash")
        as u64
}

pub(crate) fn hash_fnv64(key: &[u8]) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(key);
    hasher.finish()
}

pub fn default_hash_function(item: &[u8]) -> (u64, u64) {
    (hash_murmur64(item), hash_fnv64(item))
}

/// Values that can be fed to a [`HashFunction`].
///
/// Implementations hand a byte view of the value to `f`. Integers use their
/// little-endian encoding so that filters built on different hosts agree.
pub trait BloomItem {
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R;
}

impl BloomItem for [u8] {
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(self)
    }
}

impl<const N: usize> BloomItem for [u8; N] {
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(self.as_slice())
    }
}

impl BloomItem for Vec<u8> {
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(self.as_slice())
    }
}

impl BloomItem for str {
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(self.as_bytes())
    }
}

impl BloomItem for String {
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(self.as_bytes())
    }
}

impl<I: BloomItem + ?Sized> BloomItem for &I {
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        (**self).with_bytes(f)
    }
}

impl BloomItem for bool {
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&[u8::from(*self)])
    }
}

impl BloomItem for char {
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&u32::from(*self).to_le_bytes())
    }
}

macro_rules! impl_bloom_item_for_int {
    ($($t:ty),*) => {
        $(
            impl BloomItem for $t {
                fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
                    f(&self.to_le_bytes())
                }
            }
        )*
    };
}

impl_bloom_item_for_int!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize
);
