use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::HashSet;

/// Consistent, human-readable test items
#[allow(dead_code)]
pub fn generate_test_items(count: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|i| format!("test_item_{:06}", i).into_bytes())
        .collect()
}

/// `count` distinct random values from a seeded generator
#[allow(dead_code)]
pub fn generate_distinct_u64(count: usize, seed: u64) -> HashSet<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut values = HashSet::with_capacity(count);
    while values.len() < count {
        values.insert(rng.random::<u64>());
    }
    values
}
