use crate::error::{BloomError, Result};
use crate::hash::{HashFunction, default_hash_function};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::f64::consts::LN_2;
use std::fmt;

/// Configuration for a capacity-sized filter.
#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct BloomFilterConfig {
    /// Expected number of distinct elements
    #[builder(default = "1_000_000")]
    pub capacity: usize,

    /// Target false positive rate (0.0 to 1.0, exclusive)
    #[builder(default = "0.01")]
    pub false_positive_rate: f64,

    /// Digest function handed to the mixer
    #[builder(default = "default_hash_function")]
    pub hash_function: HashFunction,
}

impl BloomFilterConfig {
    pub fn validate(&self) -> Result<()> {
        validate_capacity(self.capacity, self.false_positive_rate)
    }

    pub fn params(&self) -> Result<BloomParams> {
        BloomParams::from_capacity(self.capacity, self.false_positive_rate)
    }
}

fn validate_capacity(estimated_count: usize, expected_fpr: f64) -> Result<()> {
    if estimated_count == 0 {
        return Err(BloomError::InvalidParameter(
            "Capacity must be > 0".into(),
        ));
    }
    // Written so that NaN is rejected as well.
    if !(expected_fpr > 0.0 && expected_fpr < 1.0) {
        return Err(BloomError::InvalidParameter(format!(
            "FPR must be between 0 and 1 (exclusive), got {expected_fpr}"
        )));
    }
    Ok(())
}

/// Sizing of a Bloom filter.
///
/// Variable names in the formulas below:
///  - `k`: hash count
///  - `m`: bit vector length
///  - `n`: number of elements
///  - `p`: false positive rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BloomParams {
    bit_count: usize,
    num_hashes: usize,
    estimated_count: Option<usize>,
    expected_fpr: Option<f64>,
}

impl BloomParams {
    /// Derives `m` and `k` for `n` expected elements at a target rate `p`:
    ///
    /// `m = ceil(-n ln p / (ln 2)^2)`, `k = round((m / n) ln 2)`
    pub fn from_capacity(
        estimated_count: usize,
        expected_fpr: f64,
    ) -> Result<Self> {
        validate_capacity(estimated_count, expected_fpr)?;

        let bits = -(estimated_count as f64) * expected_fpr.ln() / (LN_2 * LN_2);
        if !bits.is_finite() || bits.ceil() >= usize::MAX as f64 {
            return Err(BloomError::InvalidParameter(format!(
                "capacity {estimated_count} at FPR {expected_fpr} needs more bits than fit in usize"
            )));
        }

        let bit_count = optimal_bit_vector_size(estimated_count, expected_fpr);
        let num_hashes = optimal_num_hashes(estimated_count, bit_count);

        Ok(Self {
            bit_count,
            num_hashes,
            estimated_count: Some(estimated_count),
            expected_fpr: Some(expected_fpr),
        })
    }

    /// Takes `m` and `k` as given.
    pub fn from_explicit(bit_count: usize, num_hashes: usize) -> Result<Self> {
        let params = Self {
            bit_count,
            num_hashes,
            estimated_count: None,
            expected_fpr: None,
        };
        params.validate()?;
        Ok(params)
    }

    /// Rejects values that did not come through one of the constructors
    /// (deserialized input, mostly).
    pub fn validate(&self) -> Result<()> {
        if self.bit_count < 1 {
            return Err(BloomError::InvalidParameter(
                "bit_count must be at least 1".into(),
            ));
        }
        if self.num_hashes < 1 {
            return Err(BloomError::InvalidParameter(
                "num_hashes must be at least 1".into(),
            ));
        }
        if let Some(estimated_count) = self.estimated_count {
            validate_capacity(
                estimated_count,
                self.expected_fpr.unwrap_or(f64::NAN),
            )?;
        }
        if let Some(expected_fpr) = self.expected_fpr {
            validate_capacity(self.estimated_count.unwrap_or(1), expected_fpr)?;
        }
        Ok(())
    }

    /// `m`
    pub fn bit_count(&self) -> usize {
        self.bit_count
    }

    /// `k`
    pub fn num_hashes(&self) -> usize {
        self.num_hashes
    }

    /// The `n` these parameters were sized for, if sized from capacity.
    pub fn estimated_count(&self) -> Option<usize> {
        self.estimated_count
    }

    /// The `p` these parameters were sized for, if sized from capacity.
    pub fn expected_fpr(&self) -> Option<f64> {
        self.expected_fpr
    }

    /// Expected false positive rate after `elements` distinct insertions:
    ///
    /// `p = (1 - (1 - 1/m)^(kn))^k`
    pub fn fpr_for(&self, elements: usize) -> f64 {
        let m = self.bit_count as f64;
        let k = self.num_hashes as f64;
        let inner = (1.0 - 1.0 / m).powf(k * elements as f64);
        (1.0 - inner).powf(k)
    }

    /// Estimates how many distinct elements produced `set_bits` ones:
    ///
    /// `n' = -(m/k) ln(1 - X/m)`
    ///
    /// A fully saturated array carries no information and yields `usize::MAX`.
    pub fn estimate_elements(&self, set_bits: usize) -> usize {
        if set_bits >= self.bit_count {
            return usize::MAX;
        }
        let m = self.bit_count as f64;
        let k = self.num_hashes as f64;
        (-(m / k) * (1.0 - set_bits as f64 / m).ln()).round() as usize
    }

    /// Rounds `bit_count` up to a whole multiple of `bits`. Fails with
    /// `AllocationFailure` when the rounded count does not fit in `usize`.
    pub fn aligned_to(mut self, bits: usize) -> Result<Self> {
        if bits == 0 {
            return Ok(self);
        }
        self.bit_count = self.bit_count.checked_next_multiple_of(bits).ok_or_else(|| {
            BloomError::AllocationFailure {
                bit_count: self.bit_count,
                reason: format!("rounding up to a multiple of {bits} overflows usize"),
            }
        })?;
        Ok(self)
    }
}

impl fmt::Display for BloomParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(m={}, k={})", self.bit_count, self.num_hashes)
    }
}

pub fn optimal_bit_vector_size(n: usize, fpr: f64) -> usize {
    let ln2 = LN_2;
    let bits = ((-(n as f64) * fpr.ln()) / (ln2 * ln2)).ceil() as usize;
    bits.max(1)
}

pub fn optimal_num_hashes(n: usize, m: usize) -> usize {
    let k = ((m as f64 / n as f64) * LN_2).round() as usize;
    k.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_capacity_sizing() {
        let params = BloomParams::from_capacity(1000, 0.01).unwrap();
        // -1000 * ln(0.01) / ln(2)^2 = 9585.06
        assert_eq!(params.bit_count(), 9586);
        assert_eq!(params.num_hashes(), 7);
        assert_eq!(params.estimated_count(), Some(1000));
        assert_eq!(params.expected_fpr(), Some(0.01));
    }

    #[test]
    fn test_from_capacity_tiny_filter() {
        let params = BloomParams::from_capacity(1, 0.9).unwrap();
        assert_eq!(params.bit_count(), 1);
        assert_eq!(params.num_hashes(), 1);
    }

    #[test]
    fn test_from_capacity_rejects_invalid_input() {
        for (n, p) in [
            (0, 0.5),
            (10, 0.0),
            (10, 1.0),
            (10, -0.1),
            (10, 1.5),
            (10, f64::NAN),
        ] {
            assert!(
                matches!(
                    BloomParams::from_capacity(n, p),
                    Err(BloomError::InvalidParameter(_))
                ),
                "n={n}, p={p} should be rejected"
            );
        }
    }

    #[test]
    fn test_from_capacity_overflow() {
        let result = BloomParams::from_capacity(usize::MAX, f64::MIN_POSITIVE);
        assert!(matches!(result, Err(BloomError::InvalidParameter(_))));
    }

    #[test]
    fn test_from_explicit() {
        let params = BloomParams::from_explicit(8, 2).unwrap();
        assert_eq!(params.bit_count(), 8);
        assert_eq!(params.num_hashes(), 2);
        assert_eq!(params.estimated_count(), None);
        assert_eq!(params.expected_fpr(), None);

        assert!(BloomParams::from_explicit(0, 3).is_err());
        assert!(BloomParams::from_explicit(8, 0).is_err());
    }

    #[test]
    fn test_fpr_for_matches_target_near_capacity() {
        let params = BloomParams::from_capacity(10_000, 0.01).unwrap();
        let fpr = params.fpr_for(10_000);
        assert!((fpr - 0.01).abs() < 0.001, "fpr_for returned {fpr}");
        assert_eq!(params.fpr_for(0), 0.0);
    }

    #[test]
    fn test_estimate_elements() {
        let params = BloomParams::from_explicit(1000, 1).unwrap();
        assert_eq!(params.estimate_elements(0), 0);
        // One hash, few bits set: nearly one element per bit.
        assert_eq!(params.estimate_elements(10), 10);
        assert_eq!(params.estimate_elements(1000), usize::MAX);
    }

    #[test]
    fn test_aligned_to() {
        let params = BloomParams::from_explicit(1000, 3).unwrap();
        assert_eq!(params.aligned_to(512).unwrap().bit_count(), 1024);
        assert_eq!(params.aligned_to(0).unwrap().bit_count(), 1000);
        assert_eq!(params.aligned_to(8).unwrap().bit_count(), 1000);
    }

    #[test]
    fn test_aligned_to_overflow() {
        let params = BloomParams::from_explicit(usize::MAX - 100, 3).unwrap();
        assert!(matches!(
            params.aligned_to(512),
            Err(BloomError::AllocationFailure { .. })
        ));
        // Already aligned: nothing to round, nothing to overflow.
        let params = BloomParams::from_explicit(usize::MAX, 3).unwrap();
        assert_eq!(params.aligned_to(1).unwrap().bit_count(), usize::MAX);
    }

    #[test]
    fn test_display() {
        let params = BloomParams::from_explicit(64, 4).unwrap();
        assert_eq!(params.to_string(), "(m=64, k=4)");
    }

    #[test]
    fn test_config_builder_defaults() {
        let config = BloomFilterConfigBuilder::default()
            .build()
            .expect("Unable to build BloomFilterConfig");
        assert_eq!(config.capacity, 1_000_000);
        assert_eq!(config.false_positive_rate, 0.01);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.params().unwrap(),
            BloomParams::from_capacity(1_000_000, 0.01).unwrap()
        );
    }

    #[test]
    fn test_config_validation_messages() {
        let config = BloomFilterConfigBuilder::default()
            .capacity(0)
            .build()
            .unwrap();
        match config.validate().unwrap_err() {
            BloomError::InvalidParameter(msg) => {
                assert!(msg.contains("Capacity must be > 0"));
            }
            other => panic!("Expected InvalidParameter, got {other:?}"),
        }
    }
}
