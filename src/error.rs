use thiserror::Error;

use crate::config::BloomFilterConfigBuilderError;

pub type Result<T> = std::result::Result<T, BloomError>;

/// Construction-time failures. Once a filter exists, none of its operations
/// can fail; an out-of-range bit index is a defect and panics instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BloomError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Failed to allocate storage for {bit_count} bits: {reason}")]
    AllocationFailure { bit_count: usize, reason: String },
}

impl From<BloomFilterConfigBuilderError> for BloomError {
    fn from(err: BloomFilterConfigBuilderError) -> Self {
        BloomError::InvalidParameter(err.to_string())
    }
}
