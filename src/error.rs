//! Error types for MSRCR processing.

use thiserror::Error;

/// Errors that can occur during Retinex processing
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetinexError {
    /// A scratch buffer could not be allocated, or its size overflows `usize`
    #[error("failed to allocate scratch buffer of {elements} elements")]
    AllocationFailure { elements: usize },

    /// A configuration value lies outside its accepted range
    #[error("{parameter} must be within [{min}, {max}], got {value}")]
    InvalidConfig {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// The image is too small for the recursive filter's boundary padding
    #[error("image of {width}x{height} is too small, both sides must be at least {min_side}")]
    DegenerateImage {
        width: u32,
        height: u32,
        min_side: u32,
    },

    /// The sample slice does not match the declared dimensions
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    InvalidBuffer { expected: usize, actual: usize },

    /// Only interleaved RGB and RGBA buffers are supported
    #[error("expected 3 or 4 channels per pixel, got {0}")]
    UnsupportedChannelCount(usize),

    /// The progress observer asked to abort
    #[error("processing was cancelled")]
    Cancelled,
}

/// Result type for Retinex operations
pub type RetinexResult<T> = Result<T, RetinexError>;

/// Allocates a zeroed `f32` plane, reporting allocation failure instead of aborting.
pub(crate) fn alloc_plane(elements: usize) -> RetinexResult<Vec<f32>> {
    let mut plane = Vec::new();
    plane
        .try_reserve_exact(elements)
        .map_err(|_| RetinexError::AllocationFailure { elements })?;
    plane.resize(elements, 0.0);
    Ok(plane)
}

pub(crate) fn alloc_bytes(elements: usize) -> RetinexResult<Vec<u8>> {
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(elements)
        .map_err(|_| RetinexError::AllocationFailure { elements })?;
    bytes.resize(elements, 0);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_plane_is_zeroed() {
        let plane = alloc_plane(16).unwrap();
        assert_eq!(plane.len(), 16);
        assert!(plane.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_alloc_plane_reports_failure() {
        let result = alloc_plane(usize::MAX);
        assert!(matches!(
            result,
            Err(RetinexError::AllocationFailure {
                elements: usize::MAX
            })
        ));
    }

    #[test]
    fn test_invalid_config_message() {
        let err = RetinexError::InvalidConfig {
            parameter: "nscales",
            value: 9.0,
            min: 1.0,
            max: 8.0,
        };
        assert_eq!(err.to_string(), "nscales must be within [1, 8], got 9");
    }
}
