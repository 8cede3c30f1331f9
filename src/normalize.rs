//! Dynamic-range remapping of restored values into 8 bits.

use tracing::debug;

use crate::buffer::{ChannelPlanes, PixelBuffer, COLOR_CHANNELS};
use crate::error::{alloc_bytes, RetinexError, RetinexResult};

/// Statistics driving the linear remap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeStats {
    /// Mean over all color channels
    pub mean: f64,
    /// Standard deviation over all color channels
    pub std_dev: f64,
    /// Value mapped to 0
    pub lo: f64,
    /// Value mapped to 255
    pub hi: f64,
    /// `hi - lo`, or 1.0 when that is zero
    pub range: f64,
}

impl RangeStats {
    /// Maps one value into `[0, 255]`, truncating towards zero.
    pub fn remap(&self, value: f32) -> u8 {
        let scaled = 255.0 * (f64::from(value) - self.lo) / self.range;
        scaled.clamp(0.0, 255.0) as u8
    }
}

/// Computes mean and standard deviation jointly over the three planes and
/// derives the window `mean ± variance_factor * std_dev`.
pub fn dynamic_range(restored: &ChannelPlanes, variance_factor: f64) -> RangeStats {
    let (mut sum, mut sum_sq, mut count) = (0.0f64, 0.0f64, 0usize);
    for value in restored.values() {
        let value = f64::from(value);
        sum += value;
        sum_sq += value * value;
        count += 1;
    }

    let (mean, std_dev) = if count == 0 {
        (0.0, 0.0)
    } else {
        let mean = sum / count as f64;
        // cancellation can push this slightly below zero
        let variance = (sum_sq / count as f64 - mean * mean).max(0.0);
        (mean, variance.sqrt())
    };

    let lo = mean - variance_factor * std_dev;
    let hi = mean + variance_factor * std_dev;
    let range = if hi - lo == 0.0 { 1.0 } else { hi - lo };

    RangeStats {
        mean,
        std_dev,
        lo,
        hi,
        range,
    }
}

/// Remaps restored planes into a new 8-bit buffer shaped like `original`.
///
/// Alpha, if present, is copied from `original`.
///
/// # Errors
///
/// - [`RetinexError::InvalidBuffer`] if the planes and the image differ in size
/// - [`RetinexError::AllocationFailure`] if the output cannot be allocated
pub fn normalize(
    original: &PixelBuffer,
    restored: &ChannelPlanes,
    variance_factor: f64,
) -> RetinexResult<PixelBuffer> {
    let expected = original.pixel_count();
    let actual = restored.width() * restored.height();
    if restored.width() != original.width() as usize || actual != expected {
        return Err(RetinexError::InvalidBuffer { expected, actual });
    }

    let stats = dynamic_range(restored, variance_factor);
    debug!(
        mean = stats.mean,
        std_dev = stats.std_dev,
        lo = stats.lo,
        hi = stats.hi,
        "dynamic range"
    );

    let mut output = PixelBuffer::new(
        original.width(),
        original.height(),
        original.bpp(),
        alloc_bytes(original.as_bytes().len())?,
    )?;

    for (index, (out, src)) in output.pixels_mut().zip(original.pixels()).enumerate() {
        for channel in 0..COLOR_CHANNELS {
            out[channel] = stats.remap(restored.plane(channel)[index]);
        }
        out[COLOR_CHANNELS..].copy_from_slice(&src[COLOR_CHANNELS..]);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planes(width: usize, height: usize, value: impl Fn(usize) -> f32) -> ChannelPlanes {
        let plane: Vec<f32> = (0..width * height).map(value).collect();
        ChannelPlanes::from_planes(width, height, [plane.clone(), plane.clone(), plane]).unwrap()
    }

    #[test]
    fn test_zero_variance_falls_back_to_unit_range() {
        let stats = dynamic_range(&planes(4, 4, |_| 0.25), 1.2);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.range, 1.0);
        assert_eq!(stats.lo, 0.25);
    }

    #[test]
    fn test_zero_variance_factor_falls_back_to_unit_range() {
        let stats = dynamic_range(&planes(4, 4, |i| i as f32), 0.0);
        assert!(stats.std_dev > 0.0);
        assert_eq!(stats.range, 1.0);
    }

    #[test]
    fn test_mean_and_std_dev() {
        let stats = dynamic_range(&planes(2, 2, |i| if i % 2 == 0 { -3.0 } else { 3.0 }), 2.0);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.std_dev, 3.0);
        assert_eq!((stats.lo, stats.hi, stats.range), (-6.0, 6.0, 12.0));
    }

    #[test]
    fn test_remap_clamps_without_wrapping() {
        let stats = RangeStats {
            mean: 0.0,
            std_dev: 1.0,
            lo: -1.0,
            hi: 1.0,
            range: 2.0,
        };
        assert_eq!(stats.remap(-1.0e30), 0);
        assert_eq!(stats.remap(-5.0), 0);
        assert_eq!(stats.remap(-1.0), 0);
        assert_eq!(stats.remap(0.0), 127);
        assert_eq!(stats.remap(1.0), 255);
        assert_eq!(stats.remap(7.5), 255);
        assert_eq!(stats.remap(1.0e30), 255);
        assert_eq!(stats.remap(f32::INFINITY), 255);
    }

    #[test]
    fn test_normalize_saturates_outliers() {
        // half the samples at -1000, half at +1000, window of half a std_dev
        let restored = planes(8, 8, |i| if i % 2 == 0 { -1000.0 } else { 1000.0 });
        let original = PixelBuffer::new(8, 8, 3, vec![77; 8 * 8 * 3]).unwrap();

        let output = normalize(&original, &restored, 0.5).unwrap();
        for (index, pixel) in output.pixels().enumerate() {
            let expected: u8 = if index % 2 == 0 { 0 } else { 255 };
            assert_eq!(pixel, [expected; 3]);
        }
    }

    #[test]
    fn test_normalize_copies_alpha() {
        let restored = planes(4, 4, |i| i as f32);
        let data: Vec<u8> = (0..16).flat_map(|i| [0, 0, 0, i as u8 * 10]).collect();
        let original = PixelBuffer::new(4, 4, 4, data).unwrap();

        let output = normalize(&original, &restored, 1.0).unwrap();
        assert_eq!(output.bpp(), 4);
        for (index, pixel) in output.pixels().enumerate() {
            assert_eq!(pixel[3], index as u8 * 10);
        }
    }
}
