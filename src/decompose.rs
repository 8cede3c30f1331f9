//! Multi-scale log-domain decomposition.

use std::ops::ControlFlow;

use tracing::trace;

use crate::buffer::{ChannelPlanes, PixelBuffer, COLOR_CHANNELS};
use crate::error::{alloc_plane, RetinexError, RetinexResult};
use crate::gaussian::{blur_plane, gaussian_coefficients};
use crate::scales::ScaleSet;

/// Estimates per-channel reflectance as the weighted sum over scales of
///
/// ```text
/// ln(I + 1) - ln(G_sigma * (I + 1))
/// ```
///
/// Alpha is ignored. Every scale blurs the untouched `I + 1` plane.
pub fn decompose(buffer: &PixelBuffer, scales: &ScaleSet) -> RetinexResult<ChannelPlanes> {
    decompose_with_observer(buffer, scales, &mut |_| ControlFlow::Continue(()))
}

/// Like [`decompose`], reporting progress after each channel and scale.
///
/// The fraction reported after scale `s` of channel `c` is `(c * nscales + s) / (3 * nscales)`.
/// Returning [`ControlFlow::Break`] stops with [`RetinexError::Cancelled`].
pub fn decompose_with_observer(
    buffer: &PixelBuffer,
    scales: &ScaleSet,
    observer: &mut dyn FnMut(f64) -> ControlFlow<()>,
) -> RetinexResult<ChannelPlanes> {
    let width = buffer.width() as usize;
    let height = buffer.height() as usize;
    let len = buffer.pixel_count();

    let mut reflectance = ChannelPlanes::zeroed(width, height)?;
    let mut source = alloc_plane(len)?;
    let mut rows = alloc_plane(len)?;
    let mut blurred = alloc_plane(len)?;

    let weight = scales.weight();
    let steps = (COLOR_CHANNELS * scales.len()) as f64;

    for channel in 0..COLOR_CHANNELS {
        for (value, pixel) in source.iter_mut().zip(buffer.pixels()) {
            *value = f32::from(pixel[channel]) + 1.0;
        }

        for (index, &sigma) in scales.iter().enumerate() {
            let coeffs = gaussian_coefficients(f64::from(sigma));
            blur_plane(&source, &mut rows, &mut blurred, width, height, &coeffs);

            let accumulator = reflectance.plane_mut(channel);
            for ((acc, &original), &smooth) in accumulator
                .iter_mut()
                .zip(source.iter())
                .zip(blurred.iter())
            {
                *acc += (weight * (f64::from(original).ln() - f64::from(smooth).ln())) as f32;
            }

            trace!(channel, sigma, "accumulated scale");

            let done = (channel * scales.len() + index) as f64 / steps;
            if observer(done).is_break() {
                return Err(RetinexError::Cancelled);
            }
        }
    }

    Ok(reflectance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScaleMode;
    use crate::scales::compute_scales;

    fn uniform_buffer(width: u32, height: u32, rgb: [u8; 3]) -> PixelBuffer {
        let data = (0..width * height).flat_map(|_| rgb).collect();
        PixelBuffer::new(width, height, 3, data).unwrap()
    }

    #[test]
    fn test_flat_image_has_zero_reflectance() {
        let buffer = uniform_buffer(16, 12, [128, 128, 128]);
        let scales = compute_scales(100, 3, ScaleMode::Uniform);
        let reflectance = decompose(&buffer, &scales).unwrap();

        assert_eq!(reflectance.width(), 16);
        assert_eq!(reflectance.height(), 12);
        for value in reflectance.values() {
            assert!(value.abs() < 1e-6, "reflectance {value}");
        }
    }

    #[test]
    fn test_bright_spot_has_positive_reflectance() {
        let mut data = vec![20u8; 32 * 32 * 3];
        let center = (16 * 32 + 16) * 3;
        data[center..center + 3].copy_from_slice(&[250, 250, 250]);
        let buffer = PixelBuffer::new(32, 32, 3, data).unwrap();

        let scales = compute_scales(16, 1, ScaleMode::Uniform);
        let reflectance = decompose(&buffer, &scales).unwrap();

        for channel in 0..3 {
            let plane = reflectance.plane(channel);
            assert!(plane[16 * 32 + 16] > 1.0);
            assert!(plane[16 * 32 + 16] > plane[0] + 1.0);
        }
    }

    #[test]
    fn test_alpha_is_ignored() {
        let opaque: Vec<u8> = (0..8 * 8).flat_map(|i| [i as u8, 40, 90, 255]).collect();
        let clear: Vec<u8> = (0..8 * 8).flat_map(|i| [i as u8, 40, 90, 0]).collect();
        let scales = compute_scales(16, 2, ScaleMode::Uniform);

        let a = decompose(&PixelBuffer::new(8, 8, 4, opaque).unwrap(), &scales).unwrap();
        let b = decompose(&PixelBuffer::new(8, 8, 4, clear).unwrap(), &scales).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_progress_follows_channel_and_scale() {
        let buffer = uniform_buffer(8, 8, [10, 20, 30]);
        let scales = compute_scales(40, 3, ScaleMode::Uniform);
        let mut reported = Vec::new();

        decompose_with_observer(&buffer, &scales, &mut |fraction| {
            reported.push(fraction);
            ControlFlow::Continue(())
        })
        .unwrap();

        let expected: Vec<f64> = (0..9).map(|step| step as f64 / 9.0).collect();
        assert_eq!(reported, expected);
    }

    #[test]
    fn test_observer_can_cancel() {
        let buffer = uniform_buffer(8, 8, [10, 20, 30]);
        let scales = compute_scales(40, 3, ScaleMode::Uniform);
        let mut calls = 0;

        let result = decompose_with_observer(&buffer, &scales, &mut |_| {
            calls += 1;
            if calls == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        assert_eq!(result, Err(RetinexError::Cancelled));
        assert_eq!(calls, 2);
    }
}
