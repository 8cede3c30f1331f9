//! Color restoration of the multi-scale reflectance.

use crate::buffer::{ChannelPlanes, PixelBuffer, COLOR_CHANNELS};
use crate::error::{RetinexError, RetinexResult};

/// Scale applied to a channel before comparing it with the pixel's total intensity
pub const RESTORATION_ALPHA: f64 = 128.0;
/// Multiplier applied to the restored value
pub const RESTORATION_GAIN: f64 = 1.0;
/// Constant added to the restored value
pub const RESTORATION_OFFSET: f64 = 0.0;

/// Weights each channel's reflectance by its log share of the pixel's intensity:
///
/// ```text
/// out_c = gain * (ln(alpha * (I_c + 1)) - ln(R + G + B + 3)) * reflectance_c + offset
/// ```
///
/// # Errors
///
/// [`RetinexError::InvalidBuffer`] if the planes and the image differ in size.
pub fn restore(original: &PixelBuffer, reflectance: &ChannelPlanes) -> RetinexResult<ChannelPlanes> {
    let expected = original.pixel_count();
    let actual = reflectance.width() * reflectance.height();
    if reflectance.width() != original.width() as usize || actual != expected {
        return Err(RetinexError::InvalidBuffer { expected, actual });
    }

    let mut restored = ChannelPlanes::zeroed(reflectance.width(), reflectance.height())?;

    for channel in 0..COLOR_CHANNELS {
        let source = reflectance.plane(channel);
        let target = restored.plane_mut(channel);

        for ((out, &refl), pixel) in target.iter_mut().zip(source).zip(original.pixels()) {
            let total = f64::from(pixel[0]) + f64::from(pixel[1]) + f64::from(pixel[2]) + 3.0;
            let ratio =
                (RESTORATION_ALPHA * (f64::from(pixel[channel]) + 1.0)).ln() - total.ln();
            *out = (RESTORATION_GAIN * (ratio * f64::from(refl)) + RESTORATION_OFFSET) as f32;
        }
    }

    Ok(restored)
}
