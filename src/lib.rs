//! Multi-Scale Retinex with Color Restoration (MSRCR)
//!
//! This library enhances 8-bit RGB(A) images by comparing them with
//! recursively blurred versions of themselves at several scales, restoring
//! color ratios, and stretching the result around its mean.
//!
//! # Overview
//!
//! Retinex separates an image into illumination (slowly varying lighting)
//! and reflectance (object colors). The basic formula is:
//!
//! ```text
//! I(x,y) = R(x,y) × L(x,y)
//! ```
//!
//! Where `I` is the observed image, `R` is reflectance, and `L` is illumination.
//!
//! # Pipeline
//!
//! 1. [`compute_scales`] picks `nscales` Gaussian sigmas up to `max_scale`.
//! 2. [`decompose`] accumulates, per channel,
//!    ```text
//!    R_c = Σ (1/n) [ ln(I_c + 1) - ln(G_σi * (I_c + 1)) ]
//!    ```
//!    using the third-order recursive Gaussian of [`gaussian_coefficients`].
//! 3. [`restore`] multiplies by the log color ratio
//!    `ln(128 (I_c + 1)) - ln(R + G + B + 3)`.
//! 4. [`normalize`] maps `mean ± variance_factor × std_dev` onto `[0, 255]`.
//!
//! # Example Usage
//!
//! ```rust
//! use msrcr::{msrcr, PixelBuffer, RetinexConfig};
//!
//! let data = (0..32 * 32).flat_map(|i| [(i % 251) as u8, 60, 90]).collect();
//! let mut buffer = PixelBuffer::new(32, 32, 3, data).unwrap();
//!
//! let config = RetinexConfig {
//!     max_scale: 100,
//!     ..RetinexConfig::default()
//! };
//! msrcr(&mut buffer, &config, Some(&|fraction: f64| println!("{:.0}%", fraction * 100.0))).unwrap();
//! ```
//!
//! The caller's buffer is only written once every stage has succeeded; on
//! any error it is left untouched.

mod buffer;
mod config;
mod decompose;
mod error;
mod gaussian;
mod normalize;
mod restore;
mod scales;

use std::ops::ControlFlow;

use image::DynamicImage;
use tracing::debug;

pub use buffer::{ChannelPlanes, PixelBuffer, COLOR_CHANNELS};
pub use config::{
    RetinexConfig, ScaleMode, MAX_SCALE_RANGE, NSCALES_RANGE, VARIANCE_FACTOR_RANGE,
};
pub use decompose::{decompose, decompose_with_observer};
pub use error::{RetinexError, RetinexResult};
pub use gaussian::{apply_1d, gaussian_coefficients, GaussianCoefficients};
pub use normalize::{dynamic_range, normalize, RangeStats};
pub use restore::{restore, RESTORATION_ALPHA, RESTORATION_GAIN, RESTORATION_OFFSET};
pub use scales::{compute_scales, ScaleSet};

/// Smallest width and height the recursive filter's padding can handle
pub const MIN_IMAGE_SIDE: u32 = 4;

/// Applies MSRCR to `buffer` in place.
///
/// `progress`, when given, receives `(c * nscales + s) / (3 * nscales)` after
/// scale `s` of channel `c`, and a final `1.0` once `buffer` has been written.
///
/// # Errors
///
/// - [`RetinexError::InvalidConfig`] if a parameter is out of range
/// - [`RetinexError::DegenerateImage`] if a side is shorter than [`MIN_IMAGE_SIDE`]
/// - [`RetinexError::AllocationFailure`] if scratch memory is unavailable
///
/// `buffer` is unchanged whenever an error is returned.
pub fn msrcr(
    buffer: &mut PixelBuffer,
    config: &RetinexConfig,
    progress: Option<&dyn Fn(f64)>,
) -> RetinexResult<()> {
    msrcr_with_observer(buffer, config, |fraction| {
        if let Some(progress) = progress {
            progress(fraction);
        }
        ControlFlow::Continue(())
    })
}

/// Applies MSRCR to `buffer` in place, letting `observer` abort between scales.
///
/// Returning [`ControlFlow::Break`] from `observer` stops processing with
/// [`RetinexError::Cancelled`] and leaves `buffer` untouched. The final `1.0`
/// report comes after the write and cannot cancel it.
pub fn msrcr_with_observer<F>(
    buffer: &mut PixelBuffer,
    config: &RetinexConfig,
    mut observer: F,
) -> RetinexResult<()>
where
    F: FnMut(f64) -> ControlFlow<()>,
{
    let output = enhance(buffer, config, &mut observer)?;
    buffer.replace_samples(&output);
    // nothing left to cancel
    let _ = observer(1.0);
    Ok(())
}

/// Convenience wrapper over [`msrcr`] for `image` crate images.
///
/// Images with alpha come back as RGBA8, everything else as RGB8.
///
/// # Example
///
/// ```rust,no_run
/// use msrcr::{msrcr_image, RetinexConfig};
///
/// let image = image::open("images/house.jpg").unwrap();
/// let result = msrcr_image(&image, &RetinexConfig::default()).unwrap();
/// result.save("output.jpg").unwrap();
/// ```
pub fn msrcr_image(image: &DynamicImage, config: &RetinexConfig) -> RetinexResult<DynamicImage> {
    let mut buffer = PixelBuffer::from(image);
    msrcr(&mut buffer, config, None)?;
    to_dynamic_image(&buffer)
}

/// Multi-scale reflectance before color restoration, remapped for display
/// with the same dynamic-range window as the full pipeline.
pub fn reflectance_image(
    buffer: &PixelBuffer,
    config: &RetinexConfig,
) -> RetinexResult<PixelBuffer> {
    let scales = prepare(buffer, config)?;
    let reflectance = decompose(buffer, &scales)?;
    normalize(buffer, &reflectance, config.variance_factor)
}

pub(crate) fn to_dynamic_image(buffer: &PixelBuffer) -> RetinexResult<DynamicImage> {
    buffer
        .to_dynamic_image()
        .ok_or(RetinexError::InvalidBuffer {
            expected: buffer.pixel_count() * buffer.bpp(),
            actual: buffer.as_bytes().len(),
        })
}

fn prepare(buffer: &PixelBuffer, config: &RetinexConfig) -> RetinexResult<ScaleSet> {
    config.validate()?;

    if buffer.width() < MIN_IMAGE_SIDE || buffer.height() < MIN_IMAGE_SIDE {
        return Err(RetinexError::DegenerateImage {
            width: buffer.width(),
            height: buffer.height(),
            min_side: MIN_IMAGE_SIDE,
        });
    }

    let scales = compute_scales(config.max_scale, config.nscales, config.mode);
    debug!(
        width = buffer.width(),
        height = buffer.height(),
        scales = ?scales,
        "msrcr scales"
    );
    Ok(scales)
}

fn enhance(
    buffer: &PixelBuffer,
    config: &RetinexConfig,
    observer: &mut dyn FnMut(f64) -> ControlFlow<()>,
) -> RetinexResult<PixelBuffer> {
    let scales = prepare(buffer, config)?;
    let reflectance = decompose_with_observer(buffer, &scales, observer)?;
    let restored = restore(buffer, &reflectance)?;
    drop(reflectance);
    normalize(buffer, &restored, config.variance_factor)
}
