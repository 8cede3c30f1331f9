//! Interleaved 8-bit pixel storage and float channel planes.

use image::{DynamicImage, RgbImage, RgbaImage};

use crate::error::{alloc_plane, RetinexError, RetinexResult};

/// Number of color channels processed by the kernel; alpha is passed through
pub const COLOR_CHANNELS: usize = 3;

/// Interleaved row-major RGB or RGBA image with 8-bit samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    bpp: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps `data` as a `width x height` image with `bpp` interleaved channels.
    ///
    /// # Errors
    ///
    /// - [`RetinexError::UnsupportedChannelCount`] unless `bpp` is 3 or 4
    /// - [`RetinexError::InvalidBuffer`] if `data.len() != width * height * bpp`
    pub fn new(width: u32, height: u32, bpp: usize, data: Vec<u8>) -> RetinexResult<Self> {
        if bpp != 3 && bpp != 4 {
            return Err(RetinexError::UnsupportedChannelCount(bpp));
        }

        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(bpp))
            .ok_or(RetinexError::AllocationFailure { elements: usize::MAX })?;

        if data.len() != expected {
            return Err(RetinexError::InvalidBuffer {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            bpp,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per pixel (3 for RGB, 4 for RGBA)
    pub fn bpp(&self) -> usize {
        self.bpp
    }

    pub fn has_alpha(&self) -> bool {
        self.bpp == 4
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Iterates over pixels as `bpp`-sized slices.
    pub fn pixels(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(self.bpp)
    }

    pub(crate) fn pixels_mut(&mut self) -> std::slice::ChunksExactMut<'_, u8> {
        self.data.chunks_exact_mut(self.bpp)
    }

    /// Overwrites every sample with the ones from `other`, keeping this allocation.
    pub(crate) fn replace_samples(&mut self, other: &PixelBuffer) {
        debug_assert_eq!(self.data.len(), other.data.len());
        self.data.copy_from_slice(&other.data);
    }

    /// Converts to an `image` crate buffer, dropping alpha for RGB output.
    pub fn to_dynamic_image(&self) -> Option<DynamicImage> {
        match self.bpp {
            3 => RgbImage::from_raw(self.width, self.height, self.data.clone())
                .map(DynamicImage::ImageRgb8),
            _ => RgbaImage::from_raw(self.width, self.height, self.data.clone())
                .map(DynamicImage::ImageRgba8),
        }
    }
}

impl From<RgbImage> for PixelBuffer {
    fn from(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            bpp: 3,
            data: image.into_raw(),
        }
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            bpp: 4,
            data: image.into_raw(),
        }
    }
}

impl From<&DynamicImage> for PixelBuffer {
    /// Alpha-bearing images become RGBA buffers, everything else RGB.
    fn from(image: &DynamicImage) -> Self {
        if image.color().has_alpha() {
            image.to_rgba8().into()
        } else {
            image.to_rgb8().into()
        }
    }
}

/// One `f32` plane per color channel, each `width * height` long
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPlanes {
    width: usize,
    height: usize,
    planes: [Vec<f32>; COLOR_CHANNELS],
}

impl ChannelPlanes {
    pub(crate) fn zeroed(width: usize, height: usize) -> RetinexResult<Self> {
        let len = width
            .checked_mul(height)
            .ok_or(RetinexError::AllocationFailure { elements: usize::MAX })?;

        Ok(Self {
            width,
            height,
            planes: [alloc_plane(len)?, alloc_plane(len)?, alloc_plane(len)?],
        })
    }

    /// Builds planes from existing data; every plane must hold `width * height` values.
    pub fn from_planes(
        width: usize,
        height: usize,
        planes: [Vec<f32>; COLOR_CHANNELS],
    ) -> RetinexResult<Self> {
        let expected = width * height;
        if let Some(plane) = planes.iter().find(|plane| plane.len() != expected) {
            return Err(RetinexError::InvalidBuffer {
                expected,
                actual: plane.len(),
            });
        }

        Ok(Self {
            width,
            height,
            planes,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn plane(&self, channel: usize) -> &[f32] {
        &self.planes[channel]
    }

    pub(crate) fn plane_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self.planes[channel]
    }

    pub fn planes(&self) -> &[Vec<f32>; COLOR_CHANNELS] {
        &self.planes
    }

    /// Iterates over every value of every channel.
    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.planes.iter().flat_map(|plane| plane.iter().copied())
    }
}
