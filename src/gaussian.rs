//! Recursive Gaussian filter (Young & van Vliet, third order).
//!
//! The Gaussian is approximated by a causal pass followed by an anti-causal
//! pass over the same line, each using three feedback taps:
//!
//! ```text
//! forward:  w1[k] = B x[k]  + (b1 w1[k-1] + b2 w1[k-2] + b3 w1[k-3]) / b0
//! backward: w2[k] = B w1[k] + (b1 w2[k+1] + b2 w2[k+2] + b3 w2[k+3]) / b0
//! ```
//!
//! Cost per sample is constant regardless of sigma. Lines are padded with three
//! replicated samples on each side, so constant lines pass through unchanged.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Taps of the third-order recursive Gaussian
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianCoefficients {
    /// Standard deviation the taps were derived from
    pub sigma: f32,
    /// Normalization constant `B = 1 - (b1 + b2 + b3) / b0`
    pub norm: f64,
    /// Recursive taps `b0..b3`; `b0` is strictly positive
    pub b: [f64; 4],
}

impl GaussianCoefficients {
    /// Number of feedback taps
    pub const ORDER: usize = 3;
}

/// Derives the recursive filter taps for a Gaussian of standard deviation `sigma`.
pub fn gaussian_coefficients(sigma: f64) -> GaussianCoefficients {
    let q = if sigma >= 2.5 {
        0.98711 * sigma - 0.96330
    } else if sigma >= 0.5 {
        3.97156 - 4.14554 * (1.0 - 0.26891 * sigma).sqrt()
    } else {
        0.1147705018520355224609375
    };

    let q2 = q * q;
    let q3 = q * q2;

    let b0 = 1.57825 + 2.44413 * q + 1.42810 * q2 + 0.42220 * q3;
    let b1 = 2.44413 * q + 2.85619 * q2 + 1.26661 * q3;
    let b2 = -(1.42810 * q2 + 1.26661 * q3);
    let b3 = 0.42220 * q3;

    GaussianCoefficients {
        sigma: sigma as f32,
        norm: 1.0 - (b1 + b2 + b3) / b0,
        b: [b0, b1, b2, b3],
    }
}

/// Blurs a contiguous line of samples, returning a new line of the same length.
///
/// ```
/// use msrcr::{apply_1d, gaussian_coefficients};
///
/// let line = vec![42.0f32; 32];
/// let blurred = apply_1d(&line, &gaussian_coefficients(5.0));
/// assert!(blurred.iter().all(|&v| (v - 42.0).abs() < 1e-3));
/// ```
pub fn apply_1d(line: &[f32], coeffs: &GaussianCoefficients) -> Vec<f32> {
    let mut filter = LineFilter::new(*coeffs, line.len());
    filter.run(line, 0, 1, line.len()).to_vec()
}

/// Reusable forward/backward work lines for one set of coefficients.
pub(crate) struct LineFilter {
    coeffs: GaussianCoefficients,
    forward: Vec<f32>,
    backward: Vec<f32>,
}

impl LineFilter {
    pub(crate) fn new(coeffs: GaussianCoefficients, len: usize) -> Self {
        let padded = len + GaussianCoefficients::ORDER;
        Self {
            coeffs,
            forward: vec![0.0; padded],
            backward: vec![0.0; padded],
        }
    }

    /// Filters `len` samples read from `src[offset + k * stride]`.
    ///
    /// The returned slice is contiguous and valid until the next call.
    pub(crate) fn run(&mut self, src: &[f32], offset: usize, stride: usize, len: usize) -> &[f32] {
        if len == 0 {
            return &[];
        }

        let padded = len + GaussianCoefficients::ORDER;
        if self.forward.len() < padded {
            self.forward.resize(padded, 0.0);
            self.backward.resize(padded, 0.0);
        }

        let [b0, b1, b2, b3] = self.coeffs.b;
        let norm = self.coeffs.norm;
        let w1 = &mut self.forward;
        let w2 = &mut self.backward;

        // w1[k + 3] holds the filtered sample k
        w1[..3].fill(src[offset]);
        for k in 0..len {
            let x = f64::from(src[offset + k * stride]);
            let feedback =
                b1 * f64::from(w1[k + 2]) + b2 * f64::from(w1[k + 1]) + b3 * f64::from(w1[k]);
            w1[k + 3] = (norm * x + feedback / b0) as f32;
        }

        w2[len..len + 3].fill(w1[len + 2]);
        for k in (0..len).rev() {
            let feedback = b1 * f64::from(w2[k + 1])
                + b2 * f64::from(w2[k + 2])
                + b3 * f64::from(w2[k + 3]);
            w2[k] = (norm * f64::from(w1[k + 3]) + feedback / b0) as f32;
        }

        &self.backward[..len]
    }
}

/// Separable 2-D blur of a `width * height` plane.
///
/// Rows of `src` are filtered into `rows`, then columns of `rows` into `dst`.
/// `src` is never written.
pub(crate) fn blur_plane(
    src: &[f32],
    rows: &mut [f32],
    dst: &mut [f32],
    width: usize,
    height: usize,
    coeffs: &GaussianCoefficients,
) {
    debug_assert_eq!(src.len(), width * height);
    debug_assert_eq!(rows.len(), src.len());
    debug_assert_eq!(dst.len(), src.len());

    #[cfg(feature = "rayon")]
    {
        rows.par_chunks_exact_mut(width)
            .zip(src.par_chunks_exact(width))
            .for_each_init(
                || LineFilter::new(*coeffs, width),
                |filter, (out_row, in_row)| {
                    out_row.copy_from_slice(filter.run(in_row, 0, 1, width));
                },
            );

        let rows: &[f32] = rows;
        let columns: Vec<Vec<f32>> = (0..width)
            .into_par_iter()
            .map_init(
                || LineFilter::new(*coeffs, height),
                |filter, x| filter.run(rows, x, width, height).to_vec(),
            )
            .collect();

        for (x, column) in columns.iter().enumerate() {
            for (y, &value) in column.iter().enumerate() {
                dst[y * width + x] = value;
            }
        }
    }

    #[cfg(not(feature = "rayon"))]
    {
        let mut filter = LineFilter::new(*coeffs, width.max(height));

        for (out_row, in_row) in rows.chunks_exact_mut(width).zip(src.chunks_exact(width)) {
            out_row.copy_from_slice(filter.run(in_row, 0, 1, width));
        }

        for x in 0..width {
            let column = filter.run(rows, x, width, height);
            for (y, &value) in column.iter().enumerate() {
                dst[y * width + x] = value;
            }
        }
    }
}
