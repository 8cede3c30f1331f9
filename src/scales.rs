//! Distribution of Gaussian scales between 2 and `max_scale`.

use std::f32::consts::LN_10;
use std::ops::Deref;

use crate::config::ScaleMode;

/// Ordered sigma values used by one MSRCR invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleSet(Vec<f32>);

impl ScaleSet {
    /// Weight applied to every scale when accumulating reflectance
    pub fn weight(&self) -> f64 {
        1.0 / self.0.len() as f64
    }

    /// Returns the sigma values in order.
    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl Deref for ScaleSet {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

/// Computes `nscales` sigma values for the given mode.
///
/// Inputs are expected to be validated already (see [`crate::RetinexConfig::validate`]).
/// With one scale the result is `max_scale / 2` (integer division), with two
/// it is `[max_scale / 2, max_scale]`. From three scales on the mode decides:
///
/// ```text
/// Uniform: 2 + i * (max_scale / nscales)
/// Low:     2 + 10^(i * step / ln 10),          step = ln(max_scale - 2) / nscales
/// High:    max_scale - 10^(i * step / ln 10)
/// ```
///
/// `Low` and `High` are not necessarily increasing.
pub fn compute_scales(max_scale: i32, nscales: i32, mode: ScaleMode) -> ScaleSet {
    let count = nscales.max(0) as usize;

    let scales = match nscales {
        n if n <= 0 => Vec::new(),
        1 => vec![(max_scale / 2) as f32],
        2 => vec![(max_scale / 2) as f32, max_scale as f32],
        _ => {
            let max = max_scale as f32;
            let n = nscales as f32;
            match mode {
                ScaleMode::Uniform => {
                    let step = max / n;
                    (0..count).map(|i| 2.0 + i as f32 * step).collect()
                }
                ScaleMode::Low => {
                    let step = (max - 2.0).ln() / n;
                    (0..count)
                        .map(|i| 2.0 + 10f32.powf(i as f32 * step / LN_10))
                        .collect()
                }
                ScaleMode::High => {
                    let step = (max - 2.0).ln() / n;
                    (0..count)
                        .map(|i| max - 10f32.powf(i as f32 * step / LN_10))
                        .collect()
                }
            }
        }
    };

    ScaleSet(scales)
}
