//! Filter parameters.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{RetinexError, RetinexResult};

/// Accepted range for [`RetinexConfig::max_scale`]
pub const MAX_SCALE_RANGE: (i32, i32) = (16, 250);
/// Accepted range for [`RetinexConfig::nscales`]
pub const NSCALES_RANGE: (i32, i32) = (1, 8);
/// Accepted range for [`RetinexConfig::variance_factor`]
pub const VARIANCE_FACTOR_RANGE: (f64, f64) = (0.0, 4.0);

/// How the Gaussian scales are spread between 2 and `max_scale`
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    /// Evenly spaced scales
    #[default]
    Uniform,
    /// Scales packed towards the smallest sigma (favors fine detail)
    Low,
    /// Scales packed towards `max_scale` (favors global illumination)
    High,
}

/// Parameters of a single MSRCR invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetinexConfig {
    /// Largest Gaussian sigma, in pixels
    pub max_scale: i32,
    /// Number of scales to combine
    pub nscales: i32,
    /// Distribution of the scales
    pub mode: ScaleMode,
    /// Contrast control: how many standard deviations around the mean map to [0, 255]
    pub variance_factor: f64,
}

impl Default for RetinexConfig {
    fn default() -> Self {
        Self {
            max_scale: 240,
            nscales: 3,
            mode: ScaleMode::Uniform,
            variance_factor: 1.2,
        }
    }
}

impl RetinexConfig {
    /// Checks every field against its accepted range.
    ///
    /// Out-of-range values are rejected rather than clamped.
    pub fn validate(&self) -> RetinexResult<()> {
        check_int("max_scale", self.max_scale, MAX_SCALE_RANGE)?;
        check_int("nscales", self.nscales, NSCALES_RANGE)?;

        let (min, max) = VARIANCE_FACTOR_RANGE;
        if !(min..=max).contains(&self.variance_factor) {
            return Err(RetinexError::InvalidConfig {
                parameter: "variance_factor",
                value: self.variance_factor,
                min,
                max,
            });
        }

        Ok(())
    }
}

fn check_int(parameter: &'static str, value: i32, (min, max): (i32, i32)) -> RetinexResult<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(RetinexError::InvalidConfig {
            parameter,
            value: f64::from(value),
            min: f64::from(min),
            max: f64::from(max),
        })
    }
}
