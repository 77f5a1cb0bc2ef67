use crate::error::{CardioError, Result};
use serde::{Deserialize, Serialize};

/// Default synthesis rate in Hz.
pub const DEFAULT_SAMPLE_RATE: f64 = 2048.0;

/// Largest grid a cycle may be sampled on.
pub const MAX_GRID_SAMPLES: usize = 1 << 24;

/// Uniform sampling grid shared by every component that converts between
/// time (milliseconds) and sample indices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleGrid {
    sample_rate: f64,
}

impl SampleGrid {
    pub fn new(sample_rate: f64) -> Result<Self> {
        let period = 1000.0 / sample_rate;
        if !sample_rate.is_finite() || sample_rate <= 0.0 || !period.is_finite() || period <= 0.0 {
            return Err(CardioError::InvalidArgument(format!(
                "sample rate must be positive and finite, got {}",
                sample_rate
            )));
        }
        Ok(Self { sample_rate })
    }

    /// Sampling rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Sampling period in milliseconds.
    pub fn period(&self) -> f64 {
        1000.0 / self.sample_rate
    }

    pub fn time_of(&self, index: usize) -> f64 {
        index as f64 * self.period()
    }

    /// Number of samples needed to cover `[0, duration_ms]`, both ends included.
    ///
    /// Fails when the count is not finite or exceeds [`MAX_GRID_SAMPLES`].
    pub fn samples_for(&self, duration_ms: f64) -> Result<usize> {
        let steps = (duration_ms / self.period()).ceil().max(0.0);
        if !steps.is_finite() || steps >= MAX_GRID_SAMPLES as f64 {
            return Err(CardioError::Configuration(format!(
                "{} ms at {} Hz needs more than {} samples",
                duration_ms, self.sample_rate, MAX_GRID_SAMPLES
            )));
        }
        Ok(steps as usize + 1)
    }

    /// Time axis with `len` samples starting at zero.
    pub fn time_axis(&self, len: usize) -> Vec<f64> {
        let period = self.period();
        (0..len).map(|i| i as f64 * period).collect()
    }

    /// Index of the grid point closest to `t` on a grid of `len` samples.
    ///
    /// Ties go to the lower index and out-of-range times clamp to the ends.
    pub fn nearest_index(&self, t: f64, len: usize) -> usize {
        let last = len.saturating_sub(1);
        let x = t / self.period();
        if x.is_nan() || x <= 0.0 {
            return 0;
        }
        let lower = x.floor();
        let index = if x - lower <= 0.5 { lower } else { lower + 1.0 };
        if index >= last as f64 {
            last
        } else {
            index as usize
        }
    }
}

impl Default for SampleGrid {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}
