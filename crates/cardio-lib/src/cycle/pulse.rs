use crate::grid::SampleGrid;
use serde::{Deserialize, Serialize};

/// Number of spreads on each side of the mean covered by a pulse.
pub const SUPPORT_SPREADS: f64 = 3.0;

/// Shape parameters of one asymmetric Gaussian lobe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseParams {
    /// Peak amplitude (mV).
    pub amplitude: f64,
    /// Position of the peak (ms).
    pub mean: f64,
    /// Spread of the rising side (ms).
    pub left_spread: f64,
    /// Spread of the falling side (ms).
    pub right_spread: f64,
}

impl PulseParams {
    pub fn new(amplitude: f64, mean: f64, left_spread: f64, right_spread: f64) -> Self {
        Self {
            amplitude,
            mean,
            left_spread,
            right_spread,
        }
    }
}

/// Sample indices covered by a pulse on its grid.
///
/// The rising side occupies `[left_start, center]` and the falling side
/// `(center, right_end)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseSupport {
    pub left_start: usize,
    pub center: usize,
    pub right_end: usize,
}

impl PulseSupport {
    pub fn locate(params: &PulseParams, grid: &SampleGrid, len: usize) -> Self {
        let left_start = left_start_for(params.mean, params.left_spread, grid, len);
        let right_end = right_end_for(params.mean, params.right_spread, grid, len);
        let center = (params.mean / grid.period()).floor().max(0.0) as usize;
        Self {
            left_start,
            center,
            right_end,
        }
    }

    fn scaled(&self, ratio: f64) -> Self {
        let scale = |index: usize| (index as f64 * ratio).round().max(0.0) as usize;
        Self {
            left_start: scale(self.left_start),
            center: scale(self.center),
            right_end: scale(self.right_end),
        }
    }
}

pub(crate) fn left_start_for(mean: f64, spread: f64, grid: &SampleGrid, len: usize) -> usize {
    grid.nearest_index(mean - SUPPORT_SPREADS * spread, len)
}

pub(crate) fn right_end_for(mean: f64, spread: f64, grid: &SampleGrid, len: usize) -> usize {
    grid.nearest_index(mean + SUPPORT_SPREADS * spread, len)
}

pub(crate) fn gaussian(amplitude: f64, mean: f64, spread: f64, t: f64) -> f64 {
    amplitude * (-(t - mean).powi(2) / (2.0 * spread * spread)).exp()
}

/// One named deflection of the cycle (P, Q, R, S, ST, T).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseWave {
    pub name: String,
    pub params: PulseParams,
    /// Recomputed on every synthesis pass.
    pub support: PulseSupport,
}

impl PulseWave {
    pub fn new(name: impl Into<String>, params: PulseParams) -> Self {
        Self {
            name: name.into(),
            params,
            support: PulseSupport::default(),
        }
    }

    /// Multiply every timing field by `ratio`; amplitude is left alone.
    pub fn dilate(&mut self, ratio: f64) {
        self.params.mean *= ratio;
        self.params.left_spread *= ratio;
        self.params.right_spread *= ratio;
        self.support = self.support.scaled(ratio);
    }

    /// Write the pulse into `amplitude`, overwriting whatever is there.
    ///
    /// `offset` shifts the pulse by a whole number of samples and `scale`
    /// multiplies its amplitude. Writes past the end of `amplitude` are skipped.
    pub(crate) fn render(
        &self,
        time: &[f64],
        amplitude: &mut [f64],
        offset: usize,
        scale: f64,
    ) {
        let len = amplitude.len().min(time.len());
        let mean = self.params.mean + time.get(offset).copied().unwrap_or(0.0);
        let peak = self.params.amplitude * scale;
        let PulseSupport {
            left_start,
            center,
            right_end,
        } = self.support;

        let rising = (left_start + offset)..(center + offset + 1).min(len);
        for t in rising {
            amplitude[t] = gaussian(peak, mean, self.params.left_spread, time[t]);
        }
        let falling = (center + offset + 1)..(right_end + offset).min(len);
        for t in falling {
            amplitude[t] = gaussian(peak, mean, self.params.right_spread, time[t]);
        }
    }
}
