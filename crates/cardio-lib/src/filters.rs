use crate::{
    error::{CardioError, Result},
    grid::SampleGrid,
};
use serde::{Deserialize, Serialize};

/// Smoothing applied to a sequence before phase analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum FilterKind {
    Exponential { alpha: f64 },
    MovingAverage { window_ms: f64 },
}

impl FilterKind {
    pub fn apply(&self, data: &[f64], grid: &SampleGrid) -> Result<Vec<f64>> {
        match *self {
            FilterKind::Exponential { alpha } => exponential_filter(data, alpha),
            FilterKind::MovingAverage { window_ms } => {
                moving_average_filter(data, window_ms, grid)
            }
        }
    }
}

/// Causal exponential smoothing: `y[k] = y[k-1] + alpha * (x[k] - y[k-1])`,
/// seeded with `y[0] = x[0]`.
pub fn exponential_filter(data: &[f64], alpha: f64) -> Result<Vec<f64>> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(CardioError::InvalidArgument(format!(
            "alpha must lie in (0, 1), got {}",
            alpha
        )));
    }
    let Some(&first) = data.first() else {
        return Ok(Vec::new());
    };
    let mut out = Vec::with_capacity(data.len());
    let mut prev = first;
    for &x in data {
        prev = prev + alpha * (x - prev);
        out.push(prev);
    }
    Ok(out)
}

/// Recursive moving average over `ceil(window_ms / period)` samples.
///
/// The first output is written at index `W - 1`; everything before it stays
/// zero. Each later sample adds `x[k]` and drops `x[k - 1 - W]`, with samples
/// before the start of the signal read as zero.
pub fn moving_average_filter(data: &[f64], window_ms: f64, grid: &SampleGrid) -> Result<Vec<f64>> {
    if !window_ms.is_finite() || window_ms <= 0.0 {
        return Err(CardioError::InvalidArgument(format!(
            "window must be a positive duration, got {} ms",
            window_ms
        )));
    }
    let win = (window_ms / grid.period()).ceil() as usize;
    if win > data.len() {
        return Err(CardioError::InvalidArgument(format!(
            "window of {} samples is longer than the signal ({} samples)",
            win,
            data.len()
        )));
    }
    let lambda = 1.0 / win as f64;
    let mut out = vec![0.0; data.len()];
    out[win - 1] = lambda * data[..win].iter().sum::<f64>();
    for k in win..data.len() {
        let dropped = if k > win { data[k - 1 - win] } else { 0.0 };
        out[k] = out[k - 1] + lambda * (data[k] - dropped);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_starts_at_first_sample() {
        let data = [2.5, 0.0, 0.0, 4.0];
        let out = exponential_filter(&data, 0.5).unwrap();
        assert_eq!(out.len(), data.len());
        assert_eq!(out[0], 2.5);
        assert_eq!(out[1], 1.25);
        assert_eq!(out[2], 0.625);
        assert_eq!(out[3], 2.3125);
    }

    #[test]
    fn exponential_rejects_alpha_outside_unit_interval() {
        assert!(exponential_filter(&[1.0], 0.0).is_err());
        assert!(exponential_filter(&[1.0], 1.0).is_err());
        assert!(exponential_filter(&[1.0], f64::NAN).is_err());
        assert!(exponential_filter(&[], 0.3).unwrap().is_empty());
    }

    #[test]
    fn moving_average_keeps_warm_up_gap() {
        let grid = SampleGrid::new(1000.0).unwrap();
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let out = moving_average_filter(&data, 3.0, &grid).unwrap();
        assert_eq!(out.len(), data.len());
        assert_eq!(&out[..2], &[0.0, 0.0]);
        assert!((out[2] - 2.0).abs() < 1e-12);
        // k = 3 drops the sample before the signal start (zero).
        assert!((out[3] - (out[2] + 4.0 / 3.0)).abs() < 1e-12);
        // k = 4 drops x[0].
        assert!((out[4] - (out[3] + (5.0 - 1.0) / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn moving_average_window_rounds_up_to_whole_samples() {
        let grid = SampleGrid::default();
        let data = vec![1.0; 16];
        // 2 ms at 0.488 ms per sample needs 5 samples.
        let out = moving_average_filter(&data, 2.0, &grid).unwrap();
        assert!(out[..4].iter().all(|&v| v == 0.0));
        assert!((out[4] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn moving_average_validates_window() {
        let grid = SampleGrid::new(1000.0).unwrap();
        assert!(moving_average_filter(&[1.0, 2.0], 0.0, &grid).is_err());
        assert!(moving_average_filter(&[1.0, 2.0], 5.0, &grid).is_err());
    }

    #[test]
    fn filter_kind_dispatches() {
        let grid = SampleGrid::new(1000.0).unwrap();
        let data = [1.0, 1.0, 1.0];
        let smoothed = FilterKind::Exponential { alpha: 0.2 }
            .apply(&data, &grid)
            .unwrap();
        assert_eq!(smoothed, vec![1.0, 1.0, 1.0]);
        let averaged = FilterKind::MovingAverage { window_ms: 2.0 }
            .apply(&data, &grid)
            .unwrap();
        assert_eq!(averaged, vec![0.0, 1.0, 1.5]);
    }
}
