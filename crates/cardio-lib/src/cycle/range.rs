use crate::{
    cycle::{
        model::CycleModel,
        pulse::{left_start_for, right_end_for},
    },
    error::Result,
    signal::ParamRange,
};
use log::debug;
use serde::{Deserialize, Serialize};

/// Admissible ranges for every adjustable timing parameter of one wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveRanges {
    pub mean: ParamRange,
    pub left_spread: ParamRange,
    pub right_spread: ParamRange,
}

/// Walk `candidates` while `admissible` holds and return the last accepted
/// value, or `start` if the very first candidate is rejected.
fn last_admissible(
    candidates: impl Iterator<Item = i64>,
    start: i64,
    mut admissible: impl FnMut(i64) -> bool,
) -> i64 {
    let mut accepted = start;
    for candidate in candidates {
        if !admissible(candidate) {
            break;
        }
        accepted = candidate;
    }
    accepted
}

/// Where a wave sits in the ordered set; the outermost waves may not reach
/// the grid ends exactly.
#[derive(Debug, Clone, Copy)]
struct Limits {
    t_prev: usize,
    t_next: usize,
    first: bool,
    last: bool,
}

impl Limits {
    fn left_ok(&self, left_start: usize) -> bool {
        if self.first {
            left_start > self.t_prev
        } else {
            left_start >= self.t_prev
        }
    }

    fn right_ok(&self, right_end: usize) -> bool {
        if self.last {
            right_end < self.t_next
        } else {
            right_end <= self.t_next
        }
    }
}

impl CycleModel {
    fn limits_at(&self, idx: usize) -> Limits {
        let (t_prev, t_next) = self.bounds_at(idx);
        Limits {
            t_prev,
            t_next,
            first: idx == 0,
            last: idx + 1 == self.waves().len(),
        }
    }

    /// Exclusive upper end of every upward scan: the last grid time in ms.
    fn scan_limit(&self) -> i64 {
        self.time().last().copied().unwrap_or(0.0).floor() as i64
    }

    /// Integer range the mean of `name` can move through with both spreads
    /// held fixed, without its support crossing its neighbors.
    pub fn range_for_mean(&self, name: &str) -> Result<ParamRange> {
        let idx = self.position(name)?;
        let params = self.waves()[idx].params;
        let limits = self.limits_at(idx);
        let (grid, len) = (self.grid(), self.len());
        let mean = params.mean.ceil() as i64;
        let left_spread = params.left_spread.ceil();
        let right_spread = params.right_spread.ceil();

        let min = last_admissible((1..=mean).rev(), mean, |m| {
            limits.left_ok(left_start_for(m as f64, left_spread, grid, len))
        });
        let max = last_admissible(mean..self.scan_limit(), mean, |m| {
            limits.right_ok(right_end_for(m as f64, right_spread, grid, len))
        });
        debug!("mean range for {}: [{}, {}]", name, min, max);
        Ok(ParamRange::new(min, max))
    }

    /// Range for the rising-side spread of `name`; the lower end is always 1.
    pub fn range_for_left_spread(&self, name: &str) -> Result<ParamRange> {
        let idx = self.position(name)?;
        let params = self.waves()[idx].params;
        let limits = self.limits_at(idx);
        let (grid, len) = (self.grid(), self.len());
        let mean = params.mean.ceil();
        let spread = params.left_spread.ceil() as i64;

        let max = last_admissible(spread..self.scan_limit(), spread, |b| {
            limits.left_ok(left_start_for(mean, b as f64, grid, len))
        });
        Ok(ParamRange::new(1, max))
    }

    /// Range for the falling-side spread of `name`; the lower end is always 1.
    pub fn range_for_right_spread(&self, name: &str) -> Result<ParamRange> {
        let idx = self.position(name)?;
        let params = self.waves()[idx].params;
        let limits = self.limits_at(idx);
        let (grid, len) = (self.grid(), self.len());
        let mean = params.mean.ceil();
        let spread = params.right_spread.ceil() as i64;

        let max = last_admissible(spread..self.scan_limit(), spread, |b| {
            limits.right_ok(right_end_for(mean, b as f64, grid, len))
        });
        Ok(ParamRange::new(1, max))
    }

    pub fn wave_ranges(&self, name: &str) -> Result<WaveRanges> {
        Ok(WaveRanges {
            mean: self.range_for_mean(name)?,
            left_spread: self.range_for_left_spread(name)?,
            right_spread: self.range_for_right_spread(name)?,
        })
    }
}
