use serde::{Deserialize, Serialize};

/// A display-ready signal: time axis in milliseconds paired with amplitudes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub time: Vec<f64>,
    pub amplitude: Vec<f64>,
}

impl Trace {
    pub fn new(time: Vec<f64>, amplitude: Vec<f64>) -> Self {
        Self { time, amplitude }
    }
    pub fn len(&self) -> usize {
        self.amplitude.len()
    }
    pub fn is_empty(&self) -> bool {
        self.amplitude.is_empty()
    }
    /// Span of the time axis in milliseconds.
    pub fn duration(&self) -> f64 {
        match (self.time.first(), self.time.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}

/// A 2-D point set, e.g. `(z, dz)` or `(z(t), z(t + tau))`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhasePortrait {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl PhasePortrait {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        Self { x, y }
    }
    pub fn len(&self) -> usize {
        self.x.len().min(self.y.len())
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn points(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
        self.x.iter().zip(self.y.iter()).map(|(&x, &y)| [x, y])
    }
}

/// Inclusive integer range for a single wave parameter.
///
/// `min == max` means the parameter has no freedom left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: i64,
    pub max: i64,
}

impl ParamRange {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }
    pub fn is_fixed(&self) -> bool {
        self.min == self.max
    }
}
