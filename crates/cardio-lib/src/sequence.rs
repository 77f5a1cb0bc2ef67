use crate::{
    cycle::CycleModel,
    error::{CardioError, Result},
    grid::SampleGrid,
    signal::Trace,
};
use log::debug;
use rand::Rng;

/// Name of the wave modulated by alternans.
pub const ALTERNANS_WAVE: &str = "T";

/// Several cycles laid end to end.
///
/// A sequence tiled from a [`CycleModel`] keeps a snapshot of that model so
/// the T wave can be re-rendered per beat. Sequences built from bare samples
/// (filter output, loaded files, noisy copies) carry no snapshot and only
/// support playback. A sequence is never updated from its model: rebuild it
/// with [`CycleSequence::tile`] whenever the model changes.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSequence {
    source: Option<CycleModel>,
    cycles: usize,
    grid: SampleGrid,
    time: Vec<f64>,
    amplitude: Vec<f64>,
}

impl CycleSequence {
    /// Repeat `model`'s cycle `cycles` times.
    ///
    /// The last sample of the cycle duplicates the first sample of the next
    /// one, so each copy drops it and a single zero closes the sequence:
    /// the result holds `cycles * (K - 1) + 1` samples for a `K`-sample cycle.
    pub fn tile(model: &CycleModel, cycles: usize) -> Result<Self> {
        if cycles == 0 {
            return Err(CardioError::InvalidArgument(
                "a sequence needs at least one cycle".into(),
            ));
        }
        let per_cycle = model.len().saturating_sub(1);
        let len = cycles
            .checked_mul(per_cycle)
            .and_then(|samples| samples.checked_add(1))
            .ok_or_else(|| {
                CardioError::InvalidArgument(format!("{} cycles do not fit in memory", cycles))
            })?;
        let mut amplitude = Vec::with_capacity(len);
        for _ in 0..cycles {
            amplitude.extend_from_slice(&model.amplitude()[..per_cycle]);
        }
        amplitude.push(0.0);
        let grid = *model.grid();
        debug!("tiled {} cycles into {} samples", cycles, len);
        Ok(Self {
            source: Some(model.clone()),
            cycles,
            grid,
            time: grid.time_axis(len),
            amplitude,
        })
    }

    /// Wrap bare samples; the result supports playback only.
    pub fn from_samples(grid: SampleGrid, amplitude: Vec<f64>) -> Self {
        Self {
            source: None,
            cycles: 0,
            grid,
            time: grid.time_axis(amplitude.len()),
            amplitude,
        }
    }

    pub fn source(&self) -> Option<&CycleModel> {
        self.source.as_ref()
    }

    /// Number of tiled cycles; zero for sequences built from bare samples.
    pub fn cycles(&self) -> usize {
        self.cycles
    }

    pub fn grid(&self) -> &SampleGrid {
        &self.grid
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn amplitude(&self) -> &[f64] {
        &self.amplitude
    }

    pub fn len(&self) -> usize {
        self.amplitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amplitude.is_empty()
    }

    pub fn trace(&self) -> Trace {
        Trace::new(self.time.clone(), self.amplitude.clone())
    }

    /// Re-render the T wave of every beat, scaling beats 0, 2, 4, ... by
    /// `1 + level / a` and leaving the others at their original height.
    ///
    /// The T wave is rewritten from the source snapshot each time, so
    /// calling this again with a different level replaces the previous one.
    pub fn inject_alternans(&mut self, level: f64) -> Result<()> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| missing_source("alternans"))?;
        let wave = source.wave(ALTERNANS_WAVE)?;
        let per_cycle = source.len().saturating_sub(1);
        let boosted = 1.0 + level / wave.params.amplitude;
        for beat in 0..self.cycles {
            let scale = if beat % 2 == 0 { boosted } else { 1.0 };
            wave.render(&self.time, &mut self.amplitude, beat * per_cycle, scale);
        }
        debug!(
            "alternans level {} applied over {} beats (factor {})",
            level, self.cycles, boosted
        );
        Ok(())
    }

    /// Uniform noise in `[-level * peak, level * peak]`, one sample per
    /// sequence sample, where `peak` is the largest absolute amplitude.
    ///
    /// The sequence itself is not touched; see [`CycleSequence::superimpose`].
    pub fn generate_noise<R: Rng + ?Sized>(&self, level: f64, rng: &mut R) -> Result<Vec<f64>> {
        if self.source.is_none() {
            return Err(missing_source("noise generation"));
        }
        let peak = self
            .amplitude
            .iter()
            .fold(0.0f64, |acc, value| acc.max(value.abs()));
        let half_width = level * peak;
        Ok((0..self.amplitude.len())
            .map(|_| half_width * (2.0 * rng.gen::<f64>() - 1.0))
            .collect())
    }

    /// New bare sequence whose samples are this one's plus `noise`.
    pub fn superimpose(&self, noise: &[f64]) -> Result<Self> {
        if noise.len() != self.amplitude.len() {
            return Err(CardioError::InvalidArgument(format!(
                "noise has {} samples but the sequence has {}",
                noise.len(),
                self.amplitude.len()
            )));
        }
        let amplitude = self
            .amplitude
            .iter()
            .zip(noise)
            .map(|(signal, noise)| signal + noise)
            .collect();
        Ok(Self::from_samples(self.grid, amplitude))
    }
}

fn missing_source(operation: &str) -> CardioError {
    CardioError::UnsupportedOperation(format!(
        "{} needs a sequence tiled from a cycle model",
        operation
    ))
}
