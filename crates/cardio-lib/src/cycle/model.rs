use crate::{
    cycle::pulse::{PulseParams, PulseSupport, PulseWave},
    error::{CardioError, Result},
    grid::SampleGrid,
    signal::Trace,
};
use log::{debug, warn};

/// Milliseconds per minute, used to turn beats/min into a cycle duration.
const MS_PER_MINUTE: f64 = 60_000.0;

/// One synthetic cardiac cycle: an ordered set of named pulses on one grid.
///
/// Wave order defines neighbors for the range search, so it is kept as an
/// explicit list rather than a map.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleModel {
    heart_rate: f64,
    grid: SampleGrid,
    waves: Vec<PulseWave>,
    time: Vec<f64>,
    amplitude: Vec<f64>,
}

impl CycleModel {
    /// Build and synthesize a cycle at `heart_rate` beats/min.
    pub fn new(heart_rate: f64, grid: SampleGrid, waves: Vec<PulseWave>) -> Result<Self> {
        validate_heart_rate(heart_rate)?;
        if waves.is_empty() {
            return Err(CardioError::Configuration(
                "a cycle needs at least one wave".into(),
            ));
        }
        for (idx, wave) in waves.iter().enumerate() {
            if waves[..idx].iter().any(|w| w.name == wave.name) {
                return Err(CardioError::Configuration(format!(
                    "duplicate wave name {}",
                    wave.name
                )));
            }
        }
        let time = grid.time_axis(grid.samples_for(MS_PER_MINUTE / heart_rate)?);
        let mut model = Self {
            heart_rate,
            grid,
            waves,
            amplitude: vec![0.0; time.len()],
            time,
        };
        model.synthesize();
        Ok(model)
    }

    /// P, Q, R, S, ST and T waves of a normal sinus cycle.
    pub fn default_waves() -> Vec<PulseWave> {
        vec![
            PulseWave::new("P", PulseParams::new(0.1, 395.0, 20.0, 20.0)),
            PulseWave::new("Q", PulseParams::new(-0.1, 489.0, 9.0, 1.0)),
            PulseWave::new("R", PulseParams::new(1.0, 500.0, 3.0, 3.0)),
            PulseWave::new("S", PulseParams::new(-0.2, 511.0, 1.0, 22.0)),
            PulseWave::new("ST", PulseParams::new(0.0, 583.0, 1.0, 1.0)),
            PulseWave::new("T", PulseParams::new(0.2, 660.0, 25.0, 25.0)),
        ]
    }

    pub fn heart_rate(&self) -> f64 {
        self.heart_rate
    }

    /// Duration of one cycle in milliseconds.
    pub fn cycle_duration(&self) -> f64 {
        MS_PER_MINUTE / self.heart_rate
    }

    pub fn grid(&self) -> &SampleGrid {
        &self.grid
    }

    pub fn waves(&self) -> &[PulseWave] {
        &self.waves
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn amplitude(&self) -> &[f64] {
        &self.amplitude
    }

    /// Number of samples in one cycle, both ends included.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Index of the final grid sample.
    pub fn last_index(&self) -> usize {
        self.time.len().saturating_sub(1)
    }

    pub fn trace(&self) -> Trace {
        Trace::new(self.time.clone(), self.amplitude.clone())
    }

    pub fn wave(&self, name: &str) -> Result<&PulseWave> {
        self.position(name).map(|idx| &self.waves[idx])
    }

    /// Mutable access to a wave; call [`CycleModel::synthesize`] afterwards.
    pub fn wave_mut(&mut self, name: &str) -> Result<&mut PulseWave> {
        let idx = self.position(name)?;
        Ok(&mut self.waves[idx])
    }

    pub(crate) fn position(&self, name: &str) -> Result<usize> {
        self.waves
            .iter()
            .position(|w| w.name == name)
            .ok_or_else(|| CardioError::UnknownWave(name.to_string()))
    }

    /// Replace one wave's parameters and re-synthesize the cycle.
    pub fn set_wave_params(&mut self, name: &str, params: PulseParams) -> Result<()> {
        self.wave_mut(name)?.params = params;
        self.synthesize();
        Ok(())
    }

    /// Recompute the amplitude array and every wave's support.
    ///
    /// Waves are written in order and overwrite earlier ones, so any residual
    /// overlap is won by the later wave. Overlap is prevented by the range
    /// search, not here.
    pub fn synthesize(&mut self) {
        let len = self.time.len();
        self.amplitude.clear();
        self.amplitude.resize(len, 0.0);
        for wave in &mut self.waves {
            wave.support = PulseSupport::locate(&wave.params, &self.grid, len);
            wave.render(&self.time, &mut self.amplitude, 0, 1.0);
        }
        debug!(
            "synthesized {} waves over {} samples at {} bpm",
            self.waves.len(),
            len,
            self.heart_rate
        );
    }

    /// Sample indices that wave `name` may extend to without touching its
    /// neighbors: the left neighbor's `right_end` and the right neighbor's
    /// `left_start`, or the grid ends for the first/last wave.
    pub fn neighbor_bounds(&self, name: &str) -> Result<(usize, usize)> {
        let idx = self.position(name)?;
        Ok(self.bounds_at(idx))
    }

    pub(crate) fn bounds_at(&self, idx: usize) -> (usize, usize) {
        let t_prev = match idx {
            0 => 0,
            _ => self.waves[idx - 1].support.right_end,
        };
        let t_next = match self.waves.get(idx + 1) {
            Some(next) => next.support.left_start,
            None => self.last_index(),
        };
        (t_prev, t_next)
    }

    /// Time-dilate every wave to a new heart rate and rebuild the grid.
    ///
    /// Timing fields are scaled by `old / new` without re-checking overlap;
    /// rounding may leave adjacent waves overlapping by a sample.
    pub fn rescale_to_heart_rate(&mut self, heart_rate: f64) -> Result<()> {
        validate_heart_rate(heart_rate)?;
        let len = self.grid.samples_for(MS_PER_MINUTE / heart_rate)?;
        let ratio = self.heart_rate / heart_rate;
        for wave in &mut self.waves {
            wave.dilate(ratio);
        }
        self.heart_rate = heart_rate;
        self.time = self.grid.time_axis(len);
        self.synthesize();
        if !self.overlapping_pairs().is_empty() {
            warn!(
                "rescaling to {} bpm left overlapping waves: {:?}",
                heart_rate,
                self.overlapping_pairs()
            );
        }
        Ok(())
    }

    /// Adjacent wave pairs whose supports overlap by more than a boundary.
    pub fn overlapping_pairs(&self) -> Vec<(String, String)> {
        self.waves
            .windows(2)
            .filter(|pair| pair[1].support.left_start < pair[0].support.right_end)
            .map(|pair| (pair[0].name.clone(), pair[1].name.clone()))
            .collect()
    }
}

fn validate_heart_rate(heart_rate: f64) -> Result<()> {
    if !heart_rate.is_finite() || heart_rate <= 0.0 {
        return Err(CardioError::Configuration(format!(
            "heart rate must be positive and finite, got {}",
            heart_rate
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        let diff = (a - b).abs();
        assert!(diff <= tol, "diff {} exceeded tol {} ({} vs {})", diff, tol, a, b);
    }

    fn r_only() -> CycleModel {
        let waves = vec![PulseWave::new("R", PulseParams::new(1.0, 500.0, 3.0, 3.0))];
        CycleModel::new(60.0, SampleGrid::default(), waves).unwrap()
    }

    #[test]
    fn r_pulse_peaks_at_its_mean() {
        let model = r_only();
        assert_eq!(model.len(), 2049);
        assert_eq!(model.cycle_duration(), 1000.0);
        let peak_idx = model.grid().nearest_index(500.0, model.len());
        assert_eq!(model.amplitude()[peak_idx], 1.0);

        let support = model.wave("R").unwrap().support;
        let edge = model.amplitude()[support.left_start];
        assert_close(edge, (-4.5f64).exp(), 5e-3);
        let t = model.time()[support.left_start];
        assert_close(edge, (-(t - 500.0).powi(2) / 18.0).exp(), 1e-12);
        assert_eq!(model.amplitude()[support.right_end], 0.0);
    }

    #[test]
    fn rejects_bad_configuration() {
        let grid = SampleGrid::default();
        assert!(matches!(
            CycleModel::new(0.0, grid, CycleModel::default_waves()),
            Err(CardioError::Configuration(_))
        ));
        assert!(matches!(
            CycleModel::new(f64::INFINITY, grid, CycleModel::default_waves()),
            Err(CardioError::Configuration(_))
        ));
        assert!(matches!(
            CycleModel::new(60.0, grid, Vec::new()),
            Err(CardioError::Configuration(_))
        ));
        let mut waves = CycleModel::default_waves();
        waves.push(waves[0].clone());
        assert!(matches!(
            CycleModel::new(60.0, grid, waves),
            Err(CardioError::Configuration(_))
        ));
    }

    #[test]
    fn later_wave_overwrites_overlap() {
        let waves = vec![
            PulseWave::new("A", PulseParams::new(1.0, 100.0, 10.0, 10.0)),
            PulseWave::new("B", PulseParams::new(-1.0, 110.0, 10.0, 10.0)),
        ];
        let model = CycleModel::new(60.0, SampleGrid::new(1000.0).unwrap(), waves).unwrap();
        // Sample 100 lies inside both supports; B is written last.
        assert!(model.amplitude()[100] < 0.0);
        assert_eq!(model.overlapping_pairs(), vec![("A".to_string(), "B".to_string())]);
    }

    #[test]
    fn neighbor_bounds_follow_wave_order() {
        let model = CycleModel::new(60.0, SampleGrid::default(), CycleModel::default_waves())
            .unwrap();
        let (prev, next) = model.neighbor_bounds("P").unwrap();
        assert_eq!(prev, 0);
        assert_eq!(next, model.wave("Q").unwrap().support.left_start);

        let (prev, next) = model.neighbor_bounds("R").unwrap();
        assert_eq!(prev, model.wave("Q").unwrap().support.right_end);
        assert_eq!(next, model.wave("S").unwrap().support.left_start);

        let (prev, next) = model.neighbor_bounds("T").unwrap();
        assert_eq!(prev, model.wave("ST").unwrap().support.right_end);
        assert_eq!(next, model.last_index());

        assert!(matches!(
            model.neighbor_bounds("U"),
            Err(CardioError::UnknownWave(_))
        ));
    }

    #[test]
    fn vanishing_heart_rate_is_a_configuration_error() {
        for rate in [1e-300, 1e-3] {
            assert!(matches!(
                CycleModel::new(rate, SampleGrid::default(), CycleModel::default_waves()),
                Err(CardioError::Configuration(_))
            ));
        }
        let mut model =
            CycleModel::new(60.0, SampleGrid::default(), CycleModel::default_waves()).unwrap();
        let before = model.clone();
        assert!(matches!(
            model.rescale_to_heart_rate(1e-300),
            Err(CardioError::Configuration(_))
        ));
        assert_eq!(model, before);
    }

    #[test]
    fn single_wave_is_bounded_by_the_grid() {
        let model = r_only();
        assert_eq!(model.neighbor_bounds("R").unwrap(), (0, 2048));
    }

    #[test]
    fn rescale_to_same_rate_is_a_no_op() {
        let mut model =
            CycleModel::new(60.0, SampleGrid::default(), CycleModel::default_waves()).unwrap();
        let before = model.clone();
        model.rescale_to_heart_rate(60.0).unwrap();
        assert_eq!(model.len(), before.len());
        for (a, b) in model.waves().iter().zip(before.waves()) {
            assert_close(a.params.mean, b.params.mean, 1e-9);
            assert_close(a.params.left_spread, b.params.left_spread, 1e-9);
            assert_close(a.params.right_spread, b.params.right_spread, 1e-9);
            assert_eq!(a.support, b.support);
        }
        assert_eq!(model.amplitude(), before.amplitude());
    }

    #[test]
    fn rescale_dilates_timing() {
        let mut model =
            CycleModel::new(60.0, SampleGrid::default(), CycleModel::default_waves()).unwrap();
        model.rescale_to_heart_rate(120.0).unwrap();
        assert_eq!(model.heart_rate(), 120.0);
        assert_eq!(model.cycle_duration(), 500.0);
        assert_eq!(model.len(), 1025);
        let r = model.wave("R").unwrap();
        assert_close(r.params.mean, 250.0, 1e-9);
        assert_close(r.params.left_spread, 1.5, 1e-9);
        assert_eq!(r.params.amplitude, 1.0);
        assert!(model.rescale_to_heart_rate(-1.0).is_err());
    }

    #[test]
    fn set_wave_params_resynthesizes() {
        let mut model = r_only();
        model
            .set_wave_params("R", PulseParams::new(2.0, 500.0, 3.0, 3.0))
            .unwrap();
        assert_eq!(model.amplitude()[1024], 2.0);
        assert!(model
            .set_wave_params("X", PulseParams::new(2.0, 500.0, 3.0, 3.0))
            .is_err());
    }
}
