use crate::{
    analysis::dominant::{select_dominant_cycle, DominantCycle},
    error::{CardioError, Result},
    grid::SampleGrid,
    signal::{PhasePortrait, Trace},
};
use serde::{Deserialize, Serialize};

/// Display rate assumed for recorded signals loaded from text files (Hz).
pub const DEFAULT_DISPLAY_RATE: f64 = 500.0;

/// Default lag for the pseudophase portrait, in samples.
pub const DEFAULT_TAU: usize = 8;

/// Zero samples added on each side before applying the derivative stencil.
const STENCIL_PAD: usize = 3;

/// First derivative per sample from a six-point central stencil.
///
/// The signal is zero-padded by three samples on both ends so the output has
/// the same length as the input; edge values therefore see the padding.
pub fn derivative(z: &[f64]) -> Vec<f64> {
    let mut padded = Vec::with_capacity(z.len() + 2 * STENCIL_PAD);
    padded.extend_from_slice(&[0.0; STENCIL_PAD]);
    padded.extend_from_slice(z);
    padded.extend_from_slice(&[0.0; STENCIL_PAD]);
    (STENCIL_PAD..STENCIL_PAD + z.len())
        .map(|k| {
            (padded[k + 3] - 9.0 * padded[k + 2] + 45.0 * padded[k + 1]
                - 45.0 * padded[k - 1]
                + 9.0 * padded[k - 2]
                - padded[k - 3])
                / 60.0
        })
        .collect()
}

/// Differentiate each candidate on its own so no stencil reaches across the
/// boundary between two candidates.
pub fn derivative_per_candidate(candidates: &[Vec<f64>]) -> Vec<Vec<f64>> {
    candidates.iter().map(|z| derivative(z)).collect()
}

/// Time-delay embedding `(z[0 .. N - tau], z[tau .. N])`.
pub fn pseudophase_embedding(z: &[f64], tau: usize) -> Result<PhasePortrait> {
    if tau == 0 || tau >= z.len() {
        return Err(CardioError::InvalidArgument(format!(
            "lag must be between 1 and {} samples, got {}",
            z.len().saturating_sub(1),
            tau
        )));
    }
    let n = z.len();
    Ok(PhasePortrait::new(
        z[..n - tau].to_vec(),
        z[tau..].to_vec(),
    ))
}

/// What a loaded signal holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    /// One cycle; more candidate cycles may be appended.
    Cycle,
    /// A whole recording; analysed as one signal.
    Sequence,
}

/// Phase-space view over one or more loaded signals.
///
/// Candidates are kept separately for differentiation and dominant-cycle
/// selection, and concatenated for the time-domain and portrait views.
#[derive(Debug, Clone)]
pub struct PhaseAnalyzer {
    kind: SignalKind,
    display_grid: SampleGrid,
    candidates: Vec<Vec<f64>>,
}

impl PhaseAnalyzer {
    pub fn new(kind: SignalKind, display_grid: SampleGrid, signal: Vec<f64>) -> Self {
        Self {
            kind,
            display_grid,
            candidates: vec![signal],
        }
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn candidates(&self) -> &[Vec<f64>] {
        &self.candidates
    }

    fn require_cycles(&self, operation: &str) -> Result<()> {
        match self.kind {
            SignalKind::Cycle => Ok(()),
            SignalKind::Sequence => Err(CardioError::UnsupportedOperation(format!(
                "{} needs signals loaded as single cycles",
                operation
            ))),
        }
    }

    /// Append another candidate cycle after the existing ones.
    pub fn add_candidate(&mut self, signal: Vec<f64>) -> Result<()> {
        self.require_cycles("adding a candidate")?;
        self.candidates.push(signal);
        Ok(())
    }

    /// All candidates end to end.
    pub fn flattened(&self) -> Vec<f64> {
        self.candidates.concat()
    }

    pub fn time_domain(&self) -> Trace {
        let amplitude = self.flattened();
        Trace::new(self.display_grid.time_axis(amplitude.len()), amplitude)
    }

    pub fn derivatives(&self) -> Vec<Vec<f64>> {
        derivative_per_candidate(&self.candidates)
    }

    /// `(z, dz)` over the concatenated candidates.
    pub fn phase_portrait(&self) -> PhasePortrait {
        PhasePortrait::new(self.flattened(), self.derivatives().concat())
    }

    /// `(z(t), z(t + tau))` over the concatenated candidates.
    pub fn pseudophase(&self, tau: usize) -> Result<PhasePortrait> {
        pseudophase_embedding(&self.flattened(), tau)
    }

    /// Medoid of the candidates' phase portraits.
    pub fn dominant_cycle(&self) -> Result<DominantCycle> {
        self.require_cycles("dominant cycle selection")?;
        let portraits: Vec<PhasePortrait> = self
            .candidates
            .iter()
            .zip(self.derivatives())
            .map(|(z, dz)| PhasePortrait::new(z.clone(), dz))
            .collect();
        select_dominant_cycle(&portraits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivative_of_ramp_is_one_inside() {
        let z: Vec<f64> = (0..10).map(|k| k as f64).collect();
        let dz = derivative(&z);
        assert_eq!(dz.len(), z.len());
        for value in &dz[3..7] {
            assert!((value - 1.0).abs() < 1e-12, "{}", value);
        }
        // The padding pulls edge estimates away from the true slope.
        assert!((dz[0] - 1.0).abs() > 1e-3);
        assert!((dz[9] - 1.0).abs() > 1e-3);
    }

    #[test]
    fn derivative_of_constant_is_zero_inside() {
        let dz = derivative(&[2.0; 12]);
        assert!(dz[3..9].iter().all(|v| v.abs() < 1e-12));
        assert!(derivative(&[]).is_empty());
    }

    #[test]
    fn candidates_are_padded_separately() {
        let a = vec![1.0; 8];
        let b = vec![5.0; 8];
        let separate = derivative_per_candidate(&[a.clone(), b.clone()]);
        assert_eq!(separate[0], derivative(&a));
        assert_eq!(separate[1], derivative(&b));
        let joined = derivative(&[a, b].concat());
        assert_ne!(separate.concat(), joined);
    }

    #[test]
    fn pseudophase_pairs_lagged_samples() {
        let z: Vec<f64> = (0..10).map(|k| k as f64).collect();
        let p = pseudophase_embedding(&z, 3).unwrap();
        assert_eq!(p.x, (0..7).map(|k| k as f64).collect::<Vec<_>>());
        assert_eq!(p.y, (3..10).map(|k| k as f64).collect::<Vec<_>>());
        assert!(pseudophase_embedding(&z, 0).is_err());
        assert!(pseudophase_embedding(&z, 10).is_err());
    }

    #[test]
    fn sequence_sessions_reject_candidate_operations() {
        let grid = SampleGrid::new(DEFAULT_DISPLAY_RATE).unwrap();
        let mut session = PhaseAnalyzer::new(SignalKind::Sequence, grid, vec![0.0, 1.0, 0.0]);
        assert!(matches!(
            session.add_candidate(vec![1.0]),
            Err(CardioError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            session.dominant_cycle(),
            Err(CardioError::UnsupportedOperation(_))
        ));
        assert_eq!(session.phase_portrait().len(), 3);
    }

    #[test]
    fn cycle_session_concatenates_candidates() {
        let grid = SampleGrid::new(DEFAULT_DISPLAY_RATE).unwrap();
        let first: Vec<f64> = (0..20).map(|k| (k as f64 * 0.3).sin()).collect();
        let second: Vec<f64> = (0..25).map(|k| (k as f64 * 0.3).sin()).collect();
        let mut session = PhaseAnalyzer::new(SignalKind::Cycle, grid, first);
        session.add_candidate(second).unwrap();

        let trace = session.time_domain();
        assert_eq!(trace.len(), 45);
        assert_eq!(trace.time[1], 2.0);

        let portrait = session.phase_portrait();
        assert_eq!(portrait.x.len(), 45);
        assert_eq!(portrait.y.len(), 45);

        let lagged = session.pseudophase(DEFAULT_TAU).unwrap();
        assert_eq!(lagged.len(), 45 - DEFAULT_TAU);

        let dominant = session.dominant_cycle().unwrap();
        assert!(dominant.index < 2);
        assert_eq!(dominant.distances.get(0, 1), dominant.distances.get(1, 0));
    }
}
