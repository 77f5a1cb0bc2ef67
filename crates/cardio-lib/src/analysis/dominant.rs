use crate::{
    error::{CardioError, Result},
    signal::PhasePortrait,
};
use log::debug;
use serde::{Deserialize, Serialize};

/// Symmetric matrix of pairwise Hausdorff distances, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    pub size: usize,
    pub values: Vec<f64>,
}

impl DistanceMatrix {
    fn zeros(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size],
        }
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.size + j]
    }

    fn set_pair(&mut self, i: usize, j: usize, value: f64) {
        self.values[i * self.size + j] = value;
        self.values[j * self.size + i] = value;
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.values.chunks(self.size.max(1))
    }

    /// Total distance from each candidate to all others.
    pub fn row_sums(&self) -> Vec<f64> {
        self.rows().map(|row| row.iter().sum()).collect()
    }
}

/// Outcome of dominant-cycle selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DominantCycle {
    /// Index of the medoid candidate.
    pub index: usize,
    pub distances: DistanceMatrix,
    /// Candidates rescaled to the unit square, as compared.
    pub normalized: Vec<PhasePortrait>,
}

/// Rescale each axis of `portrait` to `[0, 1]`.
///
/// A constant axis divides by zero and yields NaN.
pub fn normalize_portrait(portrait: &PhasePortrait) -> PhasePortrait {
    PhasePortrait::new(min_max(&portrait.x), min_max(&portrait.y))
}

fn min_max(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    values.iter().map(|v| (v - min) / span).collect()
}

/// `max` over points of `a` of the distance to the nearest point of `b`.
pub fn directed_hausdorff(a: &PhasePortrait, b: &PhasePortrait) -> f64 {
    a.points()
        .map(|[ax, ay]| {
            b.points()
                .map(|[bx, by]| ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt())
                .fold(f64::INFINITY, f64::min)
        })
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Symmetric Hausdorff distance: the larger of both directed distances.
pub fn hausdorff_distance(a: &PhasePortrait, b: &PhasePortrait) -> f64 {
    directed_hausdorff(a, b).max(directed_hausdorff(b, a))
}

/// Pairwise distances between already-normalized portraits; the diagonal is
/// exactly zero.
pub fn distance_matrix(portraits: &[PhasePortrait]) -> DistanceMatrix {
    let size = portraits.len();
    let mut matrix = DistanceMatrix::zeros(size);
    for i in 0..size {
        for j in (i + 1)..size {
            matrix.set_pair(i, j, hausdorff_distance(&portraits[i], &portraits[j]));
        }
    }
    matrix
}

/// Index with the smallest value; the first one wins ties.
fn stable_argmin(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &value) in values.iter().enumerate() {
        match best {
            Some((_, current)) if value >= current || value.is_nan() => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Pick the candidate whose phase portrait is closest, in total Hausdorff
/// distance, to all the others.
///
/// Each candidate is a `(z, dz)` pair; both axes are min-max normalized per
/// candidate before comparison.
pub fn select_dominant_cycle(candidates: &[PhasePortrait]) -> Result<DominantCycle> {
    if candidates.is_empty() {
        return Err(CardioError::InvalidArgument(
            "dominant cycle selection needs at least one candidate".into(),
        ));
    }
    for (idx, candidate) in candidates.iter().enumerate() {
        if candidate.x.len() != candidate.y.len() {
            return Err(CardioError::InvalidArgument(format!(
                "candidate {} has {} samples but {} derivative values",
                idx,
                candidate.x.len(),
                candidate.y.len()
            )));
        }
        if candidate.is_empty() {
            return Err(CardioError::InvalidArgument(format!(
                "candidate {} is empty",
                idx
            )));
        }
    }
    let normalized: Vec<PhasePortrait> = candidates.iter().map(normalize_portrait).collect();
    let distances = distance_matrix(&normalized);
    let sums = distances.row_sums();
    let index = stable_argmin(&sums).unwrap_or(0);
    debug!(
        "dominant cycle {} of {} (total distance {:?})",
        index,
        candidates.len(),
        sums.get(index)
    );
    Ok(DominantCycle {
        index,
        distances,
        normalized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn portrait(points: &[[f64; 2]]) -> PhasePortrait {
        PhasePortrait::new(
            points.iter().map(|p| p[0]).collect(),
            points.iter().map(|p| p[1]).collect(),
        )
    }

    #[test]
    fn normalization_maps_to_unit_square() {
        let p = portrait(&[[2.0, -1.0], [4.0, 1.0], [3.0, 0.0]]);
        let n = normalize_portrait(&p);
        assert_eq!(n.x, vec![0.0, 1.0, 0.5]);
        assert_eq!(n.y, vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn constant_axis_yields_nan() {
        let p = portrait(&[[1.0, 0.0], [1.0, 1.0]]);
        assert!(normalize_portrait(&p).x.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn directed_distance_is_asymmetric() {
        let a = portrait(&[[0.0, 0.0]]);
        let b = portrait(&[[0.0, 0.0], [3.0, 4.0]]);
        assert_eq!(directed_hausdorff(&a, &b), 0.0);
        assert_eq!(directed_hausdorff(&b, &a), 5.0);
        assert_eq!(hausdorff_distance(&a, &b), 5.0);
        assert_eq!(hausdorff_distance(&b, &a), 5.0);
    }

    #[test]
    fn matrix_is_symmetric_with_zero_diagonal() {
        let portraits = vec![
            portrait(&[[0.0, 0.0], [1.0, 1.0]]),
            portrait(&[[0.1, 0.0], [1.0, 0.9]]),
            portrait(&[[0.5, 0.5], [0.0, 1.0], [1.0, 0.0]]),
        ];
        let m = distance_matrix(&portraits);
        for i in 0..3 {
            assert_eq!(m.get(i, i), 0.0);
            for j in 0..3 {
                assert_eq!(m.get(i, j), m.get(j, i));
            }
        }
        assert!(m.get(0, 1) > 0.0);
    }

    #[test]
    fn medoid_is_the_central_candidate() {
        let square = |shift: f64| {
            portrait(&[
                [0.0, 0.0],
                [1.0, 0.0],
                [1.0, 1.0],
                [0.0, 1.0],
                [0.5 + shift, 0.5],
            ])
        };
        let candidates = vec![square(-0.4), square(0.0), square(0.4)];
        let result = select_dominant_cycle(&candidates).unwrap();
        assert_eq!(result.index, 1);
        assert_eq!(result.normalized.len(), 3);
        assert_eq!(result.distances.size, 3);
    }

    #[test]
    fn ties_go_to_the_first_candidate() {
        let p = portrait(&[[0.0, 0.0], [1.0, 1.0]]);
        let result = select_dominant_cycle(&[p.clone(), p.clone(), p]).unwrap();
        assert_eq!(result.index, 0);
        assert!(result.distances.values.iter().all(|&d| d == 0.0));
    }

    #[test]
    fn constant_candidate_is_infinitely_far() {
        let flat = portrait(&[[1.0, 0.0], [1.0, 1.0], [1.0, 0.5]]);
        let a = portrait(&[[0.0, 0.0], [1.0, 1.0], [0.5, 0.2]]);
        let b = portrait(&[[0.0, 0.1], [1.0, 0.9], [0.4, 0.0]]);
        let result = select_dominant_cycle(&[a, flat, b]).unwrap();
        assert!(result.distances.get(0, 1).is_infinite());
        assert!(result.distances.get(1, 2).is_infinite());
        assert!(result.distances.get(0, 2).is_finite());
        assert_eq!(result.distances.get(1, 1), 0.0);
        // Every row touches the flat candidate, so the first index wins.
        assert!(result.distances.row_sums().iter().all(|s| s.is_infinite()));
        assert_eq!(result.index, 0);
        let json = serde_json::to_value(&result.distances).unwrap();
        assert!(json["values"][1].is_null());
    }

    #[test]
    fn rejects_empty_or_mismatched_input() {
        assert!(select_dominant_cycle(&[]).is_err());
        let ragged = PhasePortrait::new(vec![0.0, 1.0], vec![0.0]);
        assert!(select_dominant_cycle(&[ragged]).is_err());
        let empty = PhasePortrait::new(Vec::new(), Vec::new());
        assert!(select_dominant_cycle(&[empty]).is_err());
    }
}
