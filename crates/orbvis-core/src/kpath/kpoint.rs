use super::KPathError;
use crate::numerics::coords_within;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One reciprocal-space sample. `original_index` is its row in the raw input
/// and the join key into every per-k-point array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KPoint {
    pub coordinates: [f64; 3],
    pub weight: f64,
    original_index: usize,
}

impl KPoint {
    pub fn new(original_index: usize, coordinates: [f64; 3], weight: f64) -> Self {
        Self {
            coordinates,
            weight,
            original_index,
        }
    }

    pub const fn original_index(&self) -> usize {
        self.original_index
    }
}

/// K-points in path order. Filtering removes points and never reorders them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KPointSet {
    points: Vec<KPoint>,
}

impl KPointSet {
    /// Builds a set from `[kx, ky, kz, weight]` rows in file order.
    pub fn from_rows(rows: &[[f64; 4]]) -> Result<Self, KPathError> {
        let points = rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                if row.iter().any(|value| !value.is_finite()) {
                    return Err(KPathError::InvalidKPoint {
                        original_index: index,
                        reason: "coordinates and weight must be finite",
                    });
                }
                if row[3] < 0.0 {
                    return Err(KPathError::InvalidKPoint {
                        original_index: index,
                        reason: "weight must be non-negative",
                    });
                }
                Ok(KPoint::new(index, [row[0], row[1], row[2]], row[3]))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[KPoint] {
        &self.points
    }

    pub fn get(&self, position: usize) -> Option<&KPoint> {
        self.points.get(position)
    }

    pub fn coordinates(&self, position: usize) -> [f64; 3] {
        self.points[position].coordinates
    }

    /// Original indices of the surviving points, in path order.
    pub fn surviving_indices(&self) -> Vec<usize> {
        self.points.iter().map(KPoint::original_index).collect()
    }

    /// Keeps only the points with `weight <= threshold`.
    pub fn filter_by_weight(&self, threshold: f64) -> Result<Self, KPathError> {
        let points: Vec<KPoint> = self
            .points
            .iter()
            .filter(|point| point.weight <= threshold)
            .copied()
            .collect();

        if points.is_empty() {
            return Err(KPathError::EmptyPath {
                total: self.points.len(),
                threshold,
            });
        }

        debug!(
            total = self.points.len(),
            kept = points.len(),
            threshold,
            "filtered k-points by weight"
        );
        Ok(Self { points })
    }

    /// Separates band-path points from SCF sampling points.
    ///
    /// A set whose weights are all equal (within `uniformity_tolerance`) is a
    /// plain band calculation and is returned whole; otherwise only the
    /// zero-weight points are kept.
    pub fn isolate_band_path(
        &self,
        threshold: f64,
        uniformity_tolerance: f64,
    ) -> Result<Self, KPathError> {
        let Some(first) = self.points.first() else {
            return Err(KPathError::EmptyPath {
                total: 0,
                threshold,
            });
        };

        let uniform = self
            .points
            .iter()
            .all(|point| (point.weight - first.weight).abs() <= uniformity_tolerance);
        if uniform {
            debug!(total = self.points.len(), "uniform k-point weights, keeping full path");
            return Ok(self.clone());
        }

        self.filter_by_weight(threshold)
    }

    /// Drops a point when it repeats the previous surviving point's coordinates.
    pub fn deduplicate_consecutive(&self, tolerance: f64) -> Self {
        let mut points: Vec<KPoint> = Vec::with_capacity(self.points.len());
        for point in &self.points {
            let repeated = points.last().is_some_and(|previous| {
                coords_within(previous.coordinates, point.coordinates, tolerance)
            });
            if !repeated {
                points.push(*point);
            }
        }

        debug!(
            total = self.points.len(),
            kept = points.len(),
            "removed consecutive duplicate k-points"
        );
        Self { points }
    }
}

#[cfg(test)]
mod tests {
    use super::KPointSet;
    use crate::kpath::KPathError;

    fn set_with_weights(weights: &[f64]) -> KPointSet {
        let rows: Vec<[f64; 4]> = weights
            .iter()
            .enumerate()
            .map(|(index, weight)| [index as f64 * 0.1, 0.0, 0.0, *weight])
            .collect();
        KPointSet::from_rows(&rows).expect("rows should be valid")
    }

    fn set_with_coords(coords: &[[f64; 3]]) -> KPointSet {
        let rows: Vec<[f64; 4]> = coords
            .iter()
            .map(|coord| [coord[0], coord[1], coord[2], 0.0])
            .collect();
        KPointSet::from_rows(&rows).expect("rows should be valid")
    }

    #[test]
    fn weight_filter_keeps_zero_weight_points() {
        let set = set_with_weights(&[0.0, 0.0, 0.1, 0.0, 0.0]);
        let filtered = set.filter_by_weight(0.01).expect("filter should keep points");
        assert_eq!(filtered.surviving_indices(), vec![0, 1, 3, 4]);
    }

    #[test]
    fn weight_filter_reports_empty_path() {
        let set = set_with_weights(&[0.2, 0.3]);
        let error = set.filter_by_weight(0.01).expect_err("nothing survives");
        assert_eq!(
            error,
            KPathError::EmptyPath {
                total: 2,
                threshold: 0.01
            }
        );
    }

    #[test]
    fn isolate_band_path_keeps_uniform_sets_whole() {
        let set = set_with_weights(&[0.25, 0.25, 0.25, 0.25]);
        let isolated = set.isolate_band_path(1.0e-3, 1.0e-3).expect("uniform set");
        assert_eq!(isolated.surviving_indices(), vec![0, 1, 2, 3]);

        let mixed = set_with_weights(&[0.5, 0.5, 0.0, 0.0, 0.0]);
        let isolated = mixed.isolate_band_path(1.0e-3, 1.0e-3).expect("mixed set");
        assert_eq!(isolated.surviving_indices(), vec![2, 3, 4]);
    }

    #[test]
    fn deduplication_only_removes_consecutive_repeats() {
        let a = [0.0, 0.0, 0.0];
        let b = [0.5, 0.0, 0.0];
        let c = [0.5, 0.5, 0.0];

        let set = set_with_coords(&[a, a, b, c, c]);
        let deduplicated = set.deduplicate_consecutive(1.0e-8);
        assert_eq!(deduplicated.surviving_indices(), vec![0, 2, 3]);
        assert_eq!(deduplicated.coordinates(1), b);

        let revisit = set_with_coords(&[a, b, a]);
        assert_eq!(
            revisit.deduplicate_consecutive(1.0e-8).surviving_indices(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn deduplication_tolerates_float_noise() {
        let set = set_with_coords(&[[0.5, 0.0, 0.0], [0.5 + 5.0e-9, 0.0, -5.0e-9]]);
        assert_eq!(set.deduplicate_consecutive(1.0e-8).len(), 1);
    }

    #[test]
    fn original_indices_survive_chained_filters() {
        let rows = [
            [0.0, 0.0, 0.0, 0.2],
            [0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0],
            [0.1, 0.0, 0.0, 0.0],
            [0.1, 0.0, 0.0, 0.2],
            [0.2, 0.0, 0.0, 0.0],
        ];
        let set = KPointSet::from_rows(&rows).expect("rows should be valid");
        let cleaned = set
            .filter_by_weight(1.0e-3)
            .expect("filter")
            .deduplicate_consecutive(1.0e-8);
        assert_eq!(cleaned.surviving_indices(), vec![1, 3, 5]);
        assert_eq!(cleaned.points()[1].original_index(), 3);
    }

    #[test]
    fn invalid_rows_are_rejected_with_their_index() {
        let error = KPointSet::from_rows(&[[0.0, 0.0, 0.0, 0.0], [0.0, f64::NAN, 0.0, 0.0]])
            .expect_err("NaN coordinate");
        assert!(matches!(
            error,
            KPathError::InvalidKPoint {
                original_index: 1,
                ..
            }
        ));

        let error = KPointSet::from_rows(&[[0.0, 0.0, 0.0, -1.0]]).expect_err("negative weight");
        assert!(matches!(
            error,
            KPathError::InvalidKPoint {
                original_index: 0,
                ..
            }
        ));
    }
}
