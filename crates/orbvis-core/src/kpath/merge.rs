use super::segment::axis_offsets;
use super::{HighSymmetryPoint, KPathError, KPointSet, Segment};
use crate::tensor::BandTensor;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathSample {
    pub x: f64,
    pub original_index: usize,
}

/// The whole band path laid out on one axis, with band data in sample order.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedPath {
    pub samples: Vec<PathSample>,
    pub high_symmetry_points: Vec<HighSymmetryPoint>,
    /// Sample positions that start a segment after a discontinuity.
    pub breaks: Vec<usize>,
    pub bands: BandTensor,
}

impl MergedPath {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn total_length(&self) -> f64 {
        self.samples.last().map_or(0.0, |sample| sample.x)
    }

    pub fn x_values(&self) -> Vec<f64> {
        self.samples.iter().map(|sample| sample.x).collect()
    }

    pub fn original_indices(&self) -> Vec<usize> {
        self.samples.iter().map(|sample| sample.original_index).collect()
    }

    /// Stretches the axis so it spans `[0, width]`. Ticks move with it.
    pub fn rescaled(mut self, width: f64) -> Self {
        let total = self.total_length();
        if total <= 0.0 || !width.is_finite() {
            return self;
        }
        let factor = width / total;
        for sample in &mut self.samples {
            sample.x *= factor;
        }
        for point in &mut self.high_symmetry_points {
            point.position_in_merged_axis *= factor;
        }
        self
    }

    /// Copies one value per sample and puts a NaN before every break, so a
    /// line plot does not connect the two sides of a discontinuity.
    pub fn with_breaks<I>(&self, values: I) -> Vec<f64>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut output = Vec::with_capacity(self.samples.len() + self.breaks.len());
        let mut pending = self.breaks.iter().peekable();
        for (position, value) in values.into_iter().enumerate() {
            if pending.next_if(|start| **start == position).is_some() {
                output.push(f64::NAN);
            }
            output.push(value);
        }
        output
    }

    /// Energies of one band along the path, broken at discontinuities.
    pub fn band_series(&self, spin: usize, band: usize) -> Vec<f64> {
        let energies = self.bands.eigenvalues(spin);
        self.with_breaks((0..energies.nrows()).map(|row| energies[(row, band)]))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PathMerger {
    axis_width: Option<f64>,
}

impl PathMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_axis_width(mut self, width: f64) -> Self {
        self.axis_width = Some(width);
        self
    }

    /// Lays segments end to end and pulls the matching band rows.
    ///
    /// Each segment is shifted by the summed length of the segments before
    /// it. A segment that joins the previous one skips its first point, which
    /// is the previous segment's last.
    pub fn merge(
        &self,
        set: &KPointSet,
        segments: &[Segment],
        high_symmetry_points: Vec<HighSymmetryPoint>,
        bands: &BandTensor,
    ) -> Result<MergedPath, KPathError> {
        let mut samples: Vec<PathSample> = Vec::with_capacity(set.len());
        let mut breaks = Vec::new();

        for (segment, offset) in segments.iter().zip(axis_offsets(segments)) {
            let shared = segment.joins_previous && !samples.is_empty();
            if !segment.joins_previous && !samples.is_empty() {
                breaks.push(samples.len());
            }
            for (local, position) in segment
                .positions()
                .enumerate()
                .skip(usize::from(shared))
            {
                samples.push(PathSample {
                    x: offset + segment.cumulative_lengths[local],
                    original_index: set.points()[position].original_index(),
                });
            }
        }

        let indices: Vec<usize> = samples.iter().map(|sample| sample.original_index).collect();
        let bands = bands.select_kpoints(&indices)?;

        debug!(
            samples = samples.len(),
            breaks = breaks.len(),
            "merged k-path segments"
        );

        let merged = MergedPath {
            samples,
            high_symmetry_points,
            breaks,
            bands,
        };
        Ok(match self.axis_width {
            Some(width) => merged.rescaled(width),
            None => merged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::PathMerger;
    use crate::kpath::{HighSymmetryLocator, KPathError, KPointSet, PathSegmenter, PathTolerances};
    use crate::tensor::{BandTensor, SpinLayout};

    /// Hybrid-style input: SCF points with weight, then a Γ-X-M path with a
    /// repeated corner and a jump to a separate A-Z leg.
    fn raw_rows() -> Vec<[f64; 4]> {
        let mut rows = vec![[0.1, 0.1, 0.1, 0.25], [0.2, 0.2, 0.2, 0.25]];
        rows.extend((0..=5).map(|i| [i as f64 * 0.1, 0.0, 0.0, 0.0]));
        rows.extend((0..=5).map(|i| [0.5, i as f64 * 0.1, 0.0, 0.0]));
        rows.extend((0..=4).map(|i| [0.0, 0.5, 0.5 - i as f64 * 0.1, 0.0]));
        rows
    }

    fn raw_tensor(n_k: usize) -> BandTensor {
        let eigen = vec![
            (0..n_k)
                .map(|k| vec![k as f64, 100.0 + k as f64])
                .collect::<Vec<_>>(),
        ];
        BandTensor::from_nested(SpinLayout::Unpolarized, &eigen, None, None).expect("tensor")
    }

    fn cleaned(rows: &[[f64; 4]]) -> KPointSet {
        KPointSet::from_rows(rows)
            .expect("rows")
            .isolate_band_path(1.0e-3, 1.0e-3)
            .expect("band path")
            .deduplicate_consecutive(1.0e-8)
    }

    #[test]
    fn merged_axis_is_monotonic_and_keeps_band_rows() {
        let rows = raw_rows();
        let raw = raw_tensor(rows.len());
        let set = cleaned(&rows);
        let aligned = raw.select_kpoints(&set.surviving_indices()).expect("align");
        let segments = PathSegmenter::new(PathTolerances::default())
            .segment(&set)
            .expect("segments");
        let points = HighSymmetryLocator::new()
            .locate(&set, &segments)
            .expect("points");

        let merged = PathMerger::new()
            .merge(&set, &segments, points, &aligned)
            .expect("merge");

        let xs = merged.x_values();
        assert!(xs.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(merged.len(), set.len());
        assert_eq!(merged.original_indices(), set.surviving_indices());

        for (row, index) in merged.original_indices().into_iter().enumerate() {
            assert_eq!(merged.bands.eigenvalues(0)[(row, 0)], raw.eigenvalues(0)[(index, 0)]);
            assert_eq!(merged.bands.eigenvalues(0)[(row, 1)], raw.eigenvalues(0)[(index, 1)]);
        }
        assert!(!merged.original_indices().contains(&0));
        assert!(!merged.original_indices().contains(&8));
    }

    #[test]
    fn discontinuity_becomes_a_break_with_nan_separator() {
        let rows = raw_rows();
        let set = cleaned(&rows);
        let segments = PathSegmenter::new(PathTolerances::default())
            .segment(&set)
            .expect("segments");
        assert_eq!(segments.len(), 3);
        assert!(!segments[2].joins_previous);

        let aligned = raw_tensor(rows.len())
            .select_kpoints(&set.surviving_indices())
            .expect("align");
        let merged = PathMerger::new()
            .merge(&set, &segments, Vec::new(), &aligned)
            .expect("merge");

        assert_eq!(merged.breaks, vec![11]);
        assert_eq!(merged.samples[10].x, merged.samples[11].x);

        let series = merged.band_series(0, 0);
        assert_eq!(series.len(), merged.len() + 1);
        assert!(series[11].is_nan());
        assert_eq!(series[12], merged.bands.eigenvalues(0)[(11, 0)]);
    }

    #[test]
    fn missing_band_row_is_an_alignment_error() {
        let rows = raw_rows();
        let set = cleaned(&rows);
        let segments = PathSegmenter::new(PathTolerances::default())
            .segment(&set)
            .expect("segments");
        let truncated = raw_tensor(rows.len())
            .select_kpoints(&[2, 3, 4])
            .expect("partial");

        let error = PathMerger::new()
            .merge(&set, &segments, Vec::new(), &truncated)
            .expect_err("rows are missing");
        assert_eq!(
            error,
            KPathError::Alignment {
                original_index: 5,
                available: 3
            }
        );
    }

    #[test]
    fn axis_width_rescales_samples_and_ticks() {
        let rows = raw_rows();
        let set = cleaned(&rows);
        let aligned = raw_tensor(rows.len())
            .select_kpoints(&set.surviving_indices())
            .expect("align");
        let segments = PathSegmenter::new(PathTolerances::default())
            .segment(&set)
            .expect("segments");
        let points = HighSymmetryLocator::new()
            .locate(&set, &segments)
            .expect("points");

        let merged = PathMerger::new()
            .with_axis_width(3.0)
            .merge(&set, &segments, points, &aligned)
            .expect("merge");

        assert!((merged.total_length() - 3.0).abs() < 1.0e-12);
        let last_tick = merged
            .high_symmetry_points
            .last()
            .expect("ticks")
            .position_in_merged_axis;
        assert!((last_tick - 3.0).abs() < 1.0e-12);
    }
}
