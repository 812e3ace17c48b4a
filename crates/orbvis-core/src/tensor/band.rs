use super::OrbitalGroup;
use crate::kpath::KPathError;
use faer::Mat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Eigenvalues as `[spin][k-point][band]`.
pub type NestedEigenvalues = Vec<Vec<Vec<f64>>>;
/// Projection weights as `[spin][k-point][band][atom][orbital]`.
pub type NestedProjections = Vec<Vec<Vec<Vec<Vec<f64>>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpinLayout {
    Unpolarized,
    Collinear,
    /// Spin-orbit runs carry one eigenvalue channel; of the four projection
    /// channels (total, mx, my, mz) only the total is kept.
    SpinOrbit,
}

impl SpinLayout {
    pub fn from_flags(ispin: u8, soc: bool) -> Option<Self> {
        match (ispin, soc) {
            (_, true) => Some(Self::SpinOrbit),
            (1, false) => Some(Self::Unpolarized),
            (2, false) => Some(Self::Collinear),
            _ => None,
        }
    }

    pub const fn channels(self) -> usize {
        match self {
            Self::Unpolarized | Self::SpinOrbit => 1,
            Self::Collinear => 2,
        }
    }

    const fn accepts_projection_channels(self, count: usize) -> bool {
        match self {
            Self::SpinOrbit => count == 1 || count == 4,
            _ => count == self.channels(),
        }
    }
}

/// Projection weights, one `k x band` block per (spin, atom, orbital).
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionTensor {
    n_atoms: usize,
    n_orbitals: usize,
    total_orbital: Option<usize>,
    channels: Vec<Mat<f64>>,
}

impl ProjectionTensor {
    pub fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    pub fn n_orbitals(&self) -> usize {
        self.n_orbitals
    }

    pub fn total_orbital(&self) -> Option<usize> {
        self.total_orbital
    }

    pub fn channel(&self, spin: usize, atom: usize, orbital: usize) -> &Mat<f64> {
        &self.channels[(spin * self.n_atoms + atom) * self.n_orbitals + orbital]
    }

    fn map_channels(&self, map: impl Fn(&Mat<f64>) -> Mat<f64>) -> Self {
        Self {
            n_atoms: self.n_atoms,
            n_orbitals: self.n_orbitals,
            total_orbital: self.total_orbital,
            channels: self.channels.iter().map(map).collect(),
        }
    }
}

/// Band energies and optional projections for a list of k-points.
///
/// Axes: row = k-point, column = band, one matrix per spin channel. Row `r`
/// belongs to the k-point whose original input index is `kpoint_indices[r]`;
/// every selection carries those indices along so rows can never drift away
/// from their k-point.
#[derive(Debug, Clone, PartialEq)]
pub struct BandTensor {
    layout: SpinLayout,
    kpoint_indices: Vec<usize>,
    eigenvalues: Vec<Mat<f64>>,
    projections: Option<ProjectionTensor>,
}

impl BandTensor {
    pub fn from_nested(
        layout: SpinLayout,
        eigenvalues: &[Vec<Vec<f64>>],
        projections: Option<&[Vec<Vec<Vec<Vec<f64>>>>]>,
        total_orbital: Option<usize>,
    ) -> Result<Self, KPathError> {
        if eigenvalues.len() != layout.channels() {
            return Err(KPathError::shape(
                "eigenvalue spin channels",
                layout.channels(),
                eigenvalues.len(),
            ));
        }

        let n_kpoints = eigenvalues[0].len();
        let n_bands = eigenvalues[0].first().map_or(0, Vec::len);
        for (spin, channel) in eigenvalues.iter().enumerate() {
            if channel.len() != n_kpoints {
                return Err(KPathError::shape(
                    format!("eigenvalue k-points in spin {spin}"),
                    n_kpoints,
                    channel.len(),
                ));
            }
            if let Some((kpoint, row)) = channel
                .iter()
                .enumerate()
                .find(|(_, row)| row.len() != n_bands)
            {
                return Err(KPathError::shape(
                    format!("bands at k-point {kpoint} in spin {spin}"),
                    n_bands,
                    row.len(),
                ));
            }
        }

        let eigenvalue_blocks = eigenvalues
            .iter()
            .map(|channel| Mat::from_fn(n_kpoints, n_bands, |k, band| channel[k][band]))
            .collect();

        let projections = projections
            .map(|raw| build_projections(layout, raw, n_kpoints, n_bands, total_orbital))
            .transpose()?;

        debug!(
            kpoints = n_kpoints,
            bands = n_bands,
            spins = layout.channels(),
            projected = projections.is_some(),
            "loaded band tensor"
        );

        Ok(Self {
            layout,
            kpoint_indices: (0..n_kpoints).collect(),
            eigenvalues: eigenvalue_blocks,
            projections,
        })
    }

    pub fn layout(&self) -> SpinLayout {
        self.layout
    }

    pub fn n_kpoints(&self) -> usize {
        self.kpoint_indices.len()
    }

    pub fn n_bands(&self) -> usize {
        self.eigenvalues.first().map_or(0, |block| block.ncols())
    }

    pub fn n_spins(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Original input index of every row, in row order.
    pub fn kpoint_indices(&self) -> &[usize] {
        &self.kpoint_indices
    }

    pub fn eigenvalues(&self, spin: usize) -> &Mat<f64> {
        &self.eigenvalues[spin]
    }

    pub fn projections(&self) -> Option<&ProjectionTensor> {
        self.projections.as_ref()
    }

    /// Fails unless the tensor has exactly one row per raw k-point.
    pub fn ensure_kpoint_count(&self, expected: usize) -> Result<(), KPathError> {
        if self.n_kpoints() != expected {
            return Err(KPathError::shape(
                "band data k-points",
                expected,
                self.n_kpoints(),
            ));
        }
        Ok(())
    }

    /// Rows for the given original indices, in the given order.
    pub fn select_kpoints(&self, original_indices: &[usize]) -> Result<Self, KPathError> {
        let lookup: HashMap<usize, usize> = self
            .kpoint_indices
            .iter()
            .enumerate()
            .map(|(row, index)| (*index, row))
            .collect();

        let rows = original_indices
            .iter()
            .map(|index| {
                lookup
                    .get(index)
                    .copied()
                    .ok_or(KPathError::Alignment {
                        original_index: *index,
                        available: self.n_kpoints(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.take_rows(&rows))
    }

    /// Rows whose mask entry is true.
    pub fn select_mask(&self, mask: &[bool]) -> Result<Self, KPathError> {
        if mask.len() != self.n_kpoints() {
            return Err(KPathError::shape("k-point mask", self.n_kpoints(), mask.len()));
        }
        let rows: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(row, keep)| keep.then_some(row))
            .collect();
        Ok(self.take_rows(&rows))
    }

    /// Eigenvalues measured from `efermi`.
    pub fn shifted_by(&self, efermi: f64) -> Self {
        Self {
            layout: self.layout,
            kpoint_indices: self.kpoint_indices.clone(),
            eigenvalues: self
                .eigenvalues
                .iter()
                .map(|block| {
                    Mat::from_fn(block.nrows(), block.ncols(), |k, band| {
                        block[(k, band)] - efermi
                    })
                })
                .collect(),
            projections: self.projections.clone(),
        }
    }

    /// Summed projection weight of `group` for one spin, as a `k x band` block.
    pub fn orbital_weights(
        &self,
        group: &OrbitalGroup,
        spin: usize,
    ) -> Result<Mat<f64>, KPathError> {
        let Some(projections) = &self.projections else {
            return Err(KPathError::InvalidOrbitalSelection {
                group: group.label.clone(),
                reason: "band data carries no projections".to_string(),
            });
        };
        if spin >= self.n_spins() {
            return Err(KPathError::shape("spin channel", self.n_spins(), spin));
        }
        group.validate(
            projections.n_atoms,
            projections.n_orbitals,
            projections.total_orbital,
        )?;

        let mut weights = Mat::zeros(self.n_kpoints(), self.n_bands());
        for &atom in &group.atoms {
            for &orbital in &group.orbitals {
                let channel = projections.channel(spin, atom, orbital);
                for band in 0..weights.ncols() {
                    for k in 0..weights.nrows() {
                        weights[(k, band)] += channel[(k, band)];
                    }
                }
            }
        }
        Ok(weights)
    }

    fn take_rows(&self, rows: &[usize]) -> Self {
        let take = |block: &Mat<f64>| {
            Mat::from_fn(rows.len(), block.ncols(), |row, col| block[(rows[row], col)])
        };
        Self {
            layout: self.layout,
            kpoint_indices: rows.iter().map(|row| self.kpoint_indices[*row]).collect(),
            eigenvalues: self.eigenvalues.iter().map(take).collect(),
            projections: self
                .projections
                .as_ref()
                .map(|projections| projections.map_channels(take)),
        }
    }
}

fn build_projections(
    layout: SpinLayout,
    raw: &[Vec<Vec<Vec<Vec<f64>>>>],
    n_kpoints: usize,
    n_bands: usize,
    total_orbital: Option<usize>,
) -> Result<ProjectionTensor, KPathError> {
    if !layout.accepts_projection_channels(raw.len()) {
        return Err(KPathError::shape(
            "projection spin channels",
            layout.channels(),
            raw.len(),
        ));
    }
    let kept = &raw[..layout.channels()];

    let first_band = kept[0].first().and_then(|kpoint| kpoint.first());
    let n_atoms = first_band.map_or(0, Vec::len);
    let n_orbitals = first_band
        .and_then(|atoms| atoms.first())
        .map_or(0, Vec::len);

    for (spin, channel) in kept.iter().enumerate() {
        if channel.len() != n_kpoints {
            return Err(KPathError::shape(
                format!("projection k-points in spin {spin}"),
                n_kpoints,
                channel.len(),
            ));
        }
        for (kpoint, bands) in channel.iter().enumerate() {
            if bands.len() != n_bands {
                return Err(KPathError::shape(
                    format!("projection bands at k-point {kpoint}"),
                    n_bands,
                    bands.len(),
                ));
            }
            for atoms in bands {
                if atoms.len() != n_atoms {
                    return Err(KPathError::shape(
                        format!("projection atoms at k-point {kpoint}"),
                        n_atoms,
                        atoms.len(),
                    ));
                }
                if let Some(orbitals) = atoms.iter().find(|orbitals| orbitals.len() != n_orbitals) {
                    return Err(KPathError::shape(
                        format!("projection orbitals at k-point {kpoint}"),
                        n_orbitals,
                        orbitals.len(),
                    ));
                }
            }
        }
    }

    if let Some(total) = total_orbital.filter(|total| *total >= n_orbitals) {
        return Err(KPathError::shape("total orbital column", n_orbitals, total));
    }

    let mut channels = Vec::with_capacity(kept.len() * n_atoms * n_orbitals);
    for channel in kept {
        for atom in 0..n_atoms {
            for orbital in 0..n_orbitals {
                channels.push(Mat::from_fn(n_kpoints, n_bands, |k, band| {
                    channel[k][band][atom][orbital]
                }));
            }
        }
    }

    Ok(ProjectionTensor {
        n_atoms,
        n_orbitals,
        total_orbital,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::{BandTensor, NestedEigenvalues, NestedProjections, SpinLayout};
    use crate::kpath::KPathError;
    use crate::tensor::OrbitalGroup;

    /// Energy `10*k + band`, projection `k + 0.1*band + atom + 0.01*orbital`.
    fn synthetic(
        n_k: usize,
        n_band: usize,
        n_atom: usize,
        n_orb: usize,
    ) -> (NestedEigenvalues, NestedProjections) {
        let eigen = vec![
            (0..n_k)
                .map(|k| (0..n_band).map(|b| 10.0 * k as f64 + b as f64).collect())
                .collect(),
        ];
        let proj = vec![
            (0..n_k)
                .map(|k| {
                    (0..n_band)
                        .map(|b| {
                            (0..n_atom)
                                .map(|a| {
                                    (0..n_orb)
                                        .map(|o| {
                                            k as f64 + 0.1 * b as f64 + a as f64 + 0.01 * o as f64
                                        })
                                        .collect()
                                })
                                .collect()
                        })
                        .collect()
                })
                .collect(),
        ];
        (eigen, proj)
    }

    fn tensor() -> BandTensor {
        let (eigen, proj) = synthetic(6, 3, 2, 4);
        BandTensor::from_nested(SpinLayout::Unpolarized, &eigen, Some(&proj), Some(3))
            .expect("tensor should build")
    }

    #[test]
    fn index_selection_matches_mask_selection() {
        let tensor = tensor();
        let by_index = tensor.select_kpoints(&[0, 2, 3, 5]).expect("select");
        let by_mask = tensor
            .select_mask(&[true, false, true, true, false, true])
            .expect("mask");

        assert_eq!(by_index, by_mask);
        assert_eq!(by_index.kpoint_indices(), &[0, 2, 3, 5]);
        assert_eq!(by_index.eigenvalues(0)[(1, 2)], 22.0);
    }

    #[test]
    fn repeated_selection_keeps_original_indices() {
        let first = tensor().select_kpoints(&[1, 3, 4, 5]).expect("select");
        let second = first.select_kpoints(&[4, 5]).expect("select");
        assert_eq!(second.kpoint_indices(), &[4, 5]);
        assert_eq!(second.eigenvalues(0)[(0, 0)], 40.0);

        let error = first.select_kpoints(&[2]).expect_err("filtered row");
        assert_eq!(
            error,
            KPathError::Alignment {
                original_index: 2,
                available: 4
            }
        );
    }

    #[test]
    fn ragged_input_is_a_shape_mismatch() {
        let (mut eigen, _) = synthetic(3, 2, 1, 1);
        eigen[0][1].pop();
        let error = BandTensor::from_nested(SpinLayout::Unpolarized, &eigen, None, None)
            .expect_err("ragged bands");
        assert!(matches!(
            error,
            KPathError::ShapeMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));

        let (eigen, _) = synthetic(3, 2, 1, 1);
        let error = BandTensor::from_nested(SpinLayout::Collinear, &eigen, None, None)
            .expect_err("one channel for collinear data");
        assert!(error.to_string().contains("spin channels"));

        let (_, mut proj) = synthetic(3, 2, 2, 2);
        proj[0][2][1].pop();
        let error = BandTensor::from_nested(SpinLayout::Unpolarized, &eigen, Some(&proj), None)
            .expect_err("ragged atoms");
        assert!(error.to_string().contains("projection atoms at k-point 2"));
    }

    #[test]
    fn spin_orbit_keeps_only_the_total_projection_channel() {
        let (eigen, proj) = synthetic(2, 2, 1, 2);
        let four_channels: NestedProjections = (0..4).map(|_| proj[0].clone()).collect();
        let tensor =
            BandTensor::from_nested(SpinLayout::SpinOrbit, &eigen, Some(&four_channels), None)
                .expect("soc tensor");
        assert_eq!(tensor.n_spins(), 1);
        assert!(tensor.orbital_weights(&OrbitalGroup::new(vec![0], "A", vec![1]), 0).is_ok());
    }

    #[test]
    fn orbital_weights_sum_atoms_and_orbitals() {
        let tensor = tensor();
        let weights = tensor
            .orbital_weights(&OrbitalGroup::new(vec![0, 1], "X", vec![0, 1]), 0)
            .expect("weights");
        // k=2, band=1: atoms 0 and 1, orbitals 0 and 1.
        let expected = (2.1 + 0.0) + (2.1 + 0.01) + (2.1 + 1.0) + (2.1 + 1.01);
        assert!((weights[(2, 1)] - expected).abs() < 1.0e-12);

        let mixed = OrbitalGroup::new(vec![0], "X", vec![0, 3]);
        assert!(tensor.orbital_weights(&mixed, 0).is_err());
    }

    #[test]
    fn fermi_shift_moves_every_energy() {
        let shifted = tensor().shifted_by(1.5);
        assert_eq!(shifted.eigenvalues(0)[(0, 0)], -1.5);
        assert_eq!(shifted.eigenvalues(0)[(5, 2)], 50.5);
    }

    #[test]
    fn spin_layout_follows_ispin_and_soc_flags() {
        assert_eq!(SpinLayout::from_flags(1, false), Some(SpinLayout::Unpolarized));
        assert_eq!(SpinLayout::from_flags(2, false), Some(SpinLayout::Collinear));
        assert_eq!(SpinLayout::from_flags(2, true), Some(SpinLayout::SpinOrbit));
        assert_eq!(SpinLayout::from_flags(3, false), None);
    }
}
