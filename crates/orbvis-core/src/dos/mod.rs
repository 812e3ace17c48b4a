mod aggregate;
mod histogram;

pub use aggregate::{DosAggregator, DosCurves, GroupCurve};
pub use histogram::{EnergyHistogram, histogram_dos};

use crate::kpath::KPathError;
use crate::numerics::SmoothingError;
use faer::Mat;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DosError {
    #[error(transparent)]
    Shape(#[from] KPathError),
    #[error(transparent)]
    Smoothing(#[from] SmoothingError),
    #[error("energy window [{min}, {max}] contains no grid points")]
    EmptyWindow { min: f64, max: f64 },
    #[error("histogram range [{min}, {max}] with {bins} bins is empty")]
    InvalidHistogram { min: f64, max: f64, bins: usize },
}

/// Total and projected DOS on a shared energy grid.
///
/// `projected[spin]` has one row per energy and one column per
/// `atom * n_orbitals + orbital`.
#[derive(Debug, Clone, PartialEq)]
pub struct DosTensor {
    energies: Vec<f64>,
    total: Vec<Vec<f64>>,
    projected: Vec<Mat<f64>>,
    n_atoms: usize,
    n_orbitals: usize,
}

impl DosTensor {
    /// `total` is `[spin][energy]`, `projected` is `[spin][atom][energy][orbital]`.
    pub fn from_nested(
        energies: Vec<f64>,
        total: Vec<Vec<f64>>,
        projected: &[Vec<Vec<Vec<f64>>>],
    ) -> Result<Self, KPathError> {
        let n_energies = energies.len();
        if total.is_empty() || total.len() > 2 {
            return Err(KPathError::shape("total DOS spin channels", 1, total.len()));
        }
        if let Some((spin, curve)) = total
            .iter()
            .enumerate()
            .find(|(_, curve)| curve.len() != n_energies)
        {
            return Err(KPathError::shape(
                format!("total DOS points in spin {spin}"),
                n_energies,
                curve.len(),
            ));
        }
        if !projected.is_empty() && projected.len() != total.len() {
            return Err(KPathError::shape(
                "projected DOS spin channels",
                total.len(),
                projected.len(),
            ));
        }

        let n_atoms = projected.first().map_or(0, Vec::len);
        let n_orbitals = projected
            .first()
            .and_then(|atoms| atoms.first())
            .and_then(|rows| rows.first())
            .map_or(0, Vec::len);

        for (spin, atoms) in projected.iter().enumerate() {
            if atoms.len() != n_atoms {
                return Err(KPathError::shape(
                    format!("projected DOS atoms in spin {spin}"),
                    n_atoms,
                    atoms.len(),
                ));
            }
            for (atom, rows) in atoms.iter().enumerate() {
                if rows.len() != n_energies {
                    return Err(KPathError::shape(
                        format!("projected DOS points for atom {atom}"),
                        n_energies,
                        rows.len(),
                    ));
                }
                if let Some(row) = rows.iter().find(|row| row.len() != n_orbitals) {
                    return Err(KPathError::shape(
                        format!("projected DOS orbitals for atom {atom}"),
                        n_orbitals,
                        row.len(),
                    ));
                }
            }
        }

        let projected = projected
            .iter()
            .map(|atoms| {
                Mat::from_fn(n_energies, n_atoms * n_orbitals, |energy, column| {
                    atoms[column / n_orbitals][energy][column % n_orbitals]
                })
            })
            .collect();

        debug!(
            energies = n_energies,
            spins = total.len(),
            atoms = n_atoms,
            orbitals = n_orbitals,
            "loaded DOS tensor"
        );

        Ok(Self {
            energies,
            total,
            projected,
            n_atoms,
            n_orbitals,
        })
    }

    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    pub fn n_spins(&self) -> usize {
        self.total.len()
    }

    pub fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    pub fn n_orbitals(&self) -> usize {
        self.n_orbitals
    }

    pub fn total(&self, spin: usize) -> &[f64] {
        &self.total[spin]
    }

    pub fn projected(&self, spin: usize) -> Option<&Mat<f64>> {
        self.projected.get(spin)
    }

    /// Keeps the energies inside `[min, max]`; open ends keep everything.
    pub fn windowed(&self, min: Option<f64>, max: Option<f64>) -> Result<Self, DosError> {
        let low = min.unwrap_or(f64::NEG_INFINITY);
        let high = max.unwrap_or(f64::INFINITY);
        let rows: Vec<usize> = self
            .energies
            .iter()
            .enumerate()
            .filter_map(|(row, energy)| (low..=high).contains(energy).then_some(row))
            .collect();
        if rows.is_empty() {
            return Err(DosError::EmptyWindow { min: low, max: high });
        }

        Ok(Self {
            energies: rows.iter().map(|row| self.energies[*row]).collect(),
            total: self
                .total
                .iter()
                .map(|curve| rows.iter().map(|row| curve[*row]).collect())
                .collect(),
            projected: self
                .projected
                .iter()
                .map(|block| {
                    Mat::from_fn(rows.len(), block.ncols(), |row, column| {
                        block[(rows[row], column)]
                    })
                })
                .collect(),
            n_atoms: self.n_atoms,
            n_orbitals: self.n_orbitals,
        })
    }
}
