use super::{DosCurves, DosError, GroupCurve};
use crate::kpath::KPathError;
use crate::numerics::linear_grid;
use crate::tensor::{BandTensor, OrbitalGroup};
use faer::Mat;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct EnergyHistogram {
    pub min: f64,
    pub max: f64,
    pub bins: usize,
}

impl EnergyHistogram {
    fn width(&self) -> f64 {
        (self.max - self.min) / self.bins as f64
    }

    fn bin_of(&self, energy: f64) -> Option<usize> {
        if !(self.min..=self.max).contains(&energy) {
            return None;
        }
        let bin = ((energy - self.min) / self.width()) as usize;
        Some(bin.min(self.bins - 1))
    }

    fn centers(&self) -> Result<Vec<f64>, DosError> {
        let edges =
            linear_grid(self.min, self.max, self.bins + 1).ok_or(DosError::InvalidHistogram {
                min: self.min,
                max: self.max,
                bins: self.bins,
            })?;
        Ok(edges.windows(2).map(|edge| 0.5 * (edge[0] + edge[1])).collect())
    }
}

/// DOS from band energies: every (k-point, band) state lands in one energy
/// bin with its k-point weight, times the group's projection weight for the
/// projected curves. Values are states per unit energy.
pub fn histogram_dos(
    bands: &BandTensor,
    kpoint_weights: &[f64],
    groups: &[OrbitalGroup],
    histogram: EnergyHistogram,
) -> Result<DosCurves, DosError> {
    if histogram.bins == 0
        || !histogram.min.is_finite()
        || !histogram.max.is_finite()
        || histogram.max <= histogram.min
    {
        return Err(DosError::InvalidHistogram {
            min: histogram.min,
            max: histogram.max,
            bins: histogram.bins,
        });
    }
    if kpoint_weights.len() != bands.n_kpoints() {
        return Err(
            KPathError::shape("k-point weights", bands.n_kpoints(), kpoint_weights.len()).into(),
        );
    }

    let centers = histogram.centers()?;
    let scale = 1.0 / histogram.width();

    let accumulate = |spin: usize, projection: Option<&Mat<f64>>| -> Vec<f64> {
        let energies = bands.eigenvalues(spin);
        let mut counts = vec![0.0; histogram.bins];
        for (k, weight) in kpoint_weights.iter().enumerate() {
            for band in 0..energies.ncols() {
                let Some(bin) = histogram.bin_of(energies[(k, band)]) else {
                    continue;
                };
                let state_weight = projection.map_or(1.0, |projection| projection[(k, band)]);
                counts[bin] += weight * state_weight * scale;
            }
        }
        counts
    };

    let total = (0..bands.n_spins()).map(|spin| accumulate(spin, None)).collect();
    let groups = groups
        .iter()
        .map(|group| {
            let values = (0..bands.n_spins())
                .map(|spin| {
                    let weights = bands.orbital_weights(group, spin)?;
                    Ok(accumulate(spin, Some(&weights)))
                })
                .collect::<Result<Vec<_>, KPathError>>()?;
            let total_orbital = bands
                .projections()
                .and_then(|projections| projections.total_orbital());
            Ok(GroupCurve {
                label: group.display_label(total_orbital),
                values,
            })
        })
        .collect::<Result<Vec<_>, DosError>>()?;

    debug!(
        bins = histogram.bins,
        kpoints = bands.n_kpoints(),
        groups = groups.len(),
        "binned band energies"
    );

    Ok(DosCurves {
        energies: centers,
        total: Some(total),
        groups,
    })
}
