use super::{DosError, DosTensor};
use crate::numerics::gaussian_filter1d;
use crate::tensor::OrbitalGroup;
use serde::Serialize;
use tracing::debug;

pub const DEFAULT_SIGMA: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCurve {
    pub label: String,
    /// One curve per spin channel.
    pub values: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DosCurves {
    pub energies: Vec<f64>,
    pub total: Option<Vec<Vec<f64>>>,
    pub groups: Vec<GroupCurve>,
}

/// Reduces a DOS tensor to one curve per orbital group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DosAggregator {
    pub efermi: f64,
    /// Gaussian width in grid points; zero disables smoothing.
    pub sigma: f64,
    pub normalize: bool,
    pub include_total: bool,
    /// Negate spin-down curves so both channels share one plot.
    pub mirror_spin_down: bool,
}

impl Default for DosAggregator {
    fn default() -> Self {
        Self {
            efermi: 0.0,
            sigma: DEFAULT_SIGMA,
            normalize: false,
            include_total: true,
            mirror_spin_down: true,
        }
    }
}

impl DosAggregator {
    pub fn aggregate(
        &self,
        dos: &DosTensor,
        groups: &[OrbitalGroup],
    ) -> Result<DosCurves, DosError> {
        let energies = dos.energies().iter().map(|energy| energy - self.efermi).collect();

        let total = if self.include_total {
            Some(
                (0..dos.n_spins())
                    .map(|spin| self.finish(dos.total(spin).to_vec(), spin))
                    .collect::<Result<Vec<_>, _>>()?,
            )
        } else {
            None
        };

        let groups = groups
            .iter()
            .map(|group| {
                group.validate(dos.n_atoms(), dos.n_orbitals(), None)?;
                let values = (0..dos.n_spins())
                    .map(|spin| self.finish(group_sum(dos, group, spin), spin))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(GroupCurve {
                    label: group.display_label(None),
                    values,
                })
            })
            .collect::<Result<Vec<_>, DosError>>()?;

        debug!(
            groups = groups.len(),
            spins = dos.n_spins(),
            sigma = self.sigma,
            "aggregated DOS curves"
        );

        Ok(DosCurves {
            energies,
            total,
            groups,
        })
    }

    /// Smooths, normalizes and mirrors curves built elsewhere, such as a
    /// histogram DOS. The energy axis is left untouched.
    pub fn refine(&self, curves: DosCurves) -> Result<DosCurves, DosError> {
        let total = match curves.total {
            Some(total) if self.include_total => Some(
                total
                    .into_iter()
                    .enumerate()
                    .map(|(spin, curve)| self.finish(curve, spin))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            _ => None,
        };
        let groups = curves
            .groups
            .into_iter()
            .map(|group| {
                let values = group
                    .values
                    .into_iter()
                    .enumerate()
                    .map(|(spin, curve)| self.finish(curve, spin))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(GroupCurve {
                    label: group.label,
                    values,
                })
            })
            .collect::<Result<Vec<_>, DosError>>()?;

        Ok(DosCurves {
            energies: curves.energies,
            total,
            groups,
        })
    }

    fn finish(&self, curve: Vec<f64>, spin: usize) -> Result<Vec<f64>, DosError> {
        let mut curve = gaussian_filter1d(&curve, self.sigma)?;
        if self.normalize {
            let peak = curve.iter().fold(0.0_f64, |peak, value| peak.max(value.abs()));
            if peak > 0.0 {
                curve.iter_mut().for_each(|value| *value /= peak);
            }
        }
        if spin == 1 && self.mirror_spin_down {
            curve.iter_mut().for_each(|value| *value = -*value);
        }
        Ok(curve)
    }
}

fn group_sum(dos: &DosTensor, group: &OrbitalGroup, spin: usize) -> Vec<f64> {
    let n_energies = dos.energies().len();
    let Some(block) = dos.projected(spin) else {
        return vec![0.0; n_energies];
    };
    let mut sum = vec![0.0; n_energies];
    for &atom in &group.atoms {
        for &orbital in &group.orbitals {
            let column = atom * dos.n_orbitals() + orbital;
            for (row, value) in sum.iter_mut().enumerate() {
                *value += block[(row, column)];
            }
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::{DosAggregator, DosCurves, GroupCurve};
    use crate::dos::tests::sample_tensor;
    use crate::dos::{DosError, DosTensor};
    use crate::kpath::KPathError;
    use crate::tensor::OrbitalGroup;

    fn unsmoothed() -> DosAggregator {
        DosAggregator {
            sigma: 0.0,
            ..DosAggregator::default()
        }
    }

    #[test]
    fn groups_sum_selected_atoms_and_orbitals() {
        let curves = unsmoothed()
            .aggregate(&sample_tensor(), &[OrbitalGroup::new(vec![0, 1], "X", vec![1, 2])])
            .expect("aggregate");

        // energy index 2: (10+2) + (20+2) + (110+2) + (120+2)
        assert_eq!(curves.groups[0].values[0][2], 268.0);
        assert_eq!(curves.groups[0].label, "X py+pz");
        assert_eq!(curves.total.as_ref().expect("total")[0], vec![1.0; 5]);
    }

    #[test]
    fn fermi_shift_and_normalization() {
        let aggregator = DosAggregator {
            efermi: 0.5,
            normalize: true,
            include_total: false,
            ..unsmoothed()
        };
        let curves = aggregator
            .aggregate(&sample_tensor(), &[OrbitalGroup::new(vec![0], "A", vec![0])])
            .expect("aggregate");

        assert_eq!(curves.energies[0], -2.5);
        assert!(curves.total.is_none());
        let values = &curves.groups[0].values[0];
        assert_eq!(values[4], 1.0);
        assert_eq!(values[2], 0.5);
    }

    #[test]
    fn spin_down_is_mirrored_after_smoothing() {
        let energies: Vec<f64> = (0..9).map(f64::from).collect();
        let dos = DosTensor::from_nested(energies, vec![vec![2.0; 9], vec![2.0; 9]], &[])
            .expect("dos tensor");
        let curves = DosAggregator::default().aggregate(&dos, &[]).expect("aggregate");

        let total = curves.total.expect("total");
        assert!(total[0].iter().all(|value| (value - 2.0).abs() < 1.0e-12));
        assert!(total[1].iter().all(|value| (value + 2.0).abs() < 1.0e-12));
    }

    #[test]
    fn refine_keeps_the_energy_axis() {
        let curves = DosCurves {
            energies: vec![-1.0, 0.0, 1.0],
            total: Some(vec![vec![0.0, 4.0, 2.0], vec![1.0, 1.0, 1.0]]),
            groups: vec![GroupCurve {
                label: "Fe d".to_string(),
                values: vec![vec![0.0, 2.0, 1.0], vec![0.0, 0.0, 0.0]],
            }],
        };
        let aggregator = DosAggregator {
            efermi: 3.0,
            normalize: true,
            ..unsmoothed()
        };
        let refined = aggregator.refine(curves).expect("refine");

        assert_eq!(refined.energies, vec![-1.0, 0.0, 1.0]);
        let total = refined.total.expect("total");
        assert_eq!(total[0], vec![0.0, 1.0, 0.5]);
        assert_eq!(total[1], vec![-1.0, -1.0, -1.0]);
        assert_eq!(refined.groups[0].values[0], vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn out_of_range_atom_is_rejected() {
        let error = unsmoothed()
            .aggregate(&sample_tensor(), &[OrbitalGroup::new(vec![5], "Fe", vec![0])])
            .expect_err("atom 5 does not exist");
        assert!(matches!(
            error,
            DosError::Shape(KPathError::InvalidOrbitalSelection { .. })
        ));
    }
}
