use super::parser::{DosDocument, DosInput};
use crate::config::DosConfig;
use crate::domain::{ComputeResult, OrbvisError};
use crate::dos::{DosAggregator, DosCurves, DosTensor, EnergyHistogram, histogram_dos};
use crate::kpath::KPointSet;
use crate::modules::band::parser::BandInput;
use crate::modules::serialization::{format_fixed_f64, write_json_artifact, write_text_artifact};
use crate::numerics::stable_sum;
use crate::tensor::{BandTensor, SpinLayout};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

/// Padding around the eigenvalue range when the histogram has no XMIN/XMAX.
const HISTOGRAM_MARGIN: f64 = 0.5;

#[derive(Debug, Clone)]
pub(super) struct DosModel {
    config: DosConfig,
    efermi: f64,
    curves: DosCurves,
    colors: Vec<String>,
}

impl DosModel {
    pub(super) fn from_document(config: DosConfig, document: &DosDocument) -> ComputeResult<Self> {
        let (efermi, curves) = match document {
            DosDocument::Tabulated(input) => tabulated_curves(&config, input)?,
            DosDocument::Bands(input) => binned_curves(&config, input)?,
        };
        let colors = config.palette()?.colors().to_vec();

        debug!(
            energies = curves.energies.len(),
            groups = curves.groups.len(),
            efermi,
            "built DOS model"
        );
        Ok(Self {
            config,
            efermi,
            curves,
            colors,
        })
    }

    pub(super) fn write_artifact(
        &self,
        artifact_name: &str,
        output_path: &Path,
    ) -> ComputeResult<()> {
        let written = match artifact_name {
            "dos.dat" => write_text_artifact(output_path, &self.render_dos()),
            "dos.json" => write_json_artifact(output_path, &self.summary()),
            other => {
                return Err(OrbvisError::internal(
                    "SYS.DOS_OUTPUT_CONTRACT",
                    format!("unsupported DOS output artifact '{}'", other),
                ));
            }
        };
        written.map_err(|source| {
            OrbvisError::io_system(
                "IO.DOS_OUTPUT_WRITE",
                format!(
                    "failed to write DOS artifact '{}': {}",
                    output_path.display(),
                    source
                ),
            )
        })
    }

    fn render_dos(&self) -> String {
        let mut columns = vec!["energy".to_string()];
        let mut series: Vec<&[f64]> = Vec::new();
        if let Some(total) = &self.curves.total {
            for (spin, curve) in total.iter().enumerate() {
                columns.push(format!("tdos_s{spin}"));
                series.push(curve);
            }
        }
        for (index, group) in self.curves.groups.iter().enumerate() {
            for (spin, curve) in group.values.iter().enumerate() {
                columns.push(format!("g{index}_s{spin}"));
                series.push(curve);
            }
        }

        let mut lines =
            Vec::with_capacity(self.curves.energies.len() + 3 + self.curves.groups.len());
        lines.push("# orbital-projected density of states".to_string());
        lines.push(format!(
            "# efermi={} sigma={} normalized={}",
            format_fixed_f64(self.efermi, 0, 6),
            format_fixed_f64(self.config.sigma, 0, 3),
            self.config.normalize,
        ));
        for (index, group) in self.curves.groups.iter().enumerate() {
            lines.push(format!("# g{}: {} {}", index, group.label, self.colors[index]));
        }
        lines.push(format!("# columns: {}", columns.join(" ")));

        for (row, energy) in self.curves.energies.iter().enumerate() {
            let mut line = format_fixed_f64(*energy, 12, 6);
            for curve in &series {
                line.push(' ');
                line.push_str(&format_fixed_f64(curve[row], 14, 6));
            }
            lines.push(line);
        }

        lines.join("\n")
    }

    fn summary(&self) -> DosSummary<'_> {
        DosSummary {
            title: &self.config.title,
            efermi: self.efermi,
            energies: self.curves.energies.len(),
            spins: self.curves.total.as_ref().map_or_else(
                || {
                    self.curves
                        .groups
                        .first()
                        .map_or(0, |group| group.values.len())
                },
                Vec::len,
            ),
            groups: self
                .curves
                .groups
                .iter()
                .zip(&self.colors)
                .map(|(group, color)| GroupSummary {
                    label: &group.label,
                    color,
                })
                .collect(),
            plot: PlotSettings {
                show_tdos: self.config.show_tdos,
                normalize: self.config.normalize,
                sigma: self.config.sigma,
                xmin: self.config.xmin,
                xmax: self.config.xmax,
                ymin: self.config.ymin,
                ymax: self.config.ymax,
                transparency: self.config.transparency,
                figsize: [self.config.figsizex, self.config.figsizey],
                dpi: self.config.dpi,
                tdos_linewidth: self.config.tdos_linewidth,
                pdos_linewidth: self.config.pdos_linewidth,
                saveas: &self.config.saveas,
                legend_loc: self.config.legend_loc.as_deref(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct DosSummary<'a> {
    title: &'a str,
    efermi: f64,
    energies: usize,
    spins: usize,
    groups: Vec<GroupSummary<'a>>,
    plot: PlotSettings<'a>,
}

#[derive(Debug, Serialize)]
struct GroupSummary<'a> {
    label: &'a str,
    color: &'a str,
}

#[derive(Debug, Serialize)]
struct PlotSettings<'a> {
    show_tdos: bool,
    normalize: bool,
    sigma: f64,
    xmin: Option<f64>,
    xmax: Option<f64>,
    ymin: f64,
    ymax: f64,
    transparency: f64,
    figsize: [f64; 2],
    dpi: u32,
    tdos_linewidth: f64,
    pdos_linewidth: f64,
    saveas: &'a str,
    legend_loc: Option<&'a str>,
}

fn aggregator(config: &DosConfig, efermi: f64) -> DosAggregator {
    DosAggregator {
        efermi,
        sigma: config.sigma,
        normalize: config.normalize,
        include_total: config.show_tdos,
        mirror_spin_down: true,
    }
}

fn ensure_spin_count(config: &DosConfig, found: usize) -> ComputeResult<()> {
    if found != usize::from(config.ispin) {
        return Err(OrbvisError::input_validation(
            "INPUT.DOS_SPIN",
            format!("ISPIN = {} but the data has {} spin channel(s)", config.ispin, found),
        ));
    }
    Ok(())
}

fn tabulated_curves(config: &DosConfig, input: &DosInput) -> ComputeResult<(f64, DosCurves)> {
    let efermi = config.efermi.or(input.efermi).unwrap_or(0.0);
    let dos = DosTensor::from_nested(
        input.energies.clone(),
        input.total.clone(),
        &input.projected,
    )?;
    ensure_spin_count(config, dos.n_spins())?;

    // XMIN/XMAX are relative to the Fermi level
    let windowed = dos.windowed(
        config.xmin.map(|min| min + efermi),
        config.xmax.map(|max| max + efermi),
    )?;
    let curves = aggregator(config, efermi).aggregate(&windowed, &config.orbital_info)?;
    Ok((efermi, curves))
}

fn binned_curves(config: &DosConfig, input: &BandInput) -> ComputeResult<(f64, DosCurves)> {
    let efermi = config.efermi.or(input.efermi).unwrap_or(0.0);
    let layout = SpinLayout::from_flags(config.ispin, false).ok_or_else(|| {
        OrbvisError::input_validation(
            "INPUT.DOS_SPIN",
            format!("ISPIN must be 1 or 2, got {}", config.ispin),
        )
    })?;
    ensure_spin_count(config, input.eigenvalues.len())?;

    // validates the rows before their weights are used
    KPointSet::from_rows(&input.kpoints)?;
    let bands = BandTensor::from_nested(
        layout,
        &input.eigenvalues,
        input.projections.as_deref(),
        input.total_orbital,
    )?
    .shifted_by(efermi);

    let weights = normalized_weights(&input.kpoint_weights());
    let histogram = histogram_range(config, &bands);
    let curves = histogram_dos(&bands, &weights, &config.orbital_info, histogram)?;
    let curves = aggregator(config, 0.0).refine(curves)?;
    Ok((efermi, curves))
}

/// K-point weights scaled to sum to one. All-zero weights, as in a pure
/// band-path run, fall back to equal weights.
fn normalized_weights(weights: &[f64]) -> Vec<f64> {
    let sum = stable_sum(weights);
    if sum > 0.0 {
        return weights.iter().map(|weight| weight / sum).collect();
    }
    warn!(kpoints = weights.len(), "k-point weights sum to zero, using equal weights");
    let equal = 1.0 / weights.len().max(1) as f64;
    vec![equal; weights.len()]
}

fn histogram_range(config: &DosConfig, bands: &BandTensor) -> EnergyHistogram {
    let (low, high) = (0..bands.n_spins())
        .flat_map(|spin| {
            let block = bands.eigenvalues(spin);
            (0..block.nrows())
                .flat_map(move |k| (0..block.ncols()).map(move |band| block[(k, band)]))
        })
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), energy| {
            (low.min(energy), high.max(energy))
        });

    EnergyHistogram {
        min: config.xmin.unwrap_or(low - HISTOGRAM_MARGIN),
        max: config.xmax.unwrap_or(high + HISTOGRAM_MARGIN),
        bins: config.bins,
    }
}

#[cfg(test)]
mod tests {
    use super::normalized_weights;

    #[test]
    fn weights_are_normalized_or_made_equal() {
        assert_eq!(normalized_weights(&[1.0, 3.0]), vec![0.25, 0.75]);
        assert_eq!(normalized_weights(&[0.0, 0.0, 0.0, 0.0]), vec![0.25; 4]);
        assert!(normalized_weights(&[]).is_empty());
    }
}
