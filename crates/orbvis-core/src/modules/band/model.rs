use super::parser::BandInput;
use crate::config::{BandConfig, Palette};
use crate::domain::{ComputeResult, OrbvisError};
use crate::kpath::{
    HighSymmetryLocator, HighSymmetryPoint, KPointSet, MergedPath, PathMerger, TickMark,
    reconstruct_band_path, tick_marks,
};
use crate::modules::serialization::{format_fixed_f64, write_json_artifact, write_text_artifact};
use crate::tensor::{BandTensor, OrbitalGroup, SpinLayout};
use faer::Mat;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone)]
struct GroupWeights {
    label: String,
    color: String,
    /// One `sample x band` block per spin channel.
    per_spin: Vec<Mat<f64>>,
}

#[derive(Debug, Clone)]
pub(super) struct BandModel {
    config: BandConfig,
    efermi: f64,
    path: MergedPath,
    ticks: Vec<TickMark>,
    groups: Vec<GroupWeights>,
}

impl BandModel {
    pub(super) fn from_input(
        config: BandConfig,
        input: &BandInput,
        labels: Option<&[String]>,
    ) -> ComputeResult<Self> {
        let layout = config.spin_layout()?;
        let efermi = config.efermi.or(input.efermi).unwrap_or(0.0);
        let kpoints = KPointSet::from_rows(&input.kpoints)?;
        let bands = BandTensor::from_nested(
            layout,
            &input.eigenvalues,
            input.projections.as_deref(),
            input.total_orbital,
        )?
        .shifted_by(efermi);

        let locator = match labels.or(config.labels.as_deref()) {
            Some(labels) => HighSymmetryLocator::with_labels(labels),
            None => HighSymmetryLocator::new(),
        };
        let merger = match config.axis_width {
            Some(width) => PathMerger::new().with_axis_width(width),
            None => PathMerger::new(),
        };
        let tolerances = config.tolerances();
        let path = reconstruct_band_path(&kpoints, &bands, &tolerances, &locator, &merger)?;
        let ticks = tick_marks(&path.high_symmetry_points, tolerances.tick_tolerance);

        let palette = config.palette()?;
        let groups = collect_group_weights(&path.bands, &config.orbital_info, &palette)?;
        debug!(
            groups = groups.len(),
            ticks = ticks.len(),
            efermi,
            "built band model"
        );

        Ok(Self {
            config,
            efermi,
            path,
            ticks,
            groups,
        })
    }

    pub(super) fn write_artifact(
        &self,
        artifact_name: &str,
        output_path: &Path,
    ) -> ComputeResult<()> {
        let written = match artifact_name {
            "bandpath.dat" => write_text_artifact(output_path, &self.render_bandpath()),
            "ticks.dat" => write_text_artifact(output_path, &self.render_ticks()),
            "orbitals.dat" => write_text_artifact(output_path, &self.render_orbitals()),
            "bandpath.json" => write_json_artifact(output_path, &self.summary()),
            other => {
                return Err(OrbvisError::internal(
                    "SYS.BAND_OUTPUT_CONTRACT",
                    format!("unsupported BAND output artifact '{}'", other),
                ));
            }
        };
        written.map_err(|source| {
            OrbvisError::io_system(
                "IO.BAND_OUTPUT_WRITE",
                format!(
                    "failed to write BAND artifact '{}': {}",
                    output_path.display(),
                    source
                ),
            )
        })
    }

    fn render_bandpath(&self) -> String {
        let bands = &self.path.bands;
        let mut lines = Vec::with_capacity(self.path.len() + self.path.breaks.len() + 3);

        lines.push("# orbital-projected band path".to_string());
        lines.push(format!(
            "# kpoints={} bands={} spins={} efermi={}",
            self.path.len(),
            bands.n_bands(),
            bands.n_spins(),
            format_fixed_f64(self.efermi, 0, 6),
        ));
        lines.push(format!("# columns: {}", band_columns("x", bands)));

        let x = self.path.with_breaks(self.path.x_values());
        let series: Vec<Vec<f64>> = (0..bands.n_spins())
            .flat_map(|spin| (0..bands.n_bands()).map(move |band| (spin, band)))
            .map(|(spin, band)| self.path.band_series(spin, band))
            .collect();

        for (row, position) in x.iter().enumerate() {
            let mut line = format_fixed_f64(*position, 12, 6);
            for column in &series {
                line.push(' ');
                line.push_str(&format_fixed_f64(column[row], 12, 6));
            }
            lines.push(line);
        }

        lines.join("\n")
    }

    fn render_ticks(&self) -> String {
        let mut lines = vec!["# position label".to_string()];
        lines.extend(
            self.ticks
                .iter()
                .map(|tick| format!("{} {}", format_fixed_f64(tick.position, 12, 6), tick.label)),
        );
        lines.join("\n")
    }

    fn render_orbitals(&self) -> String {
        let bands = &self.path.bands;
        let x = self.path.with_breaks(self.path.x_values());
        let mut lines = Vec::new();

        for (index, group) in self.groups.iter().enumerate() {
            if index > 0 {
                lines.push(String::new());
            }
            lines.push(format!("# group {}: {} {}", index, group.label, group.color));
            lines.push(format!("# columns: {}", band_columns("x", bands)));

            let series: Vec<Vec<f64>> = group
                .per_spin
                .iter()
                .flat_map(|block| {
                    (0..block.ncols()).map(move |band| {
                        (0..block.nrows()).map(move |row| block[(row, band)])
                    })
                })
                .map(|values| self.path.with_breaks(values))
                .collect();

            for (row, position) in x.iter().enumerate() {
                let mut line = format_fixed_f64(*position, 12, 6);
                for column in &series {
                    line.push(' ');
                    line.push_str(&format_fixed_f64(column[row], 10, 6));
                }
                lines.push(line);
            }
        }

        lines.join("\n")
    }

    fn summary(&self) -> BandSummary<'_> {
        let bands = &self.path.bands;
        BandSummary {
            title: &self.config.title,
            layout: bands.layout(),
            efermi: self.efermi,
            kpoints: self.path.len(),
            bands: bands.n_bands(),
            spins: bands.n_spins(),
            total_length: self.path.total_length(),
            original_indices: self.path.original_indices(),
            breaks: &self.path.breaks,
            high_symmetry_points: &self.path.high_symmetry_points,
            ticks: &self.ticks,
            groups: self
                .groups
                .iter()
                .map(|group| GroupSummary {
                    label: &group.label,
                    color: &group.color,
                })
                .collect(),
            plot: PlotSettings {
                ymin: self.config.ymin,
                ymax: self.config.ymax,
                scale: self.config.scale,
                transparency: self.config.transparency,
                plot_option: self.config.plot_option,
                figsize: [self.config.figsizex, self.config.figsizey],
                dpi: self.config.dpi,
                linewidth: self.config.linewidth,
                saveas: &self.config.saveas,
                legend_loc: self.config.legend_loc.as_deref(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct BandSummary<'a> {
    title: &'a str,
    layout: SpinLayout,
    efermi: f64,
    kpoints: usize,
    bands: usize,
    spins: usize,
    total_length: f64,
    original_indices: Vec<usize>,
    breaks: &'a [usize],
    high_symmetry_points: &'a [HighSymmetryPoint],
    ticks: &'a [TickMark],
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
    ymin: f64,
    ymax: f64,
    scale: f64,
    transparency: f64,
    plot_option: u8,
    figsize: [f64; 2],
    dpi: u32,
    linewidth: f64,
    saveas: &'a str,
    legend_loc: Option<&'a str>,
}

fn collect_group_weights(
    bands: &BandTensor,
    groups: &[OrbitalGroup],
    palette: &Palette,
) -> ComputeResult<Vec<GroupWeights>> {
    let total_orbital = bands
        .projections()
        .and_then(|projections| projections.total_orbital());

    groups
        .iter()
        .enumerate()
        .map(|(index, group)| -> ComputeResult<GroupWeights> {
            let per_spin = (0..bands.n_spins())
                .map(|spin| bands.orbital_weights(group, spin))
                .collect::<Result<Vec<_>, _>>()?;
            let color = palette.get(index).ok_or_else(|| {
                OrbvisError::internal(
                    "SYS.PALETTE_SIZE",
                    format!("no colour for orbital group {index}"),
                )
            })?;
            Ok(GroupWeights {
                label: group.display_label(total_orbital),
                color: color.to_string(),
                per_spin,
            })
        })
        .collect()
}

fn band_columns(first: &str, bands: &BandTensor) -> String {
    let mut columns = vec![first.to_string()];
    for spin in 0..bands.n_spins() {
        for band in 0..bands.n_bands() {
            columns.push(format!("s{spin}_b{band:03}"));
        }
    }
    columns.join(" ")
}
