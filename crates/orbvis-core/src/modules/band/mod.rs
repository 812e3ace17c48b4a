mod model;
pub(crate) mod parser;

use super::ModuleExecutor;
use crate::domain::{ComputeArtifact, ComputeRequest, ComputeResult, OrbvisError};
use std::fs;
use tracing::info;

use model::BandModel;
use parser::{
    artifact_list, load_band_config, parse_band_input, read_input_source, validate_request_shape,
};

pub(crate) const BAND_INPUT_NAME: &str = "band data document";
pub(crate) const BAND_OUTPUTS: [&str; 4] = [
    "bandpath.dat",
    "ticks.dat",
    "orbitals.dat",
    "bandpath.json",
];

/// Reconstructs the band path from a JSON band document and writes the
/// plot-ready artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BandModule;

impl ModuleExecutor for BandModule {
    fn execute(&self, request: &ComputeRequest) -> ComputeResult<Vec<ComputeArtifact>> {
        validate_request_shape(request)?;
        let config = load_band_config(request)?;
        let source = read_input_source(&request.input_path, BAND_INPUT_NAME)?;
        let input = parse_band_input(&source, &request.input_path)?;

        let model = BandModel::from_input(config, &input, request.labels.as_deref())?;
        let outputs = artifact_list(&BAND_OUTPUTS);

        fs::create_dir_all(&request.output_dir).map_err(|source| {
            OrbvisError::io_system(
                "IO.BAND_OUTPUT_DIRECTORY",
                format!(
                    "failed to create BAND output directory '{}': {}",
                    request.output_dir.display(),
                    source
                ),
            )
        })?;

        for artifact in &outputs {
            let output_path = request.output_dir.join(&artifact.relative_path);
            let artifact_name = artifact.relative_path.to_string_lossy().replace('\\', "/");
            model.write_artifact(&artifact_name, &output_path)?;
        }

        info!(
            output_dir = %request.output_dir.display(),
            artifacts = outputs.len(),
            "BAND artifacts written"
        );
        Ok(outputs)
    }
}
