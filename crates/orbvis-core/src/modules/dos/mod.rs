mod model;
mod parser;

use super::ModuleExecutor;
use super::band::parser::{artifact_list, read_input_source};
use crate::domain::{ComputeArtifact, ComputeRequest, ComputeResult, OrbvisError};
use std::fs;
use tracing::info;

use model::DosModel;
use parser::{load_dos_config, parse_dos_document, validate_request_shape};

pub(crate) const DOS_INPUT_NAME: &str = "DOS data document";
pub(crate) const DOS_OUTPUTS: [&str; 2] = ["dos.dat", "dos.json"];

/// Sums projected DOS per orbital group, from a tabulated DOS or by binning
/// band energies, and writes the plot-ready curves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DosModule;

impl ModuleExecutor for DosModule {
    fn execute(&self, request: &ComputeRequest) -> ComputeResult<Vec<ComputeArtifact>> {
        validate_request_shape(request)?;
        let config = load_dos_config(request)?;
        let source = read_input_source(&request.input_path, DOS_INPUT_NAME)?;
        let document = parse_dos_document(&source, &request.input_path)?;

        let model = DosModel::from_document(config, &document)?;
        let outputs = artifact_list(&DOS_OUTPUTS);

        fs::create_dir_all(&request.output_dir).map_err(|source| {
            OrbvisError::io_system(
                "IO.DOS_OUTPUT_DIRECTORY",
                format!(
                    "failed to create DOS output directory '{}': {}",
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
            "DOS artifacts written"
        );
        Ok(outputs)
    }
}
