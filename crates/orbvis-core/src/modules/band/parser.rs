use super::BAND_INPUT_NAME;
use crate::config::{BandConfig, load_config};
use crate::domain::{ComputeArtifact, ComputeRequest, ComputeResult, OrbvisError, PlotMode};
use crate::tensor::{NestedEigenvalues, NestedProjections};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Numeric band data in file order: one `[kx, ky, kz, weight]` row per raw
/// k-point and the matching eigenvalue (and projection) rows.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct BandInput {
    pub(crate) kpoints: Vec<[f64; 4]>,
    pub(crate) eigenvalues: NestedEigenvalues,
    #[serde(default)]
    pub(crate) projections: Option<NestedProjections>,
    #[serde(default)]
    pub(crate) total_orbital: Option<usize>,
    #[serde(default)]
    pub(crate) efermi: Option<f64>,
}

impl BandInput {
    pub(crate) fn kpoint_weights(&self) -> Vec<f64> {
        self.kpoints.iter().map(|row| row[3]).collect()
    }
}

pub(super) fn validate_request_shape(request: &ComputeRequest) -> ComputeResult<()> {
    if request.mode != PlotMode::Band {
        return Err(OrbvisError::input_validation(
            "INPUT.BAND_MODE",
            format!("BAND module expects BAND, got {}", request.mode),
        ));
    }

    let is_json = request
        .input_path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
    if !is_json {
        return Err(OrbvisError::input_validation(
            "INPUT.BAND_INPUT_ARTIFACT",
            format!(
                "BAND module expects a JSON {} at '{}'",
                BAND_INPUT_NAME,
                request.input_path.display()
            ),
        ));
    }

    Ok(())
}

pub(crate) fn read_input_source(path: &Path, artifact_name: &str) -> ComputeResult<String> {
    fs::read_to_string(path).map_err(|source| {
        OrbvisError::io_system(
            "IO.INPUT_READ",
            format!(
                "failed to read input '{}' ({}): {}",
                path.display(),
                artifact_name,
                source
            ),
        )
    })
}

pub(crate) fn parse_band_input(source: &str, path: &Path) -> ComputeResult<BandInput> {
    serde_json::from_str(source).map_err(|error| {
        OrbvisError::input_validation(
            "INPUT.BAND_INPUT_PARSE",
            format!("failed to parse band data '{}': {}", path.display(), error),
        )
    })
}

pub(super) fn load_band_config(request: &ComputeRequest) -> ComputeResult<BandConfig> {
    Ok(load_config(&request.config_path)?)
}

pub(crate) fn artifact_list(paths: &[&str]) -> Vec<ComputeArtifact> {
    paths.iter().copied().map(ComputeArtifact::new).collect()
}

#[cfg(test)]
mod tests {
    use super::{parse_band_input, validate_request_shape};
    use crate::domain::{ComputeRequest, OrbvisErrorCategory, PlotMode};
    use std::path::Path;

    #[test]
    fn request_must_target_band_json() {
        let request = ComputeRequest::new(PlotMode::Dos, "band.in", "band.json", "out");
        let error = validate_request_shape(&request).expect_err("wrong mode");
        assert_eq!(error.code(), "INPUT.BAND_MODE");

        let request = ComputeRequest::new(PlotMode::Band, "band.in", "PROCAR", "out");
        let error = validate_request_shape(&request).expect_err("not json");
        assert_eq!(error.code(), "INPUT.BAND_INPUT_ARTIFACT");

        let request = ComputeRequest::new(PlotMode::Band, "band.in", "data/Band.JSON", "out");
        validate_request_shape(&request).expect("json input should be accepted");
    }

    #[test]
    fn band_input_parses_optional_fields() {
        let input = parse_band_input(
            r#"{
                "kpoints": [[0.0, 0.0, 0.0, 0.0], [0.5, 0.0, 0.0, 0.0]],
                "eigenvalues": [[[-1.0, 2.0], [-0.5, 2.5]]]
            }"#,
            Path::new("band.json"),
        )
        .expect("input should parse");

        assert_eq!(input.kpoints.len(), 2);
        assert!(input.projections.is_none());
        assert_eq!(input.kpoint_weights(), vec![0.0, 0.0]);
    }

    #[test]
    fn malformed_band_input_is_an_input_error() {
        let error = parse_band_input(r#"{"kpoints": [[0.0, 0.0]]}"#, Path::new("band.json"))
            .expect_err("short k-point row");
        assert_eq!(error.category(), OrbvisErrorCategory::InputValidationError);
        assert_eq!(error.code(), "INPUT.BAND_INPUT_PARSE");
    }
}
