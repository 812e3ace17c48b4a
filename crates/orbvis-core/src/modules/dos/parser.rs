use crate::config::{DosConfig, load_config};
use crate::domain::{ComputeRequest, ComputeResult, OrbvisError, PlotMode};
use crate::modules::band::parser::{BandInput, parse_band_input};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Tabulated DOS on an energy grid.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct DosInput {
    pub(super) energies: Vec<f64>,
    /// `[spin][energy]`
    pub(super) total: Vec<Vec<f64>>,
    /// `[spin][atom][energy][orbital]`
    #[serde(default)]
    pub(super) projected: Vec<Vec<Vec<Vec<f64>>>>,
    #[serde(default)]
    pub(super) efermi: Option<f64>,
}

/// A DOS run reads either a tabulated DOS or band data to bin.
#[derive(Debug, Clone)]
pub(super) enum DosDocument {
    Tabulated(DosInput),
    Bands(BandInput),
}

pub(super) fn validate_request_shape(request: &ComputeRequest) -> ComputeResult<()> {
    if request.mode != PlotMode::Dos {
        return Err(OrbvisError::input_validation(
            "INPUT.DOS_MODE",
            format!("DOS module expects DOS, got {}", request.mode),
        ));
    }
    if request.labels.is_some() {
        return Err(OrbvisError::input_validation(
            "INPUT.DOS_LABELS",
            "high-symmetry labels only apply to BAND runs",
        ));
    }
    Ok(())
}

/// Objects with `energies` are tabulated DOS, objects with `kpoints` are band data.
pub(super) fn parse_dos_document(source: &str, path: &Path) -> ComputeResult<DosDocument> {
    let parse_error = |message: String| {
        OrbvisError::input_validation(
            "INPUT.DOS_INPUT_PARSE",
            format!("failed to parse DOS data '{}': {}", path.display(), message),
        )
    };

    let document: Value =
        serde_json::from_str(source).map_err(|error| parse_error(error.to_string()))?;
    let Some(object) = document.as_object() else {
        return Err(parse_error("expected a JSON object".to_string()));
    };

    if object.contains_key("energies") {
        let input =
            serde_json::from_value(document).map_err(|error| parse_error(error.to_string()))?;
        Ok(DosDocument::Tabulated(input))
    } else if object.contains_key("kpoints") {
        Ok(DosDocument::Bands(parse_band_input(source, path)?))
    } else {
        Err(parse_error(
            "expected either an 'energies' grid or 'kpoints' band data".to_string(),
        ))
    }
}

pub(super) fn load_dos_config(request: &ComputeRequest) -> ComputeResult<DosConfig> {
    Ok(load_config(&request.config_path)?)
}
