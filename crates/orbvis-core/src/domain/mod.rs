pub mod errors;

pub use errors::{ComputeResult, OrbvisError, OrbvisErrorCategory, OrbvisResult};

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlotMode {
    Band,
    Dos,
}

impl PlotMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Band => "BAND",
            Self::Dos => "DOS",
        }
    }
}

impl Display for PlotMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// One invocation: a configuration file, a numeric input document and the
/// directory the artifacts go to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeRequest {
    pub mode: PlotMode,
    pub config_path: PathBuf,
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    /// High-symmetry labels that override `LABELS` from the config.
    pub labels: Option<Vec<String>>,
}

impl ComputeRequest {
    pub fn new(
        mode: PlotMode,
        config_path: impl Into<PathBuf>,
        input_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            mode,
            config_path: config_path.into(),
            input_path: input_path.into(),
            output_dir: output_dir.into(),
            labels: None,
        }
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = Some(labels);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeArtifact {
    pub relative_path: PathBuf,
}

impl ComputeArtifact {
    pub fn new(relative_path: impl Into<PathBuf>) -> Self {
        Self {
            relative_path: relative_path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ComputeRequest, PlotMode};

    #[test]
    fn plot_modes_print_upper_case() {
        assert_eq!(PlotMode::Band.to_string(), "BAND");
        assert_eq!(PlotMode::Dos.as_str(), "DOS");
    }

    #[test]
    fn request_labels_are_optional() {
        let request = ComputeRequest::new(PlotMode::Band, "band.in", "band.json", "out");
        assert!(request.labels.is_none());

        let labelled = request.with_labels(vec!["G".to_string(), "X".to_string()]);
        assert_eq!(labelled.labels.as_deref().map(<[String]>::len), Some(2));
    }
}
