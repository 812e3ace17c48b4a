#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KPathError {
    #[error("weight filter (threshold {threshold}) removed all {total} k-points")]
    EmptyPath { total: usize, threshold: f64 },
    #[error(
        "segment starting at path position {position} (k-point {original_index}) has a single point"
    )]
    DegenerateSegment {
        position: usize,
        original_index: usize,
    },
    #[error("expected {expected} high-symmetry labels, got {actual}")]
    LabelCountMismatch { expected: usize, actual: usize },
    #[error("k-point {original_index} is missing from the band data ({available} rows)")]
    Alignment {
        original_index: usize,
        available: usize,
    },
    #[error("{what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },
    #[error("k-point {original_index} is invalid: {reason}")]
    InvalidKPoint {
        original_index: usize,
        reason: &'static str,
    },
    #[error("invalid orbital selection '{group}': {reason}")]
    InvalidOrbitalSelection { group: String, reason: String },
}

impl KPathError {
    pub(crate) fn shape(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }
}
