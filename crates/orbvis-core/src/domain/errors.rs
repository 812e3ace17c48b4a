use crate::config::ConfigError;
use crate::dos::DosError;
use crate::kpath::KPathError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type OrbvisResult<T> = Result<T, OrbvisError>;
pub type ComputeResult<T> = OrbvisResult<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrbvisErrorCategory {
    InputValidationError,
    IoSystemError,
    ComputationError,
    InternalError,
}

impl OrbvisErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::ComputationError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::ComputationError => "ComputationError",
            Self::InternalError => "InternalError",
        }
    }
}

/// Run-level error carrying a category, a stable dotted code and a message.
///
/// Every failure in a run is fatal; the category decides the process exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrbvisError {
    category: OrbvisErrorCategory,
    code: &'static str,
    message: String,
}

impl OrbvisError {
    pub fn new(
        category: OrbvisErrorCategory,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code,
            message: message.into(),
        }
    }

    pub fn input_validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(OrbvisErrorCategory::InputValidationError, code, message)
    }

    pub fn io_system(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(OrbvisErrorCategory::IoSystemError, code, message)
    }

    pub fn computation(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(OrbvisErrorCategory::ComputationError, code, message)
    }

    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(OrbvisErrorCategory::InternalError, code, message)
    }

    pub const fn category(&self) -> OrbvisErrorCategory {
        self.category
    }

    pub const fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.code, self.message)
    }
}

impl Display for OrbvisError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] {}", self.category.as_str(), self.code, self.message)
    }
}

impl Error for OrbvisError {}

impl From<KPathError> for OrbvisError {
    fn from(error: KPathError) -> Self {
        let code = match &error {
            KPathError::EmptyPath { .. } => "RUN.KPATH_EMPTY",
            KPathError::DegenerateSegment { .. } => "RUN.KPATH_DEGENERATE_SEGMENT",
            KPathError::LabelCountMismatch { .. } => "INPUT.KPATH_LABEL_COUNT",
            KPathError::Alignment { .. } => "SYS.KPATH_ALIGNMENT",
            KPathError::ShapeMismatch { .. } => "INPUT.SHAPE_MISMATCH",
            KPathError::InvalidKPoint { .. } => "INPUT.KPOINT_INVALID",
            KPathError::InvalidOrbitalSelection { .. } => "INPUT.ORBITAL_SELECTION",
        };
        let category = match &error {
            KPathError::LabelCountMismatch { .. }
            | KPathError::ShapeMismatch { .. }
            | KPathError::InvalidKPoint { .. }
            | KPathError::InvalidOrbitalSelection { .. } => {
                OrbvisErrorCategory::InputValidationError
            }
            KPathError::Alignment { .. } => OrbvisErrorCategory::InternalError,
            KPathError::EmptyPath { .. } | KPathError::DegenerateSegment { .. } => {
                OrbvisErrorCategory::ComputationError
            }
        };
        Self::new(category, code, error.to_string())
    }
}

impl From<ConfigError> for OrbvisError {
    fn from(error: ConfigError) -> Self {
        match &error {
            ConfigError::Read { .. } => Self::io_system("IO.CONFIG_READ", error.to_string()),
            _ => Self::input_validation("INPUT.CONFIG", error.to_string()),
        }
    }
}

impl From<DosError> for OrbvisError {
    fn from(error: DosError) -> Self {
        match error {
            DosError::Shape(inner) => inner.into(),
            DosError::Smoothing(_) => {
                Self::input_validation("INPUT.DOS_SMOOTHING", error.to_string())
            }
            DosError::EmptyWindow { .. } => {
                Self::input_validation("INPUT.DOS_WINDOW", error.to_string())
            }
            DosError::InvalidHistogram { .. } => {
                Self::input_validation("INPUT.DOS_HISTOGRAM", error.to_string())
            }
        }
    }
}
