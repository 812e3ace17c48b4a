use serde::{Deserialize, Serialize};

pub const DEFAULT_WEIGHT_THRESHOLD: f64 = 1.0e-3;
pub const DEFAULT_DEDUP_TOLERANCE: f64 = 1.0e-8;
pub const DEFAULT_STEP_TOLERANCE: f64 = 1.0e-2;
pub const DEFAULT_MAX_STEP_MULTIPLE: u32 = 3;
pub const DEFAULT_COLLINEARITY_TOLERANCE: f64 = 1.0e-3;
pub const DEFAULT_TICK_TOLERANCE: f64 = 1.0e-5;

/// Tolerances for every float comparison made while rebuilding a k-path.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PathTolerances {
    /// K-points with `weight <= weight_threshold` belong to the band path.
    pub weight_threshold: f64,
    /// Per-component distance under which consecutive points are duplicates.
    pub dedup_tolerance: f64,
    /// Relative tolerance on the ratio of a gap to the local step.
    pub step_tolerance: f64,
    /// Largest gap, in local steps, still treated as continuous.
    pub max_step_multiple: u32,
    /// Largest `|u1 x u2|` between unit directions still treated as collinear.
    pub collinearity_tolerance: f64,
    /// Axis distance under which two ticks share a position.
    pub tick_tolerance: f64,
}

impl Default for PathTolerances {
    fn default() -> Self {
        Self {
            weight_threshold: DEFAULT_WEIGHT_THRESHOLD,
            dedup_tolerance: DEFAULT_DEDUP_TOLERANCE,
            step_tolerance: DEFAULT_STEP_TOLERANCE,
            max_step_multiple: DEFAULT_MAX_STEP_MULTIPLE,
            collinearity_tolerance: DEFAULT_COLLINEARITY_TOLERANCE,
            tick_tolerance: DEFAULT_TICK_TOLERANCE,
        }
    }
}
