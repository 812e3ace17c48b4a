//! K-path reconstruction: filter raw k-points, cut the path into straight
//! segments, label their boundaries and lay everything out on one axis with
//! the band rows realigned to the surviving k-points.

mod error;
mod kpoint;
mod merge;
mod options;
mod segment;
mod symmetry;

pub use error::KPathError;
pub use kpoint::{KPoint, KPointSet};
pub use merge::{MergedPath, PathMerger, PathSample};
pub use options::{
    DEFAULT_COLLINEARITY_TOLERANCE, DEFAULT_DEDUP_TOLERANCE, DEFAULT_MAX_STEP_MULTIPLE,
    DEFAULT_STEP_TOLERANCE, DEFAULT_TICK_TOLERANCE, DEFAULT_WEIGHT_THRESHOLD, PathTolerances,
};
pub use segment::{PathSegmenter, Segment, axis_offsets};
pub use symmetry::{
    HighSymmetryLocator, HighSymmetryPoint, TickMark, decode_unicode_escapes, tick_marks,
};

use crate::tensor::BandTensor;
use tracing::info;

/// Runs the whole reconstruction on raw, file-ordered input.
///
/// `bands` must hold one row per raw k-point. It is narrowed with the same
/// surviving-index list the k-point filters export before merging.
pub fn reconstruct_band_path(
    raw: &KPointSet,
    bands: &BandTensor,
    tolerances: &PathTolerances,
    locator: &HighSymmetryLocator,
    merger: &PathMerger,
) -> Result<MergedPath, KPathError> {
    bands.ensure_kpoint_count(raw.len())?;

    let cleaned = raw
        .isolate_band_path(tolerances.weight_threshold, tolerances.weight_threshold)?
        .deduplicate_consecutive(tolerances.dedup_tolerance);
    let aligned = bands.select_kpoints(&cleaned.surviving_indices())?;

    let segments = PathSegmenter::new(*tolerances).segment(&cleaned)?;
    let points = locator.locate(&cleaned, &segments)?;
    let merged = merger.merge(&cleaned, &segments, points, &aligned)?;

    info!(
        raw = raw.len(),
        kept = merged.len(),
        segments = segments.len(),
        "reconstructed band path"
    );
    Ok(merged)
}
