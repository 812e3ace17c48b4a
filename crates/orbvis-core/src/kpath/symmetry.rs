use super::segment::axis_offsets;
use super::{KPathError, KPointSet, Segment};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighSymmetryPoint {
    pub position_in_merged_axis: f64,
    pub label: String,
    pub source_kpoint_index: usize,
}

/// An axis tick; boundary points sharing a position are joined as `A|B`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickMark {
    pub position: f64,
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct HighSymmetryLocator {
    labels: Option<Vec<String>>,
}

impl HighSymmetryLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses caller labels in boundary order. `\uXXXX` escapes are decoded.
    pub fn with_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            labels: Some(
                labels
                    .into_iter()
                    .map(|label| decode_unicode_escapes(label.as_ref()))
                    .collect(),
            ),
        }
    }

    /// One point per segment boundary. A segment that joins the previous one
    /// reuses its start point; a segment after a discontinuity adds its own.
    pub fn locate(
        &self,
        set: &KPointSet,
        segments: &[Segment],
    ) -> Result<Vec<HighSymmetryPoint>, KPathError> {
        let offsets = axis_offsets(segments);
        let mut boundaries: Vec<(usize, f64)> = Vec::with_capacity(segments.len() + 1);
        for (segment, offset) in segments.iter().zip(offsets) {
            if !segment.joins_previous || boundaries.is_empty() {
                boundaries.push((segment.start_index, offset));
            }
            boundaries.push((segment.end_index, offset + segment.total_length()));
        }

        let labels = match &self.labels {
            Some(labels) if labels.len() != boundaries.len() => {
                return Err(KPathError::LabelCountMismatch {
                    expected: boundaries.len(),
                    actual: labels.len(),
                });
            }
            Some(labels) => labels.clone(),
            None => (0..boundaries.len()).map(|index| format!("K{index}")).collect(),
        };

        let points: Vec<HighSymmetryPoint> = boundaries
            .into_iter()
            .zip(labels)
            .map(|((position, x), label)| HighSymmetryPoint {
                position_in_merged_axis: x,
                label,
                source_kpoint_index: set.points()[position].original_index(),
            })
            .collect();

        debug!(points = points.len(), "located high-symmetry points");
        Ok(points)
    }
}

pub fn tick_marks(points: &[HighSymmetryPoint], tolerance: f64) -> Vec<TickMark> {
    let mut ticks: Vec<TickMark> = Vec::with_capacity(points.len());
    for point in points {
        match ticks.last_mut() {
            Some(tick) if (point.position_in_merged_axis - tick.position).abs() <= tolerance => {
                tick.label.push('|');
                tick.label.push_str(&point.label);
            }
            _ => ticks.push(TickMark {
                position: point.position_in_merged_axis,
                label: point.label.clone(),
            }),
        }
    }
    ticks
}

/// Replaces `\uXXXX` sequences with the character they name. Malformed
/// sequences are kept verbatim.
pub fn decode_unicode_escapes(raw: &str) -> String {
    let mut decoded = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("\\u") {
        decoded.push_str(&rest[..start]);
        let candidate = &rest[start + 2..];
        let escaped = candidate
            .get(..4)
            .filter(|digits| digits.chars().all(|ch| ch.is_ascii_hexdigit()))
            .and_then(|digits| u32::from_str_radix(digits, 16).ok())
            .and_then(char::from_u32);
        match escaped {
            Some(ch) => {
                decoded.push(ch);
                rest = &candidate[4..];
            }
            None => {
                decoded.push_str("\\u");
                rest = candidate;
            }
        }
    }
    decoded.push_str(rest);
    decoded
}
