use super::{KPathError, KPointSet, PathTolerances};
use crate::numerics::{cross3, distance3, dot3, is_integer_multiple, norm3, sub3, unit3};
use serde::Serialize;
use std::ops::RangeInclusive;
use tracing::debug;

/// A straight run of k-points, addressed by position in the filtered set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub start_index: usize,
    pub end_index: usize,
    /// Arc length from `start_index`, one entry per point, starting at 0.
    pub cumulative_lengths: Vec<f64>,
    /// True when this segment starts on the previous segment's last point.
    pub joins_previous: bool,
}

impl Segment {
    pub fn point_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    pub fn positions(&self) -> RangeInclusive<usize> {
        self.start_index..=self.end_index
    }

    pub fn total_length(&self) -> f64 {
        self.cumulative_lengths.last().copied().unwrap_or(0.0)
    }
}

/// Axis offset of every segment: the summed length of all earlier segments.
pub fn axis_offsets(segments: &[Segment]) -> Vec<f64> {
    let mut running = 0.0;
    segments
        .iter()
        .map(|segment| {
            let offset = running;
            running += segment.total_length();
            offset
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PathSegmenter {
    tolerances: PathTolerances,
}

impl PathSegmenter {
    pub fn new(tolerances: PathTolerances) -> Self {
        Self { tolerances }
    }

    /// Splits a filtered, deduplicated set into straight segments.
    ///
    /// A gap that is no small integer multiple of the local step is a
    /// discontinuity: the segment ends before it and the next one starts after
    /// it. A change of direction is a corner: the segment ends on the corner
    /// point and the next one starts on that same point.
    pub fn segment(&self, set: &KPointSet) -> Result<Vec<Segment>, KPathError> {
        let point_count = set.len();
        if point_count == 0 {
            return Err(KPathError::EmptyPath {
                total: 0,
                threshold: self.tolerances.weight_threshold,
            });
        }

        let gaps: Vec<f64> = (1..point_count)
            .map(|position| distance3(set.coordinates(position - 1), set.coordinates(position)))
            .collect();

        let mut bounds: Vec<(usize, usize, bool)> = Vec::new();
        let mut start = 0;
        let mut joins_previous = false;
        let mut step: Option<f64> = None;
        let mut direction: Option<[f64; 3]> = None;

        for (gap_index, &gap) in gaps.iter().enumerate() {
            if gap <= self.tolerances.dedup_tolerance {
                continue;
            }

            let next_gap = gaps.get(gap_index + 1).copied();
            if self.is_discontinuity(gap, step, next_gap) {
                debug!(
                    after = set.points()[gap_index].original_index(),
                    gap,
                    "k-path discontinuity"
                );
                bounds.push((start, gap_index, joins_previous));
                start = gap_index + 1;
                joins_previous = false;
                step = None;
                direction = None;
                continue;
            }

            let heading = unit3(sub3(
                set.coordinates(gap_index + 1),
                set.coordinates(gap_index),
            ));
            if let (Some(current), Some(heading)) = (direction, heading) {
                if !self.is_collinear(current, heading) {
                    bounds.push((start, gap_index, joins_previous));
                    start = gap_index;
                    joins_previous = true;
                    step = Some(gap);
                    direction = Some(heading);
                    continue;
                }
            }

            direction = direction.or(heading);
            step = Some(step.map_or(gap, |smallest| smallest.min(gap)));
        }
        bounds.push((start, point_count - 1, joins_previous));

        let segments = bounds
            .into_iter()
            .map(|(start, end, joins_previous)| {
                build_segment(set, &gaps, start, end, joins_previous)
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            points = point_count,
            segments = segments.len(),
            "segmented k-path"
        );
        Ok(segments)
    }

    /// The opening gap of a segment sets its step and is never a break. Later
    /// gaps break only when neither the step nor the following gap explains
    /// them.
    fn is_discontinuity(&self, gap: f64, step: Option<f64>, next_gap: Option<f64>) -> bool {
        let Some(step) = step else {
            return false;
        };
        let next_gap = next_gap.filter(|next| *next > self.tolerances.dedup_tolerance);

        !std::iter::once(step).chain(next_gap).any(|reference| {
            is_integer_multiple(
                gap,
                reference,
                self.tolerances.max_step_multiple,
                self.tolerances.step_tolerance,
            )
        })
    }

    fn is_collinear(&self, current: [f64; 3], heading: [f64; 3]) -> bool {
        dot3(current, heading) > 0.0
            && norm3(cross3(current, heading)) <= self.tolerances.collinearity_tolerance
    }
}

fn build_segment(
    set: &KPointSet,
    gaps: &[f64],
    start: usize,
    end: usize,
    joins_previous: bool,
) -> Result<Segment, KPathError> {
    if start == end {
        return Err(KPathError::DegenerateSegment {
            position: start,
            original_index: set.points()[start].original_index(),
        });
    }

    let mut cumulative_lengths = Vec::with_capacity(end - start + 1);
    let mut running = 0.0;
    cumulative_lengths.push(running);
    for gap in &gaps[start..end] {
        running += gap;
        cumulative_lengths.push(running);
    }

    Ok(Segment {
        start_index: start,
        end_index: end,
        cumulative_lengths,
        joins_previous,
    })
}
