//! Route segmentation
//!
//! The smoothed elevation curve is cut at its prominent maxima and minima, short
//! stretches are folded into their successors until they reach a minimum length,
//! and neighbouring segments of similar slope are merged.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::SegmentError;
use crate::models::{Route, Segment};
use crate::signal::{find_peaks, PeakCriteria};

/// Minimum prominence (m) for a local extremum to become an inflection point
pub const INFLECTION_PROMINENCE: f64 = 2.0;

/// Minimum width (samples) for a local extremum to become an inflection point
pub const INFLECTION_MIN_WIDTH: f64 = 1.0;

const INFLECTION_CRITERIA: PeakCriteria = PeakCriteria {
    min_prominence: INFLECTION_PROMINENCE,
    min_width: INFLECTION_MIN_WIDTH,
};

/// How similar-slope neighbours are merged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// One left-to-right sweep; a segment is never revisited once the sweep moves past it
    #[default]
    SinglePass,
    /// Repeat sweeps until one sweep merges nothing
    FixedPoint,
}

/// Segmentation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Minimum segment length in km
    pub min_length_km: f64,

    /// Neighbours whose slopes differ by less than this (percentage points) are merged
    pub min_slope_diff: f64,

    #[serde(default)]
    pub merge_strategy: MergeStrategy,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            min_length_km: 1.0,
            min_slope_diff: 2.0,
            merge_strategy: MergeStrategy::SinglePass,
        }
    }
}

impl SegmentationConfig {
    pub fn validate(&self) -> Result<(), SegmentError> {
        validate_min_length(self.min_length_km)?;
        validate_min_slope_diff(self.min_slope_diff)
    }
}

/// Output of the segmentation stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    pub inflection_points: Vec<usize>,
    pub raw_segments: Vec<Segment>,
    pub segments: Vec<Segment>,
}

/// Runs the full segmentation stage
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    config: SegmentationConfig,
}

impl Segmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    #[instrument(skip_all, fields(points = route.len()))]
    pub fn segment(&self, route: &Route) -> Result<Segmentation, SegmentError> {
        self.config.validate()?;

        let inflection_points = detect_inflection_points(&route.smoothed_elevations())?;
        let raw_segments = build_raw_segments(route, &inflection_points, self.config.min_length_km)?;
        let segments = match self.config.merge_strategy {
            MergeStrategy::SinglePass => {
                merge_similar_segments(route, &raw_segments, self.config.min_slope_diff)
            }
            MergeStrategy::FixedPoint => {
                merge_to_fixed_point(route, &raw_segments, self.config.min_slope_diff)
            }
        };

        debug!(
            inflection_points = inflection_points.len(),
            raw_segments = raw_segments.len(),
            segments = segments.len(),
            strategy = ?self.config.merge_strategy,
            "Segmentation complete"
        );

        Ok(Segmentation {
            inflection_points,
            raw_segments,
            segments,
        })
    }
}

/// Candidate segment boundaries: prominent maxima and minima plus both route ends
pub fn detect_inflection_points(elevation_curve: &[f64]) -> Result<Vec<usize>, SegmentError> {
    if elevation_curve.len() < 2 {
        return Err(SegmentError::EmptyTrace {
            points: elevation_curve.len(),
        });
    }

    let negated: Vec<f64> = elevation_curve.iter().map(|e| -e).collect();
    let mut points = find_peaks(elevation_curve, INFLECTION_CRITERIA);
    points.extend(find_peaks(&negated, INFLECTION_CRITERIA));
    points.sort_unstable();
    points.dedup();

    let last = elevation_curve.len() - 1;
    if points.first() != Some(&0) {
        points.insert(0, 0);
    }
    if points.last() != Some(&last) {
        points.push(last);
    }

    Ok(points)
}

/// Cut the route at inflection points, keeping only stretches of at least `min_length_km`
///
/// A pair of inflection points closer than the minimum length does not close a
/// segment; the pending start is kept and distance keeps accumulating. A remainder
/// after the last committed segment that never reaches the minimum is folded into
/// that segment, so the result always ends at the last route point. A route
/// shorter than the minimum yields no segments.
pub fn build_raw_segments(
    route: &Route,
    inflection_points: &[usize],
    min_length_km: f64,
) -> Result<Vec<Segment>, SegmentError> {
    validate_min_length(min_length_km)?;
    if route.len() < 2 {
        return Err(SegmentError::EmptyTrace {
            points: route.len(),
        });
    }
    if let Some(&bad) = inflection_points.iter().find(|&&i| i >= route.len()) {
        return Err(SegmentError::invalid(
            "inflection_point",
            bad,
            format!("outside route of {} points", route.len()),
        ));
    }

    let mut segments: Vec<Segment> = Vec::new();
    let Some((&first, rest)) = inflection_points.split_first() else {
        return Ok(segments);
    };

    let mut start_idx = first;
    for &end_idx in rest {
        let distance = route.distance_at(end_idx) - route.distance_at(start_idx);
        if distance >= min_length_km {
            segments.push(Segment::spanning(route, start_idx, end_idx));
            start_idx = end_idx;
        }
    }

    let last = route.len() - 1;
    if let Some(tail) = segments.last_mut() {
        if tail.end_idx < last {
            debug!(
                from = tail.end_idx,
                to = last,
                "Folding short remainder into final segment"
            );
            *tail = Segment::spanning(route, tail.start_idx, last);
        }
    }

    Ok(segments)
}

/// One forward sweep merging neighbours whose slopes differ by less than `min_slope_diff`
///
/// A merged segment is compared again with its new successor, but a segment the
/// sweep has moved past is never revisited. Adjacent slopes in the output can
/// therefore still be closer than the threshold; see [`merge_to_fixed_point`].
/// A merged segment is re-spanned over `route`, so its distance is read from the
/// cumulative distance column rather than summed.
pub fn merge_similar_segments(
    route: &Route,
    segments: &[Segment],
    min_slope_diff: f64,
) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());

    for next in segments {
        match merged.last_mut() {
            Some(current) if (current.average_slope - next.average_slope).abs() < min_slope_diff => {
                *current = Segment::spanning(route, current.start_idx, next.end_idx);
            }
            _ => merged.push(next.clone()),
        }
    }

    merged
}

/// Repeat [`merge_similar_segments`] until no adjacent pair is closer than `min_slope_diff`
pub fn merge_to_fixed_point(
    route: &Route,
    segments: &[Segment],
    min_slope_diff: f64,
) -> Vec<Segment> {
    let mut current = merge_similar_segments(route, segments, min_slope_diff);
    let mut sweeps = 1;
    loop {
        let next = merge_similar_segments(route, &current, min_slope_diff);
        if next.len() == current.len() {
            debug!(sweeps, segments = current.len(), "Merge reached fixed point");
            return current;
        }
        current = next;
        sweeps += 1;
    }
}

fn validate_min_length(min_length_km: f64) -> Result<(), SegmentError> {
    if !min_length_km.is_finite() || min_length_km <= 0.0 {
        return Err(SegmentError::invalid(
            "min_length_km",
            min_length_km,
            "must be a positive number of kilometers",
        ));
    }
    Ok(())
}

fn validate_min_slope_diff(min_slope_diff: f64) -> Result<(), SegmentError> {
    if !min_slope_diff.is_finite() || min_slope_diff < 0.0 {
        return Err(SegmentError::invalid(
            "min_slope_diff",
            min_slope_diff,
            "must be zero or a positive slope difference in percent",
        ));
    }
    Ok(())
}
