//! Drafting regime assignment
//!
//! Riders sit in the bunch early in a stage, move up towards the front later and
//! ride without shelter at the end. Two thresholds over the segment count mark the
//! switches: before `semi_draft_point` a segment is ridden in full draft, from there
//! to `full_draft_point` in semi draft, and without draft afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::SegmentError;
use crate::models::DraftingRegime;

/// Position of a drafting switch, as a share of the segments or as a segment index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DraftThreshold {
    /// Absolute 0-based segment index
    AbsoluteIndex(usize),
    /// Fraction of the segment count in `[0, 1]`
    Fraction(f64),
}

impl DraftThreshold {
    /// Concrete segment index for a route of `segment_count` segments
    pub fn resolve(&self, segment_count: usize) -> Result<usize, SegmentError> {
        match *self {
            DraftThreshold::Fraction(f) => {
                if !f.is_finite() || !(0.0..=1.0).contains(&f) {
                    return Err(SegmentError::invalid(
                        "draft_point",
                        f,
                        "fraction must lie within [0, 1]",
                    ));
                }
                Ok((segment_count as f64 * f).floor() as usize)
            }
            DraftThreshold::AbsoluteIndex(index) => Ok(index.min(segment_count)),
        }
    }

    pub fn validate(&self) -> Result<(), SegmentError> {
        self.resolve(0).map(|_| ())
    }
}

impl fmt::Display for DraftThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftThreshold::Fraction(fraction) => write!(f, "{:.0}%", fraction * 100.0),
            DraftThreshold::AbsoluteIndex(index) => write!(f, "segment {}", index),
        }
    }
}

impl FromStr for DraftThreshold {
    type Err = SegmentError;

    /// Integers are segment indices, decimals are fractions
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(index) = s.parse::<usize>() {
            return Ok(DraftThreshold::AbsoluteIndex(index));
        }
        match s.parse::<f64>() {
            Ok(fraction) => {
                let threshold = DraftThreshold::Fraction(fraction);
                threshold.validate()?;
                Ok(threshold)
            }
            Err(_) => Err(SegmentError::invalid(
                "draft_point",
                s,
                "expected a fraction or a segment index",
            )),
        }
    }
}

/// Drafting switch points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DraftingConfig {
    pub semi_draft_point: DraftThreshold,
    pub full_draft_point: DraftThreshold,
}

impl Default for DraftingConfig {
    fn default() -> Self {
        Self {
            semi_draft_point: DraftThreshold::Fraction(0.6),
            full_draft_point: DraftThreshold::Fraction(0.9),
        }
    }
}

impl DraftingConfig {
    pub fn validate(&self) -> Result<(), SegmentError> {
        self.semi_draft_point.validate()?;
        self.full_draft_point.validate()
    }
}

/// Regime per segment plus the resolved switch indices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftingPlan {
    pub semi_boundary: usize,
    pub full_boundary: usize,
    pub regimes: Vec<DraftingRegime>,
}

impl DraftingPlan {
    pub fn count(&self, regime: DraftingRegime) -> usize {
        self.regimes.iter().filter(|r| **r == regime).count()
    }
}

/// Assign a drafting regime to each of `segment_count` segments
///
/// The boundaries always satisfy `0 <= semi <= full <= segment_count`; a full-draft
/// switch placed before the semi-draft switch is moved up to it.
pub fn classify(segment_count: usize, config: &DraftingConfig) -> Result<DraftingPlan, SegmentError> {
    let semi_boundary = config.semi_draft_point.resolve(segment_count)?;
    let full_boundary = config
        .full_draft_point
        .resolve(segment_count)?
        .max(semi_boundary);

    let regimes = (0..segment_count)
        .map(|position| regime_at(position, semi_boundary, full_boundary))
        .collect();

    debug!(segment_count, semi_boundary, full_boundary, "Drafting regimes assigned");

    Ok(DraftingPlan {
        semi_boundary,
        full_boundary,
        regimes,
    })
}

fn regime_at(position: usize, semi_boundary: usize, full_boundary: usize) -> DraftingRegime {
    if position < semi_boundary {
        DraftingRegime::FullDraft
    } else if position < full_boundary {
        DraftingRegime::SemiDraft
    } else {
        DraftingRegime::NoDraft
    }
}
