//! Glycogen depletion across a stage
//!
//! A heuristic resource level carried from segment to segment in route order. The
//! first segment starts at the configured level. Descents leave the level
//! unchanged, and every other segment scales it by `relative_power / 6`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SegmentError;

/// Empirical divisor turning relative power (W/kg) into a depletion factor
pub const GLYCOGEN_POWER_DIVISOR: f64 = 6.0;

/// Default starting glycogen level in percent
pub const DEFAULT_START_LEVEL: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlycogenConfig {
    pub start_level: f64,
}

impl Default for GlycogenConfig {
    fn default() -> Self {
        Self {
            start_level: DEFAULT_START_LEVEL,
        }
    }
}

impl GlycogenConfig {
    pub fn validate(&self) -> Result<(), SegmentError> {
        if !self.start_level.is_finite() {
            return Err(SegmentError::invalid(
                "glycogen_start_level",
                self.start_level,
                "must be a finite percentage",
            ));
        }
        Ok(())
    }
}

/// What the recurrence needs from a segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffortSample {
    /// Average slope in percent
    pub average_slope: f64,

    /// Relative power in W/kg
    pub relative_power: f64,
}

/// Glycogen level (%) per segment, in route order
pub fn compute_glycogen_level(efforts: &[EffortSample], start_level: f64) -> Vec<f64> {
    let mut levels = Vec::with_capacity(efforts.len());
    let mut previous = start_level;

    for (index, effort) in efforts.iter().enumerate() {
        let level = if index == 0 {
            start_level
        } else if effort.average_slope < 0.0 {
            previous
        } else {
            previous * effort.relative_power / GLYCOGEN_POWER_DIVISOR
        };
        levels.push(level);
        previous = level;
    }

    debug!(
        segments = levels.len(),
        final_level = levels.last().copied(),
        "Glycogen trace computed"
    );
    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effort(average_slope: f64, relative_power: f64) -> EffortSample {
        EffortSample {
            average_slope,
            relative_power,
        }
    }

    #[test]
    fn test_first_segment_is_forced_to_start_level() {
        let levels = compute_glycogen_level(&[effort(5.0, 3.0)], 100.0);
        assert_eq!(levels, vec![100.0]);
    }

    #[test]
    fn test_descent_keeps_level_and_climb_scales() {
        let levels = compute_glycogen_level(
            &[effort(5.0, 3.0), effort(-2.0, 1.5), effort(4.0, 6.0)],
            100.0,
        );
        assert_eq!(levels, vec![100.0, 100.0, 100.0]);

        let levels = compute_glycogen_level(
            &[effort(5.0, 3.0), effort(4.0, 3.0), effort(-1.0, 1.5), effort(0.0, 4.5)],
            80.0,
        );
        assert_eq!(levels, vec![80.0, 40.0, 40.0, 30.0]);
    }

    #[test]
    fn test_empty_and_custom_start() {
        assert!(compute_glycogen_level(&[], 100.0).is_empty());
        assert_eq!(compute_glycogen_level(&[effort(-3.0, 1.0)], 72.5), vec![72.5]);
    }

    #[test]
    fn test_config_validation() {
        assert!(GlycogenConfig::default().validate().is_ok());
        assert!(GlycogenConfig { start_level: f64::NAN }.validate().is_err());
    }
}
