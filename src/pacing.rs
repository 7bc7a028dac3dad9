//! Default power targets per terrain class
//!
//! Before physics runs each segment needs a relative power. Climbs, flats and
//! descents get their own target, and individual segments can be pinned to a
//! different value by their 1-based number.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::error::SegmentError;
use crate::models::{Segment, TerrainClass};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacingConfig {
    /// W/kg on climbs
    pub relative_power_climb: f64,

    /// W/kg on flat segments
    pub relative_power_flat: f64,

    /// W/kg on descents
    pub relative_power_descent: f64,

    /// Slope (%) at or above which a segment counts as a climb, and at or below whose negative as a descent
    pub flat_slope_threshold: f64,

    /// Constant descending speed in km/h
    pub average_speed_down: f64,

    /// Per-segment relative power replacing the terrain default
    #[serde(default)]
    pub overrides: Vec<PowerOverride>,
}

/// Relative power pinned to one segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerOverride {
    /// 1-based segment number, as shown in the stage table
    pub segment: usize,

    /// W/kg
    pub relative_power: f64,
}

impl PowerOverride {
    pub fn validate(&self) -> Result<(), SegmentError> {
        if self.segment == 0 {
            return Err(SegmentError::invalid(
                "override.segment",
                self.segment,
                "segment numbers start at 1",
            ));
        }
        if !self.relative_power.is_finite() || self.relative_power <= 0.0 {
            return Err(SegmentError::invalid(
                format!("override.relative_power[{}]", self.segment),
                self.relative_power,
                "must be positive",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for PowerOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.segment, self.relative_power)
    }
}

/// Parses `SEGMENT=W/KG`, e.g. `3=6.2`
impl FromStr for PowerOverride {
    type Err = SegmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (segment, power) = s
            .split_once('=')
            .ok_or_else(|| SegmentError::invalid("power override", s, "expected SEGMENT=W/KG"))?;
        let segment = segment
            .trim()
            .parse::<usize>()
            .map_err(|e| SegmentError::invalid("power override", s, e.to_string()))?;
        let relative_power = power
            .trim()
            .parse::<f64>()
            .map_err(|e| SegmentError::invalid("power override", s, e.to_string()))?;

        let parsed = PowerOverride {
            segment,
            relative_power,
        };
        parsed.validate()?;
        Ok(parsed)
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            relative_power_climb: 5.5,
            relative_power_flat: 3.0,
            relative_power_descent: 1.5,
            flat_slope_threshold: 2.0,
            average_speed_down: 60.0,
            overrides: Vec::new(),
        }
    }
}

impl PacingConfig {
    pub fn validate(&self) -> Result<(), SegmentError> {
        for (parameter, value) in [
            ("relative_power_climb", self.relative_power_climb),
            ("relative_power_flat", self.relative_power_flat),
            ("relative_power_descent", self.relative_power_descent),
            ("average_speed_down", self.average_speed_down),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SegmentError::invalid(parameter, value, "must be positive"));
            }
        }
        if !self.flat_slope_threshold.is_finite() || self.flat_slope_threshold < 0.0 {
            return Err(SegmentError::invalid(
                "flat_slope_threshold",
                self.flat_slope_threshold,
                "must be zero or positive",
            ));
        }

        let mut seen = BTreeSet::new();
        for entry in &self.overrides {
            entry.validate()?;
            if !seen.insert(entry.segment) {
                return Err(SegmentError::invalid(
                    "override.segment",
                    entry.segment,
                    "segment is overridden more than once",
                ));
            }
        }
        Ok(())
    }

    /// Add an override, replacing any earlier one for the same segment
    pub fn set_override(&mut self, entry: PowerOverride) {
        self.overrides.retain(|existing| existing.segment != entry.segment);
        self.overrides.push(entry);
    }

    pub fn target_for(&self, terrain: TerrainClass) -> f64 {
        match terrain {
            TerrainClass::Climb => self.relative_power_climb,
            TerrainClass::Flat => self.relative_power_flat,
            TerrainClass::Descent => self.relative_power_descent,
        }
    }
}

/// Terrain class and power target of one segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerTarget {
    pub terrain: TerrainClass,
    pub relative_power: f64,
}

/// Power target per segment, overrides applied by segment number
pub fn assign_power_targets(segments: &[Segment], config: &PacingConfig) -> Vec<PowerTarget> {
    for entry in config.overrides.iter().filter(|o| o.segment > segments.len()) {
        warn!(
            segment = entry.segment,
            segments = segments.len(),
            "Power override targets a segment the route does not have"
        );
    }

    segments
        .iter()
        .enumerate()
        .map(|(position, segment)| {
            let terrain = TerrainClass::from_slope(segment.average_slope, config.flat_slope_threshold);
            let relative_power = config
                .overrides
                .iter()
                .find(|o| o.segment == position + 1)
                .map(|o| o.relative_power)
                .unwrap_or_else(|| config.target_for(terrain));
            PowerTarget {
                terrain,
                relative_power,
            }
        })
        .collect()
}
