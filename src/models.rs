use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One sample of a route, ordered by position along the route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub latitude: f64,
    pub longitude: f64,

    /// Elevation in meters
    pub elevation: f64,

    /// Cumulative distance from the route start in kilometers
    pub distance_km: f64,

    /// Low-pass filtered elevation used for extrema detection
    pub smoothed_elevation: f64,

    /// Elevation change from the previous point (0 for the first point)
    pub elevation_diff: f64,

    /// Gradient from the previous point in percent
    pub gradient: f64,
}

/// Summary statistics of a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStats {
    pub total_distance_km: f64,
    pub total_elevation_gain_m: f64,
    pub min_elevation_m: f64,
    pub max_elevation_m: f64,
}

/// Cleaned route table handed to the segmenter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    points: Vec<RoutePoint>,
}

impl Route {
    /// Wrap already preprocessed points. See [`crate::route`] for building one from raw samples.
    pub fn from_points(points: Vec<RoutePoint>) -> Self {
        Route { points }
    }

    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn smoothed_elevations(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.smoothed_elevation).collect()
    }

    /// Cumulative distance at a point index, in km
    pub fn distance_at(&self, index: usize) -> f64 {
        self.points[index].distance_km
    }

    pub fn elevation_at(&self, index: usize) -> f64 {
        self.points[index].elevation
    }

    pub fn stats(&self) -> RouteStats {
        let total_distance_km = self.points.last().map_or(0.0, |p| p.distance_km);
        let total_elevation_gain_m = self
            .points
            .iter()
            .map(|p| p.elevation_diff)
            .filter(|d| *d >= 0.0)
            .sum();
        let min_elevation_m = self
            .points
            .iter()
            .map(|p| p.elevation)
            .fold(f64::INFINITY, f64::min);
        let max_elevation_m = self
            .points
            .iter()
            .map(|p| p.elevation)
            .fold(f64::NEG_INFINITY, f64::max);

        RouteStats {
            total_distance_km,
            total_elevation_gain_m,
            min_elevation_m: if self.points.is_empty() { 0.0 } else { min_elevation_m },
            max_elevation_m: if self.points.is_empty() { 0.0 } else { max_elevation_m },
        }
    }
}

/// A slope-homogeneous stretch of the route between two point indices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start_idx: usize,
    pub end_idx: usize,

    /// Raw elevation at `start_idx` in meters
    pub start_elevation: f64,

    /// Raw elevation at `end_idx` in meters
    pub end_elevation: f64,

    /// Length in kilometers
    pub distance_km: f64,

    /// Signed average slope in percent, positive for a net climb
    pub average_slope: f64,
}

impl Segment {
    /// Build the segment spanning `start_idx..=end_idx` of the route
    pub fn spanning(route: &Route, start_idx: usize, end_idx: usize) -> Self {
        let start_elevation = route.elevation_at(start_idx);
        let end_elevation = route.elevation_at(end_idx);
        let distance_km = route.distance_at(end_idx) - route.distance_at(start_idx);

        Segment {
            start_idx,
            end_idx,
            start_elevation,
            end_elevation,
            distance_km,
            average_slope: average_slope(start_elevation, end_elevation, distance_km),
        }
    }

    pub fn elevation_change(&self) -> f64 {
        self.end_elevation - self.start_elevation
    }

    /// Net climbs include segments that end level with their start
    pub fn is_net_climb(&self) -> bool {
        self.end_elevation >= self.start_elevation
    }
}

/// Average slope in percent over `distance_km`
pub fn average_slope(start_elevation: f64, end_elevation: f64, distance_km: f64) -> f64 {
    if distance_km <= 0.0 {
        return 0.0;
    }
    (end_elevation - start_elevation) / (distance_km * 1000.0) * 100.0
}

/// Aerodynamic situation of the rider on a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftingRegime {
    FullDraft,
    SemiDraft,
    NoDraft,
}

impl DraftingRegime {
    pub const ALL: [DraftingRegime; 3] = [
        DraftingRegime::FullDraft,
        DraftingRegime::SemiDraft,
        DraftingRegime::NoDraft,
    ];
}

impl fmt::Display for DraftingRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftingRegime::FullDraft => write!(f, "Full Draft"),
            DraftingRegime::SemiDraft => write!(f, "Semi Draft"),
            DraftingRegime::NoDraft => write!(f, "No Draft"),
        }
    }
}

/// Terrain class of a segment, used to pick a default power target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainClass {
    Climb,
    Flat,
    Descent,
}

impl TerrainClass {
    /// Classify a slope; `flat_threshold` is the absolute slope (%) below which terrain is flat
    pub fn from_slope(average_slope: f64, flat_threshold: f64) -> Self {
        if average_slope >= flat_threshold {
            TerrainClass::Climb
        } else if average_slope <= -flat_threshold {
            TerrainClass::Descent
        } else {
            TerrainClass::Flat
        }
    }
}

impl fmt::Display for TerrainClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerrainClass::Climb => write!(f, "Climb"),
            TerrainClass::Flat => write!(f, "Flat"),
            TerrainClass::Descent => write!(f, "Descent"),
        }
    }
}

/// Rider characteristics read by the physics solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiderProfile {
    /// Rider mass in kilograms, without bike and equipment
    pub mass_kg: Option<f64>,

    /// Drag area (m²) per drafting regime
    #[serde(default)]
    pub cda: BTreeMap<DraftingRegime, f64>,
}

impl RiderProfile {
    pub fn new(mass_kg: f64, full_draft: f64, semi_draft: f64, no_draft: f64) -> Self {
        let cda = BTreeMap::from([
            (DraftingRegime::FullDraft, full_draft),
            (DraftingRegime::SemiDraft, semi_draft),
            (DraftingRegime::NoDraft, no_draft),
        ]);
        RiderProfile {
            mass_kg: Some(mass_kg),
            cda,
        }
    }
}

impl Default for RiderProfile {
    fn default() -> Self {
        RiderProfile::new(65.0, 0.2625, 0.305, 0.35)
    }
}

/// Power and duration attached to a segment by the physics stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentPhysics {
    /// Relative power in W/kg
    pub relative_power: f64,

    /// Duration in seconds
    pub duration_s: f64,
}

/// One row of the stage plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRow {
    /// 1-based segment number
    pub segment: usize,
    pub start_km: f64,
    pub end_km: f64,
    pub start_elevation_m: f64,
    pub end_elevation_m: f64,
    pub distance_km: f64,
    pub average_slope_pct: f64,
    pub terrain: TerrainClass,
    pub drafting: DraftingRegime,
    pub relative_power_wkg: f64,
    pub duration_s: f64,
    pub glycogen_level_pct: f64,
}

/// Totals over the stage plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSummary {
    pub segment_count: usize,
    pub total_distance_km: f64,
    pub total_duration_s: f64,
    pub climbing_duration_s: f64,
    pub final_glycogen_level_pct: Option<f64>,
    pub full_draft_segments: usize,
    pub semi_draft_segments: usize,
    pub no_draft_segments: usize,
}

/// Complete output table of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagePlan {
    pub route: RouteStats,
    pub rows: Vec<SegmentRow>,
    pub summary: StageSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(distance_km: f64, elevation: f64) -> RoutePoint {
        RoutePoint {
            latitude: 0.0,
            longitude: 0.0,
            elevation,
            distance_km,
            smoothed_elevation: elevation,
            elevation_diff: 0.0,
            gradient: 0.0,
        }
    }

    #[test]
    fn test_segment_spanning_uses_raw_elevation() {
        let mut points = vec![point(0.0, 100.0), point(1.0, 150.0), point(2.0, 120.0)];
        points[1].smoothed_elevation = 140.0;
        let route = Route::from_points(points);

        let segment = Segment::spanning(&route, 0, 1);
        assert_eq!(segment.end_elevation, 150.0);
        assert!((segment.average_slope - 5.0).abs() < 1e-9);

        let segment = Segment::spanning(&route, 1, 2);
        assert!((segment.average_slope + 3.0).abs() < 1e-9);
        assert!(!segment.is_net_climb());
    }

    #[test]
    fn test_level_segment_counts_as_climb() {
        let route = Route::from_points(vec![point(0.0, 100.0), point(2.0, 100.0)]);
        let segment = Segment::spanning(&route, 0, 1);
        assert_eq!(segment.average_slope, 0.0);
        assert!(segment.is_net_climb());
    }

    #[test]
    fn test_terrain_classification() {
        assert_eq!(TerrainClass::from_slope(4.5, 2.0), TerrainClass::Climb);
        assert_eq!(TerrainClass::from_slope(2.0, 2.0), TerrainClass::Climb);
        assert_eq!(TerrainClass::from_slope(1.9, 2.0), TerrainClass::Flat);
        assert_eq!(TerrainClass::from_slope(-1.0, 2.0), TerrainClass::Flat);
        assert_eq!(TerrainClass::from_slope(-2.5, 2.0), TerrainClass::Descent);
    }

    #[test]
    fn test_drafting_regime_display() {
        assert_eq!(DraftingRegime::FullDraft.to_string(), "Full Draft");
        assert_eq!(DraftingRegime::NoDraft.to_string(), "No Draft");
    }

    #[test]
    fn test_route_stats() {
        let mut points = vec![point(0.0, 100.0), point(1.0, 130.0), point(2.5, 110.0)];
        points[1].elevation_diff = 30.0;
        points[2].elevation_diff = -20.0;
        let stats = Route::from_points(points).stats();

        assert_eq!(stats.total_distance_km, 2.5);
        assert_eq!(stats.total_elevation_gain_m, 30.0);
        assert_eq!(stats.min_elevation_m, 100.0);
        assert_eq!(stats.max_elevation_m, 130.0);
    }
}
