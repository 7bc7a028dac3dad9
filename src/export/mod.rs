//! Stage plan output
//!
//! Every writer takes any [`std::io::Write`], so the CLI can target stdout or a
//! file with the same code.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::error::{ClimbRsError, Result};
use crate::models::StagePlan;

pub mod csv;
pub mod json;
pub mod text;

/// Export format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Terminal table with a summary block
    #[default]
    Table,
    /// Pretty-printed JSON document
    Json,
    /// One CSV record per segment
    Csv,
}

impl std::str::FromStr for ExportFormat {
    type Err = ClimbRsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" | "text" | "txt" => Ok(ExportFormat::Table),
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(ClimbRsError::Export(format!("Unsupported format: {}", s))),
        }
    }
}

impl ExportFormat {
    /// Guess the format from an output file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

/// Write a stage plan in the requested format
pub fn write_plan<W: Write>(plan: &StagePlan, format: ExportFormat, writer: W) -> Result<()> {
    match format {
        ExportFormat::Table => text::write_table(plan, writer),
        ExportFormat::Json => json::write_json(plan, writer),
        ExportFormat::Csv => csv::write_csv(&plan.rows, writer),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::models::{
        DraftingRegime, RouteStats, SegmentRow, StagePlan, StageSummary, TerrainClass,
    };

    pub fn sample_plan() -> StagePlan {
        let rows = vec![
            SegmentRow {
                segment: 1,
                start_km: 0.0,
                end_km: 5.0,
                start_elevation_m: 400.0,
                end_elevation_m: 750.0,
                distance_km: 5.0,
                average_slope_pct: 7.0,
                terrain: TerrainClass::Climb,
                drafting: DraftingRegime::NoDraft,
                relative_power_wkg: 5.5,
                duration_s: 1104.0,
                glycogen_level_pct: 100.0,
            },
            SegmentRow {
                segment: 2,
                start_km: 5.0,
                end_km: 12.0,
                start_elevation_m: 750.0,
                end_elevation_m: 400.0,
                distance_km: 7.0,
                average_slope_pct: -5.0,
                terrain: TerrainClass::Descent,
                drafting: DraftingRegime::FullDraft,
                relative_power_wkg: 1.5,
                duration_s: 420.0,
                glycogen_level_pct: 100.0,
            },
        ];
        StagePlan {
            route: RouteStats {
                total_distance_km: 12.0,
                total_elevation_gain_m: 350.0,
                min_elevation_m: 400.0,
                max_elevation_m: 750.0,
            },
            summary: StageSummary {
                segment_count: 2,
                total_distance_km: 12.0,
                total_duration_s: 1524.0,
                climbing_duration_s: 1104.0,
                final_glycogen_level_pct: Some(100.0),
                full_draft_segments: 1,
                semi_draft_segments: 0,
                no_draft_segments: 1,
            },
            rows,
        }
    }
}
