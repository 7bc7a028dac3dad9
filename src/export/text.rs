use std::io::Write;
use tabled::{settings::Style, Table, Tabled};

use crate::error::Result;
use crate::models::{Route, Segment, SegmentRow, StagePlan};

#[derive(Tabled)]
struct DisplayRow {
    #[tabled(rename = "#")]
    segment: usize,
    #[tabled(rename = "Start km")]
    start_km: String,
    #[tabled(rename = "End km")]
    end_km: String,
    #[tabled(rename = "Elev m")]
    elevation: String,
    #[tabled(rename = "Slope %")]
    slope: String,
    #[tabled(rename = "Terrain")]
    terrain: String,
    #[tabled(rename = "Drafting")]
    drafting: String,
    #[tabled(rename = "W/kg")]
    power: String,
    #[tabled(rename = "Time")]
    duration: String,
    #[tabled(rename = "Glycogen %")]
    glycogen: String,
}

impl From<&SegmentRow> for DisplayRow {
    fn from(row: &SegmentRow) -> Self {
        DisplayRow {
            segment: row.segment,
            start_km: format!("{:.2}", row.start_km),
            end_km: format!("{:.2}", row.end_km),
            elevation: format!("{:.0} → {:.0}", row.start_elevation_m, row.end_elevation_m),
            slope: format!("{:.1}", row.average_slope_pct),
            terrain: row.terrain.to_string(),
            drafting: row.drafting.to_string(),
            power: format!("{:.2}", row.relative_power_wkg),
            duration: format_duration(row.duration_s),
            glycogen: format!("{:.1}", row.glycogen_level_pct),
        }
    }
}

#[derive(Tabled)]
struct SegmentLine {
    #[tabled(rename = "#")]
    segment: usize,
    #[tabled(rename = "Start km")]
    start_km: String,
    #[tabled(rename = "End km")]
    end_km: String,
    #[tabled(rename = "Elev m")]
    elevation: String,
    #[tabled(rename = "Slope %")]
    slope: String,
}

/// Segmentation result without physics, numbered from 1
pub fn render_segments(route: &Route, segments: &[Segment]) -> String {
    let lines: Vec<SegmentLine> = segments
        .iter()
        .enumerate()
        .map(|(i, segment)| SegmentLine {
            segment: i + 1,
            start_km: format!("{:.2}", route.distance_at(segment.start_idx)),
            end_km: format!("{:.2}", route.distance_at(segment.end_idx)),
            elevation: format!("{:.0} → {:.0}", segment.start_elevation, segment.end_elevation),
            slope: format!("{:+.1}", segment.average_slope),
        })
        .collect();
    Table::new(lines).with(Style::rounded()).to_string()
}

/// `h:mm:ss` for whole seconds
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Render segment rows as a table
pub fn render_table(rows: &[SegmentRow]) -> String {
    let display: Vec<DisplayRow> = rows.iter().map(DisplayRow::from).collect();
    Table::new(display).with(Style::rounded()).to_string()
}

/// Table followed by route and stage totals
pub fn write_table<W: Write>(plan: &StagePlan, mut writer: W) -> Result<()> {
    writeln!(writer, "{}", render_table(&plan.rows))?;
    writeln!(writer)?;

    let route = &plan.route;
    let summary = &plan.summary;
    writeln!(
        writer,
        "Route: {:.1} km, {:.0} m climbing, {:.0}-{:.0} m elevation",
        route.total_distance_km,
        route.total_elevation_gain_m,
        route.min_elevation_m,
        route.max_elevation_m
    )?;
    writeln!(
        writer,
        "Stage: {} segments, {} total, {} climbing",
        summary.segment_count,
        format_duration(summary.total_duration_s),
        format_duration(summary.climbing_duration_s)
    )?;
    writeln!(
        writer,
        "Drafting: {} full, {} semi, {} none",
        summary.full_draft_segments, summary.semi_draft_segments, summary.no_draft_segments
    )?;
    if let Some(level) = summary.final_glycogen_level_pct {
        writeln!(writer, "Final glycogen: {:.1}%", level)?;
    }
    Ok(())
}
