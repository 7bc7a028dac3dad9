//! Stage analysis pipeline
//!
//! `Route -> Segmentation -> DraftedSegments -> PacedSegments -> SolvedSegments -> StagePlan`
//!
//! Each stage borrows the previous stage's output and returns a new value. Only the
//! physics solve runs in parallel, since every segment is independent there; the
//! glycogen recurrence needs the results back in route order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::drafting::{classify, DraftingConfig, DraftingPlan};
use crate::error::{ClimbRsError, Result, SegmentError};
use crate::glycogen::{compute_glycogen_level, EffortSample, GlycogenConfig};
use crate::models::{
    DraftingRegime, RiderProfile, Route, Segment, SegmentPhysics, SegmentRow, StagePlan,
    StageSummary,
};
use crate::pacing::{assign_power_targets, PacingConfig, PowerTarget};
use crate::physics::{PhysicsSolver, SolverSettings};
use crate::segmentation::{SegmentationConfig, Segmenter, Segmentation};

/// Everything the pipeline needs besides the route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub segmentation: SegmentationConfig,
    pub drafting: DraftingConfig,
    pub rider: RiderProfile,
    pub pacing: PacingConfig,
    pub glycogen: GlycogenConfig,
    pub solver: SolverSettings,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            segmentation: SegmentationConfig::default(),
            drafting: DraftingConfig::default(),
            rider: RiderProfile::default(),
            pacing: PacingConfig::default(),
            glycogen: GlycogenConfig::default(),
            solver: SolverSettings::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> std::result::Result<(), SegmentError> {
        self.segmentation.validate()?;
        self.drafting.validate()?;
        self.pacing.validate()?;
        self.glycogen.validate()?;
        self.solver.validate()
    }
}

/// Segments with their drafting regime
#[derive(Debug, Clone, PartialEq)]
pub struct DraftedSegments {
    pub segments: Vec<Segment>,
    pub drafting: DraftingPlan,
}

/// Drafted segments with a power target each
#[derive(Debug, Clone, PartialEq)]
pub struct PacedSegments {
    pub drafted: DraftedSegments,
    pub targets: Vec<PowerTarget>,
}

/// Paced segments with duration and power solved
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedSegments {
    pub paced: PacedSegments,
    pub physics: Vec<SegmentPhysics>,
}

/// Runs the whole analysis for one route
#[derive(Debug, Clone, Default)]
pub struct StageAnalyzer {
    config: AnalysisConfig,
}

impl StageAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run every stage and assemble the stage plan
    pub fn analyze(&self, route: &Route) -> Result<StagePlan> {
        let span = info_span!("analyze", points = route.len());
        let _guard = span.enter();

        self.config.validate()?;
        let segmentation = self.segment(route)?;
        let drafted = self.draft(&segmentation)?;
        let paced = self.pace(&drafted);
        let solved = self.solve(&paced)?;
        let glycogen = self.deplete(&solved);
        let plan = assemble(route, &solved, &glycogen);

        info!(
            segments = plan.summary.segment_count,
            total_duration_s = plan.summary.total_duration_s,
            final_glycogen = plan.summary.final_glycogen_level_pct,
            "Stage analysis complete"
        );
        Ok(plan)
    }

    pub fn segment(&self, route: &Route) -> Result<Segmentation> {
        Ok(Segmenter::new(self.config.segmentation.clone()).segment(route)?)
    }

    pub fn draft(&self, segmentation: &Segmentation) -> Result<DraftedSegments> {
        let drafting = classify(segmentation.segments.len(), &self.config.drafting)?;
        Ok(DraftedSegments {
            segments: segmentation.segments.clone(),
            drafting,
        })
    }

    pub fn pace(&self, drafted: &DraftedSegments) -> PacedSegments {
        let targets = assign_power_targets(&drafted.segments, &self.config.pacing);
        PacedSegments {
            drafted: drafted.clone(),
            targets,
        }
    }

    /// Solve every segment; the first failing segment in route order aborts the plan
    pub fn solve(&self, paced: &PacedSegments) -> Result<SolvedSegments> {
        let solver = PhysicsSolver::new(self.config.solver);
        let rider = &self.config.rider;
        let speed_down = self.config.pacing.average_speed_down;
        let segments = &paced.drafted.segments;
        let regimes = &paced.drafted.drafting.regimes;

        let results: Vec<std::result::Result<SegmentPhysics, SegmentError>> = segments
            .par_iter()
            .zip(regimes.par_iter())
            .zip(paced.targets.par_iter())
            .map(|((segment, regime), target)| {
                solver.apply_duration(segment, target.relative_power, *regime, rider, speed_down)
            })
            .collect();

        let physics = results
            .into_iter()
            .enumerate()
            .map(|(index, result)| result.map_err(|e| ClimbRsError::at_segment(index, e)))
            .collect::<Result<Vec<_>>>()?;

        Ok(SolvedSegments {
            paced: paced.clone(),
            physics,
        })
    }

    pub fn deplete(&self, solved: &SolvedSegments) -> Vec<f64> {
        let efforts: Vec<EffortSample> = solved
            .paced
            .drafted
            .segments
            .iter()
            .zip(&solved.physics)
            .map(|(segment, physics)| EffortSample {
                average_slope: segment.average_slope,
                relative_power: physics.relative_power,
            })
            .collect();
        compute_glycogen_level(&efforts, self.config.glycogen.start_level)
    }
}

fn assemble(route: &Route, solved: &SolvedSegments, glycogen: &[f64]) -> StagePlan {
    let drafted = &solved.paced.drafted;
    let rows: Vec<SegmentRow> = drafted
        .segments
        .iter()
        .enumerate()
        .map(|(i, segment)| SegmentRow {
            segment: i + 1,
            start_km: route.distance_at(segment.start_idx),
            end_km: route.distance_at(segment.end_idx),
            start_elevation_m: segment.start_elevation,
            end_elevation_m: segment.end_elevation,
            distance_km: segment.distance_km,
            average_slope_pct: segment.average_slope,
            terrain: solved.paced.targets[i].terrain,
            drafting: drafted.drafting.regimes[i],
            relative_power_wkg: solved.physics[i].relative_power,
            duration_s: solved.physics[i].duration_s,
            glycogen_level_pct: glycogen[i],
        })
        .collect();

    let summary = StageSummary {
        segment_count: rows.len(),
        total_distance_km: rows.iter().map(|r| r.distance_km).sum(),
        total_duration_s: rows.iter().map(|r| r.duration_s).sum(),
        climbing_duration_s: drafted
            .segments
            .iter()
            .zip(&rows)
            .filter(|(segment, _)| segment.is_net_climb())
            .map(|(_, row)| row.duration_s)
            .sum(),
        final_glycogen_level_pct: glycogen.last().copied(),
        full_draft_segments: drafted.drafting.count(DraftingRegime::FullDraft),
        semi_draft_segments: drafted.drafting.count(DraftingRegime::SemiDraft),
        no_draft_segments: drafted.drafting.count(DraftingRegime::NoDraft),
    };

    StagePlan {
        route: route.stats(),
        rows,
        summary,
    }
}
