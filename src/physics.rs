//! Climbing physics
//!
//! Steady-state power balance for a rider on a segment:
//!
//! ```text
//! P = (1 + friction) * (0.5 * rho * CdA * v^3 + Crr * m * g * v + m * g * dh / t)
//! ```
//!
//! with `m` the rider plus equipment mass and `t = d / v`. Power follows directly
//! from a known duration; duration from a known power needs the positive root of a
//! cubic in `v`, found with a bracketed Newton iteration.

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::error::SegmentError;
use crate::models::{DraftingRegime, RiderProfile, Segment, SegmentPhysics};

/// Air density in kg/m³
pub const AIR_DENSITY: f64 = 1.15;

/// Rolling resistance coefficient
pub const ROLLING_RESISTANCE: f64 = 0.004;

/// Gravitational acceleration in m/s²
pub const GRAVITY: f64 = 9.81;

/// Bike and equipment mass added to the rider, in kg
pub const EQUIPMENT_MASS: f64 = 7.8;

/// Drivetrain friction loss as a fraction of the resistive power
pub const FRICTION_LOSS: f64 = 0.02;

/// Starting velocity for the root finder, in m/s
pub const INITIAL_VELOCITY: f64 = 5.0;

/// What to do when the rider has no CdA for the requested regime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CdaFallback {
    /// Use the full-draft CdA instead
    #[default]
    FullDraft,
    /// Report the missing CdA
    Strict,
}

/// Root finder limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    pub max_iterations: usize,

    /// Accepted power residual in watts
    pub tolerance_watts: f64,

    #[serde(default)]
    pub cda_fallback: CdaFallback,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance_watts: 1e-6,
            cda_fallback: CdaFallback::FullDraft,
        }
    }
}

impl SolverSettings {
    pub fn validate(&self) -> Result<(), SegmentError> {
        if self.max_iterations == 0 {
            return Err(SegmentError::invalid(
                "max_iterations",
                self.max_iterations,
                "must be at least 1",
            ));
        }
        check_positive("tolerance_watts", self.tolerance_watts)
    }
}

/// A physics question about one segment; exactly one of duration or power must be given
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveRequest {
    pub duration_s: Option<f64>,
    pub relative_power: Option<f64>,
    pub distance_km: f64,
    pub elevation_gain_m: f64,
    pub drafting: DraftingRegime,
}

/// Answer to a [`SolveRequest`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SolveOutcome {
    /// Relative power in W/kg for the requested duration
    RelativePower(f64),
    /// Whole seconds needed at the requested power
    Duration(f64),
}

/// Rider mass and drag area resolved for one regime
#[derive(Debug, Clone, Copy)]
struct Resistance {
    rider_mass: f64,
    total_mass: f64,
    cda: f64,
}

impl Resistance {
    fn aero_coefficient(&self) -> f64 {
        0.5 * AIR_DENSITY * self.cda
    }

    fn rolling_force(&self) -> f64 {
        ROLLING_RESISTANCE * self.total_mass * GRAVITY
    }
}

#[derive(Debug, Clone, Default)]
pub struct PhysicsSolver {
    settings: SolverSettings,
}

impl PhysicsSolver {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Dispatch on whichever of duration or power the request carries
    pub fn solve(&self, request: &SolveRequest, rider: &RiderProfile) -> Result<SolveOutcome, SegmentError> {
        match (request.duration_s, request.relative_power) {
            (Some(duration_s), None) => self
                .power_from_duration(
                    duration_s,
                    request.distance_km,
                    request.elevation_gain_m,
                    rider,
                    request.drafting,
                )
                .map(SolveOutcome::RelativePower),
            (None, Some(relative_power)) => self
                .duration_from_power(
                    relative_power,
                    request.distance_km,
                    request.elevation_gain_m,
                    rider,
                    request.drafting,
                )
                .map(SolveOutcome::Duration),
            (Some(_), Some(_)) => Err(SegmentError::AmbiguousInput {
                reason: "give either a duration or a relative power, not both".to_string(),
            }),
            (None, None) => Err(SegmentError::AmbiguousInput {
                reason: "neither a duration nor a relative power was given".to_string(),
            }),
        }
    }

    /// Relative power (W/kg) needed to ride the segment in `duration_s`
    pub fn power_from_duration(
        &self,
        duration_s: f64,
        distance_km: f64,
        elevation_gain_m: f64,
        rider: &RiderProfile,
        drafting: DraftingRegime,
    ) -> Result<f64, SegmentError> {
        check_positive("duration_s", duration_s)?;
        check_positive("distance_km", distance_km)?;
        check_finite("elevation_gain_m", elevation_gain_m)?;
        let resistance = self.resistance(rider, drafting)?;

        let distance_m = distance_km * 1000.0;
        let velocity = distance_m / duration_s;

        let air_power = resistance.aero_coefficient() * velocity.powi(3);
        let rolling_power = resistance.rolling_force() * velocity;
        let gravity_power = resistance.total_mass * GRAVITY * elevation_gain_m / duration_s;
        let total_power = (1.0 + FRICTION_LOSS) * (air_power + rolling_power + gravity_power);

        Ok(total_power / resistance.rider_mass)
    }

    /// Whole seconds needed to ride the segment at `relative_power` W/kg
    pub fn duration_from_power(
        &self,
        relative_power: f64,
        distance_km: f64,
        elevation_gain_m: f64,
        rider: &RiderProfile,
        drafting: DraftingRegime,
    ) -> Result<f64, SegmentError> {
        check_positive("relative_power", relative_power)?;
        check_positive("distance_km", distance_km)?;
        check_finite("elevation_gain_m", elevation_gain_m)?;
        let resistance = self.resistance(rider, drafting)?;

        let distance_m = distance_km * 1000.0;
        let target_power = relative_power * resistance.rider_mass;
        let gravitational_work = resistance.total_mass * GRAVITY * elevation_gain_m;

        let velocity = self.find_velocity(target_power, &resistance, distance_m, gravitational_work)?;
        Ok((distance_m / velocity).round())
    }

    /// Duration of a segment: modeled for net climbs, constant speed for descents
    pub fn apply_duration(
        &self,
        segment: &Segment,
        relative_power: f64,
        drafting: DraftingRegime,
        rider: &RiderProfile,
        average_speed_down_kmh: f64,
    ) -> Result<SegmentPhysics, SegmentError> {
        let duration_s = if segment.is_net_climb() {
            self.duration_from_power(
                relative_power,
                segment.distance_km,
                segment.elevation_change().abs(),
                rider,
                drafting,
            )?
        } else {
            descent_duration(segment.distance_km, average_speed_down_kmh)?
        };

        Ok(SegmentPhysics {
            relative_power,
            duration_s,
        })
    }

    fn resistance(&self, rider: &RiderProfile, drafting: DraftingRegime) -> Result<Resistance, SegmentError> {
        let rider_mass = rider
            .mass_kg
            .ok_or_else(|| SegmentError::missing("rider mass"))?;
        check_positive("rider_mass_kg", rider_mass)?;

        let cda = match (rider.cda.get(&drafting), self.settings.cda_fallback) {
            (Some(cda), _) => *cda,
            (None, CdaFallback::FullDraft) => {
                let fallback = rider
                    .cda
                    .get(&DraftingRegime::FullDraft)
                    .copied()
                    .ok_or_else(|| SegmentError::missing(format!("CdA for {}", drafting)))?;
                trace!(requested = %drafting, "No CdA for regime, using full draft CdA");
                fallback
            }
            (None, CdaFallback::Strict) => {
                return Err(SegmentError::missing(format!("CdA for {}", drafting)))
            }
        };
        check_positive("cda", cda)?;

        Ok(Resistance {
            rider_mass,
            total_mass: rider_mass + EQUIPMENT_MASS,
            cda,
        })
    }

    /// Positive velocity at which the power balance meets `target_power`
    ///
    /// The residual is negative at `v = 0` and grows without bound, so a positive
    /// root always exists. Newton steps that leave the current bracket fall back to
    /// bisection.
    fn find_velocity(
        &self,
        target_power: f64,
        resistance: &Resistance,
        distance_m: f64,
        gravitational_work: f64,
    ) -> Result<f64, SegmentError> {
        let aero = resistance.aero_coefficient();
        let linear = resistance.rolling_force() + gravitational_work / distance_m;
        let scale = 1.0 + FRICTION_LOSS;

        let residual = |v: f64| scale * (aero * v.powi(3) + linear * v) - target_power;
        let slope = |v: f64| scale * (3.0 * aero * v.powi(2) + linear);

        let max_iterations = self.settings.max_iterations;
        let mut low = 0.0;
        let mut high = INITIAL_VELOCITY;
        let mut iterations = 0;
        while residual(high) <= 0.0 {
            low = high;
            high *= 2.0;
            iterations += 1;
            if iterations >= max_iterations || !high.is_finite() {
                return Err(diverged(iterations, residual(high)));
            }
        }

        let mut v = INITIAL_VELOCITY.clamp(low, high);
        while iterations < max_iterations {
            let f = residual(v);
            if f.abs() <= self.settings.tolerance_watts {
                trace!(velocity = v, iterations, "Velocity solve converged");
                return Ok(v);
            }
            if f < 0.0 {
                low = v;
            } else {
                high = v;
            }

            let df = slope(v);
            let newton = v - f / df;
            v = if df > 0.0 && newton > low && newton < high {
                newton
            } else {
                0.5 * (low + high)
            };
            iterations += 1;
        }

        let f = residual(v);
        if f.abs() <= self.settings.tolerance_watts {
            return Ok(v);
        }
        Err(diverged(iterations, f))
    }
}

/// Seconds to cover `distance_km` at a constant `speed_kmh`
pub fn descent_duration(distance_km: f64, speed_kmh: f64) -> Result<f64, SegmentError> {
    check_positive("average_speed_down", speed_kmh)?;
    Ok(distance_km * 3600.0 / speed_kmh)
}

fn diverged(iterations: usize, residual: f64) -> SegmentError {
    warn!(iterations, residual, "Velocity solve did not converge");
    SegmentError::NumericDivergence {
        iterations,
        residual,
    }
}

fn check_positive(parameter: &str, value: f64) -> Result<(), SegmentError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SegmentError::invalid(parameter, value, "must be positive"));
    }
    Ok(())
}

fn check_finite(parameter: &str, value: f64) -> Result<(), SegmentError> {
    if !value.is_finite() {
        return Err(SegmentError::invalid(parameter, value, "must be finite"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn rider_70kg() -> RiderProfile {
        RiderProfile::new(70.0, 0.3, 0.3, 0.3)
    }

    fn climb(distance_km: f64, start: f64, end: f64) -> Segment {
        Segment {
            start_idx: 0,
            end_idx: 10,
            start_elevation: start,
            end_elevation: end,
            distance_km,
            average_slope: crate::models::average_slope(start, end, distance_km),
        }
    }

    #[test]
    fn test_power_from_duration_closed_form() {
        let solver = PhysicsSolver::default();
        let rider = rider_70kg();

        // 5 km in 1000 s = 5 m/s, 200 m gain
        let rp = solver
            .power_from_duration(1000.0, 5.0, 200.0, &rider, DraftingRegime::NoDraft)
            .unwrap();

        let total_mass = 77.8;
        let air = 0.5 * 1.15 * 0.3 * 125.0;
        let rolling = 0.004 * total_mass * 9.81 * 5.0;
        let gravity = total_mass * 9.81 * 200.0 / 1000.0;
        let expected = 1.02 * (air + rolling + gravity) / 70.0;
        assert!((rp - expected).abs() < 1e-12);
    }

    #[test]
    fn test_duration_from_power_round_trip() {
        let solver = PhysicsSolver::default();
        let rider = rider_70kg();

        let duration = solver
            .duration_from_power(5.0, 5.0, 200.0, &rider, DraftingRegime::FullDraft)
            .unwrap();
        assert!(duration > 0.0);
        assert_eq!(duration, duration.round());
        assert!(duration > 600.0 && duration < 700.0);

        let rp = solver
            .power_from_duration(duration, 5.0, 200.0, &rider, DraftingRegime::FullDraft)
            .unwrap();
        assert!((rp - 5.0).abs() < 0.02, "round trip gave {rp}");
    }

    #[test]
    fn test_negative_gain_still_solves() {
        let solver = PhysicsSolver::default();
        let rider = rider_70kg();
        let duration = solver
            .duration_from_power(1.5, 4.0, -120.0, &rider, DraftingRegime::NoDraft)
            .unwrap();
        let flat = solver
            .duration_from_power(1.5, 4.0, 0.0, &rider, DraftingRegime::NoDraft)
            .unwrap();
        assert!(duration < flat);
    }

    #[test]
    fn test_solve_requires_exactly_one_input() {
        let solver = PhysicsSolver::default();
        let rider = rider_70kg();
        let mut request = SolveRequest {
            duration_s: Some(900.0),
            relative_power: Some(5.0),
            distance_km: 5.0,
            elevation_gain_m: 200.0,
            drafting: DraftingRegime::SemiDraft,
        };
        assert!(matches!(
            solver.solve(&request, &rider),
            Err(SegmentError::AmbiguousInput { .. })
        ));

        request.duration_s = None;
        request.relative_power = None;
        assert!(matches!(
            solver.solve(&request, &rider),
            Err(SegmentError::AmbiguousInput { .. })
        ));

        request.relative_power = Some(5.0);
        assert!(matches!(
            solver.solve(&request, &rider),
            Ok(SolveOutcome::Duration(_))
        ));

        request.relative_power = None;
        request.duration_s = Some(900.0);
        assert!(matches!(
            solver.solve(&request, &rider),
            Ok(SolveOutcome::RelativePower(_))
        ));
    }

    #[test]
    fn test_missing_mass() {
        let solver = PhysicsSolver::default();
        let rider = RiderProfile {
            mass_kg: None,
            ..rider_70kg()
        };
        assert_eq!(
            solver.duration_from_power(5.0, 5.0, 200.0, &rider, DraftingRegime::FullDraft),
            Err(SegmentError::MissingInput {
                field: "rider mass".to_string()
            })
        );
    }

    #[test]
    fn test_cda_fallback_uses_full_draft() {
        let rider = RiderProfile {
            mass_kg: Some(70.0),
            cda: BTreeMap::from([(DraftingRegime::FullDraft, 0.25)]),
        };
        let explicit = RiderProfile::new(70.0, 0.25, 0.25, 0.25);
        let solver = PhysicsSolver::default();

        let fallback = solver
            .power_from_duration(900.0, 5.0, 200.0, &rider, DraftingRegime::NoDraft)
            .unwrap();
        let expected = solver
            .power_from_duration(900.0, 5.0, 200.0, &explicit, DraftingRegime::NoDraft)
            .unwrap();
        assert_eq!(fallback, expected);

        let strict = PhysicsSolver::new(SolverSettings {
            cda_fallback: CdaFallback::Strict,
            ..SolverSettings::default()
        });
        assert!(matches!(
            strict.power_from_duration(900.0, 5.0, 200.0, &rider, DraftingRegime::NoDraft),
            Err(SegmentError::MissingInput { .. })
        ));
    }

    #[test]
    fn test_missing_full_draft_cda() {
        let rider = RiderProfile {
            mass_kg: Some(70.0),
            cda: BTreeMap::from([(DraftingRegime::NoDraft, 0.35)]),
        };
        let result = PhysicsSolver::default().power_from_duration(
            900.0,
            5.0,
            200.0,
            &rider,
            DraftingRegime::SemiDraft,
        );
        assert_eq!(
            result,
            Err(SegmentError::MissingInput {
                field: "CdA for Semi Draft".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_inputs() {
        let solver = PhysicsSolver::default();
        let rider = rider_70kg();
        assert!(matches!(
            solver.power_from_duration(0.0, 5.0, 200.0, &rider, DraftingRegime::FullDraft),
            Err(SegmentError::InvalidParameter { .. })
        ));
        assert!(matches!(
            solver.duration_from_power(-1.0, 5.0, 200.0, &rider, DraftingRegime::FullDraft),
            Err(SegmentError::InvalidParameter { .. })
        ));
        assert!(matches!(
            solver.duration_from_power(5.0, 0.0, 200.0, &rider, DraftingRegime::FullDraft),
            Err(SegmentError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_iteration_cap_reports_divergence() {
        let solver = PhysicsSolver::new(SolverSettings {
            max_iterations: 2,
            tolerance_watts: 1e-12,
            cda_fallback: CdaFallback::FullDraft,
        });
        let result = solver.duration_from_power(5.0, 5.0, 200.0, &rider_70kg(), DraftingRegime::FullDraft);
        assert!(matches!(
            result,
            Err(SegmentError::NumericDivergence { iterations: 2, .. })
        ));
    }

    #[test]
    fn test_solver_settings_validation() {
        assert!(SolverSettings::default().validate().is_ok());

        let no_iterations = SolverSettings {
            max_iterations: 0,
            ..SolverSettings::default()
        };
        assert!(matches!(
            no_iterations.validate(),
            Err(SegmentError::InvalidParameter { ref parameter, .. }) if parameter == "max_iterations"
        ));

        for tolerance_watts in [-1.0, 0.0, f64::NAN] {
            let settings = SolverSettings {
                tolerance_watts,
                ..SolverSettings::default()
            };
            assert!(matches!(
                settings.validate(),
                Err(SegmentError::InvalidParameter { ref parameter, .. }) if parameter == "tolerance_watts"
            ));
        }
    }

    #[test]
    fn test_descent_uses_constant_speed() {
        let solver = PhysicsSolver::default();
        let segment = climb(10.0, 800.0, 400.0);
        let physics = solver
            .apply_duration(&segment, 1.5, DraftingRegime::FullDraft, &rider_70kg(), 60.0)
            .unwrap();
        assert_eq!(physics.duration_s, 600.0);
        assert_eq!(physics.relative_power, 1.5);

        assert!(matches!(
            solver.apply_duration(&segment, 1.5, DraftingRegime::FullDraft, &rider_70kg(), 0.0),
            Err(SegmentError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_climb_uses_physics() {
        let solver = PhysicsSolver::default();
        let segment = climb(5.0, 1000.0, 1200.0);
        let physics = solver
            .apply_duration(&segment, 5.0, DraftingRegime::FullDraft, &rider_70kg(), 60.0)
            .unwrap();
        let direct = solver
            .duration_from_power(5.0, 5.0, 200.0, &rider_70kg(), DraftingRegime::FullDraft)
            .unwrap();
        assert_eq!(physics.duration_s, direct);
    }
}
