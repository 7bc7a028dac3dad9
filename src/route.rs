//! Route preprocessing
//!
//! Turns raw `{latitude, longitude, elevation}` samples into the route table the
//! segmenter consumes: cumulative haversine distance, per-point elevation deltas and
//! gradients, and a Gaussian-smoothed elevation curve.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SegmentError;
use crate::models::{Route, RoutePoint};

/// Earth radius used for point-to-point distances, in meters
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Default Gaussian kernel standard deviation, in samples
pub const DEFAULT_SMOOTHING_SIGMA: f64 = 2.0;

/// Kernel half-width in standard deviations
const KERNEL_TRUNCATE: f64 = 4.0;

/// A raw track sample as read from a route file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
}

/// Builds a [`Route`] from raw samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutePreprocessor {
    /// Gaussian smoothing sigma in samples; 0 disables smoothing
    pub smoothing_sigma: f64,
}

impl Default for RoutePreprocessor {
    fn default() -> Self {
        Self {
            smoothing_sigma: DEFAULT_SMOOTHING_SIGMA,
        }
    }
}

impl RoutePreprocessor {
    pub fn new(smoothing_sigma: f64) -> Self {
        Self { smoothing_sigma }
    }

    /// Compute distances and smoothing for raw samples
    pub fn build(&self, samples: &[RawSample]) -> Route {
        let mut distances = Vec::with_capacity(samples.len());
        let mut total_m = 0.0;
        for (i, sample) in samples.iter().enumerate() {
            if i > 0 {
                let prev = &samples[i - 1];
                total_m += haversine_distance(
                    prev.latitude,
                    prev.longitude,
                    sample.latitude,
                    sample.longitude,
                );
            }
            distances.push(total_m / 1000.0);
        }

        let smoothed = self.smooth(samples);
        assemble_columns(samples, &distances, &smoothed)
    }

    /// Like [`build`](Self::build) but with cumulative distances (km) already known
    pub fn build_with_distances(
        &self,
        samples: &[RawSample],
        distances_km: &[f64],
    ) -> Result<Route, SegmentError> {
        check_column("distance_km", distances_km.len(), samples.len())?;
        let smoothed = self.smooth(samples);
        Ok(assemble_columns(samples, distances_km, &smoothed))
    }

    /// Assemble a route from fully precomputed columns
    pub fn assemble(
        &self,
        samples: &[RawSample],
        distances_km: &[f64],
        smoothed: &[f64],
    ) -> Result<Route, SegmentError> {
        check_column("distance_km", distances_km.len(), samples.len())?;
        check_column("smoothed_elevation", smoothed.len(), samples.len())?;
        Ok(assemble_columns(samples, distances_km, smoothed))
    }

    fn smooth(&self, samples: &[RawSample]) -> Vec<f64> {
        let elevations: Vec<f64> = samples.iter().map(|s| s.elevation).collect();
        gaussian_filter(&elevations, self.smoothing_sigma)
    }
}

fn check_column(column: &str, len: usize, expected: usize) -> Result<(), SegmentError> {
    if len != expected {
        return Err(SegmentError::invalid(
            column,
            format!("{} values", len),
            format!("expected one per sample ({})", expected),
        ));
    }
    Ok(())
}

/// Columns must all have one entry per sample
fn assemble_columns(samples: &[RawSample], distances_km: &[f64], smoothed: &[f64]) -> Route {
    let points: Vec<RoutePoint> = samples
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            let (elevation_diff, gradient) = if i == 0 {
                (0.0, 0.0)
            } else {
                let elevation_diff = sample.elevation - samples[i - 1].elevation;
                let distance_m = (distances_km[i] - distances_km[i - 1]) * 1000.0;
                (elevation_diff, gradient(elevation_diff, distance_m))
            };
            RoutePoint {
                latitude: sample.latitude,
                longitude: sample.longitude,
                elevation: sample.elevation,
                distance_km: distances_km[i],
                smoothed_elevation: smoothed[i],
                elevation_diff,
                gradient,
            }
        })
        .collect();

    debug!(
        points = points.len(),
        distance_km = points.last().map_or(0.0, |p| p.distance_km),
        "Route preprocessed"
    );

    Route::from_points(points)
}

/// Great-circle distance in meters
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

fn gradient(elevation_diff: f64, distance_m: f64) -> f64 {
    if distance_m == 0.0 {
        return 0.0;
    }
    elevation_diff / distance_m * 100.0
}

/// One-dimensional Gaussian filter with mirrored (`d c b a | a b c d | d c b a`) edges
pub fn gaussian_filter(data: &[f64], sigma: f64) -> Vec<f64> {
    if data.is_empty() || sigma <= 0.0 {
        return data.to_vec();
    }

    let radius = (KERNEL_TRUNCATE * sigma + 0.5) as isize;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|k| (-0.5 * (k as f64 / sigma).powi(2)).exp())
        .collect();
    let norm: f64 = weights.iter().sum();

    let n = data.len() as isize;
    (0..n)
        .map(|i| {
            let weighted: f64 = (-radius..=radius)
                .zip(&weights)
                .map(|(k, w)| data[reflect_index(i + k, n)] * w)
                .sum();
            weighted / norm
        })
        .collect()
}

fn reflect_index(index: isize, len: isize) -> usize {
    let period = 2 * len;
    let k = index.rem_euclid(period);
    if k >= len {
        (period - 1 - k) as usize
    } else {
        k as usize
    }
}
