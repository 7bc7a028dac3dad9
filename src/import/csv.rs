use csv::ReaderBuilder;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use crate::error::{ImportError, Result};
use crate::import::{has_extension, ImportFormat};
use crate::models::Route;
use crate::route::{RawSample, RoutePreprocessor};

/// One CSV row; the distance and smoothed columns are optional
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    longitude: f64,
    #[serde(alias = "ele", alias = "altitude")]
    elevation: f64,
    #[serde(default)]
    distance_km: Option<f64>,
    #[serde(default)]
    smoothed_elevation: Option<f64>,
}

/// CSV importer for already-processed traces
///
/// Requires `latitude`, `longitude` and `elevation`. When every row carries
/// `distance_km` the distances are used as given; when every row carries
/// `smoothed_elevation` smoothing is skipped.
#[derive(Debug, Default)]
pub struct CsvImporter;

impl CsvImporter {
    pub fn new() -> Self {
        Self
    }

    pub fn read_route<R: Read>(&self, reader: R, preprocessor: &RoutePreprocessor) -> Result<Route> {
        let mut csv_reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let mut rows = Vec::new();
        for (index, record) in csv_reader.deserialize::<CsvRow>().enumerate() {
            let row = record.map_err(|e| parse_error(format!("row {}: {}", index + 1, e)))?;
            rows.push(row);
        }

        let samples: Vec<RawSample> = rows
            .iter()
            .map(|row| RawSample {
                latitude: row.latitude,
                longitude: row.longitude,
                elevation: row.elevation,
            })
            .collect();

        let distances: Option<Vec<f64>> = rows.iter().map(|row| row.distance_km).collect();
        let Some(distances) = distances else {
            return Ok(preprocessor.build(&samples));
        };

        if let Some(index) = distances.windows(2).position(|w| w[1] < w[0]) {
            return Err(parse_error(format!(
                "distance_km decreases at row {}",
                index + 2
            )));
        }

        let smoothed: Option<Vec<f64>> = rows.iter().map(|row| row.smoothed_elevation).collect();
        let route = match smoothed {
            Some(smoothed) => preprocessor.assemble(&samples, &distances, &smoothed)?,
            None => preprocessor.build_with_distances(&samples, &distances)?,
        };
        Ok(route)
    }
}

fn parse_error(reason: String) -> crate::error::ClimbRsError {
    ImportError::ParseError {
        format: "CSV".to_string(),
        reason,
    }
    .into()
}

impl ImportFormat for CsvImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        has_extension(file_path, "csv")
    }

    fn import_file(&self, file_path: &Path, preprocessor: &RoutePreprocessor) -> Result<Route> {
        let file = std::fs::File::open(file_path)?;
        self.read_route(file, preprocessor)
    }

    fn get_format_name(&self) -> &'static str {
        "CSV"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClimbRsError;

    #[test]
    fn test_precomputed_columns_are_kept() {
        let data = "latitude,longitude,elevation,distance_km,smoothed_elevation\n\
                    45.0,6.0,100,0.0,101\n\
                    45.0,6.0,110,0.5,109\n\
                    45.0,6.0,130,1.0,128\n";
        let route = CsvImporter::new()
            .read_route(data.as_bytes(), &RoutePreprocessor::default())
            .unwrap();

        assert_eq!(route.len(), 3);
        assert_eq!(route.distance_at(2), 1.0);
        assert_eq!(route.smoothed_elevations(), vec![101.0, 109.0, 128.0]);
        assert_eq!(route.points()[1].elevation_diff, 10.0);
    }

    #[test]
    fn test_distances_computed_when_absent() {
        let data = "lat,lon,ele\n45.0,6.0,100\n45.01,6.0,120\n";
        let route = CsvImporter::new()
            .read_route(data.as_bytes(), &RoutePreprocessor::new(0.0))
            .unwrap();

        // 0.01 degrees of latitude is about 1.11 km
        assert!((route.distance_at(1) - 1.113).abs() < 0.01);
        assert_eq!(route.smoothed_elevations(), vec![100.0, 120.0]);
    }

    #[test]
    fn test_decreasing_distance_rejected() {
        let data = "latitude,longitude,elevation,distance_km\n\
                    45.0,6.0,100,1.0\n\
                    45.0,6.0,110,0.5\n";
        let err = CsvImporter::new()
            .read_route(data.as_bytes(), &RoutePreprocessor::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ClimbRsError::Import(ImportError::ParseError { .. })
        ));
    }

    #[test]
    fn test_bad_number_reports_row() {
        let data = "latitude,longitude,elevation\n45.0,6.0,high\n";
        let err = CsvImporter::new()
            .read_route(data.as_bytes(), &RoutePreprocessor::default())
            .unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }
}
