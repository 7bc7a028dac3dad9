use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{ImportError, Result};
use crate::import::{has_extension, ImportFormat};
use crate::models::Route;
use crate::route::{RawSample, RoutePreprocessor};

/// GPX importer reading track points of every track and segment in order
#[derive(Debug, Default)]
pub struct GpxImporter;

impl GpxImporter {
    pub fn new() -> Self {
        Self
    }

    /// Raw samples from GPX content; every point needs an elevation
    pub fn read_samples<R: std::io::Read>(&self, reader: R) -> Result<Vec<RawSample>> {
        let data = gpx::read(reader).map_err(|e| ImportError::ParseError {
            format: "GPX".to_string(),
            reason: e.to_string(),
        })?;

        let mut samples = Vec::new();
        for point in data
            .tracks
            .iter()
            .flat_map(|track| track.segments.iter())
            .flat_map(|segment| segment.points.iter())
        {
            let elevation = point.elevation.ok_or_else(|| ImportError::MissingField {
                index: samples.len(),
                field: "elevation".to_string(),
            })?;
            samples.push(RawSample {
                latitude: point.point().y(),
                longitude: point.point().x(),
                elevation,
            });
        }

        Ok(samples)
    }
}

impl ImportFormat for GpxImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        has_extension(file_path, "gpx")
    }

    fn import_file(&self, file_path: &Path, preprocessor: &RoutePreprocessor) -> Result<Route> {
        let file = File::open(file_path)?;
        let samples = self.read_samples(BufReader::new(file))?;
        Ok(preprocessor.build(&samples))
    }

    fn get_format_name(&self) -> &'static str {
        "GPX"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClimbRsError;

    const STAGE_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="climbrs-test">
  <trk>
    <name>Col test</name>
    <trkseg>
      <trkpt lat="45.000" lon="6.000"><ele>700</ele></trkpt>
      <trkpt lat="45.001" lon="6.000"><ele>705</ele></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="45.002" lon="6.000"><ele>712</ele></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    #[test]
    fn test_reads_all_segments_in_order() {
        let samples = GpxImporter::new().read_samples(STAGE_GPX.as_bytes()).unwrap();
        assert_eq!(samples.len(), 3);
        assert!((samples[0].latitude - 45.0).abs() < 1e-9);
        assert!((samples[0].longitude - 6.0).abs() < 1e-9);
        assert_eq!(samples[2].elevation, 712.0);
    }

    #[test]
    fn test_missing_elevation() {
        let gpx = STAGE_GPX.replace("<ele>705</ele>", "");
        let err = GpxImporter::new().read_samples(gpx.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ClimbRsError::Import(ImportError::MissingField { index: 1, .. })
        ));
    }

    #[test]
    fn test_malformed_xml() {
        let err = GpxImporter::new().read_samples("<gpx><trk>".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ClimbRsError::Import(ImportError::ParseError { .. })
        ));
    }
}
