//! Route file import
//!
//! Each importer turns a file into raw track samples and hands them to the
//! [`RoutePreprocessor`] for distances, smoothing and gradients.

use std::path::Path;
use tracing::{debug, info};

use crate::error::{ImportError, Result};
use crate::models::Route;
use crate::route::RoutePreprocessor;

pub mod csv;
pub mod gpx;

/// Trait for importing route data from different file formats
pub trait ImportFormat {
    /// Check if this importer can handle the given file
    fn can_import(&self, file_path: &Path) -> bool;

    /// Import the route stored in the file
    fn import_file(&self, file_path: &Path, preprocessor: &RoutePreprocessor) -> Result<Route>;

    /// Get the format name for this importer
    fn get_format_name(&self) -> &'static str;
}

/// Manager for coordinating different import formats
pub struct ImportManager {
    importers: Vec<Box<dyn ImportFormat + Send + Sync>>,
    preprocessor: RoutePreprocessor,
}

impl Default for ImportManager {
    fn default() -> Self {
        Self::new(RoutePreprocessor::default())
    }
}

impl ImportManager {
    /// Create a new import manager with all available importers
    pub fn new(preprocessor: RoutePreprocessor) -> Self {
        let importers: Vec<Box<dyn ImportFormat + Send + Sync>> = vec![
            Box::new(gpx::GpxImporter::new()),
            Box::new(csv::CsvImporter::new()),
        ];

        Self {
            importers,
            preprocessor,
        }
    }

    /// Import a single file, auto-detecting the format by extension
    pub fn import_file(&self, file_path: &Path) -> Result<Route> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound {
                path: file_path.to_path_buf(),
            }
            .into());
        }

        let importer = self
            .importers
            .iter()
            .find(|importer| importer.can_import(file_path))
            .ok_or_else(|| ImportError::UnsupportedFormat {
                path: file_path.to_path_buf(),
            })?;

        info!(
            path = %file_path.display(),
            format = importer.get_format_name(),
            "Importing route"
        );
        let route = importer.import_file(file_path, &self.preprocessor)?;
        debug!(points = route.len(), "Route imported");
        Ok(route)
    }

    /// Names of every supported format
    pub fn supported_formats(&self) -> Vec<&'static str> {
        self.importers.iter().map(|i| i.get_format_name()).collect()
    }
}

/// True when the file extension matches `expected`, ignoring case
pub(crate) fn has_extension(file_path: &Path, expected: &str) -> bool {
    file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}
