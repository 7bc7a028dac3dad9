//! Unified error hierarchy for climbrs
//!
//! Core stages fail with [`SegmentError`]. The pipeline attaches the offending
//! segment index and lifts everything into [`ClimbRsError`], which also covers
//! import, configuration and export failures at the boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the segmentation, drafting, physics and glycogen stages
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SegmentError {
    /// Route has too few points to locate inflection points
    #[error("Route has {points} point(s); at least 2 are required")]
    EmptyTrace { points: usize },

    /// Parameter of unsupported type or outside its domain
    #[error("Invalid parameter {parameter}={value}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Rider profile lacks a value the calculation needs
    #[error("Missing input: {field}")]
    MissingInput { field: String },

    /// Physics solve given both duration and power, or neither
    #[error("Ambiguous input: {reason}")]
    AmbiguousInput { reason: String },

    /// Root finder did not converge within its iteration cap
    #[error("Velocity solve did not converge after {iterations} iterations (residual {residual:.3} W)")]
    NumericDivergence { iterations: usize, residual: f64 },
}

impl SegmentError {
    pub(crate) fn invalid(
        parameter: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        SegmentError::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(field: impl Into<String>) -> Self {
        SegmentError::MissingInput {
            field: field.into(),
        }
    }
}

/// Route import errors
#[derive(Debug, Error)]
pub enum ImportError {
    /// File not found at specified path
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// No importer handles this file
    #[error("Unsupported route format: {path}")]
    UnsupportedFormat { path: PathBuf },

    /// Format-specific parsing error
    #[error("Parse error in {format}: {reason}")]
    ParseError { format: String, reason: String },

    /// A track point lacks a required value
    #[error("Point {index} is missing {field}")]
    MissingField { index: usize, field: String },
}

/// Top-level error type for all climbrs operations
#[derive(Debug, Error)]
pub enum ClimbRsError {
    /// Stage failure not tied to a particular segment
    #[error("{0}")]
    Stage(#[from] SegmentError),

    /// Stage failure for one segment row; `index` is 0-based, the message counts from 1
    #[error("Segment {}: {source}", .index + 1)]
    Segment {
        index: usize,
        #[source]
        source: SegmentError,
    },

    /// Route import errors
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Output serialization errors
    #[error("Export error: {0}")]
    Export(String),
}

/// Result type alias for climbrs operations
pub type Result<T> = std::result::Result<T, ClimbRsError>;

impl ClimbRsError {
    /// Attach a segment index to a stage error
    pub fn at_segment(index: usize, source: SegmentError) -> Self {
        ClimbRsError::Segment { index, source }
    }

    /// Index of the segment that failed, if any
    pub fn segment_index(&self) -> Option<usize> {
        match self {
            ClimbRsError::Segment { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Underlying stage error, if any
    pub fn stage_error(&self) -> Option<&SegmentError> {
        match self {
            ClimbRsError::Stage(source) | ClimbRsError::Segment { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ClimbRsError::Stage(SegmentError::EmptyTrace { .. }) => ErrorSeverity::Warning,
            ClimbRsError::Import(ImportError::FileNotFound { .. }) => ErrorSeverity::Warning,
            ClimbRsError::Stage(SegmentError::NumericDivergence { .. })
            | ClimbRsError::Segment {
                source: SegmentError::NumericDivergence { .. },
                ..
            } => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            ClimbRsError::Import(ImportError::FileNotFound { path }) => {
                format!("Could not find route file: {}", path.display())
            }
            ClimbRsError::Stage(SegmentError::EmptyTrace { points }) => format!(
                "The route has only {} point(s). Load a route with at least two track points.",
                points
            ),
            ClimbRsError::Segment {
                index,
                source: SegmentError::MissingInput { field },
            } => format!(
                "Segment {} could not be computed: the rider profile has no {}.",
                index + 1,
                field
            ),
            ClimbRsError::Segment {
                index,
                source: SegmentError::NumericDivergence { .. },
            } => format!(
                "No realistic speed satisfies the power target on segment {}. Check its power and rider settings.",
                index + 1
            ),
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Numerical failure that leaves the plan unusable
    Critical,
    /// Error that prevents the operation
    Error,
    /// Warning that usually points at bad input
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical | ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = ClimbRsError::Stage(SegmentError::EmptyTrace { points: 1 });
        assert_eq!(err.severity(), ErrorSeverity::Warning);

        let err = ClimbRsError::at_segment(
            3,
            SegmentError::NumericDivergence {
                iterations: 100,
                residual: 12.0,
            },
        );
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_segment_index_is_reported() {
        let err = ClimbRsError::at_segment(4, SegmentError::missing("CdA for No Draft"));
        assert_eq!(err.segment_index(), Some(4));
        assert!(err.to_string().starts_with("Segment 5: "));
        assert!(err.user_message().contains("Segment 5"));

        let first = ClimbRsError::at_segment(0, SegmentError::missing("rider mass"));
        assert!(first.to_string().starts_with("Segment 1: "));
        assert_eq!(first.segment_index(), Some(0));
        assert!(matches!(
            err.stage_error(),
            Some(SegmentError::MissingInput { .. })
        ));
    }

    #[test]
    fn test_user_messages() {
        let err = ClimbRsError::Import(ImportError::FileNotFound {
            path: PathBuf::from("stage-1.gpx"),
        });
        assert!(err.user_message().contains("Could not find"));

        let err = ClimbRsError::from(SegmentError::invalid("min_length_km", -1.0, "must be positive"));
        assert!(err.user_message().contains("min_length_km=-1"));
    }
}
