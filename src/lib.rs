// Library interface for climbrs
// Integration tests and benches go through these modules

pub mod config;
pub mod drafting;
pub mod error;
pub mod export;
pub mod glycogen;
pub mod import;
pub mod logging;
pub mod models;
pub mod pacing;
pub mod physics;
pub mod pipeline;
pub mod route;
pub mod segmentation;
pub mod signal;

// Re-export commonly used types for convenience
pub use models::*;
pub use config::AppConfig;
pub use drafting::{classify, DraftThreshold, DraftingConfig, DraftingPlan};
pub use error::{ClimbRsError, ImportError, Result, SegmentError};
pub use glycogen::{compute_glycogen_level, EffortSample, GlycogenConfig};
pub use import::ImportManager;
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use pacing::PacingConfig;
pub use physics::{CdaFallback, PhysicsSolver, SolveOutcome, SolveRequest, SolverSettings};
pub use pipeline::{AnalysisConfig, StageAnalyzer};
pub use route::{RawSample, RoutePreprocessor};
pub use segmentation::{MergeStrategy, Segmentation, SegmentationConfig, Segmenter};
