use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::drafting::DraftingConfig;
use crate::error::SegmentError;
use crate::glycogen::GlycogenConfig;
use crate::logging::LogConfig;
use crate::models::{DraftingRegime, RiderProfile};
use crate::pacing::PacingConfig;
use crate::physics::SolverSettings;
use crate::pipeline::AnalysisConfig;
use crate::segmentation::SegmentationConfig;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration metadata
    pub metadata: ConfigMetadata,

    /// Segment generation parameters
    #[serde(default)]
    pub segmentation: SegmentationConfig,

    /// Drafting switch points
    #[serde(default)]
    pub drafting: DraftingConfig,

    /// Rider mass and drag areas
    #[serde(default)]
    pub rider: RiderSettings,

    /// Power targets and descending speed
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Glycogen tracking
    #[serde(default)]
    pub glycogen: GlycogenConfig,

    /// Root finder limits and CdA fallback policy
    #[serde(default)]
    pub solver: SolverSettings,

    /// Logging output
    #[serde(default)]
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Rider settings as stored in the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiderSettings {
    /// Rider mass in kg, without bike
    pub mass_kg: f64,

    /// Drag area per drafting regime in m²
    pub cda: CdaSettings,
}

/// Drag areas per drafting regime; absent entries fall back per the solver policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdaSettings {
    pub full_draft: Option<f64>,
    pub semi_draft: Option<f64>,
    pub no_draft: Option<f64>,
}

impl Default for RiderSettings {
    fn default() -> Self {
        RiderSettings {
            mass_kg: 65.0,
            cda: CdaSettings {
                full_draft: Some(0.2625),
                semi_draft: Some(0.305),
                no_draft: Some(0.35),
            },
        }
    }
}

impl RiderSettings {
    pub fn to_profile(&self) -> RiderProfile {
        let cda: BTreeMap<DraftingRegime, f64> = [
            (DraftingRegime::FullDraft, self.cda.full_draft),
            (DraftingRegime::SemiDraft, self.cda.semi_draft),
            (DraftingRegime::NoDraft, self.cda.no_draft),
        ]
        .into_iter()
        .filter_map(|(regime, value)| value.map(|v| (regime, v)))
        .collect();

        RiderProfile {
            mass_kg: Some(self.mass_kg),
            cda,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), SegmentError> {
        if !self.mass_kg.is_finite() || self.mass_kg <= 0.0 {
            return Err(SegmentError::invalid("rider.mass_kg", self.mass_kg, "must be positive"));
        }
        for (name, value) in [
            ("rider.cda.full_draft", self.cda.full_draft),
            ("rider.cda.semi_draft", self.cda.semi_draft),
            ("rider.cda.no_draft", self.cda.no_draft),
        ] {
            if let Some(value) = value {
                if !value.is_finite() || value <= 0.0 {
                    return Err(SegmentError::invalid(name, value, "must be positive"));
                }
            }
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            segmentation: SegmentationConfig::default(),
            drafting: DraftingConfig::default(),
            rider: RiderSettings::default(),
            pacing: PacingConfig::default(),
            glycogen: GlycogenConfig::default(),
            solver: SolverSettings::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("climbrs")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(
                    path = %config_path.display(),
                    error = %e,
                    "Using default configuration"
                );
                Self::default()
            }
        }
    }

    /// Check every value against its domain
    pub fn validate(&self) -> std::result::Result<(), SegmentError> {
        self.rider.validate()?;
        self.analysis_config().validate()
    }

    /// Pipeline configuration derived from these settings
    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            segmentation: self.segmentation.clone(),
            drafting: self.drafting,
            rider: self.rider.to_profile(),
            pacing: self.pacing.clone(),
            glycogen: self.glycogen,
            solver: self.solver,
        }
    }
}
