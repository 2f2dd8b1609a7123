//! Kiosk configuration loaded from a TOML file.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields the stock kiosk setup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use triage_kiosk_vision::DistanceMetric;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Which face drives the triage panel when several are in frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectPolicy {
    /// The face with the largest bounding box (closest to the camera)
    #[default]
    LargestFace,
    /// The last face the detector reported
    LastFace,
}

/// Top-level kiosk configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    pub storage: StorageConfig,
    pub recognition: RecognitionConfig,
    pub enrollment: EnrollmentConfig,
    pub panel: PanelConfig,
}

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database holding all stores
    pub database_path: PathBuf,
    /// Root directory for enrollment capture images
    pub enrollment_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("triage_kiosk.db"),
            enrollment_dir: PathBuf::from("known_faces"),
        }
    }
}

/// `[recognition]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Maximum distance for a stored face to count as a match
    pub tolerance: f64,
    /// Downscale factor applied before detection
    pub frame_scale: f64,
    pub distance: DistanceMetric,
    pub subject_policy: SubjectPolicy,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.6,
            frame_scale: 0.25,
            distance: DistanceMetric::Euclidean,
            subject_policy: SubjectPolicy::LargestFace,
        }
    }
}

/// `[enrollment]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollmentConfig {
    /// Accepted single-face captures per enrollment
    pub captures: usize,
    /// Attempts (accepted or not) before a session gives up
    pub max_attempts: usize,
    /// Accepted captures needed to average when attempts run out
    pub min_captures: usize,
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            captures: 5,
            max_attempts: 25,
            min_captures: 1,
        }
    }
}

/// `[panel]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Character columns available for wrapped history text
    pub wrap_columns: usize,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self { wrap_columns: 36 }
    }
}

impl KioskConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            log::warn!("{} not found. Using default configuration.", path.display());
            Ok(Self::default())
        }
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: KioskConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        let r = &self.recognition;
        if !(0.0..=1.0).contains(&r.tolerance) {
            return Err(ConfigError::Invalid(format!(
                "recognition.tolerance must be within [0, 1], got {}",
                r.tolerance
            )));
        }
        if !(r.frame_scale > 0.0 && r.frame_scale <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "recognition.frame_scale must be within (0, 1], got {}",
                r.frame_scale
            )));
        }

        let e = &self.enrollment;
        if e.captures == 0 {
            return Err(ConfigError::Invalid(
                "enrollment.captures must be at least 1".into(),
            ));
        }
        if e.min_captures == 0 || e.min_captures > e.captures {
            return Err(ConfigError::Invalid(format!(
                "enrollment.min_captures must be within 1..={}, got {}",
                e.captures, e.min_captures
            )));
        }
        if e.max_attempts < e.captures {
            return Err(ConfigError::Invalid(format!(
                "enrollment.max_attempts ({}) must be at least enrollment.captures ({})",
                e.max_attempts, e.captures
            )));
        }

        if self.panel.wrap_columns < 8 {
            return Err(ConfigError::Invalid(
                "panel.wrap_columns must be at least 8".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KioskConfig::from_toml_str("").unwrap();
        assert_eq!(config.recognition.tolerance, 0.6);
        assert_eq!(config.recognition.frame_scale, 0.25);
        assert_eq!(config.enrollment.captures, 5);
        assert_eq!(config.recognition.subject_policy, SubjectPolicy::LargestFace);
        assert_eq!(config.recognition.distance, DistanceMetric::Euclidean);
    }

    #[test]
    fn test_partial_override() {
        let config = KioskConfig::from_toml_str(
            r#"
            [recognition]
            tolerance = 0.45
            subject_policy = "last_face"
            distance = "cosine"

            [storage]
            database_path = "/var/lib/kiosk/kiosk.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.recognition.tolerance, 0.45);
        assert_eq!(config.recognition.frame_scale, 0.25);
        assert_eq!(config.recognition.subject_policy, SubjectPolicy::LastFace);
        assert_eq!(config.recognition.distance, DistanceMetric::Cosine);
        assert_eq!(
            config.storage.database_path,
            PathBuf::from("/var/lib/kiosk/kiosk.db")
        );
        assert_eq!(config.storage.enrollment_dir, PathBuf::from("known_faces"));
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(KioskConfig::from_toml_str("[recognition]\ntolerance = 1.5").is_err());
        assert!(KioskConfig::from_toml_str("[recognition]\nframe_scale = 0.0").is_err());
        assert!(KioskConfig::from_toml_str("[enrollment]\ncaptures = 0").is_err());
        assert!(KioskConfig::from_toml_str("[enrollment]\nmin_captures = 6").is_err());
        assert!(KioskConfig::from_toml_str("[enrollment]\nmax_attempts = 3").is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let result = KioskConfig::from_toml_str("[recognition\ntolerance = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
