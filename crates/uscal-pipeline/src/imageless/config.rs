use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use uscal_core::Real;
use uscal_linear::RegistrationMode;

/// Upper bound of the depth an operator can enter, in millimetres.
pub const DEFAULT_MAX_DEPTH_MM: Real = 1000.0;

/// Configuration for the imageless (probe-geometry) calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagelessConfig {
    /// Transform family fitted between image-mm corners and probe landmarks.
    pub registration: RegistrationMode,

    /// Depths above this are reported as improperly specified.
    /// `None` disables the limit.
    pub max_depth_mm: Option<Real>,
}

impl Default for ImagelessConfig {
    fn default() -> Self {
        Self {
            registration: RegistrationMode::Similarity,
            max_depth_mm: Some(DEFAULT_MAX_DEPTH_MM),
        }
    }
}

impl ImagelessConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(max) = self.max_depth_mm {
            ensure!(
                max.is_finite() && max > 0.0,
                "max_depth_mm must be a positive number, got {max}"
            );
        }
        Ok(())
    }

    /// Whether `depth` is within the configured limit.
    pub fn accepts_depth(&self, depth: Real) -> bool {
        self.max_depth_mm.is_none_or(|max| depth <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = ImagelessConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.registration, RegistrationMode::Similarity);
        assert!(config.accepts_depth(1000.0));
        assert!(!config.accepts_depth(1000.5));
    }

    #[test]
    fn rejects_non_positive_limit() {
        let config = ImagelessConfig {
            max_depth_mm: Some(0.0),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_depth_mm"));

        let unlimited = ImagelessConfig {
            max_depth_mm: None,
            ..Default::default()
        };
        assert!(unlimited.validate().is_ok());
        assert!(unlimited.accepts_depth(5000.0));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: ImagelessConfig = serde_json::from_str(r#"{"registration":"Rigid"}"#).unwrap();
        assert_eq!(config.registration, RegistrationMode::Rigid);
        assert_eq!(config.max_depth_mm, Some(DEFAULT_MAX_DEPTH_MM));
    }
}
