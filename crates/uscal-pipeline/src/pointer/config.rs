use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use uscal_linear::{MIN_CORRESPONDENCES, RegistrationMode};

/// Configuration for the pointer-based (point-pair) calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerConfig {
    pub registration: RegistrationMode,

    /// Pairs required before a fit is attempted. At least 3.
    pub min_pairs: usize,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            registration: RegistrationMode::Similarity,
            min_pairs: MIN_CORRESPONDENCES,
        }
    }
}

impl PointerConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.min_pairs >= MIN_CORRESPONDENCES,
            "min_pairs must be at least {MIN_CORRESPONDENCES}, got {}",
            self.min_pairs
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_pairs_below_three_is_rejected() {
        assert!(PointerConfig::default().validate().is_ok());
        let config = PointerConfig {
            min_pairs: 2,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_pairs"));
    }

    #[test]
    fn config_json_roundtrip() {
        let config = PointerConfig {
            registration: RegistrationMode::Rigid,
            min_pairs: 6,
        };
        let json = serde_json::to_string_pretty(&config).unwrap();
        let restored: PointerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }
}
