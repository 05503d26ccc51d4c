//! Ranking configuration.
//!
//! Search behavior - the default mode, per-signal weights, and result
//! limit - is loaded from a TOML file with every field optional, so a
//! partial file overrides only what it names. The file is re-read on
//! demand rather than watched; callers reload between requests when they
//! want edits picked up without a restart.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::query::{SearchMode, SignalWeights};

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for this schema
    #[error("Cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The parsed values fail validation
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

fn default_mode() -> SearchMode {
    SearchMode::Fused
}

fn default_result_limit() -> usize {
    20
}

/// Search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RankingConfig {
    /// Default search mode when a query does not specify one
    pub mode: SearchMode,

    /// Per-signal fusion weights
    pub weights: SignalWeights,

    /// Maximum results returned per query
    pub result_limit: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            weights: SignalWeights::default(),
            result_limit: default_result_limit(),
        }
    }
}

impl RankingConfig {
    /// Load and validate configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the TOML file
    ///
    /// # Errors
    /// Returns `ConfigError::Io` if the file cannot be read,
    /// `ConfigError::Parse` if it is not valid TOML, or
    /// `ConfigError::Invalid` if a value is out of range
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&data)?;
        config.validate()?;
        info!(path = %path.display(), "loaded ranking config");
        Ok(config)
    }

    /// Validate value ranges.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if any weight is negative or
    /// non-finite, or if the result limit is zero
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, value) in [
            ("weights.lexical", self.weights.lexical),
            ("weights.semantic", self.weights.semantic),
            ("weights.exact", self.weights.exact),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if self.result_limit == 0 {
            return Err(ConfigError::Invalid(
                "result_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ranking.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_defaults() {
        let config = RankingConfig::default();
        assert_eq!(config.mode, SearchMode::Fused);
        assert_eq!(config.result_limit, 20);
        assert_eq!(config.weights, SignalWeights::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_file_overrides_only_named_fields() {
        let (_dir, path) = write_config(
            r#"
            mode = "lexical"

            [weights]
            semantic = 0.5
            "#,
        );
        let config = RankingConfig::load(&path).unwrap();
        assert_eq!(config.mode, SearchMode::Lexical);
        assert_eq!(config.weights.semantic, 0.5);
        assert_eq!(config.weights.lexical, 1.0);
        assert_eq!(config.result_limit, 20);
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let (_dir, path) = write_config(
            r#"
            [weights]
            exact = -1.0
            "#,
        );
        assert!(matches!(
            RankingConfig::load(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let (_dir, path) = write_config("result_limit = 0");
        assert!(matches!(
            RankingConfig::load(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let (_dir, path) = write_config("surprise = true");
        assert!(matches!(
            RankingConfig::load(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_reload_picks_up_edits() {
        let (_dir, path) = write_config("result_limit = 10");
        assert_eq!(RankingConfig::load(&path).unwrap().result_limit, 10);

        std::fs::write(&path, "result_limit = 50").unwrap();
        assert_eq!(RankingConfig::load(&path).unwrap().result_limit, 50);
    }
}
