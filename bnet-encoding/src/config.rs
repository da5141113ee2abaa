//! Codec configuration.
//!
//! Configuration is resolved in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if loaded via [`CodecConfig::from_file`] or BNET_CONFIG)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default upper bound for a decoded sequence's element count.
pub const DEFAULT_MAX_SEQUENCE_LEN: usize = 65_535;

/// Default upper bound for message nesting while decoding.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Limits applied while decoding untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Largest element count a `len-` binding may resolve to.
    pub max_sequence_len: usize,
    /// Deepest message nesting accepted.
    pub max_depth: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_sequence_len: DEFAULT_MAX_SEQUENCE_LEN,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl CodecConfig {
    /// Loads configuration from the file named by BNET_CONFIG (if set), then
    /// applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("BNET_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: CodecConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(max) = std::env::var("BNET_MAX_SEQUENCE_LEN") {
            if let Ok(n) = max.parse() {
                self.max_sequence_len = n;
            }
        }

        if let Ok(depth) = std::env::var("BNET_MAX_DEPTH") {
            if let Ok(n) = depth.parse() {
                self.max_depth = n;
            }
        }
    }

    /// Rejects limits that would make every message undecodable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::ValidationError(
                "max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_max_sequence_len(mut self, max: usize) -> Self {
        self.max_sequence_len = max;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CodecConfig::default();
        assert_eq!(config.max_sequence_len, 65_535);
        assert_eq!(config.max_depth, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = CodecConfig::default()
            .with_max_sequence_len(10)
            .with_max_depth(3);
        assert_eq!(config.max_sequence_len, 10);
        assert_eq!(config.max_depth, 3);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = CodecConfig::default().with_max_sequence_len(128);
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: CodecConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let parsed: CodecConfig = serde_yaml::from_str("max_depth: 8\n").unwrap();
        assert_eq!(parsed.max_depth, 8);
        assert_eq!(parsed.max_sequence_len, DEFAULT_MAX_SEQUENCE_LEN);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_sequence_len: 16").unwrap();
        writeln!(file, "max_depth: 4").unwrap();

        let config = CodecConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_sequence_len, 16);
        assert_eq!(config.max_depth, 4);
    }

    #[test]
    fn test_from_file_missing() {
        let result = CodecConfig::from_file("/nonexistent/bnet.yaml");
        assert!(matches!(result, Err(ConfigError::IoError(..))));
    }

    #[test]
    fn test_from_file_rejects_zero_depth() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_depth: 0").unwrap();

        let result = CodecConfig::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_from_file_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_depth: [not, a, number]").unwrap();

        let err = CodecConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }
}
