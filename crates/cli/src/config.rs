//! Configuration management for the CLI

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// CLI configuration, read from `~/.config/rbench/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Directory searched by `compare` when none is given
    pub results_dir: Option<PathBuf>,
    /// Default output format (`table` or `json`)
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from the default location, if present
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Output format: an explicit flag wins over the configured default
    pub fn resolve_format(&self, flag: Option<OutputFormat>) -> Result<OutputFormat> {
        if let Some(format) = flag {
            return Ok(format);
        }
        match &self.default_format {
            Some(name) => OutputFormat::from_str(name, true)
                .map_err(|e| anyhow::anyhow!("Invalid default_format '{}': {}", name, e)),
            None => Ok(OutputFormat::default()),
        }
    }

    /// Results directory: an explicit argument wins over the configured one
    pub fn resolve_results_dir(&self, arg: Option<PathBuf>) -> PathBuf {
        arg.or_else(|| self.results_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get the configuration file path
    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("rbench").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.resolve_format(None).unwrap(), OutputFormat::Table);
        assert_eq!(config.resolve_results_dir(None), PathBuf::from("."));
    }

    #[test]
    fn test_configured_defaults_and_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{"results_dir": "/srv/results", "default_format": "json"}"#)
            .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.resolve_format(None).unwrap(), OutputFormat::Json);
        assert_eq!(
            config.resolve_format(Some(OutputFormat::Table)).unwrap(),
            OutputFormat::Table
        );
        assert_eq!(config.resolve_results_dir(None), PathBuf::from("/srv/results"));
        assert_eq!(
            config.resolve_results_dir(Some(PathBuf::from("here"))),
            PathBuf::from("here")
        );
    }

    #[test]
    fn test_invalid_default_format() {
        let config = Config {
            default_format: Some("yaml".to_string()),
            ..Config::default()
        };
        assert!(config.resolve_format(None).is_err());
    }
}
