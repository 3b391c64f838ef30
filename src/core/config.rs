//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::import::pipeline::InputFiles;

const DEFAULT_URL: &str = "http://localhost/targetprocess";
const DEFAULT_FILE: &str = "Projects_List.csv";
const DEFAULT_LOG_FILE: &str = "import.log";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("invalid config file {path}: {message}")]
    Parse { path: String, message: String },
}

/// tp-import configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Targetprocess base URL (without `/api`)
    pub url: Option<String>,

    /// API access token
    pub token: Option<String>,

    /// CSV export read by every stage without its own file
    pub file: Option<PathBuf>,

    /// Per-stage CSV files keyed by resource or entity name
    pub stage_files: HashMap<String, PathBuf>,

    /// Log file receiving diagnostics
    pub log_file: Option<PathBuf>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Registry file replacing the built-in entity types
    pub registry: Option<PathBuf>,

    /// Look up entity-type ids remotely before importing
    pub discover_type_ids: Option<bool>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // 1. Built-in defaults (accessors below)

        // 2. Global user config (~/.config/tp-import/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                if let Ok(global) = Self::read(&global_path) {
                    config.merge(global);
                }
            }
        }

        // 3. Explicit --config file; unlike the global file this must be valid
        if let Some(path) = explicit {
            config.merge(Self::read(path)?);
        }

        // 4. Environment variables
        config.merge_env(|key| std::env::var(key).ok());

        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_yml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "tp-import")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    fn merge_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("TP_IMPORT_URL") {
            self.url = Some(url);
        }
        if let Some(token) = var("TP_IMPORT_TOKEN") {
            self.token = Some(token);
        }
        if let Some(file) = var("TP_IMPORT_FILE") {
            self.file = Some(PathBuf::from(file));
        }
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        if other.url.is_some() {
            self.url = other.url;
        }
        if other.token.is_some() {
            self.token = other.token;
        }
        if other.file.is_some() {
            self.file = other.file;
        }
        self.stage_files.extend(other.stage_files);
        if other.log_file.is_some() {
            self.log_file = other.log_file;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if other.registry.is_some() {
            self.registry = other.registry;
        }
        if other.discover_type_ids.is_some() {
            self.discover_type_ids = other.discover_type_ids;
        }
    }

    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_URL)
    }

    pub fn token(&self) -> &str {
        self.token.as_deref().unwrap_or("")
    }

    pub fn file(&self) -> PathBuf {
        self.file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE))
    }

    /// CSV inputs: the shared file plus any per-stage files
    pub fn input_files(&self) -> InputFiles {
        self.stage_files
            .iter()
            .fold(InputFiles::single(&self.file()), |files, (stage, path)| {
                files.with_override(stage, path)
            })
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn discover_type_ids(&self) -> bool {
        self.discover_type_ids.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.url(), "http://localhost/targetprocess");
        assert_eq!(config.token(), "");
        assert_eq!(config.file(), PathBuf::from("Projects_List.csv"));
        assert_eq!(config.log_file(), PathBuf::from("import.log"));
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(!config.discover_type_ids());
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut config = Config {
            url: Some("http://a".to_string()),
            token: Some("t1".to_string()),
            ..Config::default()
        };
        config.merge(Config {
            url: Some("http://b".to_string()),
            ..Config::default()
        });
        assert_eq!(config.url(), "http://b");
        assert_eq!(config.token(), "t1");
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config {
            url: Some("http://file".to_string()),
            ..Config::default()
        };
        config.merge_env(|key| match key {
            "TP_IMPORT_URL" => Some("http://env".to_string()),
            "TP_IMPORT_TOKEN" => Some("env-token".to_string()),
            _ => None,
        });
        assert_eq!(config.url(), "http://env");
        assert_eq!(config.token(), "env-token");
        assert_eq!(config.file(), PathBuf::from("Projects_List.csv"));
    }

    #[test]
    fn test_stage_file_lookup() {
        use crate::core::registry::{EntityTypeIds, Registry};

        let yaml = "file: all.csv\nstage_files:\n  epics: epics.csv\n  feature: features.csv\n";
        let config: Config = serde_yml::from_str(yaml).unwrap();
        let files = config.input_files();
        let registry = Registry::targetprocess(EntityTypeIds::default());
        assert_eq!(
            files.for_stage(registry.get("epic").unwrap()),
            Path::new("epics.csv")
        );
        assert_eq!(
            files.for_stage(registry.get("features").unwrap()),
            Path::new("features.csv")
        );
        assert_eq!(
            files.for_stage(registry.get("program").unwrap()),
            Path::new("all.csv")
        );
    }

    #[test]
    fn test_explicit_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "url: [not, a, string").unwrap();
        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }
}
