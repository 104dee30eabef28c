use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::errors::{SearchError, SearchResult};

/// Configuration consumed by the search engine.
///
/// # Configuration Locations
///
/// Values are merged from the following files, later ones winning:
/// 1. Global `$HOME/.config/projscout/config.yaml`
/// 2. Local `.projscout.yaml` in the current directory
/// 3. A custom file passed to [`SearchConfig::load_from`]
///
/// # Configuration Format
///
/// ```yaml
/// # Directory names never descended into (bare names, not paths)
/// excluded_dirs: ".git,.svn,target,node_modules"
///
/// # File suffixes never scanned
/// excluded_file_types: ".class,.o,.jar,.png"
///
/// # How to treat files that are not valid UTF-8 (failfast|lossy)
/// encoding_mode: failfast
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "warn"
/// ```
///
/// The exclusion lists are kept as the raw delimiter-separated strings an
/// editor's preferences page stores; [`crate::filters::ExclusionRules`]
/// parses them at the start of every session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Delimiter-separated directory names to skip
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: String,

    /// Delimiter-separated file suffixes to skip
    #[serde(default = "default_excluded_file_types")]
    pub excluded_file_types: String,

    /// How to handle invalid UTF-8 while scanning file contents
    #[serde(default)]
    pub encoding_mode: EncodingMode,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// How the content scanner treats bytes that are not valid UTF-8.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// The file contributes no results (binary files end up here)
    #[default]
    FailFast,
    /// Invalid sequences are replaced with U+FFFD and scanning continues
    Lossy,
}

impl EncodingMode {
    /// Parses the CLI spelling, falling back to `FailFast`.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "lossy" => EncodingMode::Lossy,
            _ => EncodingMode::FailFast,
        }
    }
}

fn default_excluded_dirs() -> String {
    ".git,.svn,.hg,target,node_modules".to_string()
}

fn default_excluded_file_types() -> String {
    ".class,.o,.so,.jar,.png,.jpg,.gif".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            excluded_dirs: default_excluded_dirs(),
            excluded_file_types: default_excluded_file_types(),
            encoding_mode: EncodingMode::default(),
            log_level: default_log_level(),
        }
    }
}

/// The two raw exclusion strings, as handed over by a configuration provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionLists {
    pub excluded_dirs: String,
    pub excluded_file_types: String,
}

/// Values given on the command line; `Some` wins over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub excluded_dirs: Option<String>,
    pub excluded_file_types: Option<String>,
    pub encoding_mode: Option<EncodingMode>,
    pub log_level: Option<String>,
}

impl SearchConfig {
    /// Loads configuration from the default locations
    pub fn load() -> SearchResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus a specific file
    pub fn load_from(config_path: Option<&Path>) -> SearchResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("projscout/config.yaml")),
            Some(PathBuf::from(".projscout.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                debug!("Adding config source {}", path.display());
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit file must exist; the defaults are optional.
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        }

        builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| SearchError::config_error(e.to_string()))
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: ConfigOverrides) -> Self {
        if let Some(dirs) = cli.excluded_dirs {
            self.excluded_dirs = dirs;
        }
        if let Some(types) = cli.excluded_file_types {
            self.excluded_file_types = types;
        }
        if let Some(mode) = cli.encoding_mode {
            self.encoding_mode = mode;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        self
    }

    pub fn exclusion_lists(&self) -> ExclusionLists {
        ExclusionLists {
            excluded_dirs: self.excluded_dirs.clone(),
            excluded_file_types: self.excluded_file_types.clone(),
        }
    }
}

/// Source of configuration for a search session.
///
/// Sessions call [`ConfigProvider::snapshot`] once at start-up, so a
/// preferences change between two searches is picked up by the second one.
pub trait ConfigProvider: Send + Sync {
    fn snapshot(&self) -> SearchConfig;

    fn exclusion_lists(&self) -> ExclusionLists {
        self.snapshot().exclusion_lists()
    }
}

impl ConfigProvider for SearchConfig {
    fn snapshot(&self) -> SearchConfig {
        self.clone()
    }
}

/// Re-reads the YAML configuration files on every snapshot.
#[derive(Debug, Clone, Default)]
pub struct FileConfigProvider {
    config_path: Option<PathBuf>,
    overrides: ConfigOverrides,
}

impl FileConfigProvider {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            overrides: ConfigOverrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

impl ConfigProvider for FileConfigProvider {
    fn snapshot(&self) -> SearchConfig {
        let loaded = SearchConfig::load_from(self.config_path.as_deref()).unwrap_or_else(|e| {
            warn!("Failed to load configuration, using defaults: {}", e);
            SearchConfig::default()
        });
        loaded.merge_with_cli(self.overrides.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let config_content = r#"
            excluded_dirs: ".git,build"
            excluded_file_types: ".bin"
            encoding_mode: lossy
            log_level: "debug"
        "#;
        fs::write(&config_path, config_content).unwrap();

        let config = SearchConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.excluded_dirs, ".git,build");
        assert_eq!(config.excluded_file_types, ".bin");
        assert_eq!(config.encoding_mode, EncodingMode::Lossy);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_default_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        fs::write(&config_path, "log_level: \"info\"\n").unwrap();

        let config = SearchConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.excluded_dirs, default_excluded_dirs());
        assert_eq!(config.excluded_file_types, default_excluded_file_types());
        assert_eq!(config.encoding_mode, EncodingMode::FailFast);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_merge_with_cli() {
        let file_config = SearchConfig {
            excluded_dirs: ".git".to_string(),
            excluded_file_types: ".o".to_string(),
            encoding_mode: EncodingMode::FailFast,
            log_level: "warn".to_string(),
        };

        let merged = file_config.merge_with_cli(ConfigOverrides {
            excluded_dirs: Some("vendor".to_string()),
            encoding_mode: Some(EncodingMode::Lossy),
            ..Default::default()
        });

        assert_eq!(merged.excluded_dirs, "vendor"); // CLI value
        assert_eq!(merged.excluded_file_types, ".o"); // File value
        assert_eq!(merged.encoding_mode, EncodingMode::Lossy);
        assert_eq!(merged.log_level, "warn");
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        fs::write(&config_path, "encoding_mode: [1, 2]\n").unwrap();

        let err = SearchConfig::load_from(Some(&config_path)).unwrap_err();
        assert!(matches!(err, SearchError::ConfigError(_)));
        assert!(err.to_string().starts_with("Configuration error: "));
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let dir = tempdir().unwrap();
        let err = SearchConfig::load_from(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(matches!(err, SearchError::ConfigError(_)));
    }

    #[test]
    fn test_file_provider_degrades_to_defaults() {
        let provider = FileConfigProvider::new(Some(PathBuf::from("nonexistent.yaml")));
        let snapshot = provider.snapshot();
        assert_eq!(snapshot.excluded_dirs, default_excluded_dirs());
    }

    #[test]
    fn test_file_provider_rereads_each_snapshot() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        fs::write(&config_path, "excluded_dirs: \"a\"\n").unwrap();

        let provider = FileConfigProvider::new(Some(config_path.clone()));
        assert_eq!(provider.exclusion_lists().excluded_dirs, "a");

        fs::write(&config_path, "excluded_dirs: \"b\"\n").unwrap();
        assert_eq!(provider.exclusion_lists().excluded_dirs, "b");
    }

    #[test]
    fn test_encoding_mode_parse() {
        assert_eq!(EncodingMode::parse_lenient("LOSSY"), EncodingMode::Lossy);
        assert_eq!(EncodingMode::parse_lenient("failfast"), EncodingMode::FailFast);
        assert_eq!(EncodingMode::parse_lenient("other"), EncodingMode::FailFast);
    }
}
