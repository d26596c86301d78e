use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CacheError, Result};
use crate::hash::slugify;
use crate::warm::DEFAULT_WARM_CAPACITY;
use crate::DEFAULT_PREFIX;

/// Store configuration, loadable from YAML or JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// Application name, slugified into the default prefix
    #[serde(default)]
    pub app_name: Option<String>,

    /// Explicit file-name prefix (default: slug of app name, else "warmcache")
    #[serde(default)]
    pub prefix: Option<String>,

    /// Dedicated cache directory
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Directory of a general file cache, used when no dedicated directory is set
    #[serde(default)]
    pub file_directory: Option<PathBuf>,

    /// Grace window, in seconds, granted to a stale entry while it is recomputed
    #[serde(default = "default_stampede_window")]
    pub stampede_window_secs: u64,

    /// Keep parsed entries in memory for hot reads (default: true)
    #[serde(default = "default_true")]
    pub acceleration: bool,

    /// Parsed entries held in memory before the table is dropped
    #[serde(default = "default_warm_capacity")]
    pub warm_capacity: usize,
}

fn default_true() -> bool {
    true
}

fn default_stampede_window() -> u64 {
    10
}

fn default_warm_capacity() -> usize {
    DEFAULT_WARM_CAPACITY
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            app_name: None,
            prefix: None,
            directory: None,
            file_directory: None,
            stampede_window_secs: default_stampede_window(),
            acceleration: true,
            warm_capacity: DEFAULT_WARM_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// Load configuration from a file; `.json` files are read as JSON, anything else as YAML
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: CacheConfig = if is_json(path) {
            serde_json::from_str(&content).map_err(|e| CacheError::Config(e.to_string()))?
        } else {
            serde_yaml::from_str(&content).map_err(|e| CacheError::Config(e.to_string()))?
        };
        Ok(config)
    }

    /// Write a default configuration file
    pub fn init_file(path: &Path) -> Result<()> {
        let config = CacheConfig::default();

        let text = if is_json(path) {
            serde_json::to_string_pretty(&config).map_err(|e| CacheError::Config(e.to_string()))?
        } else {
            serde_yaml::to_string(&config).map_err(|e| CacheError::Config(e.to_string()))?
        };
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Effective, slugified prefix
    pub fn resolve_prefix(&self) -> String {
        [self.prefix.as_deref(), self.app_name.as_deref()]
            .into_iter()
            .flatten()
            .map(slugify)
            .find(|slug| !slug.is_empty())
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string())
    }

    /// Effective directory: dedicated, then the file cache's, then the temp dir
    pub fn resolve_directory(&self) -> PathBuf {
        self.directory
            .clone()
            .or_else(|| self.file_directory.clone())
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_PREFIX))
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().map(|ext| ext == "json").unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.stampede_window_secs, 10);
        assert!(config.acceleration);
        assert_eq!(config.resolve_prefix(), "warmcache");
        assert_eq!(
            config.resolve_directory(),
            std::env::temp_dir().join("warmcache")
        );
    }

    #[test]
    fn test_serialize_config() {
        let config = CacheConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("stampedeWindowSecs"));
        assert!(json.contains("fileDirectory"));
    }

    #[test]
    fn test_prefix_resolution_order() {
        let config = CacheConfig {
            app_name: Some("Shop Front".to_string()),
            ..CacheConfig::default()
        };
        assert_eq!(config.resolve_prefix(), "shop-front");

        let config = CacheConfig {
            prefix: Some("Tenant 7".to_string()),
            app_name: Some("Shop Front".to_string()),
            ..CacheConfig::default()
        };
        assert_eq!(config.resolve_prefix(), "tenant-7");

        let config = CacheConfig {
            prefix: Some("%%".to_string()),
            app_name: Some("Shop".to_string()),
            ..CacheConfig::default()
        };
        assert_eq!(config.resolve_prefix(), "shop");
    }

    #[test]
    fn test_directory_fallback() {
        let config = CacheConfig {
            file_directory: Some(PathBuf::from("/var/cache/files")),
            ..CacheConfig::default()
        };
        assert_eq!(config.resolve_directory(), PathBuf::from("/var/cache/files"));

        let config = CacheConfig {
            directory: Some(PathBuf::from("/var/cache/warm")),
            file_directory: Some(PathBuf::from("/var/cache/files")),
            ..CacheConfig::default()
        };
        assert_eq!(config.resolve_directory(), PathBuf::from("/var/cache/warm"));
    }

    #[test]
    fn test_yaml_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("warmcache.yaml");
        std::fs::write(&path, "appName: Billing\nacceleration: false\n").unwrap();

        let config = CacheConfig::from_file(&path).unwrap();
        assert_eq!(config.resolve_prefix(), "billing");
        assert!(!config.acceleration);
        assert_eq!(config.stampede_window_secs, 10);
    }

    #[test]
    fn test_init_file_roundtrip_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("warmcache.json");

        CacheConfig::init_file(&path).unwrap();
        let config = CacheConfig::from_file(&path).unwrap();
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("warmcache.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            CacheConfig::from_file(&path),
            Err(CacheError::Config(_))
        ));
    }
}
