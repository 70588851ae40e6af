//! Centralized configuration for forge-mirror.
//!
//! Fixed parameters live as constants on unit structs; the runtime settings
//! an operator can change are loaded from a JSON file into [`MirrorConfig`].

use crate::error::{MirrorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// LFS-related constants.
pub struct LfsConfig;

impl LfsConfig {
    pub const POINTER_VERSION: &'static str = "version https://git-lfs.github.com/spec/v1";
    pub const POINTER_OID_PREFIX: &'static str = "oid sha256:";
    pub const POINTER_SIZE_PREFIX: &'static str = "size ";
    /// Blobs at or above this size cannot be pointer files.
    pub const POINTER_BLOB_MAX_SIZE: i64 = 1024;
    pub const DEFAULT_BATCH_SIZE: usize = 20;
    pub const DEFAULT_SCAN_CHANNEL_CAPACITY: usize = 256;
    pub const CONTENT_TEMP_DIR_NAME: &'static str = "tmp";
    pub const COPY_CHUNK_SIZE: usize = 64 * 1024;
}

/// SQLite connection settings.
pub struct DatabaseConfig;

impl DatabaseConfig {
    pub const BUSY_TIMEOUT: Duration = Duration::from_secs(30);
    /// Ids per `DELETE ... IN (...)` statement, kept below SQLite's bound
    /// parameter limit.
    pub const DELETE_CHUNK_SIZE: usize = 500;
    pub const DEFAULT_DATABASE_FILENAME: &'static str = "forge-mirror.sqlite";
}

/// Git invocation settings.
pub struct GitConfig;

impl GitConfig {
    pub const GIT_BINARY: &'static str = "git";
    pub const WIKI_URL_SUFFIXES: [&'static str; 2] = [".wiki.git", ".git/wiki"];
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const QUICK_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
    pub const USER_AGENT: &'static str = concat!("forge-mirror/", env!("CARGO_PKG_VERSION"));
}

fn default_batch_size() -> usize {
    LfsConfig::DEFAULT_BATCH_SIZE
}

fn default_scan_channel_capacity() -> usize {
    LfsConfig::DEFAULT_SCAN_CHANNEL_CAPACITY
}

fn default_content_path() -> PathBuf {
    PathBuf::from("lfs")
}

fn default_database_path() -> PathBuf {
    PathBuf::from(DatabaseConfig::DEFAULT_DATABASE_FILENAME)
}

/// LFS backfill settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LfsSettings {
    /// Root of the content-addressed object store.
    #[serde(default = "default_content_path")]
    pub content_path: PathBuf,
    /// Largest object that will be fetched from upstream (<= 0 = unlimited).
    #[serde(default)]
    pub max_file_size: i64,
    /// Preferred number of objects per upstream download call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Bound of the scanner -> consumer pointer channel.
    #[serde(default = "default_scan_channel_capacity")]
    pub scan_channel_capacity: usize,
}

impl Default for LfsSettings {
    fn default() -> Self {
        Self {
            content_path: default_content_path(),
            max_file_size: 0,
            batch_size: default_batch_size(),
            scan_channel_capacity: default_scan_channel_capacity(),
        }
    }
}

impl LfsSettings {
    /// Whether an object of `size` bytes is too large to fetch.
    pub fn exceeds_max_file_size(&self, size: i64) -> bool {
        self.max_file_size > 0 && size > self.max_file_size
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MirrorConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default)]
    pub lfs: LfsSettings,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            lfs: LfsSettings::default(),
        }
    }
}

impl MirrorConfig {
    /// Load configuration from a JSON file.
    ///
    /// A missing file yields the defaults. Relative paths inside the file are
    /// resolved against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(path).map_err(|e| MirrorError::io_with_path(e, path))?;
        let mut config: MirrorConfig = serde_json::from_str(&contents).map_err(|e| {
            MirrorError::Json {
                message: format!("Failed to parse {}: {}", path.display(), e),
                source: Some(e),
            }
        })?;

        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Make relative paths absolute with respect to `base`.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        if self.database_path.is_relative() {
            self.database_path = base.join(&self.database_path);
        }
        if self.lfs.content_path.is_relative() {
            self.lfs.content_path = base.join(&self.lfs.content_path);
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.lfs.batch_size == 0 {
            return Err(MirrorError::Config {
                message: "lfs.batch_size must be greater than zero".to_string(),
            });
        }
        if self.lfs.scan_channel_capacity == 0 {
            return Err(MirrorError::Config {
                message: "lfs.scan_channel_capacity must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_max_file_size_gate() {
        let mut settings = LfsSettings::default();
        assert!(!settings.exceeds_max_file_size(i64::MAX));

        settings.max_file_size = 100;
        assert!(!settings.exceeds_max_file_size(100));
        assert!(settings.exceeds_max_file_size(101));

        settings.max_file_size = -1;
        assert!(!settings.exceeds_max_file_size(10_000));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = MirrorConfig::load(temp.path().join("absent.json")).unwrap();
        assert_eq!(config.lfs.batch_size, LfsConfig::DEFAULT_BATCH_SIZE);
        assert_eq!(config.lfs.max_file_size, 0);
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mirror.json");
        std::fs::write(
            &path,
            r#"{"database_path": "db/mirror.sqlite", "lfs": {"content_path": "objects", "max_file_size": 1048576}}"#,
        )
        .unwrap();

        let config = MirrorConfig::load(&path).unwrap();
        assert_eq!(config.database_path, temp.path().join("db/mirror.sqlite"));
        assert_eq!(config.lfs.content_path, temp.path().join("objects"));
        assert_eq!(config.lfs.max_file_size, 1_048_576);
        assert_eq!(config.lfs.batch_size, LfsConfig::DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mirror.json");
        std::fs::write(&path, r#"{"lfs": {"batch_size": 0}}"#).unwrap();

        let err = MirrorConfig::load(&path).unwrap_err();
        assert!(matches!(err, MirrorError::Config { .. }));
    }

    #[test]
    fn test_invalid_json_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mirror.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = MirrorConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("mirror.json"));
    }
}
