//! Engine configuration.
//!
//! Loaded from TOML. Every section has defaults so a missing file still yields
//! a working engine; `validate` rejects values that would break invariants.

use crate::error::ConfigError;
use crate::trust::{TRUST_POINTS_MAX, TRUST_POINTS_MIN};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "COMMONS_CONFIG";

/// TTL presets, picked per data volatility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierSettings {
    pub short_ms: u64,
    pub medium_ms: u64,
    pub long_ms: u64,
    pub very_long_ms: u64,
}

impl Default for TierSettings {
    fn default() -> Self {
        Self {
            short_ms: 30_000,
            medium_ms: 5 * 60_000,
            long_ms: 30 * 60_000,
            very_long_ms: 24 * 60 * 60_000,
        }
    }
}

/// Expiring cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    pub default_ttl_ms: u64,
    #[serde(default)]
    pub tiers: TierSettings,
    /// Bound on live entries. `None` keeps the lazy, unbounded behaviour.
    #[serde(default)]
    pub max_entries: Option<usize>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_ms: 5 * 60_000,
            tiers: TierSettings::default(),
            max_entries: None,
        }
    }
}

impl CacheSettings {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }
}

/// Durable store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSettings {
    pub namespace: String,
    /// Chat history is truncated to this many most recently active threads.
    pub max_threads: usize,
    pub max_messages_per_thread: usize,
    pub schema_version: u32,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            namespace: "commons".to_string(),
            max_threads: 50,
            max_messages_per_thread: 100,
            schema_version: 1,
        }
    }
}

/// Trust ledger settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrustSettings {
    /// Scores strictly below this trigger the low-reputation warning.
    pub warning_threshold: i32,
}

impl Default for TrustSettings {
    fn default() -> Self {
        Self {
            warning_threshold: 30,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub trust: TrustSettings,
}

impl EngineConfig {
    /// Load from `--config <path>` or `COMMONS_CONFIG`, else defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match config_path_from_args().or_else(config_path_from_env) {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.default_ttl_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.default_ttl_ms",
                reason: "must be > 0".to_string(),
            });
        }
        let tiers = &self.cache.tiers;
        if tiers.short_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.tiers.short_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if !(tiers.short_ms <= tiers.medium_ms
            && tiers.medium_ms <= tiers.long_ms
            && tiers.long_ms <= tiers.very_long_ms)
        {
            return Err(ConfigError::InvalidValue {
                field: "cache.tiers",
                reason: "must be non-decreasing from short to very_long".to_string(),
            });
        }
        if self.cache.max_entries == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "cache.max_entries",
                reason: "must be > 0 when set".to_string(),
            });
        }
        if self.storage.namespace.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "storage.namespace",
                reason: "must not be empty".to_string(),
            });
        }
        if self.storage.namespace.contains(':') {
            return Err(ConfigError::InvalidValue {
                field: "storage.namespace",
                reason: "must not contain ':'".to_string(),
            });
        }
        if self.storage.max_threads == 0 {
            return Err(ConfigError::InvalidValue {
                field: "storage.max_threads",
                reason: "must be > 0".to_string(),
            });
        }
        if self.storage.max_messages_per_thread == 0 {
            return Err(ConfigError::InvalidValue {
                field: "storage.max_messages_per_thread",
                reason: "must be > 0".to_string(),
            });
        }
        if !(TRUST_POINTS_MIN..=TRUST_POINTS_MAX).contains(&self.trust.warning_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "trust.warning_threshold",
                reason: format!("must be within [{TRUST_POINTS_MIN}, {TRUST_POINTS_MAX}]"),
            });
        }
        Ok(())
    }
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(value) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(value));
        }
    }
    None
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [storage]
            namespace = "civic"
            max_threads = 10
            max_messages_per_thread = 20
            schema_version = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.namespace, "civic");
        assert_eq!(config.storage.max_threads, 10);
        assert_eq!(config.cache, CacheSettings::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = EngineConfig::from_toml_str("[cache]\ndefault_ttl_ms = 10\nbogus = 1\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_non_monotonic_tiers_rejected() {
        let mut config = EngineConfig::default();
        config.cache.tiers.long_ms = 1;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "cache.tiers", .. }));
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let mut config = EngineConfig::default();
        config.trust.warning_threshold = 120;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commons.toml");
        std::fs::write(&path, "[trust]\nwarning_threshold = 20\n").unwrap();
        let config = EngineConfig::from_path(&path).unwrap();
        assert_eq!(config.trust.warning_threshold, 20);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = EngineConfig::from_path(Path::new("/nonexistent/commons.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
