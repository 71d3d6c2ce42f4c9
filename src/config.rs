//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::stream::{DistributorConfig, DEFAULT_CACHE_CAPACITY};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Upstream feed server
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

fn default_address() -> String {
    "127.0.0.1:7070".to_string()
}

fn default_connect_timeout() -> u64 {
    5000 // 5 seconds
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            connect_timeout_ms: default_connect_timeout(),
        }
    }
}

/// Distributor and subscriber settings
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_subscriber_capacity")]
    pub subscriber_capacity: usize,

    /// Field whose value keys the recency cache; unset disables it
    #[serde(default)]
    pub cache_key: Option<String>,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,

    #[serde(default = "default_control_capacity")]
    pub control_capacity: usize,
}

fn default_subscriber_capacity() -> usize {
    256
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_max_line_bytes() -> usize {
    32 * 1024 // 32 KB
}

fn default_control_capacity() -> usize {
    32
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            subscriber_capacity: default_subscriber_capacity(),
            cache_key: None,
            cache_capacity: default_cache_capacity(),
            max_line_bytes: default_max_line_bytes(),
            control_capacity: default_control_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let (config, loaded, failures) = Self::search_default();
        for e in &failures {
            tracing::warn!("{}", e);
        }
        match loaded {
            Some(path) => tracing::info!("Loaded config from {:?}", path),
            None => tracing::debug!("Using default config with environment overrides"),
        }
        config
    }

    /// Like [`Config::load_default`], but returns what happened instead of
    /// logging it: the path the config came from (if any) and the errors from
    /// locations that existed but failed to load.
    pub fn search_default() -> (Self, Option<PathBuf>, Vec<ConfigError>) {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("rivulet").join("config.toml")),
            Some(PathBuf::from("/etc/rivulet/config.toml")),
            Some(PathBuf::from("./rivulet.toml")),
        ];
        Self::search(config_paths.into_iter().flatten())
    }

    fn search(paths: impl IntoIterator<Item = PathBuf>) -> (Self, Option<PathBuf>, Vec<ConfigError>) {
        let mut failures = Vec::new();
        for path in paths {
            if !path.exists() {
                continue;
            }
            match Self::load_with_env(&path) {
                Ok(config) => return (config, Some(path), failures),
                Err(e) => failures.push(e),
            }
        }

        // Fall back to environment-only config
        (Self::from_env(), None, failures)
    }

    /// Settings for each feed's distributor
    pub fn distributor(&self) -> DistributorConfig {
        DistributorConfig {
            address: self.upstream.address.clone(),
            connect_timeout: Duration::from_millis(self.upstream.connect_timeout_ms),
            cache_key: self.stream.cache_key.clone(),
            cache_capacity: self.stream.cache_capacity,
            max_line_bytes: self.stream.max_line_bytes,
            control_capacity: self.stream.control_capacity,
        }
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(address) = var("RIVULET_UPSTREAM") {
            self.upstream.address = address;
        }
        if let Some(key) = var("RIVULET_CACHE_KEY") {
            // Empty turns the cache off
            self.stream.cache_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some(level) = var("RIVULET_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("RIVULET_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Rivulet Configuration
#
# Environment variables override these settings:
# - RIVULET_UPSTREAM
# - RIVULET_CACHE_KEY
# - RIVULET_LOG_LEVEL
# - RIVULET_LOG_FORMAT

[upstream]
# Feed server address (host:port)
address = "127.0.0.1:7070"

# Give up dialing after this long (ms)
connect_timeout_ms = 5000

[stream]
# Events buffered per subscriber before deliveries are dropped
subscriber_capacity = 256

# Field whose string value keys the recency cache (unset = disabled)
# cache_key = "unique_request_id"

# Events kept in the recency cache
cache_capacity = 64

# Upstream lines longer than this are skipped (bytes)
max_line_bytes = 32768

# Pending subscribe/unsubscribe requests per feed
control_capacity = 32

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.upstream.address, "127.0.0.1:7070");
        assert_eq!(config.stream.subscriber_capacity, 256);
        assert_eq!(config.stream.cache_key, None);
        assert_eq!(config.stream.cache_capacity, 64);
        assert_eq!(config.logging.format, "pretty");

        let distributor = config.distributor();
        assert_eq!(distributor.connect_timeout, Duration::from_secs(5));
        assert_eq!(distributor.max_line_bytes, 32 * 1024);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[upstream]\naddress = \"feeds.internal:9000\"\n\n[stream]\ncache_key = \"request.id\""
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.upstream.address, "feeds.internal:9000");
        assert_eq!(config.upstream.connect_timeout_ms, 5000);
        assert_eq!(config.stream.cache_key.as_deref(), Some("request.id"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_generated_config_parses() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(generate_default_config().as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.upstream.address, default_address());
        assert_eq!(config.stream.max_line_bytes, default_max_line_bytes());
        assert_eq!(config.stream.cache_key, None);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            Config::load(&missing),
            Err(ConfigError::Io { .. })
        ));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[upstream\naddress = 1").unwrap();
        assert!(matches!(Config::load(&bad), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_search_skips_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let broken = dir.path().join("broken.toml");
        let good = dir.path().join("good.toml");
        std::fs::write(&broken, "[stream\n").unwrap();
        std::fs::write(&good, "[stream]\ncache_capacity = 8\n").unwrap();

        let (config, loaded, failures) =
            Config::search([missing.clone(), broken.clone(), good.clone()]);
        assert_eq!(loaded.as_deref(), Some(good.as_path()));
        assert_eq!(config.stream.cache_capacity, 8);
        assert_eq!(failures.len(), 1);
        assert!(matches!(&failures[0], ConfigError::Parse { path, .. } if *path == broken));

        let (config, loaded, failures) = Config::search([missing]);
        assert!(loaded.is_none());
        assert!(failures.is_empty());
        assert_eq!(config.stream.cache_capacity, default_cache_capacity());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("RIVULET_UPSTREAM", "10.0.0.1:7000"),
            ("RIVULET_CACHE_KEY", "trace_id"),
            ("RIVULET_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.upstream.address, "10.0.0.1:7000");
        assert_eq!(config.stream.cache_key.as_deref(), Some("trace_id"));
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");

        config.apply_overrides(|key| (key == "RIVULET_CACHE_KEY").then(String::new));
        assert_eq!(config.stream.cache_key, None);
    }
}
