use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::Address;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "watchtower.yaml";

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "WATCHTOWER_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("RPC URL cannot be empty")]
    EmptyRpcUrl,

    #[error("Invalid address for {field}: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("Invalid {0}: must be at least 1 second")]
    ZeroInterval(&'static str),

    #[error("Beacon address cannot be empty")]
    EmptyBeaconAddress,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. watchtower.yaml in the working directory (optional)
    /// 3. Environment variables (WATCHTOWER_* prefix, `__` separates nesting)
    pub fn load() -> Result<Config> {
        Self::load_with(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load configuration from a specific file, still honouring environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        Self::load_with(path)
    }

    fn load_with(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context(format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.chain.rpc_url.trim().is_empty() {
            return Err(ConfigError::EmptyRpcUrl);
        }

        let addresses = [
            ("chain.node_address", &config.chain.node_address),
            ("contracts.rocket_node_api", &config.contracts.rocket_node_api),
            (
                "contracts.rocket_minipool_settings",
                &config.contracts.rocket_minipool_settings,
            ),
            ("contracts.rocket_pool", &config.contracts.rocket_pool),
            (
                "contracts.rocket_node_watchtower",
                &config.contracts.rocket_node_watchtower,
            ),
        ];
        for (field, value) in addresses {
            if value.parse::<Address>().is_err() {
                return Err(ConfigError::InvalidAddress {
                    field,
                    value: value.clone(),
                });
            }
        }

        let intervals = [
            ("chain.request_timeout_secs", config.chain.request_timeout_secs),
            ("chain.sync_poll_interval_secs", config.chain.sync_poll_interval_secs),
            (
                "chain.receipt_poll_interval_secs",
                config.chain.receipt_poll_interval_secs,
            ),
            ("chain.receipt_timeout_secs", config.chain.receipt_timeout_secs),
        ];
        for (field, secs) in intervals {
            if secs == 0 {
                return Err(ConfigError::ZeroInterval(field));
            }
        }

        if config.beacon.address.trim().is_empty() {
            return Err(ConfigError::EmptyBeaconAddress);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(
                config.logging.rotation.clone(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chain.rpc_url, "http://127.0.0.1:8545");
        assert_eq!(config.chain.sync_poll_interval_secs, 5);
        assert_eq!(config.beacon.address, "127.0.0.1:9001");
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
chain:
  rpc_url: http://eth1:8545
  node_address: "0x1111111111111111111111111111111111111111"
contracts:
  rocket_pool: "0x2222222222222222222222222222222222222222"
beacon:
  address: beacon:9001
logging:
  level: debug
  format: pretty
"#;

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.chain.rpc_url, "http://eth1:8545");
        assert_eq!(config.chain.receipt_timeout_secs, 300);
        assert_eq!(
            config.contracts.rocket_pool,
            "0x2222222222222222222222222222222222222222"
        );
        assert_eq!(config.beacon.address, "beacon:9001");
        assert_eq!(config.logging.format, "pretty");
        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_rejects_bad_address() {
        let mut config = Config::default();
        config.contracts.rocket_node_watchtower = "0x1234".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidAddress {
                field: "contracts.rocket_node_watchtower",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.chain.sync_poll_interval_secs = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::ZeroInterval("chain.sync_poll_interval_secs"))
        ));
    }

    #[test]
    fn test_validate_rejects_logging_values() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogLevel(_))
        ));

        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));

        let mut config = Config::default();
        config.logging.rotation = "weekly".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogRotation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_endpoints() {
        let mut config = Config::default();
        config.chain.rpc_url = "  ".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyRpcUrl)
        ));

        let mut config = Config::default();
        config.beacon.address = String::new();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyBeaconAddress)
        ));
    }

    #[test]
    fn test_load_from_file_with_env_override() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "chain:\n  rpc_url: http://from-file:8545\nbeacon:\n  address: from-file:9001"
        )
        .expect("write config");

        temp_env::with_var("WATCHTOWER_BEACON__ADDRESS", Some("from-env:9001"), || {
            let config = ConfigLoader::load_from_file(file.path()).expect("config loads");
            assert_eq!(config.chain.rpc_url, "http://from-file:8545");
            assert_eq!(config.beacon.address, "from-env:9001");
        });
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = ConfigLoader::load_from_file(dir.path().join("absent.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_file_values_fail_validation() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "logging:\n  level: chatty").expect("write config");

        temp_env::with_vars_unset(["WATCHTOWER_LOGGING__LEVEL"], || {
            assert!(ConfigLoader::load_from_file(file.path()).is_err());
        });
    }
}
