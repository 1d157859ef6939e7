use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for the watchtower daemon
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Execution client connection
    #[serde(default)]
    pub chain: ChainConfig,

    /// Contract address registry
    #[serde(default)]
    pub contracts: ContractsConfig,

    /// Validator status feed connection
    #[serde(default)]
    pub beacon: BeaconConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Execution client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChainConfig {
    /// JSON-RPC endpoint of the execution client
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Node account address; the execution client must hold its key
    #[serde(default = "default_zero_address")]
    pub node_address: String,

    /// HTTP request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Polling period while waiting for the client to sync
    #[serde(default = "default_sync_poll_interval_secs")]
    pub sync_poll_interval_secs: u64,

    /// Polling period while waiting for a transaction receipt
    #[serde(default = "default_receipt_poll_interval_secs")]
    pub receipt_poll_interval_secs: u64,

    /// Maximum time to wait for a transaction receipt
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_zero_address() -> String {
    "0x0000000000000000000000000000000000000000".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_sync_poll_interval_secs() -> u64 {
    5
}

const fn default_receipt_poll_interval_secs() -> u64 {
    2
}

const fn default_receipt_timeout_secs() -> u64 {
    300
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            node_address: default_zero_address(),
            request_timeout_secs: default_request_timeout_secs(),
            sync_poll_interval_secs: default_sync_poll_interval_secs(),
            receipt_poll_interval_secs: default_receipt_poll_interval_secs(),
            receipt_timeout_secs: default_receipt_timeout_secs(),
        }
    }
}

/// Deployed protocol contract addresses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ContractsConfig {
    /// Exposes `getTrusted(address)`
    #[serde(default = "default_zero_address")]
    pub rocket_node_api: String,

    /// Exposes `getMinipoolCheckInterval()`
    #[serde(default = "default_zero_address")]
    pub rocket_minipool_settings: String,

    /// Exposes `getPoolsCount()` and `getPoolAt(uint256)`
    #[serde(default = "default_zero_address")]
    pub rocket_pool: String,

    /// Exposes `logoutMinipool` and `withdrawMinipool`
    #[serde(default = "default_zero_address")]
    pub rocket_node_watchtower: String,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            rocket_node_api: default_zero_address(),
            rocket_minipool_settings: default_zero_address(),
            rocket_pool: default_zero_address(),
            rocket_node_watchtower: default_zero_address(),
        }
    }
}

/// Validator status feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BeaconConfig {
    /// `host:port` of the status feed
    #[serde(default = "default_beacon_address")]
    pub address: String,
}

fn default_beacon_address() -> String {
    "127.0.0.1:9001".to_string()
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            address: default_beacon_address(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stdout only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// File rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
