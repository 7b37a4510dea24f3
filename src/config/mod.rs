//! Configuration module for the daily-task runner

use crate::utils::error::{Error, Result};
use crate::utils::retry::{DelayRange, RetryPolicy};
use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use std::env;
use std::str::FromStr;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Configuration file version
    pub version: String,

    /// General application settings
    #[serde(default)]
    pub app: AppConfig,

    /// Odyssey HTTP API configuration
    pub api: ApiConfig,

    /// Sonic ledger RPC configuration
    pub solana: SolanaConfig,

    /// Key file locations and derivation settings
    pub wallet: WalletConfig,

    /// Which daily tasks run and their quotas
    pub tasks: TasksConfig,

    /// Anti-throttling pauses
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Retry policies
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Application-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log level (debug, info, warn, error)
    pub log_level: String,
}

/// Odyssey HTTP API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every endpoint path is joined onto
    pub base_url: String,

    /// Web origin sent as `origin`/`referer`
    pub origin: String,

    /// User agent presented to the service
    pub user_agent: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Sonic ledger RPC configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolanaConfig {
    /// RPC endpoint URL
    pub rpc_url: String,

    /// Commitment level used for confirmation
    pub commitment: String,

    /// Timeout for RPC requests in seconds
    pub timeout_seconds: u64,

    /// Interval between signature status polls while confirming
    #[serde(default = "default_confirm_poll_ms")]
    pub confirm_poll_ms: u64,
}

/// Key file locations and derivation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// JSON array of base58 secret keys processed by `run`
    pub private_keys_path: String,

    /// JSON array of seed phrases consumed by `derive`
    pub mnemonics_path: String,

    /// Number of keypairs `derive` produces
    pub derive_count: u32,

    /// BIP-39 passphrase used during derivation (empty for none)
    #[serde(default)]
    pub passphrase: String,
}

/// Which daily tasks run and their quotas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasksConfig {
    pub check_in: bool,
    pub pad_transactions: bool,
    pub claim_boxes: bool,
    pub open_boxes: bool,

    /// Daily on-chain transaction count the service rewards in full
    pub daily_tx_target: u64,

    /// Extra transfers sent on top of the missing count
    pub padding_buffer: u64,

    /// Lamports moved by each padding transfer
    pub transfer_lamports: u64,
}

/// Randomized pauses between remote steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Pause before each remote step (check-in, each transfer, each claim)
    pub step: DelayRange,

    /// Pause after each opened box
    pub between_boxes: DelayRange,
}

/// Retry policies for the operations that retry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub check_in: RetryPolicy,
    pub open_box: RetryPolicy,
    pub submit: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            app: AppConfig::default(),
            api: ApiConfig::default(),
            solana: SolanaConfig::default(),
            wallet: WalletConfig::default(),
            tasks: TasksConfig::default(),
            pacing: PacingConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string() }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://odyssey-api-beta.sonic.game".to_string(),
            origin: "https://odyssey.sonic.game".to_string(),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36"
                .to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://devnet.sonic.game/".to_string(),
            commitment: "confirmed".to_string(),
            timeout_seconds: 30,
            confirm_poll_ms: default_confirm_poll_ms(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_keys_path: "config/privateKeys.json".to_string(),
            mnemonics_path: "config/mnemonics.json".to_string(),
            derive_count: 100,
            passphrase: String::new(),
        }
    }
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            check_in: true,
            pad_transactions: true,
            claim_boxes: true,
            open_boxes: true,
            daily_tx_target: 100,
            padding_buffer: 10,
            transfer_lamports: 1_000_000, // 0.001 SOL
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self { step: DelayRange::from_secs(1, 3), between_boxes: DelayRange::from_secs(5, 7) }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            check_in: RetryPolicy::new(5, DelayRange::from_secs(2, 4)),
            open_box: RetryPolicy::new(5, DelayRange::from_secs(5, 8)),
            submit: RetryPolicy::new(5, DelayRange::from_secs(5, 6)),
        }
    }
}

fn default_confirm_poll_ms() -> u64 {
    500
}

impl SolanaConfig {
    pub fn commitment_config(&self) -> Result<CommitmentConfig> {
        let commitment = CommitmentLevel::from_str(self.commitment.trim()).map_err(|_| {
            Error::ConfigError(format!("Unknown commitment level '{}'", self.commitment))
        })?;
        Ok(CommitmentConfig { commitment })
    }
}

impl PacingConfig {
    /// No pauses at all; used by tests.
    pub fn none() -> Self {
        Self { step: DelayRange::ZERO, between_boxes: DelayRange::ZERO }
    }
}

impl RetryConfig {
    /// Same retry counts, no waiting; used by tests.
    pub fn immediate() -> Self {
        let defaults = Self::default();
        Self {
            check_in: RetryPolicy::immediate(defaults.check_in.max_retries),
            open_box: RetryPolicy::immediate(defaults.open_box.max_retries),
            submit: RetryPolicy::immediate(defaults.submit.max_retries),
        }
    }
}

impl Config {
    /// Serialize default config to TOML string
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).expect("serialize default config")
    }

    /// Load configuration from a specific file path
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::ConfigError(format!("Failed to read config file {:?}: {}", path.as_ref(), e))
        })?;
        let mut cfg: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;
        cfg.merge_env()?;
        Ok(cfg)
    }

    /// Save the configuration to a file
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            crate::utils::ensure_dir(parent)?;
        }
        std::fs::write(path, content).map_err(|e| {
            Error::ConfigError(format!("Failed to write config file {:?}: {}", path, e))
        })?;
        Ok(())
    }

    /// Validate the configuration for required fields and reasonable values
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(Error::ConfigError("Config version must be set (e.g., '0.1.0')".into()));
        }
        url::Url::parse(&self.api.base_url)?;
        url::Url::parse(&self.solana.rpc_url)?;
        self.solana.commitment_config()?;
        if self.api.timeout_seconds == 0 || self.solana.timeout_seconds == 0 {
            return Err(Error::ConfigError("timeout_seconds must be > 0".into()));
        }
        if self.wallet.private_keys_path.trim().is_empty() {
            return Err(Error::ConfigError("wallet.private_keys_path must be set".into()));
        }
        if self.tasks.daily_tx_target == 0 {
            return Err(Error::ConfigError("tasks.daily_tx_target must be > 0".into()));
        }
        if self.tasks.pad_transactions && self.tasks.transfer_lamports == 0 {
            return Err(Error::ConfigError("tasks.transfer_lamports must be > 0".into()));
        }
        for (name, range) in [
            ("pacing.step", self.pacing.step),
            ("pacing.between_boxes", self.pacing.between_boxes),
            ("retry.check_in.delay", self.retry.check_in.delay),
            ("retry.open_box.delay", self.retry.open_box.delay),
            ("retry.submit.delay", self.retry.submit.delay),
        ] {
            if range.min_ms > range.max_ms {
                return Err(Error::ConfigError(format!("{} has min_ms > max_ms", name)));
            }
        }
        Ok(())
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        if let Ok(config) = Self::from_file("config.toml") {
            return Ok(config);
        }

        if let Some(mut path) = dirs::config_dir() {
            path.push("sonic-odyssey");
            path.push("config.toml");
            if path.exists() {
                return Self::from_file(path);
            }
        }

        let mut config = Self::default();
        config.merge_env()?;
        Ok(config)
    }

    /// Merge environment variables into the configuration
    pub fn merge_env(&mut self) -> Result<()> {
        if let Ok(api_url) = env::var("ODYSSEY_API_URL") {
            self.api.base_url = api_url;
        }

        if let Ok(rpc_url) = env::var("SONIC_RPC_URL") {
            self.solana.rpc_url = rpc_url;
        }

        if let Ok(keys) = env::var("ODYSSEY_PRIVATE_KEYS") {
            self.wallet.private_keys_path = keys;
        }

        if let Ok(mnemonics) = env::var("ODYSSEY_MNEMONICS") {
            self.wallet.mnemonics_path = mnemonics;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.solana.rpc_url, "https://devnet.sonic.game/");
        assert_eq!(config.api.base_url, "https://odyssey-api-beta.sonic.game");
        assert_eq!(config.tasks.daily_tx_target, 100);
        assert_eq!(config.tasks.padding_buffer, 10);
        assert_eq!(config.retry.check_in.max_attempts(), 6);
        assert_eq!(config.retry.submit.delay, DelayRange { min_ms: 5_000, max_ms: 6_000 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.tasks.padding_buffer = 3;
        config.pacing = PacingConfig::none();

        config.save(&config_path).unwrap();

        let loaded = Config::from_file(&config_path).unwrap();
        assert_eq!(loaded.tasks.padding_buffer, 3);
        assert_eq!(loaded.pacing, PacingConfig::none());
    }

    #[test]
    fn test_default_toml() {
        let toml = Config::default_toml();
        assert!(toml.contains("[api]"));
        assert!(toml.contains("[solana]"));
        assert!(toml.contains("[tasks]"));
        assert!(toml.contains("devnet.sonic.game"));
    }

    #[test]
    fn test_optional_sections_fall_back_to_defaults() {
        let minimal = r#"
            version = "0.1.0"

            [api]
            base_url = "https://odyssey-api-beta.sonic.game"
            origin = "https://odyssey.sonic.game"
            user_agent = "test"
            timeout_seconds = 10

            [solana]
            rpc_url = "https://devnet.sonic.game/"
            commitment = "finalized"
            timeout_seconds = 10

            [wallet]
            private_keys_path = "keys.json"
            mnemonics_path = "mnemonics.json"
            derive_count = 5

            [tasks]
            check_in = true
            pad_transactions = false
            claim_boxes = true
            open_boxes = true
            daily_tx_target = 100
            padding_buffer = 10
            transfer_lamports = 1000000
        "#;
        let config: Config = toml::from_str(minimal).unwrap();
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.pacing, PacingConfig::default());
        assert_eq!(config.solana.confirm_poll_ms, 500);
        assert_eq!(
            config.solana.commitment_config().unwrap(),
            CommitmentConfig::finalized()
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.solana.commitment = "eventually".into();
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

        let mut config = Config::default();
        config.api.base_url = "not a url".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pacing.step = DelayRange { min_ms: 10, max_ms: 1 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_env() {
        temp_env::with_vars(
            vec![
                ("SONIC_RPC_URL", Some("http://127.0.0.1:8899")),
                ("ODYSSEY_PRIVATE_KEYS", Some("/tmp/keys.json")),
                ("ODYSSEY_API_URL", None),
            ],
            || {
                let mut config = Config::default();
                config.merge_env().unwrap();

                assert_eq!(config.solana.rpc_url, "http://127.0.0.1:8899");
                assert_eq!(config.wallet.private_keys_path, "/tmp/keys.json");
                assert_eq!(config.api.base_url, "https://odyssey-api-beta.sonic.game");
            },
        );
    }
}
