//! Configuration management for the transaction builder
//!
//! Loads network presets and gas policy from TOML files with environment
//! variable substitution. Falls back to built-in mainnet and Sepolia presets
//! when no file exists.

use crate::tx::GasPolicy;

use anyhow::{Context, Result};
use ethers::types::H256;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub default_network: String,
    pub networks: HashMap<String, NetworkConfig>,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub gas: GasPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_urls: Vec<String>,
    #[serde(default)]
    pub explorer_url: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Static offset added to every nonce, for test networks that need it
    #[serde(default)]
    pub nonce_offset: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub request_timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}

impl RpcConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_currency() -> String {
    "ETH".to_string()
}

impl NetworkConfig {
    /// Block explorer link for a transaction hash
    pub fn tx_url(&self, hash: &H256) -> Option<String> {
        self.explorer_url
            .as_deref()
            .map(|base| format!("{}/tx/{:?}", base.trim_end_matches('/'), hash))
    }
}

impl Default for Settings {
    fn default() -> Self {
        let mut networks = HashMap::new();
        networks.insert(
            "mainnet".to_string(),
            NetworkConfig {
                chain_id: 1,
                name: "Ethereum Mainnet".to_string(),
                rpc_urls: vec!["https://eth.llamarpc.com".to_string()],
                explorer_url: Some("https://etherscan.io".to_string()),
                currency: default_currency(),
                nonce_offset: 0,
            },
        );
        networks.insert(
            "sepolia".to_string(),
            NetworkConfig {
                chain_id: 11155111,
                name: "Sepolia Testnet".to_string(),
                rpc_urls: vec!["https://rpc.sepolia.org".to_string()],
                explorer_url: Some("https://sepolia.etherscan.io".to_string()),
                currency: "SepoliaETH".to_string(),
                nonce_offset: 0,
            },
        );

        Self {
            default_network: "sepolia".to_string(),
            networks,
            rpc: RpcConfig::default(),
            gas: GasPolicy::default(),
        }
    }
}

impl Settings {
    /// Path from `TXBUILDER_CONFIG`, else `config/default.toml`
    pub fn config_path() -> PathBuf {
        env::var("TXBUILDER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"))
    }

    /// Load settings from the configured path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load from the configured path, or use the built-in presets when the
    /// file does not exist
    pub fn load_or_default() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from(path)
        } else {
            tracing::debug!("No config at {:?}, using built-in networks", path);
            Ok(Self::default())
        }
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&config_str)
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if !self.networks.contains_key(&self.default_network) {
            anyhow::bail!(
                "Default network {} is not configured",
                self.default_network
            );
        }

        for (id, network) in &self.networks {
            if network.rpc_urls.is_empty() {
                anyhow::bail!("Network {} has no RPC URLs configured", id);
            }
            if network.chain_id == 0 {
                anyhow::bail!("Network {} has chain ID 0", id);
            }
        }

        if self.rpc.request_timeout_secs == 0 {
            anyhow::bail!("rpc.request_timeout_secs must be positive");
        }
        if self.gas.slow_price_percent > self.gas.fast_price_percent {
            anyhow::bail!("gas.slow_price_percent exceeds gas.fast_price_percent");
        }
        if self.gas.max_gas_limit == 0 {
            anyhow::bail!("gas.max_gas_limit must be positive");
        }

        Ok(())
    }

    /// Network by configured id, or the default when `id` is `None`
    pub fn network(&self, id: Option<&str>) -> Result<&NetworkConfig> {
        let id = id.unwrap_or(self.default_network.as_str());
        self.networks.get(id).with_context(|| {
            let mut known: Vec<_> = self.networks.keys().map(String::as_str).collect();
            known.sort_unstable();
            format!("Unknown network {} (configured: {})", id, known.join(", "))
        })
    }

    /// Get network config by chain ID
    pub fn network_by_chain_id(&self, chain_id: u64) -> Option<&NetworkConfig> {
        self.networks.values().find(|n| n.chain_id == chain_id)
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR
        .replace_all(input, |cap: &regex::Captures| {
            env::var(&cap[1]).unwrap_or_default()
        })
        .into_owned()
}
