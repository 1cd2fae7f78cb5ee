//! Network profiles and development-network classification.
//!
//! The [`NetworksConfig`] is built once from the [`crate::DeployConfig`] at process start
//! and is immutable afterwards. Both the resolver and the classifier read from it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{DeployError, PrivateKey};

/// Name of the in-process Hardhat network, the default target.
pub const HARDHAT_NETWORK: &str = "hardhat";
/// Name of the local node alias.
pub const LOCALHOST_NETWORK: &str = "localhost";
/// Name of the IOTA EVM network.
pub const IOTA_NETWORK: &str = "iota";

/// Chain ID used by Hardhat and Anvil local nodes.
pub const LOCAL_CHAIN_ID: u64 = 31337;
/// Chain ID of the IOTA EVM network.
pub const IOTA_CHAIN_ID: u64 = 1075;

/// Default RPC URL of a local node.
pub const LOCAL_RPC_URL: &str = "http://127.0.0.1:8545";

/// A network entry as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEntry {
    /// The chain ID of the network.
    pub chain_id: u64,
    /// How many blocks must be mined on top of a deployment before it is considered final.
    #[serde(default = "default_block_confirmations")]
    pub block_confirmations: u64,
    /// JSON-RPC endpoint of the network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<Url>,
    /// Private keys of the accounts to deploy with, indexed by the named accounts.
    ///
    /// When empty, the node's own (unlocked) accounts are used.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<PrivateKey>,
    /// Etherscan-compatible API endpoint of the network's explorer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_api_url: Option<Url>,
    /// Human-facing URL of the network's explorer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_browser_url: Option<Url>,
    /// API key sent to the explorer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_api_key: Option<String>,
}

fn default_block_confirmations() -> u64 {
    1
}

impl NetworkEntry {
    /// Create an entry with the given chain ID and confirmation count and no endpoints.
    pub fn new(chain_id: u64, block_confirmations: u64) -> Self {
        Self {
            chain_id,
            block_confirmations,
            rpc_url: None,
            accounts: Vec::new(),
            explorer_api_url: None,
            explorer_browser_url: None,
            explorer_api_key: None,
        }
    }

    /// Set the RPC URL.
    pub fn with_rpc_url(mut self, url: Url) -> Self {
        self.rpc_url = Some(url);
        self
    }

    /// Set the explorer endpoints.
    pub fn with_explorer(mut self, api_url: Url, browser_url: Option<Url>) -> Self {
        self.explorer_api_url = Some(api_url);
        self.explorer_browser_url = browser_url;
        self
    }
}

/// Resolved deployment parameters for one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    pub name: String,
    pub chain_id: u64,
    /// Always at least 1: a zero in the configuration means "accept on first mine".
    pub required_confirmations: u64,
    pub rpc_url: Option<Url>,
    pub accounts: Vec<PrivateKey>,
    pub explorer_api_url: Option<Url>,
    pub explorer_browser_url: Option<Url>,
    pub explorer_api_key: Option<String>,
}

impl NetworkProfile {
    /// Link to an address on the network's explorer, if a browser URL is configured.
    pub fn explorer_address_url(&self, address: impl std::fmt::Display) -> Option<String> {
        self.explorer_browser_url.as_ref().map(|base| {
            format!("{}/address/{}", base.as_str().trim_end_matches('/'), address)
        })
    }
}

/// Immutable table of network profiles plus the set of development networks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworksConfig {
    networks: BTreeMap<String, NetworkEntry>,
    development_networks: BTreeSet<String>,
}

impl NetworksConfig {
    /// Build the table from its parts.
    pub fn new(
        networks: BTreeMap<String, NetworkEntry>,
        development_networks: BTreeSet<String>,
    ) -> Self {
        Self {
            networks,
            development_networks,
        }
    }

    /// Resolve a network identifier to its profile.
    pub fn resolve(&self, name: &str) -> Result<NetworkProfile, DeployError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DeployError::InvalidNetworkName);
        }

        let entry = self
            .networks
            .get(name)
            .ok_or_else(|| DeployError::UnknownNetwork {
                network: name.to_string(),
            })?;

        if entry.block_confirmations == 0 {
            tracing::warn!(
                network = %name,
                "block_confirmations is 0, accepting deployments on first mined block"
            );
        }

        Ok(NetworkProfile {
            name: name.to_string(),
            chain_id: entry.chain_id,
            required_confirmations: entry.block_confirmations.max(1),
            rpc_url: entry.rpc_url.clone(),
            accounts: entry.accounts.clone(),
            explorer_api_url: entry.explorer_api_url.clone(),
            explorer_browser_url: entry.explorer_browser_url.clone(),
            explorer_api_key: entry.explorer_api_key.clone(),
        })
    }

    /// Whether the network is ephemeral/local, in which case verification is skipped.
    pub fn is_development_network(&self, name: &str) -> bool {
        self.development_networks.contains(name.trim())
    }

    /// The configured development networks.
    pub fn development_networks(&self) -> &BTreeSet<String> {
        &self.development_networks
    }

    /// Iterate over the configured network names and entries.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &NetworkEntry)> {
        self.networks.iter().map(|(name, entry)| (name.as_str(), entry))
    }
}

impl Default for NetworksConfig {
    fn default() -> Self {
        Self::new(default_networks(), default_development_networks())
    }
}

/// The built-in network table: Hardhat, a local node and IOTA EVM.
pub fn default_networks() -> BTreeMap<String, NetworkEntry> {
    let local_rpc = Url::parse(LOCAL_RPC_URL).ok();

    let mut hardhat = NetworkEntry::new(LOCAL_CHAIN_ID, 1);
    hardhat.rpc_url = local_rpc.clone();
    let mut localhost = NetworkEntry::new(LOCAL_CHAIN_ID, 1);
    localhost.rpc_url = local_rpc;

    BTreeMap::from([
        (HARDHAT_NETWORK.to_string(), hardhat),
        (LOCALHOST_NETWORK.to_string(), localhost),
        (IOTA_NETWORK.to_string(), NetworkEntry::new(IOTA_CHAIN_ID, 6)),
    ])
}

/// The built-in development set.
pub fn default_development_networks() -> BTreeSet<String> {
    BTreeSet::from([HARDHAT_NETWORK.to_string(), LOCALHOST_NETWORK.to_string()])
}
