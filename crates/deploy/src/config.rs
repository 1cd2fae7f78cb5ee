//! Deployment configuration (`Zeyphr.toml`).
//!
//! Layering, lowest to highest precedence: built-in defaults, the TOML file, then
//! `ZEYPHR_*` environment variables (`__` separates nested keys, e.g.
//! `ZEYPHR_NETWORKS__IOTA__RPC_URL`). Command line overrides are applied by the binary.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::{
    ConfirmationPolicy, DEFAULT_FEE_PERCENT, DEPLOYER_ROLE, NamedAccounts, NetworkEntry,
    NetworksConfig, default_development_networks, default_networks,
};

/// Default configuration file name.
pub const CONFIG_FILENAME: &str = "Zeyphr.toml";

/// Prefix of the environment variables read into the configuration.
pub const ENV_PREFIX: &str = "ZEYPHR_";

/// Top-level configuration of a deployment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Marketplace fee in percent, passed to the admin contract.
    pub fee_percent: u64,
    /// Named account that receives the marketplace fees.
    pub fee_account: String,
    /// Directory holding the compiled contract artifacts.
    pub artifacts_dir: PathBuf,
    /// Directory deployment records are written to.
    pub records_dir: PathBuf,
    /// Delay between two receipt polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum time to wait for a deployment to be confirmed, in seconds.
    pub confirmation_timeout_secs: u64,
    /// Networks on which explorer verification is skipped.
    pub development_networks: BTreeSet<String>,
    /// Account roles and their index in the network's account list.
    pub named_accounts: NamedAccounts,
    /// Known networks by name.
    pub networks: BTreeMap<String, NetworkEntry>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            fee_percent: DEFAULT_FEE_PERCENT,
            fee_account: DEPLOYER_ROLE.to_string(),
            artifacts_dir: PathBuf::from("artifacts"),
            records_dir: PathBuf::from("deployments"),
            poll_interval_ms: 1_000,
            confirmation_timeout_secs: 600,
            development_networks: default_development_networks(),
            named_accounts: NamedAccounts::default(),
            networks: default_networks(),
        }
    }
}

impl DeployConfig {
    /// Load the layered configuration. A missing file is not an error.
    ///
    /// `path` may point to a file or to a directory containing [`CONFIG_FILENAME`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path.map(config_file_path) {
            if path.is_file() {
                tracing::debug!(path = %path.display(), "Reading configuration file");
                figment = figment.merge(Toml::file(&path));
            } else {
                tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            }
        }

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to load configuration")?;

        Ok(config)
    }

    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// The immutable network table built from this configuration.
    pub fn networks_config(&self) -> NetworksConfig {
        NetworksConfig::new(self.networks.clone(), self.development_networks.clone())
    }

    /// Mutable access to a network entry, for command line overrides.
    pub fn network_entry_mut(&mut self, name: &str) -> Option<&mut NetworkEntry> {
        self.networks.get_mut(name.trim())
    }

    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            timeout: Duration::from_secs(self.confirmation_timeout_secs),
        }
    }
}

fn config_file_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(CONFIG_FILENAME)
    } else {
        path.to_path_buf()
    }
}
