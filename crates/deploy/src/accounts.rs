//! Named accounts and sender identities.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use alloy_core::primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{ChainClient, NetworkProfile};

/// Role used to sign deployments.
pub const DEPLOYER_ROLE: &str = "deployer";
/// Secondary role kept for scripts that interact with the marketplace.
pub const PLAYER_ROLE: &str = "player";

/// A hex-encoded private key from the configuration.
///
/// The key is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Parse the key into a local signer.
    pub fn signer(&self) -> Result<PrivateKeySigner> {
        PrivateKeySigner::from_str(self.0.trim()).context("Failed to parse private key")
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// The identity that signs a deployment transaction.
#[derive(Debug, Clone)]
pub enum Sender {
    /// An account managed by the node, sent with `eth_sendTransaction`.
    Unlocked { role: String, address: Address },
    /// An account whose key is held locally, sent as a raw signed transaction.
    Local {
        role: String,
        signer: PrivateKeySigner,
    },
}

impl Sender {
    pub fn address(&self) -> Address {
        match self {
            Self::Unlocked { address, .. } => *address,
            Self::Local { signer, .. } => signer.address(),
        }
    }

    pub fn role(&self) -> &str {
        match self {
            Self::Unlocked { role, .. } | Self::Local { role, .. } => role,
        }
    }
}

/// Mapping from logical role names to account indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamedAccounts(BTreeMap<String, usize>);

impl Default for NamedAccounts {
    fn default() -> Self {
        Self(BTreeMap::from([
            (DEPLOYER_ROLE.to_string(), 0),
            (PLAYER_ROLE.to_string(), 1),
        ]))
    }
}

impl NamedAccounts {
    pub fn new(roles: BTreeMap<String, usize>) -> Self {
        Self(roles)
    }

    /// The account index of a role.
    pub fn index_of(&self, role: &str) -> Result<usize> {
        self.0
            .get(role)
            .copied()
            .with_context(|| format!("Unknown named account `{}`", role))
    }

    /// Resolve a role against configured keys or, when there are none, the node's accounts.
    pub fn resolve_from(
        &self,
        role: &str,
        keys: &[PrivateKey],
        node_accounts: &[Address],
    ) -> Result<Sender> {
        let index = self.index_of(role)?;

        if !keys.is_empty() {
            let key = keys.get(index).with_context(|| {
                format!(
                    "Named account `{}` uses index {} but only {} private key(s) are configured",
                    role,
                    index,
                    keys.len()
                )
            })?;
            return Ok(Sender::Local {
                role: role.to_string(),
                signer: key.signer()?,
            });
        }

        let address = node_accounts.get(index).copied().with_context(|| {
            format!(
                "Named account `{}` uses index {} but the node exposes only {} account(s)",
                role,
                index,
                node_accounts.len()
            )
        })?;

        Ok(Sender::Unlocked {
            role: role.to_string(),
            address,
        })
    }

    /// Resolve a role for a network, querying the node's accounts only when needed.
    pub async fn resolve<C: ChainClient>(
        &self,
        role: &str,
        profile: &NetworkProfile,
        client: &C,
    ) -> Result<Sender> {
        let node_accounts = if profile.accounts.is_empty() {
            client
                .accounts()
                .await
                .context("Failed to fetch node accounts")?
        } else {
            Vec::new()
        };

        let sender = self.resolve_from(role, &profile.accounts, &node_accounts)?;
        tracing::debug!(
            role,
            address = %sender.address(),
            local_key = matches!(sender, Sender::Local { .. }),
            "Resolved named account"
        );
        Ok(sender)
    }
}
