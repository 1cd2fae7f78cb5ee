//! Chain client abstraction and its JSON-RPC implementation.

use std::future::Future;

use alloy_core::primitives::{Address, Bytes, TxHash};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::rpc::{self, deserialize_opt_u64_from_hex, deserialize_u64_from_hex};
use crate::{LegacyCreation, Sender};

/// Receipt of a mined contract-creation transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationReceipt {
    pub transaction_hash: TxHash,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    pub block_number: u64,
    /// `Some(1)` on success, `Some(0)` on revert. Pre-Byzantium receipts have no status.
    #[serde(default, deserialize_with = "deserialize_opt_u64_from_hex")]
    pub status: Option<u64>,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(default, deserialize_with = "deserialize_opt_u64_from_hex")]
    pub gas_used: Option<u64>,
}

impl CreationReceipt {
    pub fn succeeded(&self) -> bool {
        self.status != Some(0)
    }
}

/// The operations the deployer needs from a chain.
pub trait ChainClient: Send + Sync {
    /// The chain ID reported by the node.
    fn chain_id(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Accounts managed (unlocked) by the node.
    fn accounts(&self) -> impl Future<Output = Result<Vec<Address>>> + Send;

    /// Submit a contract-creation transaction carrying `init_code`, returning its hash.
    fn submit_creation(
        &self,
        sender: &Sender,
        init_code: Bytes,
    ) -> impl Future<Output = Result<TxHash>> + Send;

    /// The receipt of a transaction, or `None` while it is pending.
    fn transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<Option<CreationReceipt>>> + Send;

    /// The current head block number.
    fn block_number(&self) -> impl Future<Output = Result<u64>> + Send;
}

/// [`ChainClient`] over HTTP JSON-RPC.
#[derive(Debug, Clone)]
pub struct RpcChainClient {
    client: reqwest::Client,
    url: Url,
    /// Chain ID used to sign locally held keys (EIP-155).
    chain_id: u64,
}

impl RpcChainClient {
    pub fn new(url: Url, chain_id: u64) -> Result<Self> {
        Ok(Self {
            client: rpc::create_client()?,
            url,
            chain_id,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<T> {
        rpc::json_rpc_call(&self.client, self.url.as_str(), method, params).await
    }

    async fn call_quantity(&self, method: &str, params: Vec<serde_json::Value>) -> Result<u64> {
        let value: String = self.call(method, params).await?;
        rpc::parse_hex_u64(&value)
    }

    /// Build, sign and send a creation transaction from a local key.
    async fn send_signed(
        &self,
        signer: &alloy_signer_local::PrivateKeySigner,
        init_code: Bytes,
    ) -> Result<TxHash> {
        let from = signer.address();

        let nonce = self
            .call_quantity("eth_getTransactionCount", vec![json!(from), json!("pending")])
            .await
            .context("Failed to fetch nonce")?;

        let gas_price: String = self
            .call("eth_gasPrice", vec![])
            .await
            .context("Failed to fetch gas price")?;
        let gas_price = rpc::parse_hex_u128(&gas_price)?;

        let gas_limit = self
            .call_quantity(
                "eth_estimateGas",
                vec![json!({ "from": from, "data": init_code })],
            )
            .await
            .context("Failed to estimate deployment gas")?;

        tracing::debug!(%from, nonce, gas_price = %gas_price, gas_limit, "Signing creation transaction");

        let raw = LegacyCreation {
            nonce,
            gas_price,
            gas_limit,
            input: init_code,
            chain_id: self.chain_id,
        }
        .sign(signer)?;

        self.call("eth_sendRawTransaction", vec![json!(raw)])
            .await
            .context("Failed to send raw deployment transaction")
    }
}

impl ChainClient for RpcChainClient {
    async fn chain_id(&self) -> Result<u64> {
        self.call_quantity("eth_chainId", vec![]).await
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        self.call("eth_accounts", vec![]).await
    }

    async fn submit_creation(&self, sender: &Sender, init_code: Bytes) -> Result<TxHash> {
        match sender {
            Sender::Unlocked { address, .. } => self
                .call(
                    "eth_sendTransaction",
                    vec![json!({ "from": address, "data": init_code })],
                )
                .await
                .context("Failed to send deployment transaction"),
            Sender::Local { signer, .. } => self.send_signed(signer, init_code).await,
        }
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<CreationReceipt>> {
        self.call("eth_getTransactionReceipt", vec![json!(tx_hash)])
            .await
    }

    async fn block_number(&self) -> Result<u64> {
        self.call_quantity("eth_blockNumber", vec![]).await
    }
}
