//! Contract deployer: submit a creation transaction and wait for finality.

use std::time::Duration;

use alloy_core::primitives::TxHash;

use crate::rpc;
use crate::{
    ArtifactStore, ChainClient, CreationReceipt, DeployError, DeploymentResult, DeploymentSpec,
    NetworkProfile,
};

/// Default interval between two receipt/head polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Default upper bound on waiting for a deployment to be confirmed.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(600);

/// How confirmations are awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    /// Delay between two polls of the receipt or the chain head.
    pub poll_interval: Duration,
    /// Maximum time from submission to the last required confirmation.
    pub timeout: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }
}

/// Deploys one contract at a time through a [`ChainClient`].
///
/// Each call to [`ContractDeployer::deploy`] performs a new deployment: there is no
/// check for an existing deployment of the same artifact.
#[derive(Debug)]
pub struct ContractDeployer<'a, C> {
    client: &'a C,
    artifacts: &'a ArtifactStore,
    policy: ConfirmationPolicy,
}

impl<'a, C: ChainClient> ContractDeployer<'a, C> {
    pub fn new(client: &'a C, artifacts: &'a ArtifactStore, policy: ConfirmationPolicy) -> Self {
        Self {
            client,
            artifacts,
            policy,
        }
    }

    /// Deploy `spec` and block until `profile.required_confirmations` blocks confirm it.
    pub async fn deploy(
        &self,
        spec: &DeploymentSpec,
        profile: &NetworkProfile,
    ) -> Result<DeploymentResult, DeployError> {
        let artifact = self.artifacts.load(spec.artifact())?;
        let init_code = artifact.init_code(spec.constructor_args());

        tracing::info!(
            artifact = %spec.artifact(),
            network = %profile.name,
            from = %spec.sender().address(),
            args = ?spec.constructor_args(),
            "Deploying contract"
        );

        let tx_hash = self
            .client
            .submit_creation(spec.sender(), init_code)
            .await
            .map_err(|e| DeployError::SubmissionFailed {
                artifact: spec.artifact().to_string(),
                reason: format!("{:#}", e),
            })?;

        tracing::info!(
            artifact = %spec.artifact(),
            tx_hash = %tx_hash,
            confirmations = profile.required_confirmations,
            "Deployment transaction sent, waiting for confirmations"
        );

        let deadline = tokio::time::Instant::now() + self.policy.timeout;
        let timeout_error = |e: anyhow::Error| DeployError::ConfirmationTimeout {
            artifact: spec.artifact().to_string(),
            tx_hash,
            reason: format!("{:#}", e),
        };

        let receipt = self
            .wait_for_receipt(tx_hash, deadline)
            .await
            .map_err(timeout_error)?;

        if !receipt.succeeded() {
            return Err(DeployError::DeploymentReverted {
                artifact: spec.artifact().to_string(),
                tx_hash,
            });
        }

        let Some(contract_address) = receipt.contract_address else {
            tracing::warn!(tx_hash = %tx_hash, "Receipt has no contract address");
            return Err(DeployError::DeploymentReverted {
                artifact: spec.artifact().to_string(),
                tx_hash,
            });
        };

        let confirmations = self
            .wait_for_confirmations(
                receipt.block_number,
                profile.required_confirmations,
                deadline,
            )
            .await
            .map_err(timeout_error)?;

        tracing::info!(
            artifact = %spec.artifact(),
            address = %contract_address,
            block = receipt.block_number,
            confirmations,
            gas_used = ?receipt.gas_used,
            "Contract deployed"
        );

        Ok(DeploymentResult {
            artifact: spec.artifact().to_string(),
            contract_address,
            constructor_args: spec.constructor_args().to_vec(),
            confirmations,
            transaction_hash: tx_hash,
            block_number: receipt.block_number,
            deployer: spec.sender().address(),
            gas_used: receipt.gas_used,
        })
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        deadline: tokio::time::Instant,
    ) -> anyhow::Result<CreationReceipt> {
        let client = self.client;
        rpc::poll_until(
            "deployment receipt",
            remaining(deadline),
            self.policy.poll_interval,
            move || async move { client.transaction_receipt(tx_hash).await },
        )
        .await
    }

    /// Wait until `head - mined_block + 1 >= required`; returns the observed count.
    async fn wait_for_confirmations(
        &self,
        mined_block: u64,
        required: u64,
        deadline: tokio::time::Instant,
    ) -> anyhow::Result<u64> {
        let client = self.client;
        rpc::poll_until(
            "block confirmations",
            remaining(deadline),
            self.policy.poll_interval,
            move || async move {
                let head = client.block_number().await?;
                let observed = confirmations_at(head, mined_block);
                tracing::debug!(head, mined_block, observed, required, "Polled confirmations");
                Ok((observed >= required).then_some(observed))
            },
        )
        .await
    }
}

/// Number of confirmations of a transaction mined in `mined_block` when the head is `head`.
fn confirmations_at(head: u64, mined_block: u64) -> u64 {
    (head + 1).saturating_sub(mined_block)
}

fn remaining(deadline: tokio::time::Instant) -> Duration {
    deadline.saturating_duration_since(tokio::time::Instant::now())
}
