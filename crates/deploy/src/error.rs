//! Error taxonomy for the deployment pipeline.

use alloy_core::primitives::TxHash;

/// Errors that abort a deployment pipeline run.
///
/// Verification failures are not represented here: they are recorded as
/// [`crate::VerificationOutcome::Failed`] and never halt the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum DeployError {
    /// No profile is registered for the requested network.
    #[display("unknown network `{network}`: no profile is configured for it")]
    UnknownNetwork { network: String },

    /// The network identifier is empty or blank.
    #[display("network name must not be empty")]
    InvalidNetworkName,

    /// No artifact with this name could be found in the artifact store.
    #[display("artifact `{artifact}` not found: {reason}")]
    ArtifactNotFound { artifact: String, reason: String },

    /// The artifact exists but cannot be deployed as-is.
    #[display("artifact `{artifact}` is invalid: {reason}")]
    InvalidArtifact { artifact: String, reason: String },

    /// The chain client rejected the creation transaction before it was mined.
    #[display("failed to submit deployment of `{artifact}`: {reason}")]
    SubmissionFailed { artifact: String, reason: String },

    /// The creation transaction was mined but reverted.
    #[display("deployment of `{artifact}` reverted in transaction {tx_hash}")]
    DeploymentReverted { artifact: String, tx_hash: TxHash },

    /// Waiting for the receipt or the confirmations failed or timed out.
    #[display("confirmation of `{artifact}` (tx {tx_hash}) failed: {reason}")]
    ConfirmationTimeout {
        artifact: String,
        tx_hash: TxHash,
        reason: String,
    },

    /// Verification was requested for a network without an explorer API URL.
    #[display("network `{network}` is not a development network but has no explorer API URL")]
    MissingExplorerConfig { network: String },
}
