//! Final report of a pipeline run.

use std::fmt;

use alloy_core::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{ADMIN_ARTIFACT, DeploymentResult, MARKETPLACE_ARTIFACT, Stage, VerificationOutcome};

/// Terminal status of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineStatus {
    Complete,
    Failed { stage: Stage, error: String },
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => write!(f, "COMPLETE"),
            Self::Failed { stage, error } => write!(f, "FAILED at {} stage: {}", stage, error),
        }
    }
}

/// Whether and how a contract was verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VerificationStatus {
    Completed(VerificationOutcome),
    Skipped { reason: String },
    /// The run stopped before reaching verification.
    NotAttempted,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(VerificationOutcome::Verified) => write!(f, "verified"),
            Self::Completed(VerificationOutcome::AlreadyVerified) => {
                write!(f, "verified (already verified)")
            }
            Self::Completed(VerificationOutcome::Failed { reason }) => {
                write!(f, "failed: {}", reason)
            }
            Self::Skipped { reason } => write!(f, "skipped ({})", reason),
            Self::NotAttempted => write!(f, "not attempted"),
        }
    }
}

/// Per-contract line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractReport {
    pub contract: String,
    /// Present when the contract was deployed and confirmed.
    pub deployment: Option<DeploymentResult>,
    /// Why the deployment failed, for the contract that stopped the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub verification: VerificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
}

impl ContractReport {
    pub fn address(&self) -> Option<Address> {
        self.deployment.as_ref().map(|d| d.contract_address)
    }

    pub fn verification_outcome(&self) -> Option<&VerificationOutcome> {
        match &self.verification {
            VerificationStatus::Completed(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn verified(&self) -> bool {
        self.verification_outcome()
            .is_some_and(VerificationOutcome::is_verified)
    }

    /// Short deployment cell: the address, the failure, or "not deployed".
    pub fn deployment_summary(&self) -> String {
        match (&self.deployment, &self.error) {
            (Some(deployment), _) => deployment.contract_address.to_string(),
            (None, Some(error)) => format!("failed: {}", error),
            (None, None) => "not deployed".to_string(),
        }
    }
}

/// Everything a run produced, in deployment order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub network: String,
    /// Unknown when the network could not be resolved.
    pub chain_id: Option<u64>,
    pub development: bool,
    #[serde(flatten)]
    pub status: PipelineStatus,
    pub contracts: Vec<ContractReport>,
}

impl PipelineReport {
    /// Report of a run that stopped before any transaction: unresolvable network,
    /// unreachable node or unusable accounts.
    pub fn network_failure(network: &str, development: bool, error: impl fmt::Display) -> Self {
        let not_deployed = |contract: &str| ContractReport {
            contract: contract.to_string(),
            deployment: None,
            error: None,
            verification: VerificationStatus::NotAttempted,
            explorer_url: None,
        };

        Self {
            network: network.trim().to_string(),
            chain_id: None,
            development,
            status: PipelineStatus::Failed {
                stage: Stage::Network,
                error: error.to_string(),
            },
            contracts: vec![
                not_deployed(ADMIN_ARTIFACT),
                not_deployed(MARKETPLACE_ARTIFACT),
            ],
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PipelineStatus::Complete
    }

    pub fn contract(&self, name: &str) -> Option<&ContractReport> {
        self.contracts.iter().find(|c| c.contract == name)
    }

    /// Confirmed deployments of this run.
    pub fn deployments(&self) -> impl Iterator<Item = &DeploymentResult> {
        self.contracts.iter().filter_map(|c| c.deployment.as_ref())
    }

    /// Contracts whose verification was attempted and failed.
    pub fn verification_failures(&self) -> impl Iterator<Item = &ContractReport> {
        self.contracts.iter().filter(|c| {
            matches!(
                c.verification,
                VerificationStatus::Completed(VerificationOutcome::Failed { .. })
            )
        })
    }
}
