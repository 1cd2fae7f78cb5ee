//! The two-stage deployment pipeline: Admin, then Marketplace, then verification.
//!
//! The run is an explicit state machine. Each call to [`Pipeline::step`] performs one
//! transition; [`Pipeline::run`] drives it to a terminal state and builds the report.

use alloy_core::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{
    ADMIN_ARTIFACT, ChainClient, ContractDeployer, ContractReport, DeployError, DeploymentResult,
    DeploymentSpec, MARKETPLACE_ARTIFACT, NetworkProfile, NetworksConfig, PipelineReport,
    PipelineStatus, Sender, VerificationOutcome, VerificationRequest, VerificationStatus, Verifier,
};

/// Stage reported when a run fails.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    Network,
    Admin,
    Marketplace,
    Verification,
}

/// Accounts used by a run.
#[derive(Debug, Clone)]
pub struct PipelineAccounts {
    /// Sends both deployment transactions.
    pub deployer: Sender,
    /// Receives the marketplace fees, passed to the Admin constructor.
    pub fee_account: Address,
}

/// Both deployments of a completed run and their verification outcomes.
///
/// The outcomes are `None` when verification was skipped on a development network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentSummary {
    pub profile: NetworkProfile,
    pub admin: DeploymentResult,
    pub marketplace: DeploymentResult,
    pub admin_verification: Option<VerificationOutcome>,
    pub marketplace_verification: Option<VerificationOutcome>,
}

/// A failed run: the stage, the error and what was deployed before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineFailure {
    pub stage: Stage,
    pub error: DeployError,
    /// `None` when the network could not be resolved.
    pub profile: Option<NetworkProfile>,
    /// Confirmed deployments, never rolled back.
    pub deployed: Vec<DeploymentResult>,
}

/// States of a pipeline run.
#[derive(Debug, Clone, strum::IntoStaticStr)]
pub enum PipelineState {
    Start,
    AdminDeploying {
        profile: NetworkProfile,
        spec: DeploymentSpec,
    },
    AdminDeployed {
        profile: NetworkProfile,
        admin: DeploymentResult,
    },
    MarketplaceDeploying {
        profile: NetworkProfile,
        admin: DeploymentResult,
        spec: DeploymentSpec,
    },
    MarketplaceDeployed {
        profile: NetworkProfile,
        admin: DeploymentResult,
        marketplace: DeploymentResult,
    },
    Verifying {
        profile: NetworkProfile,
        admin: DeploymentResult,
        marketplace: DeploymentResult,
    },
    Complete(DeploymentSummary),
    Failed(PipelineFailure),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Failed(_))
    }

    fn name(&self) -> &'static str {
        self.into()
    }
}

/// Runs the deployment pipeline for one network.
pub struct Pipeline<'a, C, V> {
    network: String,
    networks: &'a NetworksConfig,
    deployer: ContractDeployer<'a, C>,
    verifier: &'a V,
    accounts: PipelineAccounts,
    fee_percent: u64,
    /// Evaluated once per run.
    verify: bool,
}

impl<'a, C: ChainClient, V: Verifier> Pipeline<'a, C, V> {
    pub fn new(
        network: impl Into<String>,
        networks: &'a NetworksConfig,
        deployer: ContractDeployer<'a, C>,
        verifier: &'a V,
        accounts: PipelineAccounts,
        fee_percent: u64,
    ) -> Self {
        let network = network.into();
        let verify = !networks.is_development_network(&network);
        Self {
            network,
            networks,
            deployer,
            verifier,
            accounts,
            fee_percent,
            verify,
        }
    }

    /// Whether this run verifies its contracts (persistent network).
    pub fn verifies(&self) -> bool {
        self.verify
    }

    /// Perform one transition. Terminal states are returned unchanged.
    pub async fn step(&self, state: PipelineState) -> PipelineState {
        match state {
            PipelineState::Start => self.start(),

            PipelineState::AdminDeploying { profile, spec } => {
                match self.deployer.deploy(&spec, &profile).await {
                    Ok(admin) => PipelineState::AdminDeployed { profile, admin },
                    Err(error) => failed(Stage::Admin, error, Some(profile), vec![]),
                }
            }

            PipelineState::AdminDeployed { profile, admin } => {
                let spec = DeploymentSpec::marketplace(&admin, self.accounts.deployer.clone());
                PipelineState::MarketplaceDeploying {
                    profile,
                    admin,
                    spec,
                }
            }

            PipelineState::MarketplaceDeploying {
                profile,
                admin,
                spec,
            } => match self.deployer.deploy(&spec, &profile).await {
                Ok(marketplace) => PipelineState::MarketplaceDeployed {
                    profile,
                    admin,
                    marketplace,
                },
                Err(error) => failed(Stage::Marketplace, error, Some(profile), vec![admin]),
            },

            PipelineState::MarketplaceDeployed {
                profile,
                admin,
                marketplace,
            } => {
                if self.verify {
                    PipelineState::Verifying {
                        profile,
                        admin,
                        marketplace,
                    }
                } else {
                    tracing::info!(
                        network = %profile.name,
                        "Development network, skipping contract verification"
                    );
                    PipelineState::Complete(DeploymentSummary {
                        profile,
                        admin,
                        marketplace,
                        admin_verification: None,
                        marketplace_verification: None,
                    })
                }
            }

            PipelineState::Verifying {
                profile,
                admin,
                marketplace,
            } => {
                let admin_verification = match self.verify_one(&admin, &profile).await {
                    Ok(outcome) => outcome,
                    Err(error) => {
                        return failed(Stage::Verification, error, Some(profile), vec![
                            admin,
                            marketplace,
                        ]);
                    }
                };
                let marketplace_verification = match self.verify_one(&marketplace, &profile).await
                {
                    Ok(outcome) => outcome,
                    Err(error) => {
                        return failed(Stage::Verification, error, Some(profile), vec![
                            admin,
                            marketplace,
                        ]);
                    }
                };

                PipelineState::Complete(DeploymentSummary {
                    profile,
                    admin,
                    marketplace,
                    admin_verification: Some(admin_verification),
                    marketplace_verification: Some(marketplace_verification),
                })
            }

            terminal @ (PipelineState::Complete(_) | PipelineState::Failed(_)) => terminal,
        }
    }

    /// Drive the state machine to a terminal state and report it.
    pub async fn run(&self) -> PipelineReport {
        let mut state = PipelineState::Start;

        while !state.is_terminal() {
            let from = state.name();
            state = self.step(state).await;
            tracing::info!(network = %self.network, from, to = state.name(), "Pipeline transition");
        }

        match &state {
            PipelineState::Complete(_) => {
                tracing::info!(network = %self.network, "Deployment pipeline complete")
            }
            PipelineState::Failed(failure) => tracing::error!(
                network = %self.network,
                stage = %failure.stage,
                error = %failure.error,
                deployed = failure.deployed.len(),
                "Deployment pipeline failed"
            ),
            _ => {}
        }

        self.report(state)
    }

    /// Resolve the network and prepare the Admin deployment.
    fn start(&self) -> PipelineState {
        let profile = match self.networks.resolve(&self.network) {
            Ok(profile) => profile,
            Err(error) => return failed(Stage::Network, error, None, vec![]),
        };

        // A persistent network that cannot be verified is rejected before spending gas.
        if self.verify && profile.explorer_api_url.is_none() {
            let error = DeployError::MissingExplorerConfig {
                network: profile.name.clone(),
            };
            return failed(Stage::Network, error, Some(profile), vec![]);
        }

        tracing::info!(
            network = %profile.name,
            chain_id = profile.chain_id,
            confirmations = profile.required_confirmations,
            verify = self.verify,
            "Resolved network"
        );

        let spec = DeploymentSpec::admin(
            self.fee_percent,
            self.accounts.fee_account,
            self.accounts.deployer.clone(),
        );
        PipelineState::AdminDeploying { profile, spec }
    }

    async fn verify_one(
        &self,
        deployment: &DeploymentResult,
        profile: &NetworkProfile,
    ) -> Result<VerificationOutcome, DeployError> {
        let request = VerificationRequest::from(deployment);
        let outcome = self.verifier.verify(&request, profile).await?;

        match &outcome {
            VerificationOutcome::Verified => tracing::info!(
                contract = %deployment.artifact,
                address = %deployment.contract_address,
                "Contract verified"
            ),
            VerificationOutcome::AlreadyVerified => tracing::info!(
                contract = %deployment.artifact,
                address = %deployment.contract_address,
                "Contract already verified"
            ),
            VerificationOutcome::Failed { reason } => tracing::warn!(
                contract = %deployment.artifact,
                address = %deployment.contract_address,
                %reason,
                "Contract verification failed"
            ),
        }

        Ok(outcome)
    }

    fn report(&self, state: PipelineState) -> PipelineReport {
        let development = !self.verify;

        match state {
            PipelineState::Complete(summary) => {
                let verification = |outcome: Option<VerificationOutcome>| match outcome {
                    Some(outcome) => VerificationStatus::Completed(outcome),
                    None => VerificationStatus::Skipped {
                        reason: "development network".to_string(),
                    },
                };
                PipelineReport {
                    network: summary.profile.name.clone(),
                    chain_id: Some(summary.profile.chain_id),
                    development,
                    status: PipelineStatus::Complete,
                    contracts: vec![
                        deployed_report(
                            summary.admin,
                            verification(summary.admin_verification),
                            Some(&summary.profile),
                        ),
                        deployed_report(
                            summary.marketplace,
                            verification(summary.marketplace_verification),
                            Some(&summary.profile),
                        ),
                    ],
                }
            }

            PipelineState::Failed(failure) => {
                let error_for = |contract: &str| {
                    let stopped_here = matches!(
                        (failure.stage, contract),
                        (Stage::Admin, ADMIN_ARTIFACT) | (Stage::Marketplace, MARKETPLACE_ARTIFACT)
                    );
                    stopped_here.then(|| failure.error.to_string())
                };

                let contracts: Vec<ContractReport> = [ADMIN_ARTIFACT, MARKETPLACE_ARTIFACT]
                    .into_iter()
                    .map(|contract| {
                        match failure.deployed.iter().find(|d| d.artifact == contract) {
                            Some(deployment) => deployed_report(
                                deployment.clone(),
                                VerificationStatus::NotAttempted,
                                failure.profile.as_ref(),
                            ),
                            None => ContractReport {
                                contract: contract.to_string(),
                                deployment: None,
                                error: error_for(contract),
                                verification: VerificationStatus::NotAttempted,
                                explorer_url: None,
                            },
                        }
                    })
                    .collect();

                PipelineReport {
                    network: self.network.trim().to_string(),
                    chain_id: failure.profile.as_ref().map(|p| p.chain_id),
                    development,
                    status: PipelineStatus::Failed {
                        stage: failure.stage,
                        error: failure.error.to_string(),
                    },
                    contracts,
                }
            }

            // `run` only reports terminal states.
            other => PipelineReport {
                network: self.network.clone(),
                chain_id: None,
                development,
                status: PipelineStatus::Failed {
                    stage: Stage::Network,
                    error: format!("pipeline stopped in state {}", other.name()),
                },
                contracts: vec![],
            },
        }
    }
}

fn failed(
    stage: Stage,
    error: DeployError,
    profile: Option<NetworkProfile>,
    deployed: Vec<DeploymentResult>,
) -> PipelineState {
    PipelineState::Failed(PipelineFailure {
        stage,
        error,
        profile,
        deployed,
    })
}

fn deployed_report(
    deployment: DeploymentResult,
    verification: VerificationStatus,
    profile: Option<&NetworkProfile>,
) -> ContractReport {
    ContractReport {
        contract: deployment.artifact.clone(),
        explorer_url: profile.and_then(|p| p.explorer_address_url(deployment.contract_address)),
        deployment: Some(deployment),
        error: None,
        verification,
    }
}
