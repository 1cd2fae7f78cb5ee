//! zeyphr-deploy - Deployment library for the Zeyphr marketplace contracts.
//!
//! This crate deploys the `ZeyphrAdmin` contract, then the `ZeyphrMarketplace` contract
//! wired to the Admin's address, waits for the configured number of confirmations and,
//! on persistent networks only, verifies both contracts on the network's block explorer.

mod accounts;
pub use accounts::{DEPLOYER_ROLE, NamedAccounts, PLAYER_ROLE, PrivateKey, Sender};

mod artifacts;
pub use artifacts::{Artifact, ArtifactStore, BuildInfo};

mod chain;
pub use chain::{ChainClient, CreationReceipt, RpcChainClient};

mod config;
pub use config::{CONFIG_FILENAME, DeployConfig, ENV_PREFIX};

mod deployer;
pub use deployer::{
    ConfirmationPolicy, ContractDeployer, DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_POLL_INTERVAL,
};

mod deployment;
pub use deployment::{
    ADMIN_ARTIFACT, ConstructorArg, DEFAULT_FEE_PERCENT, DeploymentResult, DeploymentSpec,
    MARKETPLACE_ARTIFACT, VerificationRequest, encode_constructor_args,
};

mod error;
pub use error::DeployError;

mod fs;

mod network;
pub use network::{
    HARDHAT_NETWORK, IOTA_CHAIN_ID, IOTA_NETWORK, LOCAL_CHAIN_ID, LOCAL_RPC_URL,
    LOCALHOST_NETWORK, NetworkEntry, NetworkProfile, NetworksConfig,
    default_development_networks, default_networks,
};

mod pipeline;
pub use pipeline::{
    DeploymentSummary, Pipeline, PipelineAccounts, PipelineFailure, PipelineState, Stage,
};

mod records;
pub use records::{DeploymentRecord, RecordStore};

mod report;
pub use report::{ContractReport, PipelineReport, PipelineStatus, VerificationStatus};

pub mod rpc;

mod tx;
pub use tx::LegacyCreation;

mod verify;
pub use verify::{EtherscanVerifier, VerificationOutcome, Verifier, VerifierSettings};
