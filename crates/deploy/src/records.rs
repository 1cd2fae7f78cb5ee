//! Deployment records written after a run, one JSON file per contract.
//!
//! Layout: `<records_dir>/<network>/<Contract>.json`. Records are informational only;
//! nothing reads them back, so every run deploys fresh contracts.

use std::path::{Path, PathBuf};

use alloy_core::primitives::{Address, TxHash};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fs::FsHandler;
use crate::{ConstructorArg, DeploymentResult, PipelineReport};

/// What is persisted about one deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub contract_name: String,
    pub address: Address,
    pub network: String,
    pub chain_id: u64,
    pub transaction_hash: TxHash,
    pub block_number: u64,
    pub deployer: Address,
    pub args: Vec<ConstructorArg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    pub deployed_at: DateTime<Utc>,
}

impl DeploymentRecord {
    pub fn new(
        network: &str,
        chain_id: u64,
        deployment: &DeploymentResult,
        verified: Option<bool>,
    ) -> Self {
        Self {
            contract_name: deployment.artifact.clone(),
            address: deployment.contract_address,
            network: network.to_string(),
            chain_id,
            transaction_hash: deployment.transaction_hash,
            block_number: deployment.block_number,
            deployer: deployment.deployer,
            args: deployment.constructor_args.clone(),
            gas_used: deployment.gas_used,
            verified,
            deployed_at: Utc::now(),
        }
    }
}

/// Writes [`DeploymentRecord`]s below a root directory.
#[derive(Debug, Clone)]
pub struct RecordStore {
    root: PathBuf,
}

impl RecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn record_path(&self, network: &str, contract: &str) -> PathBuf {
        self.root.join(network).join(format!("{}.json", contract))
    }

    pub fn save(&self, record: &DeploymentRecord) -> Result<PathBuf> {
        let path = self.record_path(&record.network, &record.contract_name);
        FsHandler::write_json(&path, record)?;
        tracing::info!(
            contract = %record.contract_name,
            address = %record.address,
            path = %path.display(),
            "Deployment record saved"
        );
        Ok(path)
    }

    /// Save a record for every contract the run deployed, whatever its final status.
    pub fn save_report(&self, report: &PipelineReport) -> Result<Vec<PathBuf>> {
        let Some(chain_id) = report.chain_id else {
            return Ok(vec![]);
        };

        report
            .contracts
            .iter()
            .filter_map(|contract| {
                let deployment = contract.deployment.as_ref()?;
                let verified = contract.verification_outcome().map(|o| o.is_verified());
                Some(DeploymentRecord::new(&report.network, chain_id, deployment, verified))
            })
            .map(|record| self.save(&record))
            .collect()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
