//! Deployment specs, results and constructor arguments.

use std::fmt;

use alloy_core::dyn_abi::DynSolValue;
use alloy_core::primitives::{Address, Bytes, TxHash, U256};
use serde::{Deserialize, Serialize};

use crate::Sender;

/// Artifact name of the admin contract.
pub const ADMIN_ARTIFACT: &str = "ZeyphrAdmin";
/// Artifact name of the marketplace contract.
pub const MARKETPLACE_ARTIFACT: &str = "ZeyphrMarketplace";

/// Default marketplace fee, in percent.
pub const DEFAULT_FEE_PERCENT: u64 = 1;

/// A single constructor argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ConstructorArg {
    Uint(U256),
    Address(Address),
}

impl fmt::Display for ConstructorArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(value) => write!(f, "{}", value),
            Self::Address(address) => write!(f, "{}", address),
        }
    }
}

impl From<&ConstructorArg> for DynSolValue {
    fn from(arg: &ConstructorArg) -> Self {
        match arg {
            ConstructorArg::Uint(value) => DynSolValue::Uint(*value, 256),
            ConstructorArg::Address(address) => DynSolValue::Address(*address),
        }
    }
}

/// ABI-encode constructor arguments as they are appended to the creation bytecode.
pub fn encode_constructor_args(args: &[ConstructorArg]) -> Bytes {
    if args.is_empty() {
        return Bytes::new();
    }
    DynSolValue::Tuple(args.iter().map(DynSolValue::from).collect())
        .abi_encode_params()
        .into()
}

/// Everything needed to deploy one contract. Immutable once built.
#[derive(Debug, Clone)]
pub struct DeploymentSpec {
    artifact: String,
    constructor_args: Vec<ConstructorArg>,
    sender: Sender,
}

impl DeploymentSpec {
    pub fn new(
        artifact: impl Into<String>,
        constructor_args: Vec<ConstructorArg>,
        sender: Sender,
    ) -> Self {
        Self {
            artifact: artifact.into(),
            constructor_args,
            sender,
        }
    }

    /// The admin contract: `constructor(uint256 feePercent, address feeAccount)`.
    pub fn admin(fee_percent: u64, fee_account: Address, sender: Sender) -> Self {
        Self::new(
            ADMIN_ARTIFACT,
            vec![
                ConstructorArg::Uint(U256::from(fee_percent)),
                ConstructorArg::Address(fee_account),
            ],
            sender,
        )
    }

    /// The marketplace contract: `constructor(address admin)`.
    ///
    /// Only constructible from a successful admin deployment.
    pub fn marketplace(admin: &DeploymentResult, sender: Sender) -> Self {
        Self::new(
            MARKETPLACE_ARTIFACT,
            vec![ConstructorArg::Address(admin.contract_address)],
            sender,
        )
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub fn constructor_args(&self) -> &[ConstructorArg] {
        &self.constructor_args
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }
}

/// Outcome of a successful, confirmed deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResult {
    pub artifact: String,
    pub contract_address: Address,
    pub constructor_args: Vec<ConstructorArg>,
    pub confirmations: u64,
    pub transaction_hash: TxHash,
    pub block_number: u64,
    pub deployer: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
}

/// Input of the verification submitter, derived from a [`DeploymentResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    artifact: String,
    contract_address: Address,
    constructor_args: Vec<ConstructorArg>,
}

impl VerificationRequest {
    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    pub fn constructor_args(&self) -> &[ConstructorArg] {
        &self.constructor_args
    }
}

impl From<&DeploymentResult> for VerificationRequest {
    fn from(result: &DeploymentResult) -> Self {
        Self {
            artifact: result.artifact.clone(),
            contract_address: result.contract_address,
            constructor_args: result.constructor_args.clone(),
        }
    }
}
