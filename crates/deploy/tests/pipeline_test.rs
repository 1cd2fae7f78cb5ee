//! Integration tests for zeyphr-deploy.
//!
//! These tests drive the whole pipeline through the public API against an in-memory
//! chain and a scripted explorer. Artifacts are written to a temporary directory in the
//! Hardhat layout, so no node, compiler or network access is needed.
//! Run with: cargo test --test pipeline_test

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, U256, keccak256};
use anyhow::Result;
use tempdir::TempDir;
use url::Url;
use zeyphr_deploy::{
    ADMIN_ARTIFACT, ArtifactStore, ChainClient, ConfirmationPolicy, ConstructorArg,
    ContractDeployer, CreationReceipt, DeployConfig, DeployError, HARDHAT_NETWORK, IOTA_CHAIN_ID,
    IOTA_NETWORK, LOCAL_CHAIN_ID, MARKETPLACE_ARTIFACT, NetworkEntry, NetworkProfile,
    NetworksConfig, Pipeline, PipelineAccounts, PipelineReport, PipelineStatus, RecordStore,
    Sender, Stage, VerificationOutcome, VerificationRequest, Verifier, encode_constructor_args,
};

const ADMIN_BYTECODE: &str = "0x60806040526001";
const MARKETPLACE_BYTECODE: &str = "0x60806040526002";

#[derive(Debug, Clone)]
struct SentTransaction {
    from: Address,
    init_code: Bytes,
    hash: B256,
    block: u64,
    address: Address,
}

#[derive(Debug, Default)]
struct ChainState {
    head: u64,
    sent: Vec<SentTransaction>,
}

/// In-memory chain: every head query mines a block.
#[derive(Debug)]
struct TestChain {
    chain_id: u64,
    state: Mutex<ChainState>,
    /// Creation code whose deployment reverts.
    revert_code: Option<Bytes>,
}

impl TestChain {
    fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            state: Mutex::default(),
            revert_code: None,
        }
    }

    fn reverting(mut self, bytecode: &str) -> Self {
        self.revert_code = Some(bytecode.parse().unwrap());
        self
    }

    fn sent(&self) -> Vec<SentTransaction> {
        self.state.lock().unwrap().sent.clone()
    }
}

impl ChainClient for TestChain {
    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain_id)
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        Ok(vec![Address::repeat_byte(0xaa), Address::repeat_byte(0xbb)])
    }

    async fn submit_creation(&self, sender: &Sender, init_code: Bytes) -> Result<B256> {
        let mut state = self.state.lock().unwrap();
        state.head += 1;
        let nonce = state.sent.len() as u64;
        let mut preimage = sender.address().to_vec();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        let hash = keccak256(&preimage);
        let address = Address::from_word(keccak256(hash));
        let block = state.head;
        state.sent.push(SentTransaction {
            from: sender.address(),
            init_code,
            hash,
            block,
            address,
        });
        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<CreationReceipt>> {
        let state = self.state.lock().unwrap();
        let Some(tx) = state.sent.iter().find(|tx| tx.hash == hash) else {
            return Ok(None);
        };
        let reverted = self
            .revert_code
            .as_ref()
            .is_some_and(|code| tx.init_code.starts_with(code));
        Ok(Some(CreationReceipt {
            transaction_hash: hash,
            block_number: tx.block,
            status: Some(u64::from(!reverted)),
            contract_address: (!reverted).then_some(tx.address),
            gas_used: Some(500_000),
        }))
    }

    async fn block_number(&self) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.head += 1;
        Ok(state.head)
    }
}

/// Explorer double answering from a script, in call order.
#[derive(Debug, Default)]
struct TestExplorer {
    script: Mutex<Vec<VerificationOutcome>>,
    calls: Mutex<Vec<VerificationRequest>>,
}

impl TestExplorer {
    fn answering(script: Vec<VerificationOutcome>) -> Self {
        Self {
            script: Mutex::new(script),
            calls: Mutex::default(),
        }
    }

    fn calls(&self) -> Vec<VerificationRequest> {
        self.calls.lock().unwrap().clone()
    }
}

impl Verifier for TestExplorer {
    async fn verify(
        &self,
        request: &VerificationRequest,
        profile: &NetworkProfile,
    ) -> Result<VerificationOutcome, DeployError> {
        if profile.explorer_api_url.is_none() {
            return Err(DeployError::MissingExplorerConfig {
                network: profile.name.clone(),
            });
        }
        self.calls.lock().unwrap().push(request.clone());
        let mut script = self.script.lock().unwrap();
        Ok(if script.is_empty() {
            VerificationOutcome::Verified
        } else {
            script.remove(0)
        })
    }
}

/// Test setup context: artifacts on disk plus the network table.
struct TestContext {
    dir: TempDir,
    networks: NetworksConfig,
    policy: ConfirmationPolicy,
}

impl TestContext {
    fn new(prefix: &str) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let dir = TempDir::new(prefix).unwrap();
        write_artifact(dir.path(), ADMIN_ARTIFACT, ADMIN_BYTECODE);
        write_artifact(dir.path(), MARKETPLACE_ARTIFACT, MARKETPLACE_BYTECODE);

        let mut table = zeyphr_deploy::default_networks();
        table.insert(
            IOTA_NETWORK.to_string(),
            NetworkEntry::new(IOTA_CHAIN_ID, 6).with_explorer(
                Url::parse("https://explorer.evm.iota.org/api").unwrap(),
                Some(Url::parse("https://explorer.evm.iota.org").unwrap()),
            ),
        );
        let networks =
            NetworksConfig::new(table, zeyphr_deploy::default_development_networks());

        Self {
            dir,
            networks,
            policy: ConfirmationPolicy {
                poll_interval: Duration::from_millis(1),
                timeout: Duration::from_secs(10),
            },
        }
    }

    fn artifacts(&self) -> ArtifactStore {
        ArtifactStore::new(self.dir.path().join("artifacts"))
    }

    async fn run(
        &self,
        network: &str,
        chain: &TestChain,
        explorer: &TestExplorer,
    ) -> PipelineReport {
        let artifacts = self.artifacts();
        let deployer = Address::repeat_byte(0xaa);
        let accounts = PipelineAccounts {
            deployer: Sender::Unlocked {
                role: "deployer".to_string(),
                address: deployer,
            },
            fee_account: deployer,
        };

        Pipeline::new(
            network,
            &self.networks,
            ContractDeployer::new(chain, &artifacts, self.policy),
            explorer,
            accounts,
            1,
        )
        .run()
        .await
    }
}

fn write_artifact(root: &Path, name: &str, bytecode: &str) {
    let dir = root.join(format!("artifacts/contracts/{name}.sol"));
    std::fs::create_dir_all(&dir).unwrap();
    let artifact = serde_json::json!({
        "_format": "hh-sol-artifact-1",
        "contractName": name,
        "sourceName": format!("contracts/{name}.sol"),
        "abi": [],
        "bytecode": bytecode,
    });
    std::fs::write(dir.join(format!("{name}.json")), artifact.to_string()).unwrap();
}

fn failed_stage(report: &PipelineReport) -> Option<Stage> {
    match &report.status {
        PipelineStatus::Failed { stage, .. } => Some(*stage),
        PipelineStatus::Complete => None,
    }
}

#[tokio::test]
async fn test_development_network_deploys_without_verification() {
    let ctx = TestContext::new("zeyphr-dev");
    let chain = TestChain::new(LOCAL_CHAIN_ID);
    let explorer = TestExplorer::default();

    let report = ctx.run(HARDHAT_NETWORK, &chain, &explorer).await;

    assert!(report.is_success(), "{:?}", report.status);
    assert_eq!(report.chain_id, Some(LOCAL_CHAIN_ID));
    assert!(explorer.calls().is_empty());

    let admin = report.contract(ADMIN_ARTIFACT).unwrap();
    let marketplace = report.contract(MARKETPLACE_ARTIFACT).unwrap();
    let admin_address = admin.address().unwrap();
    assert!(marketplace.address().is_some());
    assert_eq!(admin.verification_outcome(), None);
    assert_eq!(marketplace.verification_outcome(), None);

    assert_eq!(
        admin.deployment.as_ref().unwrap().constructor_args,
        vec![
            ConstructorArg::Uint(U256::from(1)),
            ConstructorArg::Address(Address::repeat_byte(0xaa)),
        ]
    );
    assert_eq!(
        marketplace.deployment.as_ref().unwrap().constructor_args,
        vec![ConstructorArg::Address(admin_address)]
    );

    // Admin first, then Marketplace whose init code carries the Admin address.
    let sent = chain.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|tx| tx.from == Address::repeat_byte(0xaa)));
    let marketplace_code: Bytes = MARKETPLACE_BYTECODE.parse().unwrap();
    assert!(sent[1].init_code.starts_with(&marketplace_code));
    assert_eq!(
        &sent[1].init_code[marketplace_code.len()..],
        encode_constructor_args(&[ConstructorArg::Address(admin_address)]).as_ref()
    );
}

#[tokio::test]
async fn test_persistent_network_waits_and_verifies_both() {
    let ctx = TestContext::new("zeyphr-iota");
    let chain = TestChain::new(IOTA_CHAIN_ID);
    let explorer = TestExplorer::answering(vec![
        VerificationOutcome::AlreadyVerified,
        VerificationOutcome::Verified,
    ]);

    let report = ctx.run(IOTA_NETWORK, &chain, &explorer).await;

    assert!(report.is_success(), "{:?}", report.status);
    assert!(!report.development);
    for contract in &report.contracts {
        assert!(contract.verified(), "{} not verified", contract.contract);
        assert!(contract.deployment.as_ref().unwrap().confirmations >= 6);
        let explorer_url = contract.explorer_url.as_deref().unwrap();
        assert!(explorer_url.starts_with("https://explorer.evm.iota.org/address/"));
    }

    let calls = explorer.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].artifact(), ADMIN_ARTIFACT);
    assert_eq!(calls[1].artifact(), MARKETPLACE_ARTIFACT);
    assert_eq!(
        calls[1].constructor_args(),
        &[ConstructorArg::Address(
            report.contract(ADMIN_ARTIFACT).unwrap().address().unwrap()
        )]
    );
}

#[tokio::test]
async fn test_unknown_network_sends_no_transaction() {
    let ctx = TestContext::new("zeyphr-unknown");
    let chain = TestChain::new(LOCAL_CHAIN_ID);
    let explorer = TestExplorer::default();

    let report = ctx.run("goerli", &chain, &explorer).await;

    assert_eq!(failed_stage(&report), Some(Stage::Network));
    let PipelineStatus::Failed { error, .. } = &report.status else {
        unreachable!()
    };
    assert!(error.contains("unknown network `goerli`"));
    assert!(chain.sent().is_empty());
    assert!(explorer.calls().is_empty());
    assert!(report.deployments().next().is_none());
}

#[tokio::test]
async fn test_marketplace_revert_keeps_admin_and_skips_verification() {
    let ctx = TestContext::new("zeyphr-revert");
    let chain = TestChain::new(IOTA_CHAIN_ID).reverting(MARKETPLACE_BYTECODE);
    let explorer = TestExplorer::default();

    let report = ctx.run(IOTA_NETWORK, &chain, &explorer).await;

    assert_eq!(failed_stage(&report), Some(Stage::Marketplace));
    let admin = report.contract(ADMIN_ARTIFACT).unwrap();
    assert!(admin.address().is_some());
    assert!(admin.error.is_none());

    let marketplace = report.contract(MARKETPLACE_ARTIFACT).unwrap();
    assert!(marketplace.address().is_none());
    assert!(marketplace.error.as_ref().unwrap().contains("reverted"));

    assert!(explorer.calls().is_empty());
    assert_eq!(chain.sent().len(), 2);
}

#[tokio::test]
async fn test_admin_failure_never_deploys_marketplace() {
    let ctx = TestContext::new("zeyphr-admin");
    let chain = TestChain::new(LOCAL_CHAIN_ID).reverting(ADMIN_BYTECODE);
    let explorer = TestExplorer::default();

    let report = ctx.run(HARDHAT_NETWORK, &chain, &explorer).await;

    assert_eq!(failed_stage(&report), Some(Stage::Admin));
    assert_eq!(chain.sent().len(), 1);
    assert!(report.deployments().next().is_none());
}

#[tokio::test]
async fn test_missing_artifact_fails_admin_stage() {
    let ctx = TestContext::new("zeyphr-missing");
    std::fs::remove_dir_all(ctx.dir.path().join(format!(
        "artifacts/contracts/{}.sol",
        ADMIN_ARTIFACT
    )))
    .unwrap();
    let chain = TestChain::new(LOCAL_CHAIN_ID);
    let explorer = TestExplorer::default();

    let report = ctx.run(HARDHAT_NETWORK, &chain, &explorer).await;

    assert_eq!(failed_stage(&report), Some(Stage::Admin));
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn test_records_written_for_deployed_contracts() {
    let ctx = TestContext::new("zeyphr-records");
    let chain = TestChain::new(LOCAL_CHAIN_ID);
    let explorer = TestExplorer::default();
    let report = ctx.run(HARDHAT_NETWORK, &chain, &explorer).await;

    let store = RecordStore::new(ctx.dir.path().join("deployments"));
    let paths = store.save_report(&report).unwrap();

    assert_eq!(paths.len(), 2);
    let admin: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(store.record_path(HARDHAT_NETWORK, ADMIN_ARTIFACT)).unwrap(),
    )
    .unwrap();
    assert_eq!(admin["contractName"], ADMIN_ARTIFACT);
    assert_eq!(admin["chainId"], LOCAL_CHAIN_ID);
    assert_eq!(
        admin["address"].as_str().unwrap().to_lowercase(),
        report
            .contract(ADMIN_ARTIFACT)
            .unwrap()
            .address()
            .unwrap()
            .to_string()
            .to_lowercase()
    );
}

#[tokio::test]
async fn test_config_file_defines_custom_development_network() {
    let ctx = TestContext::new("zeyphr-config");
    std::fs::write(
        ctx.dir.path().join("Zeyphr.toml"),
        r#"
development_networks = ["hardhat", "localhost", "devnet"]

[networks.devnet]
chain_id = 4242
block_confirmations = 0
"#,
    )
    .unwrap();

    let config = DeployConfig::load(Some(ctx.dir.path())).unwrap();
    let networks = config.networks_config();
    assert!(networks.is_development_network("devnet"));

    let profile = networks.resolve("devnet").unwrap();
    assert_eq!(profile.required_confirmations, 1);

    let chain = TestChain::new(4242);
    let explorer = TestExplorer::default();
    let artifacts = ctx.artifacts();
    let deployer = Address::repeat_byte(0xaa);
    let report = Pipeline::new(
        "devnet",
        &networks,
        ContractDeployer::new(&chain, &artifacts, ctx.policy),
        &explorer,
        PipelineAccounts {
            deployer: Sender::Unlocked {
                role: "deployer".to_string(),
                address: deployer,
            },
            fee_account: Address::repeat_byte(0xbb),
        },
        config.fee_percent,
    )
    .run()
    .await;

    assert!(report.is_success(), "{:?}", report.status);
    assert!(explorer.calls().is_empty());
    assert_eq!(
        report.contract(ADMIN_ARTIFACT).unwrap().deployment.as_ref().unwrap().constructor_args[1],
        ConstructorArg::Address(Address::repeat_byte(0xbb))
    );
}
