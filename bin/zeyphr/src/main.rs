//! zeyphr deploys the Zeyphr marketplace contracts and verifies them on persistent networks.

mod cli;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use url::Url;

use cli::{Cli, Command, DEFAULT_EXPLORER_API_KEY, DeployArgs};
use zeyphr_deploy::{
    ArtifactStore, ChainClient, ContractDeployer, DEPLOYER_ROLE, DeployConfig, EtherscanVerifier,
    IOTA_NETWORK, NetworkProfile, NetworksConfig, Pipeline, PipelineAccounts, PipelineReport,
    PrivateKey, RecordStore, RpcChainClient, VerifierSettings,
};

/// Legacy variable holding the RPC endpoint of the iota network.
const IOTA_RPC_URL_ENV: &str = "IOTA_RPC_URL";

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // A missing .env file is fine.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    match cli.command {
        Command::Deploy(args) => {
            let config = DeployConfig::load(Some(cli.config.as_path()))?;
            deploy(config, args).await
        }
        Command::Networks => {
            let config = DeployConfig::load(Some(cli.config.as_path()))?;
            output::print_networks(&config.networks_config());
            Ok(ExitCode::SUCCESS)
        }
        Command::Init { path, force } => {
            init(path.unwrap_or(cli.config), force)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn deploy(mut config: DeployConfig, args: DeployArgs) -> Result<ExitCode> {
    apply_overrides(&mut config, &args);

    let networks = config.networks_config();
    let development = networks.is_development_network(&args.network);

    tracing::info!(
        network = %args.network,
        development,
        artifacts = %config.artifacts_dir.display(),
        fee_percent = config.fee_percent,
        "Starting deployment..."
    );

    let report = match connect(&config, &networks, &args.network).await {
        Ok((client, accounts)) => {
            let artifacts = ArtifactStore::new(&config.artifacts_dir);
            let verifier = EtherscanVerifier::new(artifacts.clone(), VerifierSettings::default())?;
            let deployer =
                ContractDeployer::new(&client, &artifacts, config.confirmation_policy());

            Pipeline::new(
                args.network.as_str(),
                &networks,
                deployer,
                &verifier,
                accounts,
                config.fee_percent,
            )
            .run()
            .await
        }
        Err(e) => {
            let reason = format!("{:#}", e);
            tracing::error!(network = %args.network, error = %reason, "Cannot start deployment");
            PipelineReport::network_failure(&args.network, development, reason)
        }
    };

    if !args.no_save {
        let records = RecordStore::new(&config.records_dir);
        match records.save_report(&report) {
            Ok(paths) => tracing::debug!(
                dir = %records.root().display(),
                count = paths.len(),
                "Deployment records written"
            ),
            Err(e) => tracing::warn!(error = ?e, "Failed to save deployment records"),
        }
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize the report")?
        );
    } else {
        output::print_report(&report);
    }

    for failure in report.verification_failures() {
        tracing::warn!(
            contract = %failure.contract,
            verification = %failure.verification,
            "Contract deployed but not verified"
        );
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Apply the command line overrides to the target network and the run settings.
fn apply_overrides(config: &mut DeployConfig, args: &DeployArgs) {
    if let Some(fee_percent) = args.fee_percent {
        config.fee_percent = fee_percent;
    }
    if let Some(artifacts) = &args.artifacts {
        config.artifacts_dir = artifacts.clone();
    }

    let development = config
        .development_networks
        .contains(args.network.trim());

    // Unknown networks are reported by the pipeline.
    let Some(entry) = config.network_entry_mut(&args.network) else {
        return;
    };

    if let Some(rpc_url) = args.rpc_url.clone().or_else(|| legacy_rpc_url(&args.network)) {
        entry.rpc_url = Some(rpc_url);
    }

    // Development networks deploy from the node's unlocked accounts and are never verified.
    if development {
        if args.private_key.is_some() || args.explorer_api_url.is_some() {
            tracing::debug!(
                network = %args.network,
                "Ignoring key and explorer overrides on a development network"
            );
        }
        return;
    }

    if let Some(key) = &args.private_key {
        entry.accounts = vec![PrivateKey::new(key.as_str())];
    }
    if let Some(api_url) = &args.explorer_api_url {
        entry.explorer_api_url = Some(api_url.clone());
    }
    if let Some(browser_url) = &args.explorer_url {
        entry.explorer_browser_url = Some(browser_url.clone());
    }
    if entry.explorer_api_key.is_none() || args.explorer_api_key != DEFAULT_EXPLORER_API_KEY {
        entry.explorer_api_key = Some(args.explorer_api_key.clone());
    }
}

fn legacy_rpc_url(network: &str) -> Option<Url> {
    if network.trim() != IOTA_NETWORK {
        return None;
    }
    let value = std::env::var(IOTA_RPC_URL_ENV).ok()?;
    match Url::parse(value.trim()) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(var = IOTA_RPC_URL_ENV, error = %e, "Ignoring invalid RPC URL");
            None
        }
    }
}

/// Reach the network's node and resolve the accounts of the run.
async fn connect(
    config: &DeployConfig,
    networks: &NetworksConfig,
    network: &str,
) -> Result<(RpcChainClient, PipelineAccounts)> {
    let profile = networks.resolve(network)?;
    let rpc_url = profile
        .rpc_url
        .clone()
        .with_context(|| format!("Network `{}` has no RPC URL configured", profile.name))?;

    let client = RpcChainClient::new(rpc_url, profile.chain_id)?;
    check_chain_id(&client, &profile).await?;

    let deployer = config
        .named_accounts
        .resolve(DEPLOYER_ROLE, &profile, &client)
        .await?;
    let fee_account = if config.fee_account == DEPLOYER_ROLE {
        deployer.address()
    } else {
        config
            .named_accounts
            .resolve(&config.fee_account, &profile, &client)
            .await?
            .address()
    };

    tracing::info!(
        deployer = %deployer.address(),
        fee_account = %fee_account,
        rpc_url = %client.url(),
        "Accounts resolved"
    );

    Ok((
        client,
        PipelineAccounts {
            deployer,
            fee_account,
        },
    ))
}

async fn check_chain_id(client: &RpcChainClient, profile: &NetworkProfile) -> Result<()> {
    let chain_id = client
        .chain_id()
        .await
        .with_context(|| format!("Failed to reach the node at {}", client.url()))?;

    if chain_id != profile.chain_id {
        anyhow::bail!(
            "Node at {} reports chain ID {} but network `{}` expects {}",
            client.url(),
            chain_id,
            profile.name,
            profile.chain_id
        );
    }

    Ok(())
}

fn init(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        );
    }
    DeployConfig::default().save_to_file(&path)
}
