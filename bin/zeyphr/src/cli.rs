use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use url::Url;
use zeyphr_deploy::{CONFIG_FILENAME, HARDHAT_NETWORK};

/// API key sent to explorers that do not require one.
pub const DEFAULT_EXPLORER_API_KEY: &str = "empty";

#[derive(Parser)]
#[command(name = "zeyphr")]
#[command(
    author,
    version,
    about = "Deploy and verify the Zeyphr marketplace contracts"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, global = true, env = "ZEYPHR_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the configuration file, or to a directory containing a Zeyphr.toml.
    #[arg(long, alias = "conf", global = true, env = "ZEYPHR_CONFIG", default_value = CONFIG_FILENAME)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy the Admin and Marketplace contracts, then verify them on persistent networks.
    Deploy(DeployArgs),

    /// List the configured networks.
    Networks,

    /// Write the default configuration file.
    Init {
        /// Where to write the configuration. Defaults to the `--config` path.
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Debug, Clone, Args)]
pub struct DeployArgs {
    /// The network to deploy to.
    #[arg(short, long, env = "ZEYPHR_NETWORK", default_value = HARDHAT_NETWORK)]
    pub network: String,

    /// JSON-RPC endpoint of the target network.
    #[arg(long, env = "ZEYPHR_RPC_URL")]
    pub rpc_url: Option<Url>,

    /// Private key of the deployer account. Replaces the configured keys of the network.
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Etherscan-compatible API endpoint of the network's explorer.
    #[arg(long, env = "EXPLORER_API")]
    pub explorer_api_url: Option<Url>,

    /// Human-facing URL of the network's explorer.
    #[arg(long, env = "EXPLORER")]
    pub explorer_url: Option<Url>,

    /// API key sent to the explorer.
    #[arg(long, env = "EXPLORER_API_KEY", hide_env_values = true, default_value = DEFAULT_EXPLORER_API_KEY)]
    pub explorer_api_key: String,

    /// Directory holding the compiled contract artifacts.
    #[arg(long, env = "ZEYPHR_ARTIFACTS")]
    pub artifacts: Option<PathBuf>,

    /// Marketplace fee in percent.
    #[arg(long, env = "ZEYPHR_FEE_PERCENT")]
    pub fee_percent: Option<u64>,

    /// Do not write deployment records.
    #[arg(long, env = "ZEYPHR_NO_SAVE", default_value_t = false)]
    pub no_save: bool,

    /// Print the final report as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
