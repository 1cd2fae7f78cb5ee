//! Human-readable output.

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use zeyphr_deploy::{NetworksConfig, PipelineReport, PipelineStatus};

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.iter().copied());
    table
}

pub fn print_report(report: &PipelineReport) {
    let chain_id = report
        .chain_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let kind = if report.development {
        "development"
    } else {
        "persistent"
    };
    println!("Network: {} (chain {}, {})", report.network, chain_id, kind);

    let mut contracts = table(&[
        "Contract",
        "Deployment",
        "Tx hash",
        "Confirmations",
        "Verification",
        "Explorer",
    ]);
    for contract in &report.contracts {
        let deployment = contract.deployment.as_ref();
        contracts.add_row(vec![
            Cell::new(&contract.contract),
            Cell::new(contract.deployment_summary()),
            Cell::new(
                deployment
                    .map(|d| d.transaction_hash.to_string())
                    .unwrap_or_default(),
            ),
            Cell::new(
                deployment
                    .map(|d| d.confirmations.to_string())
                    .unwrap_or_default(),
            ),
            Cell::new(&contract.verification),
            Cell::new(contract.explorer_url.as_deref().unwrap_or_default()),
        ]);
    }
    println!("{contracts}");

    let status = match &report.status {
        PipelineStatus::Complete => Cell::new(&report.status).fg(Color::Green),
        PipelineStatus::Failed { .. } => Cell::new(&report.status).fg(Color::Red),
    };
    let mut summary = Table::new();
    summary.load_preset(UTF8_FULL_CONDENSED).add_row(vec![status]);
    println!("{summary}");
}

pub fn print_networks(networks: &NetworksConfig) {
    let mut table = table(&[
        "Network",
        "Chain ID",
        "Confirmations",
        "Development",
        "RPC URL",
        "Explorer API",
    ]);

    for (name, entry) in networks.entries() {
        table.add_row(vec![
            name.to_string(),
            entry.chain_id.to_string(),
            entry.block_confirmations.max(1).to_string(),
            networks.is_development_network(name).to_string(),
            entry
                .rpc_url
                .as_ref()
                .map(|url| url.to_string())
                .unwrap_or_default(),
            entry
                .explorer_api_url
                .as_ref()
                .map(|url| url.to_string())
                .unwrap_or_default(),
        ]);
    }

    println!("{table}");
}
