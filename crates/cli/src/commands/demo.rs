// Path: crates/cli/src/commands/demo.rs

use anyhow::{Context, Result};
use clap::Parser;
use ledger_client::{History, LedgerClient, MemoryNetwork};
use ledger_types::app::{QueryResult, TransactionResult};
use ledger_types::config::ClientConfig;
use std::path::PathBuf;
use std::sync::Arc;

const KEY: &str = "hello";

#[derive(Parser, Debug)]
pub struct DemoArgs {
    /// Client configuration file. Defaults are used when omitted.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Endorsing peers of the in-memory network.
    #[clap(
        long,
        value_delimiter = ',',
        default_value = "peer0.org1.hf.chainhero.io,peer1.org1.hf.chainhero.io"
    )]
    pub peers: Vec<String>,

    /// Print the collected metrics in Prometheus text format at the end.
    #[clap(long)]
    pub metrics: bool,
}

fn user(name: &str) -> String {
    serde_json::json!({ "id": 1, "name": name, "Gender": "Male" }).to_string()
}

pub async fn run(args: DemoArgs) -> Result<()> {
    if args.metrics {
        ledger_telemetry::prometheus::install().context("Failed to install metrics")?;
    }
    let config = match &args.config {
        Some(path) => super::config::load(path)?,
        None => ClientConfig::default(),
    };
    if !config.profile.endpoint.starts_with("memory://") {
        log::warn!(
            "Endpoint {} is not an in-memory network; the demo runs in-process regardless",
            config.profile.endpoint
        );
    }

    let peers: Vec<&str> = args.peers.iter().map(String::as_str).collect();
    let network = MemoryNetwork::new(&peers);
    network.instantiate(&config.channel_id, &config.contract_id);
    println!(
        "Contract '{}' instantiated on channel '{}' (endorsers: {})",
        config.contract_id,
        config.channel_id,
        network
            .peers()
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let client = LedgerClient::new(Arc::new(network));
    client
        .initialize(config)
        .await
        .context("Unable to initialize the ledger client")?;

    let outcome = run_flow(&client).await;
    // Close on every path; the flow's error wins.
    client.close().await?;
    outcome?;

    if args.metrics {
        print!("{}", ledger_telemetry::prometheus::render()?);
    }
    Ok(())
}

async fn run_flow(client: &LedgerClient) -> Result<()> {
    let result = invoke_put(client, &user("Bharathi")).await?;
    print_invoke(&result);
    print_query(&client.query("get", [KEY]).await.context("Unable to query")?);

    for name in ["Sylendra Bharathi", "Sylendra Bharathi C"] {
        let result = invoke_put(client, &user(name)).await?;
        print_invoke(&result);
    }
    print_query(&client.query("get", [KEY]).await.context("Unable to query")?);

    let history = client
        .query_history(KEY)
        .await
        .context("Unable to query the history")?;
    print_history(&history);
    Ok(())
}

async fn invoke_put(client: &LedgerClient, value: &str) -> Result<TransactionResult> {
    let tx = client.transaction("put", [KEY, value])?;
    client
        .invoke(tx)
        .await
        .context("Unable to invoke 'put' on the ledger")
}

fn print_invoke(result: &TransactionResult) {
    if result.is_committed() {
        println!("Successfully invoked, transaction ID: {}", result.tx_id);
    } else {
        println!(
            "Transaction {} not committed: {:?}",
            result.tx_id, result.outcome
        );
    }
}

fn print_query(result: &QueryResult) {
    println!(
        "Response from the query '{}': {} (endorsed by {})",
        KEY,
        result.value.to_json(),
        result
            .endorsers
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
}

fn print_history(history: &History) {
    println!("History of '{}' ({} versions):", KEY, history.len());
    for entry in history {
        let value = match entry.value() {
            Ok(value) if entry.is_delete => format!("<deleted> {}", value.to_json()),
            Ok(value) => value.to_json().to_string(),
            Err(e) => format!("<undecodable: {}>", e),
        };
        println!("  #{} {} {}", entry.position, entry.tx_id, value);
    }
}
