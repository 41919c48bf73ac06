//! The private transaction manager node binary: loads a TOML config,
//! wires every collaborator, and runs the telemetry HTTP server, the
//! JSON-RPC HTTP server, a transport receive loop, and an orchestrator
//! poll loop until shut down.

use anyhow::Context;
use clap::Parser;
use ptx_node::config::NodeConfig;
use ptx_node::wiring;
use ptx_pubtx::rpc::{EthRpcClient, MockEthRpcClient};
use ptx_transport::memory::Network;
use std::path::PathBuf;
use std::sync::Arc;

/// A single-node development/test instance of the private transaction
/// manager.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Opts {
    /// Path to a TOML node configuration file.
    #[arg(long, env = "PTX_CONFIG")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ptx_telemetry::init::init_tracing().context("failed to initialize structured logging")?;

    let sink = ptx_telemetry::prometheus::install().context("failed to register prometheus collectors")?;
    let _ = ptx_telemetry::sinks::SINK.set(sink);

    let opts = Opts::parse();
    let contents = std::fs::read_to_string(&opts.config)
        .with_context(|| format!("failed to read config file {}", opts.config.display()))?;
    let node_config: NodeConfig = toml::from_str(&contents).context("failed to parse node config")?;

    tracing::info!(target = "ptx-node", node_id = %node_config.node_id, "starting");

    // A single-process node runs alone on its own transport network: the
    // receive loop only ever observes envelopes this node addresses to
    // itself, since no peer ever joins. Multi-node deployments replace
    // this with a production `Transport` backed by real peer connections.
    let network = Network::new();
    let rpc_client: Arc<dyn EthRpcClient> = Arc::new(MockEthRpcClient::new());
    let (node, _signer, _identity) = wiring::wire(&node_config, &network, rpc_client);

    let telemetry_addr = node_config.telemetry.bind_addr;
    let telemetry_task = tokio::spawn(ptx_telemetry::http::run_server(telemetry_addr));

    let receive_task = wiring::spawn_receive_loop(node.dispatcher.clone(), node.transport.clone());
    let poll_task = wiring::spawn_poll_loop(node.orchestrator.clone(), node_config.transaction_engine.interval_ms);

    let app_state = ptx_rpc::AppState::new(
        node.dispatcher.clone(),
        node.orchestrator.clone(),
        node.identity.clone(),
        node.persistence_query.clone(),
    );
    let router = ptx_rpc::router(app_state);
    let rpc_listener = tokio::net::TcpListener::bind(node_config.rpc.bind_addr)
        .await
        .with_context(|| format!("failed to bind rpc listener on {}", node_config.rpc.bind_addr))?;
    tracing::info!(target = "ptx-node", addr = %node_config.rpc.bind_addr, "rpc listening");
    let rpc_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(rpc_listener, router.into_make_service()).await {
            tracing::error!(target = "ptx-node", error = %e, "rpc server exited");
        }
    });

    tokio::select! {
        _ = telemetry_task => {}
        _ = receive_task => {}
        _ = poll_task => {}
        _ = rpc_task => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(target = "ptx-node", "received ctrl-c, shutting down");
        }
    }

    Ok(())
}
