//! Shared scaffolding for the scenario tests: builds a minimally
//! configured, fully wired node plus its JSON-RPC router, without binding
//! any sockets. Mirrors `ptx-rpc`'s own in-process router test helper.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use ptx_crypto::signer::LocalSigner;
use ptx_identity::resolver::LocalIdentityRegistry;
use ptx_node::config::NodeConfig;
use ptx_node::wiring::{self, Node};
use ptx_pubtx::rpc::{EthRpcClient, MockEthRpcClient};
use ptx_transport::memory::Network;
use std::sync::Arc;
use tower::ServiceExt;

/// A minimal config for `node_id`/`locator`, every other section at its
/// default.
pub fn config(node_id: &str, locator: &str) -> NodeConfig {
    let doc = format!("nodeId = \"{node_id}\"\nlocator = \"{locator}\"\n");
    toml::from_str(&doc).expect("minimal node config should parse")
}

/// A fully wired node plus the handles a test needs to drive it: its
/// signer and identity registry (to register verifiers), its mock RPC
/// client (to complete receipts or force reverts), and its JSON-RPC
/// router (to exercise it the way a real client would).
pub struct Harness {
    pub node: Node,
    pub signer: Arc<LocalSigner>,
    pub identity: Arc<LocalIdentityRegistry>,
    pub rpc: Arc<MockEthRpcClient>,
    pub router: Router,
}

/// Wires a node named `node_id` onto `network`, under `locator` for
/// contention bids.
pub fn build_node(node_id: &str, locator: &str, network: &Network) -> Harness {
    let cfg = config(node_id, locator);
    let rpc = Arc::new(MockEthRpcClient::new());
    let rpc_client: Arc<dyn EthRpcClient> = rpc.clone();
    let (node, signer, identity) = wiring::wire(&cfg, network, rpc_client);

    let app_state = ptx_rpc::AppState::new(
        node.dispatcher.clone(),
        node.orchestrator.clone(),
        node.identity.clone(),
        node.persistence_query.clone(),
    );
    let router = ptx_rpc::router(app_state);

    Harness { node, signer, identity, rpc, router }
}

/// Posts `body` to `path` on `router` and returns the decoded JSON
/// response.
pub async fn send_json(router: &Router, path: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { serde_json::Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}
