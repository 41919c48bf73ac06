//! Wires the `ptx_*` methods onto an axum [`Router`], in the style of the
//! teacher's `http-rpc-gateway`: one POST entrypoint per method, JSON
//! in and out, `tower-http` middleware for tracing and panic isolation.

use crate::error::AppError;
use crate::methods::*;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use ptx_identity::resolver::IdentityResolver;
use ptx_persistence::persistence::PersistenceQuery;
use ptx_pubtx::Orchestrator;
use ptx_sequencer::dispatcher::Dispatcher;
use ptx_types::app::PrivateTransaction;
use ptx_types::error::RpcError;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Shared state for every RPC handler.
#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<Dispatcher>,
    orchestrator: Arc<Orchestrator>,
    identity: Arc<dyn IdentityResolver>,
    persistence_query: Arc<dyn PersistenceQuery>,
}

impl AppState {
    /// Builds the shared state from the collaborators `ptx-node` wires up.
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        orchestrator: Arc<Orchestrator>,
        identity: Arc<dyn IdentityResolver>,
        persistence_query: Arc<dyn PersistenceQuery>,
    ) -> Self {
        Self { dispatcher, orchestrator, identity, persistence_query }
    }
}

/// Builds the `ptx-rpc` router over the given state, with the standard
/// tracing/panic-isolation/timeout middleware stack layered on top.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ptx_sendTransaction", post(send_transaction))
        .route("/ptx_getTransaction", post(get_transaction))
        .route("/ptx_queryPendingTransactions", post(query_pending_transactions))
        .route("/ptx_resolveVerifier", post(resolve_verifier))
        .route("/ptx_queryPublicTransactions", post(query_public_transactions))
        .route("/ptx_getPublicTransactionByNonce", post(get_public_transaction_by_nonce))
        .route("/ptx_getPublicTransactionByHash", post(get_public_transaction_by_hash))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30))),
        )
        .with_state(state)
}

async fn send_transaction(
    State(state): State<AppState>,
    Json(params): Json<SendTransactionParams>,
) -> Result<Json<SendTransactionResult>, AppError> {
    let tx = PrivateTransaction::new(params.domain, params.contract_address, params.from, params.inputs, params.idempotency_key);
    let result = state
        .dispatcher
        .submit(tx)
        .await
        .map_err(|e| AppError::from(RpcError::Internal(e.to_string())))?;
    Ok(Json(SendTransactionResult { id: result.id, status: result.status, revert_reason: result.revert_reason }))
}

async fn get_transaction(
    State(state): State<AppState>,
    Json(params): Json<GetTransactionParams>,
) -> Result<Json<GetTransactionResult>, AppError> {
    let tx = state
        .dispatcher
        .transaction(params.id)
        .await
        .ok_or_else(|| AppError::from(RpcError::InvalidParams(format!("unknown transaction {}", params.id))))?;
    let public_tx = state.orchestrator.public_tx_for_private(params.id).await;
    Ok(Json(GetTransactionResult { id: tx.id, domain: tx.domain, status: tx.status, public_tx }))
}

async fn query_pending_transactions(
    State(state): State<AppState>,
) -> Result<Json<Vec<PendingTransactionEntry>>, AppError> {
    let entries = state
        .dispatcher
        .pending_transactions()
        .await
        .into_iter()
        .map(|tx| PendingTransactionEntry { id: tx.id, domain: tx.domain, status: tx.status })
        .collect();
    Ok(Json(entries))
}

async fn resolve_verifier(
    State(state): State<AppState>,
    Json(params): Json<ResolveVerifierParams>,
) -> Result<Json<ResolveVerifierResult>, AppError> {
    let verifier = state
        .identity
        .resolve(&params.lookup, &params.algorithm)
        .await
        .map_err(|e| AppError::from(RpcError::InvalidParams(e.to_string())))?;
    Ok(Json(ResolveVerifierResult { verifier: verifier.verifier }))
}

async fn query_public_transactions(
    State(state): State<AppState>,
) -> Result<Json<QueryPublicTransactionsResult>, AppError> {
    let public_txs = state.persistence_query.list_public_txs().await;
    Ok(Json(QueryPublicTransactionsResult { public_txs }))
}

async fn get_public_transaction_by_nonce(
    State(state): State<AppState>,
    Json(params): Json<GetPublicTransactionByNonceParams>,
) -> Result<Json<PublicTxResultOrNotFound>, AppError> {
    let found = state
        .persistence_query
        .list_public_txs()
        .await
        .into_iter()
        .find(|tx| tx.signer_nonce.from == params.from && tx.signer_nonce.nonce == params.nonce);
    match found {
        Some(public_tx) => Ok(Json(PublicTxResultOrNotFound { public_tx: Some(public_tx) })),
        None => Ok(Json(PublicTxResultOrNotFound { public_tx: None })),
    }
}

async fn get_public_transaction_by_hash(
    State(state): State<AppState>,
    Json(params): Json<GetPublicTransactionByHashParams>,
) -> Result<Json<PublicTxResultOrNotFound>, AppError> {
    let trimmed = params.tx_hash.strip_prefix("0x").unwrap_or(&params.tx_hash);
    let bytes = hex::decode(trimmed).map_err(|_| AppError::from(RpcError::InvalidParams("tx_hash is not valid hex".into())))?;
    let array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| AppError::from(RpcError::InvalidParams("tx_hash must be 32 bytes".into())))?;
    let hash = ptx_types::app::TxHash::from_bytes(array);
    let found = state
        .persistence_query
        .list_public_txs()
        .await
        .into_iter()
        .find(|tx| tx.submissions.iter().any(|s| s.tx_hash == hash));
    Ok(Json(PublicTxResultOrNotFound { public_tx: found }))
}

/// Shared response shape for the two single-transaction public-tx lookups.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicTxResultOrNotFound {
    /// The matching public transaction, or `None` if nothing matched.
    pub public_tx: Option<ptx_types::app::PublicTx>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use ptx_crypto::signer::LocalSigner;
    use ptx_domain::domain::DomainRegistry;
    use ptx_domain::reference::SimpleTransferDomain;
    use ptx_identity::resolver::LocalIdentityRegistry;
    use ptx_persistence::memory::InMemoryPersistence;
    use ptx_pubtx::rpc::MockEthRpcClient;
    use ptx_pubtx::GasPriceConfig;
    use ptx_types::app::NodeId;
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn send_json(router: &Router, path: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
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

    fn build_state() -> (AppState, ptx_types::app::EthAddress) {
        let mut domains = DomainRegistry::new();
        domains.register(Arc::new(SimpleTransferDomain::new("transfer")));
        let signer = Arc::new(LocalSigner::new());
        let address = signer.generate();
        let registry = Arc::new(LocalIdentityRegistry::new());
        registry.register("alice@node1", "ecdsa:secp256k1", format!("0x{}", hex::encode(address.as_bytes())));
        let identity: Arc<dyn IdentityResolver> = registry;
        let persistence = Arc::new(InMemoryPersistence::new());
        let rpc = Arc::new(MockEthRpcClient::new());
        let orchestrator = Arc::new(Orchestrator::new(signer.clone(), rpc, identity.clone(), persistence.clone(), GasPriceConfig::default()));
        let network = ptx_transport::memory::Network::new();
        let transport = Arc::new(network.join(NodeId::from("node1")));
        let dispatcher = Arc::new(Dispatcher::new(
            NodeId::from("node1"),
            "node1-locator",
            domains,
            identity.clone(),
            signer,
            transport,
            persistence.clone(),
            orchestrator.clone(),
        ));
        (AppState::new(dispatcher, orchestrator, identity, persistence), address)
    }

    #[tokio::test]
    async fn send_transaction_then_get_transaction_round_trips() {
        let (state, _address) = build_state();
        let router = router(state);

        let (status, body) = send_json(
            &router,
            "/ptx_sendTransaction",
            serde_json::json!({
                "domain": "transfer",
                "contractAddress": "0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a",
                "from": "alice@node1",
                "inputs": {"to": "bob@node1", "amount": "10", "inputStates": []},
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["id"].as_str().expect("id present").to_string();
        assert_eq!(body["status"], "dispatched");

        let (status, body) = send_json(&router, "/ptx_getTransaction", serde_json::json!({"id": id})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "dispatched");
        assert!(body["publicTx"].is_object());
    }

    #[tokio::test]
    async fn get_transaction_for_an_unknown_id_is_an_error() {
        let (state, _) = build_state();
        let router = router(state);
        let (status, _body) = send_json(&router, "/ptx_getTransaction", serde_json::json!({"id": Uuid::new_v4()})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn resolve_verifier_returns_the_registered_address() {
        let (state, address) = build_state();
        let router = router(state);
        let (status, body) =
            send_json(&router, "/ptx_resolveVerifier", serde_json::json!({"lookup": "alice@node1", "algorithm": "ecdsa:secp256k1"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verifier"], format!("0x{}", hex::encode(address.as_bytes())));
    }

    #[tokio::test]
    async fn query_public_transactions_lists_everything_dispatched() {
        let (state, _) = build_state();
        let router = router(state);
        send_json(
            &router,
            "/ptx_sendTransaction",
            serde_json::json!({
                "domain": "transfer",
                "contractAddress": "0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a",
                "from": "alice@node1",
                "inputs": {"to": "bob@node1", "amount": "1", "inputStates": []},
            }),
        )
        .await;
        let (status, body) = send_json(&router, "/ptx_queryPublicTransactions", serde_json::json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["publicTxs"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_public_transaction_by_nonce_and_by_hash_find_the_same_row() {
        let (state, address) = build_state();
        let router = router(state);
        send_json(
            &router,
            "/ptx_sendTransaction",
            serde_json::json!({
                "domain": "transfer",
                "contractAddress": "0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a",
                "from": "alice@node1",
                "inputs": {"to": "bob@node1", "amount": "1", "inputStates": []},
            }),
        )
        .await;

        let (status, by_nonce) = send_json(
            &router,
            "/ptx_getPublicTransactionByNonce",
            serde_json::json!({"from": hex::encode(address.as_bytes()), "nonce": 0}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let tx_hash = by_nonce["publicTx"]["submissions"][0]["tx_hash"].as_str().expect("submitted").to_string();

        let (status, by_hash) =
            send_json(&router, "/ptx_getPublicTransactionByHash", serde_json::json!({"txHash": tx_hash})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(by_hash["publicTx"]["id"], by_nonce["publicTx"]["id"]);
    }

    #[tokio::test]
    async fn get_public_transaction_by_hash_with_garbage_hex_is_rejected() {
        let (state, _) = build_state();
        let router = router(state);
        let (status, _body) =
            send_json(&router, "/ptx_getPublicTransactionByHash", serde_json::json!({"txHash": "not-hex"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
