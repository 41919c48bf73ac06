//! Request/response shapes for the `ptx_*` JSON-RPC methods this crate
//! implements: a representative slice of the full surface (send, read
//! back, and query the public-transaction ledger), not every method a
//! full node exposes — see `DESIGN.md` for the scope note.

use ptx_types::app::{ContractAddress, EthAddress, IdempotencyKey, PublicTx, TxStatus, VerifierLocator};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Params for `ptx_sendTransaction`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTransactionParams {
    /// The domain plugin that owns this transaction's semantics.
    pub domain: String,
    /// The privately-deployed contract this transaction targets, if known.
    pub contract_address: Option<ContractAddress>,
    /// Identity locator of the submitter.
    pub from: VerifierLocator,
    /// Domain-opaque call inputs.
    pub inputs: serde_json::Value,
    /// Caller-supplied dedupe key.
    #[serde(default)]
    pub idempotency_key: Option<IdempotencyKey>,
}

/// Result of `ptx_sendTransaction`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTransactionResult {
    /// The assigned transaction id.
    pub id: Uuid,
    /// The status the transaction reached before this call returned.
    pub status: TxStatus,
    /// Present when `status` is `Reverted`.
    pub revert_reason: Option<String>,
}

/// Params for `ptx_getTransaction`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTransactionParams {
    /// The transaction id to look up.
    pub id: Uuid,
}

/// Result of `ptx_getTransaction`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTransactionResult {
    /// The transaction id.
    pub id: Uuid,
    /// The domain plugin that owns this transaction's semantics.
    pub domain: String,
    /// The transaction's last-known status.
    pub status: TxStatus,
    /// The public transaction dispatched for this private transaction, if
    /// any has been submitted yet.
    pub public_tx: Option<PublicTx>,
}

/// Result entry for `ptx_queryPendingTransactions`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransactionEntry {
    /// The transaction id.
    pub id: Uuid,
    /// The domain plugin that owns this transaction's semantics.
    pub domain: String,
    /// The transaction's current status.
    pub status: TxStatus,
}

/// Params for `ptx_resolveVerifier`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveVerifierParams {
    /// The identity locator to resolve, e.g. `alice@node1`.
    pub lookup: String,
    /// The signing algorithm the caller expects, e.g. `ecdsa:secp256k1`.
    pub algorithm: String,
}

/// Result of `ptx_resolveVerifier`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveVerifierResult {
    /// The resolved verifier's hex-encoded address.
    pub verifier: String,
}

/// Result of `ptx_queryPublicTransactions`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPublicTransactionsResult {
    /// Every public transaction currently tracked by the orchestrator.
    pub public_txs: Vec<PublicTx>,
}

/// Params for `ptx_getPublicTransactionByNonce`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPublicTransactionByNonceParams {
    /// The signer whose nonce sequence this is.
    pub from: EthAddress,
    /// The nonce to look up.
    pub nonce: u64,
}

/// Params for `ptx_getPublicTransactionByHash`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPublicTransactionByHashParams {
    /// The submitted transaction hash to look up.
    pub tx_hash: String,
}
