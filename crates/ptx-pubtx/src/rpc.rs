//! The `EthRpcClient` trait, standing in for the out-of-scope Ethereum RPC
//! client and Block Indexer collaborators, plus an in-memory
//! reference implementation.

use async_trait::async_trait;
use dashmap::DashMap;
use ptx_crypto::address::keccak256;
use ptx_crypto::signer::Signer;
use ptx_types::app::{EthAddress, PublicTx, TxHash};
use ptx_types::error::PubTxError;

/// The outcome of a gas estimation call. A revert at estimation time is a
/// rejection, not a transient error — no
/// nonce is allocated and the caller must surface it via `Rejected()`
/// rather than retrying.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GasEstimate {
    /// Estimation succeeded; the gas limit to use.
    Ok(u64),
    /// The call would revert; no nonce should be allocated.
    Reverted(String),
}

/// The base-ledger RPC surface PubTM needs: nonce discovery, gas
/// estimation, submission, and receipt polling. A production build backs
/// this with a real Ethereum JSON-RPC client and the Block Indexer's
/// `(from, nonce, txHash)` confirmation join; this crate only
/// defines the contract and a deterministic in-memory stand-in.
#[async_trait]
pub trait EthRpcClient: Send + Sync {
    /// Returns the confirmed transaction count for `address`, used to seed
    /// the nonce allocator's cache on first use.
    async fn get_transaction_count(&self, address: &EthAddress) -> Result<u64, PubTxError>;

    /// Estimates the gas required for a call to `to` with `data`.
    async fn estimate_gas(&self, to: &EthAddress, data: &[u8]) -> Result<GasEstimate, PubTxError>;

    /// Signs and submits `public_tx` using `signer`, returning the
    /// resulting transaction hash.
    async fn submit(&self, public_tx: &PublicTx, signer: &dyn Signer) -> Result<TxHash, PubTxError>;

    /// Polls for a receipt: `None` while pending, `Some(true)` once mined
    /// with success, `Some(false)` once mined with a revert.
    async fn get_receipt(&self, hash: &TxHash) -> Result<Option<bool>, PubTxError>;
}

/// An in-memory `EthRpcClient` for tests and single-node development. Never
/// use this in production: it does not talk to any chain.
#[derive(Default)]
pub struct MockEthRpcClient {
    baseline_nonces: DashMap<EthAddress, u64>,
    reverting: DashMap<EthAddress, String>,
    receipts: DashMap<TxHash, bool>,
}

impl MockEthRpcClient {
    /// Constructs a client where every address starts at nonce zero and no
    /// call reverts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the baseline nonce `get_transaction_count` will report for
    /// `address`.
    pub fn set_baseline_nonce(&self, address: EthAddress, nonce: u64) {
        self.baseline_nonces.insert(address, nonce);
    }

    /// Makes every estimation against `to` report a revert with `reason`.
    pub fn set_reverting(&self, to: EthAddress, reason: impl Into<String>) {
        self.reverting.insert(to, reason.into());
    }

    /// Marks `hash` as mined, with the given success/revert outcome. Tests
    /// drive confirmation by calling this after `submit` returns a hash.
    pub fn complete(&self, hash: TxHash, success: bool) {
        self.receipts.insert(hash, success);
    }
}

#[async_trait]
impl EthRpcClient for MockEthRpcClient {
    async fn get_transaction_count(&self, address: &EthAddress) -> Result<u64, PubTxError> {
        Ok(self.baseline_nonces.get(address).map(|n| *n).unwrap_or(0))
    }

    async fn estimate_gas(&self, to: &EthAddress, data: &[u8]) -> Result<GasEstimate, PubTxError> {
        if let Some(reason) = self.reverting.get(to) {
            return Ok(GasEstimate::Reverted(reason.clone()));
        }
        Ok(GasEstimate::Ok(21_000 + data.len() as u64 * 16))
    }

    async fn submit(&self, public_tx: &PublicTx, signer: &dyn Signer) -> Result<TxHash, PubTxError> {
        let mut preimage = Vec::with_capacity(20 + 8 + public_tx.data.len());
        preimage.extend_from_slice(public_tx.to.as_bytes());
        preimage.extend_from_slice(&public_tx.signer_nonce.nonce.to_be_bytes());
        preimage.extend_from_slice(&public_tx.data);
        let digest = keccak256(&preimage);

        let signature = signer
            .sign_digest(&public_tx.signer_nonce.from, &digest)
            .map_err(|e| PubTxError::SignerUnavailable(format!("{}: {e}", public_tx.signer_nonce.from)))?;

        let mut hash_input = digest.to_vec();
        hash_input.extend_from_slice(&signature);
        Ok(TxHash::from_bytes(keccak256(&hash_input)))
    }

    async fn get_receipt(&self, hash: &TxHash) -> Result<Option<bool>, PubTxError> {
        Ok(self.receipts.get(hash).map(|success| *success))
    }
}
