//! The per-signer Orchestrator: implements
//! [`DispatchSink`] so the Sequencer's Dispatcher can hand off a
//! [`PreparedPublicTransaction`] without depending on PubTM directly, then
//! drives it from nonce assignment through submission to confirmation.

use crate::gas::{self, GasPriceConfig};
use crate::nonce::NonceAllocator;
use crate::rpc::{EthRpcClient, GasEstimate};
use async_trait::async_trait;
use ptx_crypto::address::parse_hex_address;
use ptx_crypto::signer::Signer;
use ptx_identity::resolver::IdentityResolver;
use ptx_persistence::operation::Operation;
use ptx_persistence::persistence::{await_completion, Persistence};
use ptx_sequencer::dispatcher::DispatchSink;
use ptx_types::app::{
    now_millis, DispatchAction, PreparedPublicTransaction, PublicTx, PublicTxOutcome, SignerNonce, Submission,
};
use ptx_types::error::{PubTxError, SequencerError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

const SIGNING_ALGORITHM: &str = "ecdsa:secp256k1";

/// Drives dispatched transactions to the base ledger: assigns a nonce,
/// persists a [`PublicTx`] row in the same breath as the nonce commit (the
/// `Submit(dbTx)` contract), submits to the Ethereum RPC client,
/// and polls for confirmation.
pub struct Orchestrator {
    signer: Arc<dyn Signer>,
    rpc: Arc<dyn EthRpcClient>,
    identity: Arc<dyn IdentityResolver>,
    persistence: Arc<dyn Persistence>,
    nonces: NonceAllocator,
    gas_config: GasPriceConfig,
    public_txs: Mutex<HashMap<Uuid, PublicTx>>,
    bindings: Mutex<HashMap<Uuid, Uuid>>,
}

impl Orchestrator {
    /// Constructs an orchestrator backed by the given collaborators.
    pub fn new(
        signer: Arc<dyn Signer>,
        rpc: Arc<dyn EthRpcClient>,
        identity: Arc<dyn IdentityResolver>,
        persistence: Arc<dyn Persistence>,
        gas_config: GasPriceConfig,
    ) -> Self {
        Self {
            nonces: NonceAllocator::new(rpc.clone()),
            signer,
            rpc,
            identity,
            persistence,
            gas_config,
            public_txs: Mutex::new(HashMap::new()),
            bindings: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a snapshot of a tracked public transaction, if known.
    pub async fn public_tx(&self, id: Uuid) -> Option<PublicTx> {
        self.public_txs.lock().await.get(&id).cloned()
    }

    /// Returns the public transaction bound to a given private transaction,
    /// if one has been dispatched for it.
    pub async fn public_tx_for_private(&self, private_tx_id: Uuid) -> Option<PublicTx> {
        let public_id = *self.bindings.lock().await.get(&private_tx_id)?;
        self.public_tx(public_id).await
    }

    /// Applies a `dispatchAction` control message to the public transaction
    /// tracked for `target`. `Suspend` holds a `Pending` transaction out of
    /// the poll loop without touching its nonce or submission history;
    /// `Resume` returns a `Suspended` transaction to `Pending`. Both are
    /// no-ops if the transaction isn't in the state the action expects.
    pub async fn dispatch_action(&self, target: SignerNonce, action: DispatchAction) -> Result<(), PubTxError> {
        let public_tx = {
            let public_txs = self.public_txs.lock().await;
            public_txs
                .values()
                .find(|tx| tx.signer_nonce == target)
                .cloned()
                .ok_or(PubTxError::UnknownSignerNonce { signer: target.from.to_string(), nonce: target.nonce })?
        };

        let mut updated = public_tx;
        match action {
            DispatchAction::Suspend => {
                if updated.outcome == PublicTxOutcome::Pending {
                    updated.outcome = PublicTxOutcome::Suspended;
                }
            }
            DispatchAction::Resume => {
                if updated.outcome == PublicTxOutcome::Suspended {
                    updated.outcome = PublicTxOutcome::Pending;
                }
            }
        }

        if self.persist_upsert(&updated).await.is_ok() {
            self.public_txs.lock().await.insert(updated.id, updated);
        }
        Ok(())
    }

    async fn persist_upsert(&self, public_tx: &PublicTx) -> Result<(), String> {
        let receiver = self.persistence.submit(vec![Operation::InsertPublicTx(public_tx.clone())]);
        await_completion(receiver).await.map_err(|e| e.to_string())
    }

    /// One orchestrator tick: for every tracked public transaction still
    /// pending, polls the RPC client for a receipt and, if none has landed
    /// yet, escalates gas and resubmits. Returns the ids of public
    /// transactions whose outcome changed this tick.
    ///
    /// `ptx-node` is expected to call this in a loop on the
    /// `TransactionEngine.interval` cadence named in the node config.
    pub async fn poll_once(&self) -> Vec<Uuid> {
        let pending_ids: Vec<Uuid> = {
            let public_txs = self.public_txs.lock().await;
            public_txs.values().filter(|tx| tx.outcome == PublicTxOutcome::Pending).map(|tx| tx.id).collect()
        };

        let mut changed = Vec::new();
        for id in pending_ids {
            if self.poll_one(id).await {
                changed.push(id);
            }
        }
        changed
    }

    async fn poll_one(&self, id: Uuid) -> bool {
        let Some(mut public_tx) = self.public_tx(id).await else { return false };

        if let Some(submission) = public_tx.latest_submission().cloned() {
            match self.rpc.get_receipt(&submission.tx_hash).await {
                Ok(Some(success)) => {
                    public_tx.outcome = if success { PublicTxOutcome::Success } else { PublicTxOutcome::Reverted };
                    let elapsed_secs = now_millis().saturating_sub(public_tx.created_at) as f64 / 1000.0;
                    ptx_telemetry::pubtx_metrics().observe_confirmation_latency(elapsed_secs);
                    ptx_telemetry::pubtx_metrics()
                        .inc_submission(&public_tx.signer_nonce.from.to_string(), if success { "success" } else { "reverted" });
                    if self.persist_upsert(&public_tx).await.is_ok() {
                        self.public_txs.lock().await.insert(public_tx.id, public_tx);
                        return true;
                    }
                    return false;
                }
                Ok(None) => return false,
                Err(_) => {
                    // Transient RPC failure watching for a receipt; escalate
                    // and resubmit rather than waiting indefinitely.
                }
            }
        }

        self.resubmit(&mut public_tx).await
    }

    async fn resubmit(&self, public_tx: &mut PublicTx) -> bool {
        let signer_label = public_tx.signer_nonce.from.to_string();
        let next_pricing = match public_tx.latest_submission() {
            Some(latest) => {
                let first = public_tx.submissions.first().map(|s| s.gas_pricing.clone()).unwrap_or_else(|| latest.gas_pricing.clone());
                match gas::next_price(&self.gas_config, &signer_label, &first, &latest.gas_pricing) {
                    Ok(pricing) => pricing,
                    Err(_) => {
                        public_tx.outcome = PublicTxOutcome::Reverted;
                        ptx_telemetry::pubtx_metrics().inc_submission(&signer_label, "gas_cap_exceeded");
                        let _ = self.persist_upsert(public_tx).await;
                        self.public_txs.lock().await.insert(public_tx.id, public_tx.clone());
                        return true;
                    }
                }
            }
            None => public_tx.gas_pricing.clone(),
        };
        public_tx.gas_pricing = next_pricing.clone();

        match self.rpc.submit(public_tx, self.signer.as_ref()).await {
            Ok(hash) => {
                if !public_tx.submissions.is_empty() {
                    ptx_telemetry::pubtx_metrics().inc_gas_escalation(&signer_label);
                }
                public_tx.submissions.push(Submission { tx_hash: hash, gas_pricing: next_pricing, submitted_at: now_millis() });
                ptx_telemetry::pubtx_metrics().inc_submission(&signer_label, "submitted");
                let _ = self.persist_upsert(public_tx).await;
                self.public_txs.lock().await.insert(public_tx.id, public_tx.clone());
                true
            }
            Err(_) => {
                ptx_telemetry::pubtx_metrics().inc_submission(&signer_label, "rpc_error");
                false
            }
        }
    }
}

#[async_trait]
impl DispatchSink for Orchestrator {
    async fn dispatch(&self, private_tx_id: Uuid, prepared: PreparedPublicTransaction) -> Result<(), SequencerError> {
        let verifier = self
            .identity
            .resolve(&prepared.signer, SIGNING_ALGORITHM)
            .await
            .map_err(|e| SequencerError::DispatchFailed(e.to_string()))?;
        let address = parse_hex_address(&verifier.verifier)
            .map_err(|e| SequencerError::DispatchFailed(format!("signer {} resolved to an invalid address: {e}", prepared.signer)))?;

        let gas_limit = match self.rpc.estimate_gas(&prepared.to, &prepared.data).await {
            Ok(GasEstimate::Ok(gas)) => gas,
            Ok(GasEstimate::Reverted(reason)) => {
                return Err(SequencerError::DispatchFailed(format!("rejected: gas estimation reverted: {reason}")));
            }
            Err(e) => return Err(SequencerError::DispatchFailed(e.to_string())),
        };

        let nonce = self.nonces.assign(address).await.map_err(|e| SequencerError::DispatchFailed(e.to_string()))?;
        let pricing = gas::initial_price(&self.gas_config, None);
        let public_tx =
            PublicTx::new(SignerNonce { from: address, nonce }, prepared.to, prepared.data.clone(), gas_limit, pricing, private_tx_id);

        if let Err(reason) = self.persist_upsert(&public_tx).await {
            let _ = self.nonces.rollback(address, nonce).await;
            return Err(SequencerError::DispatchFailed(reason));
        }

        self.public_txs.lock().await.insert(public_tx.id, public_tx.clone());
        self.bindings.lock().await.insert(private_tx_id, public_tx.id);
        ptx_telemetry::pubtx_metrics().set_assigned_nonces(&address.to_string(), self.nonces.assigned_count(&address).await as f64);

        let mut to_submit = public_tx;
        self.resubmit(&mut to_submit).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::MockEthRpcClient;
    use ptx_crypto::signer::LocalSigner;
    use ptx_identity::resolver::LocalIdentityRegistry;
    use ptx_persistence::memory::InMemoryPersistence;
    use ptx_types::app::{ContractAddress, EthAddress};

    fn build(rpc: Arc<MockEthRpcClient>) -> (Orchestrator, EthAddress) {
        let signer = Arc::new(LocalSigner::new());
        let address = signer.generate();
        let identity = Arc::new(LocalIdentityRegistry::new());
        identity.register("alice@node1", SIGNING_ALGORITHM, format!("0x{}", hex::encode(address.as_bytes())));
        let persistence = Arc::new(InMemoryPersistence::new());
        let orchestrator = Orchestrator::new(signer, rpc, identity, persistence, GasPriceConfig::default());
        (orchestrator, address)
    }

    fn prepared(signer_locator: &str) -> PreparedPublicTransaction {
        PreparedPublicTransaction {
            to: ContractAddress::from_bytes([9u8; 20]),
            function: "transfer".into(),
            data: vec![1, 2, 3, 4],
            signer: signer_locator.into(),
        }
    }

    #[tokio::test]
    async fn dispatch_assigns_a_nonce_and_submits_immediately() {
        let rpc = Arc::new(MockEthRpcClient::new());
        let (orchestrator, address) = build(rpc);
        let private_tx_id = Uuid::new_v4();

        orchestrator.dispatch(private_tx_id, prepared("alice@node1")).await.expect("dispatch should succeed");

        let public_tx = orchestrator.public_tx_for_private(private_tx_id).await.expect("should be tracked");
        assert_eq!(public_tx.signer_nonce.from, address);
        assert_eq!(public_tx.signer_nonce.nonce, 0);
        assert_eq!(public_tx.submissions.len(), 1);
        assert_eq!(public_tx.outcome, PublicTxOutcome::Pending);
    }

    #[tokio::test]
    async fn a_reverting_gas_estimate_is_rejected_without_assigning_a_nonce() {
        let rpc = Arc::new(MockEthRpcClient::new());
        rpc.set_reverting(ContractAddress::from_bytes([9u8; 20]), "insufficient balance");
        let (orchestrator, address) = build(rpc.clone());
        let result = orchestrator.dispatch(Uuid::new_v4(), prepared("alice@node1")).await;
        assert!(result.is_err());
        assert_eq!(orchestrator.nonces.assigned_count(&address).await, 0);
    }

    #[tokio::test]
    async fn poll_once_marks_a_confirmed_receipt_as_success() {
        let rpc = Arc::new(MockEthRpcClient::new());
        let (orchestrator, _address) = build(rpc.clone());
        let private_tx_id = Uuid::new_v4();
        orchestrator.dispatch(private_tx_id, prepared("alice@node1")).await.unwrap();

        let public_tx = orchestrator.public_tx_for_private(private_tx_id).await.unwrap();
        let hash = public_tx.latest_submission().unwrap().tx_hash;
        rpc.complete(hash, true);

        let changed = orchestrator.poll_once().await;
        assert_eq!(changed, vec![public_tx.id]);
        let updated = orchestrator.public_tx(public_tx.id).await.unwrap();
        assert_eq!(updated.outcome, PublicTxOutcome::Success);
    }

    #[tokio::test]
    async fn suspend_then_resume_preserves_nonce_and_sibling_ordering() {
        let rpc = Arc::new(MockEthRpcClient::new());
        let (orchestrator, address) = build(rpc.clone());

        let first_id = Uuid::new_v4();
        let second_id = Uuid::new_v4();
        orchestrator.dispatch(first_id, prepared("alice@node1")).await.unwrap();
        orchestrator.dispatch(second_id, prepared("alice@node1")).await.unwrap();

        let first = orchestrator.public_tx_for_private(first_id).await.unwrap();
        let second = orchestrator.public_tx_for_private(second_id).await.unwrap();
        assert_eq!(first.signer_nonce, SignerNonce { from: address, nonce: 0 });
        assert_eq!(second.signer_nonce, SignerNonce { from: address, nonce: 1 });

        orchestrator.dispatch_action(first.signer_nonce, DispatchAction::Suspend).await.unwrap();
        let suspended = orchestrator.public_tx(first.id).await.unwrap();
        assert_eq!(suspended.outcome, PublicTxOutcome::Suspended);
        assert_eq!(suspended.signer_nonce, first.signer_nonce);

        // A suspended transaction is skipped by the poll loop even though it
        // has a confirmable receipt waiting.
        let hash = suspended.latest_submission().unwrap().tx_hash;
        rpc.complete(hash, true);
        let changed = orchestrator.poll_once().await;
        assert!(!changed.contains(&suspended.id), "a suspended public tx must not be polled");
        assert_eq!(orchestrator.public_tx(suspended.id).await.unwrap().outcome, PublicTxOutcome::Suspended);

        orchestrator.dispatch_action(first.signer_nonce, DispatchAction::Resume).await.unwrap();
        let resumed = orchestrator.public_tx(first.id).await.unwrap();
        assert_eq!(resumed.outcome, PublicTxOutcome::Pending);
        assert_eq!(resumed.signer_nonce, first.signer_nonce, "nonce must be unchanged across suspend/resume");

        let second_after = orchestrator.public_tx(second.id).await.unwrap();
        assert_eq!(second_after.signer_nonce, second.signer_nonce, "sibling ordering must be unaffected");
        assert!(resumed.signer_nonce.nonce < second_after.signer_nonce.nonce);

        let changed = orchestrator.poll_once().await;
        assert!(changed.contains(&resumed.id), "a resumed public tx should be polled again");
        assert_eq!(orchestrator.public_tx(resumed.id).await.unwrap().outcome, PublicTxOutcome::Success);
    }

    #[tokio::test]
    async fn dispatch_action_on_an_unknown_signer_nonce_fails() {
        let rpc = Arc::new(MockEthRpcClient::new());
        let (orchestrator, address) = build(rpc);
        let result = orchestrator.dispatch_action(SignerNonce { from: address, nonce: 7 }, DispatchAction::Suspend).await;
        assert!(matches!(result, Err(PubTxError::UnknownSignerNonce { .. })));
    }

    #[tokio::test]
    async fn an_unresolvable_signer_locator_fails_dispatch() {
        let rpc = Arc::new(MockEthRpcClient::new());
        let (orchestrator, _address) = build(rpc);
        let result = orchestrator.dispatch(Uuid::new_v4(), prepared("ghost@node9")).await;
        assert!(result.is_err());
    }
}
