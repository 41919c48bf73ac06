//! The Dispatcher: drives one [`PrivateTransaction`] through the full
//! pipeline — domain init, verifier resolution, assembly,
//! attestation gathering, preparation — then hands the prepared call to a
//! [`DispatchSink`] (implemented by the public transaction manager).

use crate::attest::{is_local_party, AttestationGatherer, TransactionLookup};
use crate::queue::ContractQueue;
use crate::record::SequencerRegistry;
use async_trait::async_trait;
use ptx_crypto::signer::Signer;
use ptx_domain::domain::DomainRegistry;
use ptx_identity::resolver::IdentityResolver;
use ptx_persistence::operation::Operation;
use ptx_persistence::persistence::{await_completion, Persistence};
use ptx_transport::envelope::{Envelope, MessageType};
use ptx_transport::message::TransportMessage;
use ptx_transport::transport::Transport;
use ptx_types::app::{AttestationKind, EthAddress, NodeId, PostAssembly, PreAssembly, PreparedPublicTransaction, PrivateTransaction, TxStatus, VerifierRef};
use ptx_types::error::{DomainError, SequencerError, TransactionError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Accepts a prepared transaction for submission to the base ledger.
/// Implemented by the public transaction manager; kept as a trait here so
/// `ptx-sequencer` never depends on `ptx-pubtx` directly.
#[async_trait]
pub trait DispatchSink: Send + Sync {
    /// Hands `prepared` off for submission, returning once PubTM has
    /// accepted it into its nonce allocator (not once it has confirmed on
    /// the base ledger — that outcome is reported back out of band, by
    /// whatever mechanism `ptx-node` wires PubTM's orchestrator through).
    async fn dispatch(&self, tx_id: Uuid, prepared: PreparedPublicTransaction) -> Result<(), SequencerError>;
}

fn error_to_reason<E: std::fmt::Display>(e: E) -> String {
    e.to_string()
}

/// Drives transactions through the Sequencer/Coordinator state machine for
/// one node, across every privately-deployed contract it has queued work
/// for.
pub struct Dispatcher {
    this_node: NodeId,
    domains: DomainRegistry,
    identity: Arc<dyn IdentityResolver>,
    signer: Arc<dyn Signer>,
    transport: Arc<dyn Transport>,
    persistence: Arc<dyn Persistence>,
    dispatch_sink: Arc<dyn DispatchSink>,
    gatherer: Arc<AttestationGatherer>,
    registry: SequencerRegistry,
    queues: Mutex<HashMap<EthAddress, ContractQueue>>,
    transactions: Mutex<HashMap<Uuid, PrivateTransaction>>,
    idempotency_keys: Mutex<HashMap<String, Uuid>>,
}

impl Dispatcher {
    /// Constructs a Dispatcher for `this_node`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        this_node: NodeId,
        this_locator: impl Into<String>,
        domains: DomainRegistry,
        identity: Arc<dyn IdentityResolver>,
        signer: Arc<dyn Signer>,
        transport: Arc<dyn Transport>,
        persistence: Arc<dyn Persistence>,
        dispatch_sink: Arc<dyn DispatchSink>,
    ) -> Self {
        let gatherer = Arc::new(AttestationGatherer::new(
            this_node.clone(),
            domains.clone(),
            identity.clone(),
            signer.clone(),
            transport.clone(),
        ));
        Self {
            registry: SequencerRegistry::new(this_node.clone(), this_locator),
            this_node,
            domains,
            identity,
            signer,
            transport,
            persistence,
            dispatch_sink,
            gatherer,
            queues: Mutex::new(HashMap::new()),
            transactions: Mutex::new(HashMap::new()),
            idempotency_keys: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a remote node's bid for coordination of `contract`,
    /// re-resolving contention against it. Stands in for the peer
    /// bid-announcement handler a wire contention-gossip protocol would
    /// drive this from; exposed directly since that protocol is not
    /// implemented (see `DESIGN.md`).
    pub fn note_bidder(&self, contract: EthAddress, bidder: impl Into<String>) {
        self.registry.add_bidder(contract, bidder.into());
    }

    /// Returns a snapshot of a tracked transaction, if known.
    pub async fn transaction(&self, id: Uuid) -> Option<PrivateTransaction> {
        self.transactions.lock().await.get(&id).cloned()
    }

    /// Returns every tracked transaction that has not yet reached a
    /// terminal status (`Dispatched` or `Reverted`).
    pub async fn pending_transactions(&self) -> Vec<PrivateTransaction> {
        self.transactions.lock().await.values().filter(|tx| !tx.status.is_terminal()).cloned().collect()
    }

    /// Processes one envelope received over the transport: answers a
    /// remote party's `EndorsementRequest` against this node's locally
    /// held transactions, resolves a pending `gather_kind` wait for an
    /// `EndorsementResponse`, takes over coordination of a transaction
    /// handed to this node by a `DelegationRequest`, or resolves this
    /// node's own `Delegating` view once a `DelegationResult` reports the
    /// remote coordinator's outcome. Intended to run in a loop fed by
    /// `Transport::recv` (see `ptx-node`'s receive task).
    ///
    /// Requires `Arc<Self>` rather than `&self`: driving a delegated
    /// transaction needs to gather attestations from the node that
    /// delegated it, which means sending its own requests and awaiting
    /// replies that arrive as later envelopes on this same receive loop.
    /// Running that inline here would deadlock the loop against itself, so
    /// it runs as a detached task instead.
    pub async fn handle_incoming(self: &Arc<Self>, envelope: Envelope) {
        match envelope.message_type {
            MessageType::DelegationRequest => {
                let message: TransportMessage = match serde_json::from_slice(&envelope.payload) {
                    Ok(message) => message,
                    Err(_) => return,
                };
                if let TransportMessage::DelegationRequest { transactions, .. } = message {
                    let delegator = envelope.node.clone();
                    for tx in transactions {
                        let this = Arc::clone(self);
                        let delegator = delegator.clone();
                        tokio::spawn(async move {
                            this.drive_delegated(tx, delegator).await;
                        });
                    }
                }
            }
            MessageType::DelegationResult => {
                let message: TransportMessage = match serde_json::from_slice(&envelope.payload) {
                    Ok(message) => message,
                    Err(_) => return,
                };
                if let TransportMessage::DelegationResult { tx_id, success, revert_reason } = message {
                    self.resolve_delegated_result(tx_id, success, revert_reason).await;
                }
            }
            _ => self.gatherer.handle_incoming(envelope, self.as_ref()).await,
        }
    }

    /// Submits `tx` and drives it through to a terminal status
    /// (`Dispatched`, `Delegating`, or `Reverted`). Rejects a submission
    /// whose `idempotency_key` was already used by a different transaction
    /// (invariant: one dispatch per idempotency key).
    pub async fn submit(&self, mut tx: PrivateTransaction) -> Result<PrivateTransaction, TransactionError> {
        if let Some(key) = tx.idempotency_key.clone() {
            let mut keys = self.idempotency_keys.lock().await;
            match keys.get(&key) {
                Some(existing) if *existing != tx.id => return Err(TransactionError::DuplicateIdempotencyKey(key)),
                _ => {
                    keys.insert(key, tx.id);
                }
            }
        }
        self.transactions.lock().await.insert(tx.id, tx.clone());
        let result = self.drive(&mut tx).await;
        if let Err(err) = &result {
            tx.status = TxStatus::Reverted;
            tx.revert_reason = Some(err.to_string());
            if let Some(contract) = tx.contract_address {
                self.queues.lock().await.entry(contract).or_default().remove(tx.id);
            }
        }
        self.transactions.lock().await.insert(tx.id, tx.clone());
        ptx_telemetry::sequencer_metrics().inc_tx_status_transition(status_label(tx.status));
        result.map(|()| tx)
    }

    async fn drive(&self, tx: &mut PrivateTransaction) -> Result<(), TransactionError> {
        let domain = self
            .domains
            .get(&tx.domain)
            .ok_or_else(|| TransactionError::UnknownDomain(tx.domain.clone()))?;

        tx.status = TxStatus::AwaitingVerifiers;
        let pre_assembly = domain.init_transaction(tx).await.map_err(|e| domain_err(&tx.domain, e))?;
        let resolved = self.resolve_verifiers(&pre_assembly).await?;
        tx.pre_assembly = Some(PreAssembly { required_verifiers: pre_assembly.required_verifiers, resolved_verifiers: resolved });

        tx.status = TxStatus::Assembling;
        let post_assembly = domain
            .assemble_transaction(tx, tx.pre_assembly.as_ref().expect("just set"))
            .await
            .map_err(|e| domain_err(&tx.domain, e))?;
        tx.post_assembly = Some(post_assembly);

        if let Some(contract) = tx.contract_address {
            let record = self.registry.record_for(contract);
            if !record.is_coordinator() {
                tx.status = TxStatus::Delegating;
                self.delegate(contract, &record.coordinator, tx).await?;
                return Ok(());
            }
        }

        self.drive_as_coordinator(tx).await
    }

    /// Drives an already-assembled transaction through the remaining
    /// phases — signatures, endorsements, queue ordering, preparation, and
    /// dispatch — as this node's responsibility. Shared by the local path
    /// (this node assembled `tx` itself and won contention for it) and the
    /// delegated path (`drive_delegated`, where a remote node assembled
    /// `tx` and handed coordination to this node).
    async fn drive_as_coordinator(&self, tx: &mut PrivateTransaction) -> Result<(), TransactionError> {
        let domain = self
            .domains
            .get(&tx.domain)
            .ok_or_else(|| TransactionError::UnknownDomain(tx.domain.clone()))?;

        if let Some(contract) = tx.contract_address {
            self.queues.lock().await.entry(contract).or_default().push(tx.clone());
        }

        tx.status = TxStatus::GatheringSignatures;
        self.gather_kind(tx, AttestationKind::Sign).await?;

        tx.status = TxStatus::GatheringEndorsements;
        self.gather_kind(tx, AttestationKind::Endorse).await?;

        if let Some(contract) = tx.contract_address {
            self.wait_for_turn(contract, tx).await;
        }

        tx.status = TxStatus::Preparing;
        let prepared = domain
            .prepare_transaction(tx, tx.post_assembly.as_ref().expect("assembled above"))
            .await
            .map_err(|e| domain_err(&tx.domain, e))?;
        tx.prepared_public_transaction = Some(prepared.clone());

        tx.status = TxStatus::Dispatching;
        self.dispatch_sink
            .dispatch(tx.id, prepared)
            .await
            .map_err(|e| TransactionError::AssemblyFailed(error_to_reason(e)))?;
        tx.status = TxStatus::Dispatched;

        self.persist_dispatch(tx).await?;
        if let Some(contract) = tx.contract_address {
            self.queues.lock().await.entry(contract).or_default().remove(tx.id);
        }
        Ok(())
    }

    /// Takes over coordination of a transaction handed to this node by a
    /// `DelegationRequest`: drives it through `drive_as_coordinator` from
    /// its already-assembled state (re-running assembly here would risk
    /// producing different output states than any attestation gathered
    /// before delegation already covers), then reports the terminal
    /// outcome back to `delegator` so its `Delegating` view can resolve.
    async fn drive_delegated(self: Arc<Self>, mut tx: PrivateTransaction, delegator: NodeId) {
        tx.status = TxStatus::Delegated;
        self.transactions.lock().await.insert(tx.id, tx.clone());

        let result = self.drive_as_coordinator(&mut tx).await;
        if let Err(err) = &result {
            tx.status = TxStatus::Reverted;
            tx.revert_reason = Some(err.to_string());
            if let Some(contract) = tx.contract_address {
                self.queues.lock().await.entry(contract).or_default().remove(tx.id);
            }
        }
        self.transactions.lock().await.insert(tx.id, tx.clone());
        ptx_telemetry::sequencer_metrics().inc_tx_status_transition(status_label(tx.status));

        let message = TransportMessage::DelegationResult {
            tx_id: tx.id,
            success: result.is_ok(),
            revert_reason: tx.revert_reason.clone(),
        };
        let Ok(payload) = serde_json::to_vec(&message) else { return };
        let envelope = Envelope::new(MessageType::DelegationResult, self.this_node.clone(), Uuid::new_v4(), payload);
        let _ = self.transport.send(&delegator, envelope).await;
    }

    /// Resolves a local `Delegating` transaction once the remote
    /// coordinator's `DelegationResult` arrives, so this node's own view
    /// reaches a terminal status instead of staying `Delegating` forever.
    async fn resolve_delegated_result(&self, tx_id: Uuid, success: bool, revert_reason: Option<String>) {
        let mut transactions = self.transactions.lock().await;
        if let Some(tx) = transactions.get_mut(&tx_id) {
            tx.status = if success { TxStatus::Dispatched } else { TxStatus::Reverted };
            tx.revert_reason = revert_reason;
            ptx_telemetry::sequencer_metrics().inc_tx_status_transition(status_label(tx.status));
        }
    }

    async fn resolve_verifiers(&self, pre_assembly: &PreAssembly) -> Result<Vec<VerifierRef>, TransactionError> {
        let mut resolved = Vec::with_capacity(pre_assembly.required_verifiers.len());
        for request in &pre_assembly.required_verifiers {
            let verifier = self
                .identity
                .resolve(&request.lookup, &request.algorithm)
                .await
                .map_err(|_| TransactionError::IdentityNotResolved(request.lookup.clone()))?;
            resolved.push(verifier);
        }
        Ok(resolved)
    }

    async fn gather_kind(&self, tx: &mut PrivateTransaction, kind: AttestationKind) -> Result<(), TransactionError> {
        let post = tx.post_assembly.clone().expect("assembled before gathering");
        let requests: Vec<_> = post.attestation_plan.iter().filter(|r| r.kind == kind).cloned().collect();
        for request in requests {
            if post.endorsements.iter().any(|r| r.name == request.name) {
                continue;
            }
            let any_local = request.parties.iter().any(|p| is_local_party(p, &self.this_node));
            let result = if any_local {
                self.gatherer
                    .gather_local(tx, &post, &request)
                    .await
                    .map_err(|e| TransactionError::AssemblyFailed(error_to_reason(e)))?
            } else {
                let rx = self
                    .gatherer
                    .request_remote(tx.id, request.clone())
                    .await
                    .map_err(|e| TransactionError::AssemblyFailed(error_to_reason(e)))?;
                let reply = tokio::time::timeout(std::time::Duration::from_secs(30), rx)
                    .await
                    .map_err(|_| TransactionError::AttestationTimeout(request.name.clone()))?
                    .map_err(|_| TransactionError::AttestationTimeout(request.name.clone()))?;
                reply.map_err(TransactionError::AssemblyFailed)?
            };
            tx.post_assembly.as_mut().expect("assembled before gathering").record_endorsement(result);
        }
        Ok(())
    }

    /// Blocks until `tx` is in the contract queue's next dispatchable
    /// batch: its endorsements are complete and no earlier-queued
    /// transaction still holds a state it depends on. Keeps dispatch order
    /// tied to state dependency rather than endorsement arrival order, even
    /// when several transactions against the same contract finish
    /// attestation concurrently.
    ///
    /// TODO: replace the poll with a per-contract `Notify` woken on queue
    /// removal once contract queues see enough depth for the busy-wait to
    /// matter.
    async fn wait_for_turn(&self, contract: EthAddress, tx: &PrivateTransaction) {
        loop {
            let ready = {
                let mut queues = self.queues.lock().await;
                let queue = queues.entry(contract).or_default();
                if let Some(entry) = queue.get_mut(tx.id) {
                    entry.post_assembly = tx.post_assembly.clone();
                }
                crate::queue::next_dispatchable(queue)
            };
            if ready.contains(&tx.id) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
    }

    async fn delegate(&self, contract: EthAddress, coordinator: &NodeId, tx: &PrivateTransaction) -> Result<(), TransactionError> {
        let message = TransportMessage::DelegationRequest { contract_address: contract, transactions: vec![tx.clone()] };
        let payload = serde_json::to_vec(&message).map_err(|e| TransactionError::AssemblyFailed(e.to_string()))?;
        let envelope = Envelope::new(MessageType::DelegationRequest, self.this_node.clone(), Uuid::new_v4(), payload);
        self.transport
            .send(coordinator, envelope)
            .await
            .map_err(|e| TransactionError::AssemblyFailed(e.to_string()))?;
        ptx_telemetry::sequencer_metrics().inc_delegation("sent");
        Ok(())
    }

    async fn persist_dispatch(&self, tx: &PrivateTransaction) -> Result<(), TransactionError> {
        let mut operations = vec![Operation::UpdateTransactionStatus { tx_id: tx.id, status: TxStatus::Dispatched }];
        if let Some(post) = &tx.post_assembly {
            for state in &post.output_states {
                operations.push(Operation::InsertState(state.clone()));
            }
            for input in &post.input_states {
                operations.push(Operation::SpendState { state_id: *input, spending_tx: tx.id });
            }
        }
        let receiver = self.persistence.submit(operations);
        await_completion(receiver).await.map_err(|e| TransactionError::AssemblyFailed(e.to_string()))
    }
}

impl TransactionLookup for Dispatcher {
    fn lookup(&self, tx_id: Uuid) -> Option<(PrivateTransaction, PostAssembly)> {
        let tx = self.transactions.try_lock().ok()?.get(&tx_id).cloned()?;
        let post = tx.post_assembly.clone()?;
        Some((tx, post))
    }
}

fn domain_err(domain: &str, e: DomainError) -> TransactionError {
    match e {
        DomainError::CallFailed { call, reason } => match call {
            "init_transaction" => TransactionError::InitRejected { domain: domain.to_string(), reason },
            _ => TransactionError::AssemblyFailed(reason),
        },
        DomainError::MalformedResponse { reason, .. } => TransactionError::AssemblyFailed(reason),
    }
}

fn status_label(status: TxStatus) -> &'static str {
    match status {
        TxStatus::New => "new",
        TxStatus::AwaitingVerifiers => "awaiting_verifiers",
        TxStatus::Assembling => "assembling",
        TxStatus::GatheringSignatures => "gathering_signatures",
        TxStatus::GatheringEndorsements => "gathering_endorsements",
        TxStatus::Preparing => "preparing",
        TxStatus::Dispatching => "dispatching",
        TxStatus::Dispatched => "dispatched",
        TxStatus::Delegating => "delegating",
        TxStatus::Delegated => "delegated",
        TxStatus::Reverted => "reverted",
    }
}
