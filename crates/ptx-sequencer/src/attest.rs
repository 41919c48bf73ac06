//! Attestation gathering: satisfying one [`AttestationRequest`] at a time,
//! either locally (a party this node can sign or endorse for) or remotely
//! over the [`Transport`].

use async_trait::async_trait;
use ptx_crypto::address::{keccak256, parse_hex_address};
use ptx_crypto::signer::Signer;
use ptx_domain::domain::DomainRegistry;
use ptx_identity::resolver::IdentityResolver;
use ptx_transport::envelope::{Envelope, MessageType};
use ptx_transport::message::TransportMessage;
use ptx_transport::transport::Transport;
use ptx_types::app::{AttestationRequest, AttestationResult, NodeId, PostAssembly, PrivateTransaction};
use ptx_types::error::SequencerError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use uuid::Uuid;

/// Whether `locator` names a party reachable on this node without going
/// over the transport: either a domain-internal locator (no `@node`
/// suffix, e.g. `"domain:transfer"`, since domain plugins run in-process on
/// every node) or a locator explicitly addressed to `this_node`.
pub fn is_local_party(locator: &str, this_node: &NodeId) -> bool {
    match locator.rsplit_once('@') {
        Some((_, node)) => node == this_node.0,
        None => true,
    }
}

/// Returns the node a non-local locator should be addressed to.
fn remote_node(locator: &str) -> Option<NodeId> {
    locator.rsplit_once('@').map(|(_, node)| NodeId::from(node))
}

/// Drives the endorsement gather protocol for one node: satisfies local
/// attestation requests directly, and forwards remote ones over the
/// [`Transport`], correlating responses back to their callers.
pub struct AttestationGatherer {
    this_node: NodeId,
    domains: DomainRegistry,
    identity: Arc<dyn IdentityResolver>,
    signer: Arc<dyn Signer>,
    transport: Arc<dyn Transport>,
    pending: Mutex<HashMap<Uuid, oneshot::Sender<Result<AttestationResult, String>>>>,
}

impl AttestationGatherer {
    /// Constructs a gatherer for `this_node`.
    pub fn new(
        this_node: NodeId,
        domains: DomainRegistry,
        identity: Arc<dyn IdentityResolver>,
        signer: Arc<dyn Signer>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self { this_node, domains, identity, signer, transport, pending: Mutex::new(HashMap::new()) }
    }

    /// Satisfies `request` against a locally-held key or in-process domain
    /// plugin. Callers must first confirm the request has a local party via
    /// [`is_local_party`].
    pub async fn gather_local(
        &self,
        tx: &PrivateTransaction,
        post_assembly: &PostAssembly,
        request: &AttestationRequest,
    ) -> Result<AttestationResult, SequencerError> {
        use ptx_types::app::AttestationKind;
        match request.kind {
            AttestationKind::Sign => self.sign_locally(request).await,
            AttestationKind::Endorse => {
                let domain = self
                    .domains
                    .get(&tx.domain)
                    .ok_or_else(|| SequencerError::MalformedEndorsement(format!("unknown domain {}", tx.domain)))?;
                domain
                    .endorse_transaction(tx, post_assembly, request)
                    .await
                    .map_err(|e| SequencerError::MalformedEndorsement(e.to_string()))
            }
        }
    }

    async fn sign_locally(&self, request: &AttestationRequest) -> Result<AttestationResult, SequencerError> {
        let party = request
            .parties
            .iter()
            .find(|p| is_local_party(p, &self.this_node))
            .ok_or_else(|| SequencerError::MalformedEndorsement(format!("no local signer for '{}'", request.name)))?;
        let verifier = self
            .identity
            .resolve(party, &request.algorithm)
            .await
            .map_err(|e| SequencerError::MalformedEndorsement(e.to_string()))?;
        let address = parse_hex_address(&verifier.verifier)
            .map_err(|e| SequencerError::MalformedEndorsement(format!("verifier {} for '{}' is not a valid address: {e}", verifier.verifier, request.name)))?;
        let payload = request.payload.clone().unwrap_or_default();
        let digest = keccak256(&payload);
        let signature = self
            .signer
            .sign_digest(&address, &digest)
            .map_err(|e| SequencerError::MalformedEndorsement(e.to_string()))?;
        Ok(AttestationResult {
            name: request.name.clone(),
            kind: request.kind,
            verifier,
            payload: signature,
        })
    }

    /// Sends `request` to a remote party over the transport and returns a
    /// receiver that resolves once the matching [`TransportMessage::EndorsementResponse`]
    /// arrives (via [`Self::handle_incoming`] running against the
    /// transport's receive loop).
    pub async fn request_remote(
        &self,
        tx_id: Uuid,
        request: AttestationRequest,
    ) -> Result<oneshot::Receiver<Result<AttestationResult, String>>, SequencerError> {
        let party = request
            .parties
            .iter()
            .find(|p| !is_local_party(p, &self.this_node))
            .ok_or_else(|| SequencerError::MalformedEndorsement(format!("no remote party for '{}'", request.name)))?;
        let node = remote_node(party)
            .ok_or_else(|| SequencerError::MalformedEndorsement(format!("party '{party}' has no node suffix")))?;

        let correlation_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(correlation_id, tx);

        let message = TransportMessage::EndorsementRequest { tx_id, request };
        let payload = serde_json::to_vec(&message)
            .map_err(|e| SequencerError::MalformedEndorsement(e.to_string()))?;
        let envelope = Envelope::new(MessageType::EndorsementRequest, self.this_node.clone(), correlation_id, payload);

        self.transport
            .send(&node, envelope)
            .await
            .map_err(|e| SequencerError::MalformedEndorsement(e.to_string()))?;
        Ok(rx)
    }

    /// Processes one inbound envelope: answers an `EndorsementRequest` with
    /// a response envelope, or resolves a pending `request_remote` call for
    /// an `EndorsementResponse`. Intended to run in a loop fed by
    /// [`Transport::recv`].
    pub async fn handle_incoming(&self, envelope: Envelope, tx_lookup: &dyn TransactionLookup) {
        let message: TransportMessage = match serde_json::from_slice(&envelope.payload) {
            Ok(message) => message,
            Err(_) => return,
        };
        match message {
            TransportMessage::EndorsementRequest { tx_id, request } => {
                let result = match tx_lookup.lookup(tx_id) {
                    Some((tx, post)) => self.gather_local(&tx, &post, &request).await.map_err(|e| e.to_string()),
                    None => Err(format!("unknown transaction {tx_id}")),
                };
                let response = TransportMessage::EndorsementResponse { tx_id, result };
                if let Ok(payload) = serde_json::to_vec(&response) {
                    let reply = Envelope::new(
                        MessageType::EndorsementResponse,
                        self.this_node.clone(),
                        envelope.correlation_id,
                        payload,
                    );
                    let _ = self.transport.send(&envelope.node, reply).await;
                }
            }
            TransportMessage::EndorsementResponse { result, .. } => {
                if let Some(sender) = self.pending.lock().await.remove(&envelope.correlation_id) {
                    let _ = sender.send(result);
                }
            }
            _ => {}
        }
    }
}

/// Looks up a transaction and its current assembly state by id, so
/// [`AttestationGatherer::handle_incoming`] can answer a remote
/// endorsement request without depending on the Dispatcher directly.
#[async_trait]
pub trait TransactionLookup: Send + Sync {
    /// Returns the transaction and its post-assembly state, if known.
    fn lookup(&self, tx_id: Uuid) -> Option<(PrivateTransaction, PostAssembly)>;
}
