//! Two transactions against the same contract, where the second consumes a
//! state the first mints, dispatch in the order they were queued — never in
//! whatever order their endorsements happen to finish. The second carries no
//! attestation requirement at all and is fully ready to dispatch well before
//! the first, whose only endorser is a remote party this test holds off
//! replying to, so this is the most adversarial ordering the contract queue
//! can be asked to resolve.
//!
//! `wiring::wire` only registers the `transfer` domain, which cannot express
//! an explicit state dependency between two transactions the test controls
//! end to end, so this builds a `Dispatcher` directly against a small
//! in-test domain instead, the way `ptx-sequencer`'s own test suite does.

mod common;

use async_trait::async_trait;
use ptx_crypto::signer::{LocalSigner, Signer};
use ptx_domain::domain::{Domain, DomainRegistry};
use ptx_identity::resolver::{IdentityResolver, LocalIdentityRegistry};
use ptx_persistence::memory::InMemoryPersistence;
use ptx_persistence::persistence::Persistence;
use ptx_pubtx::rpc::{EthRpcClient, MockEthRpcClient};
use ptx_pubtx::{GasPriceConfig, Orchestrator};
use ptx_sequencer::dispatcher::Dispatcher;
use ptx_transport::envelope::{Envelope, MessageType};
use ptx_transport::memory::Network;
use ptx_transport::message::TransportMessage;
use ptx_transport::transport::Transport;
use ptx_types::app::{
    AttestationKind, AttestationRequest, AttestationResult, EthAddress, NodeId, PostAssembly,
    PreAssembly, PreparedPublicTransaction, PrivateTransaction, State, StateId, VerifierRef,
};
use ptx_types::error::DomainError;
use serde::Deserialize;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use uuid::Uuid;

/// Mints `output` and optionally spends `input`, requiring a remote
/// endorsement from `remote_endorser` when one is given. Lets the test
/// construct an explicit state dependency between two transactions without
/// depending on `SimpleTransferDomain`'s internally generated output ids.
#[derive(Deserialize)]
struct OrderedInputs {
    #[serde(default)]
    input: Option<StateId>,
    output: StateId,
    #[serde(default)]
    remote_endorser: Option<String>,
}

struct OrderedDomain;

#[async_trait]
impl Domain for OrderedDomain {
    fn name(&self) -> &str {
        "ordered"
    }

    async fn init_transaction(&self, _tx: &PrivateTransaction) -> Result<PreAssembly, DomainError> {
        Ok(PreAssembly { required_verifiers: vec![], resolved_verifiers: vec![] })
    }

    async fn assemble_transaction(&self, tx: &PrivateTransaction, _pre: &PreAssembly) -> Result<PostAssembly, DomainError> {
        let inputs: OrderedInputs = serde_json::from_value(tx.inputs.clone())
            .map_err(|e| DomainError::MalformedResponse { call: "assemble_transaction", reason: e.to_string() })?;
        let contract = tx.contract_address.ok_or_else(|| DomainError::CallFailed {
            call: "assemble_transaction",
            reason: "ordered domain requires a contract address".into(),
        })?;
        let output = State::minted(inputs.output, "ordered.state", contract, serde_json::json!({}), "bob@node1", tx.id);
        let attestation_plan = match inputs.remote_endorser {
            Some(party) => vec![AttestationRequest {
                name: "remote-notary".into(),
                kind: AttestationKind::Endorse,
                algorithm: "domain-notary".into(),
                verifier_type: "notary".into(),
                payload_type: "state-commitment".into(),
                payload: Some(output.id.as_bytes().to_vec()),
                parties: vec![party],
            }],
            None => vec![],
        };
        Ok(PostAssembly {
            input_states: inputs.input.into_iter().collect(),
            output_states: vec![output],
            attestation_plan,
            endorsements: vec![],
        })
    }

    async fn endorse_transaction(&self, _tx: &PrivateTransaction, _post: &PostAssembly, request: &AttestationRequest) -> Result<AttestationResult, DomainError> {
        Err(DomainError::CallFailed { call: "endorse_transaction", reason: format!("no local endorser for '{}'", request.name) })
    }

    async fn prepare_transaction(&self, tx: &PrivateTransaction, post: &PostAssembly) -> Result<PreparedPublicTransaction, DomainError> {
        if !post.is_fully_attested() {
            return Err(DomainError::CallFailed { call: "prepare_transaction", reason: "attestation plan is not fully satisfied".into() });
        }
        Ok(PreparedPublicTransaction {
            to: tx.contract_address.expect("checked during assembly"),
            function: "noop".into(),
            data: vec![],
            signer: tx.from.clone(),
        })
    }
}

#[tokio::test]
async fn a_still_gathering_transaction_keeps_its_queue_slot_ahead_of_a_ready_follower() {
    let network = Network::new();
    let node1_transport = Arc::new(network.join(NodeId::from("node1")));
    let remote_transport = Arc::new(network.join(NodeId::from("remote")));

    let mut domains = DomainRegistry::new();
    domains.register(Arc::new(OrderedDomain));
    let identity = Arc::new(LocalIdentityRegistry::new());
    let signer = Arc::new(LocalSigner::new());
    let sender = signer.generate();
    identity.register("alice@node1", "ecdsa:secp256k1", format!("0x{}", hex::encode(sender.as_bytes())));
    let persistence = Arc::new(InMemoryPersistence::new());
    let rpc = Arc::new(MockEthRpcClient::new());

    let orchestrator = Arc::new(Orchestrator::new(
        signer.clone() as Arc<dyn Signer>,
        rpc.clone() as Arc<dyn EthRpcClient>,
        identity.clone() as Arc<dyn IdentityResolver>,
        persistence.clone() as Arc<dyn Persistence>,
        GasPriceConfig::default(),
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        NodeId::from("node1"),
        "node1-locator",
        domains,
        identity as Arc<dyn IdentityResolver>,
        signer as Arc<dyn Signer>,
        node1_transport.clone() as Arc<dyn Transport>,
        persistence as Arc<dyn Persistence>,
        orchestrator.clone(),
    ));

    let contract = EthAddress::from_bytes([13u8; 20]);
    let shared = StateId::from_bytes([42u8; 32]);
    let second_output = StateId::from_bytes([43u8; 32]);

    let tx_a = PrivateTransaction::new(
        "ordered",
        Some(contract),
        "alice@node1",
        serde_json::json!({"output": hex::encode(shared.as_bytes()), "remote_endorser": "notary@remote"}),
        None,
    );
    let a_id = tx_a.id;
    let dispatcher_a = dispatcher.clone();
    let handle_a = tokio::spawn(async move { dispatcher_a.submit(tx_a).await });

    // Blocks until a's remote endorsement request actually reaches "remote",
    // i.e. until a is queued and gathering — no sleep-based guess needed.
    let request_envelope = timeout(Duration::from_secs(1), remote_transport.recv())
        .await
        .expect("a's endorsement request should arrive")
        .expect("transport should not have closed");
    assert_eq!(request_envelope.message_type, MessageType::EndorsementRequest);

    let tx_b = PrivateTransaction::new(
        "ordered",
        Some(contract),
        "alice@node1",
        serde_json::json!({"input": hex::encode(shared.as_bytes()), "output": hex::encode(second_output.as_bytes())}),
        None,
    );
    let b_id = tx_b.id;
    let dispatcher_b = dispatcher.clone();
    let handle_b = tokio::spawn(async move { dispatcher_b.submit(tx_b).await });

    // b needs no endorsement at all and would be ready to dispatch almost
    // immediately; give its task a window to reach (and sit in)
    // wait_for_turn before a's endorsement is answered.
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!handle_b.is_finished(), "b must not dispatch ahead of the still-gathering a");

    let message: TransportMessage = serde_json::from_slice(&request_envelope.payload).expect("payload should decode");
    let (tx_id, request_name) = match message {
        TransportMessage::EndorsementRequest { tx_id, request } => (tx_id, request.name),
        other => panic!("expected an endorsement request, got {other:?}"),
    };
    assert_eq!(tx_id, a_id);

    let response = TransportMessage::EndorsementResponse {
        tx_id,
        result: Ok(AttestationResult {
            name: request_name,
            kind: AttestationKind::Endorse,
            verifier: VerifierRef { lookup: "notary@remote".into(), algorithm: "domain-notary".into(), verifier: "notary@remote".into() },
            payload: vec![],
        }),
    };
    let payload = serde_json::to_vec(&response).unwrap();
    let reply = Envelope::new(MessageType::EndorsementResponse, NodeId::from("remote"), request_envelope.correlation_id, payload);
    remote_transport.send(&NodeId::from("node1"), reply).await.expect("reply should send");

    let inbound = timeout(Duration::from_secs(1), node1_transport.recv())
        .await
        .expect("node1 should receive the endorsement response")
        .expect("transport should not have closed");
    dispatcher.handle_incoming(inbound).await;

    let a_result = timeout(Duration::from_secs(1), handle_a).await.expect("a should finish").expect("a's task should not panic").expect("a should dispatch");
    let b_result = timeout(Duration::from_secs(1), handle_b).await.expect("b should finish").expect("b's task should not panic").expect("b should dispatch");
    assert_eq!(a_result.id, a_id);
    assert_eq!(b_result.id, b_id);

    let a_nonce = orchestrator.public_tx_for_private(a_id).await.expect("a should have a public tx").signer_nonce.nonce;
    let b_nonce = orchestrator.public_tx_for_private(b_id).await.expect("b should have a public tx").signer_nonce.nonce;
    assert!(a_nonce < b_nonce, "a must consume the earlier nonce despite needing no local endorsement to finish first: a={a_nonce} b={b_nonce}");
}
