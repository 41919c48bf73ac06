//! Builds the dependency graph for one node: in-memory reference
//! implementations for every out-of-scope external collaborator
//! (state store, key manager, identity resolver, domain plugins,
//! transport, Ethereum RPC client), wired into a [`Dispatcher`] and an
//! [`Orchestrator`].

use crate::config::NodeConfig;
use ptx_crypto::signer::{LocalSigner, Signer};
use ptx_domain::domain::DomainRegistry;
use ptx_domain::reference::SimpleTransferDomain;
use ptx_identity::resolver::{IdentityResolver, LocalIdentityRegistry};
use ptx_persistence::memory::InMemoryPersistence;
use ptx_persistence::persistence::{Persistence, PersistenceQuery};
use ptx_pubtx::orchestrator::Orchestrator;
use ptx_pubtx::rpc::{EthRpcClient, MockEthRpcClient};
use ptx_sequencer::dispatcher::Dispatcher;
use ptx_transport::memory::{InMemoryTransport, Network};
use ptx_transport::transport::Transport;
use ptx_types::app::NodeId;
use std::sync::Arc;

/// Every collaborator a running node holds onto, plus the two top-level
/// drivers ([`Dispatcher`], [`Orchestrator`]) built from them.
pub struct Node {
    /// Drives private transactions through the Sequencer/Coordinator
    /// pipeline.
    pub dispatcher: Arc<Dispatcher>,
    /// Drives dispatched transactions to the base ledger.
    pub orchestrator: Arc<Orchestrator>,
    /// The identity resolver, shared with `ptx-rpc`'s `ptx_resolveVerifier`.
    pub identity: Arc<dyn IdentityResolver>,
    /// The persistence read model, shared with `ptx-rpc`'s query methods.
    pub persistence_query: Arc<dyn PersistenceQuery>,
    /// This node's transport, used by the receive loop in `main`.
    pub transport: Arc<InMemoryTransport>,
}

/// Wires a single node using in-process, in-memory collaborators: a fresh
/// transport [`Network`] (so single-process multi-node tests can join more
/// nodes onto the same network), a [`SimpleTransferDomain`] registered
/// under `"transfer"`, and the given [`EthRpcClient`] standing in for the
/// out-of-scope Ethereum RPC client and Block Indexer (production and
/// `main` pass a [`MockEthRpcClient`]; tests pass one they keep a handle
/// to, so they can drive confirmations).
///
/// Returns the wired [`Node`] plus the concrete [`LocalSigner`] and
/// [`LocalIdentityRegistry`] so callers (tests, `main`) can register keys
/// and verifiers before submitting transactions.
pub fn wire(
    config: &NodeConfig,
    network: &Network,
    rpc_client: Arc<dyn EthRpcClient>,
) -> (Node, Arc<LocalSigner>, Arc<LocalIdentityRegistry>) {
    let node_id = NodeId::from(config.node_id.as_str());

    let mut domains = DomainRegistry::new();
    domains.register(Arc::new(SimpleTransferDomain::new("transfer")));

    let signer = Arc::new(LocalSigner::new());
    let identity = Arc::new(LocalIdentityRegistry::new());
    let persistence = Arc::new(InMemoryPersistence::new());
    let transport = Arc::new(network.join(node_id.clone()));

    let orchestrator = Arc::new(Orchestrator::new(
        signer.clone() as Arc<dyn Signer>,
        rpc_client,
        identity.clone() as Arc<dyn IdentityResolver>,
        persistence.clone() as Arc<dyn Persistence>,
        config.gas_price.clone().into(),
    ));

    let dispatcher = Arc::new(Dispatcher::new(
        node_id,
        config.locator.clone(),
        domains,
        identity.clone() as Arc<dyn IdentityResolver>,
        signer.clone() as Arc<dyn Signer>,
        transport.clone() as Arc<dyn Transport>,
        persistence.clone() as Arc<dyn Persistence>,
        orchestrator.clone(),
    ));

    let node = Node {
        dispatcher,
        orchestrator,
        identity: identity.clone() as Arc<dyn IdentityResolver>,
        persistence_query: persistence as Arc<dyn PersistenceQuery>,
        transport,
    };
    (node, signer, identity)
}

/// Spawns the background task that feeds inbound transport envelopes to
/// the Dispatcher's attestation-gathering responder loop.
pub fn spawn_receive_loop(dispatcher: Arc<Dispatcher>, transport: Arc<InMemoryTransport>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(envelope) = transport.recv().await {
            dispatcher.handle_incoming(envelope).await;
        }
    })
}

/// Spawns the background task that polls the Orchestrator on
/// `config.transaction_engine.interval_ms`.
pub fn spawn_poll_loop(orchestrator: Arc<Orchestrator>, interval_ms: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_millis(interval_ms));
        loop {
            ticker.tick().await;
            let changed = orchestrator.poll_once().await;
            if !changed.is_empty() {
                tracing::debug!(target = "ptx-node", count = changed.len(), "public transactions changed this tick");
            }
        }
    })
}
