//! The Domain plugin interface and a process-local registry of loaded
//! domains, keyed by name.

use async_trait::async_trait;
use ptx_types::app::{AttestationRequest, AttestationResult, PostAssembly, PreAssembly, PreparedPublicTransaction, PrivateTransaction};
use ptx_types::error::DomainError;
use std::collections::HashMap;
use std::sync::Arc;

/// The four lifecycle calls a domain plugin implements to drive a
/// [`PrivateTransaction`] from submission to a dispatchable base-ledger
/// call.
///
/// Implementations must be side-effect free with respect to PTM state:
/// all four calls are read-only views over the transaction and the states
/// it references, returning data for the Sequencer to act on rather than
/// mutating shared state themselves.
#[async_trait]
pub trait Domain: Send + Sync {
    /// The name this domain is registered under.
    fn name(&self) -> &str;

    /// Validates the transaction's inputs and returns the verifiers that
    /// must be resolved before assembly can proceed.
    async fn init_transaction(&self, tx: &PrivateTransaction) -> Result<PreAssembly, DomainError>;

    /// Given resolved verifiers, computes the input/output states and the
    /// attestation plan that must be satisfied before dispatch.
    async fn assemble_transaction(
        &self,
        tx: &PrivateTransaction,
        pre_assembly: &PreAssembly,
    ) -> Result<PostAssembly, DomainError>;

    /// Produces a signature or endorsement for one attestation request this
    /// node is a party to.
    async fn endorse_transaction(
        &self,
        tx: &PrivateTransaction,
        post_assembly: &PostAssembly,
        request: &AttestationRequest,
    ) -> Result<AttestationResult, DomainError>;

    /// Given a fully-attested transaction, produces the base-ledger call
    /// that will confirm it.
    async fn prepare_transaction(
        &self,
        tx: &PrivateTransaction,
        post_assembly: &PostAssembly,
    ) -> Result<PreparedPublicTransaction, DomainError>;
}

/// A process-local registry mapping domain names to loaded plugins.
///
/// Stands in for the out-of-scope plugin loader: a production node would
/// populate this from dynamically loaded libraries or separate processes;
/// `ptx-node` populates it directly with in-process implementations.
#[derive(Default, Clone)]
pub struct DomainRegistry {
    domains: HashMap<String, Arc<dyn Domain>>,
}

impl DomainRegistry {
    /// Constructs an empty registry.
    pub fn new() -> Self {
        Self { domains: HashMap::new() }
    }

    /// Registers a domain under its own [`Domain::name`].
    pub fn register(&mut self, domain: Arc<dyn Domain>) {
        self.domains.insert(domain.name().to_string(), domain);
    }

    /// Looks up a domain by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Domain>> {
        self.domains.get(name).cloned()
    }

    /// Returns the names of every registered domain.
    pub fn names(&self) -> Vec<&str> {
        self.domains.keys().map(String::as_str).collect()
    }
}
