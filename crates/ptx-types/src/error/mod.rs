//! Typed errors for every PTM subsystem, each carrying a stable string code
//! suitable for metrics labels and API responses.

use thiserror::Error;

/// Gives an error variant a stable, machine-readable code independent of its
/// `Display` text, so dashboards and client integrations don't break when a
/// message is reworded.
pub trait ErrorCode {
    /// A `SCREAMING_SNAKE_CASE` code unique to this variant.
    fn code(&self) -> &'static str;
}

/// Errors raised while a [`crate::app::PrivateTransaction`] moves through
/// init, assembly, and the attestation gather protocol.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// The named domain plugin is not registered on this node.
    #[error("unknown domain: {0}")]
    UnknownDomain(String),
    /// `InitTransaction` rejected the submission.
    #[error("domain rejected init for {domain}: {reason}")]
    InitRejected {
        /// Domain plugin name.
        domain: String,
        /// Domain-supplied rejection reason.
        reason: String,
    },
    /// `AssembleTransaction` failed after verifiers were resolved.
    #[error("assembly failed: {0}")]
    AssemblyFailed(String),
    /// A named identity locator could not be resolved.
    #[error("identity resolution failed for {0}")]
    IdentityNotResolved(String),
    /// An attestation request timed out waiting for a response.
    #[error("attestation '{0}' timed out")]
    AttestationTimeout(String),
    /// `PrepareTransaction` was called before the attestation plan was
    /// fully satisfied (invariant 4).
    #[error("transaction is not fully attested")]
    NotFullyAttested,
    /// Two transactions in the same dependency window wrote to the same
    /// idempotency key.
    #[error("idempotency key {0} already in use")]
    DuplicateIdempotencyKey(String),
    /// The referenced input state does not exist or is already spent.
    #[error("input state {0} is unavailable")]
    StateUnavailable(String),
}

impl ErrorCode for TransactionError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownDomain(_) => "TX_UNKNOWN_DOMAIN",
            Self::InitRejected { .. } => "TX_INIT_REJECTED",
            Self::AssemblyFailed(_) => "TX_ASSEMBLY_FAILED",
            Self::IdentityNotResolved(_) => "TX_IDENTITY_NOT_RESOLVED",
            Self::AttestationTimeout(_) => "TX_ATTESTATION_TIMEOUT",
            Self::NotFullyAttested => "TX_NOT_FULLY_ATTESTED",
            Self::DuplicateIdempotencyKey(_) => "TX_DUPLICATE_IDEMPOTENCY_KEY",
            Self::StateUnavailable(_) => "TX_STATE_UNAVAILABLE",
        }
    }
}

/// Errors raised by the per-contract Sequencer/Coordinator state machine and
/// the contention-resolution path.
#[derive(Debug, Error)]
pub enum SequencerError {
    /// No [`crate::app::SequencerRecord`] exists yet for this contract.
    #[error("no sequencer record for contract {0}")]
    NoRecord(String),
    /// This node is not the Coordinator and the operation requires it.
    #[error("node is not coordinator for contract {0}")]
    NotCoordinator(String),
    /// Delegation to a remote coordinator failed or was rejected.
    #[error("delegation to {node} failed: {reason}")]
    DelegationFailed {
        /// The node delegation was attempted to.
        node: String,
        /// Why it failed.
        reason: String,
    },
    /// A dependency cycle was detected among queued transactions' input
    /// states, which should be unreachable given invariant 2.
    #[error("dependency cycle detected among states: {0:?}")]
    DependencyCycle(Vec<String>),
    /// The transport returned a malformed or unparseable endorsement
    /// response.
    #[error("malformed endorsement response: {0}")]
    MalformedEndorsement(String),
    /// The [`crate::app::PreparedPublicTransaction`] handoff to the public
    /// transaction manager was rejected.
    #[error("dispatch to the public transaction manager failed: {0}")]
    DispatchFailed(String),
}

impl ErrorCode for SequencerError {
    fn code(&self) -> &'static str {
        match self {
            Self::NoRecord(_) => "SEQ_NO_RECORD",
            Self::NotCoordinator(_) => "SEQ_NOT_COORDINATOR",
            Self::DelegationFailed { .. } => "SEQ_DELEGATION_FAILED",
            Self::DependencyCycle(_) => "SEQ_DEPENDENCY_CYCLE",
            Self::MalformedEndorsement(_) => "SEQ_MALFORMED_ENDORSEMENT",
            Self::DispatchFailed(_) => "SEQ_DISPATCH_FAILED",
        }
    }
}

/// Errors raised by the public transaction manager: nonce allocation, gas
/// pricing, and base-ledger submission.
#[derive(Debug, Error)]
pub enum PubTxError {
    /// The requested nonce has already been assigned to another
    /// [`crate::app::PublicTx`].
    #[error("nonce {nonce} for {signer} already assigned")]
    NonceAlreadyAssigned {
        /// The signer whose nonce sequence this is.
        signer: String,
        /// The conflicting nonce.
        nonce: u64,
    },
    /// A nonce was rolled back that was never assigned.
    #[error("nonce {nonce} for {signer} was not assigned")]
    NonceNotAssigned {
        /// The signer whose nonce sequence this is.
        signer: String,
        /// The nonce in question.
        nonce: u64,
    },
    /// The signer has no confirmed on-chain nonce yet and cannot be primed.
    #[error("could not determine starting nonce for {0}")]
    NonceBaselineUnavailable(String),
    /// The Ethereum RPC client returned an error submitting a transaction.
    #[error("rpc submission failed: {0}")]
    RpcSubmissionFailed(String),
    /// Gas price escalation exceeded the configured maximum.
    #[error("gas price for {signer} exceeded configured maximum")]
    GasPriceExceededMax {
        /// The signer whose submission this is.
        signer: String,
    },
    /// The signing key for the given signer is not available locally.
    #[error("no signing key for {0}")]
    SignerUnavailable(String),
    /// A `dispatchAction` named a `(signer, nonce)` pair with no tracked
    /// [`crate::app::PublicTx`].
    #[error("no public transaction tracked for {signer} nonce {nonce}")]
    UnknownSignerNonce {
        /// The signer whose nonce sequence this is.
        signer: String,
        /// The nonce in question.
        nonce: u64,
    },
}

impl ErrorCode for PubTxError {
    fn code(&self) -> &'static str {
        match self {
            Self::NonceAlreadyAssigned { .. } => "PUBTX_NONCE_ALREADY_ASSIGNED",
            Self::NonceNotAssigned { .. } => "PUBTX_NONCE_NOT_ASSIGNED",
            Self::NonceBaselineUnavailable(_) => "PUBTX_NONCE_BASELINE_UNAVAILABLE",
            Self::RpcSubmissionFailed(_) => "PUBTX_RPC_SUBMISSION_FAILED",
            Self::GasPriceExceededMax { .. } => "PUBTX_GAS_PRICE_EXCEEDED_MAX",
            Self::SignerUnavailable(_) => "PUBTX_SIGNER_UNAVAILABLE",
            Self::UnknownSignerNonce { .. } => "PUBTX_UNKNOWN_SIGNER_NONCE",
        }
    }
}

/// Errors raised by the Endorsement Transport Protocol.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The target node is not known to this node's transport.
    #[error("unknown node: {0}")]
    UnknownNode(String),
    /// The peer connection could not be established or was dropped.
    #[error("send to {node} failed: {reason}")]
    SendFailed {
        /// The node that could not be reached.
        node: String,
        /// Underlying transport error text.
        reason: String,
    },
    /// A received envelope failed to decode.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
    /// The envelope's protocol version is not supported by this node.
    #[error("unsupported envelope version: {0}")]
    UnsupportedVersion(u8),
    /// No response arrived within the configured timeout.
    #[error("request to {0} timed out")]
    Timeout(String),
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownNode(_) => "TRANSPORT_UNKNOWN_NODE",
            Self::SendFailed { .. } => "TRANSPORT_SEND_FAILED",
            Self::MalformedEnvelope(_) => "TRANSPORT_MALFORMED_ENVELOPE",
            Self::UnsupportedVersion(_) => "TRANSPORT_UNSUPPORTED_VERSION",
            Self::Timeout(_) => "TRANSPORT_TIMEOUT",
        }
    }
}

/// Errors raised by the persistence boundary's two-phase
/// `Submit(dbTx) -> Completed(bool)` contract.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The underlying store rejected the write.
    #[error("write failed: {0}")]
    WriteFailed(String),
    /// `Completed` was reported for a submission that was never started.
    #[error("unknown submission: {0}")]
    UnknownSubmission(String),
    /// A transaction was committed twice.
    #[error("submission {0} already completed")]
    AlreadyCompleted(String),
}

impl ErrorCode for PersistenceError {
    fn code(&self) -> &'static str {
        match self {
            Self::WriteFailed(_) => "PERSISTENCE_WRITE_FAILED",
            Self::UnknownSubmission(_) => "PERSISTENCE_UNKNOWN_SUBMISSION",
            Self::AlreadyCompleted(_) => "PERSISTENCE_ALREADY_COMPLETED",
        }
    }
}

/// Errors surfaced directly by the JSON-RPC surface.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The request body did not parse as a valid JSON-RPC call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The named method does not exist.
    #[error("method not found: {0}")]
    MethodNotFound(String),
    /// Parameters failed to deserialize into the method's expected shape.
    #[error("invalid params: {0}")]
    InvalidParams(String),
    /// An internal error occurred while handling an otherwise valid request.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ErrorCode for RpcError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "RPC_INVALID_REQUEST",
            Self::MethodNotFound(_) => "RPC_METHOD_NOT_FOUND",
            Self::InvalidParams(_) => "RPC_INVALID_PARAMS",
            Self::Internal(_) => "RPC_INTERNAL",
        }
    }
}

/// Errors raised by calls into a domain plugin's `InitTransaction`,
/// `AssembleTransaction`, `EndorseTransaction`, or `PrepareTransaction`.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The plugin returned an error from one of its four lifecycle calls.
    #[error("domain call '{call}' failed: {reason}")]
    CallFailed {
        /// Which of Init/Assemble/Endorse/Prepare failed.
        call: &'static str,
        /// Plugin-supplied reason.
        reason: String,
    },
    /// The plugin's response did not match the expected shape.
    #[error("malformed domain response from '{call}': {reason}")]
    MalformedResponse {
        /// Which of Init/Assemble/Endorse/Prepare returned it.
        call: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

impl ErrorCode for DomainError {
    fn code(&self) -> &'static str {
        match self {
            Self::CallFailed { .. } => "DOMAIN_CALL_FAILED",
            Self::MalformedResponse { .. } => "DOMAIN_MALFORMED_RESPONSE",
        }
    }
}

/// The aggregate error type returned by top-level PTM operations, wrapping
/// every subsystem's error enum behind one type so callers at the RPC
/// boundary can match on a single [`ErrorCode::code`].
#[derive(Debug, Error)]
pub enum PtxError {
    /// A transaction lifecycle error.
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    /// A sequencer/coordinator error.
    #[error(transparent)]
    Sequencer(#[from] SequencerError),
    /// A public transaction manager error.
    #[error(transparent)]
    PubTx(#[from] PubTxError),
    /// A transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A persistence error.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    /// An RPC-surface error.
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// A domain-plugin error.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ErrorCode for PtxError {
    fn code(&self) -> &'static str {
        match self {
            Self::Transaction(e) => e.code(),
            Self::Sequencer(e) => e.code(),
            Self::PubTx(e) => e.code(),
            Self::Transport(e) => e.code(),
            Self::Persistence(e) => e.code(),
            Self::Rpc(e) => e.code(),
            Self::Domain(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_strings_independent_of_display() {
        let err = PtxError::PubTx(PubTxError::NonceAlreadyAssigned {
            signer: "0xabc".into(),
            nonce: 4,
        });
        assert_eq!(err.code(), "PUBTX_NONCE_ALREADY_ASSIGNED");
        assert!(err.to_string().contains("nonce 4"));
    }

    #[test]
    fn every_variant_round_trips_through_from() {
        let err: PtxError = TransportError::Timeout("node2".into()).into();
        assert_eq!(err.code(), "TRANSPORT_TIMEOUT");
    }
}
