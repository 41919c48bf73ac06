//! Core application-level data structures: transactions, states, and the
//! attestation model used to drive them to dispatch.

mod ids;
mod private_tx;
mod public_tx;
mod state;

pub use ids::{ContractAddress, EthAddress, IdempotencyKey, NodeId, StateId, TxHash, VerifierLocator};
pub use private_tx::{
    AttestationKind, AttestationRequest, AttestationResult, PostAssembly, PreAssembly,
    PreparedPublicTransaction, PrivateTransaction, TxStatus, VerifierRef, VerifierRequest,
};
pub use public_tx::{
    DispatchAction, GasPricing, PublicTx, PublicTxOutcome, SequencerRecord, SequencerRole,
    SignerNonce, Submission,
};
pub use state::State;

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current wall-clock time as milliseconds since the Unix epoch.
///
/// Centralized so every entity stamps `created_at` the same way. Falls back
/// to `0` if the system clock is set before the Unix epoch, which should
/// never happen outside a misconfigured test environment.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
