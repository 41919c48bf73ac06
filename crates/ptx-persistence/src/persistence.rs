//! The `Persistence` trait: the two-phase `Submit(dbTx) -> Completed(bool)`
//! contract.

use crate::operation::Operation;
use async_trait::async_trait;
use ptx_types::app::{EthAddress, PublicTx, SequencerRecord, State, StateId, TxStatus};
use ptx_types::error::PersistenceError;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Stages durable writes and reports their outcome once committed. Stands
/// in for the out-of-scope production store.
///
/// Callers do not block on disk I/O: [`Persistence::submit`] returns a
/// receiver immediately, and the store resolves it once the batch is
/// durably committed (`Ok(())`) or rejected (`Err`). A dropped sender
/// (e.g. the store crashed mid-write) resolves the receiver with
/// [`PersistenceError::WriteFailed`] rather than hanging forever.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Stages `operations` as one atomic batch, returning a handle that
    /// resolves once the store has durably applied or rejected it.
    fn submit(&self, operations: Vec<Operation>) -> oneshot::Receiver<Result<(), PersistenceError>>;
}

/// The read-model half of the persistence boundary: the introspection
/// queries `ptx-rpc`'s `ptx_get*`/`ptx_query*` methods need, kept separate
/// from [`Persistence`] so the write path stays a narrow two-phase commit
/// contract.
#[async_trait]
pub trait PersistenceQuery: Send + Sync {
    /// Reads a state by id.
    async fn get_state(&self, id: &StateId) -> Option<State>;
    /// Reads a private transaction's last-committed status.
    async fn get_transaction_status(&self, id: &Uuid) -> Option<TxStatus>;
    /// Reads a public transaction by id.
    async fn get_public_tx(&self, id: &Uuid) -> Option<PublicTx>;
    /// Reads every public transaction currently tracked.
    async fn list_public_txs(&self) -> Vec<PublicTx>;
    /// Reads the current sequencer record for a contract.
    async fn get_sequencer_record(&self, contract: &EthAddress) -> Option<SequencerRecord>;
}

/// Awaits a submission's outcome, translating a dropped sender into
/// [`PersistenceError::WriteFailed`].
pub async fn await_completion(
    receiver: oneshot::Receiver<Result<(), PersistenceError>>,
) -> Result<(), PersistenceError> {
    match receiver.await {
        Ok(result) => result,
        Err(_) => Err(PersistenceError::WriteFailed("store dropped the submission before completing".into())),
    }
}
