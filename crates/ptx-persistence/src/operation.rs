//! The durable write operations a persistence batch may contain.

use ptx_types::app::{PublicTx, SequencerRecord, State, TxStatus};
use uuid::Uuid;

/// One durable write, staged as part of a [`crate::persistence::Persistence::submit`]
/// batch. Batches are applied atomically: either every operation commits, or
/// none does.
#[derive(Clone, Debug)]
pub enum Operation {
    /// Confirms a newly-minted state.
    InsertState(State),
    /// Marks a state as spent by the given transaction.
    SpendState {
        /// The state being spent.
        state_id: ptx_types::app::StateId,
        /// The transaction spending it.
        spending_tx: Uuid,
    },
    /// Records a transition in a private transaction's status.
    UpdateTransactionStatus {
        /// The transaction transitioning.
        tx_id: Uuid,
        /// Its new status.
        status: TxStatus,
    },
    /// Persists a newly-created public transaction.
    InsertPublicTx(PublicTx),
    /// Persists a new or updated sequencer record for a contract.
    UpsertSequencerRecord(SequencerRecord),
}
