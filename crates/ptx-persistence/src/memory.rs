//! An in-memory [`Persistence`] implementation for tests and single-node
//! development.

use crate::operation::Operation;
use crate::persistence::{Persistence, PersistenceQuery};
use async_trait::async_trait;
use parking_lot::Mutex;
use ptx_types::app::{EthAddress, PublicTx, SequencerRecord, State, StateId, TxStatus};
use ptx_types::error::PersistenceError;
use std::collections::HashMap;
use tokio::sync::oneshot;
use uuid::Uuid;

/// An in-memory ledger that commits batches synchronously, useful for
/// deterministic tests that need to assert on the post-commit state
/// immediately after a submission resolves.
#[derive(Default)]
pub struct InMemoryPersistence {
    states: Mutex<HashMap<StateId, State>>,
    tx_status: Mutex<HashMap<Uuid, TxStatus>>,
    public_txs: Mutex<HashMap<Uuid, PublicTx>>,
    sequencer_records: Mutex<HashMap<EthAddress, SequencerRecord>>,
}

impl InMemoryPersistence {
    /// Constructs an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a state by id.
    pub fn get_state(&self, id: &StateId) -> Option<State> {
        self.states.lock().get(id).cloned()
    }

    /// Reads a transaction's last-committed status.
    pub fn get_transaction_status(&self, id: &Uuid) -> Option<TxStatus> {
        self.tx_status.lock().get(id).copied()
    }

    /// Reads a public transaction by id.
    pub fn get_public_tx(&self, id: &Uuid) -> Option<PublicTx> {
        self.public_txs.lock().get(id).cloned()
    }

    /// Reads the current sequencer record for a contract.
    pub fn get_sequencer_record(&self, contract: &EthAddress) -> Option<SequencerRecord> {
        self.sequencer_records.lock().get(contract).cloned()
    }

    /// Validates the whole batch before mutating anything, so a rejected
    /// operation never leaves a partially-applied batch behind.
    fn validate(&self, operations: &[Operation]) -> Result<(), PersistenceError> {
        let states = self.states.lock();
        for op in operations {
            if let Operation::SpendState { state_id, spending_tx } = op {
                match states.get(state_id) {
                    None => return Err(PersistenceError::WriteFailed(format!("unknown state {state_id}"))),
                    Some(state) if state.is_spent() && state.spending_tx != Some(*spending_tx) => {
                        return Err(PersistenceError::WriteFailed(format!("state {state_id} already spent")));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn apply(&self, operations: Vec<Operation>) -> Result<(), PersistenceError> {
        self.validate(&operations)?;
        for op in operations {
            match op {
                Operation::InsertState(state) => {
                    self.states.lock().insert(state.id, state);
                }
                Operation::SpendState { state_id, spending_tx } => {
                    if let Some(state) = self.states.lock().get_mut(&state_id) {
                        state.mark_spent(spending_tx);
                    }
                }
                Operation::UpdateTransactionStatus { tx_id, status } => {
                    self.tx_status.lock().insert(tx_id, status);
                }
                Operation::InsertPublicTx(public_tx) => {
                    self.public_txs.lock().insert(public_tx.id, public_tx);
                }
                Operation::UpsertSequencerRecord(record) => {
                    self.sequencer_records.lock().insert(record.contract_address, record);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceQuery for InMemoryPersistence {
    async fn get_state(&self, id: &StateId) -> Option<State> {
        self.states.lock().get(id).cloned()
    }

    async fn get_transaction_status(&self, id: &Uuid) -> Option<TxStatus> {
        self.tx_status.lock().get(id).copied()
    }

    async fn get_public_tx(&self, id: &Uuid) -> Option<PublicTx> {
        self.public_txs.lock().get(id).cloned()
    }

    async fn list_public_txs(&self) -> Vec<PublicTx> {
        self.public_txs.lock().values().cloned().collect()
    }

    async fn get_sequencer_record(&self, contract: &EthAddress) -> Option<SequencerRecord> {
        self.sequencer_records.lock().get(contract).cloned()
    }
}

impl Persistence for InMemoryPersistence {
    fn submit(&self, operations: Vec<Operation>) -> oneshot::Receiver<Result<(), PersistenceError>> {
        let (tx, rx) = oneshot::channel();
        let result = self.apply(operations);
        if let Err(e) = &result {
            tracing::warn!(target = "persistence", error = %e, "submission rejected");
        }
        // The receiver is always live here, so a failed send only means the
        // caller already dropped it; nothing to recover.
        let _ = tx.send(result);
        rx
    }
}
