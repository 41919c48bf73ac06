use super::{now_millis, ContractAddress, StateId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A content-addressed, off-chain record owned by a specific identity within
/// a domain, referenced on-chain only by its hash.
///
/// Lifecycle: created as a *potential* output by `AssembleTransaction`,
/// confirmed when the owning [`crate::app::PrivateTransaction`] is dispatched
/// and its Domain Context is flushed, and spent when a later transaction
/// lists it as an input state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Content-addressed identifier (32 bytes).
    pub id: StateId,
    /// The domain-defined schema this state's `data` conforms to.
    pub schema_id: String,
    /// The privately-deployed contract this state belongs to.
    pub contract_address: ContractAddress,
    /// Domain-opaque state payload.
    pub data: serde_json::Value,
    /// Identity locator of the current owner.
    pub owner: String,
    /// Milliseconds since the Unix epoch when this state was confirmed.
    pub created_at: u64,
    /// Milliseconds since the Unix epoch when this state was spent, if ever.
    pub spent_at: Option<u64>,
    /// The transaction that minted this state.
    pub minting_tx: Uuid,
    /// The transaction that spent this state, if any.
    pub spending_tx: Option<Uuid>,
}

impl State {
    /// Constructs a freshly-minted, unspent state.
    pub fn minted(
        id: StateId,
        schema_id: impl Into<String>,
        contract_address: ContractAddress,
        data: serde_json::Value,
        owner: impl Into<String>,
        minting_tx: Uuid,
    ) -> Self {
        Self {
            id,
            schema_id: schema_id.into(),
            contract_address,
            data,
            owner: owner.into(),
            created_at: now_millis(),
            spent_at: None,
            minting_tx,
            spending_tx: None,
        }
    }

    /// Whether this state has already been consumed as an input elsewhere.
    ///
    /// Invariant 2 of the data model (a state id is spent at most once) is
    /// enforced by whoever owns the unspent set (the State Store, external
    /// to this crate) calling [`State::mark_spent`] exactly once per id; this
    /// method only reports the local view.
    pub fn is_spent(&self) -> bool {
        self.spent_at.is_some()
    }

    /// Marks the state as spent by `spending_tx`. Idempotent if called twice
    /// with the same spender; returns `false` if it is already spent by a
    /// *different* transaction, signalling a double-spend attempt.
    pub fn mark_spent(&mut self, spending_tx: Uuid) -> bool {
        match self.spending_tx {
            Some(existing) => existing == spending_tx,
            None => {
                self.spending_tx = Some(spending_tx);
                self.spent_at = Some(now_millis());
                true
            }
        }
    }
}
