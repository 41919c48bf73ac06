//! The per-contract dependency queue.
//!
//! Modeled on an account-sharded mempool's nonce-ordered `select_transactions`
//! sweep (picking a non-conflicting batch in FIFO order): here the conflict
//! key is a private transaction's input/output state ids rather than an
//! account nonce, but the sweep is the same shape — walk the queue in
//! submission order, skip anything that touches a state already claimed by
//! an earlier pick in this round.

use ptx_types::app::{PrivateTransaction, StateId};
use std::collections::{HashSet, VecDeque};
use uuid::Uuid;

/// The FIFO queue of transactions submitted against one privately-deployed
/// contract, in the order the Coordinator received them.
#[derive(Default)]
pub struct ContractQueue {
    order: VecDeque<PrivateTransaction>,
}

impl ContractQueue {
    /// Constructs an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a transaction to the back of the queue.
    pub fn push(&mut self, tx: PrivateTransaction) {
        self.order.push_back(tx);
    }

    /// Removes and returns the transaction with the given id, wherever it
    /// sits in the queue (used once a transaction reaches a terminal
    /// status and leaves the dependency window).
    pub fn remove(&mut self, id: Uuid) -> Option<PrivateTransaction> {
        let index = self.order.iter().position(|tx| tx.id == id)?;
        self.order.remove(index)
    }

    /// Returns a mutable reference to the transaction with the given id.
    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut PrivateTransaction> {
        self.order.iter_mut().find(|tx| tx.id == id)
    }

    /// Iterates the queue in submission order.
    pub fn iter(&self) -> impl Iterator<Item = &PrivateTransaction> {
        self.order.iter()
    }

    /// The number of transactions currently queued for this contract.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the queue has no transactions.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Selects the maximal prefix-respecting batch of fully-attested,
/// ready-to-prepare transactions that may dispatch concurrently: a greedy
/// walk in submission order that skips any transaction whose input or
/// output states have already been claimed earlier in this pass.
///
/// A transaction claims its input/output states as soon as it is queued,
/// whether or not it has finished attestation yet: an earlier, still-
/// gathering transaction must still block a later conflicting one, or
/// dependency order would only hold when endorsements happen to arrive in
/// queue order. It only enters the returned batch once fully attested.
///
/// A transaction skipped this round becomes eligible again once the
/// conflicting transaction ahead of it in the queue is removed (dispatched
/// or reverted), so FIFO order is preserved per state id without ever
/// needing true cycle detection: the queue order itself rules out cycles.
pub fn next_dispatchable(queue: &ContractQueue) -> Vec<Uuid> {
    let mut claimed: HashSet<StateId> = HashSet::new();
    let mut batch = Vec::new();
    for tx in queue.iter() {
        let Some(post) = &tx.post_assembly else { continue };
        let conflicts = post.input_states.iter().any(|id| claimed.contains(id))
            || post.output_states.iter().any(|s| claimed.contains(&s.id));
        if conflicts {
            continue;
        }
        claimed.extend(post.input_states.iter().copied());
        claimed.extend(post.output_states.iter().map(|s| s.id));
        if post.is_fully_attested() {
            batch.push(tx.id);
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptx_types::app::{EthAddress, PostAssembly, State};

    fn attested_tx(inputs: Vec<StateId>, outputs: Vec<StateId>) -> PrivateTransaction {
        let mut tx = PrivateTransaction::new(
            "transfer",
            Some(EthAddress::from_bytes([1u8; 20])),
            "alice@node1",
            serde_json::json!({}),
            None,
        );
        let output_states = outputs
            .into_iter()
            .map(|id| {
                State::minted(
                    id,
                    "schema",
                    EthAddress::from_bytes([1u8; 20]),
                    serde_json::json!({}),
                    "bob@node2",
                    tx.id,
                )
            })
            .collect();
        tx.post_assembly = Some(PostAssembly {
            input_states: inputs,
            output_states,
            attestation_plan: vec![],
            endorsements: vec![],
        });
        tx
    }

    fn unattested_tx() -> PrivateTransaction {
        let mut tx = attested_tx(vec![], vec![]);
        tx.post_assembly.as_mut().unwrap().attestation_plan.push(ptx_types::app::AttestationRequest {
            name: "x".into(),
            kind: ptx_types::app::AttestationKind::Sign,
            algorithm: "ecdsa:secp256k1".into(),
            verifier_type: "sender".into(),
            payload_type: "bytes".into(),
            payload: None,
            parties: vec!["alice@node1".into()],
        });
        tx
    }

    #[test]
    fn independent_transactions_batch_together() {
        let mut queue = ContractQueue::new();
        let a = attested_tx(vec![], vec![StateId::from_bytes([1u8; 32])]);
        let b = attested_tx(vec![], vec![StateId::from_bytes([2u8; 32])]);
        let (a_id, b_id) = (a.id, b.id);
        queue.push(a);
        queue.push(b);
        let batch = next_dispatchable(&queue);
        assert_eq!(batch, vec![a_id, b_id]);
    }

    #[test]
    fn conflicting_transaction_is_skipped_until_the_first_leaves_the_queue() {
        let shared = StateId::from_bytes([7u8; 32]);
        let a = attested_tx(vec![], vec![shared]);
        let b = attested_tx(vec![shared], vec![]);
        let (a_id, b_id) = (a.id, b.id);
        let mut queue = ContractQueue::new();
        queue.push(a);
        queue.push(b);

        let batch = next_dispatchable(&queue);
        assert_eq!(batch, vec![a_id]);

        queue.remove(a_id);
        let batch = next_dispatchable(&queue);
        assert_eq!(batch, vec![b_id]);
    }

    #[test]
    fn unattested_transactions_are_never_selected() {
        let mut queue = ContractQueue::new();
        let tx = unattested_tx();
        let id = tx.id;
        queue.push(tx);
        assert!(next_dispatchable(&queue).is_empty());
        assert_eq!(queue.len(), 1);
        assert!(queue.get_mut(id).is_some());
    }

    #[test]
    fn a_still_gathering_transaction_blocks_a_conflicting_follower_even_though_neither_is_ready() {
        let shared = StateId::from_bytes([8u8; 32]);
        let mut a = unattested_tx();
        a.post_assembly.as_mut().unwrap().output_states.push(State::minted(
            shared,
            "schema",
            EthAddress::from_bytes([1u8; 20]),
            serde_json::json!({}),
            "bob@node2",
            a.id,
        ));
        let b = attested_tx(vec![shared], vec![]);
        let mut queue = ContractQueue::new();
        queue.push(a);
        queue.push(b);

        // b is fully attested but conflicts with a's still-gathering output,
        // so it must not be selected ahead of a.
        assert!(next_dispatchable(&queue).is_empty());
    }
}
