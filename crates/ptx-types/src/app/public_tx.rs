use super::{now_millis, EthAddress, NodeId, VerifierLocator};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A `(signer, nonce)` pair, the unit the PubTM nonce allocator hands out
/// and reclaims.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SignerNonce {
    /// The eth address whose nonce sequence this belongs to.
    pub from: EthAddress,
    /// The allocated nonce.
    pub nonce: u64,
}

/// Gas pricing strategy for a base-ledger submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GasPricing {
    /// Legacy single gas-price model.
    Legacy {
        /// Price in wei, if fixed rather than node-estimated.
        gas_price: Option<u128>,
    },
    /// EIP-1559 base-fee plus tip model.
    Eip1559 {
        /// Max fee per gas, in wei.
        max_fee_per_gas: Option<u128>,
        /// Max priority fee per gas (tip), in wei.
        max_priority_fee_per_gas: Option<u128>,
    },
}

/// One attempt to land a [`PublicTx`] on the base ledger. The orchestrator
/// may create several as gas prices escalate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// The base-ledger transaction hash of this attempt.
    pub tx_hash: super::TxHash,
    /// The gas pricing used for this attempt.
    pub gas_pricing: GasPricing,
    /// Milliseconds since the Unix epoch when this attempt was sent.
    pub submitted_at: u64,
}

/// Terminal outcome PubTM reports back to the Sequencer for a
/// [`PublicTx`], per the `Submit(dbTx) -> Completed(bool)` contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PublicTxOutcome {
    /// Pending; no submission has confirmed yet.
    Pending,
    /// Mined and the receipt reported success.
    Success,
    /// Mined but the receipt reported a revert.
    Reverted,
    /// Suspended by a `dispatchAction`: held in storage but skipped by the
    /// orchestrator's poll loop until resumed.
    Suspended,
}

/// A control message the orchestrator accepts out of band, addressed to a
/// `(signer, nonce)` pair rather than a particular submission attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DispatchAction {
    /// Hold the named public transaction out of the poll loop, leaving its
    /// nonce and submission history untouched.
    Suspend,
    /// Return a previously suspended public transaction to the poll loop.
    Resume,
}

/// A public (base-ledger) transaction queued with the PubTM nonce allocator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicTx {
    /// Unique id for this public transaction (distinct from any
    /// [`crate::app::PrivateTransaction::id`] that binds to it).
    pub id: Uuid,
    /// The signer/nonce pair allocated to this transaction.
    pub signer_nonce: SignerNonce,
    /// Target contract address.
    pub to: EthAddress,
    /// ABI-encoded calldata.
    pub data: Vec<u8>,
    /// Gas limit for the call.
    pub gas_limit: u64,
    /// Current gas pricing strategy.
    pub gas_pricing: GasPricing,
    /// Private transaction ids bound to this public transaction
    /// (usually one, but batched dispatch may bind several).
    pub bindings: Vec<Uuid>,
    /// Submission attempts made so far, oldest first.
    pub submissions: Vec<Submission>,
    /// Current outcome as last observed by the orchestrator.
    pub outcome: PublicTxOutcome,
    /// Milliseconds since the Unix epoch when this public transaction was
    /// created (i.e. when its nonce was assigned).
    pub created_at: u64,
}

impl PublicTx {
    /// Constructs a new, unsubmitted public transaction bound to one
    /// private transaction.
    pub fn new(
        signer_nonce: SignerNonce,
        to: EthAddress,
        data: Vec<u8>,
        gas_limit: u64,
        gas_pricing: GasPricing,
        binding: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            signer_nonce,
            to,
            data,
            gas_limit,
            gas_pricing,
            bindings: vec![binding],
            submissions: Vec::new(),
            outcome: PublicTxOutcome::Pending,
            created_at: now_millis(),
        }
    }

    /// The most recent submission attempt, if any have been made.
    pub fn latest_submission(&self) -> Option<&Submission> {
        self.submissions.last()
    }
}

/// Who is driving dispatch for a [`SequencerRecord`]'s contract: the node
/// that received the submission, or a remote node it delegated to
///.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SequencerRole {
    /// This node is coordinating dispatch directly.
    Coordinator,
    /// This node delegated coordination to the named remote node.
    Delegated,
}

/// Tracks, per privately-deployed contract, which node is acting as
/// Coordinator and the contention-resolution state behind that choice
///.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequencerRecord {
    /// The contract this record governs.
    pub contract_address: EthAddress,
    /// Coordinator or Delegated for this node's view of the contract.
    pub role: SequencerRole,
    /// The node currently acting as Coordinator (may be this node).
    pub coordinator: NodeId,
    /// Identity locators currently bidding for coordination of this
    /// contract, used as input to the Contention Resolver.
    pub bidders: Vec<VerifierLocator>,
    /// Milliseconds since the Unix epoch when this record was last revised.
    pub updated_at: u64,
}

impl SequencerRecord {
    /// Constructs a record where this node is Coordinator by default (no
    /// contention has been observed yet).
    pub fn local(contract_address: EthAddress, this_node: NodeId) -> Self {
        Self {
            contract_address,
            role: SequencerRole::Coordinator,
            coordinator: this_node,
            bidders: Vec::new(),
            updated_at: now_millis(),
        }
    }

    /// Whether this node is currently the Coordinator for the contract.
    pub fn is_coordinator(&self) -> bool {
        matches!(self.role, SequencerRole::Coordinator)
    }
}
