use super::{now_millis, ContractAddress, IdempotencyKey, State, StateId, VerifierLocator};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The per-transaction state machine position, as driven by the Sequencer
///. Transitions are one-directional except for the implicit
/// `any -> Reverted` edge, which every state accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxStatus {
    /// Submitted, not yet initialized against its domain.
    New,
    /// `InitTransaction` returned; resolving `requiredVerifiers`.
    AwaitingVerifiers,
    /// Verifiers resolved; waiting for its turn in the per-Sequencer
    /// assembly lock.
    Assembling,
    /// Assembled; local SIGN attestations are outstanding.
    GatheringSignatures,
    /// Local signatures collected; remote ENDORSE attestations outstanding.
    GatheringEndorsements,
    /// Fully attested; calling `PrepareTransaction`.
    Preparing,
    /// Prepared; handing off to PubTM.
    Dispatching,
    /// PubTM accepted the submission; Domain Context flushed.
    Dispatched,
    /// Coordination has been handed to a remote node; awaiting its result.
    Delegating,
    /// This node *is* the remote coordinator for a delegated transaction.
    Delegated,
    /// Terminal failure; see the carried error code for the reason.
    Reverted,
}

impl TxStatus {
    /// Whether this status is terminal (no further transitions are valid).
    pub fn is_terminal(self) -> bool {
        matches!(self, TxStatus::Dispatched | TxStatus::Reverted)
    }
}

/// SIGN is a local signature by the transaction's own signer; ENDORSE is a
/// submit-authorization by a designated third party under the domain's
/// rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttestationKind {
    /// A signature by the transaction's own signer.
    Sign,
    /// A submit-authorization by a designated endorsing party.
    Endorse,
}

/// One verifier a domain's `InitTransaction` requires resolved before
/// assembly, e.g. `{lookup: "alice@node1", algorithm: "ecdsa:secp256k1"}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerifierRequest {
    /// Identity locator to resolve.
    pub lookup: VerifierLocator,
    /// Signing/verification algorithm the resolved verifier must support.
    pub algorithm: String,
    /// Domain-defined verifier type (e.g. `"notary"`, `"sender"`).
    pub verifier_type: String,
}

/// A resolved verifier: identity locator plus the concrete algorithm and
/// verifier string (e.g. a public key or eth address) the Identity Resolver
/// returned for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerifierRef {
    /// Identity locator that was resolved.
    pub lookup: VerifierLocator,
    /// The algorithm the resolved verifier uses.
    pub algorithm: String,
    /// The resolved verifier material (opaque to PTM; domain-interpreted).
    pub verifier: String,
}

/// One attestation a domain's attestation plan requires before dispatch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttestationRequest {
    /// A plan-unique name, used to match requests to results.
    pub name: String,
    /// SIGN or ENDORSE.
    pub kind: AttestationKind,
    /// Signing/verification algorithm.
    pub algorithm: String,
    /// Domain-defined verifier type.
    pub verifier_type: String,
    /// The type of the payload to be signed/endorsed (domain-defined).
    pub payload_type: String,
    /// The payload to be signed/endorsed, once assembled.
    pub payload: Option<Vec<u8>>,
    /// Identity locators of parties who may satisfy this request.
    pub parties: Vec<VerifierLocator>,
}

/// A satisfied [`AttestationRequest`]: the signature or endorsement bytes
/// from one authorized party.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttestationResult {
    /// Matches [`AttestationRequest::name`].
    pub name: String,
    /// SIGN or ENDORSE.
    pub kind: AttestationKind,
    /// The party that produced this result.
    pub verifier: VerifierRef,
    /// Signature or endorsement bytes.
    pub payload: Vec<u8>,
}

/// The verifiers a domain's `InitTransaction` asked PTM to resolve, and the
/// results of doing so.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PreAssembly {
    /// Verifier requests from `InitTransaction`.
    pub required_verifiers: Vec<VerifierRequest>,
    /// Resolved verifiers, matched 1:1 with `required_verifiers` once the
    /// Identity Resolver has answered all of them.
    pub resolved_verifiers: Vec<VerifierRef>,
}

/// The product of `AssembleTransaction`: the states consumed and produced,
/// and the attestation plan that must be satisfied before dispatch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PostAssembly {
    /// States this transaction consumes.
    pub input_states: Vec<StateId>,
    /// States this transaction will mint, pending dispatch.
    pub output_states: Vec<State>,
    /// Attestations required before this transaction may be prepared.
    pub attestation_plan: Vec<AttestationRequest>,
    /// Attestations collected so far.
    pub endorsements: Vec<AttestationResult>,
}

impl PostAssembly {
    /// Invariant 4: every request in the plan has a matching result from an
    /// authorized party.
    pub fn is_fully_attested(&self) -> bool {
        self.attestation_plan.iter().all(|req| {
            self.endorsements
                .iter()
                .any(|res| res.name == req.name && req.parties.contains(&res.verifier.lookup))
        })
    }

    /// Records a result, replacing any earlier result with the same name and
    /// party (endorsers are allowed to resend identical responses per the
    /// transport's idempotency rule).
    pub fn record_endorsement(&mut self, result: AttestationResult) {
        self.endorsements
            .retain(|existing| !(existing.name == result.name && existing.verifier.lookup == result.verifier.lookup));
        self.endorsements.push(result);
    }
}

/// The base-ledger call produced by `PrepareTransaction`, ready for PubTM.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreparedPublicTransaction {
    /// Target contract address on the base ledger.
    pub to: ContractAddress,
    /// ABI function name (for logging/decoding; the actual call is in `data`).
    pub function: String,
    /// ABI-encoded calldata.
    pub data: Vec<u8>,
    /// Identity locator of the signer that must sign the base-ledger tx.
    pub signer: VerifierLocator,
}

/// A private transaction as it moves through the PTM pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrivateTransaction {
    /// Globally unique transaction id.
    pub id: Uuid,
    /// The domain plugin that owns this transaction's semantics.
    pub domain: String,
    /// The privately-deployed contract this transaction targets. `None`
    /// until a deploy transaction has assigned one.
    pub contract_address: Option<ContractAddress>,
    /// Identity locator of the submitter.
    pub from: VerifierLocator,
    /// Domain-opaque call inputs.
    pub inputs: serde_json::Value,
    /// Caller-supplied dedupe key.
    pub idempotency_key: Option<IdempotencyKey>,
    /// Results of `InitTransaction` and verifier resolution.
    pub pre_assembly: Option<PreAssembly>,
    /// Results of `AssembleTransaction` and the gather protocol.
    pub post_assembly: Option<PostAssembly>,
    /// The call produced by `PrepareTransaction`, once prepared.
    pub prepared_public_transaction: Option<PreparedPublicTransaction>,
    /// Resolved eth-address signer, once known.
    pub signer: Option<super::EthAddress>,
    /// Current state-machine position.
    pub status: TxStatus,
    /// Milliseconds since the Unix epoch when this transaction was submitted.
    pub created_at: u64,
    /// A stable error code, set only when `status == Reverted`.
    pub revert_reason: Option<String>,
}

impl PrivateTransaction {
    /// Constructs a freshly-submitted transaction in the `New` state.
    pub fn new(
        domain: impl Into<String>,
        contract_address: Option<ContractAddress>,
        from: impl Into<String>,
        inputs: serde_json::Value,
        idempotency_key: Option<IdempotencyKey>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            domain: domain.into(),
            contract_address,
            from: from.into(),
            inputs,
            idempotency_key,
            pre_assembly: None,
            post_assembly: None,
            prepared_public_transaction: None,
            signer: None,
            status: TxStatus::New,
            created_at: now_millis(),
            revert_reason: None,
        }
    }

    /// The input state ids this transaction depends on, once assembled.
    pub fn input_state_ids(&self) -> &[StateId] {
        self.post_assembly
            .as_ref()
            .map(|pa| pa.input_states.as_slice())
            .unwrap_or(&[])
    }
}
