//! A reference domain: a single-owner fungible-token transfer, used by the
//! test suite and by `ptx-node`'s local development mode in place of a real
//! plugin.

use crate::domain::Domain;
use async_trait::async_trait;
use ptx_crypto::address::keccak256;
use ptx_types::app::{
    now_millis, AttestationKind, AttestationRequest, AttestationResult, PostAssembly, PreAssembly,
    PreparedPublicTransaction, PrivateTransaction, State, StateId, VerifierRef, VerifierRequest,
};
use ptx_types::error::DomainError;
use serde::Deserialize;

#[derive(Deserialize)]
struct TransferInputs {
    to: String,
    amount: String,
    #[serde(default)]
    input_states: Vec<StateId>,
}

/// A single-owner transfer domain: consumes zero or more input states and
/// mints exactly one output state owned by the recipient, requiring a
/// domain-notarized endorsement before dispatch.
pub struct SimpleTransferDomain {
    name: String,
    schema_id: String,
    notary_lookup: String,
}

impl SimpleTransferDomain {
    /// Constructs a transfer domain registered under `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            notary_lookup: format!("domain:{name}"),
            schema_id: format!("{name}.balance"),
            name,
        }
    }

    fn parse_inputs(&self, tx: &PrivateTransaction) -> Result<TransferInputs, DomainError> {
        serde_json::from_value(tx.inputs.clone()).map_err(|e| DomainError::MalformedResponse {
            call: "init_transaction",
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl Domain for SimpleTransferDomain {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init_transaction(&self, tx: &PrivateTransaction) -> Result<PreAssembly, DomainError> {
        self.parse_inputs(tx)?;
        Ok(PreAssembly {
            required_verifiers: vec![VerifierRequest {
                lookup: tx.from.clone(),
                algorithm: "ecdsa:secp256k1".into(),
                verifier_type: "sender".into(),
            }],
            resolved_verifiers: Vec::new(),
        })
    }

    async fn assemble_transaction(
        &self,
        tx: &PrivateTransaction,
        pre_assembly: &PreAssembly,
    ) -> Result<PostAssembly, DomainError> {
        let inputs = self.parse_inputs(tx)?;
        let contract_address = tx.contract_address.ok_or_else(|| DomainError::CallFailed {
            call: "assemble_transaction",
            reason: "transfer requires a deployed contract address".into(),
        })?;

        let output_id_seed = keccak256(
            format!("{}:{}:{}:{}", tx.id, inputs.to, inputs.amount, now_millis()).as_bytes(),
        );
        let output = State::minted(
            StateId::from_bytes(output_id_seed),
            self.schema_id.clone(),
            contract_address,
            serde_json::json!({ "owner": inputs.to, "amount": inputs.amount }),
            inputs.to.clone(),
            tx.id,
        );

        let sender_verifier = pre_assembly
            .resolved_verifiers
            .iter()
            .find(|v| v.lookup == tx.from)
            .ok_or_else(|| DomainError::CallFailed {
                call: "assemble_transaction",
                reason: format!("sender verifier for {} not resolved", tx.from),
            })?;

        let plan_payload = output.id.as_bytes().to_vec();
        Ok(PostAssembly {
            input_states: inputs.input_states,
            output_states: vec![output],
            attestation_plan: vec![
                AttestationRequest {
                    name: "sender-sig".into(),
                    kind: AttestationKind::Sign,
                    algorithm: sender_verifier.algorithm.clone(),
                    verifier_type: "sender".into(),
                    payload_type: "state-commitment".into(),
                    payload: Some(plan_payload.clone()),
                    parties: vec![tx.from.clone()],
                },
                AttestationRequest {
                    name: "notary-endorsement".into(),
                    kind: AttestationKind::Endorse,
                    algorithm: "domain-notary".into(),
                    verifier_type: "notary".into(),
                    payload_type: "state-commitment".into(),
                    payload: Some(plan_payload),
                    parties: vec![self.notary_lookup.clone()],
                },
            ],
            endorsements: Vec::new(),
        })
    }

    async fn endorse_transaction(
        &self,
        _tx: &PrivateTransaction,
        _post_assembly: &PostAssembly,
        request: &AttestationRequest,
    ) -> Result<AttestationResult, DomainError> {
        if request.kind != AttestationKind::Endorse || request.name != "notary-endorsement" {
            return Err(DomainError::CallFailed {
                call: "endorse_transaction",
                reason: format!("domain does not endorse request '{}'", request.name),
            });
        }
        let payload = request.payload.clone().unwrap_or_default();
        Ok(AttestationResult {
            name: request.name.clone(),
            kind: AttestationKind::Endorse,
            verifier: VerifierRef {
                lookup: self.notary_lookup.clone(),
                algorithm: "domain-notary".into(),
                verifier: self.notary_lookup.clone(),
            },
            payload: keccak256(&payload).to_vec(),
        })
    }

    async fn prepare_transaction(
        &self,
        tx: &PrivateTransaction,
        post_assembly: &PostAssembly,
    ) -> Result<PreparedPublicTransaction, DomainError> {
        if !post_assembly.is_fully_attested() {
            return Err(DomainError::CallFailed {
                call: "prepare_transaction",
                reason: "attestation plan is not fully satisfied".into(),
            });
        }
        let contract_address = tx.contract_address.ok_or_else(|| DomainError::CallFailed {
            call: "prepare_transaction",
            reason: "transfer requires a deployed contract address".into(),
        })?;
        let params = serde_json::json!({
            "outputs": post_assembly.output_states.iter().map(|s| s.id.to_string()).collect::<Vec<_>>(),
            "inputs": post_assembly.input_states.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
        });
        Ok(PreparedPublicTransaction {
            to: contract_address,
            function: "transfer".into(),
            data: serde_json::to_vec(&params).map_err(|e| DomainError::CallFailed {
                call: "prepare_transaction",
                reason: e.to_string(),
            })?,
            signer: tx.from.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptx_types::app::{EthAddress, VerifierRef};

    fn sample_tx() -> PrivateTransaction {
        let mut tx = PrivateTransaction::new(
            "transfer",
            Some(EthAddress::from_bytes([1u8; 20])),
            "alice@node1",
            serde_json::json!({"to": "bob@node2", "amount": "10", "inputStates": []}),
            None,
        );
        tx.pre_assembly = None;
        tx
    }

    #[tokio::test]
    async fn init_requests_the_sender_as_a_verifier() {
        let domain = SimpleTransferDomain::new("transfer");
        let tx = sample_tx();
        let pre = domain.init_transaction(&tx).await.expect("init should succeed");
        assert_eq!(pre.required_verifiers.len(), 1);
        assert_eq!(pre.required_verifiers[0].lookup, "alice@node1");
    }

    #[tokio::test]
    async fn assemble_requires_resolved_sender_verifier() {
        let domain = SimpleTransferDomain::new("transfer");
        let tx = sample_tx();
        let pre = PreAssembly {
            required_verifiers: vec![],
            resolved_verifiers: vec![],
        };
        let result = domain.assemble_transaction(&tx, &pre).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn full_lifecycle_produces_a_prepared_transaction() {
        let domain = SimpleTransferDomain::new("transfer");
        let tx = sample_tx();
        let pre = PreAssembly {
            required_verifiers: vec![],
            resolved_verifiers: vec![VerifierRef {
                lookup: "alice@node1".into(),
                algorithm: "ecdsa:secp256k1".into(),
                verifier: "0xabc".into(),
            }],
        };
        let mut post = domain.assemble_transaction(&tx, &pre).await.expect("assemble should succeed");
        assert_eq!(post.output_states.len(), 1);
        assert_eq!(post.attestation_plan.len(), 2);

        post.record_endorsement(AttestationResult {
            name: "sender-sig".into(),
            kind: AttestationKind::Sign,
            verifier: VerifierRef {
                lookup: "alice@node1".into(),
                algorithm: "ecdsa:secp256k1".into(),
                verifier: "0xabc".into(),
            },
            payload: vec![1, 2, 3],
        });
        let notary_request = post
            .attestation_plan
            .iter()
            .find(|r| r.name == "notary-endorsement")
            .expect("notary request present");
        let endorsement = domain
            .endorse_transaction(&tx, &post, notary_request)
            .await
            .expect("endorse should succeed");
        post.record_endorsement(endorsement);
        assert!(post.is_fully_attested());

        let prepared = domain.prepare_transaction(&tx, &post).await.expect("prepare should succeed");
        assert_eq!(prepared.function, "transfer");
        assert_eq!(prepared.signer, "alice@node1");
    }
}
