//! The endorsement and delegation payloads carried inside an
//! [`crate::envelope::Envelope`].

use ptx_types::app::{AttestationRequest, AttestationResult, EthAddress, PrivateTransaction};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One transport message payload, tagged by variant for JSON encoding.
/// `Envelope::message_type` identifies which variant to expect without
/// requiring the receiver to sniff the payload first.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TransportMessage {
    /// Asks a remote party to satisfy one attestation request.
    EndorsementRequest {
        /// The transaction the request belongs to.
        tx_id: Uuid,
        /// The attestation request itself.
        request: AttestationRequest,
    },
    /// Carries a satisfied attestation request back to the requester.
    EndorsementResponse {
        /// The transaction the result belongs to.
        tx_id: Uuid,
        /// The attestation result, or an error message if it could not be
        /// produced.
        result: Result<AttestationResult, String>,
    },
    /// Asks a remote node to take over coordination of a contract's
    /// queued transactions. Carries the full transactions, already
    /// assembled by the delegating node, since the receiving node has no
    /// other way to learn their content.
    DelegationRequest {
        /// The contract being delegated.
        contract_address: EthAddress,
        /// The already-assembled transactions being handed over.
        transactions: Vec<PrivateTransaction>,
    },
    /// Accepts or declines a [`TransportMessage::DelegationRequest`].
    DelegationAck {
        /// The contract the request was for.
        contract_address: EthAddress,
        /// Whether the remote node accepted coordination.
        accepted: bool,
        /// A reason for declining, if `accepted` is `false`.
        reason: Option<String>,
    },
    /// Reports a delegated transaction's terminal outcome back to the node
    /// that delegated it.
    DelegationResult {
        /// The transaction that reached a terminal state.
        tx_id: Uuid,
        /// `true` if dispatched successfully, `false` if reverted.
        success: bool,
        /// The revert reason, if `success` is `false`.
        revert_reason: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delegation_ack_round_trips_through_json() {
        let msg = TransportMessage::DelegationAck {
            contract_address: EthAddress::from_bytes([3u8; 20]),
            accepted: true,
            reason: None,
        };
        let json = serde_json::to_vec(&msg).expect("serialize");
        let back: TransportMessage = serde_json::from_slice(&json).expect("deserialize");
        match back {
            TransportMessage::DelegationAck { accepted, .. } => assert!(accepted),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
