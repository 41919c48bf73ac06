//! The versioned, length-prefixed wire envelope: a `u32`
//! big-endian length prefix followed by a JSON-encoded [`Envelope`].
//!
//! JSON was chosen over a binary codec (e.g. `parity-scale-codec`): this
//! protocol crosses permissioned-network node boundaries operated by
//! different organizations, and a self-describing, debuggable wire format
//! matters more here than wire-size efficiency.

use ptx_types::app::NodeId;
use ptx_types::error::TransportError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The current envelope wire version. Bumped whenever the envelope shape
/// changes in a way that is not backward compatible.
pub const ENVELOPE_VERSION: u8 = 1;

/// The kind of message an envelope's `payload` deserializes into.
///
/// Encoded on the wire as the raw `u8` discriminant, not as a
/// string, to keep the envelope header compact and language-agnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Requests an endorsement from a remote party.
    EndorsementRequest = 1,
    /// Responds to an [`MessageType::EndorsementRequest`].
    EndorsementResponse = 2,
    /// Requests that a remote node take over coordination of a contract.
    DelegationRequest = 3,
    /// Acknowledges a [`MessageType::DelegationRequest`], accepting or
    /// declining it.
    DelegationAck = 4,
    /// Reports the terminal outcome of a delegated transaction back to the
    /// delegating node.
    DelegationResult = 5,
}

impl MessageType {
    fn from_u8(value: u8) -> Result<Self, TransportError> {
        match value {
            1 => Ok(Self::EndorsementRequest),
            2 => Ok(Self::EndorsementResponse),
            3 => Ok(Self::DelegationRequest),
            4 => Ok(Self::DelegationAck),
            5 => Ok(Self::DelegationResult),
            other => Err(TransportError::MalformedEnvelope(format!("unknown message type {other}"))),
        }
    }

    /// A short name suitable for metric labels.
    pub fn label(self) -> &'static str {
        match self {
            Self::EndorsementRequest => "endorsement_request",
            Self::EndorsementResponse => "endorsement_response",
            Self::DelegationRequest => "delegation_request",
            Self::DelegationAck => "delegation_ack",
            Self::DelegationResult => "delegation_result",
        }
    }
}

impl Serialize for MessageType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        MessageType::from_u8(value).map_err(serde::de::Error::custom)
    }
}

/// The envelope carried over the wire between two nodes' transports.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    /// The wire format version this envelope was encoded with.
    pub version: u8,
    /// What kind of message `payload` decodes to.
    pub message_type: MessageType,
    /// The sending node.
    pub node: NodeId,
    /// Correlates a response envelope with its originating request.
    pub correlation_id: Uuid,
    /// The JSON-encoded [`crate::message::TransportMessage`] payload.
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Builds an envelope at the current wire version.
    pub fn new(message_type: MessageType, node: NodeId, correlation_id: Uuid, payload: Vec<u8>) -> Self {
        Self { version: ENVELOPE_VERSION, message_type, node, correlation_id, payload }
    }

    /// Encodes this envelope as `u32` big-endian length prefix + JSON body.
    pub fn encode(&self) -> Result<Vec<u8>, TransportError> {
        let body = serde_json::to_vec(self).map_err(|e| TransportError::MalformedEnvelope(e.to_string()))?;
        let mut out = Vec::with_capacity(4 + body.len());
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decodes a length-prefixed buffer into an envelope, validating the
    /// wire version.
    pub fn decode(buf: &[u8]) -> Result<Self, TransportError> {
        if buf.len() < 4 {
            return Err(TransportError::MalformedEnvelope("buffer shorter than length prefix".into()));
        }
        let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        let body = buf.get(4..4 + len).ok_or_else(|| {
            TransportError::MalformedEnvelope(format!("declared length {len} exceeds buffer"))
        })?;
        let envelope: Self =
            serde_json::from_slice(body).map_err(|e| TransportError::MalformedEnvelope(e.to_string()))?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(TransportError::UnsupportedVersion(envelope.version));
        }
        Ok(envelope)
    }
}
