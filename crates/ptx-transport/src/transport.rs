//! The `Transport` trait, standing in for the out-of-scope production
//! transport.

use crate::envelope::Envelope;
use async_trait::async_trait;
use ptx_types::app::NodeId;
pub use ptx_types::error::TransportError;

/// Sends and receives [`Envelope`]s between nodes. A production
/// implementation would carry these over mutually authenticated
/// connections between permissioned-network participants; this trait is
/// deliberately transport-agnostic so the Sequencer and PubTM orchestrator
/// never depend on the concrete wire mechanism.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `envelope` to `node`, returning once it has been handed off
    /// (not necessarily once the peer has processed it).
    async fn send(&self, node: &NodeId, envelope: Envelope) -> Result<(), TransportError>;

    /// Receives the next envelope addressed to this node, waiting if none
    /// is yet available.
    async fn recv(&self) -> Option<Envelope>;
}
