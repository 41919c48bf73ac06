//! An in-memory [`Transport`] for tests and single-process multi-node
//! simulation: a [`Network`] of mpsc channels keyed by node id.

use crate::envelope::Envelope;
use crate::transport::{Transport, TransportError};
use async_trait::async_trait;
use dashmap::DashMap;
use ptx_types::app::NodeId;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// A shared in-memory network that [`InMemoryTransport`]s join to reach
/// each other by [`NodeId`].
#[derive(Clone, Default)]
pub struct Network {
    senders: Arc<DashMap<NodeId, mpsc::UnboundedSender<Envelope>>>,
}

impl Network {
    /// Constructs an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the network as `node`, returning a transport addressed to it.
    /// Joining the same node id twice replaces its inbox.
    pub fn join(&self, node: NodeId) -> InMemoryTransport {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.insert(node.clone(), tx);
        InMemoryTransport { node, senders: self.senders.clone(), receiver: Mutex::new(rx) }
    }
}

/// A [`Transport`] backed by an unbounded in-process channel.
pub struct InMemoryTransport {
    node: NodeId,
    senders: Arc<DashMap<NodeId, mpsc::UnboundedSender<Envelope>>>,
    receiver: Mutex<mpsc::UnboundedReceiver<Envelope>>,
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, node: &NodeId, envelope: Envelope) -> Result<(), TransportError> {
        let label = envelope.message_type.label();
        let sender = self
            .senders
            .get(node)
            .ok_or_else(|| TransportError::UnknownNode(node.to_string()))?;
        sender.send(envelope).map_err(|e| TransportError::SendFailed {
            node: node.to_string(),
            reason: e.to_string(),
        })?;
        tracing::debug!(target = "transport", to = %node, message_type = label, "sent envelope");
        ptx_telemetry::transport_metrics().inc_envelopes_sent(label);
        Ok(())
    }

    async fn recv(&self) -> Option<Envelope> {
        let mut receiver = self.receiver.lock().await;
        let envelope = receiver.recv().await;
        if let Some(envelope) = &envelope {
            ptx_telemetry::transport_metrics().inc_envelopes_received(envelope.message_type.label());
        }
        envelope
    }
}

impl InMemoryTransport {
    /// This transport's own node id.
    pub fn node_id(&self) -> &NodeId {
        &self.node
    }
}
