#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # ptx-transport
//!
//! The Endorsement Transport Protocol: a length-prefixed,
//! versioned envelope carrying endorsement and delegation messages between
//! nodes in the permissioned network.
//!
//! The production transport (mutual-TLS peer connections, a message queue,
//! or a gossip layer) is an out-of-scope external collaborator.
//! This crate defines the wire envelope, the message payloads carried in
//! it, and the [`Transport`] trait a production transport implements,
//! shipping an [`InMemoryTransport`] for tests and single-process
//! multi-node simulation.

/// The versioned, length-prefixed wire envelope.
pub mod envelope;
/// In-memory transport for tests and single-process simulation.
pub mod memory;
/// The endorsement and delegation message payloads carried in an envelope.
pub mod message;
/// The `Transport` trait.
pub mod transport;

pub use envelope::{Envelope, MessageType, ENVELOPE_VERSION};
pub use memory::InMemoryTransport;
pub use message::TransportMessage;
pub use transport::{Transport, TransportError};
