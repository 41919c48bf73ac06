#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # ptx-sequencer
//!
//! The per-contract Sequencer/Coordinator state machine:
//! drives a [`ptx_types::app::PrivateTransaction`] from submission through
//! domain init, verifier resolution, assembly, attestation gathering, and
//! preparation, then hands a [`ptx_types::app::PreparedPublicTransaction`]
//! to the public transaction manager.
//!
//! Also owns the Dispatcher's two supporting pieces: the per-contract
//! dependency queue that decides which assembled transactions may dispatch
//! concurrently, and the [`ptx_contention`]-backed
//! registry that decides, per contract, whether this node is Coordinator or
//! has delegated to a remote one.

/// Attestation gathering: local signing, local/remote endorsement.
pub mod attest;
/// The Dispatcher: ties the state machine, queue, and registry together.
pub mod dispatcher;
/// The per-contract dependency queue and dispatch-batch selection.
pub mod queue;
/// The per-contract Coordinator/Delegated registry.
pub mod record;

pub use dispatcher::{DispatchSink, Dispatcher};
pub use queue::{next_dispatchable, ContractQueue};
pub use record::SequencerRegistry;
