#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # ptx-pubtx
//!
//! The public transaction manager: a per-signer nonce
//! allocator, a gas-pricing escalation policy, and an [`orchestrator::Orchestrator`]
//! that implements [`ptx_sequencer::dispatcher::DispatchSink`], turning each
//! prepared call handed off by the Sequencer into a nonce-ordered base-ledger
//! submission.
//!
//! The Ethereum RPC client and Block Indexer are out-of-scope external
//! collaborators: [`rpc::EthRpcClient`] is the trait a production
//! build backs with both, with [`rpc::MockEthRpcClient`] shipped as a
//! reference implementation for tests and single-node development.

/// Gas-pricing escalation policy.
pub mod gas;
/// The per-signer nonce allocator.
pub mod nonce;
/// The per-signer Orchestrator loop.
pub mod orchestrator;
/// The `EthRpcClient` trait and its in-memory reference implementation.
pub mod rpc;

pub use gas::GasPriceConfig;
pub use nonce::NonceAllocator;
pub use orchestrator::Orchestrator;
pub use rpc::{EthRpcClient, GasEstimate, MockEthRpcClient};
