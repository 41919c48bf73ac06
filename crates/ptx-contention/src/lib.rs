#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # ptx-contention
//!
//! The Contention Resolver: a pure, deterministic function that
//! every node in the network evaluates identically to pick, without
//! coordination, which bidder becomes Coordinator for a privately-deployed
//! contract when more than one node is willing to coordinate it.
//!
//! Uses weighted rendezvous (highest-random-weight) hashing with 500
//! virtual tokens per bidder, so adding or removing one bidder only
//! reshuffles that bidder's share of contracts rather than every
//! assignment. Ties (vanishingly unlikely with a 64-bit score space, but
//! possible and must still be deterministic) are broken by lexicographic
//! comparison of the bidder's locator string.

/// The resolver function and its scoring internals.
pub mod resolver;

pub use resolver::{resolve, VIRTUAL_TOKENS};
