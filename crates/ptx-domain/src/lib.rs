#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # ptx-domain
//!
//! The Domain plugin interface: the four lifecycle calls a
//! domain implements to give meaning to an otherwise opaque
//! [`ptx_types::app::PrivateTransaction`].
//!
//! Production domain plugins (token implementations, state-transition
//! logic for a given privacy scheme, and so on) are out-of-scope external
//! collaborators. This crate defines the trait they implement
//! and ships a [`reference::SimpleTransferDomain`] used by the test suite
//! and by `ptx-node`'s local development mode.

/// The `Domain` trait and an in-memory registry of loaded domains.
pub mod domain;
/// A reference single-owner-transfer domain implementation, for tests.
pub mod reference;

pub use domain::{Domain, DomainRegistry};
pub use reference::SimpleTransferDomain;
