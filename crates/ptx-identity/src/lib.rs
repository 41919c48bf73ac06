#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # ptx-identity
//!
//! The Identity Resolver interface: turns a
//! [`ptx_types::app::VerifierLocator`] like `"alice@node1"` into a concrete
//! verifier (algorithm and key material, opaque to PTM).
//!
//! The production resolver is an out-of-scope external collaborator,
//! typically backed by a directory service or a node's own identity
//! registry. This crate defines the trait it implements and a
//! [`LocalIdentityRegistry`] reference implementation for tests and
//! single-node development.

/// The `IdentityResolver` trait.
pub mod resolver;

pub use resolver::{IdentityResolver, LocalIdentityRegistry};
