#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # ptx-crypto
//!
//! Secp256k1 signing and address derivation for the private transaction
//! manager.
//!
//! The production Key Manager is an out-of-scope external collaborator:
//! this crate defines the [`Signer`] trait it must satisfy and
//! ships a [`LocalSigner`] reference implementation suitable for tests and
//! single-node development, not a production key-custody backend.

/// Eth-style address derivation from a public key.
pub mod address;
/// The crypto error taxonomy.
pub mod error;
/// The `Signer` trait and its in-memory reference implementation.
pub mod signer;

pub use address::keccak256;
pub use error::CryptoError;
pub use signer::{LocalSigner, Signer};
