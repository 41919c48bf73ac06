#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # ptx-types
//!
//! Foundational data structures and error types for the private transaction
//! manager (PTM) and public transaction manager (PubTM).
//!
//! ## Architectural role
//!
//! As the base crate, `ptx-types` has minimal dependencies and is itself a
//! dependency of almost every other crate in the workspace. This prevents
//! circular dependencies and gives every subsystem a single, canonical
//! definition of shared types like [`app::PrivateTransaction`],
//! [`app::PublicTx`], and [`app::State`].

/// The maximum size in bytes for a single state's JSON `data` payload.
pub const MAX_STATE_DATA_BYTES: usize = 256 * 1024;

/// A crate-wide `Result` alias. Individual subsystems generally define their
/// own error enum and use `Result<T, TheirError>` directly; this alias exists
/// for call sites that only need the common [`error::PtxError`] wrapper.
pub type Result<T, E = error::PtxError> = std::result::Result<T, E>;

/// Core application-level data structures: transactions, states, attestations.
pub mod app;
/// The unified error taxonomy, with a stable string code per variant.
pub mod error;
/// A small set of commonly used extension traits.
pub mod prelude;
