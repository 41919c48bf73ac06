#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # ptx-persistence
//!
//! The persistence boundary's two-phase `Submit(dbTx) -> Completed(bool)`
//! contract: callers stage a batch of writes and get back a
//! handle that resolves once the backing store durably commits or rejects
//! them, rather than blocking the caller on disk I/O.
//!
//! The production store is an out-of-scope external collaborator. This
//! crate defines the [`Persistence`] trait and the
//! [`Operation`] batch it accepts, plus an [`InMemoryPersistence`]
//! reference implementation used by tests and by `ptx-node`'s local
//! development mode.

/// The write operations a persistence batch may contain.
pub mod operation;
/// The `Persistence` trait.
pub mod persistence;
/// An in-memory reference implementation.
pub mod memory;

pub use memory::InMemoryPersistence;
pub use operation::Operation;
pub use persistence::{Persistence, PersistenceQuery};
pub use ptx_types::error::PersistenceError;
