#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # ptx-rpc
//!
//! The `ptx_*` JSON-RPC surface over HTTP: one axum route per method,
//! backed by the Dispatcher, the public-transaction Orchestrator, and the
//! persistence read model.
//!
//! This crate implements a representative slice of the method table —
//! send, read back, and query the public-transaction ledger — rather than
//! every `ptx_*`/ABI-helper method a full node exposes. See `DESIGN.md`
//! for the scope decision and rationale.

/// Translates subsystem errors into the JSON-RPC error envelope.
pub mod error;
/// Request/response shapes for each implemented method.
pub mod methods;
/// The axum router and handlers.
pub mod server;

pub use error::AppError;
pub use server::{router, AppState};
