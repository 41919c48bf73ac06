#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # ptx-telemetry
//!
//! Observability infrastructure for the private transaction manager:
//! structured logging initialization, a Prometheus metrics endpoint, and
//! abstract sinks that decouple instrumentation call sites from the metrics
//! backend.

/// A lightweight HTTP server exposing `/metrics`, `/healthz`, and `/readyz`.
pub mod http;
/// The initialization routine for global structured logging.
pub mod init;
/// The concrete implementation of metrics sinks using the `prometheus` crate.
pub mod prometheus;
/// Abstract traits (`*MetricsSink`) defining the contract for metrics reporting.
pub mod sinks;
/// A simple RAII timer for measuring the duration of a scope.
pub mod time;

pub use sinks::{
    error_metrics, pubtx_metrics, rpc_metrics, sequencer_metrics, transport_metrics,
};
