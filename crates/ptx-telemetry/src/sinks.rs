//! Abstract traits for metrics reporting, decoupling PTM subsystems from the
//! metrics backend (per-subsystem sinks composed into one [`MetricsSink`]).

use once_cell::sync::OnceCell;

/// A no-op sink for tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global [`MetricsSink`]
/// implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns the configured error metrics sink, or a no-op sink if none has
/// been installed.
pub fn error_metrics() -> &'static dyn ErrorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns the configured sequencer metrics sink, or a no-op sink.
pub fn sequencer_metrics() -> &'static dyn SequencerMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns the configured public transaction manager metrics sink, or a
/// no-op sink.
pub fn pubtx_metrics() -> &'static dyn PubTxMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns the configured transport metrics sink, or a no-op sink.
pub fn transport_metrics() -> &'static dyn TransportMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns the configured RPC metrics sink, or a no-op sink.
pub fn rpc_metrics() -> &'static dyn RpcMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Metrics for the per-contract Sequencer/Coordinator state machine.
pub trait SequencerMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter of transactions entering a given [`TxStatus`]
    /// value (passed as its string name to keep this trait decoupled from
    /// `ptx-types`).
    fn inc_tx_status_transition(&self, status: &str);
    /// Sets the gauge for the number of transactions currently assembling
    /// or gathering attestations for one contract.
    fn set_inflight_transactions(&self, contract: &str, count: f64);
    /// Increments a counter for contention-resolver runs, labeled by
    /// whether this node won coordination.
    fn inc_contention_resolution(&self, won: bool);
    /// Increments a counter for delegation attempts, labeled by outcome.
    fn inc_delegation(&self, outcome: &str);
    /// Observes the wall-clock duration of one assembly-to-dispatch cycle.
    fn observe_dispatch_latency(&self, domain: &str, duration_secs: f64);
}
impl SequencerMetricsSink for NopSink {
    fn inc_tx_status_transition(&self, _status: &str) {}
    fn set_inflight_transactions(&self, _contract: &str, _count: f64) {}
    fn inc_contention_resolution(&self, _won: bool) {}
    fn inc_delegation(&self, _outcome: &str) {}
    fn observe_dispatch_latency(&self, _domain: &str, _duration_secs: f64) {}
}

/// Metrics for the public transaction manager's nonce allocator and
/// orchestrator loop.
pub trait PubTxMetricsSink: Send + Sync + std::fmt::Debug {
    /// Sets the gauge for the number of nonces currently assigned (ready +
    /// future) for a given signer.
    fn set_assigned_nonces(&self, signer: &str, count: f64);
    /// Increments a counter of base-ledger submissions, labeled by signer
    /// and outcome (`"success"`, `"reverted"`, `"rpc_error"`).
    fn inc_submission(&self, signer: &str, outcome: &str);
    /// Increments a counter of gas price escalations for one signer.
    fn inc_gas_escalation(&self, signer: &str);
    /// Observes the latency from nonce assignment to confirmation.
    fn observe_confirmation_latency(&self, duration_secs: f64);
}
impl PubTxMetricsSink for NopSink {
    fn set_assigned_nonces(&self, _signer: &str, _count: f64) {}
    fn inc_submission(&self, _signer: &str, _outcome: &str) {}
    fn inc_gas_escalation(&self, _signer: &str) {}
    fn observe_confirmation_latency(&self, _duration_secs: f64) {}
}

/// Metrics for the Endorsement Transport Protocol.
pub trait TransportMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter of envelopes sent, labeled by message type.
    fn inc_envelopes_sent(&self, message_type: &str);
    /// Increments a counter of envelopes received, labeled by message type.
    fn inc_envelopes_received(&self, message_type: &str);
    /// Increments a counter of transport-level send failures per peer node.
    fn inc_send_failure(&self, node: &str);
    /// Observes the round-trip latency of a request/response exchange.
    fn observe_round_trip(&self, message_type: &str, duration_secs: f64);
}
impl TransportMetricsSink for NopSink {
    fn inc_envelopes_sent(&self, _message_type: &str) {}
    fn inc_envelopes_received(&self, _message_type: &str) {}
    fn inc_send_failure(&self, _node: &str) {}
    fn observe_round_trip(&self, _message_type: &str, _duration_secs: f64) {}
}

/// Metrics for the JSON-RPC surface.
pub trait RpcMetricsSink: Send + Sync + std::fmt::Debug {
    /// Observes the latency of a JSON-RPC call, labeled by method.
    fn observe_request_duration(&self, method: &str, duration_secs: f64);
    /// Increments a counter for total JSON-RPC calls, labeled by method and
    /// whether the call returned an error.
    fn inc_requests_total(&self, method: &str, is_error: bool);
}
impl RpcMetricsSink for NopSink {
    fn observe_request_duration(&self, _method: &str, _duration_secs: f64) {}
    fn inc_requests_total(&self, _method: &str, _is_error: bool) {}
}

/// A sink for recording structured error metrics, keyed by the stable
/// `ErrorCode` taxonomy in `ptx-types`.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a specific error, categorized by subsystem
    /// kind and stable error code.
    fn inc_error(&self, kind: &'static str, code: &'static str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _kind: &'static str, _code: &'static str) {}
}

/// A unified sink implementing every domain-specific trait, giving a single
/// implementation point for a metrics backend such as Prometheus.
pub trait MetricsSink:
    SequencerMetricsSink + PubTxMetricsSink + TransportMetricsSink + RpcMetricsSink + ErrorMetricsSink
{
}

impl<T> MetricsSink for T where
    T: SequencerMetricsSink
        + PubTxMetricsSink
        + TransportMetricsSink
        + RpcMetricsSink
        + ErrorMetricsSink
{
}
