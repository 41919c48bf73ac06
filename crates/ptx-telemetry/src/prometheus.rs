//! A concrete implementation of the metrics sinks using the `prometheus` crate.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_gauge_vec, register_histogram, register_histogram_vec,
    register_int_counter_vec, GaugeVec, Histogram, HistogramVec, IntCounterVec,
};

static INFLIGHT_TRANSACTIONS: OnceCell<GaugeVec> = OnceCell::new();
static TX_STATUS_TRANSITIONS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static CONTENTION_RESOLUTIONS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static DELEGATIONS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static DISPATCH_LATENCY_SECONDS: OnceCell<HistogramVec> = OnceCell::new();

static ASSIGNED_NONCES: OnceCell<GaugeVec> = OnceCell::new();
static SUBMISSIONS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static GAS_ESCALATIONS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static CONFIRMATION_LATENCY_SECONDS: OnceCell<Histogram> = OnceCell::new();

static ENVELOPES_SENT_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static ENVELOPES_RECEIVED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static SEND_FAILURES_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static ROUND_TRIP_SECONDS: OnceCell<HistogramVec> = OnceCell::new();

static RPC_REQUEST_DURATION_SECONDS: OnceCell<HistogramVec> = OnceCell::new();
static RPC_REQUESTS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

static ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

/// The Prometheus-backed [`MetricsSink`] implementation.
#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

/// Fetches a registered collector, panicking if `install()` was never
/// called. This is a setup error, not a runtime condition, so a panic here
/// is intentional.
macro_rules! get_metric {
    ($metric:ident) => {
        $metric
            .get()
            .expect("prometheus sink not initialized: call ptx_telemetry::prometheus::install() first")
    };
}

impl SequencerMetricsSink for PrometheusSink {
    fn inc_tx_status_transition(&self, status: &str) {
        get_metric!(TX_STATUS_TRANSITIONS_TOTAL)
            .with_label_values(&[status])
            .inc();
    }
    fn set_inflight_transactions(&self, contract: &str, count: f64) {
        get_metric!(INFLIGHT_TRANSACTIONS)
            .with_label_values(&[contract])
            .set(count);
    }
    fn inc_contention_resolution(&self, won: bool) {
        get_metric!(CONTENTION_RESOLUTIONS_TOTAL)
            .with_label_values(&[if won { "won" } else { "lost" }])
            .inc();
    }
    fn inc_delegation(&self, outcome: &str) {
        get_metric!(DELEGATIONS_TOTAL).with_label_values(&[outcome]).inc();
    }
    fn observe_dispatch_latency(&self, domain: &str, duration_secs: f64) {
        get_metric!(DISPATCH_LATENCY_SECONDS)
            .with_label_values(&[domain])
            .observe(duration_secs);
    }
}

impl PubTxMetricsSink for PrometheusSink {
    fn set_assigned_nonces(&self, signer: &str, count: f64) {
        get_metric!(ASSIGNED_NONCES).with_label_values(&[signer]).set(count);
    }
    fn inc_submission(&self, signer: &str, outcome: &str) {
        get_metric!(SUBMISSIONS_TOTAL)
            .with_label_values(&[signer, outcome])
            .inc();
    }
    fn inc_gas_escalation(&self, signer: &str) {
        get_metric!(GAS_ESCALATIONS_TOTAL).with_label_values(&[signer]).inc();
    }
    fn observe_confirmation_latency(&self, duration_secs: f64) {
        get_metric!(CONFIRMATION_LATENCY_SECONDS).observe(duration_secs);
    }
}

impl TransportMetricsSink for PrometheusSink {
    fn inc_envelopes_sent(&self, message_type: &str) {
        get_metric!(ENVELOPES_SENT_TOTAL)
            .with_label_values(&[message_type])
            .inc();
    }
    fn inc_envelopes_received(&self, message_type: &str) {
        get_metric!(ENVELOPES_RECEIVED_TOTAL)
            .with_label_values(&[message_type])
            .inc();
    }
    fn inc_send_failure(&self, node: &str) {
        get_metric!(SEND_FAILURES_TOTAL).with_label_values(&[node]).inc();
    }
    fn observe_round_trip(&self, message_type: &str, duration_secs: f64) {
        get_metric!(ROUND_TRIP_SECONDS)
            .with_label_values(&[message_type])
            .observe(duration_secs);
    }
}

impl RpcMetricsSink for PrometheusSink {
    fn observe_request_duration(&self, method: &str, duration_secs: f64) {
        get_metric!(RPC_REQUEST_DURATION_SECONDS)
            .with_label_values(&[method])
            .observe(duration_secs);
    }
    fn inc_requests_total(&self, method: &str, is_error: bool) {
        get_metric!(RPC_REQUESTS_TOTAL)
            .with_label_values(&[method, if is_error { "error" } else { "ok" }])
            .inc();
    }
}

impl ErrorMetricsSink for PrometheusSink {
    fn inc_error(&self, kind: &'static str, code: &'static str) {
        get_metric!(ERRORS_TOTAL).with_label_values(&[kind, code]).inc();
    }
}

/// Registers every PTM metrics collector and returns a static reference to
/// the sink. Must be called exactly once at startup, before any handler
/// runs that reads [`crate::sinks::SINK`].
#[allow(clippy::expect_used)]
pub fn install() -> Result<&'static dyn MetricsSink, prometheus::Error> {
    INFLIGHT_TRANSACTIONS
        .set(register_gauge_vec!(
            "ptx_inflight_transactions",
            "Transactions currently assembling or gathering attestations, by contract.",
            &["contract"]
        )?)
        .expect("static already initialized");
    TX_STATUS_TRANSITIONS_TOTAL
        .set(register_int_counter_vec!(
            "ptx_tx_status_transitions_total",
            "Total transitions into each private transaction status.",
            &["status"]
        )?)
        .expect("static already initialized");
    CONTENTION_RESOLUTIONS_TOTAL
        .set(register_int_counter_vec!(
            "ptx_contention_resolutions_total",
            "Total contention-resolver runs, by whether this node won coordination.",
            &["won"]
        )?)
        .expect("static already initialized");
    DELEGATIONS_TOTAL
        .set(register_int_counter_vec!(
            "ptx_delegations_total",
            "Total delegation attempts, by outcome.",
            &["outcome"]
        )?)
        .expect("static already initialized");
    DISPATCH_LATENCY_SECONDS
        .set(register_histogram_vec!(
            "ptx_dispatch_latency_seconds",
            "Latency from assembly start to dispatch, by domain.",
            &["domain"],
            exponential_buckets(0.01, 2.0, 16)?
        )?)
        .expect("static already initialized");

    ASSIGNED_NONCES
        .set(register_gauge_vec!(
            "ptx_pubtx_assigned_nonces",
            "Currently assigned nonces (ready + future), by signer.",
            &["signer"]
        )?)
        .expect("static already initialized");
    SUBMISSIONS_TOTAL
        .set(register_int_counter_vec!(
            "ptx_pubtx_submissions_total",
            "Total base-ledger submissions, by signer and outcome.",
            &["signer", "outcome"]
        )?)
        .expect("static already initialized");
    GAS_ESCALATIONS_TOTAL
        .set(register_int_counter_vec!(
            "ptx_pubtx_gas_escalations_total",
            "Total gas price escalations, by signer.",
            &["signer"]
        )?)
        .expect("static already initialized");
    CONFIRMATION_LATENCY_SECONDS
        .set(register_histogram!(
            "ptx_pubtx_confirmation_latency_seconds",
            "Latency from nonce assignment to confirmed receipt.",
            exponential_buckets(0.05, 2.0, 18)?
        )?)
        .expect("static already initialized");

    ENVELOPES_SENT_TOTAL
        .set(register_int_counter_vec!(
            "ptx_transport_envelopes_sent_total",
            "Total transport envelopes sent, by message type.",
            &["message_type"]
        )?)
        .expect("static already initialized");
    ENVELOPES_RECEIVED_TOTAL
        .set(register_int_counter_vec!(
            "ptx_transport_envelopes_received_total",
            "Total transport envelopes received, by message type.",
            &["message_type"]
        )?)
        .expect("static already initialized");
    SEND_FAILURES_TOTAL
        .set(register_int_counter_vec!(
            "ptx_transport_send_failures_total",
            "Total send failures, by destination node.",
            &["node"]
        )?)
        .expect("static already initialized");
    ROUND_TRIP_SECONDS
        .set(register_histogram_vec!(
            "ptx_transport_round_trip_seconds",
            "Round-trip latency of a request/response exchange, by message type.",
            &["message_type"],
            exponential_buckets(0.005, 2.0, 16)?
        )?)
        .expect("static already initialized");

    RPC_REQUEST_DURATION_SECONDS
        .set(register_histogram_vec!(
            "ptx_rpc_request_duration_seconds",
            "Latency of JSON-RPC calls, by method.",
            &["method"],
            exponential_buckets(0.001, 2.0, 15)?
        )?)
        .expect("static already initialized");
    RPC_REQUESTS_TOTAL
        .set(register_int_counter_vec!(
            "ptx_rpc_requests_total",
            "Total JSON-RPC calls, by method and status.",
            &["method", "status"]
        )?)
        .expect("static already initialized");

    ERRORS_TOTAL
        .set(register_int_counter_vec!(
            "ptx_errors_total",
            "Total errors, by subsystem kind and stable error code.",
            &["kind", "code"]
        )?)
        .expect("static already initialized");

    static SINK: PrometheusSink = PrometheusSink;
    Ok(&SINK)
}
