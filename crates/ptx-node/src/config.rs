//! The node's TOML configuration: one section per collaborator, named
//! after the fields a production deployment tunes.

use ptx_pubtx::GasPriceConfig;
use serde::Deserialize;
use std::net::SocketAddr;

/// Top-level node configuration, loaded from a single TOML file.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    /// This node's identity on the transport.
    pub node_id: String,
    /// This node's locator for contention bids and attestation parties,
    /// e.g. `"node1-locator"`.
    pub locator: String,
    /// Sequencer tuning.
    #[serde(default)]
    pub sequencer: SequencerConfig,
    /// Persistence writer tuning.
    #[serde(default)]
    pub writer: WriterConfig,
    /// Public-transaction orchestrator tuning.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// Submission retry/staleness tuning.
    #[serde(default)]
    pub transaction_engine: TransactionEngineConfig,
    /// Gas pricing escalation policy.
    #[serde(default)]
    pub gas_price: GasPriceSection,
    /// Structured logging and the Prometheus metrics endpoint.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// The JSON-RPC HTTP surface.
    #[serde(default)]
    pub rpc: RpcConfig,
}

/// `Sequencer.{staleTimeout, assemblyConcurrency}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencerConfig {
    /// Seconds a transaction may sit in `AwaitingVerifiers`/`Assembling`
    /// before it is considered stale.
    pub stale_timeout_secs: u64,
    /// How many transactions this node assembles concurrently per
    /// contract queue.
    pub assembly_concurrency: usize,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self { stale_timeout_secs: 30, assembly_concurrency: 1 }
    }
}

/// `Writer.{workerCount, batchMaxSize}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriterConfig {
    /// Number of concurrent persistence-submission workers.
    pub worker_count: usize,
    /// Maximum operations batched into one `Persistence::submit` call.
    pub batch_max_size: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self { worker_count: 1, batch_max_size: 64 }
    }
}

/// `Orchestrator.maxInFlight`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorConfig {
    /// Maximum public transactions with an outstanding submission at once,
    /// per signer.
    pub max_in_flight: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { max_in_flight: 16 }
    }
}

/// `TransactionEngine.{maxOverloadProcessTime, maxStaleTime, maxIdleTime,
/// interval, retry}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEngineConfig {
    /// Milliseconds a poll tick may run before it is logged as overloaded.
    pub max_overload_process_time_ms: u64,
    /// Milliseconds a pending public transaction may go unconfirmed before
    /// gas is escalated.
    pub max_stale_time_ms: u64,
    /// Milliseconds the poll loop may sit with no pending work before a
    /// debug heartbeat is logged.
    pub max_idle_time_ms: u64,
    /// Poll loop cadence.
    pub interval_ms: u64,
    /// Maximum resubmission attempts before a public transaction is
    /// surfaced as failed rather than retried again.
    pub retry: u32,
}

impl Default for TransactionEngineConfig {
    fn default() -> Self {
        Self {
            max_overload_process_time_ms: 5_000,
            max_stale_time_ms: 30_000,
            max_idle_time_ms: 60_000,
            interval_ms: 2_000,
            retry: 5,
        }
    }
}

/// `GasPrice.{increasePercentage, increaseMax, fixed, useNodeEstimate}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasPriceSection {
    /// See [`GasPriceConfig::increase_percentage`].
    pub increase_percentage: u64,
    /// See [`GasPriceConfig::increase_max`].
    pub increase_max: u64,
    /// See [`GasPriceConfig::fixed`].
    #[serde(default)]
    pub fixed: Option<u128>,
    /// See [`GasPriceConfig::use_node_estimate`].
    pub use_node_estimate: bool,
}

impl Default for GasPriceSection {
    fn default() -> Self {
        let defaults = GasPriceConfig::default();
        Self {
            increase_percentage: defaults.increase_percentage,
            increase_max: defaults.increase_max,
            fixed: defaults.fixed,
            use_node_estimate: defaults.use_node_estimate,
        }
    }
}

impl From<GasPriceSection> for GasPriceConfig {
    fn from(section: GasPriceSection) -> Self {
        Self {
            increase_percentage: section.increase_percentage,
            increase_max: section.increase_max,
            fixed: section.fixed,
            use_node_estimate: section.use_node_estimate,
        }
    }
}

/// Structured logging and the Prometheus `/metrics` endpoint.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryConfig {
    /// Bind address for `/metrics`, `/healthz`, `/readyz`.
    pub bind_addr: SocketAddr,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { bind_addr: "127.0.0.1:9090".parse().expect("valid default addr") }
    }
}

/// The JSON-RPC HTTP surface.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcConfig {
    /// Bind address for the `ptx_*` JSON-RPC routes.
    pub bind_addr: SocketAddr,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self { bind_addr: "127.0.0.1:8545".parse().expect("valid default addr") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_minimal_document_falls_back_to_every_default_section() {
        let config: NodeConfig = toml::from_str(
            r#"
            nodeId = "node1"
            locator = "node1-locator"
            "#,
        )
        .expect("minimal config should parse");
        assert_eq!(config.node_id, "node1");
        assert_eq!(config.sequencer.assembly_concurrency, 1);
        assert_eq!(config.gas_price.increase_percentage, 12);
        assert_eq!(config.rpc.bind_addr.port(), 8545);
    }

    #[test]
    fn every_section_can_be_overridden() {
        let config: NodeConfig = toml::from_str(
            r#"
            nodeId = "node2"
            locator = "node2-locator"

            [sequencer]
            staleTimeoutSecs = 10
            assemblyConcurrency = 4

            [gasPrice]
            increasePercentage = 25
            increaseMax = 200
            useNodeEstimate = false

            [rpc]
            bindAddr = "0.0.0.0:9000"
            "#,
        )
        .expect("full config should parse");
        assert_eq!(config.sequencer.assembly_concurrency, 4);
        assert_eq!(config.gas_price.increase_percentage, 25);
        assert!(!config.gas_price.use_node_estimate);
        assert_eq!(config.rpc.bind_addr.port(), 9000);
    }
}
