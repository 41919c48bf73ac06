//! Library half of the node binary: configuration and dependency wiring,
//! split out of `main` so the integration tests under `tests/` can build a
//! fully wired node without spawning the real process.

/// The node's TOML configuration.
pub mod config;
/// Builds the dependency graph for one node.
pub mod wiring;
