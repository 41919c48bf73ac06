//! The `IdentityResolver` trait and an in-memory reference implementation.

use async_trait::async_trait;
use dashmap::DashMap;
use ptx_types::app::VerifierRef;
use ptx_types::error::ErrorCode;
use thiserror::Error;

/// Errors raised while resolving an identity locator.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// No verifier is registered for the given locator.
    #[error("identity locator not found: {0}")]
    NotFound(String),
    /// The locator is registered, but not for the requested algorithm.
    #[error("identity {locator} has no verifier for algorithm {algorithm}")]
    AlgorithmMismatch {
        /// The locator that was looked up.
        locator: String,
        /// The algorithm that was requested.
        algorithm: String,
    },
}

impl ErrorCode for IdentityError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "IDENTITY_NOT_FOUND",
            Self::AlgorithmMismatch { .. } => "IDENTITY_ALGORITHM_MISMATCH",
        }
    }
}

/// Resolves a [`ptx_types::app::VerifierLocator`] into a concrete verifier
/// for a given algorithm. Stands in for the out-of-scope Identity Resolver
/// collaborator.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolves `locator` for `algorithm`, e.g.
    /// `resolve("alice@node1", "ecdsa:secp256k1")`.
    async fn resolve(&self, locator: &str, algorithm: &str) -> Result<VerifierRef, IdentityError>;
}

/// An in-memory identity registry keyed by `(locator, algorithm)`, for
/// tests and single-node development.
#[derive(Default)]
pub struct LocalIdentityRegistry {
    entries: DashMap<(String, String), String>,
}

impl LocalIdentityRegistry {
    /// Constructs an empty registry.
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    /// Registers a verifier for `locator` under `algorithm`.
    pub fn register(&self, locator: impl Into<String>, algorithm: impl Into<String>, verifier: impl Into<String>) {
        self.entries.insert((locator.into(), algorithm.into()), verifier.into());
    }
}

#[async_trait]
impl IdentityResolver for LocalIdentityRegistry {
    async fn resolve(&self, locator: &str, algorithm: &str) -> Result<VerifierRef, IdentityError> {
        let key = (locator.to_string(), algorithm.to_string());
        match self.entries.get(&key) {
            Some(verifier) => Ok(VerifierRef {
                lookup: locator.to_string(),
                algorithm: algorithm.to_string(),
                verifier: verifier.clone(),
            }),
            None => {
                let has_other_algorithm = self.entries.iter().any(|e| e.key().0 == locator);
                if has_other_algorithm {
                    Err(IdentityError::AlgorithmMismatch {
                        locator: locator.to_string(),
                        algorithm: algorithm.to_string(),
                    })
                } else {
                    Err(IdentityError::NotFound(locator.to_string()))
                }
            }
        }
    }
}
