use ptx_types::error::ErrorCode;
use thiserror::Error;

/// Errors raised while signing or deriving an address.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The supplied key bytes did not parse as a valid secp256k1 scalar.
    #[error("invalid signing key")]
    InvalidKey,
    /// Signing failed (e.g. a malformed digest length).
    #[error("signing failed: {0}")]
    SigningFailed(String),
    /// Signature verification failed.
    #[error("signature verification failed")]
    VerificationFailed,
}

impl ErrorCode for CryptoError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidKey => "CRYPTO_INVALID_KEY",
            Self::SigningFailed(_) => "CRYPTO_SIGNING_FAILED",
            Self::VerificationFailed => "CRYPTO_VERIFICATION_FAILED",
        }
    }
}
