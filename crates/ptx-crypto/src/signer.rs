//! The `Signer` trait, standing in for the out-of-scope Key Manager, and an
//! in-memory reference implementation.

use crate::address::address_from_verifying_key;
use crate::error::CryptoError;
use k256::ecdsa::signature::Verifier as _;
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use ptx_types::app::EthAddress;
use std::collections::HashMap;
use std::sync::RwLock;

/// Anything capable of producing a secp256k1 signature over a 32-byte
/// digest for a known eth address. The production Key Manager implements this against a custody backend; [`LocalSigner`]
/// implements it against keys held in process memory.
pub trait Signer: Send + Sync {
    /// Signs `digest` (assumed to already be a 32-byte hash) with the key
    /// for `signer`, returning a 65-byte `r || s || v` signature.
    fn sign_digest(&self, signer: &EthAddress, digest: &[u8; 32]) -> Result<Vec<u8>, CryptoError>;

    /// Whether this signer holds a key for the given address.
    fn has_key(&self, signer: &EthAddress) -> bool;
}

/// An in-memory signer backed by a registry of secp256k1 keys, for tests and
/// single-node development. Never use this to custody funds in production.
#[derive(Default)]
pub struct LocalSigner {
    keys: RwLock<HashMap<EthAddress, SigningKey>>,
}

impl LocalSigner {
    /// Constructs an empty signer with no registered keys.
    pub fn new() -> Self {
        Self { keys: RwLock::new(HashMap::new()) }
    }

    /// Generates a fresh secp256k1 key, registers it, and returns its
    /// derived address.
    pub fn generate(&self) -> EthAddress {
        let key = SigningKey::random(&mut rand::thread_rng());
        self.insert(key)
    }

    /// Registers an existing signing key, returning its derived address.
    pub fn insert(&self, key: SigningKey) -> EthAddress {
        let verifying = VerifyingKey::from(&key);
        let address = address_from_verifying_key(&verifying);
        if let Ok(mut keys) = self.keys.write() {
            keys.insert(address, key);
        }
        address
    }
}

impl Signer for LocalSigner {
    fn sign_digest(&self, signer: &EthAddress, digest: &[u8; 32]) -> Result<Vec<u8>, CryptoError> {
        let keys = self.keys.read().map_err(|_| CryptoError::SigningFailed("poisoned key store".into()))?;
        let key = keys.get(signer).ok_or(CryptoError::InvalidKey)?;
        let (signature, recovery_id): (Signature, _) = key
            .sign_recoverable(digest)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte());
        Ok(bytes)
    }

    fn has_key(&self, signer: &EthAddress) -> bool {
        self.keys.read().map(|keys| keys.contains_key(signer)).unwrap_or(false)
    }
}

/// Verifies a 64-byte `r || s` signature (the trailing recovery byte, if
/// present, is ignored) against `digest` and the given public key.
pub fn verify(verifying_key: &VerifyingKey, digest: &[u8; 32], signature: &[u8]) -> Result<(), CryptoError> {
    let sig = Signature::try_from(&signature[..64]).map_err(|_| CryptoError::VerificationFailed)?;
    verifying_key
        .verify(digest, &sig)
        .map_err(|_| CryptoError::VerificationFailed)
}
