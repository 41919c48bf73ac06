//! Keccak-256 hashing and eth-style address derivation.

use crate::error::CryptoError;
use k256::ecdsa::VerifyingKey;
use ptx_types::app::EthAddress;
use sha3::{Digest, Keccak256};

/// Computes the Keccak-256 digest of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let out = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&out);
    bytes
}

/// Derives the 20-byte eth-style address for a secp256k1 public key: the
/// last 20 bytes of the Keccak-256 hash of its uncompressed, non-prefixed
/// coordinates.
pub fn address_from_verifying_key(key: &VerifyingKey) -> EthAddress {
    let encoded = key.to_encoded_point(false);
    let digest = keccak256(&encoded.as_bytes()[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&digest[12..]);
    EthAddress::from_bytes(addr)
}

/// Parses a verifier identity string (e.g. one resolved from the
/// [`ptx_identity`] `IdentityResolver`) as a `0x`-prefixed 20-byte hex eth
/// address. Shared by every crate that turns a resolved verifier or signer
/// identity into an [`EthAddress`], so the accepted format stays consistent
/// across the sequencer and public transaction manager.
pub fn parse_hex_address(verifier: &str) -> Result<EthAddress, CryptoError> {
    let trimmed = verifier.strip_prefix("0x").unwrap_or(verifier);
    let bytes = hex::decode(trimmed).map_err(|_| CryptoError::InvalidKey)?;
    let array: [u8; 20] = bytes.try_into().map_err(|_| CryptoError::InvalidKey)?;
    Ok(EthAddress::from_bytes(array))
}
