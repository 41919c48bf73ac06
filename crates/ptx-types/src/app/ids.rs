//! Newtype identifiers. Keeping these distinct from raw `[u8; N]` or `String`
//! means a state id can never be accidentally compared to a tx hash, and the
//! compiler enforces invariant 2 of the data model (state ids are 32-byte
//! content hashes) at the type level.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! fixed_bytes_id {
    ($name:ident, $len:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(#[serde(with = "hex::serde")] pub [u8; $len]);

        impl $name {
            /// Builds an id from raw big-endian bytes.
            pub fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Returns the raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(0x{})", stringify!($name), hex::encode(self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

fixed_bytes_id!(StateId, 32, "A content-addressed, 32-byte off-chain state id.");
fixed_bytes_id!(TxHash, 32, "The hash of a submitted base-ledger transaction.");
fixed_bytes_id!(EthAddress, 20, "A 20-byte EVM account or contract address.");

/// A privately-deployed smart contract address. Distinct from `EthAddress`
/// only by name, to keep "which address means what" obvious at call sites.
pub type ContractAddress = EthAddress;

/// An opaque identity locator, e.g. `"alice@node1"`, resolved by the
/// Identity Resolver into a concrete verifier (algorithm + key material).
pub type VerifierLocator = String;

/// The logical name of a node in the permissioned network, used to address
/// the endorsement transport and to identify the Coordinator of a
/// [`crate::app::SequencerRecord`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A caller-supplied key used to dedupe `ptx_sendTransaction` calls
///.
pub type IdempotencyKey = String;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_id_round_trips_through_json() {
        let id = StateId::from_bytes([7u8; 32]);
        let json = serde_json::to_string(&id).unwrap();
        let back: StateId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn display_is_0x_prefixed_hex() {
        let addr = EthAddress::from_bytes([0u8; 20]);
        assert_eq!(addr.to_string(), format!("0x{}", "00".repeat(20)));
    }
}
