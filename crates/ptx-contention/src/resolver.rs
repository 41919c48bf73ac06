//! Weighted rendezvous hashing over a contract address and its bidders.

use ptx_crypto::address::keccak256;
use ptx_types::app::{EthAddress, VerifierLocator};

/// The number of virtual tokens hashed per bidder. A higher count smooths
/// the distribution of contracts across bidders at the cost of more hash
/// evaluations per resolution; 500 keeps resolution well under a
/// millisecond for the bidder counts a single contract realistically sees.
pub const VIRTUAL_TOKENS: u32 = 500;

fn token_score(contract: &EthAddress, bidder: &VerifierLocator, token: u32) -> u64 {
    let mut input = Vec::with_capacity(contract.as_bytes().len() + bidder.len() + 4);
    input.extend_from_slice(contract.as_bytes());
    input.extend_from_slice(bidder.as_bytes());
    input.extend_from_slice(&token.to_be_bytes());
    let digest = keccak256(&input);
    u64::from_be_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ])
}

fn bidder_weight(contract: &EthAddress, bidder: &VerifierLocator) -> u64 {
    (0..VIRTUAL_TOKENS)
        .map(|token| token_score(contract, bidder, token))
        .max()
        .unwrap_or(0)
}

/// Resolves contention over `contract` among `bidders`, returning the
/// winning bidder's locator. Returns `None` if `bidders` is empty.
///
/// Pure and deterministic: the same `(contract, bidders)` pair (regardless
/// of the order `bidders` is given in) always resolves to the same winner
/// on every node, with no communication required.
pub fn resolve(contract: &EthAddress, bidders: &[VerifierLocator]) -> Option<VerifierLocator> {
    bidders
        .iter()
        .map(|bidder| (bidder_weight(contract, bidder), bidder))
        .max_by(|(weight_a, bidder_a), (weight_b, bidder_b)| {
            // On a weight tie the lexicographically smaller bidder id wins, so
            // reverse the secondary comparison to make it the max.
            weight_a.cmp(weight_b).then_with(|| bidder_b.cmp(bidder_a))
        })
        .map(|(_, bidder)| bidder.clone())
}
