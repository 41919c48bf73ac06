//! The per-contract Coordinator/Delegated registry.

use ptx_types::app::{EthAddress, NodeId, SequencerRecord, SequencerRole, VerifierLocator};
use std::collections::HashMap;
use std::sync::Mutex;

/// Tracks, per privately-deployed contract, which node is Coordinator in
/// this node's view, re-resolving with [`ptx_contention::resolve`] whenever
/// a new bidder shows up.
pub struct SequencerRegistry {
    this_node: NodeId,
    this_locator: VerifierLocator,
    records: Mutex<HashMap<EthAddress, SequencerRecord>>,
}

impl SequencerRegistry {
    /// Constructs a registry for `this_node`, identified to the contention
    /// resolver under `this_locator` (the bidder string this node competes
    /// with, e.g. its own node id).
    pub fn new(this_node: NodeId, this_locator: impl Into<String>) -> Self {
        Self {
            this_node,
            this_locator: this_locator.into(),
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Returns this node's current view of the record for `contract`,
    /// creating one (with this node as Coordinator by default) if none
    /// exists yet.
    pub fn record_for(&self, contract: EthAddress) -> SequencerRecord {
        let mut records = self.records.lock().expect("sequencer registry lock poisoned");
        records
            .entry(contract)
            .or_insert_with(|| SequencerRecord::local(contract, self.this_node.clone()))
            .clone()
    }

    /// Registers `bidder` as contending for coordination of `contract`, then
    /// re-resolves contention. Returns the resulting record.
    ///
    /// A no-op re-resolve (same bidder set as before) is cheap to call
    /// repeatedly, so callers may invoke this on every remote claim to a
    /// contract's coordination without tracking whether the bidder is new.
    pub fn add_bidder(&self, contract: EthAddress, bidder: VerifierLocator) -> SequencerRecord {
        let mut records = self.records.lock().expect("sequencer registry lock poisoned");
        let record = records
            .entry(contract)
            .or_insert_with(|| SequencerRecord::local(contract, self.this_node.clone()));
        if !record.bidders.contains(&bidder) {
            record.bidders.push(bidder);
        }
        Self::resolve_locked(record, &self.this_node, &self.this_locator);
        record.clone()
    }

    /// Re-resolves contention for `contract` using this node's own locator
    /// as a bidder alongside whatever remote bidders have already been
    /// registered. Used once this node itself wants to coordinate a
    /// contract it has not seen contention on before.
    pub fn bid(&self, contract: EthAddress) -> SequencerRecord {
        self.add_bidder(contract, self.this_locator.clone())
    }

    fn resolve_locked(record: &mut SequencerRecord, this_node: &NodeId, this_locator: &str) {
        let mut bidders = record.bidders.clone();
        if !bidders.iter().any(|b| b == this_locator) {
            bidders.push(this_locator.to_string());
        }
        let Some(winner) = ptx_contention::resolve(&record.contract_address, &bidders) else {
            return;
        };
        let won = winner == this_locator;
        record.role = if won { SequencerRole::Coordinator } else { SequencerRole::Delegated };
        record.coordinator = if won { this_node.clone() } else { NodeId::from(winner) };
        record.updated_at = ptx_types::app::now_millis();
        ptx_telemetry::sequencer_metrics().inc_contention_resolution(won);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract() -> EthAddress {
        EthAddress::from_bytes([9u8; 20])
    }

    #[test]
    fn unconfigured_contract_defaults_to_local_coordinator() {
        let registry = SequencerRegistry::new(NodeId::from("node1"), "node1");
        let record = registry.record_for(contract());
        assert!(record.is_coordinator());
    }

    #[test]
    fn a_stronger_remote_bidder_can_flip_this_node_to_delegated() {
        let registry = SequencerRegistry::new(NodeId::from("node1"), "node1");
        registry.bid(contract());

        // Sweep candidate remote locators until one actually outweighs us
        // under the deterministic HRW scoring, then confirm the flip.
        let mut flipped = false;
        for i in 0..64u32 {
            let candidate = format!("remote-{i}");
            let record = registry.add_bidder(contract(), candidate.clone());
            if !record.is_coordinator() {
                assert_eq!(record.coordinator, NodeId::from(candidate));
                flipped = true;
                break;
            }
        }
        assert!(flipped, "expected some remote bidder to outweigh the local one");
    }

    #[test]
    fn resolution_is_stable_for_an_unchanged_bidder_set() {
        let registry = SequencerRegistry::new(NodeId::from("node1"), "node1");
        let first = registry.add_bidder(contract(), "remote-a".into());
        let second = registry.add_bidder(contract(), "remote-a".into());
        assert_eq!(first.role, second.role);
        assert_eq!(first.coordinator, second.coordinator);
    }
}
