//! The Contention Resolver itself is already proven order-independent as a
//! pure function in `ptx-contention`'s own test suite. What this checks is
//! the wiring around it: a node's coordinator decision for a contract, built
//! up from repeated `note_bidder` calls arriving in different orders, must
//! still land on the same local dispatch-or-delegate outcome every time.

mod common;

use proptest::prelude::*;
use ptx_types::app::EthAddress;
use serde_json::json;

/// Submits one transfer against `contract` after announcing `bidders` (in
/// the given order) to a freshly wired node, returning whether it
/// dispatched locally rather than delegating.
fn dispatches_locally(rt: &tokio::runtime::Runtime, bidders: &[String], seed: u8) -> bool {
    rt.block_on(async {
        let contract = EthAddress::from_bytes([seed; 20]);
        let network = ptx_transport::memory::Network::new();
        let harness = common::build_node("node1", "node1-locator", &network);
        let sender = harness.signer.generate();
        harness.identity.register("alice@node1", "ecdsa:secp256k1", format!("0x{}", hex::encode(sender.as_bytes())));
        for bidder in bidders {
            harness.node.dispatcher.note_bidder(contract, bidder.clone());
        }
        let (status, body) = common::send_json(
            &harness.router,
            "/ptx_sendTransaction",
            json!({
                "domain": "transfer",
                "contractAddress": hex::encode(contract.as_bytes()),
                "from": "alice@node1",
                "inputs": {"to": "bob@node1", "amount": "1", "inputStates": []},
            }),
        )
        .await;
        assert_eq!(status, 200);
        body["status"] == "dispatched"
    })
}

proptest! {
    #[test]
    fn bid_announcement_order_never_changes_the_coordinator_decision(
        seed in any::<u8>(),
        mut bidders in proptest::collection::vec("[a-z]{3,8}-node[0-9]", 1..6),
    ) {
        bidders.dedup();
        let rt = tokio::runtime::Runtime::new().unwrap();

        let forward = dispatches_locally(&rt, &bidders, seed);
        let mut reversed = bidders.clone();
        reversed.reverse();
        let backward = dispatches_locally(&rt, &reversed, seed);

        prop_assert_eq!(forward, backward);
    }
}
