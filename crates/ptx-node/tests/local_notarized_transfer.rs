//! A transfer whose only parties are local to one node (sender and the
//! domain's own notary) dispatches end to end through the wired node's
//! JSON-RPC surface: submission reaches `dispatched`, and completing the
//! mock receipt resolves the public transaction as a success.

mod common;

use ptx_types::app::EthAddress;
use serde_json::json;
use tokio::time::{sleep, timeout, Duration};

#[tokio::test]
async fn a_locally_notarized_transfer_dispatches_and_confirms() {
    let network = ptx_transport::memory::Network::new();
    let harness = common::build_node("node1", "node1-locator", &network);

    let sender = harness.signer.generate();
    harness.identity.register("alice@node1", "ecdsa:secp256k1", format!("0x{}", hex::encode(sender.as_bytes())));

    let contract = EthAddress::from_bytes([9u8; 20]);
    let (status, body) = common::send_json(
        &harness.router,
        "/ptx_sendTransaction",
        json!({
            "domain": "transfer",
            "contractAddress": hex::encode(contract.as_bytes()),
            "from": "alice@node1",
            "inputs": {"to": "bob@node1", "amount": "10", "inputStates": []},
        }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "dispatched");
    let id = body["id"].as_str().expect("id present").to_string();

    let (status, by_nonce) = common::send_json(
        &harness.router,
        "/ptx_getPublicTransactionByNonce",
        json!({"from": hex::encode(sender.as_bytes()), "nonce": 0}),
    )
    .await;
    assert_eq!(status, 200);
    let tx_hash = by_nonce["publicTx"]["submissions"][0]["tx_hash"].as_str().expect("submitted").to_string();
    let hash_bytes: [u8; 32] = hex::decode(tx_hash.trim_start_matches("0x")).unwrap().try_into().unwrap();
    harness.rpc.complete(ptx_types::app::TxHash::from_bytes(hash_bytes), true);

    let changed = timeout(Duration::from_secs(1), async {
        loop {
            let changed = harness.node.orchestrator.poll_once().await;
            if !changed.is_empty() {
                return changed;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("orchestrator should observe the completed receipt");
    assert_eq!(changed.len(), 1);

    let (status, get_body) = common::send_json(&harness.router, "/ptx_getTransaction", json!({"id": id})).await;
    assert_eq!(status, 200);
    assert_eq!(get_body["status"], "dispatched");
    assert_eq!(get_body["publicTx"]["outcome"], "success");
}
