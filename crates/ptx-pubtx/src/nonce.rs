//! The per-signer nonce allocator: a cached next-nonce per
//! signing address, lazily primed from [`EthRpcClient::get_transaction_count`],
//! with request-ordered assignment and rollback.

use crate::rpc::EthRpcClient;
use ptx_types::app::EthAddress;
use ptx_types::error::PubTxError;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

struct SignerCache {
    next: u64,
    /// Nonces handed out but not yet rolled back. Pinned in assignment
    /// order so a rollback only ever un-assigns the most recently handed
    /// out nonce, never opening a gap in the middle of the sequence.
    assigned: BTreeSet<u64>,
}

/// Hands out monotonic per-signer nonces, backed by a lazily-primed cache.
/// Stands in for PubTM's nonce-allocator half (the orchestrator loop half
/// lives in [`crate::orchestrator`]).
pub struct NonceAllocator {
    rpc: Arc<dyn EthRpcClient>,
    caches: Mutex<HashMap<EthAddress, SignerCache>>,
}

impl NonceAllocator {
    /// Constructs an allocator backed by `rpc` for baseline nonce discovery.
    pub fn new(rpc: Arc<dyn EthRpcClient>) -> Self {
        Self { rpc, caches: Mutex::new(HashMap::new()) }
    }

    /// Assigns the next nonce for `signer`, priming the cache from
    /// `eth_getTransactionCount` if this is the first assignment seen for
    /// this address.
    pub async fn assign(&self, signer: EthAddress) -> Result<u64, PubTxError> {
        let mut caches = self.caches.lock().await;
        if !caches.contains_key(&signer) {
            let baseline = self
                .rpc
                .get_transaction_count(&signer)
                .await
                .map_err(|_| PubTxError::NonceBaselineUnavailable(signer.to_string()))?;
            caches.insert(signer, SignerCache { next: baseline, assigned: BTreeSet::new() });
        }
        let cache = caches.get_mut(&signer).expect("just inserted if absent");
        let nonce = cache.next;
        cache.next += 1;
        cache.assigned.insert(nonce);
        Ok(nonce)
    }

    /// Rolls back a previously assigned nonce, e.g. because the caller's
    /// persistence batch (`Submit(dbTx)`) failed to commit. Only the
    /// highest still-assigned nonce for `signer` can be rolled back, since
    /// rolling back an earlier one would leave a gap in the sequence.
    pub async fn rollback(&self, signer: EthAddress, nonce: u64) -> Result<(), PubTxError> {
        let mut caches = self.caches.lock().await;
        let cache = caches
            .get_mut(&signer)
            .ok_or_else(|| PubTxError::NonceNotAssigned { signer: signer.to_string(), nonce })?;
        let is_highest = cache.assigned.last() == Some(&nonce);
        if !cache.assigned.remove(&nonce) || !is_highest {
            return Err(PubTxError::NonceNotAssigned { signer: signer.to_string(), nonce });
        }
        cache.next -= 1;
        Ok(())
    }

    /// The number of nonces currently assigned (handed out, not rolled
    /// back) for `signer`, exposed for the `PubTxMetricsSink` gauge.
    pub async fn assigned_count(&self, signer: &EthAddress) -> usize {
        self.caches.lock().await.get(signer).map(|c| c.assigned.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::MockEthRpcClient;
    use std::sync::Arc;

    fn addr(b: u8) -> EthAddress {
        EthAddress::from_bytes([b; 20])
    }

    #[tokio::test]
    async fn first_assignment_primes_from_the_rpc_baseline() {
        let rpc = Arc::new(MockEthRpcClient::new());
        rpc.set_baseline_nonce(addr(1), 42);
        let allocator = NonceAllocator::new(rpc);
        assert_eq!(allocator.assign(addr(1)).await.unwrap(), 42);
        assert_eq!(allocator.assign(addr(1)).await.unwrap(), 43);
    }

    #[tokio::test]
    async fn rollback_of_the_latest_nonce_reuses_it() {
        let rpc = Arc::new(MockEthRpcClient::new());
        let allocator = NonceAllocator::new(rpc);
        let nonce = allocator.assign(addr(2)).await.unwrap();
        allocator.rollback(addr(2), nonce).await.expect("rollback should succeed");
        assert_eq!(allocator.assign(addr(2)).await.unwrap(), nonce);
    }

    #[tokio::test]
    async fn rollback_of_a_non_latest_nonce_is_rejected() {
        let rpc = Arc::new(MockEthRpcClient::new());
        let allocator = NonceAllocator::new(rpc);
        let first = allocator.assign(addr(3)).await.unwrap();
        let _second = allocator.assign(addr(3)).await.unwrap();
        assert!(allocator.rollback(addr(3), first).await.is_err());
    }

    #[tokio::test]
    async fn assigned_count_reflects_outstanding_nonces() {
        let rpc = Arc::new(MockEthRpcClient::new());
        let allocator = NonceAllocator::new(rpc);
        allocator.assign(addr(4)).await.unwrap();
        allocator.assign(addr(4)).await.unwrap();
        assert_eq!(allocator.assigned_count(&addr(4)).await, 2);
    }
}
