//! Pending transaction pool (component C5).
//!
//! The pool is a map keyed by transaction id, guarded by a single
//! [`tokio::sync::RwLock`]: concurrent readers (RPC queries) never block each
//! other, while inserts and drains take the exclusive write half.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::transaction::Transaction;
use crate::Hash;

#[derive(Debug, Default)]
pub struct Mempool {
    pending: RwLock<HashMap<Hash, Transaction>>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `tx`, keyed by its id. Replaces any existing entry with the
    /// same id (re-submission is idempotent, not rejected).
    pub async fn add(&self, id: Hash, tx: Transaction) {
        self.pending.write().await.insert(id, tx);
    }

    /// Inserts `tx` only if `id` is not already pending. Returns `true` if
    /// this call actually inserted it, `false` if it was already known.
    /// Used to decide whether a gossiped transaction is worth forwarding.
    pub async fn add_if_absent(&self, id: Hash, tx: Transaction) -> bool {
        use std::collections::hash_map::Entry;
        match self.pending.write().await.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(tx);
                true
            }
        }
    }

    /// Returns a snapshot of all pending transactions.
    pub async fn read(&self) -> Vec<Transaction> {
        self.pending.read().await.values().cloned().collect()
    }

    pub async fn size(&self) -> usize {
        self.pending.read().await.len()
    }

    /// Removes and returns up to `limit` pending transactions, in arbitrary
    /// order. Used by the miner when assembling a block template.
    pub async fn get_and_clean(&self, limit: usize) -> Vec<Transaction> {
        let mut pending = self.pending.write().await;
        let ids: Vec<Hash> = pending.keys().copied().take(limit).collect();
        ids.into_iter()
            .filter_map(|id| pending.remove(&id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_then_read_sees_the_transaction() {
        let pool = Mempool::new();
        let tx = Transaction::new("a", "b", 1.0);
        pool.add(tx.id().unwrap(), tx.clone()).await;
        let all = pool.read().await;
        assert_eq!(all, vec![tx]);
    }

    #[tokio::test]
    async fn get_and_clean_respects_the_limit_and_drains() {
        let pool = Mempool::new();
        for i in 0..5 {
            let tx = Transaction::new("a", "b", i as f32);
            pool.add(tx.id().unwrap(), tx).await;
        }
        let drained = pool.get_and_clean(3).await;
        assert_eq!(drained.len(), 3);
        assert_eq!(pool.size().await, 2);
    }

    #[tokio::test]
    async fn add_if_absent_rejects_a_duplicate_id() {
        let pool = Mempool::new();
        let tx = Transaction::new("a", "b", 1.0);
        let id = tx.id().unwrap();
        assert!(pool.add_if_absent(id, tx.clone()).await);
        assert!(!pool.add_if_absent(id, tx).await);
        assert_eq!(pool.size().await, 1);
    }

    #[tokio::test]
    async fn get_and_clean_with_large_limit_empties_the_pool() {
        let pool = Mempool::new();
        let tx = Transaction::new("a", "b", 1.0);
        pool.add(tx.id().unwrap(), tx).await;
        let drained = pool.get_and_clean(100).await;
        assert_eq!(drained.len(), 1);
        assert_eq!(pool.size().await, 0);
    }
}
