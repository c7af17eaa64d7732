//! Block and header model (component C3).

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::crypto::{self, merkle_root};
use crate::error::{Error, Result};
use crate::transaction::Transaction;
use crate::{now_nanos, Hash};

/// The portion of a block that is hashed for proof-of-work and for chain
/// linkage. `hash` is filled in once the header has been solved; it is not
/// part of the hash pre-image itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    pub previous_hash: Hash,
    pub merkle_root_hash: Hash,
    pub timestamp: i64,
    pub nonce: u64,
    pub target: Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
    /// Cached hash, set by the solver once the puzzle is solved. `None` for
    /// a freshly constructed, unsolved block.
    pub hash: Option<Hash>,
}

/// Canonical JSON pre-image used for hashing: the header (minus the cached
/// `hash` field) paired with the transaction list, in declaration order.
#[derive(Serialize)]
struct HeaderPreimage {
    previous_hash: String,
    merkle_root_hash: String,
    timestamp: i64,
    nonce: u64,
    target: String,
}

#[derive(Serialize)]
struct BlockPreimage<'a> {
    header: HeaderPreimage,
    transactions: &'a [Transaction],
}

impl Block {
    /// Builds a new, unsolved block. The timestamp is fixed at construction
    /// time and must not be re-read by the solver.
    pub fn new(previous_hash: Hash, transactions: Vec<Transaction>, target: Hash) -> Result<Self> {
        let leaves: Result<Vec<Hash>> = transactions.iter().map(Transaction::merkle_leaf).collect();
        let merkle_root_hash = merkle_root(&leaves?);
        Ok(Self {
            header: Header {
                previous_hash,
                merkle_root_hash,
                timestamp: now_nanos(),
                nonce: 0,
                target,
            },
            transactions,
            hash: None,
        })
    }

    /// Builds the genesis block: no previous hash, no transactions.
    pub fn genesis(config: &Config) -> Self {
        Self::new([0u8; 32], Vec::new(), config.target)
            .expect("genesis block has no transactions to fail serialization")
    }

    fn preimage(&self) -> BlockPreimage<'_> {
        BlockPreimage {
            header: HeaderPreimage {
                previous_hash: hex::encode(self.header.previous_hash),
                merkle_root_hash: hex::encode(self.header.merkle_root_hash),
                timestamp: self.header.timestamp,
                nonce: self.header.nonce,
                target: hex::encode(self.header.target),
            },
            transactions: &self.transactions,
        }
    }

    /// Canonical JSON bytes hashed to produce [`Block::compute_hash`].
    pub fn canonical_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.preimage()).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Computes the block hash fresh, ignoring any cached value.
    pub fn compute_hash(&self) -> Result<Hash> {
        Ok(crypto::sha256(&self.canonical_json()?))
    }

    /// Returns the cached hash if present, else computes it on demand.
    pub fn hash_or_compute(&self) -> Result<Hash> {
        match self.hash {
            Some(h) => Ok(h),
            None => self.compute_hash(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_has_zero_previous_hash_and_no_transactions() {
        let cfg = Config::default();
        let genesis = Block::genesis(&cfg);
        assert_eq!(genesis.header.previous_hash, [0u8; 32]);
        assert!(genesis.transactions.is_empty());
        assert!(genesis.hash.is_none());
    }

    #[test]
    fn changing_nonce_changes_hash() {
        let cfg = Config::default();
        let mut block = Block::genesis(&cfg);
        let h1 = block.compute_hash().unwrap();
        block.header.nonce += 1;
        let h2 = block.compute_hash().unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn hash_or_compute_prefers_cached_value() {
        let cfg = Config::default();
        let mut block = Block::genesis(&cfg);
        block.hash = Some([0xAB; 32]);
        assert_eq!(block.hash_or_compute().unwrap(), [0xAB; 32]);
    }

    #[test]
    fn transactions_affect_merkle_root_and_hash() {
        let cfg = Config::default();
        let empty = Block::genesis(&cfg);
        let with_tx = Block::new(
            [0u8; 32],
            vec![Transaction::new("a", "b", 1.0)],
            cfg.target,
        )
        .unwrap();
        assert_ne!(empty.header.merkle_root_hash, with_tx.header.merkle_root_hash);
        assert_ne!(empty.compute_hash().unwrap(), with_tx.compute_hash().unwrap());
    }
}
