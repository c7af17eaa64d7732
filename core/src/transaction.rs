//! Transaction model and canonical hashing (component C2).

use serde::{Deserialize, Serialize};

use crate::config::COINBASE_SENDER;
use crate::crypto;
use crate::error::{Error, Result};
use crate::Hash;

/// A transfer of value from `sender_address` to `recipient_address`.
///
/// The canonical JSON form used for hashing and signing is exactly the
/// field order declared here: `sender_address`, `recipient_address`,
/// `amount`. Coinbase (mining-reward) transactions use
/// [`COINBASE_SENDER`] as their sender and carry no signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender_address: String,
    pub recipient_address: String,
    pub amount: f32,
}

impl Transaction {
    pub fn new(sender_address: impl Into<String>, recipient_address: impl Into<String>, amount: f32) -> Self {
        Self {
            sender_address: sender_address.into(),
            recipient_address: recipient_address.into(),
            amount,
        }
    }

    /// Builds the coinbase transaction crediting `miner_address` for mining a block.
    pub fn coinbase(miner_address: impl Into<String>, reward: f32) -> Self {
        Self::new(COINBASE_SENDER, miner_address, reward)
    }

    pub fn is_coinbase(&self) -> bool {
        self.sender_address == COINBASE_SENDER
    }

    /// Canonical JSON pre-image, used for both the transaction id and the
    /// message that gets signed.
    pub fn canonical_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Transaction id: `SHA-256(SHA-256(canonical_json(tx)))`.
    pub fn id(&self) -> Result<Hash> {
        Ok(crypto::double_sha256(&self.canonical_json()?))
    }

    /// Merkle-tree leaf for this transaction: a single `SHA-256` of its
    /// canonical JSON bytes. This is deliberately not [`Transaction::id`]
    /// (a double hash): the reference implementation's Merkle tree hashes
    /// each transaction's marshaled form once per leaf.
    pub fn merkle_leaf(&self) -> Result<Hash> {
        Ok(crypto::sha256(&self.canonical_json()?))
    }
}
