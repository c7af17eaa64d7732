//! JSON-RPC response shapes.
//!
//! The core crate's [`minichain_core::block::Block`] stores hashes as raw
//! `[u8; 32]` arrays, which serialize as JSON number arrays by default --
//! workable for the peer wire format but unpleasant over JSON-RPC. These DTOs
//! re-render every hash field as lowercase hex before it reaches a client.

use minichain_core::block::Block;
use minichain_core::transaction::Transaction;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TransactionDto {
    pub id: String,
    pub sender_address: String,
    pub recipient_address: String,
    pub amount: f32,
}

impl From<&Transaction> for TransactionDto {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id().map(hex::encode).unwrap_or_default(),
            sender_address: tx.sender_address.clone(),
            recipient_address: tx.recipient_address.clone(),
            amount: tx.amount,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BlockDto {
    pub hash: String,
    pub previous_hash: String,
    pub merkle_root_hash: String,
    pub timestamp: i64,
    pub nonce: u64,
    pub target: String,
    pub transactions: Vec<TransactionDto>,
}

impl From<&Block> for BlockDto {
    fn from(block: &Block) -> Self {
        Self {
            hash: block.hash_or_compute().map(hex::encode).unwrap_or_default(),
            previous_hash: hex::encode(block.header.previous_hash),
            merkle_root_hash: hex::encode(block.header.merkle_root_hash),
            timestamp: block.header.timestamp,
            nonce: block.header.nonce,
            target: hex::encode(block.header.target),
            transactions: block.transactions.iter().map(TransactionDto::from).collect(),
        }
    }
}
