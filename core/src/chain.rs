//! Append-only chain storage and mutation (component C6).
//!
//! Block storage lives behind a single [`tokio::sync::RwLock`]: reads
//! (balance queries, block/transaction lookups) take the shared half and
//! never block one another, while appends take the exclusive half. A
//! second, narrower mutex serializes the validate-then-admit sequence in
//! [`Chain::create_transaction`] so two concurrent submissions can't both
//! observe the same pre-submission state and race into the mempool.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::block::Block;
use crate::config::Config;
use crate::crypto;
use crate::error::{Error, Result};
use crate::mempool::Mempool;
use crate::pow;
use crate::transaction::Transaction;
use crate::Hash;

pub struct Chain {
    blocks: RwLock<Vec<Block>>,
    mempool: Arc<Mempool>,
    config: Config,
    create_tx_lock: Mutex<()>,
}

impl Chain {
    /// Creates a new chain seeded with the genesis block.
    pub fn new(config: Config) -> Self {
        let genesis = Block::genesis(&config);
        Self {
            blocks: RwLock::new(vec![genesis]),
            mempool: Arc::new(Mempool::new()),
            config,
            create_tx_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn mempool(&self) -> &Arc<Mempool> {
        &self.mempool
    }

    /// Returns a clone of the most recently appended block.
    pub async fn last_block(&self) -> Block {
        let blocks = self.blocks.read().await;
        blocks.last().expect("chain always has at least genesis").clone()
    }

    pub async fn height(&self) -> u64 {
        self.blocks.read().await.len() as u64
    }

    pub async fn all_blocks(&self) -> Vec<Block> {
        self.blocks.read().await.clone()
    }

    pub async fn get_block_by_hash(&self, hash: &Hash) -> Result<Block> {
        let blocks = self.blocks.read().await;
        blocks
            .iter()
            .find(|b| b.hash_or_compute().ok().as_ref() == Some(hash))
            .cloned()
            .ok_or_else(|| Error::BlockNotFound(hex::encode(hash)))
    }

    pub async fn get_transaction_by_hash(&self, id: &Hash) -> Result<Transaction> {
        let blocks = self.blocks.read().await;
        for block in blocks.iter() {
            for tx in &block.transactions {
                if tx.id()?.as_slice() == id.as_slice() {
                    return Ok(tx.clone());
                }
            }
        }
        Err(Error::TransactionNotFound(hex::encode(id)))
    }

    /// Sums every transaction in the chain touching `address`: credits add,
    /// debits (as sender) subtract. Coinbase transactions only credit.
    pub async fn balance(&self, address: &str) -> f32 {
        let blocks = self.blocks.read().await;
        let mut total = 0.0f32;
        for block in blocks.iter() {
            for tx in &block.transactions {
                if tx.recipient_address == address {
                    total += tx.amount;
                }
                if tx.sender_address == address {
                    total -= tx.amount;
                }
            }
        }
        total
    }

    /// Assembles an unsolved block template: drains up to
    /// `config.drain_size` pending transactions and prepends the coinbase
    /// reward for `miner_address`.
    pub async fn build_block_template(&self, miner_address: &str) -> Result<Block> {
        let drained = self.mempool.get_and_clean(self.config.drain_size).await;
        let mut transactions = Vec::with_capacity(drained.len() + 1);
        transactions.push(Transaction::coinbase(miner_address, self.config.coinbase_reward));
        transactions.extend(drained);

        let tip = self.last_block().await;
        let previous_hash = tip.hash_or_compute()?;
        Block::new(previous_hash, transactions, self.config.target)
    }

    /// Appends `block` after checking it links to the current tip and that
    /// its proof-of-work is valid.
    pub async fn append_block(&self, block: Block) -> Result<()> {
        let mut blocks = self.blocks.write().await;
        let tip = blocks.last().expect("chain always has at least genesis");
        let expected_previous = tip.hash_or_compute()?;
        if block.header.previous_hash != expected_previous {
            return Err(Error::BlockNotFound(format!(
                "block does not link to current tip {}",
                hex::encode(expected_previous)
            )));
        }
        if !pow::verify(&block)? {
            return Err(Error::PuzzleExhausted);
        }
        blocks.push(block);
        Ok(())
    }

    /// Admits a transaction received from a peer directly into the mempool,
    /// without re-checking a signature (the gossip envelope carries no
    /// signature/pubkey; the originating node already validated it via its
    /// own `create_transaction`). Returns `true` if this was new, `false`
    /// if it was already pending, so the caller knows whether to forward it
    /// on to its own peers.
    pub async fn admit_external_transaction(&self, tx: Transaction) -> Result<bool> {
        let id = tx.id()?;
        Ok(self.mempool.add_if_absent(id, tx).await)
    }

    /// Validates and admits a user-submitted transaction into the mempool.
    ///
    /// `pubkey_hex` must derive `sender_address`, and `signature_hex` must be
    /// a valid signature by that key over the transaction's canonical id.
    pub async fn create_transaction(
        &self,
        sender_address: &str,
        recipient_address: &str,
        amount: f32,
        pubkey_hex: &str,
        signature_hex: &str,
    ) -> Result<Transaction> {
        let _guard = self.create_tx_lock.lock().await;

        let tx = Transaction::new(sender_address, recipient_address, amount);
        let pubkey = crypto::pubkey_from_hex(pubkey_hex)?;
        let derived_address = crypto::address_from_pubkey(&pubkey);
        if derived_address != sender_address {
            return Err(Error::InvalidKey(
                "public key does not derive the given sender address".into(),
            ));
        }

        let digest = tx.id()?;
        let signature = crypto::signature_from_hex(signature_hex)?;
        crypto::verify(&pubkey, &digest, &signature)?;

        self.mempool.add(digest, tx.clone()).await;
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::SigningKey;
    use rand_core::OsRng;

    #[tokio::test]
    async fn new_chain_starts_at_height_one_with_genesis() {
        let chain = Chain::new(Config::default());
        assert_eq!(chain.height().await, 1);
        let tip = chain.last_block().await;
        assert_eq!(tip.header.previous_hash, [0u8; 32]);
    }

    #[tokio::test]
    async fn build_block_template_includes_coinbase() {
        let chain = Chain::new(Config::default());
        let template = chain.build_block_template("miner-addr").await.unwrap();
        assert_eq!(template.transactions.len(), 1);
        assert!(template.transactions[0].is_coinbase());
        assert_eq!(template.transactions[0].recipient_address, "miner-addr");
    }

    #[tokio::test]
    async fn append_block_rejects_wrong_previous_hash() {
        let chain = Chain::new(Config::default());
        let mut block = Block::new([0xAB; 32], Vec::new(), [0xFF; 32]).unwrap();
        crate::pow::solve(&mut block, None).unwrap();
        assert!(chain.append_block(block).await.is_err());
    }

    #[tokio::test]
    async fn append_block_accepts_a_solved_template() {
        let config = Config { target: [0xFF; 32], ..Config::default() };
        let chain = Chain::new(config);
        let mut block = chain.build_block_template("miner-addr").await.unwrap();
        crate::pow::solve(&mut block, None).unwrap();
        chain.append_block(block).await.unwrap();
        assert_eq!(chain.height().await, 2);
        assert_eq!(chain.balance("miner-addr").await, 1.0);
    }

    #[tokio::test]
    async fn admit_external_transaction_is_new_only_once() {
        let chain = Chain::new(Config::default());
        let tx = Transaction::new("alice", "bob", 1.0);
        assert!(chain.admit_external_transaction(tx.clone()).await.unwrap());
        assert!(!chain.admit_external_transaction(tx).await.unwrap());
        assert_eq!(chain.mempool().size().await, 1);
    }

    #[tokio::test]
    async fn create_transaction_rejects_mismatched_address() {
        let chain = Chain::new(Config::default());
        let key = SigningKey::random(&mut OsRng);
        let pubkey_hex = crypto::pubkey_to_hex(key.verifying_key());
        let digest = Transaction::new("wrong-address", "bob", 1.0).id().unwrap();
        let sig = crypto::sign(&key, &digest).unwrap();
        let sig_hex = crypto::signature_to_hex(&sig);

        let result = chain
            .create_transaction("wrong-address", "bob", 1.0, &pubkey_hex, &sig_hex)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn create_transaction_admits_a_valid_signed_transfer() {
        let chain = Chain::new(Config::default());
        let key = SigningKey::random(&mut OsRng);
        let pubkey_hex = crypto::pubkey_to_hex(key.verifying_key());
        let sender_address = crypto::address_from_pubkey(key.verifying_key());

        let digest = Transaction::new(sender_address.clone(), "bob", 1.0).id().unwrap();
        let sig = crypto::sign(&key, &digest).unwrap();
        let sig_hex = crypto::signature_to_hex(&sig);

        chain
            .create_transaction(&sender_address, "bob", 1.0, &pubkey_hex, &sig_hex)
            .await
            .unwrap();
        assert_eq!(chain.mempool().size().await, 1);
    }
}
