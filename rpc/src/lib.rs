//! JSON-RPC surface (component C10) over the node's chain, mempool and miner.

mod dto;

use std::sync::Arc;

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::types::{ErrorObject, ErrorObjectOwned};
use minichain_core::chain::Chain;
use minichain_core::miner::Miner;
use minichain_network::{Envelope, NetworkHandle};

pub use dto::{BlockDto, TransactionDto};

fn to_rpc_error(err: minichain_core::Error) -> ErrorObjectOwned {
    ErrorObject::owned(-32000, err.to_string(), None::<()>)
}

#[rpc(client, server, namespace = "node")]
pub trait MinichainApi {
    #[method(name = "ping")]
    async fn ping(&self) -> RpcResult<String>;

    #[method(name = "getBlocks")]
    async fn get_blocks(&self) -> RpcResult<Vec<BlockDto>>;

    #[method(name = "getBlock")]
    async fn get_block(&self, hash_hex: String) -> RpcResult<BlockDto>;

    #[method(name = "getTransactions")]
    async fn get_transactions(&self) -> RpcResult<Vec<TransactionDto>>;

    #[method(name = "createTransaction")]
    async fn create_transaction(
        &self,
        sender_address: String,
        recipient_address: String,
        amount: f32,
        pubkey_hex: String,
        signature_hex: String,
    ) -> RpcResult<TransactionDto>;

    #[method(name = "getTransaction")]
    async fn get_transaction(&self, id_hex: String) -> RpcResult<TransactionDto>;

    #[method(name = "startMining")]
    async fn start_mining(&self, miner_address: String) -> RpcResult<bool>;

    #[method(name = "stopMining")]
    async fn stop_mining(&self) -> RpcResult<bool>;

    #[method(name = "getBalance")]
    async fn get_balance(&self, address: String) -> RpcResult<f32>;
}

/// The RPC surface's concrete handle into the node's running subsystems.
pub struct RpcServerImpl {
    chain: Arc<Chain>,
    miner: Arc<Miner>,
    network: Arc<NetworkHandle>,
}

impl RpcServerImpl {
    pub fn new(chain: Arc<Chain>, miner: Arc<Miner>, network: Arc<NetworkHandle>) -> Self {
        Self { chain, miner, network }
    }
}

fn decode_hash(hex_str: &str, what: &str) -> RpcResult<minichain_core::Hash> {
    let bytes = hex::decode(hex_str)
        .map_err(|e| ErrorObject::owned(-32602, format!("invalid {what} hex: {e}"), None::<()>))?;
    if bytes.len() != 32 {
        return Err(ErrorObject::owned(-32602, format!("{what} must be 32 bytes"), None::<()>));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

#[async_trait]
impl MinichainApiServer for RpcServerImpl {
    async fn ping(&self) -> RpcResult<String> {
        Ok("pong".to_string())
    }

    async fn get_blocks(&self) -> RpcResult<Vec<BlockDto>> {
        let blocks = self.chain.all_blocks().await;
        Ok(blocks.iter().map(BlockDto::from).collect())
    }

    async fn get_block(&self, hash_hex: String) -> RpcResult<BlockDto> {
        let hash = decode_hash(&hash_hex, "block hash")?;
        let block = self.chain.get_block_by_hash(&hash).await.map_err(to_rpc_error)?;
        Ok(BlockDto::from(&block))
    }

    async fn get_transactions(&self) -> RpcResult<Vec<TransactionDto>> {
        let pending = self.chain.mempool().read().await;
        Ok(pending.iter().map(TransactionDto::from).collect())
    }

    async fn create_transaction(
        &self,
        sender_address: String,
        recipient_address: String,
        amount: f32,
        pubkey_hex: String,
        signature_hex: String,
    ) -> RpcResult<TransactionDto> {
        let tx = self
            .chain
            .create_transaction(&sender_address, &recipient_address, amount, &pubkey_hex, &signature_hex)
            .await
            .map_err(to_rpc_error)?;

        if let Err(err) = self.network.broadcast(Envelope::NewTransaction(tx.clone())).await {
            tracing::warn!(error = %err, "failed to broadcast new transaction");
        }

        Ok(TransactionDto::from(&tx))
    }

    async fn get_transaction(&self, id_hex: String) -> RpcResult<TransactionDto> {
        let id = decode_hash(&id_hex, "transaction id")?;
        let tx = self.chain.get_transaction_by_hash(&id).await.map_err(to_rpc_error)?;
        Ok(TransactionDto::from(&tx))
    }

    async fn start_mining(&self, miner_address: String) -> RpcResult<bool> {
        self.miner.start(miner_address).await;
        Ok(true)
    }

    async fn stop_mining(&self) -> RpcResult<bool> {
        self.miner.stop().await;
        Ok(true)
    }

    async fn get_balance(&self, address: String) -> RpcResult<f32> {
        Ok(self.chain.balance(&address).await)
    }
}
