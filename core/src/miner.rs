//! Periodic block miner (component C7).
//!
//! The miner runs as a background task armed by [`Miner::start`] and
//! disarmed by [`Miner::stop`], both idempotent: starting while already
//! armed resets the period timer rather than stacking a second task, and
//! stopping while idle is a no-op. A solved block is handed to the
//! `on_block` callback injected at construction time rather than this crate
//! reaching into the network layer directly, keeping `core` free of any
//! dependency on peer broadcast.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::block::Block;
use crate::chain::Chain;
use crate::error::Result;
use crate::pow::{self, SolveOutcome};

/// Result of a single mining attempt.
#[derive(Debug)]
pub enum MineOutcome {
    /// A block was solved and appended to the chain.
    Mined(Block),
    /// The puzzle solver exhausted the nonce space without success.
    Exhausted,
    /// The mempool was empty; nothing was mined.
    Nothing,
}

/// Mines a single block template for `miner_address` and, on success,
/// appends it to `chain`. Does not spawn or schedule anything; callers
/// drive periodicity via [`Miner`].
///
/// Returns [`MineOutcome::Nothing`] without building a template at all if
/// the mempool is currently empty, so an idle node does not keep appending
/// coinbase-only blocks.
pub async fn mine_once(chain: &Chain, miner_address: &str) -> Result<MineOutcome> {
    if chain.mempool().size().await == 0 {
        return Ok(MineOutcome::Nothing);
    }

    let mut template = chain.build_block_template(miner_address).await?;
    let outcome = tokio::task::spawn_blocking(move || -> Result<(Block, SolveOutcome)> {
        let outcome = pow::solve(&mut template, None)?;
        Ok((template, outcome))
    })
    .await
    .expect("mining task panicked")?;

    let (solved, solve_outcome) = outcome;
    match solve_outcome {
        SolveOutcome::Solved => {
            chain.append_block(solved.clone()).await?;
            Ok(MineOutcome::Mined(solved))
        }
        SolveOutcome::Exhausted | SolveOutcome::Cancelled => Ok(MineOutcome::Exhausted),
    }
}

/// Callback invoked with every block this node mines, used by the
/// supervisor to broadcast it to peers.
pub type BlockCallback = Arc<dyn Fn(Block) + Send + Sync>;

/// Owns the background mining task and its arm/disarm state.
pub struct Miner {
    chain: Arc<Chain>,
    on_block: BlockCallback,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Miner {
    pub fn new(chain: Arc<Chain>, on_block: BlockCallback) -> Self {
        Self {
            chain,
            on_block,
            handle: Mutex::new(None),
        }
    }

    pub async fn is_armed(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    /// Arms the periodic scheduler for `miner_address`. If already armed,
    /// the previous task is aborted and the period timer restarts.
    pub async fn start(&self, miner_address: String) {
        let mut handle = self.handle.lock().await;
        if let Some(existing) = handle.take() {
            existing.abort();
        }

        let chain = Arc::clone(&self.chain);
        let on_block = Arc::clone(&self.on_block);
        let period = chain.config().mining_period;

        *handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                match mine_once(&chain, &miner_address).await {
                    Ok(MineOutcome::Mined(block)) => {
                        tracing::info!(nonce = block.header.nonce, "mined a block");
                        (on_block)(block);
                    }
                    Ok(MineOutcome::Exhausted) => {
                        tracing::warn!("nonce space exhausted without a solution");
                    }
                    Ok(MineOutcome::Nothing) => {
                        tracing::debug!("mempool empty, nothing to mine");
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "mining attempt failed");
                    }
                }
            }
        }));
    }

    /// Disarms the scheduler. A block solve already in flight runs to
    /// completion; only the next scheduled attempt is cancelled.
    pub async fn stop(&self) {
        if let Some(handle) = self.handle.lock().await.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn mine_once_against_an_easy_target_appends_a_block() {
        let config = Config { target: [0xFF; 32], ..Config::default() };
        let chain = Chain::new(config);
        let tx = crate::transaction::Transaction::new("a", "b", 1.0);
        chain.mempool().add(tx.id().unwrap(), tx).await;

        let outcome = mine_once(&chain, "miner-addr").await.unwrap();
        assert!(matches!(outcome, MineOutcome::Mined(_)));
        assert_eq!(chain.height().await, 2);
    }

    #[tokio::test]
    async fn mine_once_with_an_empty_mempool_does_nothing() {
        let config = Config { target: [0xFF; 32], ..Config::default() };
        let chain = Chain::new(config);
        let outcome = mine_once(&chain, "miner-addr").await.unwrap();
        assert!(matches!(outcome, MineOutcome::Nothing));
        assert_eq!(chain.height().await, 1);
    }

    #[tokio::test]
    async fn start_is_idempotent_when_called_twice() {
        let config = Config { target: [0xFF; 32], mining_period: std::time::Duration::from_millis(20), ..Config::default() };
        let chain = Arc::new(Chain::new(config));
        let tx = crate::transaction::Transaction::new("a", "b", 1.0);
        chain.mempool().add(tx.id().unwrap(), tx).await;

        let count = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&count);
        let miner = Miner::new(chain, Arc::new(move |_| { counted.fetch_add(1, Ordering::SeqCst); }));

        miner.start("miner-addr".to_string()).await;
        miner.start("miner-addr".to_string()).await;
        assert!(miner.is_armed().await);

        tokio::time::sleep(std::time::Duration::from_millis(60)).await;
        miner.stop().await;
        assert!(!miner.is_armed().await);
        assert!(count.load(Ordering::SeqCst) >= 1);
    }
}
