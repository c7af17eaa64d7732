use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use jsonrpsee::http_client::HttpClientBuilder;
use jsonrpsee::server::ServerBuilder;
use minichain_core::chain::Chain;
use minichain_core::config::Config;
use minichain_core::miner::Miner;
use minichain_network::{discovery, messaging::Envelope, NetworkHandle};
use minichain_rpc::{MinichainApiClient, MinichainApiServer, RpcServerImpl};
use minichain_wallet::Wallet;

#[derive(Parser)]
#[command(name = "minichain")]
#[command(about = "A minimal proof-of-work blockchain node", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full node: chain, mempool, miner, P2P discovery and JSON-RPC.
    Node {
        /// libp2p multiaddr to listen on.
        #[arg(long, default_value = "/ip4/0.0.0.0/tcp/0")]
        listen: String,
        /// Multiaddr of a peer to dial on startup; repeatable.
        #[arg(long = "bootstrap")]
        bootstrap: Vec<String>,
        /// Address the JSON-RPC server binds to.
        #[arg(long, default_value = "127.0.0.1:8545")]
        rpc_addr: String,
        /// Start mining immediately.
        #[arg(long)]
        mine: bool,
        /// Wallet file whose address receives mining rewards (required with --mine).
        #[arg(long)]
        wallet: Option<PathBuf>,
    },
    /// Wallet key management and transfers.
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
}

#[derive(Subcommand)]
enum WalletAction {
    /// Generate a new wallet and save it to a file.
    New {
        #[arg(long)]
        out: PathBuf,
    },
    /// Print a wallet's address.
    Address {
        #[arg(long)]
        wallet: PathBuf,
    },
    /// Sign and submit a transfer to a running node.
    Send {
        #[arg(long)]
        wallet: PathBuf,
        #[arg(long)]
        recipient: String,
        #[arg(long)]
        amount: f32,
        #[arg(long, default_value = "http://127.0.0.1:8545")]
        rpc_url: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Node { listen, bootstrap, rpc_addr, mine, wallet } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_node(listen, bootstrap, rpc_addr, mine, wallet))
        }
        Commands::Wallet { action } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_wallet_action(action))
        }
    }
}

async fn run_node(
    listen: String,
    bootstrap: Vec<String>,
    rpc_addr: String,
    mine: bool,
    wallet: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = Config::default();
    let chain = Arc::new(Chain::new(config.clone()));

    let bootstrap_addrs = bootstrap
        .iter()
        .map(|s| discovery::parse_multiaddr(s))
        .collect::<Result<Vec<_>, _>>()?;
    let network = Arc::new(
        NetworkHandle::start(discovery::parse_multiaddr(&listen)?, bootstrap_addrs, config).await?,
    );
    tracing::info!(peer_id = %network.local_peer_id, "node identity established");

    let broadcast_network = Arc::clone(&network);
    let miner = Arc::new(Miner::new(
        Arc::clone(&chain),
        Arc::new(move |block| {
            let network = Arc::clone(&broadcast_network);
            tokio::spawn(async move {
                if let Err(err) = network.broadcast(Envelope::NewBlock(block)).await {
                    tracing::warn!(error = %err, "failed to broadcast mined block");
                }
            });
        }),
    ));

    if mine {
        let wallet_path = wallet.ok_or_else(|| anyhow::anyhow!("--mine requires --wallet"))?;
        let wallet = Wallet::load_from_file(&wallet_path)?;
        miner.start(wallet.address().to_string()).await;
        tracing::info!(address = wallet.address(), "mining armed");
    }

    let rpc_impl = RpcServerImpl::new(Arc::clone(&chain), Arc::clone(&miner), Arc::clone(&network));
    let server = ServerBuilder::default().build(rpc_addr.parse::<std::net::SocketAddr>()?).await?;
    let rpc_handle = server.start(rpc_impl.into_rpc());
    tracing::info!(%rpc_addr, "JSON-RPC server listening");

    let inbound_chain = Arc::clone(&chain);
    let inbound_network = Arc::clone(&network);
    tokio::spawn(async move {
        loop {
            match network.recv().await {
                Some(Envelope::NewBlock(block)) => {
                    match inbound_chain.append_block(block.clone()).await {
                        Ok(()) => {
                            if let Err(err) = inbound_network.broadcast(Envelope::NewBlock(block)).await {
                                tracing::warn!(error = %err, "failed to re-broadcast inbound block");
                            }
                        }
                        Err(err) => {
                            tracing::debug!(error = %err, "rejected an inbound block");
                        }
                    }
                }
                Some(Envelope::NewTransaction(tx)) => {
                    match inbound_chain.admit_external_transaction(tx.clone()).await {
                        Ok(true) => {
                            if let Err(err) = inbound_network.broadcast(Envelope::NewTransaction(tx)).await {
                                tracing::warn!(error = %err, "failed to re-broadcast inbound transaction");
                            }
                        }
                        Ok(false) => {
                            tracing::debug!(sender = %tx.sender_address, "dropped a duplicate inbound transaction");
                        }
                        Err(err) => {
                            tracing::debug!(error = %err, "rejected an inbound transaction");
                        }
                    }
                }
                Some(Envelope::Ping) | Some(Envelope::Pong) => {}
                None => break,
            }
        }
    });

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_handler = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        shutdown_handler.store(true, Ordering::SeqCst);
    })?;

    while !shutdown.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    tracing::info!("shutting down");
    miner.stop().await;
    rpc_handle.stop()?;
    Ok(())
}

async fn run_wallet_action(action: WalletAction) -> anyhow::Result<()> {
    match action {
        WalletAction::New { out } => {
            let wallet = Wallet::generate();
            wallet.save_to_file(&out)?;
            println!("address: {}", wallet.address());
        }
        WalletAction::Address { wallet } => {
            let wallet = Wallet::load_from_file(&wallet)?;
            println!("{}", wallet.address());
        }
        WalletAction::Send { wallet, recipient, amount, rpc_url } => {
            let wallet = Wallet::load_from_file(&wallet)?;
            let (_tx, signature_hex) = wallet.sign_transfer(&recipient, amount)?;
            let client = HttpClientBuilder::default().build(rpc_url)?;
            let submitted = client
                .create_transaction(
                    wallet.address().to_string(),
                    recipient,
                    amount,
                    wallet.public_key_hex(),
                    signature_hex,
                )
                .await?;
            println!("submitted transaction {}", submitted.id);
        }
    }
    Ok(())
}
