//! Peer discovery and messaging for minichain nodes.
//!
//! This crate owns the libp2p swarm. The core chain/mempool/miner never
//! reach into it directly; instead the supervisor wires a [`NetworkHandle`]
//! alongside [`minichain_core::chain::Chain`] and forwards inbound
//! envelopes, and mined blocks out, between the two.

pub mod discovery;
pub mod error;
pub mod messaging;
pub mod peer;

use std::sync::Arc;

use libp2p::{identity, Multiaddr, PeerId};
use minichain_core::config::Config;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use error::{Error, Result};
pub use messaging::Envelope;
pub use peer::PeerManager;

const CHANNEL_CAPACITY: usize = 256;

/// Handle to a running swarm task: send envelopes out, receive them in.
pub struct NetworkHandle {
    pub local_peer_id: PeerId,
    pub peers: Arc<PeerManager>,
    outbound: mpsc::Sender<(Option<PeerId>, Envelope)>,
    inbound: tokio::sync::Mutex<mpsc::Receiver<Envelope>>,
    task: JoinHandle<()>,
}

impl NetworkHandle {
    /// Generates a fresh identity, builds the swarm, listens on `listen_addr`,
    /// dials each of `bootstrap` in parallel and spawns the background event
    /// loop, which also drives Kademlia's own bootstrap process.
    pub async fn start(listen_addr: Multiaddr, bootstrap: Vec<Multiaddr>, config: Config) -> Result<Self> {
        let keypair = identity::Keypair::generate_ed25519();
        let local_peer_id = PeerId::from(keypair.public());
        let mut swarm = discovery::build_swarm(keypair, &config)?;
        swarm
            .listen_on(listen_addr)
            .map_err(|e| Error::Transport(e.to_string()))?;

        let peers = PeerManager::new();
        let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let task_peers = Arc::clone(&peers);
        let task = tokio::spawn(discovery::run(swarm, task_peers, config, bootstrap, inbound_tx, outbound_rx));

        Ok(Self {
            local_peer_id,
            peers,
            outbound: outbound_tx,
            inbound: tokio::sync::Mutex::new(inbound_rx),
            task,
        })
    }

    /// Broadcasts `envelope` to every currently known peer.
    pub async fn broadcast(&self, envelope: Envelope) -> Result<()> {
        self.outbound
            .send((None, envelope))
            .await
            .map_err(|_| Error::Disconnected)
    }

    /// Sends `envelope` to a single peer.
    pub async fn send_to(&self, peer: PeerId, envelope: Envelope) -> Result<()> {
        self.outbound
            .send((Some(peer), envelope))
            .await
            .map_err(|_| Error::Disconnected)
    }

    /// Awaits the next inbound envelope from any peer.
    pub async fn recv(&self) -> Option<Envelope> {
        self.inbound.lock().await.recv().await
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.len().await
    }

    pub fn shutdown(&self) {
        self.task.abort();
    }
}
