//! Known-peer registry (component C8).
//!
//! Discovery ([`crate::discovery`]) and the request/response protocol
//! ([`crate::messaging`]) both funnel through this registry rather than
//! keeping their own peer lists, so a peer learned via the DHT and one that
//! opens a direct stream are deduplicated into the same entry.

use std::collections::HashMap;
use std::sync::Arc;

use libp2p::{Multiaddr, PeerId};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct PeerInfo {
    pub addresses: Vec<Multiaddr>,
}

#[derive(Debug, Default)]
pub struct PeerManager {
    peers: RwLock<HashMap<PeerId, PeerInfo>>,
}

impl PeerManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn upsert(&self, peer_id: PeerId, address: Option<Multiaddr>) {
        let mut peers = self.peers.write().await;
        let entry = peers.entry(peer_id).or_insert_with(|| PeerInfo { addresses: Vec::new() });
        if let Some(addr) = address {
            if !entry.addresses.contains(&addr) {
                entry.addresses.push(addr);
            }
        }
    }

    pub async fn remove(&self, peer_id: &PeerId) {
        self.peers.write().await.remove(peer_id);
    }

    pub async fn known_peers(&self) -> Vec<PeerId> {
        self.peers.read().await.keys().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_then_known_peers_sees_the_peer() {
        let manager = PeerManager::new();
        let peer_id = PeerId::random();
        manager.upsert(peer_id, None).await;
        assert_eq!(manager.known_peers().await, vec![peer_id]);
    }

    #[tokio::test]
    async fn remove_drops_the_peer() {
        let manager = PeerManager::new();
        let peer_id = PeerId::random();
        manager.upsert(peer_id, None).await;
        manager.remove(&peer_id).await;
        assert!(manager.is_empty().await);
    }
}
