//! Transport, rendezvous discovery and the swarm event loop (component C9).
//!
//! Nodes find each other through a Kademlia DHT used purely as a rendezvous
//! point: every node periodically (re-)advertises itself as a provider of
//! a single well-known key (the configured rendezvous string) and queries
//! for other providers of that same key. A provider found this way is
//! dialled directly; once connected, blocks and transactions travel over
//! the `request_response` protocol, not through the DHT.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash as _, Hasher};
use std::time::Duration;

use futures::StreamExt;
use libp2p::kad::{self, store::MemoryStore};
use libp2p::request_response::{self, ProtocolSupport};
use libp2p::swarm::{NetworkBehaviour, SwarmEvent};
use libp2p::{identify, identity, noise, tcp, yamux, Multiaddr, PeerId, StreamProtocol, Swarm, SwarmBuilder};
use minichain_core::config::Config;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::messaging::{Ack, Envelope, EnvelopeCodec};
use crate::peer::PeerManager;
use std::sync::Arc;

const IDENTIFY_PROTOCOL_VERSION: &str = "minichain/0.1.0";

#[derive(NetworkBehaviour)]
pub struct Behaviour {
    kademlia: kad::Behaviour<MemoryStore>,
    request_response: request_response::Behaviour<EnvelopeCodec>,
    identify: identify::Behaviour,
}

/// Builds a fully configured swarm: TCP transport over Noise + Yamux, with
/// Kademlia, the envelope request/response protocol, and identify.
pub fn build_swarm(keypair: identity::Keypair, config: &Config) -> Result<Swarm<Behaviour>> {
    let local_peer_id = PeerId::from(keypair.public());

    let protocol: StreamProtocol = config
        .protocol_id
        .clone()
        .try_into()
        .map_err(|_| Error::Transport("invalid protocol id".into()))?;

    let swarm = SwarmBuilder::with_existing_identity(keypair)
        .with_tokio()
        .with_tcp(
            tcp::Config::default(),
            noise::Config::new,
            yamux::Config::default,
        )
        .map_err(|e| Error::Transport(e.to_string()))?
        .with_dns()
        .map_err(|e| Error::Transport(e.to_string()))?
        .with_behaviour(|key| {
            let store = MemoryStore::new(local_peer_id);
            let kademlia = kad::Behaviour::new(local_peer_id, store);
            let request_response = request_response::Behaviour::new(
                [(protocol, ProtocolSupport::Full)],
                request_response::Config::default(),
            );
            let identify = identify::Behaviour::new(identify::Config::new(
                IDENTIFY_PROTOCOL_VERSION.to_string(),
                key.public(),
            ));
            Behaviour { kademlia, request_response, identify }
        })
        .map_err(|e| Error::Transport(e.to_string()))?
        .build();

    Ok(swarm)
}

/// Hashes the rendezvous string into a Kademlia record key.
fn rendezvous_key(rendezvous: &str) -> kad::RecordKey {
    let mut hasher = DefaultHasher::new();
    rendezvous.hash(&mut hasher);
    kad::RecordKey::new(&hasher.finish().to_be_bytes())
}

/// Drives the swarm: dials configured bootstrap peers, advertises/queries
/// the rendezvous key every second, dials newly discovered providers, and
/// bridges inbound/outbound envelopes to the rest of the node over the
/// given channels.
pub async fn run(
    mut swarm: Swarm<Behaviour>,
    peers: Arc<PeerManager>,
    config: Config,
    bootstrap: Vec<Multiaddr>,
    inbound: mpsc::Sender<Envelope>,
    mut outbound: mpsc::Receiver<(Option<PeerId>, Envelope)>,
) {
    let key = rendezvous_key(&config.rendezvous);
    let mut rendezvous_tick = tokio::time::interval(Duration::from_secs(1));
    let _ = swarm.behaviour_mut().kademlia.start_providing(key.clone());

    for addr in bootstrap {
        match swarm.dial(addr.clone()) {
            Ok(()) => tracing::info!(%addr, "dialing bootstrap peer"),
            Err(err) => tracing::warn!(%addr, error = %err, "failed to dial bootstrap peer"),
        }
    }

    loop {
        tokio::select! {
            _ = rendezvous_tick.tick() => {
                swarm.behaviour_mut().kademlia.get_providers(key.clone());
            }
            Some((target, envelope)) = outbound.recv() => {
                let recipients = match target {
                    Some(peer) => vec![peer],
                    None => peers.known_peers().await,
                };
                for peer in recipients {
                    swarm.behaviour_mut().request_response.send_request(&peer, envelope.clone());
                }
            }
            event = swarm.select_next_some() => {
                handle_event(&mut swarm, &peers, &inbound, event).await;
            }
        }
    }
}

async fn handle_event(
    swarm: &mut Swarm<Behaviour>,
    peers: &Arc<PeerManager>,
    inbound: &mpsc::Sender<Envelope>,
    event: SwarmEvent<BehaviourEvent>,
) {
    match event {
        SwarmEvent::NewListenAddr { address, .. } => {
            tracing::info!(%address, "listening");
        }
        SwarmEvent::Behaviour(BehaviourEvent::Identify(identify::Event::Received { peer_id, info })) => {
            for addr in info.listen_addrs {
                swarm.behaviour_mut().kademlia.add_address(&peer_id, addr.clone());
                peers.upsert(peer_id, Some(addr)).await;
            }
            let _ = swarm.behaviour_mut().kademlia.bootstrap();
        }
        SwarmEvent::Behaviour(BehaviourEvent::Kademlia(kad::Event::OutboundQueryProgressed {
            result: kad::QueryResult::GetProviders(Ok(ok)),
            ..
        })) => {
            if let kad::GetProvidersOk::FoundProviders { providers, .. } = ok {
                for provider in providers {
                    peers.upsert(provider, None).await;
                    let _ = swarm.dial(provider);
                }
            }
        }
        SwarmEvent::Behaviour(BehaviourEvent::RequestResponse(request_response::Event::Message {
            peer,
            message,
        })) => match message {
            request_response::Message::Request { request, channel, .. } => {
                peers.upsert(peer, None).await;
                let _ = inbound.send(request).await;
                let _ = swarm.behaviour_mut().request_response.send_response(channel, Ack);
            }
            request_response::Message::Response { .. } => {}
        },
        SwarmEvent::ConnectionEstablished { peer_id, endpoint, .. } => {
            swarm
                .behaviour_mut()
                .kademlia
                .add_address(&peer_id, endpoint.get_remote_address().clone());
            peers.upsert(peer_id, None).await;
        }
        SwarmEvent::ConnectionClosed { peer_id, num_established, .. } => {
            if num_established == 0 {
                peers.remove(&peer_id).await;
            }
        }
        _ => {}
    }
}

/// Convenience helper for callers that only need a listen address, e.g. the
/// CLI's `--listen` flag.
pub fn parse_multiaddr(s: &str) -> Result<Multiaddr> {
    s.parse().map_err(|_| Error::Transport(format!("invalid multiaddr: {s}")))
}
