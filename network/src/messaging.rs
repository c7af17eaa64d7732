//! The per-peer wire message (component C11) and its `bincode` codec.
//!
//! Every message exchanged between two nodes, outside of the Kademlia DHT
//! traffic itself, is an [`Envelope`] framed over a
//! [`libp2p::request_response`] protocol under [`minichain_core::config::PROTOCOL_ID`].

use async_trait::async_trait;
use futures::prelude::*;
use libp2p::request_response;
use libp2p::StreamProtocol;
use minichain_core::block::Block;
use minichain_core::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::io;

/// Application-level message carried over a peer stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Envelope {
    /// A newly mined block, broadcast to every known peer.
    NewBlock(Block),
    /// A newly submitted transaction, broadcast to every known peer.
    NewTransaction(Transaction),
    /// Liveness probe; peers reply with `Pong`.
    Ping,
    Pong,
}

/// A response always accompanies a request in `request_response`; this
/// protocol has no meaningful reply payload of its own; acknowledgement is
/// an empty unit, and any resulting chain/mempool update instead reaches
/// peers as a *new* `Envelope` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack;

#[derive(Debug, Clone, Default)]
pub struct EnvelopeCodec;

const MAX_ENVELOPE_BYTES: u64 = 16 * 1024 * 1024;

async fn read_framed<T: AsyncRead + Unpin + Send>(io: &mut T) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 8];
    io.read_exact(&mut len_buf).await?;
    let len = u64::from_be_bytes(len_buf);
    if len > MAX_ENVELOPE_BYTES {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "envelope too large"));
    }
    let mut buf = vec![0u8; len as usize];
    io.read_exact(&mut buf).await?;
    Ok(buf)
}

async fn write_framed<T: AsyncWrite + Unpin + Send>(io: &mut T, bytes: &[u8]) -> io::Result<()> {
    io.write_all(&(bytes.len() as u64).to_be_bytes()).await?;
    io.write_all(bytes).await?;
    io.flush().await
}

#[async_trait]
impl request_response::Codec for EnvelopeCodec {
    type Protocol = StreamProtocol;
    type Request = Envelope;
    type Response = Ack;

    async fn read_request<T>(&mut self, _: &Self::Protocol, io: &mut T) -> io::Result<Envelope>
    where
        T: AsyncRead + Unpin + Send,
    {
        let bytes = read_framed(io).await?;
        bincode::deserialize(&bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    async fn read_response<T>(&mut self, _: &Self::Protocol, io: &mut T) -> io::Result<Ack>
    where
        T: AsyncRead + Unpin + Send,
    {
        let bytes = read_framed(io).await?;
        bincode::deserialize(&bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    async fn write_request<T>(&mut self, _: &Self::Protocol, io: &mut T, req: Envelope) -> io::Result<()>
    where
        T: AsyncWrite + Unpin + Send,
    {
        let bytes = bincode::serialize(&req).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        write_framed(io, &bytes).await
    }

    async fn write_response<T>(&mut self, _: &Self::Protocol, io: &mut T, res: Ack) -> io::Result<()>
    where
        T: AsyncWrite + Unpin + Send,
    {
        let bytes = bincode::serialize(&res).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        write_framed(io, &bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips_through_bincode() {
        let env = Envelope::Ping;
        let bytes = bincode::serialize(&env).unwrap();
        let decoded: Envelope = bincode::deserialize(&bytes).unwrap();
        assert!(matches!(decoded, Envelope::Ping));
    }
}
