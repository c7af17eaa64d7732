//! Error types for the network crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("transport setup failed: {0}")]
    Transport(String),

    #[error("failed to encode or decode an envelope: {0}")]
    Codec(String),

    #[error("unknown peer: {0}")]
    UnknownPeer(String),

    #[error("swarm task is no longer running")]
    Disconnected,
}

pub type Result<T> = core::result::Result<T, Error>;
