//! minichain core library.
//!
//! Provides the chain and block model, the transaction pool and miner, and
//! the cryptographic primitives that back a minimal proof-of-work
//! blockchain node. Networking, RPC and the CLI shell live in sibling
//! crates; this crate holds only the in-memory domain logic.

pub mod block;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod mempool;
pub mod miner;
pub mod pow;
pub mod transaction;

pub use error::{Error, Result};

/// A 32-byte SHA-256 digest, used for block hashes, previous-hash links and
/// the proof-of-work target.
pub type Hash = [u8; 32];

/// Returns the current time as nanoseconds since the Unix epoch.
///
/// Block timestamps are set once at construction (see [`block::Block::new`])
/// and must never be re-read inside the puzzle solver loop.
pub(crate) fn now_nanos() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_nanos() as i64
}
