//! Error types for the **minichain** core crate.
//!
//! All high-level operations return [`crate::Result`], a convenient alias for
//! `core::result::Result<T, Error>`. The enum is intentionally minimal and
//! high-level; lower-level errors (hex decoding, signature parsing) are
//! mapped into one of these variants before bubbling up to callers.
//!
//! # Examples
//!
//! ```
//! use minichain_core::{Error, Result};
//!
//! fn demo_fn(fail: bool) -> Result<()> {
//!     if fail {
//!         Err(Error::InvalidSignature)
//!     } else {
//!         Ok(())
//!     }
//! }
//! ```

use thiserror::Error;

/// Core crate error type.
#[derive(Debug, Error, Clone)]
pub enum Error {
    /// Signature could not be verified against the provided public key.
    #[error("signature verification failed")]
    InvalidSignature,

    /// A hex-encoded field (pubkey, signature, hash) did not decode cleanly.
    #[error("malformed hex: {0}")]
    MalformedHex(String),

    /// A public or private key did not parse into a valid P-256 point/scalar.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// The requested block hash is absent from the chain.
    #[error("block not found: {0}")]
    BlockNotFound(String),

    /// The requested transaction hash is absent from the chain or mempool.
    #[error("transaction not found: {0}")]
    TransactionNotFound(String),

    /// The puzzle solver exhausted the entire nonce space without success.
    #[error("proof-of-work search exhausted the nonce space")]
    PuzzleExhausted,

    /// Serialization to the canonical JSON pre-image failed.
    #[error("canonical serialization failed: {0}")]
    Serialization(String),
}

/// Convenient result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
