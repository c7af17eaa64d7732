//! Consensus and runtime configuration for **minichain** core.
//!
//! The [`Config`] struct centralises tunable parameters: the proof-of-work
//! target, the mining period, the mempool drain size and the coinbase
//! reward. It is constructed via the [`ConfigBuilder`] using the fluent
//! builder pattern, enabling callers to customise only the fields they care
//! about while keeping sensible defaults.
//!
//! ```
//! use minichain_core::config::Config;
//!
//! let cfg = Config::default();
//! assert_eq!(cfg.coinbase_reward, 1.0);
//! ```

use std::time::Duration;

use crate::Hash;

/// Sender address used by the mining-reward (coinbase) transaction.
pub const COINBASE_SENDER: &str = "THE BLOCKCHAIN";

/// Default rendezvous string nodes advertise themselves under.
pub const DEFAULT_RENDEZVOUS: &str = "go-blockchain";

/// libp2p protocol id carried by every peer stream.
pub const PROTOCOL_ID: &str = "/go-blockchain/0.0.1";

/// Reference difficulty target: leading two zero bytes, big-endian.
pub const DEFAULT_TARGET_HEX: &str =
    "000000FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF";

/// Parses [`DEFAULT_TARGET_HEX`] into its 32-byte big-endian form.
pub fn default_target() -> Hash {
    let bytes = hex::decode(DEFAULT_TARGET_HEX).expect("constant target is valid hex");
    let mut target = [0u8; 32];
    target.copy_from_slice(&bytes);
    target
}

/// Runtime configuration shared across the crate.
#[derive(Debug, Clone)]
pub struct Config {
    /// 256-bit big-endian proof-of-work target. A block is valid iff its
    /// hash, interpreted as a big-endian integer, is <= this value.
    pub target: Hash,

    /// How often the miner's periodic scheduler fires `mine_once`.
    pub mining_period: Duration,

    /// Maximum number of transactions drained from the mempool per block.
    pub drain_size: usize,

    /// Coinbase amount credited to the miner per mined block.
    pub coinbase_reward: f32,

    /// Rendezvous string nodes advertise/query under in the discovery DHT.
    pub rendezvous: String,

    /// libp2p protocol id used for peer streams.
    pub protocol_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: default_target(),
            mining_period: Duration::from_secs(20),
            drain_size: 10,
            coinbase_reward: 1.0,
            rendezvous: DEFAULT_RENDEZVOUS.to_string(),
            protocol_id: PROTOCOL_ID.to_string(),
        }
    }
}

/// Fluent builder for [`Config`].
#[derive(Default)]
pub struct ConfigBuilder {
    inner: Config,
}

impl ConfigBuilder {
    /// Starts a new builder pre-populated with [`Config::default`].
    pub fn new() -> Self {
        Self { inner: Config::default() }
    }

    pub fn target(mut self, target: Hash) -> Self {
        self.inner.target = target;
        self
    }

    pub fn mining_period(mut self, period: Duration) -> Self {
        self.inner.mining_period = period;
        self
    }

    pub fn drain_size(mut self, n: usize) -> Self {
        self.inner.drain_size = n;
        self
    }

    pub fn coinbase_reward(mut self, reward: f32) -> Self {
        self.inner.coinbase_reward = reward;
        self
    }

    pub fn rendezvous<S: Into<String>>(mut self, name: S) -> Self {
        self.inner.rendezvous = name.into();
        self
    }

    /// Consumes the builder returning an immutable configuration value.
    pub fn finish(self) -> Config {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_fields() {
        let cfg = ConfigBuilder::new()
            .drain_size(5)
            .coinbase_reward(2.0)
            .rendezvous("test-net")
            .finish();
        assert_eq!(cfg.drain_size, 5);
        assert_eq!(cfg.coinbase_reward, 2.0);
        assert_eq!(cfg.rendezvous, "test-net");
    }

    #[test]
    fn default_target_matches_reference_constant() {
        let t = default_target();
        assert_eq!(hex::encode(t), DEFAULT_TARGET_HEX.to_lowercase());
    }
}
