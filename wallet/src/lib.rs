//! Wallet key management and transaction signing.
//!
//! A wallet is just a P-256 keypair plus the address derived from it. It
//! knows how to build and sign a transfer; it does not talk to a chain or
//! node directly, that's left to whoever holds the wallet (the CLI, or a
//! future light client).

use std::path::Path;

use minichain_core::crypto;
use minichain_core::transaction::Transaction;
use p256::ecdsa::SigningKey;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("core error: {0}")]
    Core(#[from] minichain_core::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed wallet file: {0}")]
    Malformed(String),
}

pub type Result<T> = core::result::Result<T, Error>;

/// On-disk representation of a wallet: the private key alone, hex-encoded.
/// The public key and address are always re-derived, never stored, so a
/// hand-edited file can't drift out of sync with its own key.
#[derive(Serialize, Deserialize)]
struct WalletFile {
    private_key_hex: String,
}

pub struct Wallet {
    signing_key: SigningKey,
    address: String,
}

impl Wallet {
    /// Generates a fresh random P-256 keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        Self::from_signing_key(signing_key)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = crypto::address_from_pubkey(signing_key.verifying_key());
        Self { signing_key, address }
    }

    pub fn from_private_hex(hex_str: &str) -> Result<Self> {
        let signing_key = crypto::privkey_from_hex(hex_str)?;
        Ok(Self::from_signing_key(signing_key))
    }

    pub fn private_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    pub fn public_key_hex(&self) -> String {
        crypto::pubkey_to_hex(self.signing_key.verifying_key())
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Builds and signs a transfer from this wallet to `recipient_address`.
    /// Returns the transaction together with the hex-encoded signature a
    /// node's `createTransaction` RPC call expects.
    pub fn sign_transfer(&self, recipient_address: &str, amount: f32) -> Result<(Transaction, String)> {
        let tx = Transaction::new(self.address.clone(), recipient_address, amount);
        let digest = tx.id()?;
        let signature = crypto::sign(&self.signing_key, &digest)?;
        Ok((tx, crypto::signature_to_hex(&signature)))
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = WalletFile { private_key_hex: self.private_key_hex() };
        let json = serde_json::to_vec_pretty(&file).map_err(|e| Error::Malformed(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let file: WalletFile =
            serde_json::from_slice(&bytes).map_err(|e| Error::Malformed(e.to_string()))?;
        Self::from_private_hex(&file.private_key_hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_wallet_has_a_stable_address() {
        let wallet = Wallet::generate();
        assert_eq!(wallet.address(), wallet.address());
    }

    #[test]
    fn private_key_round_trips_to_the_same_address() {
        let wallet = Wallet::generate();
        let restored = Wallet::from_private_hex(&wallet.private_key_hex()).unwrap();
        assert_eq!(wallet.address(), restored.address());
    }

    #[test]
    fn sign_transfer_produces_a_valid_signature() {
        let wallet = Wallet::generate();
        let (tx, signature_hex) = wallet.sign_transfer("recipient-addr", 2.5).unwrap();
        let pubkey = crypto::pubkey_from_hex(&wallet.public_key_hex()).unwrap();
        let signature = crypto::signature_from_hex(&signature_hex).unwrap();
        crypto::verify(&pubkey, &tx.id().unwrap(), &signature).unwrap();
    }

    #[test]
    fn save_then_load_round_trips_through_a_tempfile() {
        let wallet = Wallet::generate();
        let path = std::env::temp_dir().join(format!("minichain-wallet-test-{}.json", std::process::id()));
        wallet.save_to_file(&path).unwrap();
        let loaded = Wallet::load_from_file(&path).unwrap();
        assert_eq!(wallet.address(), loaded.address());
        let _ = std::fs::remove_file(&path);
    }
}
