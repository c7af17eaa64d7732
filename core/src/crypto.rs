//! Key material, signing and address derivation (component C1).
//!
//! Signatures are ECDSA over NIST P-256, produced with [`p256`]/[`ecdsa`].
//! Wire form of a signature is the 64-byte `r || s` scalar concatenation,
//! hex-encoded to 128 characters — never DER. Addresses are derived with a
//! double-SHA-256 pipeline over the uncompressed public key point; this is
//! deliberately not Bitcoin's RIPEMD-160-based `HASH160`.

use ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{EncodedPoint, FieldBytes};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::Hash;

/// SHA-256(SHA-256(`data`)).
pub fn double_sha256(data: &[u8]) -> Hash {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    out
}

/// Single-pass SHA-256, used for block hashes.
pub fn sha256(data: &[u8]) -> Hash {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(data));
    out
}

fn hex_decode_fixed<const N: usize>(s: &str, what: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(s).map_err(|e| Error::MalformedHex(format!("{what}: {e}")))?;
    if bytes.len() != N {
        return Err(Error::MalformedHex(format!(
            "{what}: expected {N} bytes, got {}",
            bytes.len()
        )));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Parses a 64-character hex scalar into a P-256 signing (private) key.
pub fn privkey_from_hex(hex_str: &str) -> Result<SigningKey> {
    let d: [u8; 32] = hex_decode_fixed(hex_str, "private key")?;
    SigningKey::from_bytes(FieldBytes::from_slice(&d))
        .map_err(|e| Error::InvalidKey(e.to_string()))
}

/// Parses a 128-character hex `X || Y` point into a P-256 verifying (public) key.
pub fn pubkey_from_hex(hex_str: &str) -> Result<VerifyingKey> {
    let xy: [u8; 64] = hex_decode_fixed(hex_str, "public key")?;
    let point = EncodedPoint::from_affine_coordinates(
        FieldBytes::from_slice(&xy[..32]),
        FieldBytes::from_slice(&xy[32..]),
        false,
    );
    VerifyingKey::from_encoded_point(&point).map_err(|e| Error::InvalidKey(e.to_string()))
}

/// Renders a public key as the 128-character hex `X || Y` wire form.
pub fn pubkey_to_hex(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let mut out = Vec::with_capacity(64);
    out.extend_from_slice(point.x().expect("uncompressed point has x"));
    out.extend_from_slice(point.y().expect("uncompressed point has y"));
    hex::encode(out)
}

/// Derives a wallet address from a public key: `bs58(double_sha256(X || Y))`.
pub fn address_from_pubkey(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let mut material = Vec::with_capacity(64);
    material.extend_from_slice(point.x().expect("uncompressed point has x"));
    material.extend_from_slice(point.y().expect("uncompressed point has y"));
    bs58::encode(double_sha256(&material)).into_string()
}

/// Signs a pre-computed digest directly (no additional hashing).
pub fn sign(key: &SigningKey, digest: &Hash) -> Result<Signature> {
    key.sign_prehash(digest)
        .map_err(|e| Error::InvalidKey(e.to_string()))
}

/// Verifies a signature over a pre-computed digest.
pub fn verify(key: &VerifyingKey, digest: &Hash, signature: &Signature) -> Result<()> {
    key.verify_prehash(digest, signature)
        .map_err(|_| Error::InvalidSignature)
}

/// Parses the 128-character hex `r || s` wire form of a signature.
pub fn signature_from_hex(hex_str: &str) -> Result<Signature> {
    let rs: [u8; 64] = hex_decode_fixed(hex_str, "signature")?;
    Signature::from_slice(&rs).map_err(|e| Error::InvalidKey(e.to_string()))
}

/// Renders a signature as its 128-character hex `r || s` wire form.
pub fn signature_to_hex(signature: &Signature) -> String {
    hex::encode(signature.to_bytes())
}

/// Builds a Merkle root over `leaves`, which are expected to already be the
/// canonical-form hashes (or byte strings) of each transaction.
///
/// Odd layers duplicate their final node, matching the common Bitcoin-style
/// convention. An empty input yields the all-zero hash.
pub fn merkle_root(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return [0u8; 32];
    }
    let mut level: Vec<Hash> = leaves.to_vec();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            level.push(*level.last().unwrap());
        }
        level = level
            .chunks(2)
            .map(|pair| {
                let mut buf = Vec::with_capacity(64);
                buf.extend_from_slice(&pair[0]);
                buf.extend_from_slice(&pair[1]);
                sha256(&buf)
            })
            .collect();
    }
    level[0]
}
