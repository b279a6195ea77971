//! Key and signature primitives.
//!
//! Solana addresses are Base58-encoded 32-byte Ed25519 public keys. There is
//! no hashing step — the public key bytes ARE the address bytes. Private keys
//! are 32-byte Ed25519 seeds.

use ed25519_dalek::Signer;
use zeroize::Zeroize;

use crate::error::SolanaError;

/// A 32-byte Ed25519 public key. Compared byte-wise.
pub type PublicKey = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 32-byte Ed25519 seed.
pub type PrivateKey = [u8; 32];

/// An opaque 32-byte ledger blockhash.
pub type Blockhash = [u8; 32];

/// Decode a Base58 address string to its 32-byte public key.
pub fn public_key_from_base58(address: &str) -> Result<PublicKey, SolanaError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| SolanaError::MalformedFraming(format!("base58 decode failed: {e}")))?;

    bytes.try_into().map_err(|v: Vec<u8>| {
        SolanaError::MalformedFraming(format!("expected 32 bytes, got {}", v.len()))
    })
}

/// Encode a 32-byte public key as a Base58 address string.
pub fn public_key_to_base58(key: &PublicKey) -> String {
    bs58::encode(key).into_string()
}

/// Encode a 64-byte signature as a Base58 string (the form the ledger's RPC
/// uses to identify transactions).
pub fn signature_to_base58(signature: &Signature) -> String {
    bs58::encode(signature).into_string()
}

/// Derive the public key for a 32-byte Ed25519 seed.
pub fn derive_public_key(private_key: &PrivateKey) -> PublicKey {
    let mut seed = *private_key;
    let signing_key = ed25519_dalek::SigningKey::from_bytes(&seed);
    seed.zeroize();
    signing_key.verifying_key().to_bytes()
}

/// Sign a message with a 32-byte Ed25519 seed.
///
/// Ed25519 signing is deterministic: the same seed and message always produce
/// the same signature.
pub fn sign_message(private_key: &PrivateKey, message: &[u8]) -> Signature {
    let mut seed = *private_key;
    let signing_key = ed25519_dalek::SigningKey::from_bytes(&seed);
    seed.zeroize();
    signing_key.sign(message).to_bytes()
}

/// Verify a signature over a message under a public key.
///
/// Uses strict verification; a malformed public key verifies as `false`.
pub fn verify_signature(public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
    let Ok(verifying_key) = ed25519_dalek::VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let signature = ed25519_dalek::Signature::from_bytes(signature);
    verifying_key.verify_strict(message, &signature).is_ok()
}
