//! Solana wire format support for the Kin payments ecosystem.
//!
//! This crate implements the ledger's compact binary transaction format by
//! hand, without pulling in `solana-sdk` (which drags in tokio and 200+
//! transitive dependencies). It covers:
//!
//! - Ed25519 key and signature primitives with Base58 string forms
//! - the message/transaction codec (compact-u16 framing, account table,
//!   deterministic signing payload)
//! - program-derived address search
//! - instruction builders and decompilers for the system, SPL token,
//!   associated-token, and memo programs
//!
//! All operations are pure functions over value inputs; nothing here touches
//! the network.

pub mod error;
pub mod keys;
pub mod memo;
pub mod pda;
pub mod system;
pub mod token;
pub mod transaction;

pub use error::SolanaError;
pub use keys::{
    derive_public_key, public_key_from_base58, public_key_to_base58, sign_message,
    signature_to_base58, verify_signature, Blockhash, PrivateKey, PublicKey, Signature,
};
pub use pda::find_program_address;
pub use transaction::{
    decode_compact_u16, encode_compact_u16, AccountMeta, CompiledInstruction, Instruction,
    Message, MessageHeader, Transaction,
};
