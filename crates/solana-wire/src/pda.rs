//! Program-derived address search.
//!
//! A program-derived address is a 32-byte value that is provably NOT a valid
//! Ed25519 curve point, so no private key can ever sign for it. The search
//! hashes `seeds || bump || program || "ProgramDerivedAddress"` with SHA-256,
//! walking the bump seed down from 255 until the candidate falls off the
//! curve.

use sha2::{Digest, Sha256};

use crate::error::SolanaError;
use crate::keys::PublicKey;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Find the program-derived address for the given seeds and program.
///
/// Iterates bump seeds from 255 down to 0 and returns the first candidate
/// that is not a valid curve point. Exhausting every bump seed fails with
/// `NoProgramAddress`; for honest inputs this is probabilistically
/// impossible.
pub fn find_program_address(
    seeds: &[&[u8]],
    program: &PublicKey,
) -> Result<PublicKey, SolanaError> {
    for bump in (0u8..=255).rev() {
        if let Some(address) = try_create_program_address(seeds, bump, program) {
            return Ok(address);
        }
    }

    Err(SolanaError::NoProgramAddress)
}

/// Attempt to create a program address from seeds + bump + program.
///
/// Returns `None` when the derived point falls on the Ed25519 curve (invalid
/// as a program address; the caller tries the next bump).
fn try_create_program_address(
    seeds: &[&[u8]],
    bump: u8,
    program: &PublicKey,
) -> Option<PublicKey> {
    let mut hasher = Sha256::new();

    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update([bump]);
    hasher.update(program);
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&hash) {
        return None;
    }

    Some(hash)
}

/// Check whether 32 bytes decompress to a valid Ed25519 curve point.
fn is_on_curve(bytes: &PublicKey) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_address_is_not_on_curve() {
        let address =
            find_program_address(&[b"seed-a", b"seed-b"], &[0xAA; 32]).unwrap();
        assert!(!is_on_curve(&address));
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = find_program_address(&[b"state", &[1u8; 32]], &[0x11; 32]).unwrap();
        let b = find_program_address(&[b"state", &[1u8; 32]], &[0x11; 32]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_give_different_addresses() {
        let a = find_program_address(&[b"alpha"], &[0x11; 32]).unwrap();
        let b = find_program_address(&[b"beta"], &[0x11; 32]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn different_programs_give_different_addresses() {
        let a = find_program_address(&[b"alpha"], &[0x11; 32]).unwrap();
        let b = find_program_address(&[b"alpha"], &[0x22; 32]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn is_on_curve_accepts_the_basepoint() {
        // The Ed25519 basepoint (compressed form).
        let basepoint: [u8; 32] = [
            0x58, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66,
            0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66,
            0x66, 0x66, 0x66, 0x66,
        ];
        assert!(is_on_curve(&basepoint));
    }

    #[test]
    fn is_on_curve_rejects_off_curve_bytes() {
        assert!(!is_on_curve(&[0x02; 32]));
    }
}
