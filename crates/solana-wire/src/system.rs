//! System program instructions.
//!
//! Only the commands the Kin flows use are modelled: `CreateAccount` (the
//! first half of a token-account creation sequence) and `AdvanceNonce` (for
//! durable-nonce transactions), plus extraction of the nonce value from a
//! nonce account's data.

use crate::error::SolanaError;
use crate::keys::{Blockhash, PublicKey};
use crate::transaction::{
    instruction_account, instruction_at, instruction_program, AccountMeta, Instruction,
    Message,
};

/// The system program public key: 32 zero bytes.
/// Base58: `11111111111111111111111111111111`
pub const PROGRAM_KEY: PublicKey = [0u8; 32];

/// The "Rent" system variable.
/// Base58: `SysvarRent111111111111111111111111111111111`
pub const RENT_SYSVAR: PublicKey = [
    0x06, 0xa7, 0xd5, 0x17, 0x19, 0x2c, 0x5c, 0x51, 0x21, 0x8c, 0xc9, 0x4c, 0x3d, 0x4a, 0xf1,
    0x7f, 0x58, 0xda, 0xee, 0x08, 0x9b, 0xa1, 0xfd, 0x44, 0xe3, 0xdb, 0xd9, 0x8a, 0x00, 0x00,
    0x00, 0x00,
];

/// The "RecentBlockhashes" system variable.
/// Base58: `SysvarRecentB1ockHashes11111111111111111111`
pub const RECENT_BLOCKHASHES_SYSVAR: PublicKey = [
    0x06, 0xa7, 0xd5, 0x17, 0x19, 0x2c, 0x56, 0x8e, 0xe0, 0x8a, 0x84, 0x5f, 0x73, 0xd2, 0x97,
    0x88, 0xcf, 0x03, 0x5c, 0x31, 0x45, 0xb2, 0x1a, 0xb3, 0x44, 0xd8, 0x06, 0x2e, 0xa9, 0x40,
    0x00, 0x00,
];

const COMMAND_CREATE_ACCOUNT: u32 = 0;
const COMMAND_ADVANCE_NONCE: u32 = 4;

/// Size of a nonce account's data.
const NONCE_ACCOUNT_SIZE: usize = 80;

/// Build a `CreateAccount` instruction.
///
/// Data layout: u32 LE command (0), u64 LE lamports, u64 LE size, then the
/// 32-byte owner key. Both the funder and the new address sign.
pub fn create_account(
    funder: &PublicKey,
    address: &PublicKey,
    owner: &PublicKey,
    lamports: u64,
    size: u64,
) -> Instruction {
    let mut data = Vec::with_capacity(4 + 8 + 8 + 32);
    data.extend_from_slice(&COMMAND_CREATE_ACCOUNT.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    data.extend_from_slice(&size.to_le_bytes());
    data.extend_from_slice(owner);

    Instruction::new(
        PROGRAM_KEY,
        data,
        vec![
            AccountMeta::new(*funder, true),
            AccountMeta::new(*address, true),
        ],
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompiledCreateAccount {
    pub funder: PublicKey,
    pub address: PublicKey,
    pub lamports: u64,
    pub size: u64,
    pub owner: PublicKey,
}

/// Decompile a `CreateAccount` instruction at `index`.
pub fn decompile_create_account(
    message: &Message,
    index: usize,
) -> Result<DecompiledCreateAccount, SolanaError> {
    let ix = instruction_at(message, index)?;

    if instruction_program(message, ix)? != &PROGRAM_KEY {
        return Err(SolanaError::IncorrectProgram);
    }
    if ix.account_indices.len() != 2 {
        return Err(SolanaError::InvalidInstruction(format!(
            "invalid number of accounts: {}",
            ix.account_indices.len()
        )));
    }
    if ix.data.len() != 52 {
        return Err(SolanaError::InvalidInstruction(format!(
            "invalid instruction data size: {}",
            ix.data.len()
        )));
    }
    let command = u32::from_le_bytes([ix.data[0], ix.data[1], ix.data[2], ix.data[3]]);
    if command != COMMAND_CREATE_ACCOUNT {
        return Err(SolanaError::IncorrectInstruction);
    }

    let mut lamports = [0u8; 8];
    lamports.copy_from_slice(&ix.data[4..12]);
    let mut size = [0u8; 8];
    size.copy_from_slice(&ix.data[12..20]);
    let mut owner = [0u8; 32];
    owner.copy_from_slice(&ix.data[20..52]);

    Ok(DecompiledCreateAccount {
        funder: instruction_account(message, ix, 0)?,
        address: instruction_account(message, ix, 1)?,
        lamports: u64::from_le_bytes(lamports),
        size: u64::from_le_bytes(size),
        owner,
    })
}

/// Build an `AdvanceNonce` instruction.
pub fn advance_nonce(account: &PublicKey, authority: &PublicKey) -> Instruction {
    Instruction::new(
        PROGRAM_KEY,
        COMMAND_ADVANCE_NONCE.to_le_bytes().to_vec(),
        vec![
            AccountMeta::new(*account, true),
            AccountMeta::new_readonly(RECENT_BLOCKHASHES_SYSVAR, false),
            AccountMeta::new_readonly(*authority, true),
        ],
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompiledAdvanceNonce {
    pub account: PublicKey,
    pub authority: PublicKey,
}

/// Decompile an `AdvanceNonce` instruction at `index`.
pub fn decompile_advance_nonce(
    message: &Message,
    index: usize,
) -> Result<DecompiledAdvanceNonce, SolanaError> {
    let ix = instruction_at(message, index)?;

    if instruction_program(message, ix)? != &PROGRAM_KEY {
        return Err(SolanaError::IncorrectProgram);
    }
    if ix.account_indices.len() != 3 {
        return Err(SolanaError::InvalidInstruction(format!(
            "invalid number of accounts: {}",
            ix.account_indices.len()
        )));
    }
    if ix.data.len() != 4
        || u32::from_le_bytes([ix.data[0], ix.data[1], ix.data[2], ix.data[3]])
            != COMMAND_ADVANCE_NONCE
    {
        return Err(SolanaError::IncorrectInstruction);
    }
    if instruction_account(message, ix, 1)? != RECENT_BLOCKHASHES_SYSVAR {
        return Err(SolanaError::InvalidInstruction(
            "invalid recent blockhashes sysvar".into(),
        ));
    }

    Ok(DecompiledAdvanceNonce {
        account: instruction_account(message, ix, 0)?,
        authority: instruction_account(message, ix, 2)?,
    })
}

/// Extract the nonce value (a blockhash) from a nonce account's data.
///
/// Layout: u32 version, u32 size, 32-byte authority, then the 32-byte value.
pub fn nonce_value_from_account(
    owner: &PublicKey,
    data: &[u8],
) -> Result<Blockhash, SolanaError> {
    if data.len() != NONCE_ACCOUNT_SIZE {
        return Err(SolanaError::InvalidNonceAccount(format!(
            "invalid nonce account size: {}",
            data.len()
        )));
    }
    if owner != &PROGRAM_KEY {
        return Err(SolanaError::InvalidNonceAccount(
            "not owned by the system program".into(),
        ));
    }

    let mut value = [0u8; 32];
    value.copy_from_slice(&data[40..72]);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::public_key_to_base58;
    use crate::transaction::Transaction;

    #[test]
    fn sysvar_constants_match_canonical_base58() {
        assert_eq!(
            public_key_to_base58(&PROGRAM_KEY),
            "11111111111111111111111111111111"
        );
        assert_eq!(
            public_key_to_base58(&RENT_SYSVAR),
            "SysvarRent111111111111111111111111111111111"
        );
        assert_eq!(
            public_key_to_base58(&RECENT_BLOCKHASHES_SYSVAR),
            "SysvarRecentB1ockHashes11111111111111111111"
        );
    }

    #[test]
    fn create_account_data_layout() {
        let ix = create_account(&[1; 32], &[2; 32], &[3; 32], 12345, 165);

        assert_eq!(ix.data.len(), 52);
        assert_eq!(&ix.data[..4], &[0, 0, 0, 0]);
        assert_eq!(&ix.data[4..12], &12345u64.to_le_bytes());
        assert_eq!(&ix.data[12..20], &165u64.to_le_bytes());
        assert_eq!(&ix.data[20..52], &[3; 32]);

        assert_eq!(ix.accounts.len(), 2);
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert!(ix.accounts[1].is_signer && ix.accounts[1].is_writable);
    }

    #[test]
    fn create_account_roundtrip() {
        let ix = create_account(&[1; 32], &[2; 32], &[3; 32], 500, 165);
        let tx = Transaction::new(&[9; 32], &[ix], [0u8; 32]).unwrap();

        let decompiled = decompile_create_account(&tx.message, 0).unwrap();
        assert_eq!(decompiled.funder, [1; 32]);
        assert_eq!(decompiled.address, [2; 32]);
        assert_eq!(decompiled.owner, [3; 32]);
        assert_eq!(decompiled.lamports, 500);
        assert_eq!(decompiled.size, 165);
    }

    #[test]
    fn decompile_create_account_rejects_wrong_program() {
        let mut ix = create_account(&[1; 32], &[2; 32], &[3; 32], 500, 165);
        ix.program = [7; 32];
        let tx = Transaction::new(&[9; 32], &[ix], [0u8; 32]).unwrap();

        assert!(matches!(
            decompile_create_account(&tx.message, 0),
            Err(SolanaError::IncorrectProgram)
        ));
    }

    #[test]
    fn decompile_create_account_rejects_wrong_command() {
        let mut ix = create_account(&[1; 32], &[2; 32], &[3; 32], 500, 165);
        ix.data[0] = 2;
        let tx = Transaction::new(&[9; 32], &[ix], [0u8; 32]).unwrap();

        assert!(matches!(
            decompile_create_account(&tx.message, 0),
            Err(SolanaError::IncorrectInstruction)
        ));
    }

    #[test]
    fn decompile_create_account_rejects_wrong_data_size() {
        let mut ix = create_account(&[1; 32], &[2; 32], &[3; 32], 500, 165);
        ix.data.pop();
        let tx = Transaction::new(&[9; 32], &[ix], [0u8; 32]).unwrap();

        assert!(decompile_create_account(&tx.message, 0).is_err());
    }

    #[test]
    fn decompile_create_account_rejects_missing_index() {
        let ix = create_account(&[1; 32], &[2; 32], &[3; 32], 500, 165);
        let tx = Transaction::new(&[9; 32], &[ix], [0u8; 32]).unwrap();

        assert!(decompile_create_account(&tx.message, 1).is_err());
    }

    #[test]
    fn advance_nonce_roundtrip() {
        let ix = advance_nonce(&[1; 32], &[2; 32]);
        assert_eq!(ix.data, vec![4, 0, 0, 0]);
        assert_eq!(ix.accounts.len(), 3);
        assert_eq!(ix.accounts[1].pubkey, RECENT_BLOCKHASHES_SYSVAR);
        assert!(!ix.accounts[1].is_signer && !ix.accounts[1].is_writable);
        assert!(ix.accounts[2].is_signer && !ix.accounts[2].is_writable);

        let tx = Transaction::new(&[9; 32], &[ix], [0u8; 32]).unwrap();
        let decompiled = decompile_advance_nonce(&tx.message, 0).unwrap();
        assert_eq!(decompiled.account, [1; 32]);
        assert_eq!(decompiled.authority, [2; 32]);
    }

    #[test]
    fn nonce_value_extraction() {
        let mut data = vec![0u8; 80];
        data[40..72].copy_from_slice(&[0xAB; 32]);

        let value = nonce_value_from_account(&PROGRAM_KEY, &data).unwrap();
        assert_eq!(value, [0xAB; 32]);
    }

    #[test]
    fn nonce_value_rejects_wrong_size() {
        assert!(matches!(
            nonce_value_from_account(&PROGRAM_KEY, &[0u8; 79]),
            Err(SolanaError::InvalidNonceAccount(_))
        ));
    }

    #[test]
    fn nonce_value_rejects_wrong_owner() {
        assert!(matches!(
            nonce_value_from_account(&[1; 32], &[0u8; 80]),
            Err(SolanaError::InvalidNonceAccount(_))
        ));
    }
}
