//! SPL token program instructions, associated accounts, and account state.
//!
//! Covers the four commands the Kin flows use (`InitializeAccount`,
//! `Transfer`, `SetAuthority`, `CloseAccount`), associated-token-account
//! derivation and creation, and the 165-byte on-ledger token account layout.

use crate::error::SolanaError;
use crate::keys::PublicKey;
use crate::pda::find_program_address;
use crate::system;
use crate::transaction::{
    instruction_account, instruction_at, instruction_program, AccountMeta, Instruction,
    Message,
};

/// The SPL token program.
/// Base58: `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const PROGRAM_KEY: PublicKey = [
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79,
    0xac, 0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff,
    0x00, 0xa9,
];

/// The associated token account program.
/// Base58: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_KEY: PublicKey = [
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d,
    0x83, 0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9,
    0xf8, 0x59,
];

/// Size of a token account's on-ledger data.
pub const ACCOUNT_SIZE: usize = 165;

pub const COMMAND_INITIALIZE_ACCOUNT: u8 = 1;
pub const COMMAND_TRANSFER: u8 = 3;
pub const COMMAND_SET_AUTHORITY: u8 = 6;
pub const COMMAND_CLOSE_ACCOUNT: u8 = 9;

/// The command tag (first data byte) of the token instruction at `index`.
pub fn command(message: &Message, index: usize) -> Result<u8, SolanaError> {
    let ix = instruction_at(message, index)?;
    if instruction_program(message, ix)? != &PROGRAM_KEY {
        return Err(SolanaError::IncorrectProgram);
    }
    ix.data
        .first()
        .copied()
        .ok_or_else(|| SolanaError::InvalidInstruction("empty instruction data".into()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AuthorityType {
    MintTokens = 0,
    FreezeAccount = 1,
    AccountHolder = 2,
    CloseAccount = 3,
}

impl TryFrom<u8> for AuthorityType {
    type Error = SolanaError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AuthorityType::MintTokens),
            1 => Ok(AuthorityType::FreezeAccount),
            2 => Ok(AuthorityType::AccountHolder),
            3 => Ok(AuthorityType::CloseAccount),
            other => Err(SolanaError::InvalidInstruction(format!(
                "invalid authority type: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

/// Build an `InitializeAccount` instruction.
///
/// Accounts: the account to initialize (writable), the mint, the owner, and
/// the rent sysvar; the last three read-only.
pub fn initialize_account(
    account: &PublicKey,
    mint: &PublicKey,
    owner: &PublicKey,
) -> Instruction {
    Instruction::new(
        PROGRAM_KEY,
        vec![COMMAND_INITIALIZE_ACCOUNT],
        vec![
            AccountMeta::new(*account, true),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(*owner, false),
            AccountMeta::new_readonly(system::RENT_SYSVAR, false),
        ],
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompiledInitializeAccount {
    pub account: PublicKey,
    pub mint: PublicKey,
    pub owner: PublicKey,
}

pub fn decompile_initialize_account(
    message: &Message,
    index: usize,
) -> Result<DecompiledInitializeAccount, SolanaError> {
    let ix = instruction_at(message, index)?;

    if instruction_program(message, ix)? != &PROGRAM_KEY {
        return Err(SolanaError::IncorrectProgram);
    }
    if ix.data != [COMMAND_INITIALIZE_ACCOUNT] {
        return Err(SolanaError::IncorrectInstruction);
    }
    if ix.account_indices.len() != 4 {
        return Err(SolanaError::InvalidInstruction(format!(
            "invalid number of accounts: {}",
            ix.account_indices.len()
        )));
    }
    if instruction_account(message, ix, 3)? != system::RENT_SYSVAR {
        return Err(SolanaError::InvalidInstruction("invalid rent sysvar".into()));
    }

    Ok(DecompiledInitializeAccount {
        account: instruction_account(message, ix, 0)?,
        mint: instruction_account(message, ix, 1)?,
        owner: instruction_account(message, ix, 2)?,
    })
}

/// Build a `SetAuthority` instruction.
///
/// Data: command, authority type, presence flag, then the 32-byte key when a
/// new authority is provided. Clearing an authority omits the key.
pub fn set_authority(
    account: &PublicKey,
    current_authority: &PublicKey,
    new_authority: Option<&PublicKey>,
    authority_type: AuthorityType,
) -> Instruction {
    let mut data = vec![COMMAND_SET_AUTHORITY, authority_type as u8, 0];
    if let Some(new_authority) = new_authority {
        data[2] = 1;
        data.extend_from_slice(new_authority);
    }

    Instruction::new(
        PROGRAM_KEY,
        data,
        vec![
            AccountMeta::new(*account, false),
            AccountMeta::new_readonly(*current_authority, true),
        ],
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompiledSetAuthority {
    pub account: PublicKey,
    pub current_authority: PublicKey,
    pub new_authority: Option<PublicKey>,
    pub authority_type: AuthorityType,
}

pub fn decompile_set_authority(
    message: &Message,
    index: usize,
) -> Result<DecompiledSetAuthority, SolanaError> {
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
    if ix.data.len() < 3 {
        return Err(SolanaError::InvalidInstruction(format!(
            "invalid data size: {} (expect at least 3)",
            ix.data.len()
        )));
    }
    if ix.data[0] != COMMAND_SET_AUTHORITY {
        return Err(SolanaError::IncorrectInstruction);
    }
    if ix.data[2] == 0 && ix.data.len() != 3 {
        return Err(SolanaError::InvalidInstruction(format!(
            "invalid data size: {} (expect 3)",
            ix.data.len()
        )));
    }
    if ix.data[2] == 1 && ix.data.len() != 35 {
        return Err(SolanaError::InvalidInstruction(format!(
            "invalid data size: {} (expect 35)",
            ix.data.len()
        )));
    }
    if ix.data[2] > 1 {
        return Err(SolanaError::InvalidInstruction(format!(
            "invalid authority presence flag: {}",
            ix.data[2]
        )));
    }

    let new_authority = if ix.data[2] == 1 {
        let mut key = [0u8; 32];
        key.copy_from_slice(&ix.data[3..35]);
        Some(key)
    } else {
        None
    };

    Ok(DecompiledSetAuthority {
        account: instruction_account(message, ix, 0)?,
        current_authority: instruction_account(message, ix, 1)?,
        new_authority,
        authority_type: AuthorityType::try_from(ix.data[1])?,
    })
}

/// Build a `Transfer` instruction moving `amount` base units.
pub fn transfer(
    source: &PublicKey,
    destination: &PublicKey,
    owner: &PublicKey,
    amount: u64,
) -> Instruction {
    let mut data = Vec::with_capacity(9);
    data.push(COMMAND_TRANSFER);
    data.extend_from_slice(&amount.to_le_bytes());

    Instruction::new(
        PROGRAM_KEY,
        data,
        vec![
            AccountMeta::new(*source, false),
            AccountMeta::new(*destination, false),
            AccountMeta::new(*owner, true),
        ],
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompiledTransfer {
    pub source: PublicKey,
    pub destination: PublicKey,
    pub owner: PublicKey,
    pub amount: u64,
}

pub fn decompile_transfer(
    message: &Message,
    index: usize,
) -> Result<DecompiledTransfer, SolanaError> {
    let ix = instruction_at(message, index)?;

    if instruction_program(message, ix)? != &PROGRAM_KEY {
        return Err(SolanaError::IncorrectProgram);
    }
    if ix.data.first() != Some(&COMMAND_TRANSFER) {
        return Err(SolanaError::IncorrectInstruction);
    }
    if ix.account_indices.len() != 3 {
        return Err(SolanaError::InvalidInstruction(format!(
            "invalid number of accounts: {}",
            ix.account_indices.len()
        )));
    }
    if ix.data.len() != 9 {
        return Err(SolanaError::InvalidInstruction(format!(
            "invalid instruction data size: {}",
            ix.data.len()
        )));
    }

    let mut amount = [0u8; 8];
    amount.copy_from_slice(&ix.data[1..9]);

    Ok(DecompiledTransfer {
        source: instruction_account(message, ix, 0)?,
        destination: instruction_account(message, ix, 1)?,
        owner: instruction_account(message, ix, 2)?,
        amount: u64::from_le_bytes(amount),
    })
}

/// Build a `CloseAccount` instruction, reclaiming the account's lamports to
/// `destination`.
pub fn close_account(
    account: &PublicKey,
    destination: &PublicKey,
    owner: &PublicKey,
) -> Instruction {
    Instruction::new(
        PROGRAM_KEY,
        vec![COMMAND_CLOSE_ACCOUNT],
        vec![
            AccountMeta::new(*account, false),
            AccountMeta::new(*destination, false),
            AccountMeta::new_readonly(*owner, true),
        ],
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompiledCloseAccount {
    pub account: PublicKey,
    pub destination: PublicKey,
    pub owner: PublicKey,
}

pub fn decompile_close_account(
    message: &Message,
    index: usize,
) -> Result<DecompiledCloseAccount, SolanaError> {
    let ix = instruction_at(message, index)?;

    if instruction_program(message, ix)? != &PROGRAM_KEY {
        return Err(SolanaError::IncorrectProgram);
    }
    if ix.data != [COMMAND_CLOSE_ACCOUNT] {
        return Err(SolanaError::IncorrectInstruction);
    }
    if ix.account_indices.len() != 3 {
        return Err(SolanaError::InvalidInstruction(format!(
            "invalid number of accounts: {}",
            ix.account_indices.len()
        )));
    }

    Ok(DecompiledCloseAccount {
        account: instruction_account(message, ix, 0)?,
        destination: instruction_account(message, ix, 1)?,
        owner: instruction_account(message, ix, 2)?,
    })
}

// ---------------------------------------------------------------------------
// Associated token accounts
// ---------------------------------------------------------------------------

/// Derive the associated token account address for a wallet + mint pair.
///
/// Seeds: `[wallet, token_program, mint]` under the associated token
/// program.
pub fn get_associated_account(
    wallet: &PublicKey,
    mint: &PublicKey,
) -> Result<PublicKey, SolanaError> {
    find_program_address(
        &[wallet.as_ref(), &PROGRAM_KEY, mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_KEY,
    )
}

/// Build a `CreateAssociatedAccount` instruction, returning it together with
/// the derived account address.
pub fn create_associated_account(
    subsidizer: &PublicKey,
    wallet: &PublicKey,
    mint: &PublicKey,
) -> Result<(Instruction, PublicKey), SolanaError> {
    let address = get_associated_account(wallet, mint)?;

    let instruction = Instruction::new(
        ASSOCIATED_TOKEN_PROGRAM_KEY,
        vec![],
        vec![
            AccountMeta::new(*subsidizer, true),
            AccountMeta::new(address, false),
            AccountMeta::new_readonly(*wallet, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(system::PROGRAM_KEY, false),
            AccountMeta::new_readonly(PROGRAM_KEY, false),
            AccountMeta::new_readonly(system::RENT_SYSVAR, false),
        ],
    );

    Ok((instruction, address))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompiledCreateAssociatedAccount {
    pub subsidizer: PublicKey,
    pub address: PublicKey,
    pub owner: PublicKey,
    pub mint: PublicKey,
}

pub fn decompile_create_associated_account(
    message: &Message,
    index: usize,
) -> Result<DecompiledCreateAssociatedAccount, SolanaError> {
    let ix = instruction_at(message, index)?;

    if instruction_program(message, ix)? != &ASSOCIATED_TOKEN_PROGRAM_KEY {
        return Err(SolanaError::IncorrectProgram);
    }
    if !ix.data.is_empty() {
        return Err(SolanaError::IncorrectInstruction);
    }
    if ix.account_indices.len() != 7 {
        return Err(SolanaError::InvalidInstruction(format!(
            "invalid number of accounts: {}",
            ix.account_indices.len()
        )));
    }
    if instruction_account(message, ix, 4)? != system::PROGRAM_KEY {
        return Err(SolanaError::InvalidInstruction(
            "invalid system program key".into(),
        ));
    }
    if instruction_account(message, ix, 5)? != PROGRAM_KEY {
        return Err(SolanaError::InvalidInstruction(
            "invalid token program key".into(),
        ));
    }
    if instruction_account(message, ix, 6)? != system::RENT_SYSVAR {
        return Err(SolanaError::InvalidInstruction("invalid rent sysvar".into()));
    }

    Ok(DecompiledCreateAssociatedAccount {
        subsidizer: instruction_account(message, ix, 0)?,
        address: instruction_account(message, ix, 1)?,
        owner: instruction_account(message, ix, 2)?,
        mint: instruction_account(message, ix, 3)?,
    })
}

// ---------------------------------------------------------------------------
// Token account state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum AccountState {
    #[default]
    Uninitialized = 0,
    Initialized = 1,
    Frozen = 2,
}

impl TryFrom<u8> for AccountState {
    type Error = SolanaError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AccountState::Uninitialized),
            1 => Ok(AccountState::Initialized),
            2 => Ok(AccountState::Frozen),
            other => Err(SolanaError::MalformedFraming(format!(
                "invalid token account state: {other}"
            ))),
        }
    }
}

/// The 165-byte on-ledger token account.
///
/// Optional fields are encoded as a 4-byte little-endian presence
/// discriminant followed by the payload; absent fields still occupy their
/// full fixed width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenAccount {
    pub mint: PublicKey,
    pub owner: PublicKey,
    pub amount: u64,
    pub delegate: Option<PublicKey>,
    pub state: AccountState,
    pub is_native: Option<u64>,
    pub delegated_amount: u64,
    pub close_authority: Option<PublicKey>,
}

impl TokenAccount {
    pub fn marshal(&self) -> [u8; ACCOUNT_SIZE] {
        let mut b = [0u8; ACCOUNT_SIZE];

        b[0..32].copy_from_slice(&self.mint);
        b[32..64].copy_from_slice(&self.owner);
        b[64..72].copy_from_slice(&self.amount.to_le_bytes());
        write_optional_key(&mut b[72..108], self.delegate.as_ref());
        b[108] = self.state as u8;
        write_optional_u64(&mut b[109..121], self.is_native);
        b[121..129].copy_from_slice(&self.delegated_amount.to_le_bytes());
        write_optional_key(&mut b[129..165], self.close_authority.as_ref());

        b
    }

    pub fn unmarshal(data: &[u8]) -> Result<TokenAccount, SolanaError> {
        if data.len() != ACCOUNT_SIZE {
            return Err(SolanaError::MalformedFraming(format!(
                "invalid token account size: {}",
                data.len()
            )));
        }

        let mut mint = [0u8; 32];
        mint.copy_from_slice(&data[0..32]);
        let mut owner = [0u8; 32];
        owner.copy_from_slice(&data[32..64]);
        let mut amount = [0u8; 8];
        amount.copy_from_slice(&data[64..72]);
        let mut delegated_amount = [0u8; 8];
        delegated_amount.copy_from_slice(&data[121..129]);

        Ok(TokenAccount {
            mint,
            owner,
            amount: u64::from_le_bytes(amount),
            delegate: read_optional_key(&data[72..108])?,
            state: AccountState::try_from(data[108])?,
            is_native: read_optional_u64(&data[109..121])?,
            delegated_amount: u64::from_le_bytes(delegated_amount),
            close_authority: read_optional_key(&data[129..165])?,
        })
    }
}

fn write_optional_key(dst: &mut [u8], key: Option<&PublicKey>) {
    if let Some(key) = key {
        dst[0] = 1;
        dst[4..36].copy_from_slice(key);
    }
}

fn write_optional_u64(dst: &mut [u8], value: Option<u64>) {
    if let Some(value) = value {
        dst[0] = 1;
        dst[4..12].copy_from_slice(&value.to_le_bytes());
    }
}

fn read_coption_discriminant(src: &[u8]) -> Result<bool, SolanaError> {
    let discriminant = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
    match discriminant {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(SolanaError::MalformedFraming(format!(
            "invalid COption discriminant: {other}"
        ))),
    }
}

fn read_optional_key(src: &[u8]) -> Result<Option<PublicKey>, SolanaError> {
    if !read_coption_discriminant(src)? {
        return Ok(None);
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&src[4..36]);
    Ok(Some(key))
}

fn read_optional_u64(src: &[u8]) -> Result<Option<u64>, SolanaError> {
    if !read_coption_discriminant(src)? {
        return Ok(None);
    }
    let mut value = [0u8; 8];
    value.copy_from_slice(&src[4..12]);
    Ok(Some(u64::from_le_bytes(value)))
}
