//! Memo program instructions.
//!
//! A memo instruction carries the UTF-8 bytes of its memo string as
//! instruction data and references no accounts. Higher layers decide how to
//! interpret the bytes (e.g. a base64-encoded binary memo).

use crate::error::SolanaError;
use crate::keys::PublicKey;
use crate::transaction::{instruction_at, instruction_program, Instruction, Message};

/// The memo program.
/// Base58: `MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr`
pub const PROGRAM_KEY: PublicKey = [
    0x05, 0x4a, 0x53, 0x5a, 0x99, 0x29, 0x21, 0x06, 0x4d, 0x24, 0xe8, 0x71, 0x60, 0xda, 0x38,
    0x7c, 0x7c, 0x35, 0xb5, 0xdd, 0xbc, 0x92, 0xbb, 0x81, 0xe4, 0x1f, 0xa8, 0x40, 0x41, 0x05,
    0x44, 0x8d,
];

/// Build a memo instruction carrying the given string.
pub fn memo_instruction(memo: &str) -> Instruction {
    Instruction::new(PROGRAM_KEY, memo.as_bytes().to_vec(), vec![])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompiledMemo {
    pub data: Vec<u8>,
}

/// Decompile the memo instruction at `index`, yielding its raw data bytes
/// unchanged.
pub fn decompile_memo(message: &Message, index: usize) -> Result<DecompiledMemo, SolanaError> {
    let ix = instruction_at(message, index)?;

    if instruction_program(message, ix)? != &PROGRAM_KEY {
        return Err(SolanaError::IncorrectProgram);
    }

    Ok(DecompiledMemo {
        data: ix.data.clone(),
    })
}
