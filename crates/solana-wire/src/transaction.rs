//! Solana transaction wire format.
//!
//! The wire format is a compact binary layout:
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```
//!
//! The message bytes double as the signing payload: `sign` serializes the
//! message once and every signer signs those exact bytes. Encoding is
//! deterministic, so decode followed by encode is byte-identical.

use crate::error::SolanaError;
use crate::keys::{derive_public_key, sign_message, verify_signature};
use crate::keys::{Blockhash, PrivateKey, PublicKey, Signature};

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` value in the ledger's compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 value from a byte slice.
///
/// Returns `(value, bytes_consumed)`. The encoding is at most 3 bytes and the
/// maximum representable value is 0xFFFF; truncated input, an over-long
/// encoding, and values above 0xFFFF all fail.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), SolanaError> {
    let mut value: u32 = 0;

    for (i, &byte) in data.iter().take(3).enumerate() {
        value |= ((byte & 0x7f) as u32) << (7 * i);

        if byte & 0x80 == 0 {
            if value > u16::MAX as u32 {
                return Err(SolanaError::MalformedFraming(
                    "compact-u16 value overflow".into(),
                ));
            }
            return Ok((value as u16, i + 1));
        }
    }

    if data.len() < 3 {
        return Err(SolanaError::MalformedFraming(
            "unexpected end of data while decoding compact-u16".into(),
        ));
    }
    Err(SolanaError::MalformedFraming(
        "compact-u16 encoding too long".into(),
    ))
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A single account reference in an instruction, before compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: PublicKey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    /// A writable account reference.
    pub fn new(pubkey: PublicKey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    /// A read-only account reference.
    pub fn new_readonly(pubkey: PublicKey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// An instruction referencing its accounts by public key (before it is
/// compiled into a transaction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program: PublicKey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

impl Instruction {
    pub fn new(program: PublicKey, data: Vec<u8>, accounts: Vec<AccountMeta>) -> Self {
        Self {
            program,
            accounts,
            data,
        }
    }
}

/// An instruction whose account references have been replaced by u8 indices
/// into the message's account table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// The three counts that partition the account table.
///
/// The first `num_required_signatures` accounts are signers, of which the
/// last `num_readonly_signed` are read-only. Of the remaining non-signers,
/// the last `num_readonly_unsigned` are read-only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
}

/// The signed portion of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub accounts: Vec<PublicKey>,
    pub recent_blockhash: Blockhash,
    pub instructions: Vec<CompiledInstruction>,
}

/// A complete transaction: signature slots plus the message they cover.
///
/// The signature vector is pre-allocated with all-zero entries when the
/// transaction is built; an all-zero entry is an unsigned slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    pub signatures: Vec<Signature>,
    pub message: Message,
}

fn truncated(section: &str) -> SolanaError {
    SolanaError::MalformedFraming(format!("unexpected end of data in {section}"))
}

fn read_array<const N: usize>(data: &[u8], offset: usize, section: &str) -> Result<[u8; N], SolanaError> {
    let chunk = data
        .get(offset..offset + N)
        .ok_or_else(|| truncated(section))?;
    chunk
        .try_into()
        .map_err(|_| truncated(section))
}

// ---------------------------------------------------------------------------
// Message codec
// ---------------------------------------------------------------------------

impl Message {
    /// The program key invoked by the instruction at `instruction_index`.
    pub fn program_key(&self, instruction_index: usize) -> Option<&PublicKey> {
        let ix = self.instructions.get(instruction_index)?;
        self.accounts.get(ix.program_index as usize)
    }

    /// Serialize the message. These are the bytes that get signed.
    pub fn marshal(&self) -> Result<Vec<u8>, SolanaError> {
        let mut buf = Vec::with_capacity(256);

        buf.push(self.header.num_required_signatures);
        buf.push(self.header.num_readonly_signed);
        buf.push(self.header.num_readonly_unsigned);

        buf.extend_from_slice(&encode_compact_u16(compact_len(self.accounts.len(), "accounts")?));
        for key in &self.accounts {
            buf.extend_from_slice(key);
        }

        buf.extend_from_slice(&self.recent_blockhash);

        buf.extend_from_slice(&encode_compact_u16(compact_len(
            self.instructions.len(),
            "instructions",
        )?));
        for ix in &self.instructions {
            buf.push(ix.program_index);

            buf.extend_from_slice(&encode_compact_u16(compact_len(
                ix.account_indices.len(),
                "instruction accounts",
            )?));
            buf.extend_from_slice(&ix.account_indices);

            buf.extend_from_slice(&encode_compact_u16(compact_len(
                ix.data.len(),
                "instruction data",
            )?));
            buf.extend_from_slice(&ix.data);
        }

        Ok(buf)
    }

    /// Deserialize a message, consuming the whole input.
    ///
    /// Beyond framing, this enforces the structural invariants of the account
    /// table: unique keys, header counts that fit the table, every index in
    /// range, and no program account in the writable-signer prefix.
    pub fn unmarshal(data: &[u8]) -> Result<Message, SolanaError> {
        if data.len() < 3 {
            return Err(truncated("message header"));
        }
        let header = MessageHeader {
            num_required_signatures: data[0],
            num_readonly_signed: data[1],
            num_readonly_unsigned: data[2],
        };
        let mut offset = 3;

        let (account_count, consumed) = decode_compact_u16(&data[offset..])?;
        offset += consumed;

        let mut accounts: Vec<PublicKey> = Vec::with_capacity(account_count as usize);
        for _ in 0..account_count {
            accounts.push(read_array::<32>(data, offset, "account keys")?);
            offset += 32;
        }

        for i in 0..accounts.len() {
            for j in i + 1..accounts.len() {
                if accounts[i] == accounts[j] {
                    return Err(SolanaError::DuplicateAccount);
                }
            }
        }

        let num_required = header.num_required_signatures as usize;
        if num_required > accounts.len()
            || header.num_readonly_signed as usize > num_required
            || header.num_readonly_unsigned as usize > accounts.len() - num_required
        {
            return Err(SolanaError::MalformedFraming(
                "header counts exceed account table".into(),
            ));
        }

        let recent_blockhash = read_array::<32>(data, offset, "recent blockhash")?;
        offset += 32;

        let (instruction_count, consumed) = decode_compact_u16(&data[offset..])?;
        offset += consumed;

        let writable_signers = num_required - header.num_readonly_signed as usize;

        let mut instructions = Vec::with_capacity(instruction_count as usize);
        for _ in 0..instruction_count {
            let program_index = *data.get(offset).ok_or_else(|| truncated("program index"))?;
            offset += 1;

            if program_index as usize >= accounts.len() {
                return Err(SolanaError::IndexOutOfRange(program_index as usize));
            }
            if (program_index as usize) < writable_signers {
                return Err(SolanaError::MalformedFraming(
                    "program account is a writable signer".into(),
                ));
            }

            let (index_count, consumed) = decode_compact_u16(&data[offset..])?;
            offset += consumed;

            let account_indices = data
                .get(offset..offset + index_count as usize)
                .ok_or_else(|| truncated("account indices"))?
                .to_vec();
            offset += index_count as usize;

            for &index in &account_indices {
                if index as usize >= accounts.len() {
                    return Err(SolanaError::IndexOutOfRange(index as usize));
                }
            }

            let (data_len, consumed) = decode_compact_u16(&data[offset..])?;
            offset += consumed;

            let ix_data = data
                .get(offset..offset + data_len as usize)
                .ok_or_else(|| truncated("instruction data"))?
                .to_vec();
            offset += data_len as usize;

            instructions.push(CompiledInstruction {
                program_index,
                account_indices,
                data: ix_data,
            });
        }

        if offset != data.len() {
            return Err(SolanaError::MalformedFraming(
                "trailing bytes after message".into(),
            ));
        }

        Ok(Message {
            header,
            accounts,
            recent_blockhash,
            instructions,
        })
    }
}

fn compact_len(len: usize, section: &str) -> Result<u16, SolanaError> {
    u16::try_from(len)
        .map_err(|_| SolanaError::MalformedFraming(format!("{section} length exceeds u16")))
}

// ---------------------------------------------------------------------------
// Transaction building
// ---------------------------------------------------------------------------

impl Transaction {
    /// Compile a set of instructions into a transaction.
    ///
    /// The payer (subsidizer) is always the first account and a writable
    /// signer. Keys referenced by multiple instructions are de-duplicated,
    /// OR-ing their privileges, and the table is ordered canonically:
    /// writable signers, read-only signers, writable non-signers, read-only
    /// non-signers, with insertion order preserved within each group.
    ///
    /// The signature vector is allocated with one zeroed slot per required
    /// signer; `sign` fills slots in place.
    pub fn new(
        payer: &PublicKey,
        instructions: &[Instruction],
        recent_blockhash: Blockhash,
    ) -> Result<Transaction, SolanaError> {
        struct AccountEntry {
            pubkey: PublicKey,
            is_signer: bool,
            is_writable: bool,
        }

        let mut entries: Vec<AccountEntry> = Vec::new();

        let mut upsert = |pubkey: PublicKey, signer: bool, writable: bool| {
            if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
                entry.is_signer |= signer;
                entry.is_writable |= writable;
            } else {
                entries.push(AccountEntry {
                    pubkey,
                    is_signer: signer,
                    is_writable: writable,
                });
            }
        };

        upsert(*payer, true, true);

        for ix in instructions {
            for meta in &ix.accounts {
                upsert(meta.pubkey, meta.is_signer, meta.is_writable);
            }
            // Program IDs are non-signer, read-only accounts.
            upsert(ix.program, false, false);
        }

        if entries.len() > u8::MAX as usize {
            return Err(SolanaError::MalformedFraming(
                "account table exceeds 255 entries".into(),
            ));
        }

        // sort_by_key is stable, so insertion order (payer first) survives
        // within each privilege group.
        entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
            (true, true) => 0u8,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        });

        let num_signers = entries.iter().filter(|e| e.is_signer).count();
        let num_readonly_signed = entries
            .iter()
            .filter(|e| e.is_signer && !e.is_writable)
            .count();
        let num_readonly_unsigned = entries
            .iter()
            .filter(|e| !e.is_signer && !e.is_writable)
            .count();

        let accounts: Vec<PublicKey> = entries.iter().map(|e| e.pubkey).collect();

        let position = |key: &PublicKey| -> Result<u8, SolanaError> {
            accounts
                .iter()
                .position(|k| k == key)
                .map(|p| p as u8)
                .ok_or_else(|| SolanaError::MalformedFraming("account not in table".into()))
        };

        let mut compiled = Vec::with_capacity(instructions.len());
        for ix in instructions {
            let program_index = position(&ix.program)?;

            let mut account_indices = Vec::with_capacity(ix.accounts.len());
            for meta in &ix.accounts {
                account_indices.push(position(&meta.pubkey)?);
            }

            compiled.push(CompiledInstruction {
                program_index,
                account_indices,
                data: ix.data.clone(),
            });
        }

        Ok(Transaction {
            signatures: vec![[0u8; 64]; num_signers],
            message: Message {
                header: MessageHeader {
                    num_required_signatures: num_signers as u8,
                    num_readonly_signed: num_readonly_signed as u8,
                    num_readonly_unsigned: num_readonly_unsigned as u8,
                },
                accounts,
                recent_blockhash,
                instructions: compiled,
            },
        })
    }

    /// Sign the transaction with each of the given private keys.
    ///
    /// Each key must correspond to an account in the required-signer prefix;
    /// its signature is written into the slot at that account's position.
    pub fn sign(&mut self, private_keys: &[PrivateKey]) -> Result<(), SolanaError> {
        let message_bytes = self.message.marshal()?;
        let num_required = self.message.header.num_required_signatures as usize;

        for private_key in private_keys {
            let public_key = derive_public_key(private_key);
            let slot = self
                .message
                .accounts
                .iter()
                .take(num_required)
                .position(|k| *k == public_key)
                .ok_or(SolanaError::UnknownSigner)?;

            let signature = sign_message(private_key, &message_bytes);
            match self.signatures.get_mut(slot) {
                Some(s) => *s = signature,
                None => {
                    return Err(SolanaError::MalformedFraming(
                        "signature slot not allocated".into(),
                    ))
                }
            }
        }

        Ok(())
    }

    /// Verify every required signature over the message.
    ///
    /// All-zero signatures are unsigned slots and are skipped; a missing slot
    /// or an invalid signature fails.
    pub fn verify_signatures(&self) -> Result<(), SolanaError> {
        let message_bytes = self.message.marshal()?;
        let num_required = self.message.header.num_required_signatures as usize;

        for i in 0..num_required {
            let signature = self
                .signatures
                .get(i)
                .ok_or(SolanaError::SignatureVerification)?;
            if signature.iter().all(|&b| b == 0) {
                continue;
            }

            let account = self
                .message
                .accounts
                .get(i)
                .ok_or(SolanaError::SignatureVerification)?;
            if !verify_signature(account, &message_bytes, signature) {
                return Err(SolanaError::SignatureVerification);
            }
        }

        Ok(())
    }

    /// Serialize the transaction into its wire format.
    pub fn marshal(&self) -> Result<Vec<u8>, SolanaError> {
        let message_bytes = self.message.marshal()?;

        let mut wire = Vec::with_capacity(3 + 64 * self.signatures.len() + message_bytes.len());
        wire.extend_from_slice(&encode_compact_u16(compact_len(
            self.signatures.len(),
            "signatures",
        )?));
        for signature in &self.signatures {
            wire.extend_from_slice(signature);
        }
        wire.extend_from_slice(&message_bytes);

        Ok(wire)
    }

    /// Deserialize a wire-format transaction, consuming the whole input.
    pub fn unmarshal(data: &[u8]) -> Result<Transaction, SolanaError> {
        let (signature_count, consumed) = decode_compact_u16(data)?;
        let mut offset = consumed;

        let mut signatures: Vec<Signature> = Vec::with_capacity(signature_count as usize);
        for _ in 0..signature_count {
            signatures.push(read_array::<64>(data, offset, "signatures")?);
            offset += 64;
        }

        let message = Message::unmarshal(&data[offset..])?;

        Ok(Transaction {
            signatures,
            message,
        })
    }
}

// ---------------------------------------------------------------------------
// Decompiler helpers
// ---------------------------------------------------------------------------

pub(crate) fn instruction_at<'a>(
    message: &'a Message,
    index: usize,
) -> Result<&'a CompiledInstruction, SolanaError> {
    message
        .instructions
        .get(index)
        .ok_or_else(|| SolanaError::InvalidInstruction(format!("no instruction at {index}")))
}

pub(crate) fn instruction_program<'a>(
    message: &'a Message,
    ix: &CompiledInstruction,
) -> Result<&'a PublicKey, SolanaError> {
    message
        .accounts
        .get(ix.program_index as usize)
        .ok_or(SolanaError::IndexOutOfRange(ix.program_index as usize))
}

pub(crate) fn instruction_account(
    message: &Message,
    ix: &CompiledInstruction,
    position: usize,
) -> Result<PublicKey, SolanaError> {
    let index = *ix.account_indices.get(position).ok_or_else(|| {
        SolanaError::InvalidInstruction(format!("missing account at position {position}"))
    })? as usize;
    message
        .accounts
        .get(index)
        .copied()
        .ok_or(SolanaError::IndexOutOfRange(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys;

    fn key(fill: u8) -> PublicKey {
        [fill; 32]
    }

    // -- compact-u16 encoding -----------------------------------------------

    #[test]
    fn compact_u16_zero() {
        assert_eq!(encode_compact_u16(0), vec![0x00]);
    }

    #[test]
    fn compact_u16_one_byte_max() {
        assert_eq!(encode_compact_u16(0x7f), vec![0x7f]);
    }

    #[test]
    fn compact_u16_boundary_128() {
        assert_eq!(encode_compact_u16(128), vec![0x80, 0x01]);
    }

    #[test]
    fn compact_u16_two_byte_max() {
        assert_eq!(encode_compact_u16(16383), vec![0xff, 0x7f]);
    }

    #[test]
    fn compact_u16_boundary_16384() {
        assert_eq!(encode_compact_u16(16384), vec![0x80, 0x80, 0x01]);
    }

    #[test]
    fn compact_u16_max_value() {
        assert_eq!(encode_compact_u16(u16::MAX), vec![0xff, 0xff, 0x03]);
    }

    #[test]
    fn compact_u16_roundtrip_full_range() {
        for value in 0..=u16::MAX {
            let encoded = encode_compact_u16(value);
            let (decoded, len) = decode_compact_u16(&encoded).unwrap();
            assert_eq!(decoded, value, "roundtrip failed for {value}");
            assert_eq!(len, encoded.len());
        }
    }

    #[test]
    fn decode_compact_u16_empty_input_fails() {
        assert!(decode_compact_u16(&[]).is_err());
    }

    #[test]
    fn decode_compact_u16_truncated_fails() {
        assert!(decode_compact_u16(&[0x80]).is_err());
        assert!(decode_compact_u16(&[0x80, 0x80]).is_err());
    }

    #[test]
    fn decode_compact_u16_overflow_fails() {
        // 0x04 in the third byte pushes the value past 0xFFFF.
        assert!(decode_compact_u16(&[0xff, 0xff, 0x04]).is_err());
        // Continuation bit set on the third byte: encoding too long.
        assert!(decode_compact_u16(&[0x80, 0x80, 0x80, 0x01]).is_err());
    }

    // -- Account table ordering ---------------------------------------------

    #[test]
    fn account_ordering_by_privilege_group() {
        let payer = key(1);
        let writable_signer = key(2);
        let readonly_signer = key(3);
        let writable = key(4);
        let readonly = key(5);
        let program = key(6);

        let ix = Instruction::new(
            program,
            vec![7],
            vec![
                AccountMeta::new_readonly(readonly, false),
                AccountMeta::new(writable, false),
                AccountMeta::new_readonly(readonly_signer, true),
                AccountMeta::new(writable_signer, true),
            ],
        );

        let tx = Transaction::new(&payer, &[ix], [0u8; 32]).unwrap();

        assert_eq!(
            tx.message.accounts,
            vec![payer, writable_signer, readonly_signer, writable, readonly, program]
        );
        assert_eq!(tx.message.header.num_required_signatures, 3);
        assert_eq!(tx.message.header.num_readonly_signed, 1);
        assert_eq!(tx.message.header.num_readonly_unsigned, 2);
        assert_eq!(tx.signatures.len(), 3);
        assert!(tx.signatures.iter().all(|s| s.iter().all(|&b| b == 0)));
    }

    #[test]
    fn duplicate_references_are_merged_with_privilege_or() {
        let payer = key(1);
        let shared = key(2);
        let program = key(9);

        // Referenced read-only first, then writable+signer: privileges OR.
        let ix_a = Instruction::new(
            program,
            vec![],
            vec![AccountMeta::new_readonly(shared, false)],
        );
        let ix_b = Instruction::new(program, vec![], vec![AccountMeta::new(shared, true)]);

        let tx = Transaction::new(&payer, &[ix_a, ix_b], [0u8; 32]).unwrap();

        assert_eq!(tx.message.accounts, vec![payer, shared, program]);
        assert_eq!(tx.message.header.num_required_signatures, 2);
        assert_eq!(tx.message.header.num_readonly_signed, 0);
    }

    #[test]
    fn payer_is_always_index_zero() {
        let payer = key(9);
        let other_signer = key(1);
        let program = key(3);

        let ix = Instruction::new(program, vec![], vec![AccountMeta::new(other_signer, true)]);
        let tx = Transaction::new(&payer, &[ix], [0u8; 32]).unwrap();

        assert_eq!(tx.message.accounts[0], payer);
    }

    #[test]
    fn compiled_indices_reference_account_table() {
        let payer = key(1);
        let source = key(2);
        let dest = key(3);
        let program = key(4);

        let ix = Instruction::new(
            program,
            vec![42],
            vec![
                AccountMeta::new(source, false),
                AccountMeta::new(dest, false),
            ],
        );
        let tx = Transaction::new(&payer, &[ix], [0u8; 32]).unwrap();

        let compiled = &tx.message.instructions[0];
        let accounts = &tx.message.accounts;
        assert_eq!(accounts[compiled.program_index as usize], program);
        assert_eq!(accounts[compiled.account_indices[0] as usize], source);
        assert_eq!(accounts[compiled.account_indices[1] as usize], dest);
        assert_eq!(compiled.data, vec![42]);
    }

    // -- Codec round-trips --------------------------------------------------

    fn sample_transaction() -> Transaction {
        let payer = key(1);
        let ix = Instruction::new(
            key(5),
            vec![3, 0, 0, 0],
            vec![
                AccountMeta::new(key(2), false),
                AccountMeta::new_readonly(key(3), true),
            ],
        );
        Transaction::new(&payer, &[ix], [0xAA; 32]).unwrap()
    }

    #[test]
    fn message_roundtrip() {
        let tx = sample_transaction();
        let bytes = tx.message.marshal().unwrap();
        let decoded = Message::unmarshal(&bytes).unwrap();
        assert_eq!(decoded, tx.message);
        assert_eq!(decoded.marshal().unwrap(), bytes);
    }

    #[test]
    fn transaction_roundtrip_is_byte_identical() {
        let mut tx = sample_transaction();
        // Fill one signature slot so the round trip covers signatures too.
        tx.signatures[0] = [0x77; 64];

        let bytes = tx.marshal().unwrap();
        let decoded = Transaction::unmarshal(&bytes).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.marshal().unwrap(), bytes);
    }

    #[test]
    fn marshalled_message_layout() {
        let tx = sample_transaction();
        let msg = tx.message.marshal().unwrap();

        assert_eq!(msg[0], tx.message.header.num_required_signatures);
        assert_eq!(msg[1], tx.message.header.num_readonly_signed);
        assert_eq!(msg[2], tx.message.header.num_readonly_unsigned);

        // Blockhash sits after: header(3) + count + 32 * num_accounts.
        let num_accounts = tx.message.accounts.len();
        let offset = 3 + encode_compact_u16(num_accounts as u16).len() + 32 * num_accounts;
        assert_eq!(&msg[offset..offset + 32], &[0xAA; 32]);
    }

    #[test]
    fn unmarshal_truncated_message_fails() {
        let bytes = sample_transaction().message.marshal().unwrap();
        for len in 0..bytes.len() {
            assert!(
                Message::unmarshal(&bytes[..len]).is_err(),
                "prefix of length {len} should not decode"
            );
        }
    }

    #[test]
    fn unmarshal_trailing_bytes_fails() {
        let mut bytes = sample_transaction().message.marshal().unwrap();
        bytes.push(0);
        assert!(Message::unmarshal(&bytes).is_err());
    }

    #[test]
    fn unmarshal_duplicate_account_fails() {
        let tx = sample_transaction();
        let mut message = tx.message.clone();
        message.accounts[1] = message.accounts[0];
        let bytes = message.marshal().unwrap();
        assert!(matches!(
            Message::unmarshal(&bytes),
            Err(SolanaError::DuplicateAccount)
        ));
    }

    #[test]
    fn unmarshal_account_index_out_of_range_fails() {
        let tx = sample_transaction();
        let mut message = tx.message.clone();
        message.instructions[0].account_indices[0] = 200;
        let bytes = message.marshal().unwrap();
        assert!(matches!(
            Message::unmarshal(&bytes),
            Err(SolanaError::IndexOutOfRange(200))
        ));
    }

    #[test]
    fn unmarshal_program_index_out_of_range_fails() {
        let tx = sample_transaction();
        let mut message = tx.message.clone();
        message.instructions[0].program_index = 99;
        let bytes = message.marshal().unwrap();
        assert!(matches!(
            Message::unmarshal(&bytes),
            Err(SolanaError::IndexOutOfRange(99))
        ));
    }

    #[test]
    fn unmarshal_writable_signer_program_fails() {
        let tx = sample_transaction();
        let mut message = tx.message.clone();
        // Point the instruction at the payer (a writable signer).
        message.instructions[0].program_index = 0;
        let bytes = message.marshal().unwrap();
        assert!(Message::unmarshal(&bytes).is_err());
    }

    #[test]
    fn unmarshal_header_counts_exceeding_table_fails() {
        let tx = sample_transaction();
        let mut message = tx.message.clone();
        message.header.num_required_signatures = 200;
        let bytes = message.marshal().unwrap();
        assert!(Message::unmarshal(&bytes).is_err());
    }

    // -- Signing ------------------------------------------------------------

    #[test]
    fn sign_fills_the_correct_slots_and_verifies() {
        let payer_seed = [0x42u8; 32];
        let owner_seed = [0x43u8; 32];
        let payer = keys::derive_public_key(&payer_seed);
        let owner = keys::derive_public_key(&owner_seed);

        let ix = Instruction::new(
            key(5),
            vec![1, 2, 3],
            vec![
                AccountMeta::new(key(2), false),
                AccountMeta::new_readonly(owner, true),
            ],
        );
        let mut tx = Transaction::new(&payer, &[ix], [0xCC; 32]).unwrap();
        assert_eq!(tx.signatures.len(), 2);

        // Partial signing leaves the other slot zeroed.
        tx.sign(&[owner_seed]).unwrap();
        assert!(tx.signatures[0].iter().all(|&b| b == 0));
        assert!(tx.signatures[1].iter().any(|&b| b != 0));
        tx.verify_signatures().unwrap();

        tx.sign(&[payer_seed]).unwrap();
        assert!(tx.signatures[0].iter().any(|&b| b != 0));
        tx.verify_signatures().unwrap();
    }

    #[test]
    fn sign_with_unknown_key_fails() {
        let payer_seed = [0x42u8; 32];
        let payer = keys::derive_public_key(&payer_seed);

        let ix = Instruction::new(key(5), vec![], vec![AccountMeta::new(key(2), false)]);
        let mut tx = Transaction::new(&payer, &[ix], [0u8; 32]).unwrap();

        let stranger = [0x99u8; 32];
        assert!(matches!(
            tx.sign(&[stranger]),
            Err(SolanaError::UnknownSigner)
        ));
    }

    #[test]
    fn signing_is_deterministic() {
        let payer_seed = [0x42u8; 32];
        let payer = keys::derive_public_key(&payer_seed);

        let ix = Instruction::new(key(5), vec![9], vec![AccountMeta::new(key(2), false)]);
        let mut tx_a = Transaction::new(&payer, &[ix.clone()], [0x11; 32]).unwrap();
        let mut tx_b = Transaction::new(&payer, &[ix], [0x11; 32]).unwrap();

        tx_a.sign(&[payer_seed]).unwrap();
        tx_b.sign(&[payer_seed]).unwrap();
        assert_eq!(tx_a.marshal().unwrap(), tx_b.marshal().unwrap());
    }

    #[test]
    fn verify_rejects_corrupted_signature() {
        let payer_seed = [0x42u8; 32];
        let payer = keys::derive_public_key(&payer_seed);

        let ix = Instruction::new(key(5), vec![], vec![AccountMeta::new(key(2), false)]);
        let mut tx = Transaction::new(&payer, &[ix], [0u8; 32]).unwrap();
        tx.sign(&[payer_seed]).unwrap();
        tx.verify_signatures().unwrap();

        tx.signatures[0][0] ^= 0xFF;
        assert!(matches!(
            tx.verify_signatures(),
            Err(SolanaError::SignatureVerification)
        ));
    }

    #[test]
    fn signed_wire_bytes_verify_under_dalek() {
        let payer_seed = [0x42u8; 32];
        let payer = keys::derive_public_key(&payer_seed);

        let ix = Instruction::new(key(5), vec![7], vec![AccountMeta::new(key(2), false)]);
        let mut tx = Transaction::new(&payer, &[ix], [0xCC; 32]).unwrap();
        tx.sign(&[payer_seed]).unwrap();

        let wire = tx.marshal().unwrap();
        // compact-u16 num_signatures = 1, then the 64-byte signature, then
        // the message.
        assert_eq!(wire[0], 0x01);
        let signature: Signature = wire[1..65].try_into().unwrap();
        let message_bytes = &wire[65..];
        assert!(keys::verify_signature(&payer, message_bytes, &signature));
    }
}
