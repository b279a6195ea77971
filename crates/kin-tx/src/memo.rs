//! The agora memo: a 32-byte packed transaction annotation.
//!
//! Bit layout, little-endian bit order starting at the least-significant bit
//! of byte 0:
//!
//! ```text
//! magic             2 bits   always 0b01
//! version           3 bits
//! transaction type  5 bits
//! app index        16 bits
//! foreign key     230 bits
//! ```
//!
//! The foreign key field holds 28 full bytes plus the low 6 bits of a 29th;
//! packing a 29-byte key therefore drops the top two bits of its last byte.
//! On the wire the memo travels as the standard-base64 encoding of the 32
//! raw bytes, carried as memo-program instruction data.
//!
//! This module also handles the older text memo format `"1-{APP_ID}[-...]"`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::KinError;

const MAGIC: u8 = 0x1;

/// Highest memo version this library understands.
pub const MAX_VERSION: u8 = 1;

/// Highest transaction type this library understands.
pub const MAX_TRANSACTION_TYPE: u8 = TransactionType::P2P as u8;

/// The type of payment a memo annotates.
///
/// The wire field is 5 bits; values above [`MAX_TRANSACTION_TYPE`] are
/// reserved and read back as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TransactionType {
    Unknown = 0,
    Earn = 1,
    Spend = 2,
    P2P = 3,
}

impl TransactionType {
    fn from_raw(value: u8) -> TransactionType {
        match value {
            1 => TransactionType::Earn,
            2 => TransactionType::Spend,
            3 => TransactionType::P2P,
            _ => TransactionType::Unknown,
        }
    }
}

/// A packed agora memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Memo([u8; 32]);

impl Memo {
    /// Pack a memo from its fields.
    ///
    /// A foreign key shorter than 29 bytes is right-zero-padded; a longer
    /// one is truncated to 29 bytes (of which the last contributes only its
    /// low 6 bits).
    pub fn new(
        version: u8,
        transaction_type: TransactionType,
        app_index: u16,
        foreign_key: &[u8],
    ) -> Result<Memo, KinError> {
        Memo::new_raw(version, transaction_type as u8, app_index, foreign_key)
    }

    /// Pack a memo with a raw transaction-type value.
    ///
    /// Accepts any value the 5-bit wire field can hold, including types this
    /// library does not know yet.
    pub fn new_raw(
        version: u8,
        transaction_type: u8,
        app_index: u16,
        foreign_key: &[u8],
    ) -> Result<Memo, KinError> {
        if version > 7 {
            return Err(KinError::InvalidMemo(format!("invalid version: {version}")));
        }
        if transaction_type > 31 {
            return Err(KinError::InvalidMemo(format!(
                "invalid transaction type: {transaction_type}"
            )));
        }

        let mut m = [0u8; 32];
        m[0] = MAGIC | (version << 2) | ((transaction_type & 0x7) << 5);
        m[1] = ((transaction_type & 0x18) >> 3) | (((app_index & 0x3f) as u8) << 2);
        m[2] = ((app_index >> 6) & 0xff) as u8;
        m[3] = ((app_index >> 14) & 0x3) as u8;

        // The foreign key starts at bit 26, so each byte straddles two memo
        // bytes: the low 6 bits shifted up, the high 2 bits carried over.
        for (i, &byte) in foreign_key.iter().take(29).enumerate() {
            m[3 + i] |= byte << 2;
            if 4 + i < 32 {
                m[4 + i] |= byte >> 6;
            }
        }

        Ok(Memo(m))
    }

    /// Interpret 32 raw bytes as a memo. No validity check is performed;
    /// see [`Memo::is_valid`].
    pub fn from_bytes(bytes: [u8; 32]) -> Memo {
        Memo(bytes)
    }

    /// Decode a memo from its base64 wire form (standard alphabet, exactly
    /// 32 bytes), applying lenient or strict validity.
    pub fn from_base64(s: &str, strict: bool) -> Result<Memo, KinError> {
        let raw = BASE64
            .decode(s)
            .map_err(|e| KinError::InvalidMemo(format!("invalid base64: {e}")))?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|v: Vec<u8>| KinError::InvalidMemo(format!("invalid size: {}", v.len())))?;

        let memo = Memo(bytes);
        let valid = if strict {
            memo.is_valid_strict()
        } else {
            memo.is_valid()
        };
        if !valid {
            return Err(KinError::InvalidMemo("validation failed".into()));
        }

        Ok(memo)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn version(&self) -> u8 {
        (self.0[0] >> 2) & 0x7
    }

    /// The raw 5-bit transaction-type field.
    pub fn transaction_type_raw(&self) -> u8 {
        (self.0[0] >> 5) | ((self.0[1] & 0x3) << 3)
    }

    /// The transaction type, with reserved values mapped to `Unknown`.
    pub fn transaction_type(&self) -> TransactionType {
        TransactionType::from_raw(self.transaction_type_raw())
    }

    pub fn app_index(&self) -> u16 {
        ((self.0[1] >> 2) as u16)
            | ((self.0[2] as u16) << 6)
            | (((self.0[3] & 0x3) as u16) << 14)
    }

    /// The 29-byte foreign key. Only the low 6 bits of the last byte are
    /// significant.
    pub fn foreign_key(&self) -> [u8; 29] {
        let mut fk = [0u8; 29];
        for i in 0..28 {
            fk[i] = (self.0[3 + i] >> 2) | ((self.0[4 + i] & 0x3) << 6);
        }
        fk[28] = self.0[31] >> 2;
        fk
    }

    /// Lenient validity: the magic field is present and the transaction type
    /// is non-zero. Unknown versions and types pass.
    pub fn is_valid(&self) -> bool {
        if self.0[0] & 0x3 != MAGIC {
            return false;
        }
        self.transaction_type_raw() != 0
    }

    /// Strict validity: additionally requires a version and transaction type
    /// this library knows.
    pub fn is_valid_strict(&self) -> bool {
        self.is_valid()
            && self.version() <= MAX_VERSION
            && self.transaction_type_raw() <= MAX_TRANSACTION_TYPE
    }
}

// ---------------------------------------------------------------------------
// Text memos
// ---------------------------------------------------------------------------

/// Extract the app id from a text memo of the form `"1-{APP_ID}[-...]"`.
///
/// Returns `None` when the memo is not in that format.
pub fn app_id_from_text_memo(memo: &str) -> Option<&str> {
    let mut parts = memo.split('-');
    if parts.next() != Some("1") {
        return None;
    }

    let app_id = parts.next()?;
    if !is_valid_app_id(app_id) {
        return None;
    }

    Some(app_id)
}

/// Whether the string is a valid app id: 3 or 4 alphanumeric characters.
pub fn is_valid_app_id(app_id: &str) -> bool {
    let len = app_id.chars().count();
    (3..=4).contains(&len) && app_id.chars().all(char::is_alphanumeric)
}
