use thiserror::Error;

/// Errors produced by the Kin memo codec and the transaction parser.
///
/// The parser reports the first failing invariant and stops; each kind
/// carries the context a higher layer needs to surface a diagnostic
/// (typically the instruction or region index).
#[derive(Debug, Error)]
pub enum KinError {
    /// The bytes are not a well-formed agora memo.
    #[error("invalid memo: {0}")]
    InvalidMemo(String),

    /// A transaction-level precondition failed before parsing started.
    #[error("malformed transaction: {0}")]
    MalformedTransaction(&'static str),

    /// An instruction is not on the whitelist, or a whitelisted instruction
    /// is malformed or out of sequence.
    #[error("invalid instruction at {index}: {reason}")]
    InvalidInstruction { index: usize, reason: String },

    /// A transfer's owner is the subsidizer.
    #[error("cannot transfer from a subsidizer owned account (instruction {index})")]
    SubsidizerAsSource { index: usize },

    /// A creation's close authority is not the funder/subsidizer.
    #[error("set authority has incorrect new authority")]
    CreationAuthorityMismatch,

    /// Two regions carry different non-zero app indexes.
    #[error("multiple app indexes")]
    ConflictingAppIndex,

    /// Two regions carry different app ids.
    #[error("multiple app ids")]
    ConflictingAppId,

    /// Earn payments mixed with spend/P2P payments.
    #[error("cannot mix earns with P2P/spends")]
    MixedTransactionTypes,

    /// The invoice list does not match exactly one region.
    #[error("invoice list does not match exactly one region (matches {0} regions)")]
    InvoiceRegionMatchCount(usize),

    /// The matched region's transfer count differs from the invoice count.
    #[error("invoice count ({invoices}) does not match transfer count ({transfers}) in region {region}")]
    InvoiceTransferCountMismatch {
        invoices: usize,
        transfers: usize,
        region: usize,
    },

    /// A Kin amount string cannot be represented in quarks.
    #[error("invalid kin amount: {0}")]
    InvalidAmount(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_instruction() {
        let err = KinError::InvalidInstruction {
            index: 3,
            reason: "unknown program".into(),
        };
        assert_eq!(err.to_string(), "invalid instruction at 3: unknown program");
    }

    #[test]
    fn display_invoice_mismatch() {
        let err = KinError::InvoiceTransferCountMismatch {
            invoices: 1,
            transfers: 2,
            region: 1,
        };
        assert_eq!(
            err.to_string(),
            "invoice count (1) does not match transfer count (2) in region 1"
        );
    }

    #[test]
    fn display_region_match_count() {
        assert_eq!(
            KinError::InvoiceRegionMatchCount(0).to_string(),
            "invoice list does not match exactly one region (matches 0 regions)"
        );
    }
}
