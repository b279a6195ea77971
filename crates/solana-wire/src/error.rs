use thiserror::Error;

/// Errors produced by the wire codec and the program decompilers.
#[derive(Debug, Error)]
pub enum SolanaError {
    /// Truncated buffer, invalid compact-u16, wrong array size, or any other
    /// framing-level defect in a serialized message or transaction.
    #[error("malformed framing: {0}")]
    MalformedFraming(String),

    /// An instruction referenced an account index outside the account table.
    #[error("account index out of range: {0}")]
    IndexOutOfRange(usize),

    /// The account table contains the same key twice.
    #[error("duplicate account in account table")]
    DuplicateAccount,

    /// A signing key does not correspond to any required-signer slot.
    #[error("unknown signer")]
    UnknownSigner,

    /// A signature did not verify over the message under its account key.
    #[error("signature verification failed")]
    SignatureVerification,

    /// A decompiler was pointed at an instruction for a different program.
    #[error("incorrect program")]
    IncorrectProgram,

    /// The instruction belongs to the right program but carries a different
    /// command tag than the decompiler expects.
    #[error("incorrect instruction")]
    IncorrectInstruction,

    /// Wrong data length or account shape for a known command.
    #[error("invalid instruction: {0}")]
    InvalidInstruction(String),

    /// A nonce account had the wrong size or owner.
    #[error("invalid nonce account: {0}")]
    InvalidNonceAccount(String),

    /// The bump-seed search was exhausted without finding an off-curve
    /// address. Probabilistically impossible for honest inputs.
    #[error("unable to find a viable program address")]
    NoProgramAddress,
}
