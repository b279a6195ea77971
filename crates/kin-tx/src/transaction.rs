//! Parsing of Kin transactions into memo-delimited regions.
//!
//! A transaction is split into regions at each memo instruction: region 0
//! covers everything before the first memo, and region `i > 0` starts
//! immediately after the `i`-th memo. Within a region only a fixed
//! instruction whitelist is allowed:
//!
//! - `Memo::Memo`
//! - `System::CreateAccount` + `SplToken::InitializeAccount`
//! - `SplAssociatedToken::CreateAssociatedAccount`
//! - `SplToken::SetAuthority` (only inside a creation sequence)
//! - `SplToken::Transfer`
//! - `SplToken::CloseAccount`
//!
//! Creation sequences are validated instruction by instruction: a create
//! must be followed by its initialize (bare creates only), then a
//! close-authority assignment, then optionally an account-holder
//! assignment, all on the created account. After the walk, cross-region
//! invariants are enforced: close authorities match their funder, app
//! ids/indexes agree, earns are never mixed with spends or P2P payments,
//! and a supplied invoice list matches exactly one region.

use solana_wire::keys::PublicKey;
use solana_wire::memo as memo_program;
use solana_wire::system;
use solana_wire::token;
use solana_wire::transaction::{Message, Transaction};

use crate::error::KinError;
use crate::invoice::InvoiceList;
use crate::memo::{app_id_from_text_memo, Memo, TransactionType};

/// A parsed Kin transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tx {
    /// The app index shared by the transaction's agora memos; 0 when none
    /// carry one.
    pub app_index: u16,
    /// The app id carried by the transaction's text memos, if any.
    pub app_id: Option<String>,
    pub regions: Vec<Region>,
}

/// A contiguous run of instructions bounded by memo instructions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    /// Raw data of the memo instruction that opened this region; empty for
    /// region 0.
    pub memo_data: Vec<u8>,
    /// The agora memo decoded from `memo_data`, when it is one.
    pub memo: Option<Memo>,

    pub creations: Vec<Creation>,
    pub transfers: Vec<token::DecompiledTransfer>,
    pub closures: Vec<token::DecompiledCloseAccount>,
}

/// How a token account was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreationKind {
    /// `System::CreateAccount` followed by `SplToken::InitializeAccount`.
    Bare {
        create: system::DecompiledCreateAccount,
        initialize: token::DecompiledInitializeAccount,
    },
    /// `SplAssociatedToken::CreateAssociatedAccount`.
    Associated(token::DecompiledCreateAssociatedAccount),
}

/// A complete token-account creation sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creation {
    pub kind: CreationKind,
    /// The mandatory close-authority assignment on the created account.
    pub close_authority: token::DecompiledSetAuthority,
    /// The optional account-holder assignment on the created account.
    pub account_holder: Option<token::DecompiledSetAuthority>,
}

impl Creation {
    /// The account that funded the creation (the subsidizer for associated
    /// creates).
    pub fn funder(&self) -> &PublicKey {
        match &self.kind {
            CreationKind::Bare { create, .. } => &create.funder,
            CreationKind::Associated(create) => &create.subsidizer,
        }
    }

    /// The created account's address.
    pub fn address(&self) -> &PublicKey {
        match &self.kind {
            CreationKind::Bare { create, .. } => &create.address,
            CreationKind::Associated(create) => &create.address,
        }
    }
}

fn invalid_instruction(index: usize, reason: impl ToString) -> KinError {
    KinError::InvalidInstruction {
        index,
        reason: reason.to_string(),
    }
}

fn push_creation(regions: &mut [Region], creation: Creation) {
    if let Some(region) = regions.last_mut() {
        region.creations.push(creation);
    }
}

/// Parse a (transaction, invoice list) pair into a [`Tx`].
///
/// The invariants checked while parsing:
///
/// 1. Every instruction is on the whitelist above.
/// 2. If an invoice list is provided, it matches exactly one region, and
///    that region has one transfer per invoice.
/// 3. Transfers never use the subsidizer as the source owner.
/// 4. `SetAuthority` only appears inside a creation sequence, with types
///    close-account and account-holder in that order.
/// 5. Close authorities are assigned to the creation's funder.
/// 6. There is at most one distinct app index and at most one distinct app
///    id (their mutual consistency is the caller's concern).
/// 7. Earns are not mixed with spends or P2P payments.
pub fn parse_transaction(
    tx: &Transaction,
    invoice_list: Option<&InvoiceList>,
) -> Result<Tx, KinError> {
    if tx.message.instructions.is_empty() {
        return Err(KinError::MalformedTransaction("no instructions"));
    }
    if tx.signatures.is_empty() {
        return Err(KinError::MalformedTransaction("no allocated signatures"));
    }

    let message = &tx.message;
    let subsidizer = *message
        .accounts
        .first()
        .ok_or(KinError::MalformedTransaction("no accounts"))?;

    let mut regions = vec![Region::default()];

    let mut i = 0;
    while i < message.instructions.len() {
        let program = *message
            .program_key(i)
            .ok_or_else(|| invalid_instruction(i, "program index out of range"))?;

        if program == memo_program::PROGRAM_KEY {
            let m = memo_program::decompile_memo(message, i)
                .map_err(|e| invalid_instruction(i, e))?;
            regions.push(Region {
                memo_data: m.data,
                ..Default::default()
            });
            i += 1;
        } else if program == system::PROGRAM_KEY {
            i = parse_bare_creation(message, i, &mut regions)?;
        } else if program == token::ASSOCIATED_TOKEN_PROGRAM_KEY {
            i = parse_associated_creation(message, i, &mut regions)?;
        } else if program == token::PROGRAM_KEY {
            let command = token::command(message, i).map_err(|e| invalid_instruction(i, e))?;
            match command {
                token::COMMAND_TRANSFER => {
                    let transfer = token::decompile_transfer(message, i)
                        .map_err(|e| invalid_instruction(i, e))?;

                    if transfer.owner == subsidizer {
                        return Err(KinError::SubsidizerAsSource { index: i });
                    }

                    if let Some(region) = regions.last_mut() {
                        region.transfers.push(transfer);
                    }
                }
                token::COMMAND_CLOSE_ACCOUNT => {
                    let closure = token::decompile_close_account(message, i)
                        .map_err(|e| invalid_instruction(i, e))?;

                    if let Some(region) = regions.last_mut() {
                        region.closures.push(closure);
                    }
                }
                _ => {
                    return Err(invalid_instruction(i, "unsupported token program command"));
                }
            }
            i += 1;
        } else {
            return Err(invalid_instruction(i, "unknown program"));
        }
    }

    let mut parsed = Tx {
        app_index: 0,
        app_id: None,
        regions,
    };

    let il_hash = invoice_list.map(InvoiceList::hash);
    let (mut has_earn, mut has_spend, mut has_p2p) = (false, false, false);
    let mut matched_regions = 0;

    for r in 0..parsed.regions.len() {
        for creation in &parsed.regions[r].creations {
            if creation.close_authority.new_authority.as_ref() != Some(creation.funder()) {
                return Err(KinError::CreationAuthorityMismatch);
            }
        }

        if parsed.regions[r].memo_data.is_empty() {
            continue;
        }

        // Attempt to pull an app index (agora memo) or app id (text memo)
        // out of the memo data; any other memo content is ignored. Either
        // value must agree with the one adopted so far; whether the app id
        // and app index actually belong together is left to the caller.
        let Ok(memo_str) = std::str::from_utf8(&parsed.regions[r].memo_data) else {
            continue;
        };

        let m = match Memo::from_base64(memo_str, false) {
            Ok(m) => m,
            Err(_) => {
                if let Some(app_id) = app_id_from_text_memo(memo_str) {
                    if parsed.app_id.is_none() {
                        parsed.app_id = Some(app_id.to_string());
                    } else if parsed.app_id.as_deref() != Some(app_id) {
                        return Err(KinError::ConflictingAppId);
                    }
                }
                continue;
            }
        };

        parsed.regions[r].memo = Some(m);

        match m.transaction_type() {
            TransactionType::Earn => has_earn = true,
            TransactionType::Spend => has_spend = true,
            TransactionType::P2P => has_p2p = true,
            TransactionType::Unknown => {}
        }

        if parsed.app_index > 0 && m.app_index() != parsed.app_index {
            return Err(KinError::ConflictingAppIndex);
        }
        if parsed.app_index == 0 {
            parsed.app_index = m.app_index();
        }

        let (Some(il), Some(hash)) = (invoice_list, &il_hash) else {
            continue;
        };

        let fk = m.foreign_key();
        if fk[..28] != hash[..] || fk[28] != 0 {
            continue;
        }

        matched_regions += 1;
        if il.invoices.len() != parsed.regions[r].transfers.len() {
            return Err(KinError::InvoiceTransferCountMismatch {
                invoices: il.invoices.len(),
                transfers: parsed.regions[r].transfers.len(),
                region: r,
            });
        }
    }

    if has_earn && (has_spend || has_p2p) {
        return Err(KinError::MixedTransactionTypes);
    }
    if invoice_list.is_some() && matched_regions != 1 {
        return Err(KinError::InvoiceRegionMatchCount(matched_regions));
    }

    Ok(parsed)
}

/// Parse `System::CreateAccount` and the rest of its creation sequence,
/// returning the index of the next unconsumed instruction.
fn parse_bare_creation(
    message: &Message,
    index: usize,
    regions: &mut Vec<Region>,
) -> Result<usize, KinError> {
    let create =
        system::decompile_create_account(message, index).map_err(|e| invalid_instruction(index, e))?;

    if create.owner != token::PROGRAM_KEY {
        return Err(invalid_instruction(
            index,
            "create account must assign ownership to the token program",
        ));
    }
    if create.size != token::ACCOUNT_SIZE as u64 {
        return Err(invalid_instruction(index, "created account has invalid size"));
    }
    let address = create.address;

    let mut cursor = index + 1;
    if cursor == message.instructions.len() {
        return Err(invalid_instruction(
            cursor,
            "missing initialize account instruction",
        ));
    }
    let initialize = token::decompile_initialize_account(message, cursor)
        .map_err(|e| invalid_instruction(cursor, e))?;
    if initialize.account != address {
        return Err(invalid_instruction(
            cursor,
            "initialized account does not match created account",
        ));
    }

    cursor += 1;
    let close_authority = expect_close_authority(message, cursor, &address)?;

    let mut creation = Creation {
        kind: CreationKind::Bare { create, initialize },
        close_authority,
        account_holder: None,
    };

    // Changing of the account holder is optional: a set-authority that
    // follows must be it, but anything that is not a set-authority at all is
    // left for the main walk.
    cursor += 1;
    if cursor < message.instructions.len() {
        if let Ok(holder) = token::decompile_set_authority(message, cursor) {
            if holder.authority_type != token::AuthorityType::AccountHolder {
                return Err(invalid_instruction(
                    cursor,
                    "set authority must be of type account holder following a close authority",
                ));
            }
            if holder.account != address {
                return Err(invalid_instruction(
                    cursor,
                    "account holder must be for the created account",
                ));
            }
            creation.account_holder = Some(holder);
            cursor += 1;
        }
    }

    push_creation(regions, creation);
    Ok(cursor)
}

/// Parse `SplAssociatedToken::CreateAssociatedAccount` and its mandatory
/// close-authority assignment.
fn parse_associated_creation(
    message: &Message,
    index: usize,
    regions: &mut Vec<Region>,
) -> Result<usize, KinError> {
    let create = token::decompile_create_associated_account(message, index)
        .map_err(|e| invalid_instruction(index, e))?;
    let address = create.address;

    let close_authority = expect_close_authority(message, index + 1, &address)?;

    push_creation(
        regions,
        Creation {
            kind: CreationKind::Associated(create),
            close_authority,
            account_holder: None,
        },
    );
    Ok(index + 2)
}

fn expect_close_authority(
    message: &Message,
    index: usize,
    created_account: &PublicKey,
) -> Result<token::DecompiledSetAuthority, KinError> {
    if index == message.instructions.len() {
        return Err(invalid_instruction(
            index,
            "missing close-authority instruction",
        ));
    }

    let close_authority = token::decompile_set_authority(message, index)
        .map_err(|e| invalid_instruction(index, e))?;
    if close_authority.authority_type != token::AuthorityType::CloseAccount {
        return Err(invalid_instruction(
            index,
            "set authority must be of type close account following a create",
        ));
    }
    if &close_authority.account != created_account {
        return Err(invalid_instruction(
            index,
            "close authority must be for the created account",
        ));
    }

    Ok(close_authority)
}
