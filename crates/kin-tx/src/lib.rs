//! Kin transaction semantics on the Solana ledger.
//!
//! Builds on `solana-wire` to provide the Kin-specific layer:
//!
//! - the 32-byte packed "agora" memo (magic, version, transaction type, app
//!   index, and a 230-bit foreign key) plus the older `"1-{APP_ID}"` text
//!   memo format
//! - invoice lists and their canonical SHA-224 hash, which agora memos bind
//!   to via the foreign key
//! - `parse_transaction`, which walks a ledger message and produces the
//!   structured [`Tx`] view (memo-delimited regions of creations, transfers,
//!   and closures) while enforcing the full instruction whitelist and the
//!   cross-region invariants
//! - Kin/quark decimal conversions

pub mod error;
pub mod invoice;
pub mod memo;
pub mod quarks;
pub mod transaction;

pub use error::KinError;
pub use invoice::{Invoice, InvoiceList, LineItem};
pub use memo::{app_id_from_text_memo, is_valid_app_id, Memo, TransactionType};
pub use quarks::{from_quarks, to_quarks};
pub use transaction::{parse_transaction, Creation, CreationKind, Region, Tx};
