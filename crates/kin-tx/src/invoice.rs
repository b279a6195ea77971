//! Invoice lists and their canonical hash.
//!
//! An invoice list describes what a transaction's transfers pay for. The
//! list itself never travels on the ledger; instead its 28-byte SHA-224
//! hash is embedded in an agora memo's foreign key, and the parser checks
//! that exactly one region claims it.
//!
//! The hash is computed over a deterministic canonical encoding: every
//! variable-length field is prefixed with its u32 little-endian length, and
//! integers are little-endian. Two structurally equal lists always hash
//! identically.

use sha2::{Digest, Sha224};

/// A single line item within an invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineItem {
    pub title: String,
    pub description: String,
    /// Amount in quarks.
    pub amount: i64,
    /// An app-specific item identifier.
    pub sku: Vec<u8>,
}

/// One invoice, paired with one transfer of the matched region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invoice {
    pub items: Vec<LineItem>,
}

/// The invoice list a transaction's memo may bind to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceList {
    pub invoices: Vec<Invoice>,
}

impl InvoiceList {
    /// The canonical byte encoding the hash is computed over.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        put_len(&mut buf, self.invoices.len());
        for invoice in &self.invoices {
            put_len(&mut buf, invoice.items.len());
            for item in &invoice.items {
                put_bytes(&mut buf, item.title.as_bytes());
                put_bytes(&mut buf, item.description.as_bytes());
                buf.extend_from_slice(&item.amount.to_le_bytes());
                put_bytes(&mut buf, &item.sku);
            }
        }

        buf
    }

    /// The 28-byte SHA-224 hash an agora memo's foreign key carries.
    pub fn hash(&self) -> [u8; 28] {
        Sha224::digest(self.canonical_bytes()).into()
    }
}

fn put_len(buf: &mut Vec<u8>, len: usize) {
    buf.extend_from_slice(&(len as u32).to_le_bytes());
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    put_len(buf, bytes.len());
    buf.extend_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_list() -> InvoiceList {
        InvoiceList {
            invoices: vec![Invoice {
                items: vec![LineItem {
                    title: "Sword".into(),
                    description: "A sharp sword".into(),
                    amount: 100_000,
                    sku: vec![1, 2, 3],
                }],
            }],
        }
    }

    #[test]
    fn hash_is_28_bytes_and_deterministic() {
        let a = sample_list().hash();
        let b = sample_list().hash();
        assert_eq!(a, b);
        assert_eq!(a.len(), 28);
    }

    #[test]
    fn hash_depends_on_content() {
        let mut other = sample_list();
        other.invoices[0].items[0].amount = 200_000;
        assert_ne!(sample_list().hash(), other.hash());
    }

    #[test]
    fn hash_depends_on_invoice_count() {
        let mut other = sample_list();
        other.invoices.push(Invoice::default());
        assert_ne!(sample_list().hash(), other.hash());
    }

    #[test]
    fn encoding_is_unambiguous_across_field_boundaries() {
        // Shifting a byte between adjacent fields must change the encoding.
        let a = InvoiceList {
            invoices: vec![Invoice {
                items: vec![LineItem {
                    title: "ab".into(),
                    description: "c".into(),
                    ..Default::default()
                }],
            }],
        };
        let b = InvoiceList {
            invoices: vec![Invoice {
                items: vec![LineItem {
                    title: "a".into(),
                    description: "bc".into(),
                    ..Default::default()
                }],
            }],
        };
        assert_ne!(a.canonical_bytes(), b.canonical_bytes());
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn empty_list_hashes() {
        let empty = InvoiceList::default();
        assert_eq!(empty.canonical_bytes(), 0u32.to_le_bytes().to_vec());
        let expected: [u8; 28] = Sha224::digest(0u32.to_le_bytes()).into();
        assert_eq!(empty.hash(), expected);
    }
}
