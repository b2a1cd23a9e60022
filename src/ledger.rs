//! Append-only store of encrypted transactions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Plaintext tag of a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money paid in.
    Deposit,
    /// Money taken out; the stored amount is the positive magnitude.
    Withdrawal,
    /// Principal grown by an interest rate under encryption.
    Savings,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Savings => "savings",
        })
    }
}

/// One ledger record. Immutable after it is appended.
#[derive(Clone, Debug)]
pub struct Transaction<C> {
    bank_name: C,
    date: C,
    amount: C,
    kind: TransactionKind,
}

impl<C> Transaction<C> {
    pub(crate) fn new(bank_name: C, date: C, amount: C, kind: TransactionKind) -> Self {
        Self { bank_name, date, amount, kind }
    }

    /// Bank name, one byte per slot.
    pub fn encrypted_bank_name(&self) -> &C {
        &self.bank_name
    }

    /// Date as decimal Unix seconds, one digit per slot.
    pub fn encrypted_date(&self) -> &C {
        &self.date
    }

    /// Amount in slot 0.
    pub fn encrypted_amount(&self) -> &C {
        &self.amount
    }

    /// Plaintext kind tag.
    pub fn kind(&self) -> TransactionKind {
        self.kind
    }
}

/// Transactions in submission order. There is no removal and no access to
/// stored records other than by shared reference.
#[derive(Clone, Debug)]
pub struct Ledger<C> {
    transactions: Vec<Transaction<C>>,
}

impl<C> Ledger<C> {
    /// Empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self { transactions: Vec::new() }
    }

    pub(crate) fn append(&mut self, tx: Transaction<C>) -> usize {
        self.transactions.push(tx);
        self.transactions.len() - 1
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// `true` before the first append.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Record at `index`, in submission order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Transaction<C>> {
        self.transactions.get(index)
    }

    /// Records in submission order.
    pub fn iter(&self) -> std::slice::Iter<'_, Transaction<C>> {
        self.transactions.iter()
    }

    /// All records in submission order.
    #[must_use]
    pub fn as_slice(&self) -> &[Transaction<C>] {
        &self.transactions
    }
}

impl<C> Default for Ledger<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, C> IntoIterator for &'a Ledger<C> {
    type Item = &'a Transaction<C>;
    type IntoIter = std::slice::Iter<'a, Transaction<C>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
