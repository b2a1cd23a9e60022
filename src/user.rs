//! Account holder: key pair, bank registry and ledger.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{engine::Engine, ledger::Ledger};

/// Registered bank. Names are not confidential.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bank {
    /// Display name, also the registry key.
    pub name: String,
}

impl Bank {
    /// Bank called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The public key encrypts every record; only the secret key decrypts.
pub struct User<E: Engine> {
    public_key: E::PublicKey,
    secret_key: E::SecretKey,
    banks: BTreeMap<String, Bank>,
    pub(crate) ledger: Ledger<E::Ciphertext>,
}

impl<E: Engine> User<E> {
    /// Account holder with the given key pair and an empty ledger.
    pub fn new(public_key: E::PublicKey, secret_key: E::SecretKey) -> Self {
        Self {
            public_key,
            secret_key,
            banks: BTreeMap::new(),
            ledger: Ledger::new(),
        }
    }

    /// Key every record is encrypted under.
    pub fn public_key(&self) -> &E::PublicKey {
        &self.public_key
    }

    /// Key that decrypts the user's records.
    pub fn secret_key(&self) -> &E::SecretKey {
        &self.secret_key
    }

    /// The user's records, read-only.
    pub fn ledger(&self) -> &Ledger<E::Ciphertext> {
        &self.ledger
    }

    /// Returns `false` if a bank of that name was already registered.
    pub fn register_bank(&mut self, bank: Bank) -> bool {
        self.banks.insert(bank.name.clone(), bank).is_none()
    }

    /// `true` if a bank called `name` is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.banks.contains_key(name)
    }

    /// Registered bank called `name`.
    pub fn bank(&self, name: &str) -> Option<&Bank> {
        self.banks.get(name)
    }

    /// Registered banks, ordered by name.
    pub fn banks(&self) -> impl Iterator<Item = &Bank> {
        self.banks.values()
    }
}
