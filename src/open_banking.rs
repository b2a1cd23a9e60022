//! Ledger operations: record, search and aggregate encrypted transactions.
//!
//! `OpenBanking` owns the engine and the policy constants; users (keys +
//! ledger) are passed in by the caller, so independent contexts and users
//! can coexist in one process.

use std::time::SystemTime;

use tracing::debug;

use crate::{
    algebra::CipherAlgebra,
    config::LedgerConfig,
    context::EncryptionContext,
    encoder::{unix_seconds, Encoder, SlotVector},
    engine::Engine,
    equality::EqualityOracle,
    error::Result,
    ledger::{Transaction, TransactionKind},
    refresher::Refresher,
    user::{Bank, User},
};

/// Key-holder view of one record.
#[derive(Clone, Debug, PartialEq)]
pub struct RevealedTransaction {
    /// Decrypted bank name.
    pub bank: String,
    /// Decrypted date, at whole-second resolution.
    pub date: SystemTime,
    /// Decrypted amount.
    pub amount: f64,
    /// Kind tag, stored in the clear.
    pub kind: TransactionKind,
}

/// Encrypted ledger service over one engine.
pub struct OpenBanking<E: Engine> {
    engine: E,
    encoder: Encoder,
    config: LedgerConfig,
}

impl OpenBanking<EncryptionContext> {
    /// Builds the simulated context described by `config.params`.
    pub fn from_config(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let engine = EncryptionContext::new(config.params)?;
        Ok(Self::new(engine, config))
    }
}

impl<E: Engine> OpenBanking<E> {
    /// Service over `engine` with the policy constants of `config`.
    pub fn new(engine: E, config: LedgerConfig) -> Self {
        let encoder = Encoder::new(engine.slot_count());
        Self { engine, encoder, config }
    }

    /// Underlying engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Encoder sized to the engine's slot count.
    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// Active configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Ciphertext arithmetic over the engine.
    pub fn algebra(&self) -> CipherAlgebra<'_, E> {
        CipherAlgebra::new(&self.engine)
    }

    /// Refresher with the configured bootstrap threshold.
    pub fn refresher(&self) -> Refresher<'_, E> {
        Refresher::new(&self.engine, self.config.bootstrap_threshold)
    }

    /// Equality oracle with the configured tolerance and indicator.
    pub fn oracle(&self) -> EqualityOracle<'_, E> {
        EqualityOracle::new(&self.engine, self.config.equality_tolerance, self.config.indicator)
    }

    /* ---------- keys and users ---------- */

    /// Fresh secret key in this engine's context.
    pub fn generate_secret_key(&self) -> E::SecretKey {
        self.engine.generate_secret_key()
    }

    /// Public half of `sk`.
    pub fn public_key_of(&self, sk: &E::SecretKey) -> E::PublicKey {
        self.engine.public_key(sk)
    }

    /// Fresh `(public, secret)` key pair.
    pub fn generate_keys(&self) -> (E::PublicKey, E::SecretKey) {
        let sk = self.generate_secret_key();
        (self.public_key_of(&sk), sk)
    }

    /// Account holder with a fresh key pair and an empty ledger.
    pub fn new_user(&self) -> User<E> {
        let (pk, sk) = self.generate_keys();
        User::new(pk, sk)
    }

    /// Adds `bank` to the user's registry; re-registering is a no-op.
    pub fn register_bank(&self, user: &mut User<E>, bank: Bank) {
        if !user.register_bank(bank) {
            debug!("bank already registered");
        }
    }

    /* ---------- encryption helpers ---------- */

    /// Encrypts `amount` in slot 0 under the user's public key.
    pub fn encrypt_amount(&self, user: &User<E>, amount: f64) -> Result<E::Ciphertext> {
        self.engine.encrypt(user.public_key(), &self.encoder.encode_amount(amount))
    }

    /// Encrypts `value` one byte per slot under the user's public key.
    pub fn encrypt_string(&self, user: &User<E>, value: &str) -> Result<E::Ciphertext> {
        self.engine.encrypt(user.public_key(), &self.encoder.encode_string(value)?)
    }

    /// Encrypts `t` as decimal Unix seconds under the user's public key.
    pub fn encrypt_timestamp(&self, user: &User<E>, t: SystemTime) -> Result<E::Ciphertext> {
        self.engine.encrypt(user.public_key(), &self.encoder.encode_timestamp(t)?)
    }

    /// Every decrypted slot of `ct`.
    pub fn decrypt_slots(&self, user: &User<E>, ct: &E::Ciphertext) -> Result<SlotVector> {
        self.engine.decrypt(user.secret_key(), ct)
    }

    /// Decrypted slot 0 of `ct`.
    pub fn decrypt_amount(&self, user: &User<E>, ct: &E::Ciphertext) -> Result<f64> {
        Ok(self.encoder.decode_amount(&self.decrypt_slots(user, ct)?))
    }

    /// Decrypted string of `ct`, trailing zero slots dropped.
    pub fn decrypt_string(&self, user: &User<E>, ct: &E::Ciphertext) -> Result<String> {
        self.encoder.decode_string_trimmed(&self.decrypt_slots(user, ct)?)
    }

    /// Decrypted date of `ct`.
    pub fn decrypt_timestamp(&self, user: &User<E>, ct: &E::Ciphertext) -> Result<SystemTime> {
        self.encoder.decode_timestamp(&self.decrypt_slots(user, ct)?)
    }

    /// Decrypt-and-compare amount equality within the configured tolerance.
    pub fn is_equal_amount_encrypted(
        &self,
        user: &User<E>,
        a: &E::Ciphertext,
        b: &E::Ciphertext,
    ) -> Result<bool> {
        self.oracle().decrypt_equals_amount(user.secret_key(), a, b)
    }

    /// Decrypt-and-compare exact string equality.
    pub fn is_equal_string_encrypted(
        &self,
        user: &User<E>,
        a: &E::Ciphertext,
        b: &E::Ciphertext,
    ) -> Result<bool> {
        self.oracle().decrypt_equals_string(user.secret_key(), a, b)
    }

    /* ---------- recording ---------- */

    /// Records a deposit and returns its ledger index.
    pub fn deposit(
        &self,
        user: &mut User<E>,
        bank: &str,
        date: SystemTime,
        amount: f64,
    ) -> Result<usize> {
        let amount = self.encrypt_amount(user, amount)?;
        self.add_transaction(user, bank, date, amount, TransactionKind::Deposit)
    }

    /// Records the withdrawn magnitude; the kind carries the direction.
    pub fn withdraw(
        &self,
        user: &mut User<E>,
        bank: &str,
        date: SystemTime,
        amount: f64,
    ) -> Result<usize> {
        let amount = self.encrypt_amount(user, amount)?;
        self.add_transaction(user, bank, date, amount, TransactionKind::Withdrawal)
    }

    /// Stores `amount * (1 + rate)` computed under encryption and returns the
    /// decrypted income. The decryption is local to the key holder.
    pub fn savings(
        &self,
        user: &mut User<E>,
        bank: &str,
        date: SystemTime,
        amount: f64,
        rate: f64,
    ) -> Result<f64> {
        let alg = self.algebra();
        let principal = self.encrypt_amount(user, amount)?;
        let factor = self.encrypt_amount(user, 1.0 + rate)?;
        let income = alg.multiply(&principal, &factor)?;
        let plain = self.decrypt_amount(user, &income)?;
        debug!(income = plain, "savings income");
        self.add_transaction(user, bank, date, income, TransactionKind::Savings)?;
        Ok(plain)
    }

    fn add_transaction(
        &self,
        user: &mut User<E>,
        bank: &str,
        date: SystemTime,
        amount: E::Ciphertext,
        kind: TransactionKind,
    ) -> Result<usize> {
        let bank_name = self.encrypt_string(user, bank)?;
        let date = self.encrypt_timestamp(user, date)?;
        let amount = self.refresher().ensure_usable_default(user, amount)?;
        let index = user.ledger.append(Transaction::new(bank_name, date, amount, kind));
        debug!(index, %kind, "appended transaction");
        Ok(index)
    }

    /* ---------- search ---------- */

    /// Records whose bank name decrypts to `bank`, in ledger order.
    pub fn search_by_bank<'u>(
        &self,
        user: &'u User<E>,
        bank: &str,
    ) -> Result<Vec<&'u Transaction<E::Ciphertext>>> {
        let query = self.encrypt_string(user, bank)?;
        let oracle = self.oracle();
        let mut found = Vec::new();
        for tx in user.ledger() {
            if oracle.decrypt_equals_string(user.secret_key(), tx.encrypted_bank_name(), &query)? {
                found.push(tx);
            }
        }
        debug!(matches = found.len(), "search by bank");
        Ok(found)
    }

    /// Records whose amount is within the equality tolerance of `amount`.
    pub fn search_by_value<'u>(
        &self,
        user: &'u User<E>,
        amount: f64,
    ) -> Result<Vec<&'u Transaction<E::Ciphertext>>> {
        let query = self.encrypt_amount(user, amount)?;
        let oracle = self.oracle();
        let mut found = Vec::new();
        for tx in user.ledger() {
            if oracle.decrypt_equals_amount(user.secret_key(), tx.encrypted_amount(), &query)? {
                found.push(tx);
            }
        }
        debug!(matches = found.len(), "search by value");
        Ok(found)
    }

    /// Like [`Self::search_by_value`] but each comparison is the encrypted
    /// indicator pair of [`EqualityOracle::indicator_match`], decided
    /// afterwards with the secret key. Approximate: it matches amounts within
    /// about `indicator.half_width()` of the query, and never amounts
    /// outside the indicator range.
    pub fn search_by_value_homomorphic<'u>(
        &self,
        user: &'u User<E>,
        amount: f64,
    ) -> Result<Vec<&'u Transaction<E::Ciphertext>>> {
        let query = self.encrypt_amount(user, amount)?;
        let oracle = self.oracle();
        let mut found = Vec::new();
        for tx in user.ledger() {
            let pk = user.public_key();
            if oracle.indicator_match(pk, user.secret_key(), tx.encrypted_amount(), &query)? {
                found.push(tx);
            }
        }
        debug!(matches = found.len(), "homomorphic search by value");
        Ok(found)
    }

    /// Records dated within `start..=end`, compared at whole-second
    /// resolution, which is how dates are stored.
    pub fn search_by_date_range<'u>(
        &self,
        user: &'u User<E>,
        start: SystemTime,
        end: SystemTime,
    ) -> Result<Vec<&'u Transaction<E::Ciphertext>>> {
        let (start, end) = (unix_seconds(start)?, unix_seconds(end)?);
        let mut found = Vec::new();
        for tx in user.ledger() {
            let date = unix_seconds(self.decrypt_timestamp(user, tx.encrypted_date())?)?;
            if (start..=end).contains(&date) {
                found.push(tx);
            }
        }
        debug!(matches = found.len(), "search by date range");
        Ok(found)
    }

    /* ---------- aggregation ---------- */

    /// Encrypted sum of every stored amount: gross turnover, withdrawals
    /// included as positive magnitudes.
    pub fn total_balance(&self, user: &User<E>) -> Result<E::Ciphertext> {
        self.algebra()
            .sum(user.public_key(), user.ledger().iter().map(Transaction::encrypted_amount))
    }

    /// Encrypted deposits + savings - withdrawals.
    pub fn net_balance(&self, user: &User<E>) -> Result<E::Ciphertext> {
        let alg = self.algebra();
        let mut total = alg.encrypt_scalar(user.public_key(), 0.0)?;
        for tx in user.ledger() {
            total = match tx.kind() {
                TransactionKind::Withdrawal => alg.sub(&total, tx.encrypted_amount())?,
                TransactionKind::Deposit | TransactionKind::Savings => {
                    alg.add(&total, tx.encrypted_amount())?
                }
            };
        }
        Ok(total)
    }

    /// Key-holder decryption of every field of `tx`.
    pub fn reveal(
        &self,
        user: &User<E>,
        tx: &Transaction<E::Ciphertext>,
    ) -> Result<RevealedTransaction> {
        Ok(RevealedTransaction {
            bank: self.decrypt_string(user, tx.encrypted_bank_name())?,
            date: self.decrypt_timestamp(user, tx.encrypted_date())?,
            amount: self.decrypt_amount(user, tx.encrypted_amount())?,
            kind: tx.kind(),
        })
    }
}
