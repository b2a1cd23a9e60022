//! Value-oriented homomorphic add / mult over an [`Engine`].

use crate::{
    encoder::{Encoder, SlotVector},
    engine::Engine,
    error::Result,
};

/// Borrowed view of an engine exposing the ledger's ciphertext operations.
pub struct CipherAlgebra<'a, E: Engine> {
    engine: &'a E,
    encoder: Encoder,
}

impl<'a, E: Engine> CipherAlgebra<'a, E> {
    /// Wraps `engine`.
    pub fn new(engine: &'a E) -> Self {
        Self { engine, encoder: Encoder::new(engine.slot_count()) }
    }

    /// Encrypts a full slot vector under `pk`.
    pub fn encrypt(&self, pk: &E::PublicKey, slots: &SlotVector) -> Result<E::Ciphertext> {
        self.engine.encrypt(pk, slots)
    }

    /// Decrypts `ct` back to its slot vector.
    pub fn decrypt(&self, sk: &E::SecretKey, ct: &E::Ciphertext) -> Result<SlotVector> {
        self.engine.decrypt(sk, ct)
    }

    /// Encrypts `x` in slot 0.
    pub fn encrypt_scalar(&self, pk: &E::PublicKey, x: f64) -> Result<E::Ciphertext> {
        self.engine.encrypt(pk, &self.encoder.encode_amount(x))
    }

    /// Slot-wise `a + b`.
    pub fn add(&self, a: &E::Ciphertext, b: &E::Ciphertext) -> Result<E::Ciphertext> {
        self.engine.add(a, b)
    }

    /// Slot-wise `a - b`.
    pub fn sub(&self, a: &E::Ciphertext, b: &E::Ciphertext) -> Result<E::Ciphertext> {
        self.engine.sub(a, b)
    }

    /// Slot-wise `a * b`; costs one multiplication of capacity.
    pub fn multiply(&self, a: &E::Ciphertext, b: &E::Ciphertext) -> Result<E::Ciphertext> {
        self.engine.multiply(a, b)
    }

    /// Slot-wise `-a`.
    pub fn negate(&self, a: &E::Ciphertext) -> Result<E::Ciphertext> {
        self.engine.negate(a)
    }

    /// Slot-wise `a * a`.
    pub fn square(&self, a: &E::Ciphertext) -> Result<E::Ciphertext> {
        self.engine.square(a)
    }

    /// Folds `terms` with addition, starting from an encrypted zero.
    pub fn sum<'c, I>(&self, pk: &E::PublicKey, terms: I) -> Result<E::Ciphertext>
    where
        I: IntoIterator<Item = &'c E::Ciphertext>,
        E::Ciphertext: 'c,
    {
        let zero = self.encrypt_scalar(pk, 0.0)?;
        terms
            .into_iter()
            .try_fold(zero, |acc, ct| self.engine.add(&acc, ct))
    }
}
