//! Capability surface of the homomorphic encryption engine.
//!
//! Everything above this trait (encoder, refresher, equality oracle, ledger)
//! is written against it; [`crate::EncryptionContext`] is the in-process
//! implementation.

use crate::encoder::SlotVector;
use crate::error::Result;

/// Slot-vector homomorphic encryption engine.
///
/// Binary operations consume capacity from their operands and fail with
/// `ContextMismatch`/`KeyMismatch` when the operands were not produced under
/// the same context and key pair.
pub trait Engine {
    /// Encrypted slot vector.
    type Ciphertext: Clone;
    /// Encryption key.
    type PublicKey: Clone;
    /// Decryption key.
    type SecretKey;

    /// Number of slots in every plaintext vector.
    fn slot_count(&self) -> usize;
    /// Capacity of a fresh ciphertext.
    fn max_capacity(&self) -> i64;
    /// Capacity one multiplication consumes.
    fn mult_cost(&self) -> i64;

    /// Fresh secret key.
    fn generate_secret_key(&self) -> Self::SecretKey;
    /// Public half of `secret`.
    fn public_key(&self, secret: &Self::SecretKey) -> Self::PublicKey;

    /// Encrypts a vector of exactly `slot_count` slots.
    fn encrypt(&self, pk: &Self::PublicKey, slots: &SlotVector) -> Result<Self::Ciphertext>;
    /// Decrypts with the matching secret key.
    fn decrypt(&self, sk: &Self::SecretKey, ct: &Self::Ciphertext) -> Result<SlotVector>;

    /// Slot-wise sum.
    fn add(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext>;
    /// Slot-wise difference.
    fn sub(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext>;
    /// Slot-wise product; consumes `mult_cost` capacity.
    fn multiply(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext>;
    /// Slot-wise negation; free of capacity.
    fn negate(&self, a: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    /// Slot-wise `a * a`.
    fn square(&self, a: &Self::Ciphertext) -> Result<Self::Ciphertext> {
        self.multiply(a, a)
    }

    /// Remaining capacity, in bits.
    fn capacity(&self, ct: &Self::Ciphertext) -> i64;
    /// Estimated absolute error of the decrypted slots.
    fn error_bound(&self, ct: &Self::Ciphertext) -> f64;
}
