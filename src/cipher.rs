//! Simulated CKKS ciphertext container.

use std::fmt;

use crate::{context::ContextId, encoder::SlotVector, keys::KeyId};

/// (slots, capacity, error bound) tagged with the producing context and key.
///
/// `slots` carry the true values plus accumulated approximation noise and are
/// only reachable through [`crate::Engine::decrypt`].
#[derive(Clone)]
pub struct Ciphertext {
    pub(crate) context: ContextId,
    pub(crate) key: KeyId,
    pub(crate) slots: SlotVector,
    pub(crate) capacity: f64, // bits of modulus left
    pub(crate) error_bound: f64,
}

impl Ciphertext {
    /// Context that produced this ciphertext.
    #[must_use]
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Key pair this ciphertext is encrypted under.
    #[must_use]
    pub fn key(&self) -> KeyId {
        self.key
    }

    /// Remaining capacity, rounded down to whole bits.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn capacity(&self) -> i64 {
        self.capacity.floor() as i64
    }

    /// Estimated absolute error of the decrypted slots.
    #[must_use]
    pub fn error_bound(&self) -> f64 {
        self.error_bound
    }
}

impl fmt::Debug for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ciphertext")
            .field("context", &self.context)
            .field("key", &self.key)
            .field("capacity", &self.capacity())
            .field("error_bound", &self.error_bound)
            .finish_non_exhaustive()
    }
}
