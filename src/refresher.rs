//! Capacity policy: refresh a ciphertext before it gets too noisy to use.
//!
//! A refresh here is decrypt + re-encrypt under the owner's key pair, which
//! restores the fresh capacity. It needs the secret key, so it is only valid
//! on the key holder's side. A party holding ciphertexts on someone else's
//! behalf must never run it; that party needs the engine's own bootstrap.

use tracing::warn;

use crate::{engine::Engine, error::Result, user::User};

/// Refresh threshold used by the deployed ledger, in capacity bits.
pub const DEFAULT_BOOTSTRAP_THRESHOLD: i64 = 5;

/// Stateless helper that borrows the engine.
pub struct Refresher<'a, E: Engine> {
    engine: &'a E,
    threshold: i64,
}

impl<'a, E: Engine> Refresher<'a, E> {
    /// Refresher over `engine` that refreshes below `threshold` bits.
    pub fn new(engine: &'a E, threshold: i64) -> Self {
        Self { engine, threshold }
    }

    /// Configured threshold, in capacity bits.
    #[must_use]
    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// Remaining capacity of `ct`, in bits.
    pub fn capacity_of(&self, ct: &E::Ciphertext) -> i64 {
        self.engine.capacity(ct)
    }

    /// `true` when `ct` has less than `threshold` bits left.
    pub fn needs_refresh(&self, ct: &E::Ciphertext, threshold: i64) -> bool {
        self.capacity_of(ct) < threshold
    }

    /// Returns `ct` unchanged unless its capacity is below `threshold`, in
    /// which case it is re-encrypted at full capacity under `user`'s keys.
    pub fn ensure_usable(
        &self,
        user: &User<E>,
        ct: E::Ciphertext,
        threshold: i64,
    ) -> Result<E::Ciphertext> {
        let capacity = self.capacity_of(&ct);
        if capacity >= threshold {
            return Ok(ct);
        }
        warn!(capacity, threshold, "ciphertext below capacity threshold, refreshing");
        let slots = self.engine.decrypt(user.secret_key(), &ct)?;
        self.engine.encrypt(user.public_key(), &slots)
    }

    /// [`Self::ensure_usable`] with the configured threshold.
    pub fn ensure_usable_default(&self, user: &User<E>, ct: E::Ciphertext) -> Result<E::Ciphertext> {
        self.ensure_usable(user, ct, self.threshold)
    }
}
