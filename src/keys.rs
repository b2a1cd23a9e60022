//! Key pairs of the simulated engine.

use std::fmt;

use crate::context::ContextId;

/// Binds a ciphertext to the key pair it was encrypted under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyId(pub(crate) u64);

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key-{:016x}", self.0)
    }
}

/// Decryption-only half of a key pair. Not `Clone`: one holder per pair.
pub struct SecretKey {
    pub(crate) context: ContextId,
    pub(crate) id: KeyId,
}

impl SecretKey {
    /// Identity shared by both halves of the pair.
    #[must_use]
    pub fn id(&self) -> KeyId {
        self.id
    }

    /// Context the pair belongs to.
    #[must_use]
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Derives the encryption key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey { context: self.context, id: self.id }
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("context", &self.context)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Encryption-only half of a key pair; freely shareable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    pub(crate) context: ContextId,
    pub(crate) id: KeyId,
}

impl PublicKey {
    /// Identity shared by both halves of the pair.
    #[must_use]
    pub fn id(&self) -> KeyId {
        self.id
    }

    /// Context the pair belongs to.
    #[must_use]
    pub fn context(&self) -> ContextId {
        self.context
    }
}
