//! Error types for the encrypted ledger.

use crate::context::ContextId;

/// Every failure of a ledger or engine operation.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A string needs more slots than the context has.
    #[error("value of {len} bytes does not fit in {slots} slots")]
    ValueTooLong {
        /// Length of the value in bytes.
        len: usize,
        /// Slot count of the context.
        slots: usize,
    },

    /// Objects from two different encryption contexts were combined.
    #[error("operands belong to different encryption contexts ({expected} vs {found})")]
    ContextMismatch {
        /// Context performing the operation.
        expected: ContextId,
        /// Context the offending object came from.
        found: ContextId,
    },

    /// Ciphertexts under two different key pairs were combined.
    #[error("operands were encrypted under different key pairs")]
    KeyMismatch,

    /// A ciphertext has too little capacity left for the operation.
    #[error("capacity exhausted: {capacity} bits left, {required} required")]
    CapacityExhausted {
        /// Bits the ciphertext has left.
        capacity: i64,
        /// Bits the operation needs.
        required: i64,
    },

    /// Wrong secret key, or a ciphertext with no capacity left.
    #[error("Decryption failed: {0}")]
    DecryptionFailure(String),

    /// Decrypted slots are not a valid byte string.
    #[error("Decoding failed: {0}")]
    Decoding(String),

    /// A decrypted date is not a number of Unix seconds.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Engine, indicator or policy parameters are inconsistent.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// The configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LedgerError>;
