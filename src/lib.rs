//! hebank: encrypted open-banking ledger over an approximate (CKKS-style)
//! homomorphic encryption engine.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, missing_docs)]

/// Ciphertext arithmetic over an engine.
pub mod algebra;
/// Ciphertexts of the simulated engine.
pub mod cipher;
/// TOML configuration.
pub mod config;
/// The simulated CKKS engine.
pub mod context;
/// Slot-vector encodings of ledger values.
pub mod encoder;
/// The engine trait.
pub mod engine;
/// Equality over ciphertexts.
pub mod equality;
/// Crate error type.
pub mod error;
/// Key pairs of the simulated engine.
pub mod keys;
/// Encrypted transaction records.
pub mod ledger;
/// Ledger operations.
pub mod open_banking;
/// Engine parameters.
pub mod params;
/// Capacity refresh policy.
pub mod refresher;
/// Account holders.
pub mod user;

pub use algebra::CipherAlgebra;
pub use cipher::Ciphertext;
pub use config::LedgerConfig;
pub use context::{ContextId, EncryptionContext};
pub use encoder::{Encoder, SlotVector};
pub use engine::Engine;
pub use equality::{EqualityOracle, IndicatorParams};
pub use error::{LedgerError, Result};
pub use keys::{KeyId, PublicKey, SecretKey};
pub use ledger::{Ledger, Transaction, TransactionKind};
pub use open_banking::{OpenBanking, RevealedTransaction};
pub use params::EncryptionParams;
pub use refresher::Refresher;
pub use user::{Bank, User};
