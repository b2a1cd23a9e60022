//! CKKS-style scheme parameters.
//!
//! The default set mirrors the HElib context the ledger was first deployed
//! with: `m = 32768`, `bits = 358`, `precision = 30`, `c = 6`.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// Cyclotomic index of the default parameter set.
pub const DEFAULT_M: usize = 32 * 1024;
/// Bits in the modulus chain; also the capacity of a fresh ciphertext.
pub const DEFAULT_BITS: u32 = 358;
/// Bits of fixed-point precision kept per slot.
pub const DEFAULT_PRECISION: u32 = 30;
/// Columns in the key-switching matrix.
pub const DEFAULT_C: u32 = 6;

/// Parameter set for an [`crate::EncryptionContext`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionParams {
    /// Cyclotomic index; must be a power of two.
    pub m: usize,
    /// Modulus chain size in bits.
    pub bits: u32,
    /// Fixed-point precision in bits.
    pub precision: u32,
    /// Key-switching columns.
    pub c: u32,
}

impl EncryptionParams {
    /// Parameter set from its four components.
    #[must_use]
    pub fn new(m: usize, bits: u32, precision: u32, c: u32) -> Self {
        Self { m, bits, precision, c }
    }

    /// Number of complex slots, `φ(m) / 2 = m / 4` for power-of-two `m`.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.m / 4
    }

    /// Ring dimension `φ(m) = m / 2`.
    #[must_use]
    pub fn ring_dimension(&self) -> usize {
        self.m / 2
    }

    /// Capacity of a freshly encrypted ciphertext.
    #[must_use]
    pub fn fresh_capacity(&self) -> i64 {
        i64::from(self.bits)
    }

    /// Capacity consumed by one ciphertext multiplication (one rescale).
    #[must_use]
    pub fn mult_cost(&self) -> i64 {
        i64::from(self.precision)
    }

    /// Absolute error bound of a fresh encryption, `2^-precision`.
    #[must_use]
    pub fn fresh_error_bound(&self) -> f64 {
        (-f64::from(self.precision)).exp2()
    }

    /// Rejects `m` below 8 or not a power of two, `precision` outside
    /// `1..bits`, and `c = 0`.
    pub fn validate(&self) -> Result<()> {
        if self.m < 8 || !self.m.is_power_of_two() {
            return Err(LedgerError::InvalidParameters(format!(
                "m must be a power of two >= 8, got {}",
                self.m
            )));
        }
        if self.precision == 0 || self.precision >= self.bits {
            return Err(LedgerError::InvalidParameters(format!(
                "precision ({}) must be in 1..bits ({})",
                self.precision, self.bits
            )));
        }
        if self.c == 0 {
            return Err(LedgerError::InvalidParameters("c must be positive".into()));
        }
        Ok(())
    }
}

impl Default for EncryptionParams {
    fn default() -> Self {
        Self::new(DEFAULT_M, DEFAULT_BITS, DEFAULT_PRECISION, DEFAULT_C)
    }
}
