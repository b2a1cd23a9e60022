//! Ledger configuration, loadable from TOML.
//!
//! ```toml
//! bootstrap_threshold = 5
//! equality_tolerance = 1e-5
//!
//! [params]
//! m = 32768
//! bits = 358
//! precision = 30
//! c = 6
//!
//! [indicator]
//! range = 256.0
//! squarings = 8
//! decision_threshold = 0.5
//! ```
//!
//! Every key is optional; missing ones take the defaults above.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    equality::{IndicatorParams, DEFAULT_EQUALITY_TOLERANCE},
    error::{LedgerError, Result},
    params::EncryptionParams,
    refresher::DEFAULT_BOOTSTRAP_THRESHOLD,
};

/// Policy constants and engine parameters of an [`crate::OpenBanking`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Capacity below which stored amounts are refreshed.
    pub bootstrap_threshold: i64,
    /// Absolute tolerance of decrypt-and-compare amount equality.
    pub equality_tolerance: f64,
    /// Parameters of the simulated engine.
    pub params: EncryptionParams,
    /// Shape of the homomorphic equality surrogate.
    pub indicator: IndicatorParams,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            bootstrap_threshold: DEFAULT_BOOTSTRAP_THRESHOLD,
            equality_tolerance: DEFAULT_EQUALITY_TOLERANCE,
            params: EncryptionParams::default(),
            indicator: IndicatorParams::default(),
        }
    }
}

impl LedgerConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// Serializes to pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| LedgerError::Config(e.to_string()))
    }

    /// Checks every parameter and their mutual constraints.
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        self.indicator.validate()?;
        if !(self.equality_tolerance > 0.0 && self.equality_tolerance.is_finite()) {
            return Err(LedgerError::InvalidParameters(format!(
                "equality tolerance must be positive, got {}",
                self.equality_tolerance
            )));
        }
        let fresh = self.params.fresh_capacity();
        if !(1..=fresh).contains(&self.bootstrap_threshold) {
            return Err(LedgerError::InvalidParameters(format!(
                "bootstrap threshold {} outside 1..={fresh}",
                self.bootstrap_threshold
            )));
        }
        let required = self.indicator.required_capacity(self.params.mult_cost());
        if required >= fresh {
            return Err(LedgerError::InvalidParameters(format!(
                "indicator needs {required} bits of capacity, fresh ciphertexts have {fresh}"
            )));
        }
        Ok(())
    }
}
