//! Equality tests over ciphertexts.
//!
//! Two strategies with different trust requirements:
//!
//! * **decrypt-and-compare** (`decrypt_equals_*`): the caller holds the
//!   secret key. Both operands are decrypted and compared exactly (strings)
//!   or within an absolute tolerance (amounts). This is what the ledger's own
//!   searches use, since the user searches their own records.
//! * **homomorphic indicator** (`indicator`): needs only public material.
//!   With `d = a - b` it evaluates, slot-wise and under encryption,
//!
//!   ```text
//!   ind(d) = (1 - (d / range)^2) ^ (2^squarings)
//!   ```
//!
//!   which is 1 at `d = 0` and falls towards 0 as `|d|` grows to `range`.
//!   The result stays encrypted; whoever holds the secret key decides it
//!   against `decision_threshold`. It cannot separate values closer than
//!   roughly [`IndicatorParams::half_width`], so it is an approximate test.
//!
//! The power is even, so past `|d| = range` the surrogate rises again: it
//! returns to 1 at `|d| = sqrt(2) * range` and grows without bound beyond.
//! Amounts are not restricted to the range, so a decision has two guards.
//! A value above `1 + error_bound` is never a real indicator and decides as
//! "not equal". The narrow band around `sqrt(2) * range` is ruled out by a
//! second indicator over `GUARD_RANGE_RATIO * range`, whose own band lies
//! elsewhere ([`EqualityOracle::indicator_match`]).

use serde::{Deserialize, Serialize};

use crate::{
    algebra::CipherAlgebra,
    encoder::Encoder,
    engine::Engine,
    error::{LedgerError, Result},
};

/// Absolute tolerance of decrypt-and-compare amount equality.
pub const DEFAULT_EQUALITY_TOLERANCE: f64 = 1e-5;

/// Range multiplier of the guard indicator.
pub const GUARD_RANGE_RATIO: f64 = 1.25;

/// Smallest `decision_threshold^(2^-squarings)` for which the guard
/// indicator separates the two wrap-around bands.
const MIN_DECISION_ROOT: f64 = 0.5;

/// Shape of the homomorphic equality surrogate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    /// Largest `|a - b|` the surrogate is evaluated on.
    pub range: f64,
    /// Number of squarings `k`; the polynomial has degree `2^(k+1)`.
    pub squarings: u32,
    /// Decrypted indicator values at or above this count as equal.
    pub decision_threshold: f64,
}

impl IndicatorParams {
    /// `|d|` at which the indicator crosses `decision_threshold`.
    #[must_use]
    pub fn half_width(&self) -> f64 {
        self.range * (1.0 - self.decision_root()).sqrt()
    }

    /// `|1 - (d/range)^2|` at which the indicator crosses the threshold.
    fn decision_root(&self) -> f64 {
        self.decision_threshold.powf((-f64::from(self.squarings)).exp2())
    }

    /// Same surrogate over `GUARD_RANGE_RATIO * range`.
    #[must_use]
    pub fn guard(&self) -> Self {
        Self { range: self.range * GUARD_RANGE_RATIO, ..*self }
    }

    /// Plaintext value of the surrogate at difference `d`.
    #[must_use]
    pub fn evaluate(&self, d: f64) -> f64 {
        let t = d / self.range;
        (1.0 - t * t).powf(f64::from(self.squarings).exp2())
    }

    /// Capacity the circuit consumes: `squarings + 2` multiplications plus
    /// one bit for each of the two subtractions.
    #[must_use]
    pub fn required_capacity(&self, mult_cost: i64) -> i64 {
        (i64::from(self.squarings) + 2) * mult_cost + 2
    }

    /// Rejects non-positive ranges, thresholds outside `(0, 1)` and shapes
    /// the guard indicator cannot protect.
    pub fn validate(&self) -> Result<()> {
        if !(self.range > 0.0 && self.range.is_finite()) {
            return Err(LedgerError::InvalidParameters(format!(
                "indicator range must be positive, got {}",
                self.range
            )));
        }
        if !(self.decision_threshold > 0.0 && self.decision_threshold < 1.0) {
            return Err(LedgerError::InvalidParameters(format!(
                "decision threshold must be in (0, 1), got {}",
                self.decision_threshold
            )));
        }
        if self.decision_root() < MIN_DECISION_ROOT {
            return Err(LedgerError::InvalidParameters(format!(
                "indicator with {} squarings and threshold {} is too shallow to guard",
                self.squarings, self.decision_threshold
            )));
        }
        Ok(())
    }
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self { range: 256.0, squarings: 8, decision_threshold: 0.5 }
    }
}

/// Both equality strategies over one engine.
pub struct EqualityOracle<'a, E: Engine> {
    engine: &'a E,
    encoder: Encoder,
    tolerance: f64,
    indicator: IndicatorParams,
}

impl<'a, E: Engine> EqualityOracle<'a, E> {
    /// Oracle with the given amount tolerance and indicator shape.
    pub fn new(engine: &'a E, tolerance: f64, indicator: IndicatorParams) -> Self {
        Self {
            engine,
            encoder: Encoder::new(engine.slot_count()),
            tolerance,
            indicator,
        }
    }

    /// Absolute tolerance of [`Self::decrypt_equals_amount`].
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Shape of the main indicator.
    #[must_use]
    pub fn indicator_params(&self) -> &IndicatorParams {
        &self.indicator
    }

    /// `|x - y| <= tolerance` on the decrypted amounts. Needs the secret key.
    pub fn decrypt_equals_amount(
        &self,
        sk: &E::SecretKey,
        a: &E::Ciphertext,
        b: &E::Ciphertext,
    ) -> Result<bool> {
        let x = self.encoder.decode_amount(&self.engine.decrypt(sk, a)?);
        let y = self.encoder.decode_amount(&self.engine.decrypt(sk, b)?);
        Ok((x - y).abs() <= self.tolerance)
    }

    /// Exact equality of the decrypted strings. Needs the secret key.
    pub fn decrypt_equals_string(
        &self,
        sk: &E::SecretKey,
        a: &E::Ciphertext,
        b: &E::Ciphertext,
    ) -> Result<bool> {
        let x = self.encoder.decode_string_trimmed(&self.engine.decrypt(sk, a)?)?;
        let y = self.encoder.decode_string_trimmed(&self.engine.decrypt(sk, b)?)?;
        Ok(x == y)
    }

    /// Encrypted slot-wise closeness of `a` and `b`, near 1 when equal.
    /// Uses only the public key.
    pub fn indicator(
        &self,
        pk: &E::PublicKey,
        a: &E::Ciphertext,
        b: &E::Ciphertext,
    ) -> Result<E::Ciphertext> {
        self.evaluate(pk, a, b, &self.indicator)
    }

    /// [`Self::indicator`] over the widened guard range.
    pub fn guard_indicator(
        &self,
        pk: &E::PublicKey,
        a: &E::Ciphertext,
        b: &E::Ciphertext,
    ) -> Result<E::Ciphertext> {
        self.evaluate(pk, a, b, &self.indicator.guard())
    }

    /// Key-holder decision on `a == b` from both indicators. The guard is
    /// only evaluated when the main indicator passes.
    pub fn indicator_match(
        &self,
        pk: &E::PublicKey,
        sk: &E::SecretKey,
        a: &E::Ciphertext,
        b: &E::Ciphertext,
    ) -> Result<bool> {
        if !self.indicator_decision(sk, &self.indicator(pk, a, b)?)? {
            return Ok(false);
        }
        self.indicator_decision(sk, &self.guard_indicator(pk, a, b)?)
    }

    fn evaluate(
        &self,
        pk: &E::PublicKey,
        a: &E::Ciphertext,
        b: &E::Ciphertext,
        params: &IndicatorParams,
    ) -> Result<E::Ciphertext> {
        let required = params.required_capacity(self.engine.mult_cost());
        let capacity = self.engine.capacity(a).min(self.engine.capacity(b));
        if capacity <= required {
            return Err(LedgerError::CapacityExhausted { capacity, required });
        }

        let alg = CipherAlgebra::new(self.engine);
        let scale = alg.encrypt(pk, &self.encoder.encode_constant(params.range.recip()))?;
        let one = alg.encrypt(pk, &self.encoder.encode_constant(1.0))?;

        let t = alg.multiply(&alg.sub(a, b)?, &scale)?;
        let mut ind = alg.sub(&one, &alg.square(&t)?)?;
        for _ in 0..params.squarings {
            ind = alg.square(&ind)?;
        }
        Ok(ind)
    }

    /// Decrypts an indicator and checks that slot 0 lies in
    /// `[decision_threshold, 1 + error_bound]`. Non-finite values and
    /// values above 1 come from differences outside the range.
    pub fn indicator_decision(&self, sk: &E::SecretKey, ind: &E::Ciphertext) -> Result<bool> {
        let v = self.encoder.decode_amount(&self.engine.decrypt(sk, ind)?);
        let ceiling = 1.0 + self.engine.error_bound(ind);
        Ok(v.is_finite() && v >= self.indicator.decision_threshold && v <= ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::EncryptionContext, keys::SecretKey, keys::PublicKey, params::EncryptionParams};

    fn setup() -> (EncryptionContext, SecretKey, PublicKey) {
        let ctx = EncryptionContext::new(EncryptionParams::new(64, 358, 30, 6)).unwrap();
        let sk = ctx.generate_secret_key();
        let pk = ctx.public_key(&sk);
        (ctx, sk, pk)
    }

    #[test]
    fn decrypt_equality_respects_tolerance() {
        let (ctx, sk, pk) = setup();
        let oracle = EqualityOracle::new(&ctx, DEFAULT_EQUALITY_TOLERANCE, IndicatorParams::default());
        let alg = CipherAlgebra::new(&ctx);
        let enc = |x: f64| alg.encrypt_scalar(&pk, x).unwrap();

        let cases = [
            (100.0, 100.0, true),
            (100.0, 100.000_005, true),
            (100.0, 100.001, false),
            (-3.25, -3.25, true),
            (0.0, 50.0, false),
        ];
        for (x, y, expected) in cases {
            assert_eq!(
                oracle.decrypt_equals_amount(&sk, &enc(x), &enc(y)).unwrap(),
                expected,
                "{x} vs {y}"
            );
        }
    }

    #[test]
    fn decrypt_equality_on_strings_is_exact() {
        let (ctx, sk, pk) = setup();
        let oracle = EqualityOracle::new(&ctx, DEFAULT_EQUALITY_TOLERANCE, IndicatorParams::default());
        let encoder = Encoder::new(ctx.slot_count());
        let enc = |s: &str| ctx.encrypt(&pk, &encoder.encode_string(s).unwrap()).unwrap();

        assert!(oracle.decrypt_equals_string(&sk, &enc("Bank A"), &enc("Bank A")).unwrap());
        assert!(!oracle.decrypt_equals_string(&sk, &enc("Bank A"), &enc("Bank B")).unwrap());
        assert!(!oracle.decrypt_equals_string(&sk, &enc("Bank A"), &enc("Bank AB")).unwrap());
        assert!(!oracle.decrypt_equals_string(&sk, &enc("Bank"), &enc("")).unwrap());
    }

    #[test]
    fn indicator_is_near_one_for_equal_amounts() {
        let (ctx, sk, pk) = setup();
        let oracle = EqualityOracle::new(&ctx, DEFAULT_EQUALITY_TOLERANCE, IndicatorParams::default());
        let alg = CipherAlgebra::new(&ctx);
        let a = alg.encrypt_scalar(&pk, 100.0).unwrap();
        let b = alg.encrypt_scalar(&pk, 100.0).unwrap();

        let ind = oracle.indicator(&pk, &a, &b).unwrap();
        let v = alg.decrypt(&sk, &ind).unwrap();
        assert!((v[0] - 1.0).abs() < 1e-3, "indicator {}", v[0]);
        assert!(oracle.indicator_decision(&sk, &ind).unwrap());
    }

    #[test]
    fn indicator_is_near_zero_for_distinct_amounts() {
        let (ctx, sk, pk) = setup();
        let oracle = EqualityOracle::new(&ctx, DEFAULT_EQUALITY_TOLERANCE, IndicatorParams::default());
        let alg = CipherAlgebra::new(&ctx);
        let a = alg.encrypt_scalar(&pk, 100.0).unwrap();

        for other in [50.0, 10.0, 150.0, 300.0] {
            let b = alg.encrypt_scalar(&pk, other).unwrap();
            let ind = oracle.indicator(&pk, &a, &b).unwrap();
            let v = alg.decrypt(&sk, &ind).unwrap();
            assert!(v[0].abs() < 1e-3, "indicator for {other}: {}", v[0]);
            assert!(!oracle.indicator_decision(&sk, &ind).unwrap());
        }
    }

    #[test]
    fn indicator_tracks_the_plaintext_polynomial() {
        let (ctx, sk, pk) = setup();
        let params = IndicatorParams::default();
        let oracle = EqualityOracle::new(&ctx, DEFAULT_EQUALITY_TOLERANCE, params);
        let alg = CipherAlgebra::new(&ctx);
        let a = alg.encrypt_scalar(&pk, 0.0).unwrap();

        for d in [1.0, 5.0, 13.0, 20.0] {
            let b = alg.encrypt_scalar(&pk, d).unwrap();
            let v = alg.decrypt(&sk, &oracle.indicator(&pk, &a, &b).unwrap()).unwrap();
            assert!((v[0] - params.evaluate(d)).abs() < 1e-4, "d = {d}");
        }
    }

    #[test]
    fn far_differences_are_never_equal() {
        let (ctx, sk, pk) = setup();
        let oracle = EqualityOracle::new(&ctx, DEFAULT_EQUALITY_TOLERANCE, IndicatorParams::default());
        let alg = CipherAlgebra::new(&ctx);
        let a = alg.encrypt_scalar(&pk, 100.0).unwrap();

        for other in [500.0, 1000.0, -5_000.0, 1e6, 1e200] {
            let b = alg.encrypt_scalar(&pk, other).unwrap();
            let ind = oracle.indicator(&pk, &a, &b).unwrap();
            let v = alg.decrypt(&sk, &ind).unwrap();
            assert!(v[0] > 1.0, "indicator for {other}: {}", v[0]);
            assert!(!oracle.indicator_decision(&sk, &ind).unwrap(), "{other}");
            assert!(!oracle.indicator_match(&pk, &sk, &a, &b).unwrap(), "{other}");
        }
    }

    #[test]
    fn guard_rejects_the_wrapped_band() {
        let (ctx, sk, pk) = setup();
        let params = IndicatorParams::default();
        let oracle = EqualityOracle::new(&ctx, DEFAULT_EQUALITY_TOLERANCE, params);
        let alg = CipherAlgebra::new(&ctx);
        let a = alg.encrypt_scalar(&pk, 0.0).unwrap();
        let b = alg.encrypt_scalar(&pk, params.range * std::f64::consts::SQRT_2).unwrap();

        // the main surrogate is back at 1 here
        assert!(oracle.indicator_decision(&sk, &oracle.indicator(&pk, &a, &b).unwrap()).unwrap());
        assert!(!oracle.indicator_decision(&sk, &oracle.guard_indicator(&pk, &a, &b).unwrap()).unwrap());
        assert!(!oracle.indicator_match(&pk, &sk, &a, &b).unwrap());

        let c = alg.encrypt_scalar(&pk, 2.0).unwrap();
        assert!(oracle.indicator_match(&pk, &sk, &a, &c).unwrap());
    }

    #[test]
    fn decision_boundary_sits_at_half_width() {
        let params = IndicatorParams::default();
        let w = params.half_width();
        assert!((w - 13.31).abs() < 0.01, "half width {w}");
        assert!((params.evaluate(w) - 0.5).abs() < 1e-9);
        assert!(params.evaluate(w / 2.0) > params.decision_threshold);
        assert!(params.evaluate(w * 2.0) < params.decision_threshold);
        assert!((params.evaluate(0.0) - 1.0).abs() < f64::EPSILON);

        // more squarings narrow the band
        let sharper = IndicatorParams { squarings: 10, ..params };
        assert!(sharper.half_width() < w);
    }

    #[test]
    fn indicator_refuses_tired_operands() {
        let (ctx, _sk, pk) = setup();
        let oracle = EqualityOracle::new(&ctx, DEFAULT_EQUALITY_TOLERANCE, IndicatorParams::default());
        let alg = CipherAlgebra::new(&ctx);
        let a = alg.encrypt_scalar(&pk, 2.0).unwrap();
        let b = alg.multiply(&alg.multiply(&a, &a).unwrap(), &a).unwrap();

        match oracle.indicator(&pk, &b, &a) {
            Err(LedgerError::CapacityExhausted { capacity, required }) => {
                assert_eq!(capacity, 358 - 60);
                assert_eq!(required, 302);
            }
            other => panic!("expected CapacityExhausted, got {other:?}"),
        }
    }

    #[test]
    fn indicator_params_validation() {
        assert!(IndicatorParams::default().validate().is_ok());
        assert!(IndicatorParams { range: 0.0, ..Default::default() }.validate().is_err());
        assert!(IndicatorParams { decision_threshold: 1.0, ..Default::default() }.validate().is_err());
        let shallow = IndicatorParams { squarings: 0, decision_threshold: 0.1, ..Default::default() };
        assert!(matches!(shallow.validate(), Err(LedgerError::InvalidParameters(_))));
        assert!(IndicatorParams { squarings: 0, ..Default::default() }.validate().is_ok());
    }
}
