//! In-process CKKS behaviour simulator.
//!
//! `EncryptionContext` reproduces what the ledger observes from a CKKS
//! engine: slot-wise approximate arithmetic, Gaussian encoding noise, a
//! capacity in bits that every rescale (multiplication) consumes, and an
//! error bound that grows with each operation. Keys and ciphertexts are bound
//! to the context and key pair that produced them.
//!
//! It offers no confidentiality. Slot values are held as plain `f64`s; a
//! lattice backend replaces it behind [`Engine`] without changes elsewhere.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::{thread_rng, Rng};
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::{
    cipher::Ciphertext,
    encoder::SlotVector,
    engine::Engine,
    error::{LedgerError, Result},
    keys::{KeyId, PublicKey, SecretKey},
    params::EncryptionParams,
};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an [`EncryptionContext`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Process-wide scheme state; immutable once built.
#[derive(Debug)]
pub struct EncryptionContext {
    id: ContextId,
    params: EncryptionParams,
    fresh_error: f64,
    noise: Normal<f64>,
}

impl EncryptionContext {
    /// Validates `params` and builds a context with a fresh id.
    pub fn new(params: EncryptionParams) -> Result<Self> {
        params.validate()?;
        let fresh_error = params.fresh_error_bound();
        let noise = Normal::new(0.0, fresh_error / 8.0)
            .map_err(|e| LedgerError::InvalidParameters(e.to_string()))?;
        let id = ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed));
        debug!(
            context = %id,
            m = params.m,
            bits = params.bits,
            precision = params.precision,
            slots = params.slot_count(),
            "built encryption context"
        );
        Ok(Self { id, params, fresh_error, noise })
    }

    /// Identity stamped on every key and ciphertext of this context.
    #[must_use]
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Parameters the context was built with.
    #[must_use]
    pub fn params(&self) -> &EncryptionParams {
        &self.params
    }

    /// Encoding noise, clamped to half the fresh error bound.
    fn sample_noise(&self) -> SlotVector {
        let mut rng = thread_rng();
        let bound = self.fresh_error / 2.0;
        SlotVector::from_fn(self.params.slot_count(), |_, _| {
            self.noise.sample(&mut rng).clamp(-bound, bound)
        })
    }

    fn check_context(&self, found: ContextId) -> Result<()> {
        if found == self.id {
            Ok(())
        } else {
            Err(LedgerError::ContextMismatch { expected: self.id, found })
        }
    }

    fn check_pair(&self, a: &Ciphertext, b: &Ciphertext) -> Result<()> {
        self.check_context(a.context)?;
        self.check_context(b.context)?;
        if a.key != b.key {
            return Err(LedgerError::KeyMismatch);
        }
        Ok(())
    }

    fn check_live(ct: &Ciphertext, required: i64) -> Result<()> {
        if ct.capacity() <= 0 {
            return Err(LedgerError::CapacityExhausted { capacity: ct.capacity(), required });
        }
        Ok(())
    }

    /// Sum or difference; capacity drops by the log of the error growth,
    /// which is at most one bit.
    fn combine(&self, a: &Ciphertext, b: &Ciphertext, slots: SlotVector) -> Ciphertext {
        let error_bound = a.error_bound + b.error_bound;
        let ratio = a.error_bound.min(b.error_bound) / a.error_bound.max(b.error_bound);
        let growth = if ratio.is_finite() { ratio.ln_1p() / std::f64::consts::LN_2 } else { 1.0 };
        Ciphertext {
            context: self.id,
            key: a.key,
            slots,
            capacity: (a.capacity.min(b.capacity) - growth).max(0.0),
            error_bound,
        }
    }
}

impl Engine for EncryptionContext {
    type Ciphertext = Ciphertext;
    type PublicKey = PublicKey;
    type SecretKey = SecretKey;

    fn slot_count(&self) -> usize {
        self.params.slot_count()
    }

    fn max_capacity(&self) -> i64 {
        self.params.fresh_capacity()
    }

    fn mult_cost(&self) -> i64 {
        self.params.mult_cost()
    }

    fn generate_secret_key(&self) -> SecretKey {
        let id = KeyId(thread_rng().gen());
        debug!(context = %self.id, key = %id, "generated secret key");
        SecretKey { context: self.id, id }
    }

    fn public_key(&self, secret: &SecretKey) -> PublicKey {
        secret.public_key()
    }

    fn encrypt(&self, pk: &PublicKey, slots: &SlotVector) -> Result<Ciphertext> {
        self.check_context(pk.context)?;
        if slots.len() != self.slot_count() {
            return Err(LedgerError::InvalidParameters(format!(
                "plaintext has {} slots, context expects {}",
                slots.len(),
                self.slot_count()
            )));
        }
        #[allow(clippy::cast_precision_loss)]
        let capacity = self.params.fresh_capacity() as f64;
        Ok(Ciphertext {
            context: self.id,
            key: pk.id,
            slots: slots + self.sample_noise(),
            capacity,
            error_bound: self.fresh_error,
        })
    }

    fn decrypt(&self, sk: &SecretKey, ct: &Ciphertext) -> Result<SlotVector> {
        self.check_context(sk.context)?;
        self.check_context(ct.context)?;
        if sk.id != ct.key {
            return Err(LedgerError::DecryptionFailure(format!(
                "{} cannot decrypt a ciphertext under {}",
                sk.id, ct.key
            )));
        }
        if ct.capacity() <= 0 {
            return Err(LedgerError::DecryptionFailure(
                "ciphertext capacity is exhausted".into(),
            ));
        }
        Ok(ct.slots.clone())
    }

    fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        self.check_pair(a, b)?;
        Self::check_live(a, 1)?;
        Self::check_live(b, 1)?;
        Ok(self.combine(a, b, &a.slots + &b.slots))
    }

    fn sub(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        self.check_pair(a, b)?;
        Self::check_live(a, 1)?;
        Self::check_live(b, 1)?;
        Ok(self.combine(a, b, &a.slots - &b.slots))
    }

    fn multiply(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        self.check_pair(a, b)?;
        let cost = self.mult_cost();
        Self::check_live(a, cost)?;
        Self::check_live(b, cost)?;

        // |xy - x'y'| <= |x|e_b + |y|e_a + e_a e_b, plus the rescale rounding
        let error_bound = a.slots.amax() * b.error_bound
            + b.slots.amax() * a.error_bound
            + a.error_bound * b.error_bound
            + self.fresh_error;
        #[allow(clippy::cast_precision_loss)]
        let capacity = (a.capacity.min(b.capacity) - cost as f64).max(0.0);
        Ok(Ciphertext {
            context: self.id,
            key: a.key,
            slots: a.slots.component_mul(&b.slots) + self.sample_noise(),
            capacity,
            error_bound,
        })
    }

    fn negate(&self, a: &Ciphertext) -> Result<Ciphertext> {
        self.check_context(a.context)?;
        Self::check_live(a, 1)?;
        Ok(Ciphertext { slots: -&a.slots, ..a.clone() })
    }

    fn capacity(&self, ct: &Ciphertext) -> i64 {
        ct.capacity()
    }

    fn error_bound(&self, ct: &Ciphertext) -> f64 {
        ct.error_bound()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;

    fn small() -> EncryptionContext {
        EncryptionContext::new(EncryptionParams::new(64, 358, 30, 6)).unwrap()
    }

    #[test]
    fn fresh_encryption_round_trips_within_bound() {
        let ctx = small();
        let enc = Encoder::new(ctx.slot_count());
        let sk = ctx.generate_secret_key();
        let pk = ctx.public_key(&sk);

        let ct = ctx.encrypt(&pk, &enc.encode_amount(34.9)).unwrap();
        assert_eq!(ctx.capacity(&ct), 358);
        let x = enc.decode_amount(&ctx.decrypt(&sk, &ct).unwrap());
        assert!((x - 34.9).abs() <= ctx.error_bound(&ct));
    }

    #[test]
    fn default_parameters_encrypt_every_slot() {
        let ctx = EncryptionContext::new(EncryptionParams::default()).unwrap();
        let enc = Encoder::new(ctx.slot_count());
        let sk = ctx.generate_secret_key();

        let ct = ctx.encrypt(&sk.public_key(), &enc.encode_string("Bank of Test").unwrap()).unwrap();
        assert_eq!(ctx.capacity(&ct), 358);
        let v = ctx.decrypt(&sk, &ct).unwrap();
        assert_eq!(v.len(), 8192);
        assert!(v.iter().skip(12).all(|x| x.abs() <= ctx.error_bound(&ct)));
        assert_eq!(enc.decode_string_trimmed(&v).unwrap(), "Bank of Test");
    }

    #[test]
    fn decrypting_with_another_key_fails() {
        let ctx = small();
        let enc = Encoder::new(ctx.slot_count());
        let alice = ctx.generate_secret_key();
        let bob = ctx.generate_secret_key();

        let ct = ctx.encrypt(&alice.public_key(), &enc.encode_amount(1.0)).unwrap();
        assert!(matches!(ctx.decrypt(&bob, &ct), Err(LedgerError::DecryptionFailure(_))));
    }

    #[test]
    fn mixing_key_pairs_is_rejected() {
        let ctx = small();
        let enc = Encoder::new(ctx.slot_count());
        let a = ctx.encrypt(&ctx.generate_secret_key().public_key(), &enc.encode_amount(1.0)).unwrap();
        let b = ctx.encrypt(&ctx.generate_secret_key().public_key(), &enc.encode_amount(2.0)).unwrap();
        assert!(matches!(ctx.add(&a, &b), Err(LedgerError::KeyMismatch)));
    }

    #[test]
    fn mixing_contexts_is_rejected() {
        let ctx1 = small();
        let ctx2 = small();
        assert_ne!(ctx1.id(), ctx2.id());

        let enc = Encoder::new(ctx1.slot_count());
        let sk1 = ctx1.generate_secret_key();
        let sk2 = ctx2.generate_secret_key();
        let a = ctx1.encrypt(&sk1.public_key(), &enc.encode_amount(1.0)).unwrap();
        let b = ctx2.encrypt(&sk2.public_key(), &enc.encode_amount(2.0)).unwrap();

        match ctx1.multiply(&a, &b) {
            Err(LedgerError::ContextMismatch { expected, found }) => {
                assert_eq!(expected, ctx1.id());
                assert_eq!(found, ctx2.id());
            }
            other => panic!("expected ContextMismatch, got {other:?}"),
        }
        assert!(matches!(ctx2.decrypt(&sk2, &a), Err(LedgerError::ContextMismatch { .. })));
        assert!(matches!(
            ctx1.encrypt(&sk2.public_key(), &enc.encode_amount(0.0)),
            Err(LedgerError::ContextMismatch { .. })
        ));
    }

    #[test]
    fn multiplication_costs_precision_bits() {
        let ctx = small();
        let enc = Encoder::new(ctx.slot_count());
        let sk = ctx.generate_secret_key();
        let pk = sk.public_key();

        let a = ctx.encrypt(&pk, &enc.encode_amount(34.9)).unwrap();
        let b = ctx.encrypt(&pk, &enc.encode_amount(3.4)).unwrap();
        let c = ctx.multiply(&a, &b).unwrap();
        let d = ctx.add(&a, &b).unwrap();

        assert_eq!(ctx.capacity(&c), 358 - 30);
        assert!(ctx.capacity(&d) >= 357);
        assert!(ctx.error_bound(&c) > ctx.error_bound(&a));
        assert!(ctx.error_bound(&d) > ctx.error_bound(&a));

        let prod = enc.decode_amount(&ctx.decrypt(&sk, &c).unwrap());
        assert!((prod - 34.9 * 3.4).abs() <= ctx.error_bound(&c));
        let sum = enc.decode_amount(&ctx.decrypt(&sk, &d).unwrap());
        assert!((sum - 38.3).abs() <= ctx.error_bound(&d));
    }

    #[test]
    fn repeated_squaring_runs_out_of_capacity() {
        let ctx = small();
        let enc = Encoder::new(ctx.slot_count());
        let sk = ctx.generate_secret_key();
        let mut total = ctx.encrypt(&sk.public_key(), &enc.encode_amount(1.01)).unwrap();

        let mut squarings = 0;
        while ctx.capacity(&total) > 0 {
            total = ctx.square(&total).unwrap();
            squarings += 1;
        }
        assert_eq!(squarings, 12);

        assert!(matches!(ctx.square(&total), Err(LedgerError::CapacityExhausted { capacity: 0, .. })));
        assert!(matches!(ctx.decrypt(&sk, &total), Err(LedgerError::DecryptionFailure(_))));
    }

    #[test]
    fn overflowed_error_bounds_still_cost_one_bit() {
        let ctx = small();
        let enc = Encoder::new(ctx.slot_count());
        let sk = ctx.generate_secret_key();
        let pk = sk.public_key();

        let mut big = ctx.encrypt(&pk, &enc.encode_amount(1e200)).unwrap();
        big = ctx.square(&big).unwrap();
        big = ctx.square(&big).unwrap();
        assert!(ctx.error_bound(&big).is_infinite());

        let twice = ctx.add(&big, &big).unwrap();
        assert_eq!(ctx.capacity(&twice), ctx.capacity(&big) - 1);

        let one = ctx.encrypt(&pk, &enc.encode_amount(1.0)).unwrap();
        let diff = ctx.sub(&one, &big).unwrap();
        assert_eq!(ctx.capacity(&diff), ctx.capacity(&big));
        assert!(ctx.square(&diff).is_ok());
    }

    #[test]
    fn negation_is_free() {
        let ctx = small();
        let enc = Encoder::new(ctx.slot_count());
        let sk = ctx.generate_secret_key();
        let a = ctx.encrypt(&sk.public_key(), &enc.encode_amount(5.0)).unwrap();
        let n = ctx.negate(&a).unwrap();
        assert_eq!(ctx.capacity(&n), ctx.capacity(&a));
        let x = enc.decode_amount(&ctx.decrypt(&sk, &n).unwrap());
        assert!((x + 5.0).abs() <= ctx.error_bound(&n));
    }

    #[test]
    fn wrong_plaintext_width_is_rejected() {
        let ctx = small();
        let sk = ctx.generate_secret_key();
        let v = Encoder::new(ctx.slot_count() + 1).encode_amount(1.0);
        assert!(matches!(
            ctx.encrypt(&sk.public_key(), &v),
            Err(LedgerError::InvalidParameters(_))
        ));
    }
}
