//! Packing of amounts, strings and timestamps into slot vectors.
//!
//! Amounts occupy slot 0. Strings occupy one slot per byte. Timestamps are
//! stored as the decimal string of their Unix seconds, so a date is a
//! string on the wire and inherits string equality. Unused slots are zero.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use nalgebra::DVector;

use crate::error::{LedgerError, Result};

/// Plaintext unit of the engine: one `f64` per slot.
pub type SlotVector = DVector<f64>;

/// Converts ledger values to and from slot vectors of a fixed width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Encoder {
    slots: usize,
}

impl Encoder {
    /// Encoder for vectors of `slots` slots.
    #[must_use]
    pub fn new(slots: usize) -> Self {
        Self { slots }
    }

    /// Width of every vector this encoder produces.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots
    }

    /// `x` in slot 0, zeros elsewhere.
    #[must_use]
    pub fn encode_amount(&self, x: f64) -> SlotVector {
        let mut v = SlotVector::zeros(self.slots);
        v[0] = x;
        v
    }

    /// `x` in every slot.
    #[must_use]
    pub fn encode_constant(&self, x: f64) -> SlotVector {
        SlotVector::from_element(self.slots, x)
    }

    /// Places `values` in the leading slots.
    pub fn encode_slots(&self, values: &[f64]) -> Result<SlotVector> {
        if values.len() > self.slots {
            return Err(LedgerError::ValueTooLong { len: values.len(), slots: self.slots });
        }
        let mut v = SlotVector::zeros(self.slots);
        v.rows_mut(0, values.len()).copy_from_slice(values);
        Ok(v)
    }

    /// One byte per slot; fails with `ValueTooLong` past the slot count.
    pub fn encode_string(&self, s: &str) -> Result<SlotVector> {
        let bytes = s.as_bytes();
        if bytes.len() > self.slots {
            return Err(LedgerError::ValueTooLong { len: bytes.len(), slots: self.slots });
        }
        let mut v = SlotVector::zeros(self.slots);
        for (slot, &b) in v.iter_mut().zip(bytes) {
            *slot = f64::from(b);
        }
        Ok(v)
    }

    /// Decimal Unix seconds of `t`, encoded as a string.
    pub fn encode_timestamp(&self, t: SystemTime) -> Result<SlotVector> {
        self.encode_string(&unix_seconds(t)?.to_string())
    }

    /// Slot 0.
    #[must_use]
    pub fn decode_amount(&self, v: &SlotVector) -> f64 {
        v[0]
    }

    /// Decodes the first `length` slots; each is rounded to the nearest byte
    /// since approximate arithmetic leaves slots off exact integers.
    pub fn decode_string(&self, v: &SlotVector, length: usize) -> Result<String> {
        if length > v.len() {
            return Err(LedgerError::Decoding(format!(
                "requested {length} bytes from a {}-slot vector",
                v.len()
            )));
        }
        let bytes = v
            .iter()
            .take(length)
            .map(|&x| round_to_byte(x))
            .collect::<Result<Vec<u8>>>()?;
        String::from_utf8(bytes).map_err(|e| LedgerError::Decoding(e.to_string()))
    }

    /// Decodes up to the last slot that rounds to a non-zero byte.
    pub fn decode_string_trimmed(&self, v: &SlotVector) -> Result<String> {
        let length = v
            .as_slice()
            .iter()
            .rposition(|&x| x.round() != 0.0)
            .map_or(0, |i| i + 1);
        self.decode_string(v, length)
    }

    /// Inverse of [`Self::encode_timestamp`], at whole-second resolution.
    pub fn decode_timestamp(&self, v: &SlotVector) -> Result<SystemTime> {
        let text = self
            .decode_string_trimmed(v)
            .map_err(|e| LedgerError::InvalidTimestamp(e.to_string()))?;
        let secs: i64 = text
            .parse()
            .map_err(|_| LedgerError::InvalidTimestamp(format!("{text:?} is not a number of seconds")))?;
        from_unix_seconds(secs)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_to_byte(x: f64) -> Result<u8> {
    let r = x.round();
    if (0.0..=255.0).contains(&r) {
        Ok(r as u8)
    } else {
        Err(LedgerError::Decoding(format!("slot value {x} is not a byte")))
    }
}

/// Whole Unix seconds of `t`, truncated towards the epoch.
pub fn unix_seconds(t: SystemTime) -> Result<i64> {
    let overflow = |_| LedgerError::InvalidTimestamp("timestamp out of range".into());
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_secs()).map_err(overflow),
        Err(e) => i64::try_from(e.duration().as_secs()).map(|s| -s).map_err(overflow),
    }
}

/// Instant `secs` seconds from the epoch; negative values lie before it.
pub fn from_unix_seconds(secs: i64) -> Result<SystemTime> {
    let d = Duration::from_secs(secs.unsigned_abs());
    let t = if secs >= 0 {
        UNIX_EPOCH.checked_add(d)
    } else {
        UNIX_EPOCH.checked_sub(d)
    };
    t.ok_or_else(|| LedgerError::InvalidTimestamp(format!("{secs} seconds is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_lives_in_slot_zero() {
        let enc = Encoder::new(16);
        let v = enc.encode_amount(42.5);
        assert_eq!(v.len(), 16);
        assert_eq!(v[0], 42.5);
        assert!(v.iter().skip(1).all(|&x| x == 0.0));
        assert_eq!(enc.decode_amount(&v), 42.5);
    }

    #[test]
    fn string_uses_one_slot_per_byte() {
        let enc = Encoder::new(16);
        let v = enc.encode_string("Bank A").unwrap();
        assert_eq!(v[0], f64::from(b'B'));
        assert_eq!(v[5], f64::from(b'A'));
        assert_eq!(v[6], 0.0);
        assert_eq!(enc.decode_string(&v, 6).unwrap(), "Bank A");
        assert_eq!(enc.decode_string_trimmed(&v).unwrap(), "Bank A");
    }

    #[test]
    fn string_exactly_filling_the_slots_is_accepted() {
        let enc = Encoder::new(4);
        let v = enc.encode_string("abcd").unwrap();
        assert_eq!(enc.decode_string_trimmed(&v).unwrap(), "abcd");
    }

    #[test]
    fn too_long_string_is_rejected() {
        let enc = Encoder::new(4);
        match enc.encode_string("abcde") {
            Err(LedgerError::ValueTooLong { len, slots }) => {
                assert_eq!(len, 5);
                assert_eq!(slots, 4);
            }
            other => panic!("expected ValueTooLong, got {other:?}"),
        }
    }

    #[test]
    fn decoding_rounds_drifted_slots() {
        let enc = Encoder::new(8);
        let mut v = enc.encode_string("xyz").unwrap();
        v[0] += 0.3;
        v[1] -= 0.4;
        v[3] = 1e-7;
        assert_eq!(enc.decode_string_trimmed(&v).unwrap(), "xyz");
    }

    #[test]
    fn non_byte_slots_fail_to_decode() {
        let enc = Encoder::new(4);
        let v = enc.encode_slots(&[300.0]).unwrap();
        assert!(matches!(enc.decode_string(&v, 1), Err(LedgerError::Decoding(_))));
        let v = enc.encode_slots(&[-2.0]).unwrap();
        assert!(matches!(enc.decode_string(&v, 1), Err(LedgerError::Decoding(_))));
    }

    #[test]
    fn utf8_strings_survive() {
        let enc = Encoder::new(32);
        let v = enc.encode_string("Caixa Econômica").unwrap();
        assert_eq!(enc.decode_string_trimmed(&v).unwrap(), "Caixa Econômica");
    }

    #[test]
    fn timestamp_is_decimal_seconds() {
        let enc = Encoder::new(32);
        let t = UNIX_EPOCH + Duration::from_millis(1_700_000_000_900);
        let v = enc.encode_timestamp(t).unwrap();
        assert_eq!(enc.decode_string_trimmed(&v).unwrap(), "1700000000");
        assert_eq!(
            enc.decode_timestamp(&v).unwrap(),
            UNIX_EPOCH + Duration::from_secs(1_700_000_000)
        );
    }

    #[test]
    fn pre_epoch_timestamps_round_trip() {
        let enc = Encoder::new(32);
        let t = UNIX_EPOCH - Duration::from_secs(86_400);
        let v = enc.encode_timestamp(t).unwrap();
        assert_eq!(enc.decode_timestamp(&v).unwrap(), t);
    }

    #[test]
    fn garbage_date_is_invalid_timestamp() {
        let enc = Encoder::new(32);
        let v = enc.encode_string("yesterday").unwrap();
        assert!(matches!(enc.decode_timestamp(&v), Err(LedgerError::InvalidTimestamp(_))));
    }
}
