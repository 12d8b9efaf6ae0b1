//! Q16.16 fixed-point codec.
//!
//! Scene, tree and texture data produced for the fixed-point ray tracer store
//! every real value as a signed 32-bit integer scaled by 65536. Decoding is a
//! plain division; encoding multiplies and truncates toward zero, which is what
//! the producers of the format do. No other rounding mode is bit-compatible.

use std::fmt;

/// Number of fractional bits.
pub const FRACTION_BITS: u32 = 16;

/// Scale between the integer encoding and the real value.
pub const SCALE: i32 = 1 << FRACTION_BITS;

/// Shift that promotes an 8-bit colour channel into the fixed-point range.
///
/// Maps 0..=255 into the high byte of the fractional part, so 255 becomes
/// `0xFF00` (just under 1.0).
pub const CHANNEL_SHIFT: u32 = 8;

/// Decode a wire integer to a real value.
#[inline]
pub fn to_real(raw: i32) -> f64 {
    raw as f64 / SCALE as f64
}

/// Encode a real value, truncating toward zero.
///
/// Values outside the representable range saturate to `i32::MIN`/`i32::MAX`,
/// NaN encodes as zero.
#[inline]
pub fn from_real(value: f64) -> i32 {
    (value * SCALE as f64) as i32
}

/// Promote an 8-bit channel sample to the fixed-point scale.
#[inline]
pub const fn promote_channel(sample: u8) -> i32 {
    (sample as i32) << CHANNEL_SHIFT
}

/// A Q16.16 value kept in its wire representation.
///
/// Holding the raw integer keeps reloads bit-identical; convert with
/// [`Fixed::to_f64`] when a real value is needed.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Fixed(i32);

impl Fixed {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(SCALE);

    /// Wrap a raw wire integer.
    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Encode a real value (truncating toward zero).
    #[inline]
    pub fn from_f64(value: f64) -> Self {
        Self(from_real(value))
    }

    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        to_real(self.0)
    }

    #[inline]
    pub fn to_f32(self) -> f32 {
        self.to_f64() as f32
    }
}

impl fmt::Debug for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed({} = {})", self.0, self.to_f64())
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_f64(), f)
    }
}

impl From<i32> for Fixed {
    #[inline]
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl From<Fixed> for f64 {
    #[inline]
    fn from(value: Fixed) -> Self {
        value.to_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode() {
        assert_eq!(to_real(131072), 2.0);
        assert_eq!(to_real(-32768), -0.5);
        assert_eq!(to_real(1), 1.0 / 65536.0);
        assert_eq!(to_real(0), 0.0);
    }

    #[test]
    fn test_encode_truncates_toward_zero() {
        // 1.99999 * 65536 = 131071.34...
        assert_eq!(from_real(1.99999), 131071);
        // -1.99999 * 65536 = -131071.34..., truncation goes up, not down
        assert_eq!(from_real(-1.99999), -131071);
        // Exactly half a unit still truncates
        assert_eq!(from_real(1.5 / 65536.0), 1);
        assert_eq!(from_real(-1.5 / 65536.0), -1);
    }

    #[test]
    fn test_encode_saturates() {
        assert_eq!(from_real(1.0e12), i32::MAX);
        assert_eq!(from_real(-1.0e12), i32::MIN);
        assert_eq!(from_real(f64::NAN), 0);
    }

    #[test]
    fn test_exact_values_survive() {
        for raw in [i32::MIN, -65536, -1, 0, 1, 65535, 131072, i32::MAX] {
            assert_eq!(from_real(to_real(raw)), raw);
        }
    }

    #[test]
    fn test_promote_channel() {
        assert_eq!(promote_channel(0), 0);
        assert_eq!(promote_channel(1), 256);
        assert_eq!(promote_channel(255), 0xFF00);
    }

    #[test]
    fn test_fixed_wrapper() {
        let f = Fixed::from_raw(131072);
        assert_eq!(f.to_f64(), 2.0);
        assert_eq!(f.to_f32(), 2.0);
        assert_eq!(Fixed::from_f64(2.0), f);
        assert_eq!(Fixed::ONE.to_f64(), 1.0);
        assert_eq!(format!("{}", Fixed::from_raw(-32768)), "-0.5");
    }
}
