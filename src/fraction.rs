//! Exact musical time.
//!
//! Positions and durations are measured in whole notes (a quarter note is
//! `1/4`). Keeping them rational means measure start ticks never drift,
//! however many meter or tuplet changes precede them.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};

use num_rational::Rational64;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// A reduced rational time position or duration. Serialized as a
/// `[numerator, denominator]` pair.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Fraction(Rational64);

impl Fraction {
    pub const ZERO: Fraction = Fraction(Rational64::new_raw(0, 1));

    /// Create a fraction. Panics if `denominator` is zero; use
    /// [`Fraction::try_new`] for untrusted input.
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Fraction(Rational64::new(numerator, denominator))
    }

    pub fn try_new(numerator: i64, denominator: i64) -> Option<Self> {
        if denominator == 0 {
            None
        } else {
            Some(Self::new(numerator, denominator))
        }
    }

    pub fn from_integer(n: i64) -> Self {
        Fraction(Rational64::from_integer(n))
    }

    /// Convert a tick count at `division` ticks per quarter note.
    pub fn from_ticks(ticks: i64, division: i64) -> Self {
        Self::new(ticks, division * 4)
    }

    /// Tick count at `division` ticks per quarter note, rounded down.
    pub fn ticks(self, division: i64) -> i64 {
        (self.0 * Rational64::from_integer(division * 4)).floor().to_integer()
    }

    pub fn numerator(self) -> i64 {
        *self.0.numer()
    }

    pub fn denominator(self) -> i64 {
        *self.0.denom()
    }

    pub fn is_zero(self) -> bool {
        self.numerator() == 0
    }

    pub fn is_negative(self) -> bool {
        self.numerator() < 0
    }

    pub fn is_positive(self) -> bool {
        self.numerator() > 0
    }

    pub fn to_f64(self) -> f64 {
        self.numerator() as f64 / self.denominator() as f64
    }

    /// Length in quarter notes, the unit tempo is expressed in.
    pub fn quarters(self) -> f64 {
        self.to_f64() * 4.0
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Fraction::ZERO
    }
}

/// Reads a `[numerator, denominator]` pair and reduces it, so the sign
/// always sits on the numerator.
impl<'de> Deserialize<'de> for Fraction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (numerator, denominator) = <(i64, i64)>::deserialize(deserializer)?;
        Fraction::try_new(numerator, denominator).ok_or_else(|| {
            de::Error::custom(format!("fraction {numerator}/{denominator} has a zero denominator"))
        })
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator(), self.denominator())
    }
}

impl fmt::Debug for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fraction({}/{})", self.numerator(), self.denominator())
    }
}

impl Add for Fraction {
    type Output = Fraction;
    fn add(self, rhs: Fraction) -> Fraction {
        Fraction(self.0 + rhs.0)
    }
}

impl AddAssign for Fraction {
    fn add_assign(&mut self, rhs: Fraction) {
        self.0 += rhs.0;
    }
}

impl Sub for Fraction {
    type Output = Fraction;
    fn sub(self, rhs: Fraction) -> Fraction {
        Fraction(self.0 - rhs.0)
    }
}

impl SubAssign for Fraction {
    fn sub_assign(&mut self, rhs: Fraction) {
        self.0 -= rhs.0;
    }
}

impl Mul<i64> for Fraction {
    type Output = Fraction;
    fn mul(self, rhs: i64) -> Fraction {
        Fraction(self.0 * Rational64::from_integer(rhs))
    }
}

impl Mul for Fraction {
    type Output = Fraction;
    fn mul(self, rhs: Fraction) -> Fraction {
        Fraction(self.0 * rhs.0)
    }
}

/// Ratio of two durations. Panics on a zero divisor.
impl Div for Fraction {
    type Output = Fraction;
    fn div(self, rhs: Fraction) -> Fraction {
        Fraction(self.0 / rhs.0)
    }
}

impl From<(i64, i64)> for Fraction {
    fn from((n, d): (i64, i64)) -> Self {
        Fraction::new(n, d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduces_on_construction() {
        let f = Fraction::new(6, 8);
        assert_eq!(f.numerator(), 3);
        assert_eq!(f.denominator(), 4);
        assert_eq!(f, Fraction::new(3, 4));
    }

    #[test]
    fn sign_normalized_into_numerator() {
        let f = Fraction::new(1, -4);
        assert_eq!(f.numerator(), -1);
        assert_eq!(f.denominator(), 4);
        assert!(f.is_negative());
    }

    #[test]
    fn triplets_sum_exactly() {
        let triplet_eighth = Fraction::new(1, 12);
        let mut t = Fraction::ZERO;
        for _ in 0..12 {
            t += triplet_eighth;
        }
        assert_eq!(t, Fraction::from_integer(1));
    }

    #[test]
    fn tick_conversion() {
        let dotted_quarter = Fraction::from_ticks(720, 480);
        assert_eq!(dotted_quarter, Fraction::new(3, 8));
        assert_eq!(dotted_quarter.ticks(480), 720);
        assert_eq!(Fraction::new(1, 3).ticks(480), 640);
    }

    #[test]
    fn ordering_across_denominators() {
        assert!(Fraction::new(2, 3) > Fraction::new(5, 8));
        assert!(Fraction::ZERO < Fraction::new(1, 1024));
    }

    #[test]
    fn try_new_rejects_zero_denominator() {
        assert!(Fraction::try_new(1, 0).is_none());
        assert_eq!(Fraction::try_new(2, 4), Some(Fraction::new(1, 2)));
    }

    #[test]
    fn json_pairs_are_normalized() {
        let unreduced: Fraction = serde_json::from_str("[2, 8]").unwrap();
        assert_eq!(unreduced.to_string(), "1/4");

        let negative: Fraction = serde_json::from_str("[1, -4]").unwrap();
        assert_eq!(negative, Fraction::new(-1, 4));
        assert!(negative.is_negative());
        assert!(!negative.is_positive());

        assert!(serde_json::from_str::<Fraction>("[1, 0]").is_err());
        assert_eq!(serde_json::to_string(&Fraction::new(3, 4)).unwrap(), "[3,4]");
    }

    #[test]
    fn display_form() {
        assert_eq!(Fraction::new(3, 4).to_string(), "3/4");
        assert_eq!(Fraction::ZERO.to_string(), "0/1");
    }
}
