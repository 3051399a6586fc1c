//! Exact rational arithmetic used by the solver.

use std::fmt;
use std::ops::{Add, Mul, Sub};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FractionError {
    #[error("division by zero")]
    DivisionByZero,
}

/// A rational number kept in lowest terms with a positive denominator.
///
/// Because the representation is canonical, derived equality is value
/// equality: `2/4 == 1/2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fraction {
    numerator: i64,
    denominator: i64,
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

impl Fraction {
    pub fn new(numerator: i64, denominator: i64) -> Result<Self, FractionError> {
        if denominator == 0 {
            return Err(FractionError::DivisionByZero);
        }
        Ok(Self::reduced(numerator, denominator))
    }

    // caller guarantees denominator != 0
    fn reduced(numerator: i64, denominator: i64) -> Self {
        let divisor = gcd(numerator.abs(), denominator.abs()).max(1);
        let sign = if denominator < 0 { -1 } else { 1 };
        Self {
            numerator: sign * numerator / divisor,
            denominator: sign * denominator / divisor,
        }
    }

    #[cfg(test)]
    pub fn numerator(&self) -> i64 {
        self.numerator
    }

    #[cfg(test)]
    pub fn denominator(&self) -> i64 {
        self.denominator
    }

    pub fn is_zero(&self) -> bool {
        self.numerator == 0
    }

    /// Divides, failing when `other` is zero.
    pub fn checked_div(self, other: Fraction) -> Result<Fraction, FractionError> {
        if other.is_zero() {
            return Err(FractionError::DivisionByZero);
        }
        Ok(Self::reduced(
            self.numerator * other.denominator,
            self.denominator * other.numerator,
        ))
    }

    pub fn equals_integer(&self, n: i64) -> bool {
        self.denominator == 1 && self.numerator == n
    }
}

impl From<i64> for Fraction {
    fn from(n: i64) -> Self {
        Self { numerator: n, denominator: 1 }
    }
}

impl Add for Fraction {
    type Output = Fraction;
    fn add(self, other: Fraction) -> Fraction {
        Self::reduced(
            self.numerator * other.denominator + other.numerator * self.denominator,
            self.denominator * other.denominator,
        )
    }
}

impl Sub for Fraction {
    type Output = Fraction;
    fn sub(self, other: Fraction) -> Fraction {
        Self::reduced(
            self.numerator * other.denominator - other.numerator * self.denominator,
            self.denominator * other.denominator,
        )
    }
}

impl Mul for Fraction {
    type Output = Fraction;
    fn mul(self, other: Fraction) -> Fraction {
        Self::reduced(
            self.numerator * other.numerator,
            self.denominator * other.denominator,
        )
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frac(n: i64, d: i64) -> Fraction {
        Fraction::new(n, d).unwrap()
    }

    #[test]
    fn zero_denominator_is_rejected() {
        assert_eq!(Fraction::new(3, 0), Err(FractionError::DivisionByZero));
    }

    #[test]
    fn construction_reduces_and_normalizes_sign() {
        let f = frac(6, -8);
        assert_eq!((f.numerator(), f.denominator()), (-3, 4));
        let g = frac(-10, -4);
        assert_eq!((g.numerator(), g.denominator()), (5, 2));
        let z = frac(0, -7);
        assert_eq!((z.numerator(), z.denominator()), (0, 1));
    }

    #[test]
    fn scaling_numerator_and_denominator_gives_equal_fraction() {
        for n in -12..=12 {
            for d in (-9..=9).filter(|d| *d != 0) {
                for k in [-5, -1, 2, 3, 7] {
                    assert_eq!(frac(n, d), frac(k * n, k * d), "{n}/{d} scaled by {k}");
                }
            }
        }
    }

    #[test]
    fn arithmetic_stays_in_lowest_terms() {
        let half = frac(1, 2);
        let third = frac(1, 3);
        assert_eq!(half + third, frac(5, 6));
        assert_eq!(half - third, frac(1, 6));
        assert_eq!(half * frac(2, 3), third);
        assert_eq!(half.checked_div(frac(1, 4)).unwrap(), Fraction::from(2));
        let r = frac(3, 4) - frac(3, 4);
        assert_eq!((r.numerator(), r.denominator()), (0, 1));
    }

    #[test]
    fn dividing_by_zero_fails() {
        let zero = frac(2, 3) - frac(2, 3);
        assert_eq!(
            Fraction::from(8).checked_div(zero),
            Err(FractionError::DivisionByZero)
        );
    }

    #[test]
    fn equals_integer_requires_unit_denominator() {
        // 8 / (3 - 8/3) = 24
        let inner = Fraction::from(3) - frac(8, 3);
        let value = Fraction::from(8).checked_div(inner).unwrap();
        assert!(value.equals_integer(24));
        assert!(!frac(49, 2).equals_integer(24));
        assert_eq!(frac(49, 2).to_string(), "49/2");
    }
}
