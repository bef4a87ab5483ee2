// pitroll -- the interactive editing core of a pitch/beat piano roll
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Rational numbers are used for beats and pitches, so that snapping to a grid is exact.

use std::error::Error;
use std::fmt;
use std::{cmp::Ordering, ops};

/// Underlying integral type for the rational numbers.
type Int = i64;

/// Largest multiple count produced when quantizing floats, keeps products far away from overflow.
const MAX_QUANTIZED_STEPS: f64 = (1u64 << 40) as f64;

/// Distance in steps below which a float counts as lying on a tie.
const TIE_TOLERANCE: f64 = 1e-9;

/// A rational number, always fully normalized.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Rational {
    /// The numerator of the fraction.
    /// If the fraction is negative, the numerator will be made negative.
    num: Int,
    /// The denominator of the fraction.
    /// If the fraction is negative, the denominator will stay positive.
    denom: Int,
}

impl Rational {
    pub const ZERO: Rational = Rational { num: 0, denom: 1 };

    // ==================== Constructors ====================

    /// Create a new rational from a potentially unnormalized fraction.
    ///
    /// # Panic
    ///
    /// Panics if the denominator is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// # use pitroll::rational::*;
    ///
    /// assert_eq!(Rational::new(10, 5), Rational::new(2, 1));
    /// assert_eq!(Rational::new(-10, -5), Rational::new(6, 3));
    /// assert_eq!(Rational::new(-6, 8), Rational::new(3, -4));
    /// ```
    pub fn new(num: Int, denom: Int) -> Rational {
        assert_ne!(denom, 0, "Denominator must not be zero");

        let sign = num.signum() * denom.signum();
        let div = gcd(num, denom);
        Rational {
            num: sign * num.abs() / div,
            denom: denom.abs() / div,
        }
    }

    pub const fn int(int: Int) -> Rational {
        Rational { num: int, denom: 1 }
    }

    pub const fn zero() -> Rational {
        Rational::int(0)
    }

    pub const fn one() -> Rational {
        Rational::int(1)
    }

    pub fn nth(n: Int) -> Self {
        Rational::new(1, n)
    }

    /// The multiple of `interval` nearest to `value`, ties going towards positive infinity.
    /// Non-finite values quantize to zero.
    ///
    /// # Panic
    ///
    /// Panics if `interval` is zero.
    ///
    /// ```
    /// # use pitroll::rational::*;
    ///
    /// let quarter = Rational::new(1, 4);
    /// assert_eq!(Rational::quantize(0.3, quarter), Rational::new(1, 4));
    /// assert_eq!(Rational::quantize(0.125, quarter), Rational::new(1, 4));
    /// assert_eq!(Rational::quantize(-0.125, quarter), Rational::zero());
    /// assert_eq!(Rational::quantize(-0.13, quarter), Rational::new(-1, 4));
    /// assert_eq!(Rational::quantize(f64::NAN, quarter), Rational::zero());
    ///
    /// // Ties of intervals without an exact float form still go up.
    /// let third = Rational::new(1, 3);
    /// assert_eq!(Rational::quantize(-1999.0 / 6.0, third), Rational::int(-333));
    /// assert_eq!(Rational::quantize(1.0 / 60.0, Rational::new(1, 30)), Rational::new(1, 30));
    /// ```
    pub fn quantize(value: f64, interval: Rational) -> Rational {
        assert!(!interval.is_zero(), "Quantization interval must not be zero");
        if !value.is_finite() {
            return Rational::ZERO;
        }
        let shifted = value / interval.to_f64() + 0.5;
        let nearest = shifted.round();
        // Float error can put an exact tie a hair below the half.
        let tolerance = TIE_TOLERANCE.max(shifted.abs() * f64::EPSILON * 1024.0);
        let steps = if (shifted - nearest).abs() <= tolerance {
            nearest
        } else {
            shifted.floor()
        };
        let steps = steps
            .max(-MAX_QUANTIZED_STEPS)
            .min(MAX_QUANTIZED_STEPS);
        interval * (steps as Int)
    }

    // ==================== Transformations ====================

    pub const fn recip(self) -> Rational {
        Rational {
            num: self.denom,
            denom: self.num,
        }
    }

    pub const fn abs(self) -> Rational {
        Rational {
            num: self.num.abs(),
            denom: self.denom,
        }
    }

    /// Round towards negative infinity.
    ///
    /// ```
    /// # use pitroll::rational::*;
    ///
    /// assert_eq!(Rational::new(13, 7).floor(), 1);
    /// assert_eq!(Rational::new(-1, 7).floor(), -1);
    /// assert_eq!(Rational::int(-3).floor(), -3);
    /// ```
    pub const fn floor(self) -> i64 {
        self.num.div_euclid(self.denom)
    }

    /// Round to closed integer, half up.
    ///
    /// ```
    /// # use pitroll::rational::*;
    ///
    /// assert_eq!(Rational::new(10, 5).round(), 2);
    /// assert_eq!(Rational::new(-10, 5).round(), -2);
    ///
    /// assert_eq!(Rational::new(10, 4).round(), 3);
    /// assert_eq!(Rational::new(-10, 4).round(), -3);
    ///
    /// assert_eq!(Rational::new(3, 7).round(), 0);
    /// assert_eq!(Rational::new(4, 7).round(), 1);
    /// assert_eq!(Rational::new(-3, 7).round(), 0);
    /// assert_eq!(Rational::new(-4, 7).round(), -1);
    /// ```
    pub fn round(self) -> i64 {
        (self.num + self.num.signum() * self.denom / 2) / self.denom
    }

    /// Snap to the nearest multiple of `interval`, ties going towards positive infinity.
    /// Values that already are multiples are returned unchanged.
    ///
    /// ```
    /// # use pitroll::rational::*;
    ///
    /// let quarter = Rational::new(1, 4);
    /// assert_eq!(Rational::new(1, 8).round_to(quarter), Rational::new(1, 4));
    /// assert_eq!(Rational::new(-1, 8).round_to(quarter), Rational::zero());
    /// assert_eq!(Rational::new(3, 4).round_to(quarter), Rational::new(3, 4));
    /// assert_eq!(Rational::new(7, 10).round_to(quarter), Rational::new(3, 4));
    /// ```
    pub fn round_to(self, interval: Rational) -> Rational {
        let steps = (self / interval + Rational::new(1, 2)).floor();
        interval * steps
    }

    // ==================== Predicates ====================

    pub const fn is_zero(self) -> bool {
        self.num == 0
    }

    pub const fn is_negative(self) -> bool {
        self.num < 0
    }

    // ==================== Destructors ====================

    pub fn to_f64(self) -> f64 {
        self.num as f64 / self.denom as f64
    }
}

impl Default for Rational {
    fn default() -> Self {
        Rational::ZERO
    }
}

/// # Examples
///
/// ```
/// use pitroll::rational::*;
///
/// assert_eq!(Rational::new(1, 2) + Rational::new(3, 4), Rational::new(5, 4));
/// assert_eq!(Rational::new(3, 4) + Rational::new(3, 4), Rational::new(3, 2));
/// assert_eq!(Rational::new(3, 4) + Rational::new(-5, 8), Rational::new(1, 8));
/// ```
impl ops::Add for Rational {
    type Output = Rational;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn add(self, rhs: Rational) -> Self::Output {
        Rational::new(
            self.num * rhs.denom + self.denom * rhs.num,
            self.denom * rhs.denom,
        )
    }
}

impl ops::Sub for Rational {
    type Output = Rational;

    fn sub(self, rhs: Rational) -> Self::Output {
        self + (-rhs)
    }
}

impl ops::Mul for Rational {
    type Output = Rational;

    fn mul(self, rhs: Rational) -> Self::Output {
        Rational::new(self.num * rhs.num, self.denom * rhs.denom)
    }
}

impl ops::Div for Rational {
    type Output = Rational;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn div(self, rhs: Rational) -> Self::Output {
        Rational::new(self.num * rhs.denom, self.denom * rhs.num)
    }
}

impl ops::Mul<Int> for Rational {
    type Output = Rational;

    fn mul(self, rhs: Int) -> Self::Output {
        Rational::new(self.num * rhs, self.denom)
    }
}

impl ops::Mul<Rational> for Int {
    type Output = Rational;

    fn mul(self, rhs: Rational) -> Self::Output {
        Rational::new(self * rhs.num, rhs.denom)
    }
}

/// ```
/// # use pitroll::rational::*;
/// assert_eq!(Rational::new(1, 4) / 2, Rational::new(1, 8));
/// assert_eq!(Rational::new(9, 13) / 3, Rational::new(3, 13));
/// ```
impl ops::Div<Int> for Rational {
    type Output = Rational;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn div(self, rhs: Int) -> Self::Output {
        Rational::new(self.num, self.denom * rhs)
    }
}

impl ops::Neg for Rational {
    type Output = Rational;

    fn neg(self) -> Self::Output {
        Rational {
            num: -self.num,
            denom: self.denom,
        }
    }
}

impl ops::AddAssign for Rational {
    fn add_assign(&mut self, rhs: Rational) {
        *self = *self + rhs;
    }
}

impl ops::SubAssign for Rational {
    fn sub_assign(&mut self, rhs: Rational) {
        *self = *self - rhs;
    }
}

impl ops::MulAssign for Rational {
    fn mul_assign(&mut self, rhs: Rational) {
        *self = *self * rhs;
    }
}

impl ops::DivAssign for Rational {
    fn div_assign(&mut self, rhs: Rational) {
        *self = *self / rhs;
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Rational) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// ```
/// use pitroll::rational::*;
///
/// assert!(Rational::new(3,4) < Rational::new(3,2));
/// ```
impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        // a / b < c / d
        // <=>
        // a < c * b / d
        // <=>
        // a * d < c * b
        let l = self.num * other.denom;
        let r = other.num * self.denom;
        l.cmp(&r)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.num)?;
        if self.denom != 1 {
            write!(f, "/{}", self.denom)?;
        }
        Ok(())
    }
}

/// An error which can be returned when parsing a rational.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRationalError(RationalErrorKind);

impl ParseRationalError {
    pub fn kind(&self) -> RationalErrorKind {
        self.0
    }
}

impl Error for ParseRationalError {}

impl fmt::Display for ParseRationalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            RationalErrorKind::InvalidInt => write!(f, "invalid integer literal"),
            RationalErrorKind::Zero => write!(f, "denominator is zero"),
            RationalErrorKind::Malformed => write!(f, "malformed fraction"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RationalErrorKind {
    /// The numerator or denominator could not be parsed as integer.
    InvalidInt,
    /// The denominator was zero
    Zero,
    /// The rational was not of the form `<int>` or `<int>/<int>
    Malformed,
}

impl std::str::FromStr for Rational {
    type Err = ParseRationalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('/');
        let numerator = parts
            .next()
            .ok_or(ParseRationalError(RationalErrorKind::Malformed))?
            .parse()
            .map_err(|_| ParseRationalError(RationalErrorKind::InvalidInt))?;

        if let Some(denominator_str) = parts.next() {
            let denominator = denominator_str
                .parse()
                .map_err(|_| ParseRationalError(RationalErrorKind::InvalidInt))?;
            if denominator == 0 {
                Err(ParseRationalError(RationalErrorKind::Zero))
            } else if parts.next().is_some() {
                Err(ParseRationalError(RationalErrorKind::Malformed))
            } else {
                Ok(Rational::new(numerator, denominator))
            }
        } else {
            Ok(Rational::new(numerator, 1))
        }
    }
}

/// Computes the greates common divisor of two numbers using euclids algorithm.
///
/// # Example
///
/// ```
/// use pitroll::rational::*;
///
/// assert_eq!(gcd(20, 15), 5);
/// assert_eq!(gcd(20, 19), 1);
/// assert_eq!(gcd(10, 0), 10);
/// assert_eq!(gcd(0, 10), 10);
/// assert_eq!(gcd(0, 0), 0);
/// assert_eq!(gcd(10, -10), 10);
/// ```
pub fn gcd(mut a: Int, mut b: Int) -> Int {
    // normalized inputs to be positive to guarantee that it terminates
    if a < 0 {
        a = -a
    }
    if b < 0 {
        b = -b
    }

    // Invariant: a >= b
    if a < b {
        std::mem::swap(&mut a, &mut b)
    }

    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}
