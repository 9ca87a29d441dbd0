//! Numbers that stay exact while they can.
//!
//! Rational arithmetic is done on big integers. Anything irrational (roots
//! that are not perfect powers, transcendental functions, constants such as
//! pi) drops to `f64` and the result is marked approximate from then on.

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use thiserror::Error;

/// Largest integer exponent computed exactly
const MAX_EXACT_EXPONENT: u32 = 100_000;
/// Bound on the size of an exact value, in bits
const MAX_EXACT_BITS: u64 = 1 << 17;
/// Largest decimal scale a literal is read with exactly
const MAX_EXACT_SCALE: u32 = 10_000;
/// Largest factorial computed exactly
pub const MAX_FACTORIAL: u32 = 10_000;
/// Largest root degree tried exactly for rational exponents
const MAX_EXACT_ROOT: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("Division by zero.")]
    DivisionByZero,
    #[error("Factorial is only defined for non-negative integers.")]
    InvalidFactorial,
    #[error("Factorial argument is too large.")]
    FactorialTooLarge,
    #[error("Result is not a finite number.")]
    NotFinite,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Exact(BigRational),
    Approx(f64),
}

impl Number {
    pub fn zero() -> Self {
        Number::Exact(BigRational::zero())
    }

    pub fn one() -> Self {
        Number::Exact(BigRational::one())
    }

    pub fn from_integer(value: i64) -> Self {
        Number::Exact(BigRational::from_integer(BigInt::from(value)))
    }

    pub fn from_ratio(numer: i64, denom: i64) -> Self {
        Number::Exact(BigRational::new(BigInt::from(numer), BigInt::from(denom)))
    }

    /// Parse a plain decimal literal (`12`, `0.25`, `1.5e3`, `.5`)
    ///
    /// Read exactly unless the literal is too long or its exponent too
    /// large, in which case it becomes an `f64` (possibly infinite).
    pub fn parse_decimal(text: &str) -> Option<Self> {
        let (mantissa, exponent) = match text.find(|c| c == 'e' || c == 'E') {
            Some(pos) => (&text[..pos], Some(&text[pos + 1..])),
            None => (text, None),
        };
        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((i, f)) => (i, f),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
            return None;
        }
        let exponent = match exponent {
            Some(exponent) => exponent.parse::<i64>().ok(),
            None => Some(0),
        };

        let scale = exponent.and_then(|e| e.checked_sub(i64::try_from(frac_part.len()).ok()?));
        let digit_count = int_part.len() + frac_part.len();
        let scale = match scale.and_then(|s| i32::try_from(s).ok()) {
            Some(scale)
                if scale.unsigned_abs() <= MAX_EXACT_SCALE
                    && digit_count <= MAX_EXACT_SCALE as usize =>
            {
                scale
            }
            _ => return text.parse::<f64>().ok().map(Number::Approx),
        };

        let digits: BigInt = format!("{}{}", int_part, frac_part).parse().ok()?;
        Some(Number::Exact(BigRational::from_integer(digits) * pow10(scale)))
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Number::Exact(_))
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Exact(r) => r.is_zero(),
            Number::Approx(f) => *f == 0.0,
        }
    }

    pub fn is_negative(&self) -> bool {
        match self {
            Number::Exact(r) => r.is_negative(),
            Number::Approx(f) => *f < 0.0,
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Number::Exact(_) => true,
            Number::Approx(f) => f.is_finite(),
        }
    }

    /// The exact integer value, if this is one
    pub fn as_integer(&self) -> Option<BigInt> {
        match self {
            Number::Exact(r) if r.is_integer() => Some(r.to_integer()),
            _ => None,
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Number::Exact(r) => ratio_to_f64(r),
            Number::Approx(f) => *f,
        }
    }

    pub fn neg(self) -> Self {
        match self {
            Number::Exact(r) => Number::Exact(-r),
            Number::Approx(f) => Number::Approx(-f),
        }
    }

    pub fn add(self, rhs: Number) -> Self {
        match (self, rhs) {
            (Number::Exact(a), Number::Exact(b)) => Number::Exact(a + b),
            (a, b) => Number::Approx(a.to_f64() + b.to_f64()),
        }
    }

    pub fn sub(self, rhs: Number) -> Self {
        self.add(rhs.neg())
    }

    pub fn mul(self, rhs: Number) -> Self {
        match (self, rhs) {
            (Number::Exact(a), Number::Exact(b)) => bounded(a * b),
            (a, b) => Number::Approx(a.to_f64() * b.to_f64()),
        }
    }

    pub fn div(self, rhs: Number) -> Result<Self, ArithmeticError> {
        if rhs.is_zero() {
            return Err(ArithmeticError::DivisionByZero);
        }
        Ok(match (self, rhs) {
            (Number::Exact(a), Number::Exact(b)) => bounded(a / b),
            (a, b) => Number::Approx(a.to_f64() / b.to_f64()),
        })
    }

    /// Remainder truncated toward zero, like `%` on floats
    pub fn rem(self, rhs: Number) -> Result<Self, ArithmeticError> {
        if rhs.is_zero() {
            return Err(ArithmeticError::DivisionByZero);
        }
        Ok(match (self, rhs) {
            (Number::Exact(a), Number::Exact(b)) => {
                let quotient = (&a / &b).trunc();
                Number::Exact(a - b * quotient)
            }
            (a, b) => Number::Approx(a.to_f64() % b.to_f64()),
        })
    }

    pub fn pow(self, exponent: Number) -> Result<Self, ArithmeticError> {
        if let (Number::Exact(base), Number::Exact(exp)) = (&self, &exponent) {
            if let Some(result) = exact_pow(base, exp)? {
                return Ok(Number::Exact(result));
            }
        }
        Ok(Number::Approx(self.to_f64().powf(exponent.to_f64())))
    }

    /// Exact square root of perfect squares, approximate otherwise
    pub fn sqrt(self) -> Self {
        self.root(2)
    }

    pub fn cbrt(self) -> Self {
        self.root(3)
    }

    fn root(self, degree: u32) -> Self {
        if let Number::Exact(r) = &self {
            if let Some(root) = exact_root(r, degree) {
                return Number::Exact(root);
            }
        }
        let value = self.to_f64();
        Number::Approx(match degree {
            2 => value.sqrt(),
            3 => value.cbrt(),
            n => value.powf(1.0 / n as f64),
        })
    }

    pub fn abs(self) -> Self {
        match self {
            Number::Exact(r) => Number::Exact(r.abs()),
            Number::Approx(f) => Number::Approx(f.abs()),
        }
    }

    pub fn floor(self) -> Self {
        match self {
            Number::Exact(r) => Number::Exact(r.floor()),
            Number::Approx(f) => Number::Approx(f.floor()),
        }
    }

    pub fn ceil(self) -> Self {
        match self {
            Number::Exact(r) => Number::Exact(r.ceil()),
            Number::Approx(f) => Number::Approx(f.ceil()),
        }
    }

    /// Round half away from zero
    pub fn round(self) -> Self {
        match self {
            Number::Exact(r) => Number::Exact(r.round()),
            Number::Approx(f) => Number::Approx(f.round()),
        }
    }

    pub fn signum(self) -> Self {
        match self {
            Number::Exact(r) => Number::Exact(r.signum()),
            Number::Approx(f) if f == 0.0 => Number::Approx(0.0),
            Number::Approx(f) => Number::Approx(f.signum()),
        }
    }

    /// Factorial of a non-negative integer.
    ///
    /// `keep_going` is consulted between multiplications so long products
    /// can be abandoned; returns `Ok(None)` when it says stop.
    pub fn factorial(
        self,
        mut keep_going: impl FnMut() -> bool,
    ) -> Result<Option<Self>, ArithmeticError> {
        let n = match &self {
            Number::Exact(r) if r.is_integer() && !r.is_negative() => r.to_integer(),
            Number::Approx(f) if f.fract() == 0.0 && *f >= 0.0 => BigInt::from(*f as u64),
            _ => return Err(ArithmeticError::InvalidFactorial),
        };
        let n = n
            .to_u32()
            .filter(|n| *n <= MAX_FACTORIAL)
            .ok_or(ArithmeticError::FactorialTooLarge)?;

        let mut product = BigInt::one();
        for i in 2..=n {
            if !keep_going() {
                return Ok(None);
            }
            product *= i;
        }
        let product = BigRational::from_integer(product);
        Ok(Some(if self.is_exact() {
            Number::Exact(product)
        } else {
            Number::Approx(ratio_to_f64(&product))
        }))
    }

    pub fn cmp_value(&self, other: &Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Exact(a), Number::Exact(b)) => Some(a.cmp(b)),
            (a, b) => a.to_f64().partial_cmp(&b.to_f64()),
        }
    }
}

/// Exact while the value stays within `MAX_EXACT_BITS`, else an `f64`
fn bounded(r: BigRational) -> Number {
    if r.numer().bits() + r.denom().bits() > MAX_EXACT_BITS {
        Number::Approx(ratio_to_f64(&r))
    } else {
        Number::Exact(r)
    }
}

/// 10^exp as a rational
pub fn pow10(exp: i32) -> BigRational {
    let magnitude = BigInt::from(10u32).pow(exp.unsigned_abs());
    if exp >= 0 {
        BigRational::from_integer(magnitude)
    } else {
        BigRational::new(BigInt::one(), magnitude)
    }
}

fn ratio_to_f64(r: &BigRational) -> f64 {
    let (numer, numer_exp) = top_bits(r.numer());
    let (denom, denom_exp) = top_bits(r.denom());
    let scale = (numer_exp - denom_exp).clamp(-4096, 4096) as i32;
    let magnitude = numer / denom * 2f64.powi(scale);
    if r.is_negative() {
        -magnitude
    } else {
        magnitude
    }
}

/// The leading 64 bits of `|value|` and the binary exponent they were shifted by
fn top_bits(value: &BigInt) -> (f64, i64) {
    let magnitude = value.magnitude();
    let shift = magnitude.bits().saturating_sub(64);
    let top = (magnitude >> shift).to_u64().unwrap_or(u64::MAX);
    (top as f64, shift as i64)
}

fn exact_pow(base: &BigRational, exp: &BigRational) -> Result<Option<BigRational>, ArithmeticError> {
    let denom = exp.denom().to_u32().filter(|d| *d <= MAX_EXACT_ROOT);
    let Some(denom) = denom else {
        return Ok(None);
    };
    let Some(power) = exp.numer().abs().to_u32().filter(|p| *p <= MAX_EXACT_EXPONENT) else {
        return Ok(None);
    };

    let base = if denom > 1 {
        match exact_root(base, denom) {
            Some(root) => root,
            None => return Ok(None),
        }
    } else {
        base.clone()
    };

    if base.is_zero() && exp.is_negative() {
        return Err(ArithmeticError::DivisionByZero);
    }

    let bits = base.numer().bits().max(base.denom().bits()) * u64::from(power);
    if bits > MAX_EXACT_BITS {
        return Ok(None);
    }

    let numer = base.numer().pow(power);
    let denom = base.denom().pow(power);
    let result = BigRational::new(numer, denom);
    Ok(Some(if exp.is_negative() { result.recip() } else { result }))
}

/// The exact `degree`-th root of a rational, when both parts are perfect powers
fn exact_root(value: &BigRational, degree: u32) -> Option<BigRational> {
    if value.is_negative() && degree % 2 == 0 {
        return None;
    }
    let numer = perfect_root(value.numer(), degree)?;
    let denom = perfect_root(value.denom(), degree)?;
    Some(BigRational::new(numer, denom))
}

fn perfect_root(value: &BigInt, degree: u32) -> Option<BigInt> {
    let root = value.nth_root(degree);
    (root.pow(degree) == *value).then_some(root)
}
