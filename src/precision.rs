//! Fixed-point arbitrary-precision arithmetic on a decimal grid.
//!
//! # Representation
//!
//! A [`Real`] is an integer mantissa on a fixed decimal grid:
//!
//!   value = mant / 10^(digits + 10)
//!
//! where `digits` is the working precision requested through
//! [`PrecisionCtx::new`] and ten guard digits absorb rounding drift inside
//! multi-step formulas. Addition and subtraction are exact integer
//! operations; multiplication and division round to nearest, ties away
//! from zero.
//!
//! # Determinism
//!
//! Because addition is exact, summation order does not affect the result:
//! a spectral sum reduced in parallel agrees bit for bit with its serial
//! evaluation. That property is what makes the `parallel` feature safe
//! for invariants that are later compared against closed forms at the
//! full 10^-digits resolution.
//!
//! # Context discipline
//!
//! Both operands of every arithmetic operation must carry the same
//! [`PrecisionCtx`]. Mixing contexts is a programming error and panics;
//! move a value between precisions explicitly with [`Real::with_ctx`].

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Pow, Signed, ToPrimitive, Zero};

use crate::error::{Result, SpectralError};

/// Guard digits kept below the requested precision.
const GUARD_DIGITS: u32 = 10;

/// 10^exp as a big integer.
pub(crate) fn pow10(exp: u32) -> BigInt {
    BigInt::from(10u32).pow(exp)
}

/// Signed division rounded to nearest, ties away from zero.
pub(crate) fn div_round(num: BigInt, den: &BigInt) -> BigInt {
    debug_assert!(!den.is_zero(), "div_round by zero");
    let negative = num.is_negative() != den.is_negative();
    let num_abs = num.abs();
    let den_abs = den.abs();
    let q = &num_abs / &den_abs;
    let r = num_abs - &q * &den_abs;
    let q = if &r * 2u32 >= den_abs { q + 1u32 } else { q };
    if negative {
        -q
    } else {
        q
    }
}

/// Decimal digit count of |x| (1 for zero).
pub(crate) fn dec_digits(x: &BigInt) -> u32 {
    x.magnitude().to_string().len() as u32
}

/// Working precision shared by all operands of a computation.
///
/// The context is plain data (a digit count), copied freely and compared
/// for equality before every arithmetic operation on [`Real`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrecisionCtx {
    digits: u32,
}

impl PrecisionCtx {
    /// Smallest accepted precision.
    pub const MIN_DIGITS: u32 = 5;
    /// Largest accepted precision.
    pub const MAX_DIGITS: u32 = 100_000;

    /// A context carrying `digits` significant decimal digits.
    ///
    /// Returns a [`SpectralError::DomainError`] outside
    /// `[MIN_DIGITS, MAX_DIGITS]`.
    pub fn new(digits: u32) -> Result<Self> {
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits) {
            return Err(SpectralError::DomainError(format!(
                "precision must lie in [{}, {}] decimal digits, got {}",
                Self::MIN_DIGITS,
                Self::MAX_DIGITS,
                digits
            )));
        }
        Ok(Self { digits })
    }

    /// Requested precision in decimal digits.
    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Grid scale of the mantissa: requested digits plus the guard digits.
    pub(crate) fn scale(&self) -> u32 {
        self.digits + GUARD_DIGITS
    }

    /// Widened context for intermediate work that must survive cancellation.
    pub(crate) fn widened(&self, extra: u32) -> Self {
        Self {
            digits: self.digits + extra,
        }
    }

    /// One unit in the last requested digit: 10^-digits.
    pub fn eps(&self) -> Real {
        Real {
            mant: pow10(GUARD_DIGITS),
            ctx: *self,
        }
    }
}

/// A real number on the fixed decimal grid of one [`PrecisionCtx`].
///
/// # Panics
///
/// Arithmetic between two `Real`s from different contexts panics, as does
/// division by an exact zero. Equality is structural (same mantissa, same
/// context) and never panics.
#[derive(Clone, PartialEq, Eq)]
pub struct Real {
    mant: BigInt,
    ctx: PrecisionCtx,
}

impl Real {
    pub fn zero(ctx: PrecisionCtx) -> Self {
        Self {
            mant: BigInt::zero(),
            ctx,
        }
    }

    pub fn one(ctx: PrecisionCtx) -> Self {
        Self {
            mant: pow10(ctx.scale()),
            ctx,
        }
    }

    pub fn from_i64(x: i64, ctx: PrecisionCtx) -> Self {
        Self {
            mant: BigInt::from(x) * pow10(ctx.scale()),
            ctx,
        }
    }

    pub fn from_u64(x: u64, ctx: PrecisionCtx) -> Self {
        Self {
            mant: BigInt::from(x) * pow10(ctx.scale()),
            ctx,
        }
    }

    /// Exact rational, rounded once onto the grid.
    pub fn from_ratio(r: &BigRational, ctx: PrecisionCtx) -> Self {
        Self {
            mant: div_round(r.numer() * pow10(ctx.scale()), r.denom()),
            ctx,
        }
    }

    /// Small rational `num/den`, rounded once onto the grid.
    ///
    /// # Panics
    ///
    /// Panics if `den == 0`.
    pub fn from_ratio_i64(num: i64, den: i64, ctx: PrecisionCtx) -> Self {
        assert!(den != 0, "from_ratio_i64 with zero denominator");
        Self {
            mant: div_round(
                BigInt::from(num) * pow10(ctx.scale()),
                &BigInt::from(den),
            ),
            ctx,
        }
    }

    /// The exact value of a finite float (its binary expansion, not its
    /// shortest decimal rendering).
    pub fn from_f64(x: f64, ctx: PrecisionCtx) -> Result<Self> {
        let r = BigRational::from_float(x).ok_or_else(|| {
            SpectralError::DomainError(format!("{} has no finite value", x))
        })?;
        Ok(Self::from_ratio(&r, ctx))
    }

    /// Parse a plain decimal literal (`-12.0625`, `.5`, `+3`).
    ///
    /// No exponent syntax; digits beyond the grid are rounded to nearest.
    pub fn parse(text: &str, ctx: PrecisionCtx) -> Result<Self> {
        let malformed = || {
            SpectralError::DomainError(format!(
                "cannot parse {:?} as a decimal literal",
                text
            ))
        };
        let (neg, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(malformed());
        }
        let all_digits =
            |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(malformed());
        }
        let concat = format!("{}{}", int_part, frac_part);
        let value = BigInt::parse_bytes(concat.as_bytes(), 10).ok_or_else(malformed)?;
        let scale = ctx.scale();
        let frac_len = frac_part.len() as u32;
        let mant = if frac_len <= scale {
            value * pow10(scale - frac_len)
        } else {
            div_round(value, &pow10(frac_len - scale))
        };
        Ok(Self {
            mant: if neg { -mant } else { mant },
            ctx,
        })
    }

    pub fn ctx(&self) -> PrecisionCtx {
        self.ctx
    }

    pub fn is_zero(&self) -> bool {
        self.mant.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.mant.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.mant.is_positive()
    }

    pub fn abs(&self) -> Real {
        Self {
            mant: self.mant.abs(),
            ctx: self.ctx,
        }
    }

    /// Exact product with a machine integer.
    pub fn mul_int(&self, k: i64) -> Real {
        Self {
            mant: &self.mant * k,
            ctx: self.ctx,
        }
    }

    /// Quotient by a machine integer, rounded to nearest.
    ///
    /// # Panics
    ///
    /// Panics if `k == 0`.
    pub fn div_int(&self, k: i64) -> Real {
        assert!(k != 0, "div_int by zero");
        Self {
            mant: div_round(self.mant.clone(), &BigInt::from(k)),
            ctx: self.ctx,
        }
    }

    /// Integer power by binary exponentiation, one rounding per multiply.
    ///
    /// # Panics
    ///
    /// Panics for a negative exponent of an exact zero.
    pub fn powi(&self, exp: i64) -> Real {
        if exp == 0 {
            return Real::one(self.ctx);
        }
        let mut base = if exp < 0 {
            Real::one(self.ctx) / self
        } else {
            self.clone()
        };
        let mut e = exp.unsigned_abs();
        let mut acc = Real::one(self.ctx);
        while e > 0 {
            if e & 1 == 1 {
                acc = &acc * &base;
            }
            e >>= 1;
            if e > 0 {
                base = &base * &base;
            }
        }
        acc
    }

    /// Re-round into another context (widening is exact).
    pub fn with_ctx(&self, ctx: PrecisionCtx) -> Real {
        if ctx == self.ctx {
            return self.clone();
        }
        let old = self.ctx.scale();
        let new = ctx.scale();
        let mant = if new >= old {
            &self.mant * pow10(new - old)
        } else {
            div_round(self.mant.clone(), &pow10(old - new))
        };
        Real { mant, ctx }
    }

    /// Nearest double. Values far outside the double range saturate to
    /// infinity or flush to zero.
    pub fn to_f64(&self) -> f64 {
        if self.mant.is_zero() {
            return 0.0;
        }
        let scale = self.ctx.scale() as i64;
        let ndigits = dec_digits(&self.mant) as i64;
        // Keep at most 18 significant digits so the conversion below is
        // exact at double resolution.
        let drop = (ndigits - 18).max(0);
        let reduced = if drop > 0 {
            div_round(self.mant.clone(), &pow10(drop as u32))
        } else {
            self.mant.clone()
        };
        let lead = reduced.to_f64().unwrap_or(0.0);
        lead * 10f64.powi((drop - scale) as i32)
    }

    /// Fixed-point decimal rendering with exactly `digits` fractional
    /// digits; the guard digits are rounded away.
    pub fn to_decimal_string(&self) -> String {
        let digits = self.ctx.digits as usize;
        let rounded = div_round(self.mant.clone(), &pow10(GUARD_DIGITS));
        let neg = rounded.is_negative();
        let abs = rounded.magnitude().to_string();
        let body = if abs.len() <= digits {
            format!("0.{:0>width$}", abs, width = digits)
        } else {
            let (int, frac) = abs.split_at(abs.len() - digits);
            format!("{}.{}", int, frac)
        };
        if neg {
            format!("-{}", body)
        } else {
            body
        }
    }

    /// `Some(n)` when the value lies exactly on an integer.
    pub(crate) fn to_integer(&self) -> Option<BigInt> {
        let scale = pow10(self.ctx.scale());
        let r = &self.mant % &scale;
        if r.is_zero() {
            Some(&self.mant / &scale)
        } else {
            None
        }
    }

    pub(crate) fn raw(&self) -> &BigInt {
        &self.mant
    }

    pub(crate) fn from_raw(mant: BigInt, ctx: PrecisionCtx) -> Real {
        Real { mant, ctx }
    }
}

fn assert_same_ctx(a: &Real, b: &Real) {
    assert_eq!(
        a.ctx, b.ctx,
        "mixed precision contexts ({} vs {} digits)",
        a.ctx.digits, b.ctx.digits
    );
}

impl Add for &Real {
    type Output = Real;
    fn add(self, rhs: &Real) -> Real {
        assert_same_ctx(self, rhs);
        Real {
            mant: &self.mant + &rhs.mant,
            ctx: self.ctx,
        }
    }
}

impl Sub for &Real {
    type Output = Real;
    fn sub(self, rhs: &Real) -> Real {
        assert_same_ctx(self, rhs);
        Real {
            mant: &self.mant - &rhs.mant,
            ctx: self.ctx,
        }
    }
}

impl Mul for &Real {
    type Output = Real;
    fn mul(self, rhs: &Real) -> Real {
        assert_same_ctx(self, rhs);
        Real {
            mant: div_round(&self.mant * &rhs.mant, &pow10(self.ctx.scale())),
            ctx: self.ctx,
        }
    }
}

impl Div for &Real {
    type Output = Real;
    fn div(self, rhs: &Real) -> Real {
        assert_same_ctx(self, rhs);
        assert!(!rhs.mant.is_zero(), "division by exact zero");
        Real {
            mant: div_round(&self.mant * pow10(self.ctx.scale()), &rhs.mant),
            ctx: self.ctx,
        }
    }
}

macro_rules! forward_binop {
    ($imp:ident, $method:ident) => {
        impl $imp<Real> for Real {
            type Output = Real;
            fn $method(self, rhs: Real) -> Real {
                (&self).$method(&rhs)
            }
        }
        impl $imp<&Real> for Real {
            type Output = Real;
            fn $method(self, rhs: &Real) -> Real {
                (&self).$method(rhs)
            }
        }
        impl $imp<Real> for &Real {
            type Output = Real;
            fn $method(self, rhs: Real) -> Real {
                self.$method(&rhs)
            }
        }
    };
}

forward_binop!(Add, add);
forward_binop!(Sub, sub);
forward_binop!(Mul, mul);
forward_binop!(Div, div);

impl AddAssign<&Real> for Real {
    fn add_assign(&mut self, rhs: &Real) {
        assert_same_ctx(self, rhs);
        self.mant += &rhs.mant;
    }
}

impl AddAssign<Real> for Real {
    fn add_assign(&mut self, rhs: Real) {
        *self += &rhs;
    }
}

impl SubAssign<&Real> for Real {
    fn sub_assign(&mut self, rhs: &Real) {
        assert_same_ctx(self, rhs);
        self.mant -= &rhs.mant;
    }
}

impl SubAssign<Real> for Real {
    fn sub_assign(&mut self, rhs: Real) {
        *self -= &rhs;
    }
}

impl Neg for &Real {
    type Output = Real;
    fn neg(self) -> Real {
        Real {
            mant: -&self.mant,
            ctx: self.ctx,
        }
    }
}

impl Neg for Real {
    type Output = Real;
    fn neg(self) -> Real {
        Real {
            mant: -self.mant,
            ctx: self.ctx,
        }
    }
}

impl PartialOrd for Real {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Real {
    fn cmp(&self, other: &Self) -> Ordering {
        assert_same_ctx(self, other);
        self.mant.cmp(&other.mant)
    }
}

impl fmt::Debug for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Real({} @ {}d)", self.to_decimal_string(), self.ctx.digits)
    }
}

impl fmt::Display for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(digits: u32) -> PrecisionCtx {
        PrecisionCtx::new(digits).unwrap()
    }

    // ── Context validation ─────────────────────────────────────────────

    #[test]
    fn context_rejects_out_of_range_digits() {
        assert!(PrecisionCtx::new(4).is_err());
        assert!(PrecisionCtx::new(5).is_ok());
        assert!(PrecisionCtx::new(100_000).is_ok());
        assert!(PrecisionCtx::new(100_001).is_err());
    }

    #[test]
    fn eps_is_one_unit_in_last_digit() {
        let c = ctx(8);
        assert_eq!(c.eps().to_decimal_string(), "0.00000001");
    }

    // ── Construction and rendering ─────────────────────────────────────

    #[test]
    fn integer_round_trip() {
        let c = ctx(6);
        assert_eq!(Real::from_i64(-42, c).to_decimal_string(), "-42.000000");
        assert_eq!(Real::from_u64(7, c).to_decimal_string(), "7.000000");
        assert_eq!(Real::zero(c).to_decimal_string(), "0.000000");
    }

    #[test]
    fn parse_round_trip() {
        let c = ctx(6);
        assert_eq!(Real::parse("3.25", c).unwrap().to_decimal_string(), "3.250000");
        assert_eq!(Real::parse("-0.5", c).unwrap().to_decimal_string(), "-0.500000");
        assert_eq!(Real::parse(".5", c).unwrap().to_decimal_string(), "0.500000");
        assert_eq!(Real::parse("+12.", c).unwrap().to_decimal_string(), "12.000000");
    }

    #[test]
    fn parse_rejects_junk() {
        let c = ctx(6);
        assert!(Real::parse("", c).is_err());
        assert!(Real::parse(".", c).is_err());
        assert!(Real::parse("1e5", c).is_err());
        assert!(Real::parse("12.3.4", c).is_err());
        assert!(Real::parse("--1", c).is_err());
    }

    #[test]
    fn parse_rounds_excess_digits_to_nearest() {
        let c = ctx(5);
        // 16 fractional digits against a scale of 15: last digit decides.
        let x = Real::parse("0.1234567890123456", c).unwrap();
        let y = Real::parse("0.123456789012346", c).unwrap();
        assert_eq!(x, y, "sixteenth digit should round the fifteenth up");
    }

    #[test]
    fn from_f64_is_exact_binary_expansion() {
        let c = ctx(20);
        assert_eq!(
            Real::from_f64(0.5, c).unwrap(),
            Real::from_ratio_i64(1, 2, c)
        );
        assert_eq!(
            Real::from_f64(-2.25, c).unwrap(),
            Real::from_ratio_i64(-9, 4, c)
        );
        assert!(Real::from_f64(f64::NAN, c).is_err());
        assert!(Real::from_f64(f64::INFINITY, c).is_err());
    }

    #[test]
    fn to_f64_is_close() {
        let c = ctx(40);
        let x = Real::parse("2.5", c).unwrap();
        assert_eq!(x.to_f64(), 2.5);
        let y = Real::from_ratio_i64(1, 3, c);
        assert!((y.to_f64() - 1.0 / 3.0).abs() < 1e-15);
        let big = Real::from_i64(1_000_000_007, c);
        assert!((big.to_f64() - 1.000000007e9).abs() < 1.0);
    }

    // ── Exactness of the grid ──────────────────────────────────────────

    #[test]
    fn addition_is_exact() {
        let c = ctx(30);
        let a = Real::from_ratio_i64(1, 7, c);
        let b = Real::from_ratio_i64(22, 913, c);
        let back = &(&a + &b) - &b;
        assert_eq!(back, a, "add then subtract must restore the mantissa");
    }

    #[test]
    fn multiplication_of_grid_values_is_exact() {
        let c = ctx(12);
        let half = Real::from_ratio_i64(1, 2, c);
        let quarter = Real::from_ratio_i64(1, 4, c);
        assert_eq!(&half * &half, quarter);
    }

    #[test]
    fn division_rounds_to_nearest() {
        let c = ctx(10);
        let one = Real::one(c);
        let three = Real::from_i64(3, c);
        let third = &one / &three;
        // 1/3 back up by 3 lands within one grid unit of 1.
        let diff = &(&third * &three) - &one;
        let ulp = Real::from_raw(BigInt::from(3), c);
        assert!(diff.abs() <= ulp, "1/3 * 3 off by {:?}", diff);
    }

    #[test]
    fn div_round_ties_go_away_from_zero() {
        assert_eq!(div_round(BigInt::from(5), &BigInt::from(2)), BigInt::from(3));
        assert_eq!(div_round(BigInt::from(-5), &BigInt::from(2)), BigInt::from(-3));
        assert_eq!(div_round(BigInt::from(4), &BigInt::from(2)), BigInt::from(2));
        assert_eq!(div_round(BigInt::from(7), &BigInt::from(3)), BigInt::from(2));
    }

    // ── Operators ──────────────────────────────────────────────────────

    #[test]
    fn powi_matches_repeated_multiplication() {
        let c = ctx(15);
        let two = Real::from_i64(2, c);
        assert_eq!(two.powi(10), Real::from_i64(1024, c));
        assert_eq!(two.powi(0), Real::one(c));
        let inv = two.powi(-2);
        assert_eq!(inv, Real::from_ratio_i64(1, 4, c));
    }

    #[test]
    fn mul_int_and_div_int_agree_with_full_ops() {
        let c = ctx(18);
        let x = Real::parse("1.125", c).unwrap();
        assert_eq!(x.mul_int(-8), Real::from_i64(-9, c));
        assert_eq!(x.div_int(3), &x / &Real::from_i64(3, c));
    }

    #[test]
    fn ordering_and_signs() {
        let c = ctx(8);
        let a = Real::parse("-1.5", c).unwrap();
        let b = Real::parse("0.25", c).unwrap();
        assert!(a < b);
        assert!(a.is_negative() && !a.is_positive());
        assert!(b.is_positive());
        assert_eq!(a.abs(), Real::parse("1.5", c).unwrap());
        assert_eq!(-&b, Real::parse("-0.25", c).unwrap());
    }

    #[test]
    #[should_panic(expected = "mixed precision contexts")]
    fn mixing_contexts_panics() {
        let a = Real::one(ctx(10));
        let b = Real::one(ctx(20));
        let _ = &a + &b;
    }

    #[test]
    fn with_ctx_moves_between_grids() {
        let narrow = ctx(8);
        let wide = ctx(32);
        let x = Real::from_ratio_i64(1, 7, narrow);
        let up = x.with_ctx(wide);
        assert_eq!(up.ctx().digits(), 32);
        // Widening is exact: coming straight back restores the mantissa.
        assert_eq!(up.with_ctx(narrow), x);
    }

    #[test]
    fn to_integer_detects_grid_integers() {
        let c = ctx(12);
        assert_eq!(Real::from_i64(-3, c).to_integer(), Some(BigInt::from(-3)));
        assert_eq!(Real::from_ratio_i64(1, 2, c).to_integer(), None);
        assert_eq!(Real::zero(c).to_integer(), Some(BigInt::zero()));
    }

    // ── Determinism ────────────────────────────────────────────────────

    #[test]
    fn summation_order_does_not_matter() {
        let c = ctx(25);
        let terms: Vec<Real> = (1..50)
            .map(|k| Real::from_ratio_i64(1, k * k, c))
            .collect();
        let forward = terms
            .iter()
            .fold(Real::zero(c), |acc, t| acc + t);
        let backward = terms
            .iter()
            .rev()
            .fold(Real::zero(c), |acc, t| acc + t);
        assert_eq!(forward, backward, "exact addition must commute");
    }
}
