//! Special functions and constants on the fixed-precision grid.
//!
//! Everything a regularized spectral sum needs beyond field arithmetic
//! lives here: logarithms and exponentials for per-mode weights, the
//! classical constants that appear in closed forms, exact Bernoulli
//! rationals for zeta values at integers, and the modified Bessel
//! function K₁ that carries massive Kaluza-Klein towers.
//!
//! # Algorithms
//!
//! * `pi`: Machin's formula 16·atan(1/5) − 4·atan(1/239), integer series
//!   on the mantissa grid.
//! * `exp`: argument halving to |r| ≤ 1/2, Taylor series, squaring back.
//! * `ln`: decade normalization into [1, 10), four square-root
//!   reductions, then 2·atanh((f−1)/(f+1)).
//! * `euler_gamma`: Brent-McMillan, γ = A(n)/B(n) − ln n with
//!   A(n) = Σ Hₖ(nᵏ/k!)², B(n) = Σ (nᵏ/k!)², error O(e^{-4n}).
//! * `zeta_even`, `zeta_neg_int`: exact Bernoulli rationals through the
//!   defining recurrence, so ζ(2m) and ζ(-m) carry no series error at all.
//! * `zeta3`: the Apéry-accelerated central-binomial series.
//! * `bessel_k1`: ascending series with cancellation guard digits below
//!   the crossover, large-argument asymptotic expansion above it.
//!
//! Constants take an explicit [`PrecisionCtx`]; functions of a [`Real`]
//! argument inherit its context. Intermediate work runs on a widened grid
//! and is rounded back once at the end.
//!
//! # References
//!
//! * Brent, Richard P. and McMillan, Edwin M. (1980), "Some new algorithms
//!   for high-precision computation of Euler's constant"
//! * van der Poorten, Alfred (1979), "A proof that Euler missed"
//! * Abramowitz, Milton and Stegun, Irene (1964), "Handbook of
//!   Mathematical Functions", 9.6 and 9.7

use log::trace;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, ToPrimitive, Zero};

use crate::precision::{dec_digits, div_round, pow10, PrecisionCtx, Real};

/// Extra decimal digits for intermediate work.
const WORK_EXTRA: u32 = 8;

// ---------------------------------------------------------------------------
// Integer-grid series for the fixed constants
// ---------------------------------------------------------------------------

/// atan(1/k) summed directly on the mantissa grid.
fn atan_inv(k: i64, ctx: PrecisionCtx) -> Real {
    let k2 = BigInt::from(k * k);
    let mut power = pow10(ctx.scale()) / k;
    let mut acc = power.clone();
    let mut i = 1i64;
    loop {
        power /= &k2;
        if power.is_zero() {
            break;
        }
        let term = &power / (2 * i + 1);
        if i % 2 == 1 {
            acc -= term;
        } else {
            acc += term;
        }
        i += 1;
    }
    Real::from_raw(acc, ctx)
}

/// atanh(1/k) summed directly on the mantissa grid.
fn atanh_inv(k: i64, ctx: PrecisionCtx) -> Real {
    let k2 = BigInt::from(k * k);
    let mut power = pow10(ctx.scale()) / k;
    let mut acc = power.clone();
    let mut i = 1i64;
    loop {
        power /= &k2;
        if power.is_zero() {
            break;
        }
        acc += &power / (2 * i + 1);
        i += 1;
    }
    Real::from_raw(acc, ctx)
}

/// atanh for |u| < 1, used by `ln` after range reduction.
fn atanh(u: &Real) -> Real {
    let u2 = u * u;
    let mut power = u.clone();
    let mut acc = u.clone();
    let mut i = 1i64;
    loop {
        power = &power * &u2;
        let term = power.div_int(2 * i + 1);
        if term.is_zero() {
            break;
        }
        acc += &term;
        i += 1;
    }
    acc
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// π by Machin's formula.
pub fn pi(ctx: PrecisionCtx) -> Real {
    let work = ctx.widened(WORK_EXTRA);
    let a5 = atan_inv(5, work);
    let a239 = atan_inv(239, work);
    (a5.mul_int(16) - a239.mul_int(4)).with_ctx(ctx)
}

/// ln 2 = 2·atanh(1/3).
pub fn ln2(ctx: PrecisionCtx) -> Real {
    let work = ctx.widened(WORK_EXTRA);
    atanh_inv(3, work).mul_int(2).with_ctx(ctx)
}

/// ln 10 = 3·ln 2 + 2·atanh(1/9).
pub fn ln10(ctx: PrecisionCtx) -> Real {
    let work = ctx.widened(WORK_EXTRA);
    (atanh_inv(3, work).mul_int(6) + atanh_inv(9, work).mul_int(2)).with_ctx(ctx)
}

/// Euler's constant γ by the Brent-McMillan Bessel-ratio scheme.
pub fn euler_gamma(ctx: PrecisionCtx) -> Real {
    let work = ctx.widened(12);
    // e^{-4n} below the working grid: n > scale·ln(10)/4.
    let n = ((work.scale() as f64) * std::f64::consts::LN_10 / 4.0).ceil() as i64 + 2;
    let nr = Real::from_i64(n, work);
    let mut term = Real::one(work); // (n^k/k!)²
    let mut harmonic = Real::zero(work); // H_k
    let mut a = Real::zero(work); // Σ (n^k/k!)² H_k
    let mut b = Real::one(work); // Σ (n^k/k!)²
    let mut k = 1i64;
    loop {
        term = (&term * &nr).div_int(k);
        term = (&term * &nr).div_int(k);
        if term.is_zero() {
            break;
        }
        harmonic += &Real::from_ratio_i64(1, k, work);
        a += &(&term * &harmonic);
        b += &term;
        k += 1;
    }
    (&a / &b - &ln(&nr)).with_ctx(ctx)
}

/// ζ(3) by the central-binomial series (5/2)·Σ (-1)^{k-1} / (k³·C(2k,k)).
pub fn zeta3(ctx: PrecisionCtx) -> Real {
    let work = ctx.widened(WORK_EXTRA);
    let mut acc = Real::zero(work);
    let mut binom = BigInt::from(2); // C(2k,k) at k=1
    let mut k = 1i64;
    loop {
        let den = &binom * (k * k * k);
        let term = Real::from_ratio(&BigRational::new(BigInt::one(), den), work);
        if term.is_zero() {
            break;
        }
        if k % 2 == 1 {
            acc += &term;
        } else {
            acc -= &term;
        }
        // C(2k+2, k+1) = C(2k, k) · 2(2k+1)/(k+1)
        binom = binom * (2 * (2 * k + 1)) / (k + 1);
        k += 1;
    }
    acc.mul_int(5).div_int(2).with_ctx(ctx)
}

// ---------------------------------------------------------------------------
// Exact rational zeta values
// ---------------------------------------------------------------------------

/// Bernoulli number Bₙ (convention B₁ = -1/2), from the defining
/// recurrence Σ_{j≤m} C(m+1, j)·Bⱼ = 0.
pub fn bernoulli(n: u32) -> BigRational {
    let mut b: Vec<BigRational> = Vec::with_capacity(n as usize + 1);
    b.push(BigRational::one());
    for m in 1..=n {
        let mut acc = BigRational::zero();
        let mut binom = BigInt::one(); // C(m+1, j) starting at j=0
        for (j, bj) in b.iter().enumerate() {
            acc += bj * &binom;
            binom = &binom * (m + 1 - j as u32) / (j as u32 + 1);
        }
        b.push(-acc / BigInt::from(m + 1));
    }
    b[n as usize].clone()
}

/// ζ(2m) for positive even argument, exactly
/// (-1)^{m+1}·B₂ₘ·(2π)^{2m} / (2·(2m)!).
///
/// # Panics
///
/// Panics for an odd or zero argument.
pub fn zeta_even(k: u32, ctx: PrecisionCtx) -> Real {
    assert!(k > 0 && k % 2 == 0, "zeta_even wants a positive even argument");
    let work = ctx.widened(WORK_EXTRA);
    let m = k / 2;
    let sign: i64 = if m % 2 == 1 { 1 } else { -1 };
    let mut fact = BigInt::one();
    for i in 2..=u64::from(k) {
        fact *= i;
    }
    let coeff = bernoulli(k) * BigRational::new(BigInt::from(sign), fact * 2u32);
    let two_pi = pi(work).mul_int(2);
    (&Real::from_ratio(&coeff, work) * &two_pi.powi(i64::from(k))).with_ctx(ctx)
}

/// ζ(-k) for k ≥ 0 as an exact rational: ζ(0) = -1/2, ζ(-1) = -1/12,
/// ζ(-2m) = 0.
pub fn zeta_neg_int(k: u32) -> BigRational {
    let b = bernoulli(k + 1) / BigInt::from(k + 1);
    if k % 2 == 0 {
        b
    } else {
        -b
    }
}

// ---------------------------------------------------------------------------
// Elementary functions
// ---------------------------------------------------------------------------

/// e^x. Arguments below the representable range flush to exact zero.
pub fn exp(x: &Real) -> Real {
    let ctx = x.ctx();
    let xf = x.to_f64();
    if xf < -((ctx.scale() as f64 + 2.0) * std::f64::consts::LN_10) {
        return Real::zero(ctx);
    }
    // Halve until |r| ≤ 1/2, run the Taylor series, square back up. Each
    // squaring doubles the relative error, so widen by the unwind depth.
    let halvings = if xf.abs() > 0.5 {
        ((xf.abs() / 0.5).log2().ceil() as u32 + 1).min(64)
    } else {
        0
    };
    let work = ctx.widened(halvings / 3 + WORK_EXTRA);
    let mut r = x.with_ctx(work);
    for _ in 0..halvings {
        r = r.div_int(2);
    }
    let mut term = Real::one(work);
    let mut acc = Real::one(work);
    let mut n = 1i64;
    loop {
        term = (&term * &r).div_int(n);
        if term.is_zero() {
            break;
        }
        acc += &term;
        n += 1;
    }
    for _ in 0..halvings {
        acc = &acc * &acc;
    }
    acc.with_ctx(ctx)
}

/// Natural logarithm.
///
/// # Panics
///
/// Panics for a non-positive argument.
pub fn ln(x: &Real) -> Real {
    assert!(x.is_positive(), "ln of non-positive value");
    let ctx = x.ctx();
    let work = ctx.widened(WORK_EXTRA);
    let xw = x.with_ctx(work);
    // Decade normalization: x = f·10^e with f in [1, 10).
    let e = dec_digits(xw.raw()) as i64 - 1 - work.scale() as i64;
    let mut f = Real::from_raw(
        if e >= 0 {
            div_round(xw.raw().clone(), &pow10(e as u32))
        } else {
            xw.raw() * pow10((-e) as u32)
        },
        work,
    );
    // Four square roots pull f into [1, 10^{1/16}); the atanh argument is
    // then at most 0.072 and the series converges geometrically.
    for _ in 0..4 {
        f = sqrt(&f);
    }
    let one = Real::one(work);
    let u = &(&f - &one) / &(&f + &one);
    let ln_f = atanh(&u).mul_int(32);
    let result = if e == 0 {
        ln_f
    } else {
        ln_f + ln10(work).mul_int(e)
    };
    result.with_ctx(ctx)
}

/// Square root via the integer square root of the widened mantissa.
///
/// # Panics
///
/// Panics for a negative argument.
pub fn sqrt(x: &Real) -> Real {
    assert!(!x.is_negative(), "sqrt of negative value");
    let ctx = x.ctx();
    let scaled = x.raw() * pow10(ctx.scale());
    Real::from_raw(scaled.sqrt(), ctx)
}

/// x^s for positive x. Grid-exact integer exponents short-circuit to
/// binary exponentiation; everything else goes through exp(s·ln x).
///
/// # Panics
///
/// Panics for a non-positive base or mismatched contexts.
pub fn pow(x: &Real, s: &Real) -> Real {
    assert!(x.is_positive(), "pow of non-positive base");
    assert_eq!(x.ctx(), s.ctx(), "pow operands must share a context");
    if let Some(k) = s.to_integer() {
        if let Some(k) = k.to_i64() {
            if k.unsigned_abs() <= 1 << 20 {
                return x.powi(k);
            }
        }
    }
    let ctx = x.ctx();
    let work = ctx.widened(WORK_EXTRA);
    let product = &ln(&x.with_ctx(work)) * &s.with_ctx(work);
    exp(&product).with_ctx(ctx)
}

// ---------------------------------------------------------------------------
// Modified Bessel K₁
// ---------------------------------------------------------------------------

/// Modified Bessel function of the second kind, order one.
///
/// Below the crossover where the large-argument expansion reaches grid
/// accuracy the ascending series is used, with enough extra digits to
/// survive the e^{2x} cancellation between its I₁ and Σ pieces. Above the
/// crossover the asymptotic expansion is summed to its smallest term.
/// Arguments so large that e^{-x} falls below the grid return exact zero.
///
/// # Panics
///
/// Panics for a non-positive argument.
pub fn bessel_k1(x: &Real) -> Real {
    assert!(x.is_positive(), "bessel_k1 of non-positive argument");
    let ctx = x.ctx();
    let xf = x.to_f64();
    let scale = ctx.scale() as f64;
    if xf > (scale + 10.0) * std::f64::consts::LN_10 {
        return Real::zero(ctx);
    }
    let crossover = (scale + 8.0) * std::f64::consts::LN_10 / 2.0;
    if xf >= crossover {
        trace!("bessel_k1({:.3}): asymptotic branch", xf);
        k1_asymptotic(x)
    } else {
        trace!("bessel_k1({:.3}): ascending branch", xf);
        k1_ascending(x)
    }
}

/// K₁(x) = 1/x + (ln(x/2) + γ)·I₁(x) − (x/4)·Σ (Hₖ + Hₖ₊₁)·uᵏ/(k!(k+1)!)
/// with u = x²/4.
fn k1_ascending(x: &Real) -> Real {
    let ctx = x.ctx();
    let xf = x.to_f64().max(0.0);
    // The two big pieces are each of size I₁(x) ~ e^x while the result is
    // ~ e^{-x}: 2x/ln(10) digits cancel.
    let extra = (2.0 * xf / std::f64::consts::LN_10).ceil() as u32 + 12;
    let work = ctx.widened(extra);
    let xw = x.with_ctx(work);
    let u = (&xw * &xw).div_int(4);
    let mut term = Real::one(work); // uᵏ/(k!(k+1)!)
    let mut hsum = Real::one(work); // Hₖ + Hₖ₊₁, seeded with H₀ + H₁ = 1
    let mut i1 = term.clone();
    let mut s = hsum.clone();
    let mut k = 1i64;
    loop {
        term = (&term * &u).div_int(k).div_int(k + 1);
        if term.is_zero() {
            break;
        }
        hsum += &Real::from_ratio_i64(1, k, work);
        hsum += &Real::from_ratio_i64(1, k + 1, work);
        i1 += &term;
        s += &(&term * &hsum);
        k += 1;
    }
    let i1 = &i1 * &xw.div_int(2);
    let s = &s * &xw.div_int(4);
    let lead = &Real::one(work) / &xw;
    let lg = ln(&xw.div_int(2)) + euler_gamma(work);
    (&(&lead + &(&lg * &i1)) - &s).with_ctx(ctx)
}

/// K₁(x) ~ √(π/2x)·e^{-x}·Σ cₖ x^{-k}, cₖ = cₖ₋₁·(3-2k)(2k+1)/(8k),
/// summed to the smallest term.
fn k1_asymptotic(x: &Real) -> Real {
    let ctx = x.ctx();
    let work = ctx.widened(WORK_EXTRA);
    let xw = x.with_ctx(work);
    let mut acc = Real::one(work);
    let mut c = Real::one(work);
    let mut prev_mag: Option<Real> = None;
    let mut k = 1i64;
    loop {
        c = (&c / &xw).mul_int(3 - 2 * k).mul_int(2 * k + 1).div_int(8 * k);
        let mag = c.abs();
        if mag.is_zero() {
            break;
        }
        if let Some(prev) = &prev_mag {
            if &mag >= prev {
                break;
            }
        }
        acc += &c;
        prev_mag = Some(mag);
        k += 1;
    }
    let envelope = &sqrt(&(&pi(work) / &xw.mul_int(2))) * &exp(&(-&xw));
    (&envelope * &acc).with_ctx(ctx)
}
