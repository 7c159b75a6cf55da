//! Closed-form reference constants.
//!
//! Every independently known value the crate checks itself against lives
//! here, each computed under the caller's context from its defining
//! formula rather than from a decimal literal. Verification paths and
//! tests draw from this one table; the geometric volumes are the third
//! closed family and stay on [`crate::spectrum::Manifold::volume`].
//!
//! # References
//!
//! * Nash, Charles and O'Connor, Denjoe (1995), "Determinants of
//!   Laplacians on lens spaces"
//! * Ray, Daniel and Singer, Isadore (1971), "R-torsion and the
//!   Laplacian on Riemannian manifolds"

use num_bigint::BigInt;
use num_rational::BigRational;

use crate::error::{Result, SpectralError};
use crate::precision::{PrecisionCtx, Real};
use crate::special;
use crate::spectrum::Spectrum;
use crate::tail::{closed_form, OutputKind};

/// The circle Casimir constant 1/24 = −ζ_R(−1)/2, from the trivial zero.
pub fn kappa_exact(ctx: PrecisionCtx) -> Real {
    let minus_one_twelfth = special::zeta_neg_int(1);
    Real::from_ratio(&(-minus_one_twelfth / BigInt::from(2)), ctx)
}

/// Massless periodic Casimir energy −π/(6L) on a circle of
/// circumference `L`.
pub fn casimir_circle_massless(circumference: &Real) -> Result<Real> {
    if !circumference.is_positive() {
        return Err(SpectralError::DomainError(format!(
            "circle circumference must be positive, got {}",
            circumference
        )));
    }
    let pi = special::pi(circumference.ctx());
    Ok(-(&pi / &circumference.mul_int(6)))
}

/// The determinant closed form of a spectrum, as ln det' (ln det where
/// no kernel was removed).
///
/// Thin sign-normalizing wrapper over the table in [`crate::tail`];
/// spectra outside the table keep its refusal.
pub fn closed_log_det(spec: &Spectrum, ctx: PrecisionCtx) -> Result<Real> {
    let (basis, kind) = closed_form(spec)?;
    let value = basis.evaluate(ctx);
    Ok(match kind {
        OutputKind::LogDetPrime => value,
        OutputKind::ZetaPrimeZero => -value,
    })
}

/// The Nash-O'Connor torsion combination 3ζ(3)/π² − 2 ln 2 on RP³.
///
/// Equals −2 ln det of the twisted scalar sector; the −2 ln 2 part is
/// the log of the Reidemeister torsion and the rest is −12 ζ_R'(−2).
pub fn nash_oconnor_torsion(ctx: PrecisionCtx) -> Real {
    let work = ctx.widened(8);
    let pi = special::pi(work);
    let z3_over_pi2 = &special::zeta3(work) / &(&pi * &pi);
    (z3_over_pi2.mul_int(3) - special::ln2(work).mul_int(2)).with_ctx(ctx)
}

/// Franz-Reidemeister torsion of L(p,q), from the defining product
/// Π_{j=1}^{p-1} |1 − e^{2πij/p}|^{-2} = p^{-2}.
///
/// The product of 1 − ζ over the nontrivial p-th roots of unity is p,
/// so the torsion is exactly rational for every order.
pub fn reidemeister_torsion_lens(p: u32) -> Result<BigRational> {
    if p < 2 {
        return Err(SpectralError::DomainError(format!(
            "a lens space needs a cyclic group of order at least 2, got {}",
            p
        )));
    }
    let order = BigInt::from(p);
    Ok(BigRational::new(BigInt::from(1), &order * &order))
}

/// ζ_R'(0) = −ln √(2π).
pub fn zeta_r_prime_zero(ctx: PrecisionCtx) -> Real {
    let work = ctx.widened(8);
    let ln_2pi = special::ln2(work) + special::ln(&special::pi(work));
    (-ln_2pi.div_int(2)).with_ctx(ctx)
}

/// ζ_R'(−2) = −ζ(3)/(4π²), the first trivial-zero derivative.
pub fn zeta_r_prime_minus2(ctx: PrecisionCtx) -> Real {
    let work = ctx.widened(8);
    let pi = special::pi(work);
    (-(&special::zeta3(work) / &(&pi * &pi)).div_int(4)).with_ctx(ctx)
}

/// ln det' of the circle Laplacian at circumference 2π: ln (2π)², here
/// as −4 ζ_R'(0).
pub fn circle_log_det_prime(ctx: PrecisionCtx) -> Real {
    zeta_r_prime_zero(ctx).mul_int(-4)
}
