//! Heat-kernel traces and their comparison against Weyl asymptotics.
//!
//! The trace Tr e^{-tΔ} = Σ d_k e^{-λ_k t} converges for every t > 0 and
//! fast enough below t ≈ 1 that direct summation at full precision is
//! cheap. Dividing by the leading Weyl term turns it into a sharp probe:
//! for the scalar Laplacian on S³ and on both L(2,1) sectors the shifted
//! spectrum λ = (n+1)² - 1 makes
//!
//! ```text
//! Tr e^{-tΔ} / (a₀ (4πt)^{-3/2})  =  e^t + O(e^{-π²/(4t)})
//! ```
//!
//! an identity up to theta-function corrections, while on the flat
//! circle the same ratio tends to 1. Non-scalar operators carry an extra
//! fiber-rank factor in the denominator. The subleading fit goes the
//! other way: from sampled traces it recovers a₀ and a₁ numerically and
//! checks them against the geometry.

use log::debug;
use nalgebra::{DMatrix, DVector};
use num_traits::ToPrimitive;

use crate::error::{Result, SpectralError};
use crate::precision::Real;
use crate::special;
use crate::spectrum::Spectrum;
use crate::weyl::WeylExpansion;

/// Hard ceiling on modes per trace; reached only for t small enough that
/// direct summation is the wrong tool.
const HEAT_MODE_CAP: u64 = 4_000_000;

/// One sampled point of a heat-trace profile.
#[derive(Debug, Clone)]
pub struct HeatSample {
    pub t: Real,
    /// Full trace including zero modes.
    pub trace: Real,
    /// c·a₀/(4πt)^{d/2} with c the fiber rank of the operator's bundle.
    pub weyl_leading: Real,
    /// trace / weyl_leading.
    pub ratio: Real,
}

/// Least-squares estimates of the scaled expansion
/// trace·(4πt)^{d/2} ≈ a₀ + a₁t + a₂t².
#[derive(Debug, Clone, Copy)]
pub struct SubleadingFit {
    pub a0: f64,
    pub a1: f64,
    pub a2: f64,
    /// Euclidean norm of the fit residual.
    pub residual: f64,
}

/// Tr e^{-tΔ}, summed until terms underflow the working grid.
///
/// `include_zero_modes` adds one unit per zero mode; the Weyl-ratio
/// identities require them.
pub fn heat_trace(spec: &Spectrum, t: &Real, include_zero_modes: bool) -> Result<Real> {
    if !t.is_positive() {
        return Err(SpectralError::DomainError(format!(
            "heat trace needs t > 0, got {}",
            t
        )));
    }
    let ctx = t.ctx();
    let t_f = t.to_f64();

    // Terms vanish exactly once λt exceeds the exp underflow threshold.
    // If the mode at the cap has not reached it, refuse up front instead
    // of summing millions of subthreshold terms.
    let threshold = f64::from(ctx.scale() + 2) * std::f64::consts::LN_10;
    let cap_mode = spec.nth_mode(HEAT_MODE_CAP);
    let cap_lambda = cap_mode.eigenvalue.to_f64().unwrap_or(f64::INFINITY);
    if cap_lambda * t_f < threshold {
        return Err(SpectralError::NonConvergence {
            detail: format!(
                "heat trace for {} at t = {} needs more than {} modes",
                spec, t_f, HEAT_MODE_CAP
            ),
            achieved_delta: (-cap_lambda * t_f).exp() * cap_mode.multiplicity as f64,
        });
    }

    let mut acc = if include_zero_modes {
        Real::from_u64(spec.zero_modes(), ctx)
    } else {
        Real::zero(ctx)
    };
    for k in 1..=HEAT_MODE_CAP {
        let mode = spec.nth_mode(k);
        let lambda = Real::from_ratio(&mode.eigenvalue, ctx);
        let term = special::exp(&-(&lambda * t)).mul_int(mode.multiplicity as i64);
        if term.is_zero() {
            break;
        }
        acc += term;
    }
    Ok(acc)
}

/// Traces, leading Weyl terms and their ratios at the given times.
///
/// Zero modes are always included; without them the e^t law fails on the
/// sphere at the first sample.
pub fn heat_profile(spec: &Spectrum, times: &[Real]) -> Result<Vec<HeatSample>> {
    let coeff = spec.bundle_rank() as i64;
    let mut samples = Vec::with_capacity(times.len());
    for t in times {
        if !t.is_positive() {
            return Err(SpectralError::DomainError(format!(
                "heat profile needs t > 0, got {}",
                t
            )));
        }
        let trace = heat_trace(spec, t, true)?;
        let weyl = WeylExpansion::for_manifold(spec.manifold(), t.ctx());
        let weyl_leading = weyl.leading_trace(t).mul_int(coeff);
        let ratio = &trace / &weyl_leading;
        samples.push(HeatSample {
            t: t.clone(),
            trace,
            weyl_leading,
            ratio,
        });
    }
    Ok(samples)
}

/// Fits trace·(4πt)^{d/2} ≈ a₀ + a₁t + a₂t² over sampled times and
/// returns the coefficients for comparison with [`WeylExpansion`].
///
/// Needs at least three samples; the solve is plain f64 least squares,
/// which is all the accuracy a truncated expansion deserves.
pub fn fit_subleading(spec: &Spectrum, times: &[Real]) -> Result<SubleadingFit> {
    if times.len() < 3 {
        return Err(SpectralError::DomainError(format!(
            "subleading fit needs at least 3 samples, got {}",
            times.len()
        )));
    }
    let samples = heat_profile(spec, times)?;
    let a0_geom = WeylExpansion::for_manifold(spec.manifold(), times[0].ctx())
        .a0()
        .to_f64();

    let n = samples.len();
    let mut design = DMatrix::<f64>::zeros(n, 3);
    let mut rhs = DVector::<f64>::zeros(n);
    for (i, sample) in samples.iter().enumerate() {
        let t_f = sample.t.to_f64();
        design[(i, 0)] = 1.0;
        design[(i, 1)] = t_f;
        design[(i, 2)] = t_f * t_f;
        // ratio·c·a₀ = trace·(4πt)^{d/2}.
        rhs[i] = sample.ratio.to_f64() * a0_geom * spec.bundle_rank() as f64;
    }

    let svd = design.clone().svd(true, true);
    let coeffs = svd
        .solve(&rhs, 1e-14)
        .map_err(|e| SpectralError::DomainError(format!("least-squares solve failed: {}", e)))?;
    let residual = (&design * &coeffs - &rhs).norm();
    debug!(
        "subleading fit over {} samples: a0 {:.6}, a1 {:.6}, residual {:.3e}",
        n, coeffs[0], coeffs[1], residual
    );
    Ok(SubleadingFit {
        a0: coeffs[0],
        a1: coeffs[1],
        a2: coeffs[2],
        residual,
    })
}
