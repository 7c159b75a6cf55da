//! Direct summation of spectral zeta functions.
//!
//! For a spectrum with positive modes (λ_k, d_k) this module evaluates
//!
//! ```text
//! ζ(s) = Σ_k d_k λ_k^{-s}
//! ```
//!
//! and its s-derivative by brute force at fixed precision. Plain partial
//! sums only converge to the right of the abscissa σ₀ = dim/2; everything
//! analytic continuation gives below that line lives in the closed-form
//! and tail machinery, not here. What this module adds on top of a bare
//! loop:
//!
//! * an a-priori tail bound, so [`zeta_converged`] can certify its error
//!   or report how far it got;
//! * a Weyl-subtracted variant in which the leading growth
//!   c·(step·k)^{dim-1-2s} of the summand is removed term by term,
//!   extending useful partial sums toward small s;
//! * doubling refinement ladders for empirical convergence-order checks.
//!
//! Addition of fixed-point values is exact integer addition, so the
//! parallel block reduction is bit-for-bit identical to a sequential
//! fold regardless of thread count or chunking.

use crate::error::{Result, SpectralError};
use crate::precision::{PrecisionCtx, Real};
use crate::special;
use crate::spectrum::Spectrum;

use log::debug;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A truncated spectral sum.
#[derive(Debug, Clone)]
pub struct PartialSum {
    /// Value of the first `terms_used` terms.
    pub value: Real,
    /// Number of positive modes summed.
    pub terms_used: u64,
    /// The final term, for convergence diagnostics.
    pub last_term: Real,
}

/// A spectral sum together with a certified truncation error.
#[derive(Debug, Clone)]
pub struct RegularizedValue {
    pub value: Real,
    /// Upper bound on |exact - value|.
    pub delta: f64,
    pub terms_used: u64,
}

fn mode_term(spec: &Spectrum, k: u64, neg_s: &Real, ctx: PrecisionCtx) -> Real {
    let mode = spec.nth_mode(k);
    let lambda = Real::from_ratio(&mode.eigenvalue, ctx);
    special::pow(&lambda, neg_s).mul_int(mode.multiplicity as i64)
}

fn mode_term_logged(spec: &Spectrum, k: u64, neg_s: &Real, ctx: PrecisionCtx) -> Real {
    let mode = spec.nth_mode(k);
    let lambda = Real::from_ratio(&mode.eigenvalue, ctx);
    let weight = special::pow(&lambda, neg_s).mul_int(mode.multiplicity as i64);
    &weight * &special::ln(&lambda)
}

/// Sums `term(k)` for k in `lo..=hi`. Exact adds make the parallel
/// reduction deterministic.
fn block_sum<F>(lo: u64, hi: u64, ctx: PrecisionCtx, term: F) -> Real
where
    F: Fn(u64) -> Real + Send + Sync,
{
    if lo > hi {
        return Real::zero(ctx);
    }
    #[cfg(feature = "parallel")]
    let value = (lo..=hi)
        .into_par_iter()
        .map(term)
        .reduce(|| Real::zero(ctx), |a, b| a + b);
    #[cfg(not(feature = "parallel"))]
    let value = (lo..=hi).map(term).fold(Real::zero(ctx), |a, b| a + b);
    value
}

/// Partial sum of ζ(s) over the first `n_terms` positive modes.
///
/// Valid for any s; whether the result means anything is the caller's
/// problem. `s` fixes the working precision.
pub fn zeta_partial(spec: &Spectrum, s: &Real, n_terms: u64) -> PartialSum {
    let ctx = s.ctx();
    let neg_s = -s;
    let value = block_sum(1, n_terms, ctx, |k| mode_term(spec, k, &neg_s, ctx));
    let last_term = if n_terms == 0 {
        Real::zero(ctx)
    } else {
        mode_term(spec, n_terms, &neg_s, ctx)
    };
    PartialSum {
        value,
        terms_used: n_terms,
        last_term,
    }
}

/// Partial sum of ζ'(s) = -Σ d_k ln(λ_k) λ_k^{-s}.
pub fn zeta_prime_partial(spec: &Spectrum, s: &Real, n_terms: u64) -> PartialSum {
    let ctx = s.ctx();
    let neg_s = -s;
    let value = -block_sum(1, n_terms, ctx, |k| mode_term_logged(spec, k, &neg_s, ctx));
    let last_term = if n_terms == 0 {
        Real::zero(ctx)
    } else {
        -mode_term_logged(spec, n_terms, &neg_s, ctx)
    };
    PartialSum {
        value,
        terms_used: n_terms,
        last_term,
    }
}

/// ζ(s) summed until the tail bound drops below `target`, in doubling
/// blocks capped at `max_terms` modes.
///
/// Terms behave like c·(step·k)^{dim-1-2s}, so the tail beyond mode N is
/// bounded by term_N · N / (2(s - σ₀)) once N is past the preasymptotic
/// range. Requires Re s strictly above the abscissa σ₀ = dim/2.
pub fn zeta_converged(
    spec: &Spectrum,
    s: &Real,
    target: f64,
    max_terms: u64,
) -> Result<RegularizedValue> {
    let sigma0 = spec.convergence_abscissa();
    let s_f = s.to_f64();
    if !(s_f > sigma0) {
        return Err(SpectralError::DomainError(format!(
            "direct summation needs s > {}, got s = {}",
            sigma0, s_f
        )));
    }
    if !target.is_finite() || target <= 0.0 {
        return Err(SpectralError::DomainError(format!(
            "tail target must be a positive finite number, got {}",
            target
        )));
    }
    if max_terms == 0 {
        return Err(SpectralError::DomainError(
            "max_terms must be positive".to_string(),
        ));
    }

    let ctx = s.ctx();
    let neg_s = -s;
    let term = |k: u64| mode_term(spec, k, &neg_s, ctx);
    // Budgets past the enumeration range fail as non-convergence rather
    // than walking off the mode table.
    let budget = max_terms.min(spec.max_mode_index());

    let mut value = Real::zero(ctx);
    let mut summed: u64 = 0;
    let mut block: u64 = 1024;
    loop {
        let hi = summed.saturating_add(block).min(budget);
        value += block_sum(summed + 1, hi, ctx, &term);
        summed = hi;

        let last = term(summed);
        let bound = last.to_f64().abs() * summed as f64 / (2.0 * (s_f - sigma0));
        debug!(
            "zeta sum for {} at s={:.3}: N={}, tail bound {:.3e}",
            spec, s_f, summed, bound
        );
        if bound <= target {
            return Ok(RegularizedValue {
                value,
                delta: bound,
                terms_used: summed,
            });
        }
        if summed >= budget {
            return Err(SpectralError::NonConvergence {
                detail: format!(
                    "zeta sum for {} at s={:.3} still above target {:.3e} after {} modes",
                    spec, s_f, target, summed
                ),
                achieved_delta: bound,
            });
        }
        block = block.saturating_mul(2);
    }
}

/// Partial sum of ζ(s) with the leading Weyl growth removed term by term.
///
/// The k-th summand becomes d_k λ_k^{-s} - c·(step·k)^{dim-1-2s}, where c
/// and step come from the spectrum. The subtracted series decays one
/// power of k faster, which is what makes small positive s explorable at
/// all by direct summation. Requires s > 0.
pub fn zeta_weyl_subtracted(spec: &Spectrum, s: &Real, n_terms: u64) -> Result<PartialSum> {
    let s_f = s.to_f64();
    if !(s_f > 0.0) {
        return Err(SpectralError::DomainError(format!(
            "Weyl-subtracted sums are defined for s > 0, got s = {}",
            s_f
        )));
    }
    let ctx = s.ctx();
    let neg_s = -s;
    let coeff = spec.weyl_coeff() as i64;
    let step = spec.level_step();
    let dim = spec.manifold().dimension();
    // Exponent (dim - 1) - 2s of the subtracted growth.
    let exponent = Real::from_i64(i64::from(dim) - 1, ctx) - s.mul_int(2);

    let term = |k: u64| {
        let raw = mode_term(spec, k, &neg_s, ctx);
        let scale = Real::from_u64(step * k, ctx);
        let leading = special::pow(&scale, &exponent).mul_int(coeff);
        raw - leading
    };
    let value = block_sum(1, n_terms, ctx, &term);
    let last_term = if n_terms == 0 {
        Real::zero(ctx)
    } else {
        term(n_terms)
    };
    Ok(PartialSum {
        value,
        terms_used: n_terms,
        last_term,
    })
}

/// Partial sums at N, 2N, 4N, ... for empirical convergence-rate checks.
///
/// Blocks are reused, so the whole ladder costs one pass over the final
/// mode count. Returns `doublings + 1` entries.
pub fn refinement_ladder(
    spec: &Spectrum,
    s: &Real,
    base_terms: u64,
    doublings: u32,
) -> Vec<PartialSum> {
    let ctx = s.ctx();
    let neg_s = -s;
    let term = |k: u64| mode_term(spec, k, &neg_s, ctx);

    let mut out = Vec::with_capacity(doublings as usize + 1);
    let mut value = Real::zero(ctx);
    let mut summed: u64 = 0;
    let mut n = base_terms.max(1);
    for _ in 0..=doublings {
        value += block_sum(summed + 1, n, ctx, &term);
        summed = n;
        out.push(PartialSum {
            value: value.clone(),
            terms_used: summed,
            last_term: term(summed),
        });
        n *= 2;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::{Operator, Sector, Twist};

    fn ctx(digits: u32) -> PrecisionCtx {
        PrecisionCtx::new(digits).unwrap()
    }

    // ── Anchors with closed forms ──────────────────────────────────────

    #[test]
    fn sphere_scalar_zeta_at_two() {
        // Partial fractions give ζ_{S³}(2) = 1/16 + π²/12 exactly.
        let c = ctx(20);
        let spec = Spectrum::on_sphere(Operator::ScalarLaplacian);
        let s = Real::from_i64(2, c);
        let got = zeta_converged(&spec, &s, 1e-5, 400_000).unwrap();
        let expected = Real::from_ratio_i64(1, 16, c) + special::zeta_even(2, c).div_int(2);
        let diff = (&got.value - &expected).to_f64().abs();
        assert!(
            diff <= 2.0 * got.delta.max(1e-12),
            "|zeta(2) - closed form| = {:.3e}, certified {:.3e}",
            diff,
            got.delta
        );
        assert!(got.delta <= 1e-5);
    }

    #[test]
    fn circle_zeta_at_one_is_pi_squared_over_three() {
        // Σ 2 n^{-2} = 2 ζ_R(2) = π²/3.
        let c = ctx(20);
        let spec = Spectrum::circle();
        let s = Real::one(c);
        let got = zeta_converged(&spec, &s, 1e-4, 200_000).unwrap();
        let expected = special::zeta_even(2, c).mul_int(2);
        let diff = (&got.value - &expected).to_f64().abs();
        assert!(diff <= 2.0 * got.delta, "error {:.3e} vs bound {:.3e}", diff, got.delta);
    }

    // ── Domain checks and failure reporting ────────────────────────────

    #[test]
    fn converged_rejects_s_at_or_below_abscissa() {
        let c = ctx(15);
        let sphere = Spectrum::on_sphere(Operator::ScalarLaplacian);
        let at = zeta_converged(&sphere, &Real::from_ratio_i64(3, 2, c), 1e-3, 10_000);
        assert!(matches!(at, Err(SpectralError::DomainError(_))));
        let below = zeta_converged(&sphere, &Real::one(c), 1e-3, 10_000);
        assert!(below.is_err());
    }

    #[test]
    fn converged_reports_how_far_it_got() {
        // s = 0.6 on the circle converges like N^{-0.2}; 4096 modes
        // cannot reach 1e-6.
        let c = ctx(15);
        let spec = Spectrum::circle();
        let s = Real::from_ratio_i64(3, 5, c);
        match zeta_converged(&spec, &s, 1e-6, 4096) {
            Err(SpectralError::NonConvergence { achieved_delta, .. }) => {
                assert!(achieved_delta > 1e-6);
                assert!(achieved_delta.is_finite());
            }
            other => panic!("expected NonConvergence, got {:?}", other),
        }
    }

    #[test]
    fn rejects_bad_targets() {
        let c = ctx(15);
        let spec = Spectrum::circle();
        let s = Real::from_i64(2, c);
        assert!(zeta_converged(&spec, &s, 0.0, 100).is_err());
        assert!(zeta_converged(&spec, &s, f64::NAN, 100).is_err());
        assert!(zeta_converged(&spec, &s, 1e-3, 0).is_err());
    }

    // ── Determinism of the parallel reduction ──────────────────────────

    #[test]
    fn partial_sum_equals_sequential_fold_exactly() {
        let c = ctx(30);
        let spec = Spectrum::on_sphere(Operator::ScalarLaplacian);
        let s = Real::from_i64(2, c);
        let parallel = zeta_partial(&spec, &s, 500);

        let neg_s = -&s;
        let mut sequential = Real::zero(c);
        for k in 1..=500u64 {
            sequential += mode_term(&spec, k, &neg_s, c);
        }
        // Exact mantissa equality, not approximate agreement.
        assert_eq!(parallel.value, sequential);
        assert_eq!(parallel.terms_used, 500);
    }

    // ── Convergence rates ──────────────────────────────────────────────

    #[test]
    fn ladder_tail_shrinks_fourfold_at_s_five_halves() {
        // Tails scale like N^{3-2s} = N^{-2}, so doubling N divides the
        // remaining tail, and hence successive deltas, by 4.
        let c = ctx(20);
        let spec = Spectrum::on_sphere(Operator::ScalarLaplacian);
        let s = Real::from_ratio_i64(5, 2, c);
        let ladder = refinement_ladder(&spec, &s, 64, 3);
        assert_eq!(ladder.len(), 4);
        let d1 = (&ladder[1].value - &ladder[0].value).to_f64();
        let d2 = (&ladder[2].value - &ladder[1].value).to_f64();
        let d3 = (&ladder[3].value - &ladder[2].value).to_f64();
        let r1 = d1 / d2;
        let r2 = d2 / d3;
        assert!((r1 - 4.0).abs() < 0.4, "first ratio {}", r1);
        assert!((r2 - 4.0).abs() < 0.2, "second ratio {}", r2);
    }

    #[test]
    fn prime_matches_central_difference() {
        let c = ctx(25);
        let spec = Spectrum::on_sphere(Operator::ScalarLaplacian);
        let s = Real::from_ratio_i64(5, 2, c);
        let h = Real::from_ratio_i64(1, 100, c);
        let n = 300;

        let plus = zeta_partial(&spec, &(&s + &h), n).value;
        let minus = zeta_partial(&spec, &(&s - &h), n).value;
        let central = (&plus - &minus).div_int(2) / &h;
        let prime = zeta_prime_partial(&spec, &s, n).value;
        let diff = (&central - &prime).to_f64().abs();
        // Central differences are accurate to O(h²).
        assert!(diff < 1e-3, "difference {}", diff);
    }

    // ── Weyl subtraction ───────────────────────────────────────────────

    #[test]
    fn weyl_subtraction_kills_the_leading_term() {
        let c = ctx(20);
        let spec = Spectrum::on_lens(
            Operator::ScalarLaplacian,
            2,
            1,
            Sector::Boson(Twist::Untwisted),
        )
        .unwrap();
        let s = Real::from_i64(2, c);
        let n = 200;
        let raw = zeta_partial(&spec, &s, n);
        let subtracted = zeta_weyl_subtracted(&spec, &s, n).unwrap();
        let raw_tail = raw.last_term.to_f64().abs();
        let sub_tail = subtracted.last_term.to_f64().abs();
        assert!(
            sub_tail < raw_tail * 0.02,
            "subtracted term {:.3e} vs raw {:.3e}",
            sub_tail,
            raw_tail
        );
    }

    #[test]
    fn weyl_subtraction_rejects_nonpositive_s() {
        let c = ctx(15);
        let spec = Spectrum::on_sphere(Operator::ScalarLaplacian);
        assert!(zeta_weyl_subtracted(&spec, &Real::zero(c), 100).is_err());
        assert!(zeta_weyl_subtracted(&spec, &Real::from_i64(-1, c), 100).is_err());
    }
}
