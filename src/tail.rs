//! Analytic continuation of ζ'(0) by hybrid summation.
//!
//! The spectra treated here all take the multiplicative form
//! d = (√w·m)², λ = w·m² - 1 after reindexing, which turns ζ'(0) into a
//! regularized sum of logarithms. Splitting each summand as
//!
//! ```text
//! w·m²·ln(1 - 1/(w·m²)) + 1  =  -Σ_{j≥1} m^{-2j} / ((j+1)·w^j)
//! ```
//!
//! leaves a convergent series whose first N terms are summed with exact
//! logarithms while the remainder beyond N is rebuilt from Riemann zeta
//! values ζ_R(2j) minus the matching power sums. Truncating the j-sum at
//! order 4 leaves an error of order N^{-9}, so a few hundred terms reach
//! any working precision this crate supports. The divergent bookkeeping
//! (ζ_R(0), ζ_R'(-2)) is folded into a per-scheme closed prefix in the
//! basis {1, ζ(3)/π², ln 2, ln π}.
//!
//! Two spectra admit the w·m² form: the scalar Laplacian on S³ (w = 1,
//! m ≥ 2) and its twisted L(2,1) sector (w = 4, m ≥ 1). The untwisted
//! sector is recovered from those two by multiplicativity, in the
//! determinant layer.

use num_rational::Rational64;
use num_traits::Zero;
use smallvec::SmallVec;

use log::debug;

use crate::error::{Result, SpectralError};
use crate::precision::{PrecisionCtx, Real};
use crate::special;
use crate::spectrum::{Manifold, Operator, Sector, Spectrum, Twist};

/// What a tail scheme or closed form evaluates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// ζ'(0) itself.
    ZetaPrimeZero,
    /// ln det' Δ = -ζ'(0), the kernel-free determinant.
    LogDetPrime,
}

/// A value in the closed basis {1, ζ(3)/π², ln 2, ln π}.
///
/// Every ζ'(0) and ln det' on the supported three-spaces lives in this
/// four-dimensional rational lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedBasis {
    pub constant: Rational64,
    pub zeta3_over_pi2: Rational64,
    pub ln2: Rational64,
    pub ln_pi: Rational64,
}

impl ClosedBasis {
    const ZERO: ClosedBasis = ClosedBasis {
        constant: Rational64::new_raw(0, 1),
        zeta3_over_pi2: Rational64::new_raw(0, 1),
        ln2: Rational64::new_raw(0, 1),
        ln_pi: Rational64::new_raw(0, 1),
    };

    /// Evaluates the basis combination at the requested precision.
    pub fn evaluate(&self, ctx: PrecisionCtx) -> Real {
        let work = ctx.widened(8);
        let mut acc = coef_times(&self.constant, &Real::one(work));
        if !self.zeta3_over_pi2.is_zero() {
            let pi = special::pi(work);
            let z3_over_pi2 = &special::zeta3(work) / &(&pi * &pi);
            acc += coef_times(&self.zeta3_over_pi2, &z3_over_pi2);
        }
        if !self.ln2.is_zero() {
            acc += coef_times(&self.ln2, &special::ln2(work));
        }
        if !self.ln_pi.is_zero() {
            acc += coef_times(&self.ln_pi, &special::ln(&special::pi(work)));
        }
        acc.with_ctx(ctx)
    }
}

fn coef_times(coef: &Rational64, value: &Real) -> Real {
    value.mul_int(*coef.numer()).div_int(*coef.denom())
}

/// One evaluation of a tail scheme, with its convergence history.
#[derive(Debug, Clone)]
pub struct TailEvaluation {
    /// Assembled value at the final checkpoint.
    pub value: Real,
    /// (terms, assembled value) at N/4, N/2 and N.
    pub checkpoints: SmallVec<[(u64, Real); 3]>,
    /// |v(N) - v(N/2)|, an empirical error certificate.
    pub delta: f64,
    pub terms_used: u64,
}

/// Hybrid log-sum plus zeta-tail evaluator for one spectrum.
#[derive(Debug, Clone)]
pub struct TailScheme {
    weight: i64,
    m_start: u64,
    negate: bool,
    tail_orders: u32,
    closed: ClosedBasis,
    output: OutputKind,
}

impl TailScheme {
    /// The scheme for a spectrum of the w·m² form.
    ///
    /// Errors with [`SpectralError::UnsupportedConfiguration`] for
    /// spectra that have none; the untwisted lens sector is deliberately
    /// among them.
    pub fn for_spectrum(spec: &Spectrum) -> Result<TailScheme> {
        match (spec.operator(), spec.sector()) {
            (Operator::ScalarLaplacian, Sector::Boson(Twist::Untwisted))
                if spec.manifold() == Manifold::Sphere3 =>
            {
                // lndet' = 3/2 + ζ(3)/(2π²) + Σ_{m≥2} bracket(m).
                Ok(TailScheme {
                    weight: 1,
                    m_start: 2,
                    negate: false,
                    tail_orders: 4,
                    closed: ClosedBasis {
                        constant: Rational64::new(3, 2),
                        zeta3_over_pi2: Rational64::new(1, 2),
                        ..ClosedBasis::ZERO
                    },
                    output: OutputKind::LogDetPrime,
                })
            }
            (Operator::ScalarLaplacian, Sector::Boson(Twist::Twisted)) => {
                // ζ'(0) = -1/2 - 2ζ(3)/π² - Σ_{m≥1} bracket(m), w = 4.
                Ok(TailScheme {
                    weight: 4,
                    m_start: 1,
                    negate: true,
                    tail_orders: 4,
                    closed: ClosedBasis {
                        constant: Rational64::new(-1, 2),
                        zeta3_over_pi2: Rational64::new(-2, 1),
                        ..ClosedBasis::ZERO
                    },
                    output: OutputKind::ZetaPrimeZero,
                })
            }
            _ => Err(SpectralError::UnsupportedConfiguration(format!(
                "no w·m² tail scheme for {}; derive it from the sphere and \
                 twisted sector instead",
                spec
            ))),
        }
    }

    pub fn output(&self) -> OutputKind {
        self.output
    }

    /// Sums the scheme through `n_terms` log terms and assembles the
    /// result at checkpoints N/4, N/2 and N.
    ///
    /// The working precision is widened by roughly 2·log₁₀(N) digits to
    /// absorb the cancellation inside w·m²·ln(1 - 1/(w·m²)) + 1.
    pub fn evaluate(&self, n_terms: u64, ctx: PrecisionCtx) -> Result<TailEvaluation> {
        if n_terms < 16 {
            return Err(SpectralError::DomainError(format!(
                "tail evaluation needs at least 16 terms, got {}",
                n_terms
            )));
        }
        if n_terms > 50_000_000 {
            return Err(SpectralError::DomainError(format!(
                "{} log terms is past the point of diminishing returns",
                n_terms
            )));
        }

        let digits_of_n = (n_terms as f64).log10().ceil() as u32 + 1;
        let work = ctx.widened(2 * digits_of_n + 6);
        let orders = self.tail_orders as usize;

        let closed = self.closed.evaluate(work);
        let zetas: Vec<Real> = (1..=orders)
            .map(|j| special::zeta_even(2 * j as u32, work))
            .collect();
        // Σ_{m < m_start} m^{-2j}, removed from each zeta value.
        let drops: Vec<Real> = (1..=orders)
            .map(|j| {
                let mut d = Real::zero(work);
                for m in 1..self.m_start {
                    d += Real::from_ratio_i64(1, (m as i64).pow(2 * j as u32), work);
                }
                d
            })
            .collect();

        let targets = [n_terms / 4, n_terms / 2, n_terms];
        let mut checkpoints: SmallVec<[(u64, Real); 3]> = SmallVec::new();

        let one = Real::one(work);
        let mut loop_sum = Real::zero(work);
        let mut power_sums: Vec<Real> = vec![Real::zero(work); orders];
        for m in self.m_start..=n_terms {
            let m_i = m as i64;
            let wm2 = self.weight * m_i * m_i;
            let ratio = Real::from_ratio_i64(wm2 - 1, wm2, work);
            loop_sum += special::ln(&ratio).mul_int(wm2) + &one;

            let m2 = m_i * m_i;
            let mut p = Real::from_ratio_i64(1, m2, work);
            for (j, h) in power_sums.iter_mut().enumerate() {
                *h += &p;
                if j + 1 < orders {
                    p = p.div_int(m2);
                }
            }

            if targets.contains(&m) {
                let mut beyond = Real::zero(work);
                for j in 1..=orders {
                    let c_j = Real::from_ratio_i64(
                        1,
                        (j as i64 + 1) * self.weight.pow(j as u32),
                        work,
                    );
                    let remainder = &(&zetas[j - 1] - &drops[j - 1]) - &power_sums[j - 1];
                    beyond -= &c_j * &remainder;
                }
                let series = &loop_sum + &beyond;
                let assembled = if self.negate {
                    &closed - &series
                } else {
                    &closed + &series
                };
                checkpoints.push((m, assembled.with_ctx(ctx)));
            }
        }

        let value = checkpoints[2].1.clone();
        let delta = (&value - &checkpoints[1].1).to_f64().abs();
        debug!(
            "tail scheme (w={}, m0={}) at N={}: delta {:.3e}",
            self.weight, self.m_start, n_terms, delta
        );
        Ok(TailEvaluation {
            value,
            checkpoints,
            delta,
            terms_used: n_terms,
        })
    }
}

/// The six closed forms of ζ'(0) and ln det' on the supported
/// three-spaces.
///
/// Coefficients are exact rationals in the basis {1, ζ(3)/π², ln 2,
/// ln π}; the circle and Dirac values live in [`crate::reference`]
/// because they leave this basis.
pub fn closed_form(spec: &Spectrum) -> Result<(ClosedBasis, OutputKind)> {
    let entry = match (spec.operator(), spec.manifold(), spec.sector()) {
        // ln det' = ln π + ζ(3)/(2π²)
        (Operator::ScalarLaplacian, Manifold::Sphere3, _) => (
            ClosedBasis {
                ln_pi: Rational64::new(1, 1),
                zeta3_over_pi2: Rational64::new(1, 2),
                ..ClosedBasis::ZERO
            },
            OutputKind::LogDetPrime,
        ),
        // ln det' = ln(π/2) + 2ζ(3)/π²
        (Operator::ScalarLaplacian, Manifold::Lens { .. }, Sector::Boson(Twist::Untwisted)) => (
            ClosedBasis {
                ln_pi: Rational64::new(1, 1),
                ln2: Rational64::new(-1, 1),
                zeta3_over_pi2: Rational64::new(2, 1),
                ..ClosedBasis::ZERO
            },
            OutputKind::LogDetPrime,
        ),
        // ζ'(0) = (3/2)ζ(3)/π² - ln 2
        (Operator::ScalarLaplacian, Manifold::Lens { .. }, Sector::Boson(Twist::Twisted)) => (
            ClosedBasis {
                zeta3_over_pi2: Rational64::new(3, 2),
                ln2: Rational64::new(-1, 1),
                ..ClosedBasis::ZERO
            },
            OutputKind::ZetaPrimeZero,
        ),
        // ζ'(0) = 2 ln 2π - ζ(3)/π²
        (Operator::CoexactOneForm, Manifold::Sphere3, _) => (
            ClosedBasis {
                ln2: Rational64::new(2, 1),
                ln_pi: Rational64::new(2, 1),
                zeta3_over_pi2: Rational64::new(-1, 1),
                ..ClosedBasis::ZERO
            },
            OutputKind::ZetaPrimeZero,
        ),
        // ζ'(0) = 2 ln 2 + 3ζ(3)/π²
        (Operator::CoexactOneForm, Manifold::Lens { .. }, Sector::Boson(Twist::Untwisted)) => (
            ClosedBasis {
                ln2: Rational64::new(2, 1),
                zeta3_over_pi2: Rational64::new(3, 1),
                ..ClosedBasis::ZERO
            },
            OutputKind::ZetaPrimeZero,
        ),
        // ζ'(0) = 2 ln π - 4ζ(3)/π²
        (Operator::CoexactOneForm, Manifold::Lens { .. }, Sector::Boson(Twist::Twisted)) => (
            ClosedBasis {
                ln_pi: Rational64::new(2, 1),
                zeta3_over_pi2: Rational64::new(-4, 1),
                ..ClosedBasis::ZERO
            },
            OutputKind::ZetaPrimeZero,
        ),
        _ => {
            return Err(SpectralError::UnsupportedConfiguration(format!(
                "no closed form in the {{1, ζ(3)/π², ln 2, ln π}} basis for {}",
                spec
            )))
        }
    };
    Ok(entry)
}
