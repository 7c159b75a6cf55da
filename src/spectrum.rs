//! Exact spectra of Laplace-type and Dirac operators on the supported
//! compact spaces.
//!
//! # Spectra
//!
//! On the unit round 3-sphere, with n = 0, 1, 2, ...:
//!
//!   scalar Laplacian        λ = n(n+2)        d = (n+1)²
//!   coexact one-form        λ = (n+1)²        d = 2n(n+2)
//!   Dirac (squared)         λ = (2n+3)²/4     d = 2(n+1)(n+2)
//!
//! The lens space L(2,1) = RP³ keeps exactly the levels of the right
//! parity, with the *full* sphere multiplicity on each surviving level:
//!
//!   boson, untwisted sector    even n
//!   boson, twisted sector      odd n
//!   spinor, trivial structure  odd n
//!   spinor, nontrivial         even n
//!
//! so the two sectors of each kind partition the sphere spectrum level by
//! level. On the unit-frequency circle (circumference 2π) the scalar
//! spectrum is λ = n² with d = 2 and one constant mode.
//!
//! Eigenvalues are exact rationals; a [`Spectrum`] hands out its positive
//! modes through an infinite iterator and reports zero modes separately,
//! so every consumer states explicitly whether the kernel participates.
//!
//! # References
//!
//! * Ikeda, Akira and Yamamoto, Yoshihiko (1979), "On the spectra of
//!   3-dimensional lens spaces"
//! * Bär, Christian (1996), "The Dirac operator on space forms of
//!   positive curvature"

use std::fmt;

use num_bigint::BigInt;
use num_rational::BigRational;

use crate::error::{Result, SpectralError};
use crate::precision::{PrecisionCtx, Real};
use crate::special;

/// Which operator's spectrum is being summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Laplace-Beltrami operator on functions.
    ScalarLaplacian,
    /// Laplacian restricted to coexact one-forms (the gauge-field sector).
    CoexactOneForm,
    /// Dirac operator; modes carry the squared eigenvalue (2n+3)²/4.
    Dirac,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::ScalarLaplacian => write!(f, "scalar Laplacian"),
            Operator::CoexactOneForm => write!(f, "coexact one-form Laplacian"),
            Operator::Dirac => write!(f, "Dirac operator"),
        }
    }
}

/// Boson sectors on a lens space: which Z₂ character twists the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Twist {
    Untwisted,
    Twisted,
}

/// Spin structures on L(2,1); the sphere has only the trivial one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinStructure {
    Trivial,
    NonTrivial,
}

/// Sector label: bosonic fields carry a twist, spinors a spin structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sector {
    Boson(Twist),
    Spinor(SpinStructure),
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sector::Boson(Twist::Untwisted) => write!(f, "untwisted sector"),
            Sector::Boson(Twist::Twisted) => write!(f, "twisted sector"),
            Sector::Spinor(SpinStructure::Trivial) => write!(f, "trivial spin structure"),
            Sector::Spinor(SpinStructure::NonTrivial) => {
                write!(f, "nontrivial spin structure")
            }
        }
    }
}

/// The underlying compact space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Manifold {
    /// Unit round S³.
    Sphere3,
    /// Lens space L(p,q) = S³/Z_p. Only L(2,1) = RP³ is constructible.
    Lens { p: u32, q: u32 },
    /// Unit-frequency circle, circumference 2π.
    Circle,
}

impl Manifold {
    pub fn dimension(&self) -> u32 {
        match self {
            Manifold::Sphere3 | Manifold::Lens { .. } => 3,
            Manifold::Circle => 1,
        }
    }

    /// Scalar curvature R of the unit metric.
    pub fn scalar_curvature(&self) -> i64 {
        match self {
            Manifold::Sphere3 | Manifold::Lens { .. } => 6,
            Manifold::Circle => 0,
        }
    }

    /// Riemannian volume: 2π² for S³, 2π²/p for L(p,q), 2π for the circle.
    pub fn volume(&self, ctx: PrecisionCtx) -> Real {
        let p = special::pi(ctx);
        match self {
            Manifold::Sphere3 => (&p * &p).mul_int(2),
            Manifold::Lens { p: order, .. } => {
                (&p * &p).mul_int(2).div_int(i64::from(*order))
            }
            Manifold::Circle => p.mul_int(2),
        }
    }
}

impl fmt::Display for Manifold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Manifold::Sphere3 => write!(f, "S³"),
            Manifold::Lens { p, q } => write!(f, "L({},{})", p, q),
            Manifold::Circle => write!(f, "S¹"),
        }
    }
}

/// One eigenvalue level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mode {
    /// Exact eigenvalue of the (squared, for Dirac) operator.
    pub eigenvalue: BigRational,
    /// Dimension of the eigenspace.
    pub multiplicity: u64,
}

/// Largest raw level the closed forms enumerate. The multiplicities grow
/// like 2n², so past this bound they leave the i64 range the summation
/// weights ride on.
const LEVEL_CAP: u64 = 2_000_000_000;

/// An operator spectrum on one manifold and sector.
///
/// Construction validates the combination; every constructed `Spectrum`
/// can enumerate its positive modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spectrum {
    operator: Operator,
    manifold: Manifold,
    sector: Sector,
}

impl Spectrum {
    /// Any operator on S³. Spheres have one sector per operator kind.
    pub fn on_sphere(operator: Operator) -> Spectrum {
        let sector = match operator {
            Operator::Dirac => Sector::Spinor(SpinStructure::Trivial),
            _ => Sector::Boson(Twist::Untwisted),
        };
        Spectrum {
            operator,
            manifold: Manifold::Sphere3,
            sector,
        }
    }

    /// An operator on the lens space L(p,q) in a given sector.
    ///
    /// Only L(2,1) is supported; bosonic operators must come with a
    /// [`Sector::Boson`] label, the Dirac operator with [`Sector::Spinor`].
    pub fn on_lens(operator: Operator, p: u32, q: u32, sector: Sector) -> Result<Spectrum> {
        if (p, q) != (2, 1) {
            return Err(SpectralError::UnsupportedConfiguration(format!(
                "no spectrum tabulated for L({},{}); only L(2,1) is supported",
                p, q
            )));
        }
        let consistent = matches!(
            (operator, sector),
            (Operator::ScalarLaplacian, Sector::Boson(_))
                | (Operator::CoexactOneForm, Sector::Boson(_))
                | (Operator::Dirac, Sector::Spinor(_))
        );
        if !consistent {
            return Err(SpectralError::DomainError(format!(
                "{} cannot live in the {}",
                operator, sector
            )));
        }
        Ok(Spectrum {
            operator,
            manifold: Manifold::Lens { p, q },
            sector,
        })
    }

    /// The scalar Laplacian on the unit-frequency circle.
    pub fn circle() -> Spectrum {
        Spectrum {
            operator: Operator::ScalarLaplacian,
            manifold: Manifold::Circle,
            sector: Sector::Boson(Twist::Untwisted),
        }
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn manifold(&self) -> Manifold {
        self.manifold
    }

    pub fn sector(&self) -> Sector {
        self.sector
    }

    /// Number of zero modes excluded from [`Spectrum::modes`].
    pub fn zero_modes(&self) -> u64 {
        match (self.operator, self.manifold, self.sector) {
            (Operator::ScalarLaplacian, Manifold::Sphere3, _) => 1,
            (Operator::ScalarLaplacian, Manifold::Circle, _) => 1,
            (Operator::ScalarLaplacian, Manifold::Lens { .. }, Sector::Boson(Twist::Untwisted)) => 1,
            _ => 0,
        }
    }

    /// Abscissa of convergence of Σ d·λ^{-s}: dim/2.
    pub fn convergence_abscissa(&self) -> f64 {
        f64::from(self.manifold.dimension()) / 2.0
    }

    /// Leading Weyl coefficient c in d·λ^{-s} ~ c·(step·k)^{dim-1-2s}.
    pub(crate) fn weyl_coeff(&self) -> u64 {
        match (self.operator, self.manifold) {
            (Operator::ScalarLaplacian, Manifold::Circle) => 2,
            (Operator::ScalarLaplacian, _) => 1,
            _ => 2,
        }
    }

    /// Effective fiber rank scaling the heat-trace Weyl term: 1 for
    /// scalars, 2 for coexact one-forms and for spinors in 3d.
    pub(crate) fn bundle_rank(&self) -> u64 {
        match self.operator {
            Operator::ScalarLaplacian => 1,
            Operator::CoexactOneForm | Operator::Dirac => 2,
        }
    }

    /// Raw level index of the first positive mode.
    fn first_level(&self) -> u64 {
        match (self.operator, self.manifold, self.sector) {
            (Operator::ScalarLaplacian, Manifold::Sphere3, _) => 1,
            (Operator::ScalarLaplacian, Manifold::Circle, _) => 1,
            (Operator::ScalarLaplacian, Manifold::Lens { .. }, Sector::Boson(Twist::Untwisted)) => 2,
            (Operator::ScalarLaplacian, Manifold::Lens { .. }, _) => 1,
            (Operator::CoexactOneForm, Manifold::Lens { .. }, Sector::Boson(Twist::Untwisted)) => 2,
            (Operator::CoexactOneForm, _, _) => 1,
            (Operator::Dirac, Manifold::Sphere3, _) => 0,
            (Operator::Dirac, Manifold::Lens { .. }, Sector::Spinor(SpinStructure::Trivial)) => 1,
            (Operator::Dirac, _, _) => 0,
        }
    }

    /// Gap between consecutive surviving levels (2 on the lens space).
    pub(crate) fn level_step(&self) -> u64 {
        match self.manifold {
            Manifold::Lens { .. } => 2,
            _ => 1,
        }
    }

    /// Raw level index of the k-th positive mode, k ≥ 1.
    pub(crate) fn nth_level(&self, k: u64) -> u64 {
        self.first_level() + self.level_step() * (k - 1)
    }

    /// Largest positive-mode index this spectrum can enumerate.
    pub fn max_mode_index(&self) -> u64 {
        (LEVEL_CAP - self.first_level()) / self.level_step() + 1
    }

    /// Eigenvalue and multiplicity at raw level n.
    fn mode_at_level(&self, n: u64) -> Mode {
        assert!(
            n <= LEVEL_CAP,
            "level {} beyond the tabulated enumeration range",
            n
        );
        match (self.operator, self.manifold) {
            (Operator::ScalarLaplacian, Manifold::Circle) => Mode {
                eigenvalue: BigRational::from_integer(BigInt::from(n) * n),
                multiplicity: 2,
            },
            (Operator::ScalarLaplacian, _) => Mode {
                eigenvalue: BigRational::from_integer(BigInt::from(n) * (n + 2)),
                multiplicity: (n + 1) * (n + 1),
            },
            (Operator::CoexactOneForm, _) => Mode {
                eigenvalue: BigRational::from_integer(BigInt::from(n + 1) * (n + 1)),
                multiplicity: 2 * n * (n + 2),
            },
            (Operator::Dirac, _) => Mode {
                eigenvalue: BigRational::new(
                    BigInt::from(2 * n + 3) * (2 * n + 3),
                    BigInt::from(4u32),
                ),
                multiplicity: 2 * (n + 1) * (n + 2),
            },
        }
    }

    /// The k-th positive mode, k ≥ 1, in O(1).
    ///
    /// # Panics
    ///
    /// Panics if `k == 0`; the kernel is reported by [`Spectrum::zero_modes`].
    pub fn nth_mode(&self, k: u64) -> Mode {
        assert!(k >= 1, "positive modes are indexed from 1");
        self.mode_at_level(self.nth_level(k))
    }

    /// Infinite iterator over the positive modes in increasing order.
    pub fn modes(&self) -> Modes {
        Modes {
            spectrum: *self,
            level: self.first_level(),
        }
    }
}

impl fmt::Display for Spectrum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.manifold {
            Manifold::Lens { .. } => {
                write!(f, "{} on {}, {}", self.operator, self.manifold, self.sector)
            }
            _ => write!(f, "{} on {}", self.operator, self.manifold),
        }
    }
}

/// Iterator handed out by [`Spectrum::modes`]; never returns `None`.
#[derive(Debug, Clone)]
pub struct Modes {
    spectrum: Spectrum,
    level: u64,
}

impl Iterator for Modes {
    type Item = Mode;

    fn next(&mut self) -> Option<Mode> {
        let mode = self.spectrum.mode_at_level(self.level);
        self.level += self.spectrum.level_step();
        Some(mode)
    }
}


// ─── Kani formal verification harnesses ─────────────────────────────────────
//
// The level bookkeeping is pure integer arithmetic, so these proofs run
// fully symbolically: multiplicity positivity for every positive mode
// index, and the parity partition of sphere levels between the two lens
// sectors.
//
#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /// Every positive mode of every bosonic configuration has a nonzero
    /// eigenspace.
    #[kani::proof]
    #[kani::unwind(2)]
    fn positive_modes_have_positive_multiplicity() {
        let k: u64 = kani::any();
        kani::assume(k >= 1 && k <= 1 << 20);

        let sphere_scalar = Spectrum::on_sphere(Operator::ScalarLaplacian);
        let n = sphere_scalar.nth_level(k);
        assert!((n + 1) * (n + 1) > 0);

        let sphere_coexact = Spectrum::on_sphere(Operator::CoexactOneForm);
        let m = sphere_coexact.nth_level(k);
        assert!(2 * m * (m + 2) > 0);
    }

    /// The untwisted sector walks the even levels, the twisted sector the
    /// odd levels, and together they cover every level n ≥ 1 exactly once.
    #[kani::proof]
    #[kani::unwind(2)]
    fn lens_scalar_sectors_partition_levels() {
        let k: u64 = kani::any();
        kani::assume(k >= 1 && k <= 1 << 20);

        let untw = Spectrum {
            operator: Operator::ScalarLaplacian,
            manifold: Manifold::Lens { p: 2, q: 1 },
            sector: Sector::Boson(Twist::Untwisted),
        };
        let tw = Spectrum {
            operator: Operator::ScalarLaplacian,
            manifold: Manifold::Lens { p: 2, q: 1 },
            sector: Sector::Boson(Twist::Twisted),
        };
        assert!(untw.nth_level(k) % 2 == 0);
        assert!(tw.nth_level(k) % 2 == 1);

        // Coverage: any level n >= 1 is hit by exactly one sector.
        let n: u64 = kani::any();
        kani::assume(n >= 1 && n <= 1 << 20);
        if n % 2 == 0 {
            assert_eq!(untw.nth_level(n / 2), n);
        } else {
            assert_eq!(tw.nth_level((n + 1) / 2), n);
        }
    }

    /// Dirac multiplicities are even on every level: the spectrum pairs
    /// ±|λ| eigenspaces of equal dimension.
    #[kani::proof]
    #[kani::unwind(2)]
    fn dirac_multiplicity_splits_in_half() {
        let n: u64 = kani::any();
        kani::assume(n <= 1 << 20);
        let d = 2 * (n + 1) * (n + 2);
        assert_eq!(d % 2, 0);
        assert_eq!(d / 2, (n + 1) * (n + 2));
    }
}
