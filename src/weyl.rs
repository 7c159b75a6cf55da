//! Leading heat-kernel asymptotics from geometry alone.
//!
//! On a closed d-manifold the scalar heat trace has the small-t expansion
//!
//! ```text
//! Tr e^{-tΔ}  ~  (4πt)^{-d/2} (a₀ + a₁ t + a₂ t² + ...)
//! ```
//!
//! with a₀ = Vol(M) and a₁ = (R/6)·Vol(M) for constant scalar curvature
//! R. These coefficients see only the geometry, never the sector: both
//! lens sectors, which differ infinitely in their spectra, share every
//! aₖ of their covering geometry divided by the group order. That
//! blindness is exactly what the heat-trace diagnostics exploit.
//!
//! Reference: Vassilevich, Dmitri (2003), "Heat kernel expansion: user's
//! manual".

use crate::precision::{PrecisionCtx, Real};
use crate::special;
use crate::spectrum::Manifold;

/// The first two Seeley-DeWitt coefficients of a manifold.
#[derive(Debug, Clone)]
pub struct WeylExpansion {
    a0: Real,
    a1: Real,
    dimension: u32,
}

impl WeylExpansion {
    pub fn for_manifold(manifold: Manifold, ctx: PrecisionCtx) -> WeylExpansion {
        let volume = manifold.volume(ctx);
        let a1 = volume.mul_int(manifold.scalar_curvature()).div_int(6);
        WeylExpansion {
            a0: volume,
            a1,
            dimension: manifold.dimension(),
        }
    }

    /// a₀ = Vol(M).
    pub fn a0(&self) -> &Real {
        &self.a0
    }

    /// a₁ = (R/6)·Vol(M).
    pub fn a1(&self) -> &Real {
        &self.a1
    }

    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    /// The leading term a₀/(4πt)^{d/2} of the scalar heat trace.
    ///
    /// # Panics
    ///
    /// Panics if `t` is not positive.
    pub fn leading_trace(&self, t: &Real) -> Real {
        assert!(t.is_positive(), "heat time must be positive");
        let ctx = t.ctx();
        let four_pi_t = special::pi(ctx).mul_int(4) * t;
        // (4πt)^{d/2} for odd d is an integer power times a square root.
        let halves = i64::from(self.dimension / 2);
        let mut denom = four_pi_t.powi(halves);
        if self.dimension % 2 == 1 {
            denom = &denom * &special::sqrt(&four_pi_t);
        }
        &self.a0 / &denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> PrecisionCtx {
        PrecisionCtx::new(30).unwrap()
    }

    #[test]
    fn sphere_coefficients_equal_volume() {
        // R = 6 makes a₁ = Vol for every spherical space form.
        let c = ctx();
        let w = WeylExpansion::for_manifold(Manifold::Sphere3, c);
        assert_eq!(w.a0(), w.a1());
        assert_eq!(w.dimension(), 3);

        let lens = WeylExpansion::for_manifold(Manifold::Lens { p: 2, q: 1 }, c);
        assert_eq!(lens.a0(), lens.a1());
        // Half the sphere volume.
        let tol = c.eps().mul_int(4);
        assert!((&w.a0().div_int(2) - lens.a0()).abs() <= tol);
    }

    #[test]
    fn circle_has_no_curvature_term() {
        let c = ctx();
        let w = WeylExpansion::for_manifold(Manifold::Circle, c);
        assert!(w.a1().is_zero());
        assert_eq!(w.dimension(), 1);
    }

    #[test]
    fn sphere_leading_trace_closed_form() {
        // Vol/(4πt)^{3/2} at t = 1/4 is 2π²/(8π^{3/2}·(1/8)) = 2π²·... ;
        // check against a direct evaluation of √π/(4 t^{3/2}).
        let c = ctx();
        let w = WeylExpansion::for_manifold(Manifold::Sphere3, c);
        let t = Real::from_ratio_i64(1, 4, c);
        let got = w.leading_trace(&t);
        let sqrt_pi = special::sqrt(&special::pi(c));
        // t^{3/2} = 1/8 at t = 1/4.
        let expected = sqrt_pi.mul_int(8).div_int(4);
        assert!((&got - &expected).abs() <= c.eps().mul_int(8));
    }

    #[test]
    fn circle_leading_trace_is_sqrt_pi_over_t() {
        let c = ctx();
        let w = WeylExpansion::for_manifold(Manifold::Circle, c);
        let t = Real::one(c);
        let got = w.leading_trace(&t);
        let expected = special::sqrt(&special::pi(c));
        assert!((&got - &expected).abs() <= c.eps().mul_int(8));
    }

    #[test]
    #[should_panic(expected = "positive")]
    fn leading_trace_rejects_zero_time() {
        let c = ctx();
        let w = WeylExpansion::for_manifold(Manifold::Sphere3, c);
        let _ = w.leading_trace(&Real::zero(c));
    }
}
