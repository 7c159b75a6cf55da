//! Error types for spectral computations.
//!
//! Every fallible operation in this crate returns [`SpectralError`]. The
//! variants separate three failure modes that callers handle differently:
//! a configuration nobody has a spectrum or closed form for
//! ([`SpectralError::UnsupportedConfiguration`]), arguments outside the
//! mathematical domain of an operation ([`SpectralError::DomainError`]),
//! and an adaptive sum that hit its term cap before reaching the requested
//! accuracy ([`SpectralError::NonConvergence`]).

use std::fmt;

/// Errors produced by spectral sums, tail corrections and tower summations.
#[derive(Debug, Clone, PartialEq)]
pub enum SpectralError {
    /// The operator/manifold/sector combination is not covered by any
    /// implemented spectrum or closed form.
    UnsupportedConfiguration(String),
    /// An argument lies outside the domain of the operation: non-positive
    /// heat time, an exponent at or below the convergence abscissa, a
    /// malformed decimal literal, and so on.
    DomainError(String),
    /// An adaptive summation exhausted its term budget before its error
    /// bound dropped below the context epsilon.
    NonConvergence {
        /// Which summation gave up, with the budget it was given.
        detail: String,
        /// The error bound reached when the cap was hit.
        achieved_delta: f64,
    },
}

impl fmt::Display for SpectralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpectralError::UnsupportedConfiguration(msg) => {
                write!(f, "unsupported configuration: {}", msg)
            }
            SpectralError::DomainError(msg) => {
                write!(f, "domain error: {}", msg)
            }
            SpectralError::NonConvergence {
                detail,
                achieved_delta,
            } => {
                write!(
                    f,
                    "did not converge: {} (best error bound {:.3e})",
                    detail, achieved_delta
                )
            }
        }
    }
}

impl std::error::Error for SpectralError {}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SpectralError>;
