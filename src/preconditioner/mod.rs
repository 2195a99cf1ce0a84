//! Preconditioners for linear solvers.
//!
//! This module defines the `Preconditioner` trait and the small set of preconditioners
//! shipped with the crate. Incomplete factorizations, multigrid and domain decomposition
//! are expected to come from the caller through the same trait.

use crate::core::traits::{Categorized, Vector};
use crate::error::KError;

/// A preconditioner M ≈ A⁻¹ with a per-solve lifecycle.
///
/// Every solve calls `pre` once, then `apply` any number of times, then `post` once.
pub trait Preconditioner<X: Vector>: Categorized {
    /// Prepare for a solve with initial guess `x` and right-hand side `b`.
    fn pre(&mut self, _x: &mut X, _b: &mut X) -> Result<(), KError> {
        Ok(())
    }
    /// Compute the update v = M⁻¹ d. On entry `v` is zero.
    fn apply(&mut self, v: &mut X, d: &X) -> Result<(), KError>;
    /// Clean up after the last `apply` of a solve.
    fn post(&mut self, _x: &mut X) -> Result<(), KError> {
        Ok(())
    }
}

impl<X: Vector, P: Preconditioner<X> + ?Sized> Preconditioner<X> for &mut P {
    fn pre(&mut self, x: &mut X, b: &mut X) -> Result<(), KError> {
        (**self).pre(x, b)
    }
    fn apply(&mut self, v: &mut X, d: &X) -> Result<(), KError> {
        (**self).apply(v, d)
    }
    fn post(&mut self, x: &mut X) -> Result<(), KError> {
        (**self).post(x)
    }
}

impl<X: Vector, P: Preconditioner<X> + ?Sized> Preconditioner<X> for Box<P> {
    fn pre(&mut self, x: &mut X, b: &mut X) -> Result<(), KError> {
        (**self).pre(x, b)
    }
    fn apply(&mut self, v: &mut X, d: &X) -> Result<(), KError> {
        (**self).apply(v, d)
    }
    fn post(&mut self, x: &mut X) -> Result<(), KError> {
        (**self).post(x)
    }
}

impl<P: Categorized + ?Sized> Categorized for Box<P> {
    fn category(&self) -> crate::core::traits::SolverCategory {
        (**self).category()
    }
}

pub mod identity;
pub mod inverse;
pub mod jacobi;

pub use identity::{Identity, Richardson};
pub use inverse::InverseOperatorPreconditioner;
pub use jacobi::Jacobi;
