//! Core linear-algebra traits for krylon.
//!
//! The solvers never look inside a vector or an operator. Everything they need
//! is expressed through the traits below, so concrete storage, sparse formats
//! and any parallel reduction stay on the implementor's side.

use std::fmt::{Debug, Display, LowerExp};

use num_traits::{Float, FromPrimitive};

use crate::error::KError;

/// Field type the solvers compute with.
pub trait Scalar:
    Float + FromPrimitive + Debug + Display + LowerExp + Send + Sync + 'static
{
    /// Converts a constant, falling back to zero when it is not representable.
    fn from_const(v: f64) -> Self {
        Self::from_f64(v).unwrap_or_else(Self::zero)
    }
}

impl<T> Scalar for T where
    T: Float + FromPrimitive + Debug + Display + LowerExp + Send + Sync + 'static
{
}

/// Minimal vector interface: zeroing, scaled accumulation, scaling.
pub trait Vector: Clone {
    type Scalar: Scalar;

    /// Number of entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// self ← 0
    fn set_zero(&mut self);

    /// self ← self + alpha · y
    fn axpy(&mut self, alpha: Self::Scalar, y: &Self);

    /// self ← alpha · self
    fn scale(&mut self, alpha: Self::Scalar);

    /// Euclidean dot product xᵀy.
    fn dot(&self, y: &Self) -> Self::Scalar;

    /// ‖self‖₂
    fn two_norm(&self) -> Self::Scalar {
        self.dot(self).abs().sqrt()
    }

    /// A zero vector conformant with `self`.
    fn zeros_like(&self) -> Self {
        let mut v = self.clone();
        v.set_zero();
        v
    }
}

/// Whether an operator, preconditioner or scalar product works on local data
/// or on data distributed over several processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverCategory {
    /// Purely local data.
    Sequential,
    /// Distributed data with overlapping index sets.
    Overlapping,
    /// Distributed data without overlap.
    Nonoverlapping,
}

/// Declares the category of a collaborator. Defaults to sequential.
pub trait Categorized {
    fn category(&self) -> SolverCategory {
        SolverCategory::Sequential
    }
}

impl<C: Categorized + ?Sized> Categorized for &C {
    fn category(&self) -> SolverCategory {
        (**self).category()
    }
}

impl<C: Categorized + ?Sized> Categorized for &mut C {
    fn category(&self) -> SolverCategory {
        (**self).category()
    }
}

/// A linear map A: X → X.
pub trait LinearOperator<X: Vector>: Categorized {
    /// y ← A x
    fn apply(&self, x: &X, y: &mut X) -> Result<(), KError>;

    /// y ← y + alpha · A x
    fn apply_scale_add(&self, alpha: X::Scalar, x: &X, y: &mut X) -> Result<(), KError> {
        let mut ax = y.zeros_like();
        self.apply(x, &mut ax)?;
        y.axpy(alpha, &ax);
        Ok(())
    }
}

/// Inner products & norms.
pub trait ScalarProduct<X: Vector>: Categorized {
    /// Compute dot(x, y).
    fn dot(&self, x: &X, y: &X) -> Result<X::Scalar, KError>;
    /// Compute the norm induced by `dot`.
    fn norm(&self, x: &X) -> Result<X::Scalar, KError> {
        Ok(self.dot(x, x)?.abs().sqrt())
    }
}

impl<X: Vector, L: LinearOperator<X> + ?Sized> LinearOperator<X> for &L {
    fn apply(&self, x: &X, y: &mut X) -> Result<(), KError> {
        (**self).apply(x, y)
    }
    fn apply_scale_add(&self, alpha: X::Scalar, x: &X, y: &mut X) -> Result<(), KError> {
        (**self).apply_scale_add(alpha, x, y)
    }
}

impl<X: Vector, S: ScalarProduct<X> + ?Sized> ScalarProduct<X> for &S {
    fn dot(&self, x: &X, y: &X) -> Result<X::Scalar, KError> {
        (**self).dot(x, y)
    }
    fn norm(&self, x: &X) -> Result<X::Scalar, KError> {
        (**self).norm(x)
    }
}

/// Checks that operator, preconditioner and scalar product share one category.
pub fn check_categories<L, P, S>(op: &L, prec: &P, sp: &S) -> Result<(), KError>
where
    L: Categorized + ?Sized,
    P: Categorized + ?Sized,
    S: Categorized + ?Sized,
{
    let left = op.category();
    for right in [prec.category(), sp.category()] {
        if left != right {
            return Err(KError::CategoryMismatch { left, right });
        }
    }
    Ok(())
}
