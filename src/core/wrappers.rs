//! Wrappers for faer dense matrix types and vector operations.
//!
//! This module implements the core traits for `Vec<T>` and `faer::Mat<T>`, so that
//! plain vectors and dense faer matrices can be handed to any solver directly. It also
//! provides [`SeqScalarProduct`], the default sequential inner product.
//!
//! # Features
//! - `Vector` for `Vec<T>`, with Rayon-parallel reductions when the `rayon` feature is on.
//! - `LinearOperator` for `faer::Mat<T>` and `faer::MatRef<T>`.
//! - `SeqScalarProduct`, forwarding to the vector's own dot product.
//!
//! # References
//! - [faer crate documentation](https://docs.rs/faer)
//! - [num-traits crate documentation](https://docs.rs/num-traits)

use crate::core::traits::{Categorized, LinearOperator, Scalar, ScalarProduct, Vector};
use crate::error::KError;
use faer::{Mat, MatRef};

impl<T: Scalar> Vector for Vec<T> {
    type Scalar = T;

    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn set_zero(&mut self) {
        self.iter_mut().for_each(|xi| *xi = T::zero());
    }

    fn axpy(&mut self, alpha: T, y: &Self) {
        assert_eq!(self.as_slice().len(), y.len(), "Vectors must have the same length");
        for (xi, &yi) in self.iter_mut().zip(y.iter()) {
            *xi = *xi + alpha * yi;
        }
    }

    fn scale(&mut self, alpha: T) {
        self.iter_mut().for_each(|xi| *xi = *xi * alpha);
    }

    /// Computes the dot product of two vectors: `x^T y`.
    fn dot(&self, y: &Self) -> T {
        assert_eq!(self.as_slice().len(), y.len(), "Vectors must have the same length");
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            self.as_slice()
                .par_iter()
                .zip(y.as_slice().par_iter())
                .map(|(xi, yi)| *xi * *yi)
                .reduce(|| T::zero(), |acc, v| acc + v)
        }
        #[cfg(not(feature = "rayon"))]
        {
            self.iter()
                .zip(y.iter())
                .map(|(xi, yi)| *xi * *yi)
                .fold(T::zero(), |acc, v| acc + v)
        }
    }

    /// Computes the Euclidean norm of a vector: `||x||_2`.
    fn two_norm(&self) -> T {
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            self.as_slice()
                .par_iter()
                .map(|xi| *xi * *xi)
                .reduce(|| T::zero(), |acc, v| acc + v)
                .sqrt()
        }
        #[cfg(not(feature = "rayon"))]
        {
            self.iter()
                .map(|xi| *xi * *xi)
                .fold(T::zero(), |acc, v| acc + v)
                .sqrt()
        }
    }
}

fn dense_apply<T: Scalar>(
    a: MatRef<'_, T>,
    alpha: T,
    x: &[T],
    y: &mut [T],
    accumulate: bool,
) -> Result<(), KError> {
    if a.ncols() != x.len() {
        return Err(KError::DimensionMismatch { expected: a.ncols(), found: x.len() });
    }
    if a.nrows() != y.len() {
        return Err(KError::DimensionMismatch { expected: a.nrows(), found: y.len() });
    }
    for i in 0..a.nrows() {
        let mut acc = T::zero();
        for j in 0..a.ncols() {
            acc = acc + a[(i, j)] * x[j];
        }
        y[i] = if accumulate { y[i] + alpha * acc } else { acc };
    }
    Ok(())
}

impl<T> Categorized for Mat<T> {}

impl<'a, T> Categorized for MatRef<'a, T> {}

/// Dense matrix-vector product for `faer::Mat`: `y = A * x`.
impl<T: Scalar> LinearOperator<Vec<T>> for Mat<T> {
    fn apply(&self, x: &Vec<T>, y: &mut Vec<T>) -> Result<(), KError> {
        dense_apply(self.as_ref(), T::one(), x, y, false)
    }

    fn apply_scale_add(&self, alpha: T, x: &Vec<T>, y: &mut Vec<T>) -> Result<(), KError> {
        dense_apply(self.as_ref(), alpha, x, y, true)
    }
}

/// Same as for `Mat`, on a borrowed view.
impl<'a, T: Scalar> LinearOperator<Vec<T>> for MatRef<'a, T> {
    fn apply(&self, x: &Vec<T>, y: &mut Vec<T>) -> Result<(), KError> {
        dense_apply(*self, T::one(), x, y, false)
    }

    fn apply_scale_add(&self, alpha: T, x: &Vec<T>, y: &mut Vec<T>) -> Result<(), KError> {
        dense_apply(*self, alpha, x, y, true)
    }
}

/// Default scalar product for sequential data: the vector's Euclidean dot product.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeqScalarProduct;

impl Categorized for SeqScalarProduct {}

impl<X: Vector> ScalarProduct<X> for SeqScalarProduct {
    fn dot(&self, x: &X, y: &X) -> Result<X::Scalar, KError> {
        Ok(x.dot(y))
    }

    fn norm(&self, x: &X) -> Result<X::Scalar, KError> {
        Ok(x.two_norm())
    }
}
