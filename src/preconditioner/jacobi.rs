// Jacobi preconditioner implementation

use crate::core::traits::{Categorized, LinearOperator, Scalar};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use faer::Mat;

/// Damped Jacobi preconditioner: M⁻¹ = ω D⁻¹
pub struct Jacobi<T> {
    pub(crate) inv_diag: Vec<T>,
    pub omega: T,
}

impl<T: Scalar> Jacobi<T> {
    /// Build from an explicit diagonal. Zero entries are skipped (left unscaled at zero).
    pub fn from_diagonal(diag: &[T], omega: T) -> Self {
        let inv_diag = diag
            .iter()
            .map(|&d| if d != T::zero() { T::one() / d } else { T::zero() })
            .collect();
        Self { inv_diag, omega }
    }

    /// Extract the diagonal of a dense faer matrix.
    pub fn from_mat(a: &Mat<T>, omega: T) -> Self {
        let n = a.nrows().min(a.ncols());
        let diag: Vec<T> = (0..n).map(|i| a[(i, i)]).collect();
        Self::from_diagonal(&diag, omega)
    }

    /// Probe the diagonal of a matrix-free operator with unit vectors.
    pub fn from_operator<L>(a: &L, n: usize, omega: T) -> Result<Self, KError>
    where
        L: LinearOperator<Vec<T>> + ?Sized,
    {
        let mut diag = vec![T::zero(); n];
        let mut e = vec![T::zero(); n];
        let mut col = vec![T::zero(); n];
        for i in 0..n {
            e.iter_mut().for_each(|x| *x = T::zero());
            e[i] = T::one();
            a.apply(&e, &mut col)?;
            diag[i] = col[i];
        }
        Ok(Self::from_diagonal(&diag, omega))
    }

    pub fn len(&self) -> usize {
        self.inv_diag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inv_diag.is_empty()
    }
}

impl<T> Categorized for Jacobi<T> {}

impl<T: Scalar> Preconditioner<Vec<T>> for Jacobi<T> {
    fn apply(&mut self, v: &mut Vec<T>, d: &Vec<T>) -> Result<(), KError> {
        if d.len() != self.inv_diag.len() {
            return Err(KError::DimensionMismatch { expected: self.inv_diag.len(), found: d.len() });
        }
        if v.len() != self.inv_diag.len() {
            return Err(KError::DimensionMismatch { expected: self.inv_diag.len(), found: v.len() });
        }
        for ((vi, &di), &inv) in v.iter_mut().zip(d.iter()).zip(self.inv_diag.iter()) {
            *vi = self.omega * inv * di;
        }
        Ok(())
    }
}
