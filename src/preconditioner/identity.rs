// Identity and Richardson preconditioners

use crate::core::traits::{Categorized, Vector};
use crate::error::KError;
use crate::preconditioner::Preconditioner;

/// M⁻¹ = I
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Categorized for Identity {}

impl<X: Vector> Preconditioner<X> for Identity {
    fn apply(&mut self, v: &mut X, d: &X) -> Result<(), KError> {
        v.clone_from(d);
        Ok(())
    }
}

/// Scaled identity: M⁻¹ = ω I
#[derive(Debug, Clone, Copy)]
pub struct Richardson<T> {
    pub omega: T,
}

impl<T> Richardson<T> {
    pub fn new(omega: T) -> Self {
        Self { omega }
    }
}

impl<T> Categorized for Richardson<T> {}

impl<X: Vector> Preconditioner<X> for Richardson<X::Scalar> {
    fn apply(&mut self, v: &mut X, d: &X) -> Result<(), KError> {
        v.set_zero();
        v.axpy(self.omega, d);
        Ok(())
    }
}
