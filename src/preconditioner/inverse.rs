//! An inner iterative solve used as a preconditioner.
//!
//! With a loose inner tolerance the action of this preconditioner changes from one
//! application to the next, so it is not a fixed linear map. CG loses its short
//! recurrence under such a preconditioner; [`GeneralizedPcgSolver`] is built for it.
//!
//! [`GeneralizedPcgSolver`]: crate::solver::GeneralizedPcgSolver

use crate::core::traits::{Categorized, SolverCategory, Vector};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::LinearSolver;

/// M⁻¹ d ≈ A_inner⁻¹ d, computed by running `solver` from a zero guess.
pub struct InverseOperatorPreconditioner<S> {
    solver: S,
    category: SolverCategory,
    applications: usize,
    inner_iterations: usize,
}

impl<S> InverseOperatorPreconditioner<S> {
    pub fn new(solver: S) -> Self {
        Self {
            solver,
            category: SolverCategory::Sequential,
            applications: 0,
            inner_iterations: 0,
        }
    }

    /// Declare a category other than sequential, for use with distributed collaborators.
    pub fn with_category(mut self, category: SolverCategory) -> Self {
        self.category = category;
        self
    }

    /// Number of inner solves performed so far.
    pub fn applications(&self) -> usize {
        self.applications
    }

    /// Sum of the inner iteration counts.
    pub fn inner_iterations(&self) -> usize {
        self.inner_iterations
    }

    pub fn into_inner(self) -> S {
        self.solver
    }
}

impl<S> Categorized for InverseOperatorPreconditioner<S> {
    fn category(&self) -> SolverCategory {
        self.category
    }
}

impl<X: Vector, S: LinearSolver<X>> Preconditioner<X> for InverseOperatorPreconditioner<S> {
    fn apply(&mut self, v: &mut X, d: &X) -> Result<(), KError> {
        v.set_zero();
        // the inner solver overwrites its right-hand side
        let mut rhs = d.clone();
        let stats = self
            .solver
            .apply(v, &mut rhs)
            .map_err(|e| KError::PreconditionerError(format!("inner solve failed: {e}")))?;
        self.applications += 1;
        self.inner_iterations += stats.iterations;
        log::debug!(
            "inverse-operator preconditioner: inner solve {} took {} iterations",
            self.applications,
            stats.iterations
        );
        Ok(())
    }
}
