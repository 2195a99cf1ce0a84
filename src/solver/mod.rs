//! Iterative solver interfaces.
//!
//! Every solver is built once from an operator, a preconditioner and a scalar product
//! plus its configuration, and can then be applied to any number of systems. A call to
//! [`LinearSolver::apply`] overwrites `x` with the approximate solution and `b` with a
//! residual-like quantity; callers must not rely on `b` being preserved.

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::time::Instant;

use num_traits::ToPrimitive;

use crate::config::Verbosity;
use crate::core::traits::{check_categories, Categorized, Scalar, Vector};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::utils::convergence::{Convergence, SolveStats};
use crate::utils::monitor::Monitor;

/// Common interface for the iterative solvers.
pub trait LinearSolver<X: Vector> {
    /// Solve A·x = b. `x` holds the initial guess on entry and the solution on exit.
    fn apply(&mut self, x: &mut X, b: &mut X) -> Result<SolveStats<X::Scalar>, KError>;

    fn convergence(&self) -> &Convergence<X::Scalar>;

    fn convergence_mut(&mut self) -> &mut Convergence<X::Scalar>;

    /// Solve with a reduction target that only holds for this call.
    fn apply_with_reduction(
        &mut self,
        x: &mut X,
        b: &mut X,
        reduction: X::Scalar,
    ) -> Result<SolveStats<X::Scalar>, KError>
    where
        Self: Sized,
    {
        let mut guard = ReductionOverride::<X, Self>::new(self, reduction)?;
        LinearSolver::<X>::apply(&mut *guard, x, b)
    }
}

/// Temporarily replaces a solver's reduction target; the configured value is put
/// back on drop, so early returns and unwinding restore it too.
pub struct ReductionOverride<'s, X: Vector, S: LinearSolver<X> + ?Sized> {
    solver: &'s mut S,
    saved: X::Scalar,
    _vector: PhantomData<fn(&X)>,
}

impl<'s, X: Vector, S: LinearSolver<X> + ?Sized> ReductionOverride<'s, X, S> {
    /// Fails with `InvalidConfig`, leaving the solver untouched, unless `reduction ∈ (0, 1]`.
    pub fn new(solver: &'s mut S, reduction: X::Scalar) -> Result<Self, KError> {
        Convergence::check_reduction(reduction)?;
        let saved = std::mem::replace(&mut solver.convergence_mut().reduction, reduction);
        Ok(Self { solver, saved, _vector: PhantomData })
    }
}

impl<'s, X: Vector, S: LinearSolver<X> + ?Sized> Deref for ReductionOverride<'s, X, S> {
    type Target = S;
    fn deref(&self) -> &S {
        self.solver
    }
}

impl<'s, X: Vector, S: LinearSolver<X> + ?Sized> DerefMut for ReductionOverride<'s, X, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.solver
    }
}

impl<'s, X: Vector, S: LinearSolver<X> + ?Sized> Drop for ReductionOverride<'s, X, S> {
    fn drop(&mut self) {
        self.solver.convergence_mut().reduction = self.saved;
    }
}

/// Category check plus tolerance validation shared by all constructors.
pub(crate) fn checked_convergence<T, L, P, S>(
    op: &L,
    prec: &P,
    sp: &S,
    reduction: T,
    max_iters: usize,
) -> Result<Convergence<T>, KError>
where
    T: Scalar,
    L: Categorized,
    P: Categorized,
    S: Categorized,
{
    check_categories(op, prec, sp)?;
    Convergence::new(reduction, max_iters)
}

/// Timer and progress reporter for one `apply` call.
pub(crate) struct Session {
    watch: Instant,
    pub(crate) monitor: Monitor,
}

impl Session {
    pub(crate) fn start(name: &'static str, verbose: Verbosity) -> Self {
        Self { watch: Instant::now(), monitor: Monitor::new(name, verbose) }
    }

    pub(crate) fn elapsed(&self) -> f64 {
        self.watch.elapsed().as_secs_f64()
    }

    /// Initial defect below the floor: finish the preconditioner lifecycle and report
    /// a zero-iteration convergence.
    pub(crate) fn converged_on_entry<X, P>(
        &self,
        prec: &mut P,
        x: &mut X,
    ) -> Result<SolveStats<X::Scalar>, KError>
    where
        X: Vector,
        P: Preconditioner<X>,
    {
        prec.post(x)?;
        let stats = SolveStats::trivially_converged(self.elapsed());
        self.monitor.summary(&stats);
        Ok(stats)
    }

    pub(crate) fn complete<X, P>(
        &self,
        prec: &mut P,
        x: &mut X,
        converged: bool,
        steps: f64,
        def: X::Scalar,
        def0: X::Scalar,
    ) -> Result<SolveStats<X::Scalar>, KError>
    where
        X: Vector,
        P: Preconditioner<X>,
    {
        self.monitor.last(steps, def);
        prec.post(x)?;
        let stats = SolveStats::finish_fractional(converged, steps, def, def0, self.elapsed());
        self.monitor.summary(&stats);
        Ok(stats)
    }

    /// Fatal breakdown: the preconditioner is still torn down before the error is returned.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn breakdown<X, P>(
        &self,
        prec: &mut P,
        x: &mut X,
        solver: &'static str,
        quantity: &'static str,
        value: X::Scalar,
        floor: f64,
        iterations: f64,
    ) -> Result<SolveStats<X::Scalar>, KError>
    where
        X: Vector,
        P: Preconditioner<X>,
    {
        prec.post(x)?;
        let value = value.to_f64().unwrap_or(f64::NAN);
        log::warn!("{solver}: breakdown in {quantity} ({value:e}) after {iterations} iterations");
        Err(KError::Breakdown { solver, quantity, value, floor, iterations })
    }
}

pub mod loop_solver;
pub use loop_solver::LoopSolver;

pub mod gradient;
pub use gradient::GradientSolver;

pub mod cg;
pub use cg::CgSolver;

pub mod bicgstab;
pub use bicgstab::BiCgStabSolver;

pub mod minres;
pub use minres::MinresSolver;

pub mod gmres;
pub use gmres::GmresSolver;

pub mod gpcg;
pub use gpcg::GeneralizedPcgSolver;
