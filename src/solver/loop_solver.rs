//! Preconditioned fixed-point iteration (Richardson loop).
//!
//! Turns any preconditioner into a solver: each step applies M⁻¹ to the current
//! defect and adds the result to the iterate.

use num_traits::{Float, One, Zero};

use crate::config::Verbosity;
use crate::core::traits::{Categorized, LinearOperator, Scalar, ScalarProduct, Vector};
use crate::core::wrappers::SeqScalarProduct;
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{checked_convergence, LinearSolver, Session};
use crate::utils::convergence::{Convergence, SolveStats};

pub struct LoopSolver<T, L, P, S = SeqScalarProduct> {
    op: L,
    prec: P,
    sp: S,
    pub conv: Convergence<T>,
    pub verbose: Verbosity,
}

impl<T: Scalar, L: Categorized, P: Categorized> LoopSolver<T, L, P> {
    pub fn new(op: L, prec: P, reduction: T, max_iters: usize, verbose: Verbosity) -> Result<Self, KError> {
        Self::with_scalar_product(op, SeqScalarProduct, prec, reduction, max_iters, verbose)
    }
}

impl<T: Scalar, L: Categorized, P: Categorized, S: Categorized> LoopSolver<T, L, P, S> {
    pub fn with_scalar_product(
        op: L,
        sp: S,
        prec: P,
        reduction: T,
        max_iters: usize,
        verbose: Verbosity,
    ) -> Result<Self, KError> {
        let conv = checked_convergence(&op, &prec, &sp, reduction, max_iters)?;
        Ok(Self { op, prec, sp, conv, verbose })
    }
}

impl<X, L, P, S> LinearSolver<X> for LoopSolver<X::Scalar, L, P, S>
where
    X: Vector,
    L: LinearOperator<X>,
    P: Preconditioner<X>,
    S: ScalarProduct<X>,
{
    fn apply(&mut self, x: &mut X, b: &mut X) -> Result<SolveStats<X::Scalar>, KError> {
        let one = X::Scalar::one();
        let session = Session::start("LoopSolver", self.verbose);
        self.prec.pre(x, b)?;
        // b ← b − A x
        self.op.apply_scale_add(-one, x, b)?;
        let def0 = self.sp.norm(b)?;
        if self.conv.is_negligible(def0) {
            return session.converged_on_entry(&mut self.prec, x);
        }
        session.monitor.header(def0);

        let mut v = x.zeros_like();
        let mut def = def0;
        let mut converged = false;
        let mut iterations = self.conv.max_iters;
        for i in 1..=self.conv.max_iters {
            v.set_zero();
            self.prec.apply(&mut v, b)?;
            x.axpy(one, &v);
            self.op.apply_scale_add(-one, &v, b)?;
            let defnew = self.sp.norm(b)?;
            session.monitor.iteration(i as f64, defnew, def);
            def = defnew;
            if self.conv.is_converged(def, def0) {
                converged = true;
                iterations = i;
                break;
            }
        }
        session.complete(&mut self.prec, x, converged, iterations as f64, def, def0)
    }

    fn convergence(&self) -> &Convergence<X::Scalar> {
        &self.conv
    }

    fn convergence_mut(&mut self) -> &mut Convergence<X::Scalar> {
        &mut self.conv
    }
}
