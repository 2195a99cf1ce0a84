//! Generalized preconditioned conjugate gradients.
//!
//! A PCG variant that tolerates a preconditioner whose action changes between
//! applications, such as an inner iterative solve with a loose tolerance. Instead of the
//! two-term CG recurrence, every new direction is explicitly A-orthogonalized against up
//! to `restart` stored directions. When the store is full, the last direction is rolled
//! into the first slot and the cycle starts over, keeping one direction of history.

use num_traits::{Float, One, Zero};

use crate::config::Verbosity;
use crate::core::traits::{Categorized, LinearOperator, Scalar, ScalarProduct, Vector};
use crate::core::wrappers::SeqScalarProduct;
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{checked_convergence, LinearSolver, Session};
use crate::utils::convergence::{Convergence, SolveStats};

/// Stored directions when none is configured.
pub const DEFAULT_RESTART: usize = 10;

pub struct GeneralizedPcgSolver<T, L, P, S = SeqScalarProduct> {
    op: L,
    prec: P,
    sp: S,
    pub conv: Convergence<T>,
    pub verbose: Verbosity,
    /// Number of stored directions. Clamped to `[2, max_iters]` when solving.
    pub restart: usize,
}

impl<T: Scalar, L: Categorized, P: Categorized> GeneralizedPcgSolver<T, L, P> {
    pub fn new(op: L, prec: P, reduction: T, max_iters: usize, verbose: Verbosity) -> Result<Self, KError> {
        Self::with_scalar_product(op, SeqScalarProduct, prec, reduction, max_iters, verbose)
    }
}

impl<T: Scalar, L: Categorized, P: Categorized, S: Categorized> GeneralizedPcgSolver<T, L, P, S> {
    pub fn with_scalar_product(
        op: L,
        sp: S,
        prec: P,
        reduction: T,
        max_iters: usize,
        verbose: Verbosity,
    ) -> Result<Self, KError> {
        let conv = checked_convergence(&op, &prec, &sp, reduction, max_iters)?;
        Ok(Self { op, prec, sp, conv, verbose, restart: DEFAULT_RESTART })
    }

    pub fn with_restart(mut self, restart: usize) -> Self {
        self.restart = restart;
        self
    }

    fn direction_capacity(&self) -> usize {
        let max = self.conv.max_iters;
        if max >= 2 { self.restart.min(max).max(2) } else { 1 }
    }
}

impl<X, L, P, S> LinearSolver<X> for GeneralizedPcgSolver<X::Scalar, L, P, S>
where
    X: Vector,
    L: LinearOperator<X>,
    P: Preconditioner<X>,
    S: ScalarProduct<X>,
{
    fn apply(&mut self, x: &mut X, b: &mut X) -> Result<SolveStats<X::Scalar>, KError> {
        let zero = X::Scalar::zero();
        let one = X::Scalar::one();
        let session = Session::start("GeneralizedPCGSolver", self.verbose);
        self.prec.pre(x, b)?;
        self.op.apply_scale_add(-one, x, b)?;

        let def0 = self.sp.norm(b)?;
        if self.conv.is_negligible(def0) {
            return session.converged_on_entry(&mut self.prec, x);
        }
        session.monitor.header(def0);

        let max = self.conv.max_iters;
        if max == 0 {
            return session.complete(&mut self.prec, x, false, 0.0, def0, def0);
        }

        let restart = self.direction_capacity();
        let mut p: Vec<X> = (0..restart).map(|_| x.zeros_like()).collect();
        let mut pp = vec![zero; restart];
        let mut q = x.zeros_like();
        let mut prec_res = x.zeros_like();

        // first step: preconditioned steepest descent
        self.prec.apply(&mut p[0], b)?;
        let rho = self.sp.dot(&p[0], b)?;
        self.op.apply(&p[0], &mut q)?;
        pp[0] = self.sp.dot(&p[0], &q)?;
        let lambda = rho / pp[0];
        x.axpy(lambda, &p[0]);
        b.axpy(-lambda, &q);

        let mut def = self.sp.norm(b)?;
        let mut i = 1usize;
        session.monitor.iteration(i as f64, def, def0);
        let mut converged = self.conv.is_converged(def, def0);

        while !converged && i < max {
            let end = restart.min(max - i + 1);
            for ii in 1..end {
                prec_res.set_zero();
                self.prec.apply(&mut prec_res, b)?;
                self.op.apply(&prec_res, &mut q)?;

                // A-orthogonalize against the stored directions
                let (stored, rest) = p.split_at_mut(ii);
                let dir = &mut rest[0];
                dir.clone_from(&prec_res);
                for (pj, ppj) in stored.iter().zip(&pp[..ii]) {
                    let coeff = self.sp.dot(&q, pj)? / *ppj;
                    dir.axpy(-coeff, pj);
                }

                self.op.apply(dir, &mut q)?;
                pp[ii] = self.sp.dot(dir, &q)?;
                let lambda = self.sp.dot(dir, b)? / pp[ii];
                x.axpy(lambda, dir);
                b.axpy(-lambda, &q);

                let defnew = self.sp.norm(b)?;
                i += 1;
                session.monitor.iteration(i as f64, defnew, def);
                def = defnew;
                if self.conv.is_converged(def, def0) {
                    converged = true;
                    break;
                }
            }
            if !converged && end == restart {
                p.swap(0, restart - 1);
                pp.swap(0, restart - 1);
            }
        }

        session.complete(&mut self.prec, x, converged, i as f64, def, def0)
    }

    fn convergence(&self) -> &Convergence<X::Scalar> {
        &self.conv
    }

    fn convergence_mut(&mut self) -> &mut Convergence<X::Scalar> {
        &mut self.conv
    }
}
