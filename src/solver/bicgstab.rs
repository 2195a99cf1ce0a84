//! BiCGStab solver (Saad §7.1), right-preconditioned.
//!
//! Each outer iteration is two half steps, each followed by a convergence test, so the
//! internal counter advances by 0.5. The reported iteration count is rounded up.
//!
//! Breakdown of ρ, ω or ⟨r̃, v⟩ below [`BREAKDOWN_FLOOR`] aborts the solve with
//! [`KError::Breakdown`]; nothing is retried.

use num_traits::{Float, One, Zero};

use crate::config::Verbosity;
use crate::core::traits::{Categorized, LinearOperator, Scalar, ScalarProduct, Vector};
use crate::core::wrappers::SeqScalarProduct;
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{checked_convergence, LinearSolver, Session};
use crate::utils::convergence::{Convergence, SolveStats};

pub const BREAKDOWN_FLOOR: f64 = 1e-80;

const NAME: &str = "BiCGSTABSolver";

pub struct BiCgStabSolver<T, L, P, S = SeqScalarProduct> {
    op: L,
    prec: P,
    sp: S,
    pub conv: Convergence<T>,
    pub verbose: Verbosity,
}

impl<T: Scalar, L: Categorized, P: Categorized> BiCgStabSolver<T, L, P> {
    pub fn new(op: L, prec: P, reduction: T, max_iters: usize, verbose: Verbosity) -> Result<Self, KError> {
        Self::with_scalar_product(op, SeqScalarProduct, prec, reduction, max_iters, verbose)
    }
}

impl<T: Scalar, L: Categorized, P: Categorized, S: Categorized> BiCgStabSolver<T, L, P, S> {
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

impl<X, L, P, S> LinearSolver<X> for BiCgStabSolver<X::Scalar, L, P, S>
where
    X: Vector,
    L: LinearOperator<X>,
    P: Preconditioner<X>,
    S: ScalarProduct<X>,
{
    fn apply(&mut self, x: &mut X, b: &mut X) -> Result<SolveStats<X::Scalar>, KError> {
        let one = X::Scalar::one();
        let eps = X::Scalar::from_const(BREAKDOWN_FLOOR);
        let session = Session::start(NAME, self.verbose);

        self.prec.pre(x, b)?;
        // r = b − A x, kept in b; rt is the fixed shadow residual
        self.op.apply_scale_add(-one, x, b)?;
        let r = b;
        let rt = r.clone();
        let mut p = x.zeros_like();
        let mut v = x.zeros_like();
        let mut t = x.zeros_like();
        let mut y = x.zeros_like();

        let norm_0 = self.sp.norm(r)?;
        if self.conv.is_negligible(norm_0) {
            return session.converged_on_entry(&mut self.prec, x);
        }
        session.monitor.header(norm_0);

        let mut norm = norm_0;
        let mut norm_old = norm_0;
        let mut rho = one;
        let mut alpha = one;
        let mut omega = one;
        let mut converged = false;

        let max = self.conv.max_iters as f64;
        let mut it = 0.5;
        while it < max {
            let rho_new = self.sp.dot(&rt, r)?;

            if rho.abs() <= eps {
                return session.breakdown(&mut self.prec, x, NAME, "rho", rho, BREAKDOWN_FLOOR, it);
            }
            if omega.abs() <= eps {
                return session.breakdown(&mut self.prec, x, NAME, "omega", omega, BREAKDOWN_FLOOR, it);
            }

            if it < 1.0 {
                p.clone_from(r);
            } else {
                // p = r + β (p − ω v)
                let beta = (rho_new / rho) * (alpha / omega);
                p.axpy(-omega, &v);
                p.scale(beta);
                p.axpy(one, r);
            }

            // y = M⁻¹ p, v = A y
            y.set_zero();
            self.prec.apply(&mut y, &p)?;
            self.op.apply(&y, &mut v)?;

            let h = self.sp.dot(&rt, &v)?;
            if h.abs() <= eps {
                return session.breakdown(&mut self.prec, x, NAME, "<rt,v>", h, BREAKDOWN_FLOOR, it);
            }
            alpha = rho_new / h;

            // first correction
            x.axpy(alpha, &y);
            r.axpy(-alpha, &v);

            norm = self.sp.norm(r)?;
            session.monitor.iteration(it, norm, norm_old);
            if self.conv.is_converged(norm, norm_0) {
                converged = true;
                break;
            }
            it += 0.5;
            norm_old = norm;

            // y = M⁻¹ r, t = A y
            y.set_zero();
            self.prec.apply(&mut y, r)?;
            self.op.apply(&y, &mut t)?;

            omega = self.sp.dot(&t, r)? / self.sp.dot(&t, &t)?;

            // second correction
            x.axpy(omega, &y);
            r.axpy(-omega, &t);
            rho = rho_new;

            norm = self.sp.norm(r)?;
            session.monitor.iteration(it, norm, norm_old);
            if self.conv.is_converged(norm, norm_0) {
                converged = true;
                break;
            }
            norm_old = norm;
            it += 0.5;
        }

        let it = it.min(max);
        session.complete(&mut self.prec, x, converged, it, norm, norm_0)
    }

    fn convergence(&self) -> &Convergence<X::Scalar> {
        &self.conv
    }

    fn convergence_mut(&mut self) -> &mut Convergence<X::Scalar> {
        &mut self.conv
    }
}
