//! Preconditioned MINRES for symmetric (possibly indefinite) systems.
//!
//! Symmetrically preconditioned Lanczos (Greenbaum, *Iterative Methods for Solving Linear
//! Systems*, p. 121) with an on-the-fly QR factorization of the tridiagonal Lanczos matrix.
//! Only the last three basis vectors and search directions are kept, in ring buffers
//! indexed by the step number modulo 3.
//!
//! The residual norm is never recomputed from A·x. It is read off the rotated
//! least-squares right-hand side and is measured in the M⁻¹-norm. On exit `b` therefore
//! still holds the initial defect.
//!
//! M must be SPD; A only needs to be symmetric.

use num_traits::{Float, One, Zero};

use crate::config::Verbosity;
use crate::core::traits::{Categorized, LinearOperator, Scalar, ScalarProduct, Vector};
use crate::core::wrappers::SeqScalarProduct;
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{checked_convergence, LinearSolver, Session};
use crate::utils::convergence::{Convergence, SolveStats};

pub struct MinresSolver<T, L, P, S = SeqScalarProduct> {
    op: L,
    prec: P,
    sp: S,
    pub conv: Convergence<T>,
    pub verbose: Verbosity,
}

impl<T: Scalar, L: Categorized, P: Categorized> MinresSolver<T, L, P> {
    pub fn new(op: L, prec: P, reduction: T, max_iters: usize, verbose: Verbosity) -> Result<Self, KError> {
        Self::with_scalar_product(op, SeqScalarProduct, prec, reduction, max_iters, verbose)
    }
}

impl<T: Scalar, L: Categorized, P: Categorized, S: Categorized> MinresSolver<T, L, P, S> {
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

/// Mutable slot `dst` together with shared slot `src` of a three-slot ring.
fn slot_pair<X>(ring: &mut [X; 3], dst: usize, src: usize) -> (&mut X, &X) {
    debug_assert_ne!(dst, src);
    if dst < src {
        let (lo, hi) = ring.split_at_mut(src);
        (&mut lo[dst], &hi[0])
    } else {
        let (lo, hi) = ring.split_at_mut(dst);
        (&mut hi[0], &lo[src])
    }
}

/// v ← v / beta, skipped for beta = 0 (the Krylov space is exhausted).
fn normalize<X: Vector>(v: &mut X, beta: X::Scalar) {
    if beta > X::Scalar::zero() {
        v.scale(beta.recip());
    }
}

impl<X, L, P, S> LinearSolver<X> for MinresSolver<X::Scalar, L, P, S>
where
    X: Vector,
    L: LinearOperator<X>,
    P: Preconditioner<X>,
    S: ScalarProduct<X>,
{
    fn apply(&mut self, x: &mut X, b: &mut X) -> Result<SolveStats<X::Scalar>, KError> {
        let zero = X::Scalar::zero();
        let one = X::Scalar::one();
        let session = Session::start("MINRESSolver", self.verbose);

        self.prec.pre(x, b)?;
        self.op.apply_scale_add(-one, x, b)?;
        let def0 = self.sp.norm(b)?;
        if self.conv.is_negligible(def0) {
            return session.converged_on_entry(&mut self.prec, x);
        }
        session.monitor.header(def0);

        let mut def = def0;
        // column k of the tridiagonal matrix, rotated
        let mut tcol = [zero; 3];
        // current and previous Givens rotation
        let mut c = [zero; 2];
        let mut s = [zero; 2];
        // rotated least-squares right-hand side
        let mut xi = [one, zero];

        // z = M⁻¹ b
        let mut z = x.zeros_like();
        self.prec.apply(&mut z, b)?;
        let mut beta = self.sp.dot(&z, b)?.abs().sqrt();
        let beta0 = beta;

        let mut q: [X; 3] = [x.zeros_like(), b.clone(), x.zeros_like()];
        normalize(&mut q[1], beta);
        let mut p: [X; 3] = [x.zeros_like(), x.zeros_like(), x.zeros_like()];
        normalize(&mut z, beta);

        let mut z_old = x.zeros_like();
        let mut converged = false;
        let mut iterations = self.conv.max_iters;
        for i in 1..=self.conv.max_iters {
            z_old.clone_from(&z);
            let i1 = i % 3;
            let i0 = (i1 + 2) % 3;
            let i2 = (i1 + 1) % 3;
            let cur = i % 2;
            let prev = (i + 1) % 2;

            // Lanczos step: q[i2] = A z − β q[i0] − α q[i1]
            self.op.apply(&z, &mut q[i2])?;
            let (qn, qo) = slot_pair(&mut q, i2, i0);
            qn.axpy(-beta, qo);
            let alpha = self.sp.dot(&q[i2], &z)?;
            let (qn, qc) = slot_pair(&mut q, i2, i1);
            qn.axpy(-alpha, qc);

            z.set_zero();
            self.prec.apply(&mut z, &q[i2])?;
            beta = self.sp.dot(&q[i2], &z)?.abs().sqrt();
            normalize(&mut q[i2], beta);
            normalize(&mut z, beta);

            // previous rotations applied to the new column
            tcol[1] = tcol[2];
            if i > 2 {
                tcol[0] = s[cur] * tcol[1];
                tcol[1] = c[cur] * tcol[1];
            }
            if i > 1 {
                tcol[2] = c[prev] * alpha - s[prev] * tcol[1];
                tcol[1] = c[prev] * tcol[1] + s[prev] * alpha;
            } else {
                tcol[2] = alpha;
            }

            // new rotation eliminating β
            c[cur] = (tcol[2] * tcol[2] + beta * beta).sqrt().recip();
            s[cur] = beta * c[cur];
            c[cur] = c[cur] * tcol[2];
            tcol[2] = c[cur] * tcol[2] + s[cur] * beta;

            xi[cur] = -s[cur] * xi[prev];
            xi[prev] = xi[prev] * c[cur];

            // p[i2] = (z_old − t₁ p[i1] − t₀ p[i0]) / t₂
            p[i2].clone_from(&z_old);
            let (pn, pc) = slot_pair(&mut p, i2, i1);
            pn.axpy(-tcol[1], pc);
            let (pn, po) = slot_pair(&mut p, i2, i0);
            pn.axpy(-tcol[0], po);
            p[i2].scale(tcol[2].recip());

            x.axpy(beta0 * xi[prev], &p[i2]);

            // keep β for the next column
            tcol[2] = beta;

            let defnew = (beta0 * xi[cur]).abs();
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
