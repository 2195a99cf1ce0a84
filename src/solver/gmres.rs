//! Restarted Generalized Minimal Residual (GMRES(m)) solver (Saad §6.5)
//!
//! This module implements left-preconditioned GMRES with a fixed restart length `m` for
//! nonsymmetric systems A x = b. The Krylov basis of M⁻¹A is built by modified
//! Gram-Schmidt, the Hessenberg matrix is kept upper-triangular by Givens rotations, and
//! the least-squares coefficients are recovered by back-substitution at the end of each
//! cycle.
//!
//! # Features
//! - Preconditioned residual ‖M⁻¹(b − A x)‖ drives convergence.
//! - The per-step residual estimate is read off the rotated right-hand side; the true
//!   residual is only formed between cycles.
//! - Optional *recalc-defect* mode: the reference norm is ‖M⁻¹ b‖ and the residual is
//!   recomputed from scratch after every cycle, leaving `b` untouched.
//! - An exactly vanishing new basis vector is reported as [`KError::Breakdown`].
//!
//! # Lucky breakdown
//! The zero-norm check runs before the cycle's correction is added to `x`. When the
//! Krylov space captures the exact solution in fewer steps than the restart length
//! (for instance `A = c·I`, or a right-hand side that is an eigenvector of M⁻¹A), the
//! solve fails with `Breakdown` on `"|w|"` and `x` keeps the value it had at the start of
//! that cycle. Callers solving such trivially structured systems should expect this.
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems, 2nd Edition. SIAM. §6.5
//! - https://en.wikipedia.org/wiki/Generalized_minimal_residual_method

use num_traits::{Float, One, Zero};

use crate::config::Verbosity;
use crate::core::traits::{Categorized, LinearOperator, Scalar, ScalarProduct, Vector};
use crate::core::wrappers::SeqScalarProduct;
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{checked_convergence, LinearSolver, Session};
use crate::utils::convergence::{Convergence, SolveStats};

const NAME: &str = "RestartedGMResSolver";

/// GMRES solver with restart and residual-recomputation options.
///
/// # Type Parameters
/// * `T` - Scalar type (e.g., f32, f64)
/// * `L`, `P`, `S` - operator, preconditioner and scalar product
pub struct GmresSolver<T, L, P, S = SeqScalarProduct> {
    op: L,
    prec: P,
    sp: S,
    /// Number of Arnoldi vectors before restart
    pub restart: usize,
    /// Recompute M⁻¹(b − A x) after each cycle instead of updating `b`
    pub recalc_defect: bool,
    /// Convergence criteria (reduction and max iterations)
    pub conv: Convergence<T>,
    pub verbose: Verbosity,
}

impl<T: Scalar, L: Categorized, P: Categorized> GmresSolver<T, L, P> {
    /// Create a new GMRES solver with the sequential scalar product.
    pub fn new(
        op: L,
        prec: P,
        reduction: T,
        restart: usize,
        max_iters: usize,
        verbose: Verbosity,
    ) -> Result<Self, KError> {
        Self::with_scalar_product(op, SeqScalarProduct, prec, reduction, restart, max_iters, verbose)
    }
}

impl<T: Scalar, L: Categorized, P: Categorized, S: Categorized> GmresSolver<T, L, P, S> {
    /// Create a new GMRES solver; fails on a category mismatch, an invalid reduction or
    /// a restart length of zero.
    pub fn with_scalar_product(
        op: L,
        sp: S,
        prec: P,
        reduction: T,
        restart: usize,
        max_iters: usize,
        verbose: Verbosity,
    ) -> Result<Self, KError> {
        if restart == 0 {
            return Err(KError::InvalidConfig("GMRES restart length must be positive".into()));
        }
        let conv = checked_convergence(&op, &prec, &sp, reduction, max_iters)?;
        Ok(Self { op, prec, sp, restart, recalc_defect: false, conv, verbose })
    }

    /// Enable or disable residual recomputation between cycles.
    pub fn with_recalc_defect(mut self, recalc_defect: bool) -> Self {
        self.recalc_defect = recalc_defect;
        self
    }
}

/// Givens rotation (cs, sn) annihilating `dy` against `dx`, in ratio form so that
/// neither square can overflow.
pub(crate) fn generate_plane_rotation<T: Float>(dx: T, dy: T) -> (T, T) {
    if dy == T::zero() {
        (T::one(), T::zero())
    } else if dy.abs() > dx.abs() {
        let temp = dx / dy;
        let sn = (T::one() + temp * temp).sqrt().recip();
        (temp * sn, sn)
    } else {
        let temp = dy / dx;
        let cs = (T::one() + temp * temp).sqrt().recip();
        (cs, temp * cs)
    }
}

/// Applies the rotation (cs, sn) to the pair (dx, dy).
pub(crate) fn apply_plane_rotation<T: Float>(dx: T, dy: T, cs: T, sn: T) -> (T, T) {
    (cs * dx + sn * dy, -sn * dx + cs * dy)
}

/// x ← x + Σ yⱼ vⱼ, where y solves the leading `steps`×`steps` upper-triangular system H y = s.
fn update<X: Vector>(x: &mut X, steps: usize, h: &[Vec<X::Scalar>], s: &[X::Scalar], v: &[X]) {
    let mut y = s[..steps].to_vec();
    for i in (0..steps).rev() {
        y[i] = y[i] / h[i][i];
        for j in 0..i {
            y[j] = y[j] - h[j][i] * y[i];
        }
    }
    for (yj, vj) in y.iter().zip(v) {
        x.axpy(*yj, vj);
    }
}

impl<X, L, P, S> LinearSolver<X> for GmresSolver<X::Scalar, L, P, S>
where
    X: Vector,
    L: LinearOperator<X>,
    P: Preconditioner<X>,
    S: ScalarProduct<X>,
{
    fn apply(&mut self, x: &mut X, b: &mut X) -> Result<SolveStats<X::Scalar>, KError> {
        let zero = X::Scalar::zero();
        let one = X::Scalar::one();
        let m = self.restart;
        let max = self.conv.max_iters;
        let session = Session::start(NAME, self.verbose);

        // Krylov basis, Hessenberg matrix, rotated rhs and rotations
        let mut v: Vec<X> = (0..=m).map(|_| b.zeros_like()).collect();
        let mut h = vec![vec![zero; m]; m + 1];
        let mut s = vec![zero; m + 1];
        let mut cs = vec![zero; m];
        let mut sn = vec![zero; m];
        let mut w = b.zeros_like();

        self.prec.pre(x, b)?;
        let rhs_norm = if self.recalc_defect {
            // reference: ‖M⁻¹ b‖; residual lives in w, b stays intact
            self.prec.apply(&mut w, b)?;
            let n = self.sp.norm(&w)?;
            w.clone_from(b);
            self.op.apply_scale_add(-one, x, &mut w)?;
            self.prec.apply(&mut v[0], &w)?;
            Some(n)
        } else {
            self.op.apply_scale_add(-one, x, b)?;
            self.prec.apply(&mut v[0], b)?;
            None
        };
        let mut beta = self.sp.norm(&v[0])?;
        let mut norm_0 = rhs_norm.unwrap_or(beta);
        if self.conv.is_negligible(beta) {
            return session.converged_on_entry(&mut self.prec, x);
        }
        if norm_0 == zero {
            norm_0 = one;
        }
        session.monitor.header(norm_0);

        let mut norm = beta;
        let mut norm_old = beta;
        let mut steps = 0usize;
        let mut converged = false;

        while steps < max && !converged {
            v[0].scale(beta.recip());
            s.iter_mut().for_each(|si| *si = zero);
            s[0] = beta;

            let mut i = 0;
            while i < m && steps < max && !converged {
                steps += 1;

                // w = M⁻¹ A v[i], using v[i+1] as scratch
                {
                    let (head, tail) = v.split_at_mut(i + 1);
                    self.op.apply(&head[i], &mut tail[0])?;
                    w.set_zero();
                    self.prec.apply(&mut w, &tail[0])?;
                }

                // modified Gram-Schmidt
                for k in 0..=i {
                    h[k][i] = self.sp.dot(&w, &v[k])?;
                    w.axpy(-h[k][i], &v[k]);
                }
                h[i + 1][i] = self.sp.norm(&w)?;
                if h[i + 1][i] == zero {
                    return session.breakdown(&mut self.prec, x, NAME, "|w|", h[i + 1][i], 0.0, steps as f64);
                }
                v[i + 1].clone_from(&w);
                v[i + 1].scale(h[i + 1][i].recip());

                // previous rotations on the new column, then a fresh one
                for k in 0..i {
                    (h[k][i], h[k + 1][i]) = apply_plane_rotation(h[k][i], h[k + 1][i], cs[k], sn[k]);
                }
                (cs[i], sn[i]) = generate_plane_rotation(h[i][i], h[i + 1][i]);
                (h[i][i], h[i + 1][i]) = apply_plane_rotation(h[i][i], h[i + 1][i], cs[i], sn[i]);
                (s[i], s[i + 1]) = apply_plane_rotation(s[i], s[i + 1], cs[i], sn[i]);

                norm = s[i + 1].abs();
                session.monitor.iteration(steps as f64, norm, norm_old);
                norm_old = norm;
                converged = self.conv.is_converged(norm, norm_0);
                i += 1;
            }

            if self.recalc_defect {
                update(x, i, &h, &s, &v);
                w.clone_from(b);
                self.op.apply_scale_add(-one, x, &mut w)?;
                v[0].set_zero();
                self.prec.apply(&mut v[0], &w)?;
                beta = self.sp.norm(&v[0])?;
                norm = beta;
                converged = converged || self.conv.is_converged(norm, norm_0);
            } else {
                w.set_zero();
                update(&mut w, i, &h, &s, &v);
                x.axpy(one, &w);
                self.op.apply_scale_add(-one, &w, b)?;
                v[0].set_zero();
                self.prec.apply(&mut v[0], b)?;
                beta = self.sp.norm(&v[0])?;
                norm = beta;
                // the estimate is discarded in favour of the true preconditioned defect
                converged = self.conv.is_converged(norm, norm_0);
            }

            session.monitor.iteration(steps as f64, norm, norm_old);
            norm_old = norm;

            if !converged && steps < max {
                session.monitor.restart();
            }
        }

        session.complete(&mut self.prec, x, converged, steps as f64, norm, norm_0)
    }

    fn convergence(&self) -> &Convergence<X::Scalar> {
        &self.conv
    }

    fn convergence_mut(&mut self) -> &mut Convergence<X::Scalar> {
        &mut self.conv
    }
}
