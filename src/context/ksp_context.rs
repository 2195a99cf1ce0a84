//! Factory for Krylov Subspace Methods (KSP).
//!
//! This module provides the `KspContext` struct, which selects one of the crate's
//! iterative solvers by kind, carries a validated [`SolverOptions`] and builds the solver
//! around a caller-supplied operator, preconditioner and scalar product for one solve.
//!
//! # Usage
//!
//! 1. Construct a `KspContext` with the desired solver kind and options.
//! 2. Call `solve` (sequential inner product) or `solve_with_scalar_product`.
//!
//! # Supported Solvers
//! - Loop (preconditioned Richardson), Gradient, CG, BiCGStab, MINRES, restarted GMRES,
//!   generalized PCG
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems. SIAM.
//! - PETSc documentation: https://petsc.org/release/docs/manualpages/KSP/

use std::fmt;
use std::str::FromStr;

use crate::config::SolverOptions;
use crate::core::traits::{LinearOperator, Scalar, ScalarProduct, Vector};
use crate::core::wrappers::SeqScalarProduct;
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{
    BiCgStabSolver, CgSolver, GeneralizedPcgSolver, GmresSolver, GradientSolver, LinearSolver, LoopSolver,
    MinresSolver,
};
use crate::utils::convergence::SolveStats;

/// Enum representing the available solver types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    /// Preconditioned fixed-point iteration
    Loop,
    /// Preconditioned steepest descent
    Gradient,
    /// Conjugate Gradient (A and M SPD)
    Cg,
    /// BiConjugate Gradient Stabilized (nonsymmetric A)
    BiCgStab,
    /// Minimal Residual (symmetric, possibly indefinite A; SPD M)
    Minres,
    /// Restarted GMRES (nonsymmetric A)
    Gmres,
    /// PCG with explicit orthogonalization (varying M)
    GeneralizedPcg,
}

impl SolverKind {
    pub const ALL: [SolverKind; 7] = [
        SolverKind::Loop,
        SolverKind::Gradient,
        SolverKind::Cg,
        SolverKind::BiCgStab,
        SolverKind::Minres,
        SolverKind::Gmres,
        SolverKind::GeneralizedPcg,
    ];

    /// Short lowercase name, as accepted by `FromStr`.
    pub fn name(self) -> &'static str {
        match self {
            SolverKind::Loop => "loop",
            SolverKind::Gradient => "gradient",
            SolverKind::Cg => "cg",
            SolverKind::BiCgStab => "bicgstab",
            SolverKind::Minres => "minres",
            SolverKind::Gmres => "gmres",
            SolverKind::GeneralizedPcg => "gpcg",
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SolverKind {
    type Err = KError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        SolverKind::ALL
            .into_iter()
            .find(|kind| kind.name() == lower)
            .ok_or_else(|| KError::InvalidConfig(format!("unknown solver kind '{s}'")))
    }
}

/// Context and configuration for an iterative solve.
///
/// Holds the solver kind and its options. The operator, preconditioner and scalar
/// product are passed per solve, so one context can drive many systems.
#[derive(Debug, Clone)]
pub struct KspContext<T> {
    /// The type of solver to use
    pub kind: SolverKind,
    pub options: SolverOptions<T>,
}

impl<T: Scalar> KspContext<T> {
    /// Validates `options` up front so that a bad configuration fails before any solve.
    pub fn new(kind: SolverKind, options: SolverOptions<T>) -> Result<Self, KError> {
        options.validate()?;
        Ok(Self { kind, options })
    }

    /// Solve `A x = b` with the sequential scalar product.
    ///
    /// # Arguments
    /// * `op` - System operator
    /// * `prec` - Preconditioner; its `pre`/`post` hooks run once per call
    /// * `x` - Initial guess on entry, solution on exit
    /// * `b` - Right-hand side; overwritten (see the individual solvers)
    ///
    /// # Returns
    /// * `Ok(SolveStats)` when the solve ran to completion, converged or not
    /// * `Err(KError)` on breakdown, a category mismatch or a collaborator failure
    pub fn solve<X, L, P>(&self, op: &L, prec: &mut P, x: &mut X, b: &mut X) -> Result<SolveStats<T>, KError>
    where
        X: Vector<Scalar = T>,
        L: LinearOperator<X> + ?Sized,
        P: Preconditioner<X> + ?Sized,
    {
        self.solve_with_scalar_product(op, &SeqScalarProduct, prec, x, b)
    }

    /// Solve `A x = b` with a caller-supplied scalar product.
    pub fn solve_with_scalar_product<X, L, P, S>(
        &self,
        op: &L,
        sp: &S,
        prec: &mut P,
        x: &mut X,
        b: &mut X,
    ) -> Result<SolveStats<T>, KError>
    where
        X: Vector<Scalar = T>,
        L: LinearOperator<X> + ?Sized,
        P: Preconditioner<X> + ?Sized,
        S: ScalarProduct<X> + ?Sized,
    {
        let o = &self.options;
        log::debug!("KspContext: solving with {} (reduction {:e}, max_iters {})", self.kind, o.reduction, o.max_iters);
        match self.kind {
            SolverKind::Loop => {
                LoopSolver::with_scalar_product(op, sp, prec, o.reduction, o.max_iters, o.verbose)?.apply(x, b)
            }
            SolverKind::Gradient => {
                GradientSolver::with_scalar_product(op, sp, prec, o.reduction, o.max_iters, o.verbose)?.apply(x, b)
            }
            SolverKind::Cg => {
                CgSolver::with_scalar_product(op, sp, prec, o.reduction, o.max_iters, o.verbose)?.apply(x, b)
            }
            SolverKind::BiCgStab => {
                BiCgStabSolver::with_scalar_product(op, sp, prec, o.reduction, o.max_iters, o.verbose)?.apply(x, b)
            }
            SolverKind::Minres => {
                MinresSolver::with_scalar_product(op, sp, prec, o.reduction, o.max_iters, o.verbose)?.apply(x, b)
            }
            SolverKind::Gmres => {
                GmresSolver::with_scalar_product(op, sp, prec, o.reduction, o.restart, o.max_iters, o.verbose)?
                    .with_recalc_defect(o.recalc_defect)
                    .apply(x, b)
            }
            SolverKind::GeneralizedPcg => {
                GeneralizedPcgSolver::with_scalar_product(op, sp, prec, o.reduction, o.max_iters, o.verbose)?
                    .with_restart(o.restart)
                    .apply(x, b)
            }
        }
    }
}
