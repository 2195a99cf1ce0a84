//! Command-line or API options for solvers.
//!
//! `SolverOptions` bundles everything a solver is configured with once at
//! construction: the relative reduction target, the iteration budget, the
//! verbosity level and, for the restarting methods, the restart length.

use crate::core::traits::Scalar;
use crate::error::KError;

/// How much progress output a solve produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Nothing.
    #[default]
    Silent,
    /// Solver header and a final summary line.
    Summary,
    /// Header, summary and one line per iteration.
    Iterations,
}

impl From<u8> for Verbosity {
    fn from(level: u8) -> Self {
        match level {
            0 => Verbosity::Silent,
            1 => Verbosity::Summary,
            _ => Verbosity::Iterations,
        }
    }
}

/// Solver parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions<T> {
    /// Relative defect reduction ε ∈ (0, 1]
    pub reduction: T,
    /// Iteration budget
    pub max_iters: usize,
    pub verbose: Verbosity,
    /// Krylov basis size (GMRES) or stored directions (generalized PCG)
    pub restart: usize,
    /// GMRES only: recompute M⁻¹(b − Ax) after every cycle
    pub recalc_defect: bool,
}

impl<T: Scalar> Default for SolverOptions<T> {
    fn default() -> Self {
        Self {
            reduction: T::from_const(1e-8),
            max_iters: 1000,
            verbose: Verbosity::Silent,
            restart: 10,
            recalc_defect: false,
        }
    }
}

impl<T: Scalar> SolverOptions<T> {
    pub fn new(reduction: T, max_iters: usize) -> Self {
        Self { reduction, max_iters, ..Self::default() }
    }
    pub fn with_verbose(mut self, verbose: Verbosity) -> Self {
        self.verbose = verbose;
        self
    }
    pub fn with_restart(mut self, restart: usize) -> Self {
        self.restart = restart;
        self
    }
    pub fn with_recalc_defect(mut self, flag: bool) -> Self {
        self.recalc_defect = flag;
        self
    }

    pub fn validate(&self) -> Result<(), KError> {
        if !(self.reduction > T::zero() && self.reduction <= T::one()) {
            return Err(KError::InvalidConfig(format!(
                "reduction must lie in (0, 1], got {:e}",
                self.reduction
            )));
        }
        if self.restart == 0 {
            return Err(KError::InvalidConfig("restart length must be positive".into()));
        }
        Ok(())
    }
}
