//! Convergence tracking & tolerance checks for iterative solvers.

use std::fmt;

use crate::core::traits::Scalar;
use crate::error::KError;

/// Absolute floor on residual norms. Below it a defect counts as zero.
pub const DEFECT_FLOOR: f64 = 1e-30;

/// Stopping criteria: relative reduction target and iteration budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Convergence<T> {
    pub reduction: T,
    pub max_iters: usize,
}

impl<T: Scalar> Convergence<T> {
    /// Validates `reduction ∈ (0, 1]`.
    pub fn new(reduction: T, max_iters: usize) -> Result<Self, KError> {
        Self::check_reduction(reduction)?;
        Ok(Self { reduction, max_iters })
    }

    /// Rejects reduction targets outside `(0, 1]`, NaN included.
    pub fn check_reduction(reduction: T) -> Result<(), KError> {
        if !(reduction > T::zero() && reduction <= T::one()) {
            return Err(KError::InvalidConfig(format!(
                "reduction must lie in (0, 1], got {reduction:e}"
            )));
        }
        Ok(())
    }

    pub fn floor() -> T {
        T::from_const(DEFECT_FLOOR)
    }

    /// True when the initial defect is already indistinguishable from zero.
    pub fn is_negligible(&self, def0: T) -> bool {
        def0 < Self::floor()
    }

    /// `def < def0·ε` or `def` below the absolute floor.
    pub fn is_converged(&self, def: T, def0: T) -> bool {
        def < def0 * self.reduction || def < Self::floor()
    }
}

/// Outcome of one solve.
#[derive(Clone, Debug, PartialEq)]
pub struct SolveStats<T> {
    pub converged: bool,
    pub iterations: usize,
    /// ‖r_final‖ / ‖r_0‖
    pub reduction: T,
    /// reduction^(1/iterations)
    pub conv_rate: T,
    /// Wall-clock seconds.
    pub elapsed: f64,
}

impl<T: Scalar> Default for SolveStats<T> {
    fn default() -> Self {
        Self {
            converged: false,
            iterations: 0,
            reduction: T::zero(),
            conv_rate: T::zero(),
            elapsed: 0.0,
        }
    }
}

impl<T: Scalar> SolveStats<T> {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Result for an initial defect below the floor: converged, nothing done.
    pub fn trivially_converged(elapsed: f64) -> Self {
        Self { converged: true, elapsed, ..Self::default() }
    }

    pub fn finish(converged: bool, iterations: usize, def: T, def0: T, elapsed: f64) -> Self {
        Self::finish_fractional(converged, iterations as f64, def, def0, elapsed)
    }

    /// Like [`SolveStats::finish`], for solvers that count half steps. The rate uses
    /// the fractional count, the reported iterations are rounded up.
    pub fn finish_fractional(converged: bool, steps: f64, def: T, def0: T, elapsed: f64) -> Self {
        let reduction = def / def0;
        let conv_rate = if steps > 0.0 {
            reduction.powf(T::from_const(1.0 / steps))
        } else {
            reduction
        };
        Self {
            converged,
            iterations: steps.ceil() as usize,
            reduction,
            conv_rate,
            elapsed,
        }
    }
}

impl<T: Scalar> fmt::Display for SolveStats<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let per_it = self.elapsed / self.iterations.max(1) as f64;
        write!(
            f,
            "rate={:.6e}, T={:.6e}, TIT={:.6e}, IT={}",
            self.conv_rate, self.elapsed, per_it, self.iterations
        )
    }
}
