//! Verbosity-gated progress output, routed through the `log` facade.

use crate::config::Verbosity;
use crate::core::traits::Scalar;
use crate::utils::convergence::SolveStats;

/// Per-solve progress reporter.
#[derive(Debug, Clone, Copy)]
pub struct Monitor {
    name: &'static str,
    verbose: Verbosity,
}

impl Monitor {
    pub fn new(name: &'static str, verbose: Verbosity) -> Self {
        Self { name, verbose }
    }

    /// `=== <name>`, plus the column header and the initial defect at per-iteration verbosity.
    pub fn header<T: Scalar>(&self, def0: T) {
        if self.verbose >= Verbosity::Summary {
            log::info!("=== {}", self.name);
        }
        if self.verbose >= Verbosity::Iterations {
            log::info!(" Iter          Defect            Rate");
            log::info!("{:>5} {:>16.6e}", 0, def0);
        }
    }

    pub fn iteration<T: Scalar>(&self, it: f64, def: T, def_old: T) {
        if self.verbose >= Verbosity::Iterations {
            log::info!("{:>5} {:>16.6e} {:>16.6e}", it, def, def / def_old);
        }
    }

    /// Last defect, printed only at summary verbosity (per-iteration output already shows it).
    pub fn last<T: Scalar>(&self, it: f64, def: T) {
        if self.verbose == Verbosity::Summary {
            log::info!("{:>5} {:>16.6e}", it, def);
        }
    }

    pub fn restart(&self) {
        if self.verbose >= Verbosity::Summary {
            log::info!("=== {}::restart", self.name);
        }
    }

    pub fn summary<T: Scalar>(&self, stats: &SolveStats<T>) {
        if self.verbose >= Verbosity::Summary {
            log::info!("=== {}", stats);
        }
    }
}
