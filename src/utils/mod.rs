pub mod convergence;
pub mod monitor;

pub use convergence::{Convergence, SolveStats, DEFECT_FLOOR};
pub use monitor::Monitor;
