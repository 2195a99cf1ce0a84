pub mod options;

pub use options::{SolverOptions, Verbosity};
