//! krylon: Krylov subspace solvers over abstract operators
//!
//! This crate provides preconditioned iterative solvers (Richardson loop, steepest descent,
//! CG, BiCGStab, MINRES, restarted GMRES and a generalized PCG) that only see the system
//! through the [`LinearOperator`], [`Preconditioner`] and [`ScalarProduct`] traits. Plain
//! `Vec<T>` vectors and dense `faer` matrices work out of the box.

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod preconditioner;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use context::*;
pub use self::core::*;
pub use error::*;
pub use preconditioner::*;
pub use solver::*;
pub use utils::*;

// Re-export SolveStats at the crate root for convenience
pub use utils::convergence::SolveStats;
