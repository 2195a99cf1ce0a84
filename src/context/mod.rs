//! Context module for krylon.
//!
//! This module provides the factory type that picks a solver by kind and drives it with a
//! shared set of options.
//!
//! Modules:
//! - [`ksp_context`]: Contains the `KspContext` struct and the `SolverKind` selector.
//!
//! # Example
//! ```rust,ignore
//! use krylon::{Identity, KspContext, SolverKind, SolverOptions};
//! let ksp = KspContext::new(SolverKind::Gmres, SolverOptions::new(1e-8, 200).with_restart(30))?;
//! let stats = ksp.solve(&a, &mut Identity, &mut x, &mut b)?;
//! ```
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems. SIAM.
//! - PETSc documentation: https://petsc.org/release/docs/manualpages/KSP/

pub mod ksp_context;
pub use ksp_context::{KspContext, SolverKind};
