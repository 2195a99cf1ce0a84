use thiserror::Error;

use crate::core::traits::SolverCategory;

// Unified error type for krylon

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KError {
    #[error(
        "breakdown in {solver} - {quantity} {value:e} <= {floor:e} after {iterations} iterations"
    )]
    Breakdown {
        solver: &'static str,
        quantity: &'static str,
        value: f64,
        floor: f64,
        iterations: f64,
    },
    #[error("category mismatch: {left:?} vs {right:?}")]
    CategoryMismatch {
        left: SolverCategory,
        right: SolverCategory,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("operator error: {0}")]
    OperatorError(String),
    #[error("preconditioner error: {0}")]
    PreconditionerError(String),
    #[error("scalar product error: {0}")]
    ScalarProductError(String),
}
