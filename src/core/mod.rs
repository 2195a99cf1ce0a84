pub mod traits;
pub mod wrappers;

pub use traits::{
    check_categories, Categorized, LinearOperator, Scalar, ScalarProduct, SolverCategory, Vector,
};
pub use wrappers::SeqScalarProduct;
