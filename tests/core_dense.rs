//! Tests for the core traits on dense data: matrix-vector products, scaled accumulation,
//! dot product and norm, vector updates, and the category check.
//!
//! These tests verify the `Vector`, `LinearOperator` and `ScalarProduct` implementations
//! for `Vec<f64>` and faer dense matrices, using random and fixed data.

use approx::assert_abs_diff_eq;
use faer::Mat;
use krylon::core::traits::{check_categories, Categorized, LinearOperator, ScalarProduct, SolverCategory, Vector};
use krylon::core::wrappers::SeqScalarProduct;
use krylon::error::KError;
use rand::Rng;

/// Matrix-free 1-D Laplacian, relying on the provided `apply_scale_add`.
struct Stencil {
    n: usize,
}

impl Categorized for Stencil {}

impl LinearOperator<Vec<f64>> for Stencil {
    fn apply(&self, x: &Vec<f64>, y: &mut Vec<f64>) -> Result<(), KError> {
        for i in 0..self.n {
            let left = if i > 0 { x[i - 1] } else { 0.0 };
            let right = if i + 1 < self.n { x[i + 1] } else { 0.0 };
            y[i] = 2.0 * x[i] - left - right;
        }
        Ok(())
    }
}

/// Test matrix-vector multiplication for a small random dense matrix.
///
/// This test constructs a random 5x5 matrix and a random vector, computes the product
/// through `LinearOperator::apply`, and checks the result against a manual computation.
#[test]
fn matvec_random_small() {
    let n = 5;
    let mut rng = rand::thread_rng();
    let vals: Vec<f64> = (0..n * n).map(|_| rng.r#gen()).collect();
    // Use from_fn to build a column-major matrix
    let a = Mat::from_fn(n, n, |i, j| vals[j * n + i]);
    let x: Vec<f64> = (0..n).map(|_| rng.r#gen()).collect();
    let mut y = vec![0.0; n];
    a.apply(&x, &mut y).unwrap();

    // check y[i] == sum_j A[i,j]*x[j]
    for i in 0..n {
        let expected = (0..n).map(|j| vals[j * n + i] * x[j]).sum::<f64>();
        assert_abs_diff_eq!(y[i], expected, epsilon = 1e-12);
    }

    // the borrowed view behaves the same
    let mut y_ref = vec![0.0; n];
    a.as_ref().apply(&x, &mut y_ref).unwrap();
    assert_eq!(y, y_ref);
}

/// y ← y + α A x, for the dense override and the provided default alike.
#[test]
fn scaled_accumulation() {
    let n = 6;
    let dense = Mat::<f64>::from_fn(n, n, |i, j| if i == j { 2.0 } else if i.abs_diff(j) == 1 { -1.0 } else { 0.0 });
    let stencil = Stencil { n };
    let x: Vec<f64> = (0..n).map(|i| (i as f64).powi(2)).collect();
    let mut y_dense = vec![1.0; n];
    let mut y_stencil = vec![1.0; n];
    dense.apply_scale_add(-0.5, &x, &mut y_dense).unwrap();
    stencil.apply_scale_add(-0.5, &x, &mut y_stencil).unwrap();
    for i in 0..n {
        assert_abs_diff_eq!(y_dense[i], y_stencil[i], epsilon = 1e-14);
    }
    // interior rows of the Laplacian of i² are -2
    assert_abs_diff_eq!(y_dense[2], 1.0 - 0.5 * -2.0, epsilon = 1e-14);
}

#[test]
fn dense_operator_rejects_nonconformant_vectors() {
    let a = Mat::<f64>::zeros(3, 4);
    let mut y = vec![0.0; 3];
    assert_eq!(a.apply(&vec![1.0; 3], &mut y), Err(KError::DimensionMismatch { expected: 4, found: 3 }));
    let mut y = vec![0.0; 2];
    assert_eq!(a.apply(&vec![1.0; 4], &mut y), Err(KError::DimensionMismatch { expected: 3, found: 2 }));
}

/// Test dot product and Euclidean norm for small vectors.
///
/// Verifies that `SeqScalarProduct` and the vector's own reductions agree with manual
/// calculations.
#[test]
fn dot_and_norm() {
    let x = vec![1.0, 2.0, 3.0];
    let y = vec![4.0, -5.0, 6.0];
    let sp = SeqScalarProduct;
    let dot = sp.dot(&x, &y).unwrap();
    assert_abs_diff_eq!(dot, 1.0 * 4.0 + 2.0 * (-5.0) + 3.0 * 6.0, epsilon = 1e-12);
    let norm_x = sp.norm(&x).unwrap();
    let expected_norm = ((1.0f64).powi(2) + 2.0f64.powi(2) + 3.0f64.powi(2)).sqrt();
    assert_abs_diff_eq!(norm_x, expected_norm, epsilon = 1e-12);
    assert_abs_diff_eq!(x.two_norm(), expected_norm, epsilon = 1e-12);
}

#[test]
fn large_parallel_reduction_matches_serial() {
    let n = 100_000;
    let mut rng = rand::thread_rng();
    let x: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let serial: f64 = x.iter().map(|v| v * v).sum();
    assert_abs_diff_eq!(x.dot(&x), serial, epsilon = 1e-8);
    assert_abs_diff_eq!(x.two_norm(), serial.sqrt(), epsilon = 1e-8);
}

#[test]
fn vector_updates() {
    let mut x = vec![1.0, 2.0, 3.0];
    let y = vec![1.0, 1.0, 1.0];
    x.axpy(2.0, &y);
    assert_eq!(x, vec![3.0, 4.0, 5.0]);
    x.scale(-1.0);
    assert_eq!(x, vec![-3.0, -4.0, -5.0]);
    let z = x.zeros_like();
    assert_eq!(z, vec![0.0; 3]);
    assert_eq!(Vector::len(&z), 3);
    x.set_zero();
    assert_eq!(x, z);
}

#[test]
fn category_check_reports_first_mismatch() {
    struct Overlap;
    impl Categorized for Overlap {
        fn category(&self) -> SolverCategory {
            SolverCategory::Overlapping
        }
    }
    let a = Mat::<f64>::identity(2, 2);
    assert!(check_categories(&a, &SeqScalarProduct, &SeqScalarProduct).is_ok());
    assert_eq!(
        check_categories(&a, &Overlap, &SeqScalarProduct),
        Err(KError::CategoryMismatch { left: SolverCategory::Sequential, right: SolverCategory::Overlapping })
    );
    assert_eq!(
        check_categories(&Overlap, &Overlap, &SeqScalarProduct),
        Err(KError::CategoryMismatch { left: SolverCategory::Overlapping, right: SolverCategory::Sequential })
    );
}
