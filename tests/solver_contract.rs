//! Behaviour shared by every solver: already-converged input, the iteration budget, the
//! per-call reduction override, category checks and error propagation.
//!
//! Each test runs over all solver kinds through `KspContext` or through the individual
//! constructors, using small hand-written collaborators that record how they are called.

use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};

use approx::assert_abs_diff_eq;
use faer::Mat;
use krylon::config::{SolverOptions, Verbosity};
use krylon::context::{KspContext, SolverKind};
use krylon::core::traits::{Categorized, LinearOperator, ScalarProduct, SolverCategory, Vector};
use krylon::error::KError;
use krylon::preconditioner::{Identity, Preconditioner};
use krylon::solver::{BiCgStabSolver, CgSolver, GmresSolver, LinearSolver, MinresSolver};
use krylon::SolveStats;

fn laplacian(n: usize, diag: f64) -> Mat<f64> {
    Mat::from_fn(n, n, |i, j| if i == j { diag } else if i.abs_diff(j) == 1 { -1.0 } else { 0.0 })
}

/// Symmetric with spectrum in (0.5, 1.5): even the unpreconditioned loop contracts.
fn contraction(n: usize) -> Mat<f64> {
    Mat::from_fn(n, n, |i, j| if i == j { 1.0 } else if i.abs_diff(j) == 1 { -0.25 } else { 0.0 })
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Identity preconditioner that counts lifecycle calls.
#[derive(Default)]
struct Recording {
    pre: usize,
    apply: usize,
    post: usize,
}

impl Categorized for Recording {}

impl Preconditioner<Vec<f64>> for Recording {
    fn pre(&mut self, _x: &mut Vec<f64>, _b: &mut Vec<f64>) -> Result<(), KError> {
        self.pre += 1;
        Ok(())
    }
    fn apply(&mut self, v: &mut Vec<f64>, d: &Vec<f64>) -> Result<(), KError> {
        self.apply += 1;
        v.clone_from(d);
        Ok(())
    }
    fn post(&mut self, _x: &mut Vec<f64>) -> Result<(), KError> {
        self.post += 1;
        Ok(())
    }
}

/// Dense operator that fails or panics on a chosen application.
struct Faulty {
    a: Mat<f64>,
    calls: Cell<usize>,
    fail_at: usize,
    panic: bool,
}

impl Categorized for Faulty {}

impl LinearOperator<Vec<f64>> for Faulty {
    fn apply(&self, x: &Vec<f64>, y: &mut Vec<f64>) -> Result<(), KError> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if call == self.fail_at {
            if self.panic {
                panic!("operator blew up on call {call}");
            }
            return Err(KError::OperatorError(format!("failed on call {call}")));
        }
        self.a.apply(x, y)
    }
}

/// Operator and scalar product for overlapping distributed data (sequential underneath).
struct Overlapping(Mat<f64>);

impl Categorized for Overlapping {
    fn category(&self) -> SolverCategory {
        SolverCategory::Overlapping
    }
}

impl LinearOperator<Vec<f64>> for Overlapping {
    fn apply(&self, x: &Vec<f64>, y: &mut Vec<f64>) -> Result<(), KError> {
        self.0.apply(x, y)
    }
}

struct OverlappingProduct;

impl Categorized for OverlappingProduct {
    fn category(&self) -> SolverCategory {
        SolverCategory::Overlapping
    }
}

impl ScalarProduct<Vec<f64>> for OverlappingProduct {
    fn dot(&self, x: &Vec<f64>, y: &Vec<f64>) -> Result<f64, KError> {
        Ok(x.dot(y))
    }
}

struct OverlappingIdentity;

impl Categorized for OverlappingIdentity {
    fn category(&self) -> SolverCategory {
        SolverCategory::Overlapping
    }
}

impl Preconditioner<Vec<f64>> for OverlappingIdentity {
    fn apply(&mut self, v: &mut Vec<f64>, d: &Vec<f64>) -> Result<(), KError> {
        v.clone_from(d);
        Ok(())
    }
}

#[test]
fn exact_initial_guess_returns_immediately() {
    init_logging();
    // diag(2): b = A x is exact in floating point, so the initial defect is zero
    let a = Mat::<f64>::from_fn(3, 3, |i, j| if i == j { 2.0 } else { 0.0 });
    for kind in SolverKind::ALL {
        let ctx = KspContext::new(kind, SolverOptions::new(1e-8, 100).with_verbose(Verbosity::Summary)).unwrap();
        let mut pc = Recording::default();
        let mut x = vec![1.0, 2.0, 3.0];
        let mut b = vec![2.0, 4.0, 6.0];
        let stats = ctx.solve(&a, &mut pc, &mut x, &mut b).unwrap();
        assert!(stats.converged, "{kind}");
        assert_eq!(stats.iterations, 0, "{kind}");
        assert_eq!(stats.reduction, 0.0, "{kind}");
        assert_eq!(stats.conv_rate, 0.0, "{kind}");
        assert_eq!(x, vec![1.0, 2.0, 3.0], "{kind}");
        assert_eq!((pc.pre, pc.post), (1, 1), "{kind}: lifecycle not completed");
    }
}

#[test]
fn zero_rhs_and_zero_guess_is_trivially_converged() {
    let a = laplacian(5, 2.0);
    for kind in SolverKind::ALL {
        let ctx = KspContext::new(kind, SolverOptions::new(1e-8, 100)).unwrap();
        let mut x = vec![0.0; 5];
        let mut b = vec![0.0; 5];
        let stats = ctx.solve(&a, &mut Identity, &mut x, &mut b).unwrap();
        assert!(stats.converged);
        assert_eq!(stats.iterations, 0);
        assert_eq!(x, vec![0.0; 5]);
    }
}

#[test]
fn iteration_budget_is_never_exceeded() {
    init_logging();
    let n = 30;
    let a = laplacian(n, 2.0);
    for kind in SolverKind::ALL {
        for budget in [1usize, 2, 3, 7] {
            let opts = SolverOptions::new(1e-14, budget).with_restart(4).with_verbose(Verbosity::Iterations);
            let ctx = KspContext::new(kind, opts).unwrap();
            let mut x = vec![0.0; n];
            let mut b: Vec<f64> = (0..n).map(|i| ((i * 7) % 5) as f64 - 2.0).collect();
            let stats = ctx.solve(&a, &mut Identity, &mut x, &mut b).unwrap();
            assert!(stats.iterations <= budget, "{kind}: {} > {budget}", stats.iterations);
            assert!(!stats.converged, "{kind} converged to 1e-14 in {budget} steps");
        }
    }
}

#[test]
fn postprocess_runs_once_after_a_full_solve() {
    let a = contraction(8);
    for kind in SolverKind::ALL {
        let ctx = KspContext::new(kind, SolverOptions::new(1e-10, 200)).unwrap();
        let mut pc = Recording::default();
        let mut x = vec![0.0; 8];
        let mut b = vec![1.0; 8];
        let stats = ctx.solve(&a, &mut pc, &mut x, &mut b).unwrap();
        assert!(stats.converged, "{kind}");
        assert_eq!((pc.pre, pc.post), (1, 1), "{kind}");
        assert!(pc.apply >= 1, "{kind}");
    }
}

#[test]
fn reduction_override_applies_to_one_call_only() {
    fn solve(solver: &mut impl LinearSolver<Vec<f64>>, n: usize, reduction: Option<f64>) -> SolveStats<f64> {
        let mut x = vec![0.0; n];
        let mut b = vec![1.0; n];
        match reduction {
            Some(r) => solver.apply_with_reduction(&mut x, &mut b, r).unwrap(),
            None => solver.apply(&mut x, &mut b).unwrap(),
        }
    }

    // diagonally dominant, so the residual falls steadily and the two targets separate
    let n = 40;
    let a = laplacian(n, 3.0);
    let mut solver = CgSolver::new(&a, Identity, 1e-12, 1000, Verbosity::Silent).unwrap();
    let before = solve(&mut solver, n, None);
    let loose = solve(&mut solver, n, Some(1e-2));
    let after = solve(&mut solver, n, None);

    assert!(loose.converged);
    assert!(loose.reduction < 1e-2);
    assert!(loose.iterations < before.iterations);
    assert_eq!(solver.conv.reduction, 1e-12);

    assert!(before.converged && after.converged);
    assert!(before.reduction < 1e-12);
    assert_eq!(before.iterations, after.iterations);
    assert_abs_diff_eq!(before.reduction, after.reduction, epsilon = 0.1 * before.reduction);
}

#[test]
fn out_of_range_reduction_override_is_rejected() {
    let n = 20;
    let a = laplacian(n, 2.0);
    let mut solver = CgSolver::new(&a, Identity, 1e-8, 100, Verbosity::Silent).unwrap();
    for bad in [5.0, 0.0, -1e-3, f64::NAN] {
        let mut x = vec![0.0; n];
        let mut b = vec![1.0; n];
        let err = solver.apply_with_reduction(&mut x, &mut b, bad).unwrap_err();
        assert!(matches!(err, KError::InvalidConfig(_)), "{bad} gave {err:?}");
        assert_eq!(solver.conv.reduction, 1e-8);
        assert_eq!(x, vec![0.0; n]);
        assert_eq!(b, vec![1.0; n]);
    }
}

#[test]
fn reduction_override_is_restored_after_an_error() {
    let n = 10;
    let op = Faulty { a: laplacian(n, 2.0), calls: Cell::new(0), fail_at: 3, panic: false };
    let mut solver = BiCgStabSolver::new(&op, Identity, 1e-9, 100, Verbosity::Silent).unwrap();
    let mut x = vec![0.0; n];
    let mut b = vec![1.0; n];
    let err = solver.apply_with_reduction(&mut x, &mut b, 0.5).unwrap_err();
    assert!(matches!(err, KError::OperatorError(_)));
    assert_eq!(solver.conv.reduction, 1e-9);
}

#[test]
fn reduction_override_is_restored_after_a_panic() {
    let n = 10;
    let op = Faulty { a: laplacian(n, 2.0), calls: Cell::new(0), fail_at: 4, panic: true };
    let mut solver = GmresSolver::new(&op, Identity, 1e-9, 5, 100, Verbosity::Silent).unwrap();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let mut x = vec![0.0; n];
        let mut b = vec![1.0; n];
        solver.apply_with_reduction(&mut x, &mut b, 0.25)
    }));
    assert!(outcome.is_err());
    assert_eq!(solver.conv.reduction, 1e-9);
}

#[test]
fn mixed_categories_are_rejected_at_construction() {
    let op = Overlapping(laplacian(4, 2.0));
    let err = CgSolver::new(&op, Identity, 1e-8, 10, Verbosity::Silent).err();
    assert_eq!(
        err,
        Some(KError::CategoryMismatch { left: SolverCategory::Overlapping, right: SolverCategory::Sequential })
    );

    let a = laplacian(4, 2.0);
    let err = MinresSolver::with_scalar_product(&a, OverlappingProduct, Identity, 1e-8, 10, Verbosity::Silent).err();
    assert!(matches!(err, Some(KError::CategoryMismatch { .. })));

    for kind in SolverKind::ALL {
        let ctx = KspContext::new(kind, SolverOptions::new(1e-8, 10)).unwrap();
        let mut x = vec![0.0; 4];
        let mut b = vec![1.0; 4];
        let result = ctx.solve_with_scalar_product(&op, &OverlappingProduct, &mut Identity, &mut x, &mut b);
        assert!(matches!(result, Err(KError::CategoryMismatch { .. })), "{kind}");
        // nothing was touched
        assert_eq!(b, vec![1.0; 4]);
    }
}

#[test]
fn consistent_non_sequential_categories_are_accepted() {
    let op = Overlapping(contraction(6));
    for kind in SolverKind::ALL {
        let ctx = KspContext::new(kind, SolverOptions::new(1e-10, 200)).unwrap();
        let mut x = vec![0.0; 6];
        let mut b = vec![1.0; 6];
        let stats = ctx
            .solve_with_scalar_product(&op, &OverlappingProduct, &mut OverlappingIdentity, &mut x, &mut b)
            .unwrap();
        assert!(stats.converged, "{kind}");
    }
}

#[test]
fn collaborator_errors_propagate_unchanged() {
    struct Broken;
    impl Categorized for Broken {}
    impl Preconditioner<Vec<f64>> for Broken {
        fn apply(&mut self, _v: &mut Vec<f64>, _d: &Vec<f64>) -> Result<(), KError> {
            Err(KError::PreconditionerError("singular block".into()))
        }
    }

    let a = laplacian(4, 2.0);
    for kind in SolverKind::ALL {
        let ctx = KspContext::new(kind, SolverOptions::new(1e-8, 10)).unwrap();
        let mut x = vec![0.0; 4];
        let mut b = vec![1.0; 4];
        let err = ctx.solve(&a, &mut Broken, &mut x, &mut b).unwrap_err();
        assert_eq!(err, KError::PreconditionerError("singular block".into()), "{kind}");
    }
}

#[test]
fn breakdown_error_reports_its_context() {
    let a = Mat::<f64>::from_fn(2, 2, |i, j| [[0.0, 1.0], [-1.0, 0.0]][i][j]);
    let mut x = vec![0.0; 2];
    let mut b = vec![1.0, 0.0];
    let mut solver = BiCgStabSolver::new(&a, Identity, 1e-8, 10, Verbosity::Silent).unwrap();
    let err = solver.apply(&mut x, &mut b).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("breakdown"), "{message}");
    assert!(message.contains("BiCGSTABSolver"), "{message}");
}

#[test]
fn stats_display_and_clear() {
    let a = laplacian(6, 4.0);
    let mut x = vec![0.0; 6];
    let mut b = vec![1.0; 6];
    let mut solver = CgSolver::new(&a, Identity, 1e-10, 100, Verbosity::Silent).unwrap();
    let mut stats = solver.apply(&mut x, &mut b).unwrap();
    let line = stats.to_string();
    assert!(line.starts_with("rate="), "{line}");
    assert!(line.ends_with(&format!("IT={}", stats.iterations)), "{line}");
    assert_abs_diff_eq!(stats.conv_rate, stats.reduction.powf(1.0 / stats.iterations as f64), epsilon = 1e-12);
    stats.clear();
    assert_eq!(stats.iterations, 0);
    assert!(!stats.converged);
}

#[test]
fn single_precision_solves() {
    let a = Mat::<f32>::from_fn(3, 3, |i, j| [[4.0, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 2.0]][i][j]);
    let mut x = vec![0.0f32; 3];
    let mut b = vec![6.0f32, 10.0, 8.0];
    let mut solver = CgSolver::new(&a, Identity, 1e-5f32, 50, Verbosity::Silent).unwrap();
    let stats = solver.apply(&mut x, &mut b).unwrap();
    assert!(stats.converged);
    assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-4);
    assert_abs_diff_eq!(x[1], 2.0, epsilon = 1e-4);
    assert_abs_diff_eq!(x[2], 3.0, epsilon = 1e-4);
}
