use approx::assert_abs_diff_eq;
use nalgebra::DMatrix;
use romcv::approximation::{Approximation, ApproximationMethod, Kernel, LinearRegression, Rbf};
use romcv::config::{ApproximationConfig, ExperimentConfig, ReductionConfig};
use romcv::dataset;
use romcv::evaluation::{Candidate, sweep};
use romcv::reduction::{Pod, RankPolicy, ReductionMethod};
use romcv::{CrossValidation, Database, ErrorMetric, KFold, ReducedOrderModel, RomError};
use std::fs;

#[test]
fn affine_snapshots_are_reproduced_exactly() {
    let db = dataset::linear(12, 40).unwrap();
    let report = CrossValidation::new(KFold::new(4), ErrorMetric::RelativeL2)
        .run(&db, &Pod::with_rank(2), &LinearRegression::new())
        .unwrap();
    assert_eq!(report.fold_errors.len(), 4);
    assert_abs_diff_eq!(report.mean(), 0.0, epsilon = 1e-10);
}

#[test]
fn every_sample_is_held_out_once() {
    let db = dataset::gaussian(13, 30).unwrap();
    let report = CrossValidation::new(KFold::shuffled(4, 3), ErrorMetric::Rmse)
        .run(&db, &Pod::with_rank(3), &Rbf::default())
        .unwrap();
    let mut seen: Vec<usize> = report.held_out.iter().flatten().copied().collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..13).collect::<Vec<_>>());
    assert_eq!(report.fold_sizes(), vec![4, 3, 3, 3]);
    assert!(report.fold_errors.iter().all(|e| e.is_finite() && *e >= 0.0));
}

#[test]
fn shuffled_validation_is_reproducible() {
    let db = dataset::heat(15, 50, 1).unwrap();
    let cv = CrossValidation::new(KFold::shuffled(5, 42), ErrorMetric::RelativeL2);
    let rbf = Rbf::new(Kernel::Cubic, 1.0);
    let first = cv.run(&db, &Pod::with_rank(3), &rbf).unwrap();
    let second = cv.run(&db, &Pod::with_rank(3), &rbf).unwrap();
    assert_eq!(first, second);
}

#[test]
fn leave_one_out_uses_one_fold_per_sample() {
    let db = dataset::linear(7, 20).unwrap();
    let rom = ReducedOrderModel::new(db, Pod::with_rank(2), LinearRegression::new());
    let report = rom.loo_error(ErrorMetric::RelativeL2).unwrap();
    assert_eq!(report.fold_errors.len(), 7);
    assert!(report.fold_sizes().iter().all(|&size| size == 1));
    assert!(report.mean() < 1e-10);
}

#[test]
fn too_many_folds_is_a_configuration_error() {
    let db = dataset::linear(4, 10).unwrap();
    let result = CrossValidation::new(KFold::new(5), ErrorMetric::RelativeL2).run(
        &db,
        &Pod::default(),
        &LinearRegression::new(),
    );
    assert!(matches!(result, Err(RomError::Configuration(_))));
}

#[test]
fn rank_larger_than_training_set_is_reported() {
    let db = dataset::gaussian(4, 30).unwrap();
    let result = CrossValidation::new(KFold::new(2), ErrorMetric::RelativeL2).run(
        &db,
        &Pod::with_rank(3),
        &Rbf::default(),
    );
    assert!(matches!(
        result,
        Err(RomError::InsufficientSamples { .. })
    ));
}

#[test]
fn mismatched_sample_counts_are_rejected() {
    let result = Database::from_rows(
        vec![vec![0.0], vec![1.0], vec![2.0]],
        vec![vec![1.0, 2.0], vec![3.0, 4.0]],
    );
    assert!(matches!(result, Err(RomError::InvalidDatabase(_))));
}

#[test]
fn sweep_ranks_better_candidates_first() {
    let db = dataset::linear(10, 30).unwrap();
    let cv = CrossValidation::new(KFold::new(5), ErrorMetric::RelativeL2);
    let candidates = vec![
        Candidate {
            label: "rank 1".to_string(),
            reduction: ReductionMethod::Pod(Pod::with_rank(1)),
            approximation: ApproximationMethod::Linear(LinearRegression::new()),
        },
        Candidate {
            label: "rank 2".to_string(),
            reduction: ReductionMethod::Pod(Pod::with_rank(2)),
            approximation: ApproximationMethod::Linear(LinearRegression::new()),
        },
        Candidate {
            label: "rank 50".to_string(),
            reduction: ReductionMethod::Pod(Pod::with_rank(50)),
            approximation: ApproximationMethod::Linear(LinearRegression::new()),
        },
    ];
    let entries = sweep(&cv, &db, &candidates);
    let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
    assert_eq!(labels, vec!["rank 2", "rank 1", "rank 50"]);
    assert!(entries[2].outcome.is_err());
}

/// `fragile` のとき、学習点に μ = 0 が含まれないと数値的に破綻する線形回帰。
#[derive(Debug, Clone)]
struct Fragile {
    fragile: bool,
    inner: LinearRegression,
}

impl Fragile {
    fn new(fragile: bool) -> Self {
        Self {
            fragile,
            inner: LinearRegression::new(),
        }
    }
}

impl Approximation for Fragile {
    fn fit(&mut self, points: &DMatrix<f64>, values: &DMatrix<f64>) -> romcv::Result<()> {
        if self.fragile && !points.iter().any(|&p| p == 0.0) {
            return Err(RomError::Numerical("singular system".to_string()));
        }
        self.inner.fit(points, values)
    }

    fn predict(&self, points: &DMatrix<f64>) -> romcv::Result<DMatrix<f64>> {
        self.inner.predict(points)
    }
}

#[test]
fn sweep_places_infinite_means_after_finite_ones() {
    let db = dataset::linear(10, 30).unwrap();
    let cv = CrossValidation::new(KFold::new(5), ErrorMetric::RelativeL2);
    let candidates = vec![
        Candidate {
            label: "fragile".to_string(),
            reduction: Pod::with_rank(2),
            approximation: Fragile::new(true),
        },
        Candidate {
            label: "rank 1".to_string(),
            reduction: Pod::with_rank(1),
            approximation: Fragile::new(false),
        },
        Candidate {
            label: "rank 2".to_string(),
            reduction: Pod::with_rank(2),
            approximation: Fragile::new(false),
        },
    ];
    let entries = sweep(&cv, &db, &candidates);
    let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
    assert_eq!(labels, vec!["rank 2", "rank 1", "fragile"]);
    let fragile = entries[2].outcome.as_ref().unwrap();
    assert_eq!(fragile.fold_errors[0], f64::INFINITY);
    assert!(fragile.fold_errors[1..].iter().all(|e| e.is_finite()));
}

#[test]
fn experiment_runs_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("heat.json");
    let db = dataset::heat(12, 30, 5).unwrap();
    db.save(&data_path).unwrap();

    let config_path = dir.path().join("experiment.json");
    let document = format!(
        r#"{{
            "dataset": {{ "path": {:?} }},
            "reduction": {{ "method": "pod", "rank": {{ "energy": 0.999 }} }},
            "approximation": {{ "method": "rbf", "kernel": "thin_plate_spline" }},
            "validation": {{ "folds": 3, "shuffle": true, "seed": 9, "metric": "absolute_l2" }}
        }}"#,
        data_path.to_string_lossy()
    );
    fs::write(&config_path, document).unwrap();

    let config = ExperimentConfig::load(&config_path).unwrap();
    assert!(matches!(
        config.reduction,
        ReductionConfig::Pod(ref s) if s.rank == RankPolicy::Energy(0.999)
    ));
    assert!(matches!(config.approximation, ApproximationConfig::Rbf(_)));

    let loaded = config.dataset.load().unwrap();
    assert_eq!(loaded.len(), 12);
    let report = config
        .validation
        .cross_validation()
        .run(
            &loaded,
            &config.reduction.build(),
            &config.approximation.build(),
        )
        .unwrap();
    assert_eq!(report.fold_errors.len(), 3);
    assert!(report.fold_errors.iter().all(|e| e.is_finite()));
}
