use super::folds::KFold;
use super::metrics::{ErrorMetric, mean, sample_errors, std_dev};
use crate::approximation::Approximation;
use crate::database::Database;
use crate::error::{Result, RomError};
use crate::reduction::Reduction;
use crate::rom::ReducedOrderModel;
use std::cmp::Ordering;
use tracing::{debug, info, warn};

/// k 分割交差検証による縮約モデルの誤差推定。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossValidation {
    pub folds: KFold,
    pub metric: ErrorMetric,
}

/// 交差検証の結果。
#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidationReport {
    /// 分割ごとの平均誤差
    pub fold_errors: Vec<f64>,
    /// 各分割で検証に回したサンプルの添字
    pub held_out: Vec<Vec<usize>>,
    /// `held_out` と同じ並びのサンプルごとの誤差
    pub sample_errors: Vec<Vec<f64>>,
}

impl CrossValidationReport {
    pub fn fold_sizes(&self) -> Vec<usize> {
        self.held_out.iter().map(Vec::len).collect()
    }

    /// 分割ごとの平均誤差の平均。
    pub fn mean(&self) -> f64 {
        mean(&self.fold_errors)
    }

    pub fn std_dev(&self) -> f64 {
        std_dev(&self.fold_errors)
    }

    /// 検証誤差が最大のサンプルの添字と誤差。
    ///
    /// 新しいスナップショットを追加する候補の目安になります。
    pub fn worst_sample(&self) -> Option<(usize, f64)> {
        self.held_out
            .iter()
            .flatten()
            .copied()
            .zip(self.sample_errors.iter().flatten().copied())
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
    }
}

impl CrossValidation {
    pub fn new(folds: KFold, metric: ErrorMetric) -> Self {
        Self { folds, metric }
    }

    /// 各分割について、残りの分割で学習し、その分割を予測して誤差を集計します。
    ///
    /// `reduction` と `approximation` は分割ごとに複製してから学習するため、
    /// 呼び出し側のインスタンスは変更されず、分割間で基底が共有されることもありません。
    /// 学習サンプル不足や設定の誤りはエラーとして返し、数値計算の失敗は
    /// その分割の誤差を無限大として記録します。
    pub fn run<R, A>(
        &self,
        database: &Database,
        reduction: &R,
        approximation: &A,
    ) -> Result<CrossValidationReport>
    where
        R: Reduction + Clone,
        A: Approximation + Clone,
    {
        let folds = self.folds.partition(database.len())?;
        let k = folds.len();
        let mut fold_errors = Vec::with_capacity(k);
        let mut all_sample_errors = Vec::with_capacity(k);

        for (i, held_out) in folds.iter().enumerate() {
            let (train, test) = database.split(held_out)?;
            debug!(
                fold = i + 1,
                train = train.len(),
                test = test.len(),
                "分割の学習を開始"
            );
            let mut rom = ReducedOrderModel::new(train, reduction.clone(), approximation.clone());
            let outcome = match rom.fit() {
                Ok(()) => rom.predict(test.parameters()),
                Err(e) => Err(e),
            };
            let errors = match outcome {
                Ok(prediction) => sample_errors(&prediction, test.snapshots(), self.metric)?,
                Err(RomError::Numerical(message)) => {
                    warn!(fold = i + 1, %message, "数値計算に失敗したため誤差を無限大とします");
                    vec![f64::INFINITY; test.len()]
                }
                Err(e) => return Err(e),
            };
            let fold_error = mean(&errors);
            info!(fold = i + 1, of = k, error = fold_error, "分割の検証が完了");
            fold_errors.push(fold_error);
            all_sample_errors.push(errors);
        }

        Ok(CrossValidationReport {
            fold_errors,
            held_out: folds,
            sample_errors: all_sample_errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approximation::{LinearRegression, NearestNeighbors, Weighting};
    use crate::dataset;
    use crate::reduction::Pod;
    use nalgebra::DMatrix;

    /// 学習点に μ = 0 が含まれないと数値的に破綻する線形回帰。
    #[derive(Debug, Clone, Default)]
    struct NeedsOrigin(LinearRegression);

    impl Approximation for NeedsOrigin {
        fn fit(&mut self, points: &DMatrix<f64>, values: &DMatrix<f64>) -> Result<()> {
            if !points.iter().any(|&p| p == 0.0) {
                return Err(RomError::Numerical("μ = 0 がありません".to_string()));
            }
            self.0.fit(points, values)
        }

        fn predict(&self, points: &DMatrix<f64>) -> Result<DMatrix<f64>> {
            self.0.predict(points)
        }
    }

    #[test]
    fn report_shape_follows_folds() {
        let db = dataset::linear(11, 20).unwrap();
        let cv = CrossValidation::new(KFold::new(5), ErrorMetric::RelativeL2);
        let report = cv
            .run(&db, &Pod::with_rank(2), &LinearRegression::new())
            .unwrap();
        assert_eq!(report.fold_errors.len(), 5);
        assert_eq!(report.fold_sizes(), vec![3, 2, 2, 2, 2]);
        assert!(report.fold_errors.iter().all(|&e| e >= 0.0));
        assert!(report.mean() < 1e-10);
    }

    #[test]
    fn numerical_failure_marks_only_that_fold_as_infinite() {
        // 最初の分割が μ = 0 を検証に回すので、その分割の学習だけが失敗する
        let db = dataset::linear(10, 20).unwrap();
        let cv = CrossValidation::new(KFold::new(5), ErrorMetric::RelativeL2);
        let report = cv
            .run(&db, &Pod::with_rank(2), &NeedsOrigin::default())
            .unwrap();
        assert_eq!(report.fold_errors[0], f64::INFINITY);
        assert!(report.sample_errors[0].iter().all(|e| e.is_infinite()));
        assert!(report.fold_errors[1..].iter().all(|&e| e < 1e-10));
        assert_eq!(report.mean(), f64::INFINITY);
    }

    #[test]
    fn degenerate_fold_is_an_error() {
        let db = dataset::gaussian(6, 30).unwrap();
        let cv = CrossValidation::new(KFold::new(2), ErrorMetric::RelativeL2);
        let result = cv.run(&db, &Pod::with_rank(4), &LinearRegression::new());
        assert!(matches!(
            result,
            Err(RomError::InsufficientSamples {
                samples: 3,
                required: 4
            })
        ));
    }

    #[test]
    fn duplicated_samples_give_zero_error() {
        // 各サンプルが2回ずつ現れるので、leave-one-out では必ず同一の学習サンプルが残る
        let base = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let mut snapshots = DMatrix::zeros(6, 2);
        let mut parameters = DMatrix::zeros(6, 1);
        for i in 0..6 {
            snapshots.set_row(i, &base.row(i % 3));
            parameters[(i, 0)] = (i % 3) as f64;
        }
        let db = Database::new(parameters, snapshots).unwrap();
        let cv = CrossValidation::new(KFold::leave_one_out(6), ErrorMetric::RelativeL2);
        let report = cv
            .run(
                &db,
                &Pod::with_rank(2),
                &NearestNeighbors::new(1, Weighting::Uniform),
            )
            .unwrap();
        assert!(report.fold_errors.iter().all(|&e| e < 1e-12));
    }

    #[test]
    fn worst_sample_points_at_largest_error() {
        let report = CrossValidationReport {
            fold_errors: vec![0.1, 0.5],
            held_out: vec![vec![3, 0], vec![1, 2]],
            sample_errors: vec![vec![0.1, 0.1], vec![0.9, 0.1]],
        };
        assert_eq!(report.worst_sample(), Some((1, 0.9)));
    }

    #[test]
    fn input_methods_are_left_unfitted() {
        let db = dataset::linear(6, 10).unwrap();
        let pod = Pod::with_rank(2);
        let cv = CrossValidation::new(KFold::new(3), ErrorMetric::Rmse);
        cv.run(&db, &pod, &LinearRegression::new()).unwrap();
        assert_eq!(pod.rank(), None);
    }
}
