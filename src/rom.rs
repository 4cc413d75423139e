//! 次元削減と近似を組み合わせた縮約モデル。

use crate::approximation::Approximation;
use crate::database::Database;
use crate::error::{Result, RomError};
use crate::evaluation::{CrossValidation, CrossValidationReport, ErrorMetric, KFold, mean, sample_errors};
use crate::reduction::Reduction;
use nalgebra::DMatrix;
use tracing::info;

/// 非侵入型の縮約モデル。
///
/// `fit` でスナップショットの基底を求め、低次元表現をパラメータの関数として近似します。
/// `predict` は近似した低次元表現を元の次元に戻してスナップショットを予測します。
#[derive(Debug, Clone)]
pub struct ReducedOrderModel<R, A> {
    database: Database,
    reduction: R,
    approximation: A,
    fitted: bool,
}

impl<R, A> ReducedOrderModel<R, A>
where
    R: Reduction,
    A: Approximation,
{
    pub fn new(database: Database, reduction: R, approximation: A) -> Self {
        Self {
            database,
            reduction,
            approximation,
            fitted: false,
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn reduction(&self) -> &R {
        &self.reduction
    }

    pub fn approximation(&self) -> &A {
        &self.approximation
    }

    /// データベース全体で次元削減と近似を学習します。
    pub fn fit(&mut self) -> Result<()> {
        self.fitted = false;
        self.reduction.fit(self.database.snapshots())?;
        let reduced = self.reduction.reduce(self.database.snapshots())?;
        self.approximation
            .fit(self.database.parameters(), &reduced)?;
        self.fitted = true;
        Ok(())
    }

    /// `M × P` のパラメータに対する `M × D` のスナップショットを予測します。
    pub fn predict(&self, parameters: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if !self.fitted {
            return Err(RomError::NotFitted("縮約モデル"));
        }
        if parameters.ncols() != self.database.parameter_dimension() {
            return Err(RomError::DimensionMismatch {
                expected: self.database.parameter_dimension(),
                found: parameters.ncols(),
            });
        }
        let reduced = self.approximation.predict(parameters)?;
        self.reduction.expand(&reduced)
    }

    /// 別途用意したテストデータベースに対する平均誤差。
    pub fn test_error(&self, test: &Database, metric: ErrorMetric) -> Result<f64> {
        let prediction = self.predict(test.parameters())?;
        Ok(mean(&sample_errors(&prediction, test.snapshots(), metric)?))
    }
}

impl<R, A> ReducedOrderModel<R, A>
where
    R: Reduction + Clone,
    A: Approximation + Clone,
{
    /// k 分割交差検証の誤差。このモデル自身の学習状態は変更しません。
    pub fn kfold_cv_error(&self, folds: KFold, metric: ErrorMetric) -> Result<CrossValidationReport> {
        let report = CrossValidation::new(folds, metric).run(
            &self.database,
            &self.reduction,
            &self.approximation,
        )?;
        info!(
            k = folds.k,
            mean = report.mean(),
            std = report.std_dev(),
            "交差検証が完了しました"
        );
        Ok(report)
    }

    /// leave-one-out 交差検証の誤差。
    pub fn loo_error(&self, metric: ErrorMetric) -> Result<CrossValidationReport> {
        self.kfold_cv_error(KFold::leave_one_out(self.database.len()), metric)
    }
}
