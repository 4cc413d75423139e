//! パラメータから低次元表現への近似手法。

mod ann;
mod linear;
mod neighbors;
mod rbf;

pub use ann::{Ann, AnnConfig};
pub use linear::LinearRegression;
pub use neighbors::{NearestNeighbors, Weighting};
pub use rbf::{Kernel, Rbf};

use crate::error::{Result, RomError};
use nalgebra::DMatrix;

/// 近似手法の共通インターフェース。
///
/// [`crate::reduction::Reduction`] と同様、`fit` は毎回ゼロから学習し直します。
pub trait Approximation {
    /// `N × P` のパラメータと `N × r` の値から近似を構築します。
    fn fit(&mut self, points: &DMatrix<f64>, values: &DMatrix<f64>) -> Result<()>;

    /// `M × P` のパラメータに対する `M × r` の予測値を返します。
    fn predict(&self, points: &DMatrix<f64>) -> Result<DMatrix<f64>>;
}

/// CLI や設定ファイルから選択される近似手法。
#[derive(Debug, Clone)]
pub enum ApproximationMethod {
    Rbf(Rbf),
    Linear(LinearRegression),
    NearestNeighbors(NearestNeighbors),
    Ann(Ann),
}

impl Approximation for ApproximationMethod {
    fn fit(&mut self, points: &DMatrix<f64>, values: &DMatrix<f64>) -> Result<()> {
        match self {
            ApproximationMethod::Rbf(a) => a.fit(points, values),
            ApproximationMethod::Linear(a) => a.fit(points, values),
            ApproximationMethod::NearestNeighbors(a) => a.fit(points, values),
            ApproximationMethod::Ann(a) => a.fit(points, values),
        }
    }

    fn predict(&self, points: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        match self {
            ApproximationMethod::Rbf(a) => a.predict(points),
            ApproximationMethod::Linear(a) => a.predict(points),
            ApproximationMethod::NearestNeighbors(a) => a.predict(points),
            ApproximationMethod::Ann(a) => a.predict(points),
        }
    }
}

fn check_training_pair(points: &DMatrix<f64>, values: &DMatrix<f64>) -> Result<()> {
    if points.nrows() != values.nrows() {
        return Err(RomError::DimensionMismatch {
            expected: points.nrows(),
            found: values.nrows(),
        });
    }
    if points.nrows() == 0 {
        return Err(RomError::InsufficientSamples {
            samples: 0,
            required: 1,
        });
    }
    Ok(())
}

fn check_columns(points: &DMatrix<f64>, expected: usize) -> Result<()> {
    if points.ncols() != expected {
        return Err(RomError::DimensionMismatch {
            expected,
            found: points.ncols(),
        });
    }
    Ok(())
}

/// 2行間のユークリッド距離。
fn distance(a: &DMatrix<f64>, i: usize, b: &DMatrix<f64>, j: usize) -> f64 {
    (a.row(i) - b.row(j)).norm()
}
