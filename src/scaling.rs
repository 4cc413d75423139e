//! ニューラルネットワーク学習用の列ごとの min-max スケーリング。

use nalgebra::{DMatrix, RowDVector};

/// 各列を `[-1, 1]` に写すスケーラ。
///
/// 値が一定の列は幅を1として扱い、0除算を避けます。
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    min: RowDVector<f64>,
    range: RowDVector<f64>,
}

impl MinMaxScaler {
    pub fn fit(data: &DMatrix<f64>) -> Self {
        let ncols = data.ncols();
        let mut min = RowDVector::zeros(ncols);
        let mut range = RowDVector::zeros(ncols);
        for (j, column) in data.column_iter().enumerate() {
            let lo = column.min();
            let hi = column.max();
            min[j] = lo;
            range[j] = if hi - lo > f64::EPSILON { hi - lo } else { 1.0 };
        }
        Self { min, range }
    }

    pub fn dimension(&self) -> usize {
        self.min.len()
    }

    pub fn transform(&self, data: &DMatrix<f64>) -> DMatrix<f64> {
        DMatrix::from_fn(data.nrows(), data.ncols(), |i, j| {
            2.0 * (data[(i, j)] - self.min[j]) / self.range[j] - 1.0
        })
    }

    pub fn inverse_transform(&self, data: &DMatrix<f64>) -> DMatrix<f64> {
        DMatrix::from_fn(data.nrows(), data.ncols(), |i, j| {
            (data[(i, j)] + 1.0) / 2.0 * self.range[j] + self.min[j]
        })
    }
}
