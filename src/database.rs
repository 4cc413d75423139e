//! パラメータとスナップショットの組を保持するデータベース。

use crate::error::{Result, RomError};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// (パラメータ, スナップショット) の組の集合。
///
/// パラメータは `N × P`、スナップショットは `N × D` の行列として保持し、
/// 各行が1サンプルに対応します。構築後は変更されず、交差検証の各分割では
/// [`Database::split`] で新しいデータベースを作ります。
#[derive(Debug, Clone, PartialEq)]
pub struct Database {
    parameters: DMatrix<f64>,
    snapshots: DMatrix<f64>,
}

/// JSON ファイルとの入出力形式。
#[derive(Debug, Serialize, Deserialize)]
struct DatabaseFile {
    parameters: Vec<Vec<f64>>,
    snapshots: Vec<Vec<f64>>,
}

impl Database {
    /// 新しいデータベースを作成します。
    ///
    /// サンプル数の不一致、空の行列、有限でない値は [`RomError::InvalidDatabase`] になります。
    pub fn new(parameters: DMatrix<f64>, snapshots: DMatrix<f64>) -> Result<Self> {
        validate(&parameters, &snapshots)?;
        Ok(Self {
            parameters,
            snapshots,
        })
    }

    /// 行ベクトルのリストからデータベースを作成します。
    pub fn from_rows(parameters: Vec<Vec<f64>>, snapshots: Vec<Vec<f64>>) -> Result<Self> {
        let parameters = matrix_from_rows(&parameters, "パラメータ")?;
        let snapshots = matrix_from_rows(&snapshots, "スナップショット")?;
        Self::new(parameters, snapshots)
    }

    /// JSON ファイルからデータベースを読み込みます。
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let file: DatabaseFile = serde_json::from_str(&text)?;
        Self::from_rows(file.parameters, file.snapshots)
    }

    /// データベースを JSON ファイルに保存します。
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = DatabaseFile {
            parameters: rows_of(&self.parameters),
            snapshots: rows_of(&self.snapshots),
        };
        fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.parameters.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn parameter_dimension(&self) -> usize {
        self.parameters.ncols()
    }

    pub fn snapshot_dimension(&self) -> usize {
        self.snapshots.ncols()
    }

    pub fn parameters(&self) -> &DMatrix<f64> {
        &self.parameters
    }

    pub fn snapshots(&self) -> &DMatrix<f64> {
        &self.snapshots
    }

    /// `index` 番目のサンプルを (パラメータ, スナップショット) として返します。
    pub fn sample(&self, index: usize) -> Option<(DVector<f64>, DVector<f64>)> {
        if index >= self.len() {
            return None;
        }
        Some((
            self.parameters.row(index).transpose(),
            self.snapshots.row(index).transpose(),
        ))
    }

    /// 指定した添字のサンプルだけを含むデータベースを返します。
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        if indices.is_empty() {
            return Err(RomError::Configuration(
                "空の添字集合から部分データベースは作れません".to_string(),
            ));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(RomError::Configuration(format!(
                "添字 {} はサンプル数 {} を超えています",
                bad,
                self.len()
            )));
        }
        Ok(Self {
            parameters: self.parameters.select_rows(indices),
            snapshots: self.snapshots.select_rows(indices),
        })
    }

    /// `held_out` を除いた学習用データベースと、`held_out` のみのデータベースに分割します。
    ///
    /// 学習側は元の順序を保ち、検証側は `held_out` の順序に従います。
    pub fn split(&self, held_out: &[usize]) -> Result<(Self, Self)> {
        let mut mask = vec![false; self.len()];
        for &i in held_out {
            if i >= self.len() {
                return Err(RomError::Configuration(format!(
                    "添字 {} はサンプル数 {} を超えています",
                    i,
                    self.len()
                )));
            }
            mask[i] = true;
        }
        let held_in: Vec<usize> = (0..self.len()).filter(|&i| !mask[i]).collect();
        Ok((self.subset(&held_in)?, self.subset(held_out)?))
    }

    /// サンプルを追加します。追加分にも構築時と同じ検証を行います。
    pub fn add(&mut self, parameters: &DMatrix<f64>, snapshots: &DMatrix<f64>) -> Result<()> {
        validate(parameters, snapshots)?;
        if parameters.ncols() != self.parameter_dimension() {
            return Err(RomError::DimensionMismatch {
                expected: self.parameter_dimension(),
                found: parameters.ncols(),
            });
        }
        if snapshots.ncols() != self.snapshot_dimension() {
            return Err(RomError::DimensionMismatch {
                expected: self.snapshot_dimension(),
                found: snapshots.ncols(),
            });
        }
        let n = self.len();
        let m = parameters.nrows();
        let mut new_parameters = self.parameters.clone().resize_vertically(n + m, 0.0);
        new_parameters.rows_mut(n, m).copy_from(parameters);
        let mut new_snapshots = self.snapshots.clone().resize_vertically(n + m, 0.0);
        new_snapshots.rows_mut(n, m).copy_from(snapshots);
        self.parameters = new_parameters;
        self.snapshots = new_snapshots;
        Ok(())
    }
}

fn validate(parameters: &DMatrix<f64>, snapshots: &DMatrix<f64>) -> Result<()> {
    if parameters.nrows() != snapshots.nrows() {
        return Err(RomError::InvalidDatabase(format!(
            "パラメータのサンプル数 {} とスナップショットのサンプル数 {} が一致しません",
            parameters.nrows(),
            snapshots.nrows()
        )));
    }
    if parameters.nrows() == 0 {
        return Err(RomError::InvalidDatabase("サンプルがありません".to_string()));
    }
    if parameters.ncols() == 0 || snapshots.ncols() == 0 {
        return Err(RomError::InvalidDatabase(
            "パラメータとスナップショットの次元は1以上である必要があります".to_string(),
        ));
    }
    if parameters.iter().chain(snapshots.iter()).any(|v| !v.is_finite()) {
        return Err(RomError::InvalidDatabase(
            "有限でない値が含まれています".to_string(),
        ));
    }
    Ok(())
}

fn matrix_from_rows(rows: &[Vec<f64>], what: &str) -> Result<DMatrix<f64>> {
    let ncols = rows.first().map_or(0, Vec::len);
    if let Some(row) = rows.iter().position(|r| r.len() != ncols) {
        return Err(RomError::InvalidDatabase(format!(
            "{}の {} 行目の長さが {} ではありません",
            what, row, ncols
        )));
    }
    Ok(DMatrix::from_row_iterator(
        rows.len(),
        ncols,
        rows.iter().flatten().copied(),
    ))
}

fn rows_of(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    matrix
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Database {
        Database::from_rows(
            vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]],
            vec![
                vec![0.0, 0.0],
                vec![1.0, 2.0],
                vec![2.0, 4.0],
                vec![3.0, 6.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn mismatched_sample_counts_are_rejected() {
        let result = Database::new(DMatrix::zeros(3, 1), DMatrix::zeros(4, 2));
        assert!(matches!(result, Err(RomError::InvalidDatabase(_))));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let result = Database::from_rows(
            vec![vec![0.0], vec![1.0]],
            vec![vec![0.0, 1.0], vec![1.0]],
        );
        assert!(matches!(result, Err(RomError::InvalidDatabase(_))));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let result = Database::from_rows(vec![vec![f64::NAN]], vec![vec![1.0]]);
        assert!(matches!(result, Err(RomError::InvalidDatabase(_))));
    }

    #[test]
    fn split_keeps_held_in_order() {
        let db = small();
        let (train, test) = db.split(&[2, 0]).unwrap();
        assert_eq!(train.len(), 2);
        assert_eq!(train.parameters()[(0, 0)], 1.0);
        assert_eq!(train.parameters()[(1, 0)], 3.0);
        assert_eq!(test.parameters()[(0, 0)], 2.0);
        assert_eq!(test.parameters()[(1, 0)], 0.0);
        assert_eq!(test.snapshots()[(0, 1)], 4.0);
    }

    #[test]
    fn subset_rejects_out_of_range_index() {
        assert!(matches!(
            small().subset(&[0, 7]),
            Err(RomError::Configuration(_))
        ));
    }

    #[test]
    fn add_appends_samples() {
        let mut db = small();
        db.add(
            &DMatrix::from_row_slice(1, 1, &[4.0]),
            &DMatrix::from_row_slice(1, 2, &[4.0, 8.0]),
        )
        .unwrap();
        assert_eq!(db.len(), 5);
        let (mu, snapshot) = db.sample(4).unwrap();
        assert_eq!(mu[0], 4.0);
        assert_eq!(snapshot[1], 8.0);
    }

    #[test]
    fn add_checks_dimensions() {
        let mut db = small();
        let result = db.add(&DMatrix::zeros(1, 1), &DMatrix::zeros(1, 3));
        assert!(matches!(result, Err(RomError::DimensionMismatch { .. })));
    }

    #[test]
    fn json_round_trip_preserves_values() {
        let db = small();
        let file = tempfile::NamedTempFile::new().unwrap();
        db.save(file.path()).unwrap();
        let loaded = Database::load(file.path()).unwrap();
        assert_eq!(db, loaded);
    }
}
