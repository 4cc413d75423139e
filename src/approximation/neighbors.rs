use super::{Approximation, check_columns, check_training_pair, distance};
use crate::error::{Result, RomError};
use clap::ValueEnum;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 近傍値の重み付け。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// 単純平均
    #[default]
    Uniform,
    /// 距離の逆数で重み付け
    Distance,
}

/// k 近傍回帰。
///
/// 学習点と一致する問い合わせ点には、その学習点の値をそのまま返します。
#[derive(Debug, Clone)]
pub struct NearestNeighbors {
    k: usize,
    weighting: Weighting,
    fitted: Option<(DMatrix<f64>, DMatrix<f64>)>,
}

impl NearestNeighbors {
    pub fn new(k: usize, weighting: Weighting) -> Self {
        Self {
            k,
            weighting,
            fitted: None,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

impl Approximation for NearestNeighbors {
    fn fit(&mut self, points: &DMatrix<f64>, values: &DMatrix<f64>) -> Result<()> {
        self.fitted = None;
        if self.k == 0 {
            return Err(RomError::Configuration(
                "近傍数は1以上である必要があります".to_string(),
            ));
        }
        check_training_pair(points, values)?;
        if self.k > points.nrows() {
            return Err(RomError::InsufficientSamples {
                samples: points.nrows(),
                required: self.k,
            });
        }
        self.fitted = Some((points.clone(), values.clone()));
        Ok(())
    }

    fn predict(&self, points: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let (centers, values) = self
            .fitted
            .as_ref()
            .ok_or(RomError::NotFitted("k 近傍回帰"))?;
        check_columns(points, centers.ncols())?;

        let mut prediction = DMatrix::zeros(points.nrows(), values.ncols());
        for i in 0..points.nrows() {
            let mut nearest: Vec<(usize, f64)> = (0..centers.nrows())
                .map(|j| (j, distance(points, i, centers, j)))
                .collect();
            nearest.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
            nearest.truncate(self.k);

            let exact: Vec<usize> = nearest
                .iter()
                .filter(|(_, d)| *d == 0.0)
                .map(|&(j, _)| j)
                .collect();
            let weights: Vec<(usize, f64)> = if !exact.is_empty() {
                exact.into_iter().map(|j| (j, 1.0)).collect()
            } else {
                match self.weighting {
                    Weighting::Uniform => nearest.iter().map(|&(j, _)| (j, 1.0)).collect(),
                    Weighting::Distance => nearest.iter().map(|&(j, d)| (j, 1.0 / d)).collect(),
                }
            };
            let total: f64 = weights.iter().map(|(_, w)| w).sum();
            for &(j, w) in &weights {
                let mut row = prediction.row_mut(i);
                row += values.row(j) * (w / total);
            }
        }
        Ok(prediction)
    }
}
