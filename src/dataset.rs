//! チュートリアル用のトイデータセット。
//!
//! いずれも1次元格子 `x ∈ [0, 1]` 上のスナップショットを生成します。

use crate::database::Database;
use crate::error::{Result, RomError};
use clap::ValueEnum;
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// 生成できるデータセットの種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    /// パラメータに対してアフィンなスナップショット
    Linear,
    /// 中心がパラメータで動くガウス型の山
    Gaussian,
    /// 1次元熱方程式の解（拡散係数と時刻の2パラメータ）
    Heat,
}

/// 種類を指定してデータセットを生成します。
pub fn generate(kind: DatasetKind, samples: usize, dimension: usize, seed: u64) -> Result<Database> {
    match kind {
        DatasetKind::Linear => linear(samples, dimension),
        DatasetKind::Gaussian => gaussian(samples, dimension),
        DatasetKind::Heat => heat(samples, dimension, seed),
    }
}

/// `s_j(μ) = sin(π x_j) + μ x_j`、`μ ∈ [0, 1]` は等間隔。
pub fn linear(samples: usize, dimension: usize) -> Result<Database> {
    check_size(samples, dimension)?;
    let grid = grid(dimension);
    let mu = equispaced(samples, 0.0, 1.0);
    let snapshots = DMatrix::from_fn(samples, dimension, |i, j| {
        (PI * grid[j]).sin() + mu[i] * grid[j]
    });
    Database::new(DMatrix::from_column_slice(samples, 1, &mu), snapshots)
}

/// `s_j(μ) = exp(-(x_j - μ)² / (2σ²))`、`σ = 0.1`、`μ ∈ [0.2, 0.8]`。
pub fn gaussian(samples: usize, dimension: usize) -> Result<Database> {
    check_size(samples, dimension)?;
    let sigma = 0.1;
    let grid = grid(dimension);
    let mu = equispaced(samples, 0.2, 0.8);
    let snapshots = DMatrix::from_fn(samples, dimension, |i, j| {
        (-(grid[j] - mu[i]).powi(2) / (2.0 * sigma * sigma)).exp()
    });
    Database::new(DMatrix::from_column_slice(samples, 1, &mu), snapshots)
}

/// 初期条件 `u(x, 0) = Σ sin(kπx) / k` の熱方程式の解。
///
/// パラメータ `(κ, t)` は `[0.1, 1] × [0.01, 0.2]` から一様に抽出します。
pub fn heat(samples: usize, dimension: usize, seed: u64) -> Result<Database> {
    check_size(samples, dimension)?;
    let n_terms = 5;
    let grid = grid(dimension);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut parameters = DMatrix::zeros(samples, 2);
    for i in 0..samples {
        parameters[(i, 0)] = rng.random_range(0.1..1.0);
        parameters[(i, 1)] = rng.random_range(0.01..0.2);
    }
    let snapshots = DMatrix::from_fn(samples, dimension, |i, j| {
        let (kappa, t) = (parameters[(i, 0)], parameters[(i, 1)]);
        (1..=n_terms)
            .map(|k| {
                let k = k as f64;
                (-kappa * (k * PI).powi(2) * t).exp() * (k * PI * grid[j]).sin() / k
            })
            .sum()
    });
    Database::new(parameters, snapshots)
}

fn check_size(samples: usize, dimension: usize) -> Result<()> {
    if samples < 2 || dimension < 1 {
        return Err(RomError::Configuration(format!(
            "データセットには2サンプル以上・1次元以上が必要です（samples={}, dim={}）",
            samples, dimension
        )));
    }
    Ok(())
}

fn grid(dimension: usize) -> Vec<f64> {
    equispaced(dimension, 0.0, 1.0)
}

fn equispaced(n: usize, start: f64, end: f64) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    (0..n)
        .map(|i| start + (end - start) * i as f64 / (n - 1) as f64)
        .collect()
}
