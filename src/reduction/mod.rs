//! 次元削減手法。
//!
//! スナップショット行列 (`N × D`、各行が1サンプル) から低次元表現 (`N × r`) への
//! 写像と、その逆写像を提供します。

mod autoencoder;
mod pod;

pub use autoencoder::{Autoencoder, AutoencoderConfig};
pub use pod::{Pod, PodMethod, RankPolicy};

use crate::error::{Result, RomError};
use nalgebra::DMatrix;

/// 次元削減手法の共通インターフェース。
///
/// `fit` は毎回ゼロから基底を計算し直し、以前の学習結果に依存してはいけません。
/// 交差検証では学習済みのインスタンスを複製して別の分割で再学習するためです。
pub trait Reduction {
    /// 学習用スナップショットから基底を計算します。
    fn fit(&mut self, snapshots: &DMatrix<f64>) -> Result<()>;

    /// `M × D` のスナップショットを `M × r` の低次元表現に写します。
    fn reduce(&self, snapshots: &DMatrix<f64>) -> Result<DMatrix<f64>>;

    /// `M × r` の低次元表現を `M × D` のスナップショットに戻します。
    fn expand(&self, reduced: &DMatrix<f64>) -> Result<DMatrix<f64>>;

    /// 学習後のランク。
    fn rank(&self) -> Option<usize>;
}

/// CLI や設定ファイルから選択される次元削減手法。
#[derive(Debug, Clone)]
pub enum ReductionMethod {
    Pod(Pod),
    Autoencoder(Autoencoder),
}

impl Reduction for ReductionMethod {
    fn fit(&mut self, snapshots: &DMatrix<f64>) -> Result<()> {
        match self {
            ReductionMethod::Pod(r) => r.fit(snapshots),
            ReductionMethod::Autoencoder(r) => r.fit(snapshots),
        }
    }

    fn reduce(&self, snapshots: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        match self {
            ReductionMethod::Pod(r) => r.reduce(snapshots),
            ReductionMethod::Autoencoder(r) => r.reduce(snapshots),
        }
    }

    fn expand(&self, reduced: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        match self {
            ReductionMethod::Pod(r) => r.expand(reduced),
            ReductionMethod::Autoencoder(r) => r.expand(reduced),
        }
    }

    fn rank(&self) -> Option<usize> {
        match self {
            ReductionMethod::Pod(r) => r.rank(),
            ReductionMethod::Autoencoder(r) => r.rank(),
        }
    }
}

fn check_columns(matrix: &DMatrix<f64>, expected: usize) -> Result<()> {
    if matrix.ncols() != expected {
        return Err(RomError::DimensionMismatch {
            expected,
            found: matrix.ncols(),
        });
    }
    Ok(())
}
