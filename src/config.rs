//! 実験設定。
//!
//! JSON ファイルから読み込み、コマンドライン引数で個別に上書きします。
//! 省略した項目は既定値になります。
//!
//! ```json
//! {
//!   "dataset": { "kind": "heat", "samples": 40, "dimension": 100 },
//!   "reduction": { "method": "pod", "rank": { "fixed": 4 } },
//!   "approximation": { "method": "rbf", "kernel": "gaussian", "epsilon": 2.0 },
//!   "validation": { "folds": 5, "shuffle": true, "seed": 7 }
//! }
//! ```

use crate::approximation::{
    Ann, AnnConfig, ApproximationMethod, Kernel, LinearRegression, NearestNeighbors, Rbf, Weighting,
};
use crate::database::Database;
use crate::dataset::{self, DatasetKind};
use crate::error::Result;
use crate::evaluation::{CrossValidation, ErrorMetric, KFold};
use crate::reduction::{Autoencoder, AutoencoderConfig, Pod, PodMethod, RankPolicy, ReductionMethod};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub dataset: DatasetConfig,
    pub reduction: ReductionConfig,
    pub approximation: ApproximationConfig,
    pub validation: ValidationConfig,
}

impl ExperimentConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// データの取得元。`path` があればファイルを読み込み、なければトイデータを生成します。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub kind: DatasetKind,
    pub samples: usize,
    pub dimension: usize,
    pub seed: u64,
    pub path: Option<PathBuf>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            kind: DatasetKind::Gaussian,
            samples: 20,
            dimension: 100,
            seed: 0,
            path: None,
        }
    }
}

impl DatasetConfig {
    pub fn load(&self) -> Result<Database> {
        match &self.path {
            Some(path) => Database::load(path),
            None => dataset::generate(self.kind, self.samples, self.dimension, self.seed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ReductionConfig {
    Pod(PodSettings),
    Ae(AutoencoderConfig),
}

impl Default for ReductionConfig {
    fn default() -> Self {
        ReductionConfig::Pod(PodSettings::default())
    }
}

impl ReductionConfig {
    pub fn build(&self) -> ReductionMethod {
        match self {
            ReductionConfig::Pod(s) => ReductionMethod::Pod(Pod::new(s.decomposition, s.rank)),
            ReductionConfig::Ae(c) => ReductionMethod::Autoencoder(Autoencoder::new(c.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PodSettings {
    pub decomposition: PodMethod,
    pub rank: RankPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ApproximationConfig {
    Rbf(RbfSettings),
    Linear,
    Knn(KnnSettings),
    Ann(AnnConfig),
}

impl Default for ApproximationConfig {
    fn default() -> Self {
        ApproximationConfig::Rbf(RbfSettings::default())
    }
}

impl ApproximationConfig {
    pub fn build(&self) -> ApproximationMethod {
        match self {
            ApproximationConfig::Rbf(s) => ApproximationMethod::Rbf(
                Rbf::new(s.kernel, s.epsilon)
                    .with_smoothing(s.smoothing)
                    .with_polynomial(s.polynomial),
            ),
            ApproximationConfig::Linear => ApproximationMethod::Linear(LinearRegression::new()),
            ApproximationConfig::Knn(s) => {
                ApproximationMethod::NearestNeighbors(NearestNeighbors::new(s.neighbors, s.weighting))
            }
            ApproximationConfig::Ann(c) => ApproximationMethod::Ann(Ann::new(c.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RbfSettings {
    pub kernel: Kernel,
    pub epsilon: f64,
    pub smoothing: f64,
    pub polynomial: bool,
}

impl Default for RbfSettings {
    fn default() -> Self {
        Self {
            kernel: Kernel::default(),
            epsilon: 1.0,
            smoothing: 0.0,
            polynomial: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnnSettings {
    pub neighbors: usize,
    pub weighting: Weighting,
}

impl Default for KnnSettings {
    fn default() -> Self {
        Self {
            neighbors: 3,
            weighting: Weighting::Distance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub folds: usize,
    pub shuffle: bool,
    pub seed: u64,
    pub metric: ErrorMetric,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            folds: 5,
            shuffle: false,
            seed: 0,
            metric: ErrorMetric::RelativeL2,
        }
    }
}

impl ValidationConfig {
    pub fn kfold(&self) -> KFold {
        if self.shuffle {
            KFold::shuffled(self.folds, self.seed)
        } else {
            KFold::new(self.folds)
        }
    }

    pub fn cross_validation(&self) -> CrossValidation {
        CrossValidation::new(self.kfold(), self.metric)
    }
}
