//! 縮約モデルの誤差評価。
//!
//! 交差検証ではデータベースを k 個に分割し、各分割について残りで
//! {次元削減, 近似} を学習し直して予測誤差を測ります。
//! 分割ごとの学習は互いに独立で、共有するのは読み取り専用のデータベースだけです。

mod cross_validation;
mod folds;
mod metrics;
mod sweep;

pub use cross_validation::{CrossValidation, CrossValidationReport};
pub use folds::{FoldOrder, KFold, fold_sizes};
pub use metrics::{ErrorMetric, mean, sample_errors, std_dev};
pub use sweep::{Candidate, SweepEntry, sweep};
