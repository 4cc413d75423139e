//! # 縮約モデル交差検証ライブラリ
//!
//! パラメータとスナップショットの組からなるデータベースに対して、
//! 次元削減（POD・オートエンコーダ）と近似（RBF・線形回帰・k 近傍・ニューラルネットワーク）を
//! 組み合わせた縮約モデル（ROM）を構築し、k 分割交差検証で予測誤差を評価します。
//!
//! ニューラルネットワークを使う手法は `burn` の NdArray バックエンドで学習します。

pub mod approximation;
pub mod cli;
pub mod compare;
pub mod config;
pub mod database;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod generate;
pub mod inspect;
pub mod logging;
pub mod model;
pub mod plot;
pub mod reduction;
pub mod rom;
pub mod scaling;
pub mod validate;

pub use database::Database;
pub use error::{Result, RomError};
pub use evaluation::{CrossValidation, CrossValidationReport, ErrorMetric, KFold};
pub use rom::ReducedOrderModel;
