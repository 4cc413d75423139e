//! ライブラリ共通のエラー型。

use thiserror::Error;

/// 縮約モデルの構築・評価で発生するエラー。
#[derive(Error, Debug)]
pub enum RomError {
    /// データベース構築時の検証エラー
    #[error("不正なデータベース: {0}")]
    InvalidDatabase(String),

    /// 設定値のエラー
    #[error("設定エラー: {0}")]
    Configuration(String),

    /// 学習用サンプルが要求ランク（または近傍数）に対して不足している
    #[error("学習サンプル数 {samples} が不足しています（必要数: {required}）")]
    InsufficientSamples { samples: usize, required: usize },

    /// 行列の形状が一致しない
    #[error("次元が一致しません: 期待値 {expected}, 実際 {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// `fit` 前に使用された
    #[error("{0} は学習されていません")]
    NotFitted(&'static str),

    /// 数値計算の失敗（特異行列、NaN など）
    #[error("数値計算エラー: {0}")]
    Numerical(String),

    #[error("入出力エラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("シリアライズエラー: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// `RomError` を用いた Result 型。
pub type Result<T> = std::result::Result<T, RomError>;
