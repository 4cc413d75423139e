//! 予測誤差の尺度。

use crate::error::{Result, RomError};
use clap::ValueEnum;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// サンプルごとの誤差の測り方。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMetric {
    /// `‖予測 − 真値‖₂ / ‖真値‖₂`（真値が0なら分母なし）
    #[default]
    RelativeL2,
    /// `‖予測 − 真値‖₂`
    AbsoluteL2,
    /// 二乗平均平方根誤差
    Rmse,
    /// 最大絶対誤差
    MaxAbsolute,
}

impl ErrorMetric {
    /// 1サンプル分の誤差。常に0以上で、完全一致なら0です。
    pub fn evaluate(self, prediction: &[f64], truth: &[f64]) -> f64 {
        let diff = prediction.iter().zip(truth).map(|(p, t)| p - t);
        match self {
            ErrorMetric::RelativeL2 => {
                let num = diff.map(|d| d * d).sum::<f64>().sqrt();
                let den = truth.iter().map(|t| t * t).sum::<f64>().sqrt();
                if den > 0.0 { num / den } else { num }
            }
            ErrorMetric::AbsoluteL2 => diff.map(|d| d * d).sum::<f64>().sqrt(),
            ErrorMetric::Rmse => {
                if truth.is_empty() {
                    0.0
                } else {
                    (diff.map(|d| d * d).sum::<f64>() / truth.len() as f64).sqrt()
                }
            }
            ErrorMetric::MaxAbsolute => diff.map(f64::abs).fold(0.0, f64::max),
        }
    }
}

/// 行ごとの誤差を計算します。
pub fn sample_errors(
    prediction: &DMatrix<f64>,
    truth: &DMatrix<f64>,
    metric: ErrorMetric,
) -> Result<Vec<f64>> {
    if prediction.shape() != truth.shape() {
        return Err(RomError::DimensionMismatch {
            expected: truth.len(),
            found: prediction.len(),
        });
    }
    Ok(prediction
        .row_iter()
        .zip(truth.row_iter())
        .map(|(p, t)| {
            let p: Vec<f64> = p.iter().copied().collect();
            let t: Vec<f64> = t.iter().copied().collect();
            metric.evaluate(&p, &t)
        })
        .collect())
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// 母標準偏差。
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identical_vectors_have_zero_error() {
        let v = [1.0, -2.0, 3.5];
        for metric in [
            ErrorMetric::RelativeL2,
            ErrorMetric::AbsoluteL2,
            ErrorMetric::Rmse,
            ErrorMetric::MaxAbsolute,
        ] {
            assert_eq!(metric.evaluate(&v, &v), 0.0);
        }
    }

    #[test]
    fn metrics_match_hand_computation() {
        let p = [3.0, 4.0];
        let t = [0.0, 0.0];
        assert_relative_eq!(ErrorMetric::RelativeL2.evaluate(&p, &t), 5.0);
        let t = [3.0, 0.0];
        assert_relative_eq!(ErrorMetric::RelativeL2.evaluate(&p, &t), 4.0 / 3.0);
        assert_relative_eq!(ErrorMetric::AbsoluteL2.evaluate(&p, &t), 4.0);
        assert_relative_eq!(ErrorMetric::Rmse.evaluate(&p, &t), 8.0f64.sqrt());
        assert_relative_eq!(ErrorMetric::MaxAbsolute.evaluate(&p, &t), 4.0);
    }

    #[test]
    fn sample_errors_are_non_negative_and_row_wise() {
        let p = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, -1.0, 0.0]);
        let t = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 0.0]);
        let e = sample_errors(&p, &t, ErrorMetric::AbsoluteL2).unwrap();
        assert_eq!(e, vec![0.0, 2.0]);
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let p = DMatrix::zeros(2, 2);
        let t = DMatrix::zeros(2, 3);
        assert!(sample_errors(&p, &t, ErrorMetric::Rmse).is_err());
    }

    #[test]
    fn mean_and_std_dev() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
        assert_relative_eq!(std_dev(&[1.0, 3.0]), 1.0);
        assert_eq!(mean(&[]), 0.0);
    }
}
