use super::{Approximation, check_columns, check_training_pair};
use crate::error::{Result, RomError};
use nalgebra::DMatrix;

/// アフィン最小二乗回帰 `[1, μ] · C`。
///
/// サンプル数が未知数より少ない場合は最小ノルム解になります。
#[derive(Debug, Clone, Default)]
pub struct LinearRegression {
    coefficients: Option<DMatrix<f64>>,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(P + 1) × r` の係数行列。先頭行が切片。
    pub fn coefficients(&self) -> Option<&DMatrix<f64>> {
        self.coefficients.as_ref()
    }
}

fn design(points: &DMatrix<f64>) -> DMatrix<f64> {
    let (n, p) = points.shape();
    DMatrix::from_fn(n, p + 1, |i, k| if k == 0 { 1.0 } else { points[(i, k - 1)] })
}

impl Approximation for LinearRegression {
    fn fit(&mut self, points: &DMatrix<f64>, values: &DMatrix<f64>) -> Result<()> {
        check_training_pair(points, values)?;
        self.coefficients = None;
        let coefficients = design(points)
            .svd(true, true)
            .solve(values, 1e-12)
            .map_err(|e| RomError::Numerical(format!("最小二乗解の計算に失敗しました: {}", e)))?;
        if coefficients.iter().any(|v| !v.is_finite()) {
            return Err(RomError::Numerical(
                "回帰係数に有限でない値が含まれています".to_string(),
            ));
        }
        self.coefficients = Some(coefficients);
        Ok(())
    }

    fn predict(&self, points: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(RomError::NotFitted("線形回帰"))?;
        check_columns(points, coefficients.nrows() - 1)?;
        Ok(design(points) * coefficients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn recovers_affine_map() {
        let x = DMatrix::from_row_slice(4, 1, &[0.0, 1.0, 2.0, 3.0]);
        let y = DMatrix::from_fn(4, 2, |i, j| x[(i, 0)] * (j as f64 + 1.0) + 1.0);
        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        let c = model.coefficients().unwrap();
        assert_relative_eq!(c[(0, 0)], 1.0, epsilon = 1e-10);
        assert_relative_eq!(c[(1, 1)], 2.0, epsilon = 1e-10);
        let q = DMatrix::from_row_slice(1, 1, &[10.0]);
        let expected = DMatrix::from_row_slice(1, 2, &[11.0, 21.0]);
        assert_relative_eq!(model.predict(&q).unwrap(), expected, epsilon = 1e-9);
    }

    #[test]
    fn least_squares_on_noisy_data() {
        let x = DMatrix::from_row_slice(4, 1, &[0.0, 1.0, 2.0, 3.0]);
        let y = DMatrix::from_row_slice(4, 1, &[0.1, 0.9, 2.1, 2.9]);
        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        let c = model.coefficients().unwrap();
        assert_relative_eq!(c[(1, 0)], 0.96, epsilon = 1e-10);
    }

    #[test]
    fn unfitted_model_reports_not_fitted() {
        assert!(matches!(
            LinearRegression::new().predict(&DMatrix::zeros(1, 1)),
            Err(RomError::NotFitted(_))
        ));
    }
}
