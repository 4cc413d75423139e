use super::{Approximation, check_columns, check_training_pair, distance};
use crate::error::{Result, RomError};
use clap::ValueEnum;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// 放射基底関数のカーネル。`r` は距離、`ε` は形状パラメータ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kernel {
    /// `r`
    Linear,
    /// `r² log r`
    #[default]
    ThinPlateSpline,
    /// `r³`
    Cubic,
    /// `r⁵`
    Quintic,
    /// `exp(-(εr)²)`
    Gaussian,
    /// `sqrt(1 + (εr)²)`
    Multiquadric,
    /// `1 / sqrt(1 + (εr)²)`
    InverseMultiquadric,
    /// `1 / (1 + (εr)²)`
    InverseQuadratic,
}

impl Kernel {
    pub fn evaluate(self, r: f64, epsilon: f64) -> f64 {
        let er = epsilon * r;
        match self {
            Kernel::Linear => r,
            Kernel::ThinPlateSpline => {
                if r == 0.0 {
                    0.0
                } else {
                    r * r * r.ln()
                }
            }
            Kernel::Cubic => r.powi(3),
            Kernel::Quintic => r.powi(5),
            Kernel::Gaussian => (-er * er).exp(),
            Kernel::Multiquadric => (1.0 + er * er).sqrt(),
            Kernel::InverseMultiquadric => 1.0 / (1.0 + er * er).sqrt(),
            Kernel::InverseQuadratic => 1.0 / (1.0 + er * er),
        }
    }
}

#[derive(Debug, Clone)]
struct Fitted {
    centers: DMatrix<f64>,
    /// `N × r` のカーネル重み
    weights: DMatrix<f64>,
    /// `(P + 1) × r` のアフィン項の係数
    polynomial: Option<DMatrix<f64>>,
}

/// 放射基底関数補間。
///
/// アフィン多項式項を付けた場合、線形なデータは正確に再現されます。
/// 平滑化パラメータ `λ > 0` のときは補間ではなく回帰になります。
#[derive(Debug, Clone)]
pub struct Rbf {
    kernel: Kernel,
    epsilon: f64,
    smoothing: f64,
    polynomial: bool,
    fitted: Option<Fitted>,
}

impl Default for Rbf {
    fn default() -> Self {
        Self::new(Kernel::default(), 1.0)
    }
}

impl Rbf {
    pub fn new(kernel: Kernel, epsilon: f64) -> Self {
        Self {
            kernel,
            epsilon,
            smoothing: 0.0,
            polynomial: true,
            fitted: None,
        }
    }

    pub fn with_smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn with_polynomial(mut self, polynomial: bool) -> Self {
        self.polynomial = polynomial;
        self
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    fn validate(&self) -> Result<()> {
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(RomError::Configuration(format!(
                "RBF の形状パラメータ {} は正の有限値である必要があります",
                self.epsilon
            )));
        }
        if !(self.smoothing >= 0.0 && self.smoothing.is_finite()) {
            return Err(RomError::Configuration(format!(
                "RBF の平滑化パラメータ {} は0以上である必要があります",
                self.smoothing
            )));
        }
        Ok(())
    }
}

impl Approximation for Rbf {
    fn fit(&mut self, points: &DMatrix<f64>, values: &DMatrix<f64>) -> Result<()> {
        self.validate()?;
        check_training_pair(points, values)?;
        self.fitted = None;

        let (n, p) = points.shape();
        let tail = if self.polynomial { p + 1 } else { 0 };
        let size = n + tail;

        let mut system = DMatrix::zeros(size, size);
        for i in 0..n {
            for j in i..n {
                let phi = self.kernel.evaluate(distance(points, i, points, j), self.epsilon);
                system[(i, j)] = phi;
                system[(j, i)] = phi;
            }
            system[(i, i)] += self.smoothing;
            if self.polynomial {
                system[(i, n)] = 1.0;
                system[(n, i)] = 1.0;
                for k in 0..p {
                    system[(i, n + 1 + k)] = points[(i, k)];
                    system[(n + 1 + k, i)] = points[(i, k)];
                }
            }
        }
        let mut rhs = DMatrix::zeros(size, values.ncols());
        rhs.rows_mut(0, n).copy_from(values);

        let solution = match system.clone().lu().solve(&rhs) {
            Some(s) if s.iter().all(|v| v.is_finite()) => s,
            _ => {
                warn!(samples = n, "RBF の連立方程式が特異のため最小二乗解を使います");
                system
                    .svd(true, true)
                    .solve(&rhs, 1e-12)
                    .map_err(|e| RomError::Numerical(format!("RBF の求解に失敗しました: {}", e)))?
            }
        };
        if solution.iter().any(|v| !v.is_finite()) {
            return Err(RomError::Numerical(
                "RBF の係数に有限でない値が含まれています".to_string(),
            ));
        }
        debug!(samples = n, kernel = ?self.kernel, "RBF を構築しました");

        self.fitted = Some(Fitted {
            centers: points.clone(),
            weights: solution.rows(0, n).into_owned(),
            polynomial: self
                .polynomial
                .then(|| solution.rows(n, tail).into_owned()),
        });
        Ok(())
    }

    fn predict(&self, points: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let fitted = self.fitted.as_ref().ok_or(RomError::NotFitted("RBF"))?;
        check_columns(points, fitted.centers.ncols())?;
        let (m, p) = points.shape();
        let n = fitted.centers.nrows();

        let basis = DMatrix::from_fn(m, n, |i, j| {
            self.kernel
                .evaluate(distance(points, i, &fitted.centers, j), self.epsilon)
        });
        let mut prediction = basis * &fitted.weights;
        if let Some(coefficients) = &fitted.polynomial {
            let affine = DMatrix::from_fn(m, p + 1, |i, k| if k == 0 { 1.0 } else { points[(i, k - 1)] });
            prediction += affine * coefficients;
        }
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn samples() -> (DMatrix<f64>, DMatrix<f64>) {
        let x = DMatrix::from_row_slice(5, 1, &[0.0, 0.25, 0.5, 0.75, 1.0]);
        let y = x.map(|v: f64| (3.0 * v).sin());
        (x, y)
    }

    #[test]
    fn interpolates_training_points() {
        let (x, y) = samples();
        for kernel in [
            Kernel::Linear,
            Kernel::ThinPlateSpline,
            Kernel::Cubic,
            Kernel::Gaussian,
            Kernel::Multiquadric,
            Kernel::InverseMultiquadric,
            Kernel::InverseQuadratic,
        ] {
            let mut rbf = Rbf::new(kernel, 2.0);
            rbf.fit(&x, &y).unwrap();
            assert_relative_eq!(rbf.predict(&x).unwrap(), y, epsilon = 1e-8);
        }
    }

    #[test]
    fn affine_tail_reproduces_linear_data() {
        let x = DMatrix::from_row_slice(4, 2, &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let y = DMatrix::from_fn(4, 1, |i, _| 2.0 * x[(i, 0)] - x[(i, 1)] + 0.5);
        let mut rbf = Rbf::default();
        rbf.fit(&x, &y).unwrap();
        let query = DMatrix::from_row_slice(2, 2, &[0.3, 0.6, 2.0, -1.0]);
        let expected = DMatrix::from_row_slice(2, 1, &[0.5, 5.5]);
        assert_relative_eq!(rbf.predict(&query).unwrap(), expected, epsilon = 1e-8);
    }

    #[test]
    fn smoothing_turns_interpolation_into_regression() {
        let (x, y) = samples();
        let mut rbf = Rbf::new(Kernel::Gaussian, 1.0).with_smoothing(10.0);
        rbf.fit(&x, &y).unwrap();
        let residual = (rbf.predict(&x).unwrap() - &y).norm();
        assert!(residual > 1e-6);
    }

    #[test]
    fn invalid_epsilon_is_a_configuration_error() {
        let (x, y) = samples();
        let mut rbf = Rbf::new(Kernel::Gaussian, 0.0);
        assert!(matches!(rbf.fit(&x, &y), Err(RomError::Configuration(_))));
    }

    #[test]
    fn predict_checks_parameter_dimension() {
        let (x, y) = samples();
        let mut rbf = Rbf::default();
        rbf.fit(&x, &y).unwrap();
        assert!(matches!(
            rbf.predict(&DMatrix::zeros(1, 2)),
            Err(RomError::DimensionMismatch { .. })
        ));
    }
}
