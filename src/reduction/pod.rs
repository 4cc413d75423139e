use super::{Reduction, check_columns};
use crate::error::{Result, RomError};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// 特異値が無視できるとみなす相対閾値。
const NEGLIGIBLE: f64 = 1e-12;

/// POD 基底の計算方法。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodMethod {
    /// スナップショット行列の薄い特異値分解
    #[default]
    Svd,
    /// スナップショット法（相関行列 `X Xᵀ` の固有値分解）
    Correlation,
}

/// 保持するモード数の決め方。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankPolicy {
    /// 固定ランク
    Fixed(usize),
    /// 特異値の二乗和の累積比がこの値に達する最小ランク
    Energy(f64),
    /// Gavish-Donoho の最適ハード閾値
    Optimal,
    /// 無視できない特異値をすべて保持
    #[default]
    Full,
}

/// 固有直交分解 (Proper Orthogonal Decomposition)。
///
/// スナップショットは中心化しません。モードは特異値の降順に並びます。
#[derive(Debug, Clone, Default)]
pub struct Pod {
    method: PodMethod,
    policy: RankPolicy,
    modes: Option<DMatrix<f64>>,
    singular_values: Vec<f64>,
}

impl Pod {
    pub fn new(method: PodMethod, policy: RankPolicy) -> Self {
        Self {
            method,
            policy,
            modes: None,
            singular_values: Vec::new(),
        }
    }

    /// 固定ランクの SVD ベース POD。
    pub fn with_rank(rank: usize) -> Self {
        Self::new(PodMethod::Svd, RankPolicy::Fixed(rank))
    }

    pub fn method(&self) -> PodMethod {
        self.method
    }

    pub fn policy(&self) -> RankPolicy {
        self.policy
    }

    /// 学習で得られた全特異値（降順、切り捨て前）。
    pub fn singular_values(&self) -> &[f64] {
        &self.singular_values
    }

    /// `D × r` のモード行列。
    pub fn modes(&self) -> Option<&DMatrix<f64>> {
        self.modes.as_ref()
    }

    /// 累積エネルギー比 `Σ_{i≤k} σ_i² / Σ σ_i²`。
    pub fn cumulative_energy(&self) -> Vec<f64> {
        cumulative_energy(&self.singular_values)
    }

    fn decompose_svd(snapshots: &DMatrix<f64>) -> Result<(DMatrix<f64>, Vec<f64>)> {
        let svd = snapshots.transpose().svd(true, false);
        let u = svd
            .u
            .ok_or_else(|| RomError::Numerical("特異値分解で左特異ベクトルが得られません".to_string()))?;
        let order = descending_order(svd.singular_values.as_slice());
        let modes = u.select_columns(&order);
        let values = order.iter().map(|&i| svd.singular_values[i]).collect();
        Ok((modes, values))
    }

    fn decompose_correlation(snapshots: &DMatrix<f64>) -> Result<(DMatrix<f64>, Vec<f64>)> {
        let correlation = snapshots * snapshots.transpose();
        let eigen = correlation.symmetric_eigen();
        let order = descending_order(eigen.eigenvalues.as_slice());
        // 固有値は特異値の二乗なので、丸め誤差は λ_max·N·ε の大きさで残る
        let cutoff = order
            .first()
            .map_or(0.0, |&i| eigen.eigenvalues[i].max(0.0))
            * snapshots.nrows() as f64
            * f64::EPSILON;
        let values: Vec<f64> = order
            .iter()
            .map(|&i| {
                let lambda = eigen.eigenvalues[i];
                if lambda > cutoff { lambda.sqrt() } else { 0.0 }
            })
            .collect();
        let largest = values.first().copied().unwrap_or(0.0);
        // 特異値が0のモードは正規化できないため構成しない
        let usable: Vec<usize> = order
            .iter()
            .zip(&values)
            .filter(|&(_, &s)| s > NEGLIGIBLE * largest && s > 0.0)
            .map(|(&i, _)| i)
            .collect();
        let mut modes = DMatrix::zeros(snapshots.ncols(), usable.len());
        for (k, &i) in usable.iter().enumerate() {
            let v = eigen.eigenvectors.column(i);
            let mode = snapshots.transpose() * v / values[k];
            modes.set_column(k, &mode);
        }
        let keep = values.len().min(snapshots.nrows().min(snapshots.ncols()));
        Ok((modes, values.into_iter().take(keep).collect()))
    }

    fn select_rank(&self, values: &[f64], samples: usize, dimension: usize) -> Result<usize> {
        let available = samples.min(dimension);
        let largest = values.first().copied().unwrap_or(0.0);
        let rank = match self.policy {
            RankPolicy::Fixed(0) => {
                return Err(RomError::Configuration(
                    "POD のランクは1以上である必要があります".to_string(),
                ));
            }
            RankPolicy::Fixed(r) => {
                if r > available {
                    return Err(RomError::InsufficientSamples {
                        samples: available,
                        required: r,
                    });
                }
                r
            }
            RankPolicy::Energy(e) => {
                if !(e > 0.0 && e <= 1.0) {
                    return Err(RomError::Configuration(format!(
                        "エネルギー比 {} は (0, 1] の範囲外です",
                        e
                    )));
                }
                cumulative_energy(values)
                    .iter()
                    .position(|&c| c >= e - NEGLIGIBLE)
                    .map_or(values.len(), |i| i + 1)
            }
            RankPolicy::Optimal => {
                let beta = available as f64 / samples.max(dimension) as f64;
                let omega = 0.56 * beta.powi(3) - 0.95 * beta.powi(2) + 1.82 * beta + 1.43;
                let tau = omega * median(values);
                values.iter().filter(|&&s| s > tau).count()
            }
            RankPolicy::Full => values
                .iter()
                .filter(|&&s| s > NEGLIGIBLE * largest)
                .count(),
        };
        Ok(rank.max(1))
    }
}

impl Reduction for Pod {
    fn fit(&mut self, snapshots: &DMatrix<f64>) -> Result<()> {
        let (samples, dimension) = snapshots.shape();
        if samples == 0 || dimension == 0 {
            return Err(RomError::InsufficientSamples {
                samples,
                required: 1,
            });
        }
        // 分解の前にランク要求を検査し、退化した学習集合を早めに報告する
        if let RankPolicy::Fixed(r) = self.policy {
            if r > samples.min(dimension) {
                return Err(RomError::InsufficientSamples {
                    samples: samples.min(dimension),
                    required: r,
                });
            }
        }
        let (modes, values) = match self.method {
            PodMethod::Svd => Self::decompose_svd(snapshots)?,
            PodMethod::Correlation => Self::decompose_correlation(snapshots)?,
        };
        let rank = self.select_rank(&values, samples, dimension)?;
        // 線形独立なスナップショットが足りない学習集合は退化として報告する
        if rank > modes.ncols() {
            return Err(RomError::InsufficientSamples {
                samples: modes.ncols(),
                required: rank,
            });
        }
        debug!(
            rank,
            samples,
            dimension,
            method = ?self.method,
            "POD 基底を計算しました"
        );
        self.modes = Some(modes.columns(0, rank).into_owned());
        self.singular_values = values;
        Ok(())
    }

    fn reduce(&self, snapshots: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let modes = self.modes.as_ref().ok_or(RomError::NotFitted("POD"))?;
        check_columns(snapshots, modes.nrows())?;
        Ok(snapshots * modes)
    }

    fn expand(&self, reduced: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let modes = self.modes.as_ref().ok_or(RomError::NotFitted("POD"))?;
        check_columns(reduced, modes.ncols())?;
        Ok(reduced * modes.transpose())
    }

    fn rank(&self) -> Option<usize> {
        self.modes.as_ref().map(|m| m.ncols())
    }
}

fn descending_order(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(Ordering::Equal)
    });
    order
}

fn cumulative_energy(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().map(|s| s * s).sum();
    if total <= 0.0 {
        return vec![1.0; values.len()];
    }
    values
        .iter()
        .scan(0.0, |acc, s| {
            *acc += s * s;
            Some(*acc / total)
        })
        .collect()
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
