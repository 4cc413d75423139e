//! 手法の組み合わせごとの交差検証誤差の比較。

use super::cross_validation::{CrossValidation, CrossValidationReport};
use crate::approximation::Approximation;
use crate::database::Database;
use crate::reduction::Reduction;
use std::cmp::Ordering;
use tracing::{info, warn};

/// 比較対象の1つの組み合わせ。
#[derive(Debug, Clone)]
pub struct Candidate<R, A> {
    pub label: String,
    pub reduction: R,
    pub approximation: A,
}

/// 1つの組み合わせの結果。失敗した場合はエラーメッセージを保持します。
#[derive(Debug, Clone)]
pub struct SweepEntry {
    pub label: String,
    pub outcome: std::result::Result<CrossValidationReport, String>,
}

impl SweepEntry {
    pub fn mean(&self) -> Option<f64> {
        self.outcome.as_ref().ok().map(CrossValidationReport::mean)
    }
}

/// すべての組み合わせで交差検証を行い、平均誤差の小さい順に並べて返します。
///
/// 失敗した組み合わせは末尾に置かれ、残りの比較は継続します。
pub fn sweep<R, A>(
    validation: &CrossValidation,
    database: &Database,
    candidates: &[Candidate<R, A>],
) -> Vec<SweepEntry>
where
    R: Reduction + Clone,
    A: Approximation + Clone,
{
    let mut entries: Vec<SweepEntry> = candidates
        .iter()
        .map(|candidate| {
            let outcome = validation
                .run(database, &candidate.reduction, &candidate.approximation)
                .map_err(|e| e.to_string());
            match &outcome {
                Ok(report) => info!(label = %candidate.label, mean = report.mean(), "比較候補を評価"),
                Err(message) => warn!(label = %candidate.label, %message, "比較候補の評価に失敗"),
            }
            SweepEntry {
                label: candidate.label.clone(),
                outcome,
            }
        })
        .collect();

    entries.sort_by(|a, b| match (a.mean(), b.mean()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    entries
}
