//! k 分割の添字生成。

use crate::error::{Result, RomError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// 分割前に添字を並べ替えるかどうか。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoldOrder {
    /// 添字順に連続した区間に分割する
    #[default]
    Contiguous,
    /// シードで再現可能な乱数順に並べ替えてから分割する
    Shuffled { seed: u64 },
}

/// k 分割交差検証の分割方法。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KFold {
    pub k: usize,
    #[serde(default)]
    pub order: FoldOrder,
}

impl KFold {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            order: FoldOrder::Contiguous,
        }
    }

    pub fn shuffled(k: usize, seed: u64) -> Self {
        Self {
            k,
            order: FoldOrder::Shuffled { seed },
        }
    }

    /// 1サンプルずつ取り出す leave-one-out 分割。
    pub fn leave_one_out(n: usize) -> Self {
        Self::new(n)
    }

    /// `0..n` を k 個の互いに素な分割に分けます。
    ///
    /// `1 < k ≤ n` でなければ [`RomError::Configuration`] です。分割の大きさは
    /// `n / k` で、余り `n % k` 個は先頭の分割から1つずつ割り当てます。
    pub fn partition(&self, n: usize) -> Result<Vec<Vec<usize>>> {
        let sizes = fold_sizes(n, self.k)?;
        let mut indices: Vec<usize> = (0..n).collect();
        if let FoldOrder::Shuffled { seed } = self.order {
            let mut rng = StdRng::seed_from_u64(seed);
            indices.shuffle(&mut rng);
        }
        let mut folds = Vec::with_capacity(self.k);
        let mut start = 0;
        for size in sizes {
            folds.push(indices[start..start + size].to_vec());
            start += size;
        }
        Ok(folds)
    }
}

/// 各分割の大きさ。
pub fn fold_sizes(n: usize, k: usize) -> Result<Vec<usize>> {
    if k < 2 || k > n {
        return Err(RomError::Configuration(format!(
            "分割数 k={} はサンプル数 n={} に対して 1 < k ≤ n を満たしません",
            k, n
        )));
    }
    let base = n / k;
    let remainder = n % k;
    Ok((0..k)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect())
}
