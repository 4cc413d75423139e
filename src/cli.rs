use crate::approximation::Kernel;
use crate::config::{
    ApproximationConfig, DatasetConfig, ExperimentConfig, KnnSettings, PodSettings, RbfSettings,
    ReductionConfig,
};
use crate::dataset::DatasetKind;
use crate::error::{Result, RomError};
use crate::evaluation::ErrorMetric;
use crate::reduction::{AutoencoderConfig, PodMethod, RankPolicy};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// clapでコマンドラインの構造を定義します。
#[derive(Parser, Debug)]
#[command(author, version, about = "Reduced order model cross-validation toolkit", long_about = None)]
pub struct Cli {
    /// ログレベル（RUST_LOG が設定されていればそちらを優先）
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// 実行するサブコマンドを定義します。
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// トイデータセットを生成して JSON に保存します
    Generate(GenerateArgs),
    /// POD の特異値と累積エネルギーを表示します
    Pod(PodArgs),
    /// k 分割交差検証を実行します
    Cv(ValidateArgs),
    /// leave-one-out 交差検証を実行します
    Loo(ValidateArgs),
    /// POD ランクと近似手法の組み合わせを比較します
    Compare(CompareArgs),
}

/// データの取得元の指定。
#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    /// 生成するトイデータセット
    #[arg(long, value_enum)]
    pub dataset: Option<DatasetKind>,
    /// サンプル数
    #[arg(long)]
    pub samples: Option<usize>,
    /// スナップショットの次元
    #[arg(long)]
    pub dim: Option<usize>,
    /// データ生成の乱数シード
    #[arg(long)]
    pub seed: Option<u64>,
    /// JSON データベースファイル（指定時は生成しない）
    #[arg(long, conflicts_with = "dataset")]
    pub input: Option<PathBuf>,
}

impl DataArgs {
    pub fn apply(&self, config: &mut DatasetConfig) {
        if let Some(kind) = self.dataset {
            config.kind = kind;
            config.path = None;
        }
        if let Some(samples) = self.samples {
            config.samples = samples;
        }
        if let Some(dim) = self.dim {
            config.dimension = dim;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(input) = &self.input {
            config.path = Some(input.clone());
        }
    }
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub data: DataArgs,
    /// 出力先
    #[arg(long, short)]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct PodArgs {
    #[command(flatten)]
    pub data: DataArgs,
    /// スナップショット法（相関行列）で計算する
    #[arg(long)]
    pub correlation: bool,
    /// 特異値のグラフの出力先
    #[arg(long)]
    pub plot: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReductionKind {
    Pod,
    Ae,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ApproximationKind {
    Rbf,
    Linear,
    Knn,
    Ann,
}

impl ApproximationKind {
    fn of(config: &ApproximationConfig) -> Self {
        match config {
            ApproximationConfig::Rbf(_) => ApproximationKind::Rbf,
            ApproximationConfig::Linear => ApproximationKind::Linear,
            ApproximationConfig::Knn(_) => ApproximationKind::Knn,
            ApproximationConfig::Ann(_) => ApproximationKind::Ann,
        }
    }

    /// 既定の設定。
    pub fn default_config(self) -> ApproximationConfig {
        match self {
            ApproximationKind::Rbf => ApproximationConfig::Rbf(RbfSettings::default()),
            ApproximationKind::Linear => ApproximationConfig::Linear,
            ApproximationKind::Knn => ApproximationConfig::Knn(KnnSettings::default()),
            ApproximationKind::Ann => ApproximationConfig::Ann(Default::default()),
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub data: DataArgs,
    /// 実験設定ファイル（JSON）。個別の引数で上書きされます
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// 分割数
    #[arg(long, short)]
    pub folds: Option<usize>,
    /// 分割前にサンプルを並べ替える
    #[arg(long)]
    pub shuffle: bool,
    /// 並べ替えの乱数シード
    #[arg(long)]
    pub fold_seed: Option<u64>,
    #[arg(long, value_enum)]
    pub reduction: Option<ReductionKind>,
    /// POD のランク、またはオートエンコーダの潜在次元
    #[arg(long)]
    pub rank: Option<usize>,
    /// POD の累積エネルギー比でランクを決める
    #[arg(long, conflicts_with = "rank")]
    pub energy: Option<f64>,
    #[arg(long, value_enum)]
    pub approximation: Option<ApproximationKind>,
    #[arg(long, value_enum)]
    pub kernel: Option<Kernel>,
    #[arg(long)]
    pub epsilon: Option<f64>,
    #[arg(long)]
    pub smoothing: Option<f64>,
    /// k 近傍回帰の近傍数
    #[arg(long)]
    pub neighbors: Option<usize>,
    /// オートエンコーダ・ニューラルネットワーク回帰の学習エポック数
    #[arg(long)]
    pub epochs: Option<usize>,
    #[arg(long, value_enum)]
    pub metric: Option<ErrorMetric>,
    /// 分割ごとの誤差のグラフの出力先
    #[arg(long)]
    pub plot: Option<PathBuf>,
    /// 全データで学習したときの損失履歴のグラフの出力先（ae / ann のみ）
    #[arg(long)]
    pub loss_plot: Option<PathBuf>,
}

impl ValidateArgs {
    /// 設定ファイル（あれば）を読み込み、引数で上書きした設定を返します。
    pub fn resolve(&self) -> Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::load(path)?,
            None => ExperimentConfig::default(),
        };
        self.apply(&mut config)?;
        Ok(config)
    }

    /// 個別の引数で設定を上書きします。
    ///
    /// オートエンコーダに `--energy` を指定した場合は [`RomError::Configuration`] です。
    pub fn apply(&self, config: &mut ExperimentConfig) -> Result<()> {
        self.data.apply(&mut config.dataset);

        let validation = &mut config.validation;
        if let Some(folds) = self.folds {
            validation.folds = folds;
        }
        if self.shuffle {
            validation.shuffle = true;
        }
        if let Some(seed) = self.fold_seed {
            validation.seed = seed;
        }
        if let Some(metric) = self.metric {
            validation.metric = metric;
        }

        let using_ae = matches!(config.reduction, ReductionConfig::Ae(_));
        match self.reduction {
            Some(ReductionKind::Pod) if using_ae => {
                config.reduction = ReductionConfig::Pod(PodSettings::default());
            }
            Some(ReductionKind::Ae) if !using_ae => {
                config.reduction = ReductionConfig::Ae(AutoencoderConfig::default());
            }
            _ => {}
        }
        match &mut config.reduction {
            ReductionConfig::Pod(settings) => {
                if let Some(rank) = self.rank {
                    settings.rank = RankPolicy::Fixed(rank);
                }
                if let Some(energy) = self.energy {
                    settings.rank = RankPolicy::Energy(energy);
                }
            }
            ReductionConfig::Ae(ae) => {
                if self.energy.is_some() {
                    return Err(RomError::Configuration(
                        "--energy は POD でのみ指定できます".to_string(),
                    ));
                }
                if let Some(rank) = self.rank {
                    ae.latent_dimension = rank;
                }
                if let Some(epochs) = self.epochs {
                    ae.epochs = epochs;
                }
            }
        }

        if let Some(kind) = self.approximation {
            if kind != ApproximationKind::of(&config.approximation) {
                config.approximation = kind.default_config();
            }
        }
        match &mut config.approximation {
            ApproximationConfig::Rbf(settings) => {
                if let Some(kernel) = self.kernel {
                    settings.kernel = kernel;
                }
                if let Some(epsilon) = self.epsilon {
                    settings.epsilon = epsilon;
                }
                if let Some(smoothing) = self.smoothing {
                    settings.smoothing = smoothing;
                }
            }
            ApproximationConfig::Knn(settings) => {
                if let Some(neighbors) = self.neighbors {
                    settings.neighbors = neighbors;
                }
            }
            ApproximationConfig::Ann(ann) => {
                if let Some(epochs) = self.epochs {
                    ann.epochs = epochs;
                }
            }
            ApproximationConfig::Linear => {}
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    #[command(flatten)]
    pub data: DataArgs,
    /// 比較する POD ランク（カンマ区切り）
    #[arg(long, value_delimiter = ',', default_values_t = [1, 2, 4, 8])]
    pub ranks: Vec<usize>,
    /// 比較する近似手法（カンマ区切り）
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = [ApproximationKind::Rbf, ApproximationKind::Linear, ApproximationKind::Knn]
    )]
    pub approximations: Vec<ApproximationKind>,
    #[arg(long, short, default_value_t = 5)]
    pub folds: usize,
    #[arg(long)]
    pub shuffle: bool,
    #[arg(long, default_value_t = 0)]
    pub fold_seed: u64,
    #[arg(long, value_enum, default_value_t = ErrorMetric::RelativeL2)]
    pub metric: ErrorMetric,
}

impl CompareArgs {
    pub fn dataset(&self) -> DatasetConfig {
        let mut config = DatasetConfig::default();
        self.data.apply(&mut config);
        config
    }
}

/// POD の計算方法を CLI のフラグから決めます。
pub fn pod_method(correlation: bool) -> PodMethod {
    if correlation {
        PodMethod::Correlation
    } else {
        PodMethod::Svd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config_values() {
        let cli = Cli::parse_from([
            "romcv",
            "cv",
            "--dataset",
            "linear",
            "--folds",
            "4",
            "--rank",
            "2",
            "--approximation",
            "knn",
            "--neighbors",
            "1",
        ]);
        let Commands::Cv(args) = cli.command else {
            panic!("expected cv subcommand");
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.dataset.kind, DatasetKind::Linear);
        assert_eq!(config.validation.folds, 4);
        assert_eq!(
            config.reduction,
            ReductionConfig::Pod(PodSettings {
                decomposition: PodMethod::Svd,
                rank: RankPolicy::Fixed(2),
            })
        );
        assert_eq!(
            config.approximation,
            ApproximationConfig::Knn(KnnSettings {
                neighbors: 1,
                ..KnnSettings::default()
            })
        );
    }

    #[test]
    fn switching_to_autoencoder_uses_rank_as_latent_dimension() {
        let args = ValidateArgs {
            reduction: Some(ReductionKind::Ae),
            rank: Some(3),
            epochs: Some(5),
            ..ValidateArgs::default()
        };
        let config = args.resolve().unwrap();
        match config.reduction {
            ReductionConfig::Ae(ae) => {
                assert_eq!(ae.latent_dimension, 3);
                assert_eq!(ae.epochs, 5);
            }
            other => panic!("unexpected reduction {:?}", other),
        }
    }

    #[test]
    fn energy_with_autoencoder_is_rejected() {
        let cli = Cli::parse_from(["romcv", "cv", "--reduction", "ae", "--energy", "0.99"]);
        let Commands::Cv(args) = cli.command else {
            panic!("expected cv subcommand");
        };
        assert!(matches!(args.resolve(), Err(RomError::Configuration(_))));
    }

    #[test]
    fn compare_parses_lists() {
        let cli = Cli::parse_from([
            "romcv",
            "compare",
            "--ranks",
            "1,3",
            "--approximations",
            "linear,ann",
        ]);
        let Commands::Compare(args) = cli.command else {
            panic!("expected compare subcommand");
        };
        assert_eq!(args.ranks, vec![1, 3]);
        assert_eq!(
            args.approximations,
            vec![ApproximationKind::Linear, ApproximationKind::Ann]
        );
    }
}
