use crate::approximation::ApproximationMethod;
use crate::cli::ValidateArgs;
use crate::config::{ApproximationConfig, ExperimentConfig, ReductionConfig};
use crate::evaluation::{CrossValidation, KFold};
use crate::plot::{plot_fold_errors, plot_loss_history};
use crate::reduction::ReductionMethod;
use crate::rom::ReducedOrderModel;
use std::time::Instant;
use tracing::info;

/// `cv` / `loo` サブコマンドを実行します。
pub fn run(args: &ValidateArgs, leave_one_out: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.resolve()?;
    let database = config.dataset.load()?;
    let reduction = config.reduction.build();
    let approximation = config.approximation.build();
    let folds = if leave_one_out {
        KFold::leave_one_out(database.len())
    } else {
        config.validation.kfold()
    };
    info!(?config, "実験設定");

    println!(
        "交差検証を開始します - サンプル数: {}, パラメータ次元: {}, スナップショット次元: {}, 分割数: {}",
        database.len(),
        database.parameter_dimension(),
        database.snapshot_dimension(),
        folds.k
    );
    let start = Instant::now();
    let report = CrossValidation::new(folds, config.validation.metric).run(
        &database,
        &reduction,
        &approximation,
    )?;
    let duration = start.elapsed();

    println!("{:>6} {:>8} {:>14}", "fold", "samples", "error");
    for (i, (error, size)) in report
        .fold_errors
        .iter()
        .zip(report.fold_sizes())
        .enumerate()
    {
        println!("{:>6} {:>8} {:>14.6e}", i + 1, size, error);
    }
    println!(
        "=> 平均誤差 ({:?}): {:.6e} (標準偏差 {:.3e})",
        config.validation.metric,
        report.mean(),
        report.std_dev()
    );
    if let Some((index, error)) = report.worst_sample() {
        println!(
            "=> 誤差が最大のサンプル: #{} (パラメータ {:?}), 誤差 {:.6e}",
            index,
            database.parameters().row(index).iter().collect::<Vec<_>>(),
            error
        );
    }
    println!("=> 所要時間: {:.2?}", duration);

    if let Some(path) = &args.plot {
        plot_fold_errors(path, &report.fold_errors)?;
        println!("=> 誤差グラフを '{}' に保存しました。", path.display());
    }

    if let Some(path) = &args.loss_plot {
        println!("全データで縮約モデルを学習中...");
        let mut rom = ReducedOrderModel::new(database, reduction, approximation);
        rom.fit()?;
        let history = match (rom.reduction(), rom.approximation()) {
            (ReductionMethod::Autoencoder(ae), _) => ae.loss_history(),
            (_, ApproximationMethod::Ann(ann)) => ann.loss_history(),
            _ => {
                return Err("損失グラフはオートエンコーダまたはニューラルネットワーク回帰でのみ出力できます".into());
            }
        };
        plot_loss_history(path, history, loss_interval(&config))?;
        println!("=> 損失グラフを '{}' に保存しました。", path.display());
    }

    Ok(())
}

/// 損失を記録したエポック間隔。
fn loss_interval(config: &ExperimentConfig) -> usize {
    let epochs = match (&config.reduction, &config.approximation) {
        (ReductionConfig::Ae(ae), _) => ae.epochs,
        (_, ApproximationConfig::Ann(ann)) => ann.epochs,
        _ => 20,
    };
    (epochs / 20).max(1)
}
