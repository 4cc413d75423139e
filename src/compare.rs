use crate::cli::CompareArgs;
use crate::evaluation::{Candidate, CrossValidation, KFold, sweep};
use crate::reduction::{Pod, ReductionMethod};
use std::time::Instant;

/// `compare` サブコマンドを実行します。
///
/// POD ランクと近似手法のすべての組み合わせについて交差検証を行い、
/// 平均誤差の小さい順に表示します。
pub fn run(args: &CompareArgs) -> Result<(), Box<dyn std::error::Error>> {
    let database = args.dataset().load()?;
    let folds = if args.shuffle {
        KFold::shuffled(args.folds, args.fold_seed)
    } else {
        KFold::new(args.folds)
    };
    let validation = CrossValidation::new(folds, args.metric);

    let mut candidates = Vec::new();
    for &rank in &args.ranks {
        for &kind in &args.approximations {
            candidates.push(Candidate {
                label: format!("POD(rank={}) + {:?}", rank, kind),
                reduction: ReductionMethod::Pod(Pod::with_rank(rank)),
                approximation: kind.default_config().build(),
            });
        }
    }

    println!(
        "{} 通りの組み合わせを比較します - サンプル数: {}, 分割数: {}",
        candidates.len(),
        database.len(),
        folds.k
    );
    let start = Instant::now();
    let entries = sweep(&validation, &database, &candidates);
    let duration = start.elapsed();

    println!("{:<28} {:>14} {:>12}", "method", "mean error", "std");
    for entry in &entries {
        match &entry.outcome {
            Ok(report) => println!(
                "{:<28} {:>14.6e} {:>12.3e}",
                entry.label,
                report.mean(),
                report.std_dev()
            ),
            Err(message) => println!("{:<28} {:>14} ({})", entry.label, "failed", message),
        }
    }
    if let Some(best) = entries.first().filter(|e| e.outcome.is_ok()) {
        println!("=> 最良の組み合わせ: {}", best.label);
    }
    println!("=> 所要時間: {:.2?}", duration);
    Ok(())
}
