use crate::cli::{PodArgs, pod_method};
use crate::config::DatasetConfig;
use crate::plot::plot_singular_values;
use crate::reduction::{Pod, RankPolicy, Reduction};

/// 表示する特異値の最大個数。
const MAX_ROWS: usize = 20;

/// `pod` サブコマンドを実行します。
pub fn run(args: &PodArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut dataset = DatasetConfig::default();
    args.data.apply(&mut dataset);
    let database = dataset.load()?;

    let mut pod = Pod::new(pod_method(args.correlation), RankPolicy::Full);
    pod.fit(database.snapshots())?;

    println!(
        "POD - サンプル数: {}, スナップショット次元: {}, 方法: {:?}",
        database.len(),
        database.snapshot_dimension(),
        pod.method()
    );
    println!("{:>6} {:>16} {:>12}", "mode", "singular value", "energy");
    for (i, (s, e)) in pod
        .singular_values()
        .iter()
        .zip(pod.cumulative_energy())
        .take(MAX_ROWS)
        .enumerate()
    {
        println!("{:>6} {:>16.6e} {:>12.8}", i + 1, s, e);
    }
    println!("=> 有効ランク: {}", pod.rank().unwrap_or(0));

    if let Some(path) = &args.plot {
        plot_singular_values(path, pod.singular_values())?;
        println!("=> 特異値グラフを '{}' に保存しました。", path.display());
    }
    Ok(())
}
