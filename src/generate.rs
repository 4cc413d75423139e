use crate::cli::GenerateArgs;
use crate::config::DatasetConfig;

/// `generate` サブコマンドを実行します。
pub fn run(args: &GenerateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut dataset = DatasetConfig::default();
    args.data.apply(&mut dataset);
    let database = dataset.load()?;
    database.save(&args.output)?;
    println!(
        "=> {} サンプル (パラメータ次元 {}, スナップショット次元 {}) を '{}' に保存しました。",
        database.len(),
        database.parameter_dimension(),
        database.snapshot_dimension(),
        args.output.display()
    );
    Ok(())
}
