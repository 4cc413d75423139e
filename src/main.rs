//! # 縮約モデル交差検証ツール
//!
//! `clap` クレートを利用して、データ生成・POD の解析・交差検証・手法の比較を
//! コマンドラインから個別に実行できます。
//!
//! ## 使い方
//!
//! ### トイデータセットの生成
//! ```bash
//! cargo run --release -- generate --dataset heat --samples 30 -o heat.json
//! ```
//!
//! ### 特異値の確認
//! ```bash
//! cargo run --release -- pod --input heat.json --plot singular_values.png
//! ```
//!
//! ### 5 分割交差検証
//! ```bash
//! cargo run --release -- cv --input heat.json --rank 4 --approximation rbf --kernel cubic
//! ```
//!
//! ### leave-one-out
//! ```bash
//! cargo run --release -- loo --dataset gaussian --approximation knn
//! ```
//!
//! ### 組み合わせの比較
//! ```bash
//! cargo run --release -- compare --input heat.json --ranks 1,2,4 --shuffle
//! ```

use clap::Parser;
use romcv::cli::{Cli, Commands};
use romcv::{compare, generate, inspect, logging, validate};

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let result = match &cli.command {
        Commands::Generate(args) => generate::run(args),
        Commands::Pod(args) => inspect::run(args),
        Commands::Cv(args) => validate::run(args, false),
        Commands::Loo(args) => validate::run(args, true),
        Commands::Compare(args) => compare::run(args),
    };

    if let Err(e) = result {
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}
