//! ログ出力の初期化。

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// `RUST_LOG` があればそれを、なければ `default_filter` を使って tracing を初期化します。
///
/// 2回目以降の呼び出しは何もしません。
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}
