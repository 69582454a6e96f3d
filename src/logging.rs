//! ログ初期化
//!
//! ライブラリ側は `tracing` のマクロだけを使い、購読者はバイナリで一度だけ設定する。
//! 画面出力（println!）と混ざらないよう stderr に書く。

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` があればそれを優先し、なければ verbose で debug、通常は warn
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn default_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("docdupe=debug,warn")
    } else {
        EnvFilter::new("warn")
    }
}
