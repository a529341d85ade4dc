use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化日志
///
/// - `RUST_LOG` 优先；未设置时默认 `info`，`verbose` 时为 `debug`
/// - 传入日志文件时同时追加写入该文件（无颜色）
pub fn init(verbose: bool, log_file: Option<&str>) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("demand_submit={0},{0}", default_level)));

    let file_layer = log_file
        .and_then(|path| OpenOptions::new().create(true).append(true).open(path).ok())
        .map(|file| fmt::layer().with_ansi(false).with_writer(Mutex::new(file)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init();
}
