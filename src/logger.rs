//! 日志初始化

use tracing_subscriber::EnvFilter;

/// 初始化 tracing 订阅器
///
/// 默认 info 级别，可用 RUST_LOG 环境变量覆盖。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
