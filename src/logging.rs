// ==========================================
// 日志
// ==========================================
// stdout 输出命令结果 JSON，日志一律走 stderr
// 过滤器取 RUST_LOG，缺省 info
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// 命令行入口调用一次；重复调用会 panic
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_line_number(true)
        .init();
}

/// 测试用: debug 级别，输出交给测试框架捕获，可重复调用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
