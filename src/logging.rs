// ==========================================
// 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// CLI 宿主用文本格式，调度器宿主可切换 JSON 行格式
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 从环境变量构建日志过滤器（默认: info）
///
/// RUST_LOG 例如: RUST_LOG=debug 或 RUST_LOG=content_sync=trace
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器
/// - SYNC_LOG_FORMAT=json: 输出 JSON 行格式（供调度器/日志采集消费）
///
/// # 示例
/// ```no_run
/// use content_sync::logging;
/// logging::init();
/// ```
pub fn init() {
    let json_format = std::env::var("SYNC_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_format {
        fmt()
            .json()
            .with_env_filter(env_filter())
            .with_current_span(false)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter())
            .with_target(true)
            .with_line_number(true)
            .init();
    }
}

/// 初始化测试环境的日志系统
///
/// 使用更详细的日志级别，便于调试
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
