// ==========================================
// PU 切割仓储系统 - 日志初始化
// ==========================================
// RUST_LOG 控制级别;PU_STOCK_LOG_FORMAT=json 输出结构化日志
// 多个工作者共用同一库文件,日志带线程号以区分并发写入者
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 日志格式环境变量
pub const LOG_FORMAT_ENV: &str = "PU_STOCK_LOG_FORMAT";

/// 默认级别 info
///
/// ```no_run
/// pu_stock::logging::init();
/// ```
pub fn init() {
    init_with_default("info");
}

/// RUST_LOG 未设置时使用 `default_directive`
pub fn init_with_default(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let builder = fmt().with_env_filter(filter).with_thread_ids(true);

    if json_requested() {
        builder.json().with_current_span(true).init();
    } else {
        builder.with_target(true).with_line_number(true).init();
    }
}

fn json_requested() -> bool {
    std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// 测试用,可重复调用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
