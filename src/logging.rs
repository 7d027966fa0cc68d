// ==========================================
// 饮料代工生产计划系统 - 日志初始化
// ==========================================
// 约定:
// - 级别过滤走 RUST_LOG, 未设置时默认 info
// - 常驻服务可切 JSON 行输出, 便于日志采集
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

fn level_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn wants_json(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// 初始化进程日志
///
/// # 环境变量
/// - `RUST_LOG`: 级别过滤器, 如 `RUST_LOG=copack_aps=debug`
/// - `COPACK_APS_LOG_JSON`: 置 1 输出 JSON 行（默认人类可读格式）
pub fn init() {
    let json = std::env::var("COPACK_APS_LOG_JSON")
        .map(|v| wants_json(&v))
        .unwrap_or(false);

    let builder = fmt()
        .with_env_filter(level_filter())
        .with_target(true)
        .with_line_number(true);

    if json {
        builder.json().flatten_event(true).init();
    } else {
        builder.init();
    }
}

/// 测试专用初始化: debug 级别 + 输出捕获到各用例
///
/// 可重复调用, 供集成测试在用例开头使用。
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wants_json_variants() {
        assert!(wants_json("1"));
        assert!(wants_json(" TRUE "));
        assert!(wants_json("yes"));
        assert!(!wants_json("0"));
        assert!(!wants_json(""));
    }

    #[test]
    fn test_init_test_is_reentrant() {
        init_test();
        init_test();
    }
}
