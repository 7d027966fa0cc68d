// ==========================================
// 饮料代工生产计划系统 - 主入口
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 决策支持系统 (人工最终控制权)
// ==========================================

use copack_aps::app::{get_default_db_path, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    copack_aps::logging::init();

    tracing::info!("==================================================");
    tracing::info!("饮料代工生产计划系统 - 决策支持系统");
    tracing::info!("系统版本: {}", copack_aps::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径
    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    // 创建AppState
    tracing::info!("正在初始化AppState...");
    let app_state = AppState::new(db_path)?;
    tracing::info!("AppState初始化成功");

    // 启动即跑一轮总台账聚合, 让巡检方立刻看到全局库存水位
    let result = app_state.master_api.aggregate_now().await?;
    tracing::info!(
        run_id = %result.run_id,
        product_count = result.product_count,
        total_rows = result.total_rows,
        failures = result.failures.len(),
        duration_ms = result.duration_ms,
        "总台账聚合完成"
    );

    for failure in &result.failures {
        tracing::warn!(sku = %failure.sku, "品种快照拉取失败: {}", failure.reason);
    }

    Ok(())
}
