// ==========================================
// 饮料代工生产计划系统 - 应用状态
// ==========================================
// 职责: 组装共享连接、仓储、聚合服务与 API 门面
// 说明: 必须在 tokio 运行时内初始化（去抖闸门要拿 Handle）
// ==========================================

use std::sync::{Arc, Mutex};

use anyhow::Context;

use crate::api::{LedgerApi, MasterApi, ProductApi, TruckApi};
use crate::config::ConfigManager;
use crate::db::{self, open_sqlite_connection};
use crate::engine::events::PlanningEventPublisher;
use crate::repository::{PlanningRepository, ProductSpecRepository, TruckBoardRepository};
use crate::service::{
    LocalStoreSource, MasterRefreshService, RefreshGate, RefreshGateAdapter,
};

/// 应用状态
///
/// 持有共享连接之上的全部 API 门面与聚合服务
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 产品规格API
    pub product_api: Arc<ProductApi>,

    /// 滚动台账API
    pub ledger_api: Arc<LedgerApi>,

    /// 车位排程API
    pub truck_api: Arc<TruckApi>,

    /// 总台账API
    pub master_api: Arc<MasterApi>,

    /// 总台账聚合服务（供集成方直接驱动刷新）
    pub refresh_service: Arc<MasterRefreshService>,

    /// 事件发布器（计划变更 → 去抖刷新）
    pub event_publisher: Option<Arc<dyn PlanningEventPublisher>>,
}

impl AppState {
    /// 装配应用状态
    ///
    /// 按依赖顺序完成: 共享连接建库 → 仓储与配置 → 聚合服务/去抖闸门 →
    /// 事件适配器 → API 门面。
    pub fn new(db_path: String) -> anyhow::Result<Self> {
        tracing::info!(db_path = %db_path, "装配应用状态");

        // 仓储与配置共用同一个 SQLite 连接
        let conn = open_sqlite_connection(&db_path)
            .with_context(|| format!("无法打开数据库: {}", db_path))?;

        // 版本戳: 空库盖当前版本; 旧库漂移只告警不迁移, 不拦启动
        match db::read_schema_version(&conn).context("读取 schema 版本失败")? {
            None => db::stamp_schema_version(&conn).context("写入 schema 版本戳失败")?,
            Some(found) if found != db::CURRENT_SCHEMA_VERSION => {
                tracing::warn!(
                    found = found,
                    expected = db::CURRENT_SCHEMA_VERSION,
                    "数据库 schema 版本与代码不一致, 请核对建表语句"
                );
            }
            Some(_) => {}
        }

        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 仓储层
        // ==========================================

        let product_repo = Arc::new(
            ProductSpecRepository::from_connection(conn.clone())
                .context("无法创建ProductSpecRepository")?,
        );
        let planning_repo = Arc::new(
            PlanningRepository::from_connection(conn.clone())
                .context("无法创建PlanningRepository")?,
        );
        let board_repo = Arc::new(
            TruckBoardRepository::from_connection(conn.clone())
                .context("无法创建TruckBoardRepository")?,
        );

        // 配置管理器
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| anyhow::anyhow!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 装配聚合服务与去抖闸门
        // ==========================================

        let source = Arc::new(LocalStoreSource::new(
            product_repo.clone(),
            planning_repo.clone(),
        ));
        let refresh_service = Arc::new(MasterRefreshService::new(source));

        let debounce_ms = config_manager
            .refresh_debounce_ms()
            .map_err(|e| anyhow::anyhow!("读取去抖间隔配置失败: {}", e))?;
        let runtime = tokio::runtime::Handle::try_current()
            .context("去抖刷新需要在 tokio 运行时内初始化")?;
        let gate = Arc::new(RefreshGate::new(
            refresh_service.clone(),
            debounce_ms,
            runtime,
        ));

        // 事件适配器: API 写操作 → 去抖闸门（API 层只认发布器 trait）
        let event_publisher: Option<Arc<dyn PlanningEventPublisher>> =
            Some(Arc::new(RefreshGateAdapter::new(gate.clone())));

        // ==========================================
        // API 门面
        // ==========================================

        let product_api = Arc::new(ProductApi::new(
            product_repo.clone(),
            event_publisher.clone(),
        ));

        let ledger_api = Arc::new(LedgerApi::new(
            product_repo.clone(),
            planning_repo.clone(),
            config_manager.clone(),
            event_publisher.clone(),
        ));

        let truck_api = Arc::new(TruckApi::new(
            product_repo,
            board_repo,
            config_manager,
            event_publisher.clone(),
        ));

        let master_api = Arc::new(MasterApi::new(refresh_service.clone(), gate));

        tracing::info!("应用状态装配完成");

        Ok(Self {
            db_path,
            product_api,
            ledger_api,
            truck_api,
            master_api,
            refresh_service,
            event_publisher,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径
// ==========================================

// 开发构建落独立目录, 不碰生产库
#[cfg(debug_assertions)]
const DATA_DIR_NAME: &str = "copack-aps-dev";
#[cfg(not(debug_assertions))]
const DATA_DIR_NAME: &str = "copack-aps";

/// 解析默认数据库路径
///
/// 优先级: `COPACK_APS_DB_PATH` 环境变量（空白视同未设置）>
/// 用户数据目录 > 当前目录。
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var("COPACK_APS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    match dirs::data_dir() {
        Some(data_dir) => {
            let dir = data_dir.join(DATA_DIR_NAME);
            std::fs::create_dir_all(&dir).ok();
            dir.join("copack_aps.db").to_string_lossy().to_string()
        }
        None => "./copack_aps.db".to_string(),
    }
}
