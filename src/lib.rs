// ==========================================
// 饮料代工生产计划系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 库存推演与整车排程的决策支持 (人工最终控制权)
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 性能观测（SQL 计数/慢查询）
pub mod perf;

// 国际化
pub mod i18n;

// 服务层 - 总台账聚合与去抖刷新
pub mod service;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装与入口
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{EntryKind, ShiftBucket};

// 领域实体
pub use domain::{
    InventoryAnchor, LedgerProjection, MasterAggregateResult, MasterLedger, OnHandStock,
    PlanningSnapshot, ProductSpec, TruckBoardState, TruckSchedule,
};

// 引擎
pub use engine::{
    LedgerProjector, MasterAggregator, ProjectionPolicy, ResolvedSpec, SpecResolver,
    TruckAllocator,
};

// 服务
pub use service::{MasterRefreshService, RefreshGate};

// API
pub use api::{LedgerApi, MasterApi, ProductApi, TruckApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "饮料代工生产计划系统";
