// ==========================================
// 饮料代工生产计划系统 - 服务层
// ==========================================
// 职责: 总台账刷新编排（快照抓取、聚合、去抖）
// ==========================================

pub mod master_refresh;
pub mod refresh_gate;

pub use master_refresh::{LocalStoreSource, MasterRefreshService, SnapshotSource};
pub use refresh_gate::{RefreshGate, RefreshGateAdapter, RefreshTrigger};
