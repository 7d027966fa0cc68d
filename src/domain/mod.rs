// ==========================================
// 饮料代工生产计划系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod calendar;
pub mod ledger;
pub mod master;
pub mod planning;
pub mod product;
pub mod truck;
pub mod types;

// 重导出核心类型
pub use ledger::{LedgerDay, LedgerProjection, PurchaseAdvice};
pub use master::{
    FetchFailure, MasterActivityRow, MasterAggregateResult, MasterLedger, MasterLedgerDay,
};
pub use planning::{sanitize_qty, InventoryAnchor, OnHandStock, PlanningSnapshot};
pub use product::ProductSpec;
pub use truck::{ShiftSummary, TruckBoardState, TruckSchedule, TruckSlot};
pub use types::{AdviceUrgency, EntryKind, ShiftBucket};
