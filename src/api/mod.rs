// ==========================================
// 饮料代工生产计划系统 - API 层
// ==========================================
// 职责: 提供业务 API 门面,供上层调用方（CLI/集成方）使用
// 红线: 门面只做校验和编排,业务算法一律在 engine 层
// ==========================================

pub mod error;
pub mod ledger_api;
pub mod master_api;
pub mod product_api;
pub mod truck_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use ledger_api::{LedgerApi, LedgerProjectionView, PlanningSnapshotView};
pub use master_api::{MasterApi, MasterLedgerView};
pub use product_api::{ProductApi, ProductSpecView, UpsertProductSpecRequest};
pub use truck_api::{TruckApi, TruckScheduleView};
