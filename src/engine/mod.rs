// ==========================================
// 饮料代工生产计划系统 - 引擎层
// ==========================================
// 职责: 实现计划业务规则引擎,不拼 SQL
// 红线: Engine 不做 I/O; 输入为快照, 输出为派生数据
// 红线: 可恢复的数据质量问题就地兜底, 不上抛
// ==========================================

pub mod error;
pub mod events;
pub mod ledger_projector;
pub mod master_aggregator;
pub mod spec_resolver;
pub mod truck_allocator;

// 重导出核心引擎
pub use error::{EngineError, EngineResult};
pub use events::{
    NoOpEventPublisher, OptionalEventPublisher, PlanningEvent, PlanningEventPublisher,
    PlanningEventType,
};
pub use ledger_projector::{LedgerProjector, ProjectionPolicy, MAX_HORIZON_DAYS, MIN_HORIZON_DAYS};
pub use master_aggregator::MasterAggregator;
pub use spec_resolver::{ResolvedSpec, SpecResolver};
pub use truck_allocator::TruckAllocator;
