// ==========================================
// 饮料代工生产计划系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod planning_repo;
pub mod product_repo;
pub mod truck_board_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use planning_repo::PlanningRepository;
pub use product_repo::ProductSpecRepository;
pub use truck_board_repo::TruckBoardRepository;
