// ==========================================
// 饮料代工生产计划系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 仅配置类问题算硬错误, 且只波及单个品种;
//       数量类数据质量问题由引擎就地按 0 兜底, 不出现在此
// ==========================================

use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 配置错误 (单品种致命) =====
    #[error("产品规格未找到: sku={0}")]
    SpecNotFound(String),

    #[error("包装换算比无效 (sku={sku}): {message}")]
    InvalidPackagingRatio { sku: String, message: String },
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
