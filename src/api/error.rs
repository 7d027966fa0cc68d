// ==========================================
// 饮料代工生产计划系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型, 把仓储/引擎错误转换为用户可读的业务错误
// 红线: 所有错误信息必须包含显式原因
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入校验错误
    // ==========================================
    #[error("入参非法: {0}")]
    InvalidInput(String),

    #[error("日期格式错误: {0}（应为 YYYY-MM-DD）")]
    InvalidDate(String),

    #[error("未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("违反业务规则: {0}")]
    BusinessRuleViolation(String),

    #[error("数据校验不通过: {0}")]
    ValidationError(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库操作失败: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// 说明: 存储细节不外漏, 约束类错误折叠为业务规则错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}不存在: {}", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("重复记录: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("引用完整性被破坏: {}", msg))
            }
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段 {} 取值非法: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::SpecNotFound(sku) => ApiError::NotFound(crate::i18n::t_with_args(
                "ledger.spec_missing",
                &[("sku", &sku)],
            )),
            EngineError::InvalidPackagingRatio { sku, message } => {
                ApiError::ValidationError(format!("包装换算比非法: sku={}, {}", sku, message))
            }
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "ProductSpec".to_string(),
            id: "SKU-A".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("ProductSpec"));
                assert!(msg.contains("SKU-A"));
            }
            _ => panic!("Expected NotFound"),
        }

        let repo_err = RepositoryError::FieldValueError {
            field: "qty".to_string(),
            message: "必须为非负数".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::InvalidInput(msg) => {
                assert!(msg.contains("qty"));
            }
            _ => panic!("Expected InvalidInput"),
        }
    }

    #[test]
    fn test_engine_error_conversion() {
        let api_err: ApiError = EngineError::SpecNotFound("SKU-X".to_string()).into();
        match api_err {
            ApiError::NotFound(msg) => assert!(msg.contains("SKU-X")),
            _ => panic!("Expected NotFound"),
        }

        let api_err: ApiError = EngineError::InvalidPackagingRatio {
            sku: "SKU-Y".to_string(),
            message: "units_per_case 为 0".to_string(),
        }
        .into();
        match api_err {
            ApiError::ValidationError(msg) => {
                assert!(msg.contains("SKU-Y"));
                assert!(msg.contains("units_per_case"));
            }
            _ => panic!("Expected ValidationError"),
        }
    }
}
