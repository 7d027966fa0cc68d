// ==========================================
// 饮料代工生产计划系统 - 配置层
// ==========================================
// 职责: 计划参数管理, 支持全局/品种两级覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, ConfigScope};
