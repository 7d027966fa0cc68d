// ==========================================
// 饮料代工生产计划系统 - 配置管理器
// ==========================================
// 职责: 计划参数加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 作用域: global 全局默认, sku/<SKU> 单品种覆写
// 取值顺序: 品种覆写 -> 全局 -> 代码默认
// ==========================================

use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 独立连接版构造（单测与脚本场景）
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 挂到应用共享连接上
    ///
    /// 对传入连接重放统一 PRAGMA（幂等）, 保证行为一致。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }

        let manager = Self { conn };
        manager.ensure_tables()?;
        Ok(manager)
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, Box<dyn Error>> {
        self.conn
            .lock()
            .map_err(|e| format!("锁获取失败: {}", e).into())
    }

    fn ensure_tables(&self) -> Result<(), Box<dyn Error>> {
        let conn = self.lock_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS config_kv (
              scope_id TEXT NOT NULL,
              key TEXT NOT NULL,
              value TEXT NOT NULL,
              PRIMARY KEY (scope_id, key)
            );
            "#,
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取某作用域下的配置值
    fn get_config_value(
        &self,
        scope_id: &str,
        key: &str,
    ) -> Result<Option<String>, Box<dyn Error>> {
        use rusqlite::OptionalExtension;

        let conn = self.lock_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![scope_id, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 按"品种覆写 -> 全局"顺序读取生效值
    ///
    /// # 返回
    /// - Some(String): 生效的配置值
    /// - None: 两级均未配置（由调用方落到代码默认）
    pub fn get_effective_value(
        &self,
        sku: &str,
        key: &str,
    ) -> Result<Option<String>, Box<dyn Error>> {
        let sku_scope = ConfigScope::Sku {
            sku: sku.to_string(),
        };
        if let Some(v) = self.get_config_value(sku_scope.scope_id().as_str(), key)? {
            return Ok(Some(v));
        }
        self.get_config_value(ConfigScope::Global.scope_id().as_str(), key)
    }

    /// 写入或覆盖配置值
    pub fn set_config_value(
        &self,
        scope: &ConfigScope,
        key: &str,
        value: &str,
    ) -> Result<(), Box<dyn Error>> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3",
            params![scope.scope_id(), key, value],
        )?;
        Ok(())
    }

    /// 删除配置值（删除品种覆写后回落到全局）
    pub fn delete_config_value(
        &self,
        scope: &ConfigScope,
        key: &str,
    ) -> Result<usize, Box<dyn Error>> {
        let conn = self.lock_conn()?;
        let affected = conn.execute(
            "DELETE FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![scope.scope_id(), key],
        )?;
        Ok(affected)
    }

    // ===== 推演策略参数 =====

    /// 安全库存车数（默认 2 车）
    pub fn safety_stock_loads_for(&self, sku: &str) -> Result<u32, Box<dyn Error>> {
        let value = self
            .get_effective_value(sku, config_keys::SAFETY_STOCK_LOADS)?
            .unwrap_or_else(|| "2".to_string());
        Ok(value.parse::<u32>().unwrap_or(2))
    }

    /// 采购提前期天数（默认 3 天）
    pub fn lead_time_days_for(&self, sku: &str) -> Result<u32, Box<dyn Error>> {
        let value = self
            .get_effective_value(sku, config_keys::LEAD_TIME_DAYS)?
            .unwrap_or_else(|| "3".to_string());
        Ok(value.parse::<u32>().unwrap_or(3))
    }

    /// 推演窗口天数（默认 21 天, 引擎侧强制 14~28）
    pub fn projection_horizon_days_for(&self, sku: &str) -> Result<u32, Box<dyn Error>> {
        let value = self
            .get_effective_value(sku, config_keys::PROJECTION_HORIZON_DAYS)?
            .unwrap_or_else(|| "21".to_string());
        Ok(value.parse::<u32>().unwrap_or(21))
    }

    /// 仓容上限（瓶数, 未配置或非正值视为不设上限）
    pub fn storage_capacity_units_for(&self, sku: &str) -> Result<Option<f64>, Box<dyn Error>> {
        let Some(value) = self.get_effective_value(sku, config_keys::STORAGE_CAPACITY_UNITS)?
        else {
            return Ok(None);
        };

        match value.parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => Ok(Some(v)),
            _ => {
                tracing::warn!(
                    config_key = config_keys::STORAGE_CAPACITY_UNITS,
                    raw_value = %value,
                    "仓容上限配置格式错误，按不设上限处理"
                );
                Ok(None)
            }
        }
    }

    /// 总台账刷新去抖间隔（毫秒, 默认 1000; 仅全局生效）
    pub fn refresh_debounce_ms(&self) -> Result<u64, Box<dyn Error>> {
        let value = self
            .get_config_value(
                ConfigScope::Global.scope_id().as_str(),
                config_keys::REFRESH_DEBOUNCE_MS,
            )?
            .unwrap_or_else(|| "1000".to_string());
        Ok(value.parse::<u64>().unwrap_or(1000))
    }

    // ===== 配置快照 =====

    /// 导出 global 作用域为 JSON 文本（调参前留底, 便于回退）
    ///
    /// 键按字典序排列, 同一份配置导出结果稳定。
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let entries: Result<BTreeMap<String, String>, rusqlite::Error> = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect();

        Ok(serde_json::to_string(&entries?)?)
    }

    /// 用快照覆盖 global 作用域（品种覆写不受影响）
    ///
    /// 整体走事务, 任一条写入失败即回滚; 返回写入条目数。
    pub fn restore_config_from_snapshot(
        &self,
        snapshot_json: &str,
    ) -> Result<usize, Box<dyn Error>> {
        let entries: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            )?;
            for (key, value) in &entries {
                count += stmt.execute(params![key, value])?;
            }
        }
        tx.commit()?;

        Ok(count)
    }
}

// ==========================================
// ConfigScope - 配置作用域
// ==========================================
#[derive(Debug, Clone)]
pub enum ConfigScope {
    Global,                // 全局默认
    Sku { sku: String },   // 单品种覆写
}

impl ConfigScope {
    pub fn scope_id(&self) -> String {
        match self {
            ConfigScope::Global => "global".to_string(),
            ConfigScope::Sku { sku } => format!("sku/{}", sku),
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 推演策略
    pub const SAFETY_STOCK_LOADS: &str = "safety_stock_loads";
    pub const LEAD_TIME_DAYS: &str = "lead_time_days";
    pub const PROJECTION_HORIZON_DAYS: &str = "projection_horizon_days";
    pub const STORAGE_CAPACITY_UNITS: &str = "storage_capacity_units";

    // 总台账刷新
    pub const REFRESH_DEBOUNCE_MS: &str = "refresh_debounce_ms";
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    fn sku_scope(sku: &str) -> ConfigScope {
        ConfigScope::Sku {
            sku: sku.to_string(),
        }
    }

    #[test]
    fn test_defaults_when_unconfigured() {
        let manager = ConfigManager::new(":memory:").unwrap();
        assert_eq!(manager.safety_stock_loads_for("SKU-A").unwrap(), 2);
        assert_eq!(manager.lead_time_days_for("SKU-A").unwrap(), 3);
        assert_eq!(manager.projection_horizon_days_for("SKU-A").unwrap(), 21);
        assert_eq!(manager.storage_capacity_units_for("SKU-A").unwrap(), None);
        assert_eq!(manager.refresh_debounce_ms().unwrap(), 1000);
    }

    #[test]
    fn test_sku_override_beats_global() {
        let manager = ConfigManager::new(":memory:").unwrap();
        manager
            .set_config_value(&ConfigScope::Global, config_keys::SAFETY_STOCK_LOADS, "4")
            .unwrap();
        manager
            .set_config_value(&sku_scope("SKU-A"), config_keys::SAFETY_STOCK_LOADS, "6")
            .unwrap();

        // 覆写品种取覆写值, 其他品种取全局值
        assert_eq!(manager.safety_stock_loads_for("SKU-A").unwrap(), 6);
        assert_eq!(manager.safety_stock_loads_for("SKU-B").unwrap(), 4);

        // 删除覆写后回落到全局
        manager
            .delete_config_value(&sku_scope("SKU-A"), config_keys::SAFETY_STOCK_LOADS)
            .unwrap();
        assert_eq!(manager.safety_stock_loads_for("SKU-A").unwrap(), 4);
    }

    #[test]
    fn test_storage_capacity_rejects_bad_values() {
        let manager = ConfigManager::new(":memory:").unwrap();
        manager
            .set_config_value(
                &ConfigScope::Global,
                config_keys::STORAGE_CAPACITY_UNITS,
                "90000",
            )
            .unwrap();
        assert_eq!(
            manager.storage_capacity_units_for("SKU-A").unwrap(),
            Some(90000.0)
        );

        manager
            .set_config_value(
                &ConfigScope::Global,
                config_keys::STORAGE_CAPACITY_UNITS,
                "abc",
            )
            .unwrap();
        assert_eq!(manager.storage_capacity_units_for("SKU-A").unwrap(), None);

        manager
            .set_config_value(
                &ConfigScope::Global,
                config_keys::STORAGE_CAPACITY_UNITS,
                "-5",
            )
            .unwrap();
        assert_eq!(manager.storage_capacity_units_for("SKU-A").unwrap(), None);
    }

    #[test]
    fn test_snapshot_restore_roundtrip() {
        let manager = ConfigManager::new(":memory:").unwrap();
        manager
            .set_config_value(&ConfigScope::Global, config_keys::LEAD_TIME_DAYS, "5")
            .unwrap();
        manager
            .set_config_value(&ConfigScope::Global, config_keys::REFRESH_DEBOUNCE_MS, "250")
            .unwrap();

        let snapshot = manager.get_config_snapshot().unwrap();

        // 改乱后从快照恢复
        manager
            .set_config_value(&ConfigScope::Global, config_keys::LEAD_TIME_DAYS, "9")
            .unwrap();
        let restored = manager.restore_config_from_snapshot(&snapshot).unwrap();
        assert_eq!(restored, 2);
        assert_eq!(manager.lead_time_days_for("SKU-A").unwrap(), 5);
        assert_eq!(manager.refresh_debounce_ms().unwrap(), 250);
    }
}
