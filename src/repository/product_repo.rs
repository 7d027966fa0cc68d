// ==========================================
// 饮料代工生产计划系统 - 产品规格仓储
// ==========================================
// 职责:
// - 管理 product_spec 表 (包装换算比 + 灌装速率)
// - 提供固定品种序的清单 (总台账聚合的迭代顺序)
// 说明:
// - 规格由配置界面维护, 引擎侧只读
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::product::ProductSpec;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

pub struct ProductSpecRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductSpecRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.ensure_tables()?;
        Ok(repo)
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_tables()?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn ensure_tables(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS product_spec (
              sku TEXT PRIMARY KEY,
              product_name TEXT NOT NULL,
              units_per_case INTEGER NOT NULL,
              cases_per_pallet INTEGER NOT NULL,
              units_per_truck INTEGER NOT NULL,
              pallets_per_truck_override INTEGER,
              production_rate_cph REAL NOT NULL DEFAULT 0,
              seq_no INTEGER,
              is_active INTEGER NOT NULL DEFAULT 1,
              updated_at TEXT NOT NULL DEFAULT (datetime('now')),
              updated_by TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_product_spec_active_seq
              ON product_spec(is_active, seq_no);
            "#,
        )?;
        Ok(())
    }

    /// 新增或整行覆盖产品规格
    pub fn upsert_spec(&self, spec: &ProductSpec) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO product_spec (
                sku,
                product_name,
                units_per_case,
                cases_per_pallet,
                units_per_truck,
                pallets_per_truck_override,
                production_rate_cph,
                seq_no,
                is_active,
                updated_at,
                updated_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(sku) DO UPDATE SET
                product_name = excluded.product_name,
                units_per_case = excluded.units_per_case,
                cases_per_pallet = excluded.cases_per_pallet,
                units_per_truck = excluded.units_per_truck,
                pallets_per_truck_override = excluded.pallets_per_truck_override,
                production_rate_cph = excluded.production_rate_cph,
                seq_no = excluded.seq_no,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at,
                updated_by = excluded.updated_by
            "#,
            params![
                spec.sku,
                spec.product_name,
                spec.units_per_case,
                spec.cases_per_pallet,
                spec.units_per_truck,
                spec.pallets_per_truck_override,
                spec.production_rate_cph,
                spec.seq_no,
                if spec.is_active { 1 } else { 0 },
                spec.updated_at,
                spec.updated_by,
            ],
        )?;
        Ok(())
    }

    /// 按 SKU 查找规格 (未登记返回 None, 由解析引擎升级为硬错误)
    pub fn find_by_sku(&self, sku: &str) -> RepositoryResult<Option<ProductSpec>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                sku,
                product_name,
                units_per_case,
                cases_per_pallet,
                units_per_truck,
                pallets_per_truck_override,
                production_rate_cph,
                seq_no,
                is_active,
                updated_at,
                updated_by
            FROM product_spec
            WHERE sku = ?1
            "#,
        )?;

        let result = stmt.query_row(params![sku], Self::map_row);

        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 启用品种清单 (固定展示序: seq_no 升序, 空值垫底, 同序按 SKU)
    pub fn list_active(&self) -> RepositoryResult<Vec<ProductSpec>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                sku,
                product_name,
                units_per_case,
                cases_per_pallet,
                units_per_truck,
                pallets_per_truck_override,
                production_rate_cph,
                seq_no,
                is_active,
                updated_at,
                updated_by
            FROM product_spec
            WHERE is_active = 1
            ORDER BY COALESCE(seq_no, 999999) ASC, sku ASC
            "#,
        )?;

        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 启用品种 SKU 清单 (与 list_active 同序)
    pub fn list_active_skus(&self) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT sku FROM product_spec
            WHERE is_active = 1
            ORDER BY COALESCE(seq_no, 999999) ASC, sku ASC
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 启停品种 (停用后不再参与总台账聚合)
    pub fn set_active(&self, sku: &str, is_active: bool) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE product_spec
            SET is_active = ?2, updated_at = ?3
            WHERE sku = ?1
            "#,
            params![sku, if is_active { 1 } else { 0 }, Utc::now().naive_utc()],
        )?;
        Ok(affected)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> SqliteResult<ProductSpec> {
        Ok(ProductSpec {
            sku: row.get(0)?,
            product_name: row.get(1)?,
            units_per_case: row.get(2)?,
            cases_per_pallet: row.get(3)?,
            units_per_truck: row.get(4)?,
            pallets_per_truck_override: row.get(5)?,
            production_rate_cph: row.get(6)?,
            seq_no: row.get(7)?,
            is_active: row.get::<_, i32>(8)? != 0,
            updated_at: row.get(9)?,
            updated_by: row.get(10)?,
        })
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_spec(sku: &str, seq_no: Option<i32>) -> ProductSpec {
        ProductSpec {
            sku: sku.to_string(),
            product_name: format!("测试品种 {}", sku),
            units_per_case: 24,
            cases_per_pallet: 91,
            units_per_truck: 161568,
            pallets_per_truck_override: None,
            production_rate_cph: 2500.0,
            seq_no,
            is_active: true,
            updated_at: Utc::now().naive_utc(),
            updated_by: Some("tester".to_string()),
        }
    }

    #[test]
    fn test_upsert_and_find() {
        let repo = ProductSpecRepository::new(":memory:").unwrap();
        repo.upsert_spec(&create_test_spec("SKU-A", Some(1))).unwrap();

        let found = repo.find_by_sku("SKU-A").unwrap().unwrap();
        assert_eq!(found.units_per_case, 24);
        assert_eq!(found.units_per_truck, 161568);
        assert!(found.is_active);

        // 覆盖更新
        let mut updated = create_test_spec("SKU-A", Some(1));
        updated.production_rate_cph = 2805.0;
        updated.pallets_per_truck_override = Some(26);
        repo.upsert_spec(&updated).unwrap();

        let found = repo.find_by_sku("SKU-A").unwrap().unwrap();
        assert_eq!(found.production_rate_cph, 2805.0);
        assert_eq!(found.pallets_per_truck_override, Some(26));

        assert!(repo.find_by_sku("SKU-MISSING").unwrap().is_none());
    }

    #[test]
    fn test_list_active_fixed_order() {
        let repo = ProductSpecRepository::new(":memory:").unwrap();
        repo.upsert_spec(&create_test_spec("SKU-C", None)).unwrap();
        repo.upsert_spec(&create_test_spec("SKU-B", Some(2))).unwrap();
        repo.upsert_spec(&create_test_spec("SKU-A", Some(1))).unwrap();

        // seq_no 升序, 无序号的垫底
        let skus = repo.list_active_skus().unwrap();
        assert_eq!(skus, vec!["SKU-A", "SKU-B", "SKU-C"]);

        // 停用后不出现在清单
        repo.set_active("SKU-B", false).unwrap();
        let skus = repo.list_active_skus().unwrap();
        assert_eq!(skus, vec!["SKU-A", "SKU-C"]);
    }
}
