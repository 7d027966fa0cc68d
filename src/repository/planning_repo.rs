// ==========================================
// 饮料代工生产计划系统 - 计划录入仓储
// ==========================================
// 职责:
// - 管理 planning_entry 表 (需求/实际/到货 三类日录入)
// - 管理 inventory_anchor 表 (实盘锚点, 每品种至多一条)
// - 为推演引擎装配 PlanningSnapshot
// 红线:
// - ACTUAL 的 0 是"确认未产", 必须持久化, 不得视为删除
// - 数值落库前一律 sanitize (非有限数/负数归零)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::planning::{sanitize_qty, InventoryAnchor, PlanningSnapshot};
use crate::domain::types::EntryKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

pub struct PlanningRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PlanningRepository {
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
            CREATE TABLE IF NOT EXISTS planning_entry (
              sku TEXT NOT NULL,
              entry_date TEXT NOT NULL,
              kind TEXT NOT NULL CHECK (kind IN ('DEMAND', 'ACTUAL', 'INBOUND')),
              qty REAL NOT NULL DEFAULT 0,
              updated_at TEXT NOT NULL DEFAULT (datetime('now')),
              PRIMARY KEY (sku, entry_date, kind)
            );

            CREATE INDEX IF NOT EXISTS idx_planning_entry_sku_date
              ON planning_entry(sku, entry_date);

            CREATE TABLE IF NOT EXISTS inventory_anchor (
              sku TEXT PRIMARY KEY,
              anchor_date TEXT NOT NULL,
              count_units REAL NOT NULL DEFAULT 0,
              noted_by TEXT,
              noted_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    /// 写入或覆盖一格录入 (含 qty = 0; 数值落库前净化)
    pub fn upsert_entry(
        &self,
        sku: &str,
        entry_date: NaiveDate,
        kind: EntryKind,
        qty: f64,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO planning_entry (sku, entry_date, kind, qty, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(sku, entry_date, kind) DO UPDATE SET
                qty = excluded.qty,
                updated_at = excluded.updated_at
            "#,
            params![
                sku,
                entry_date,
                kind.to_db_str(),
                sanitize_qty(qty),
                Utc::now().naive_utc(),
            ],
        )?;
        Ok(())
    }

    /// 清除一格录入 (ACTUAL 清除后回落到需求口径)
    pub fn clear_entry(
        &self,
        sku: &str,
        entry_date: NaiveDate,
        kind: EntryKind,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM planning_entry WHERE sku = ?1 AND entry_date = ?2 AND kind = ?3",
            params![sku, entry_date, kind.to_db_str()],
        )?;
        Ok(affected)
    }

    /// 装配单品种全量快照 (三类录入 + 锚点)
    pub fn load_snapshot(&self, sku: &str) -> RepositoryResult<PlanningSnapshot> {
        let mut snapshot = PlanningSnapshot::empty(sku);

        {
            let conn = self.get_conn()?;
            let mut stmt = conn.prepare(
                r#"
                SELECT entry_date, kind, qty
                FROM planning_entry
                WHERE sku = ?1
                ORDER BY entry_date ASC
                "#,
            )?;

            let rows = stmt
                .query_map(params![sku], |row| {
                    Ok((
                        row.get::<_, NaiveDate>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, f64>(2)?,
                    ))
                })?
                .collect::<SqliteResult<Vec<_>>>()?;

            for (entry_date, kind_str, qty) in rows {
                let Some(kind) = EntryKind::from_str(&kind_str) else {
                    // 库内残留未知类别时跳过, 不让单格坏数据拖垮整张快照
                    continue;
                };
                let qty = sanitize_qty(qty);
                match kind {
                    EntryKind::Demand => {
                        snapshot.demand_cases.insert(entry_date, qty);
                    }
                    EntryKind::Actual => {
                        snapshot.actual_cases.insert(entry_date, qty);
                    }
                    EntryKind::Inbound => {
                        snapshot.inbound_loads.insert(entry_date, qty);
                    }
                }
            }
        }

        snapshot.anchor = self.find_anchor(sku)?;
        Ok(snapshot)
    }

    /// 替换实盘锚点 (整行覆盖, 每品种恒为最新一次盘点)
    pub fn replace_anchor(&self, anchor: &InventoryAnchor) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO inventory_anchor (sku, anchor_date, count_units, noted_by, noted_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(sku) DO UPDATE SET
                anchor_date = excluded.anchor_date,
                count_units = excluded.count_units,
                noted_by = excluded.noted_by,
                noted_at = excluded.noted_at
            "#,
            params![
                anchor.sku,
                anchor.anchor_date,
                sanitize_qty(anchor.count_units),
                anchor.noted_by,
                anchor.noted_at,
            ],
        )?;
        Ok(())
    }

    pub fn find_anchor(&self, sku: &str) -> RepositoryResult<Option<InventoryAnchor>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT sku, anchor_date, count_units, noted_by, noted_at
            FROM inventory_anchor
            WHERE sku = ?1
            "#,
        )?;

        let result = stmt.query_row(params![sku], |row| {
            Ok(InventoryAnchor {
                sku: row.get(0)?,
                anchor_date: row.get(1)?,
                count_units: row.get(2)?,
                noted_by: row.get(3)?,
                noted_at: row.get(4)?,
            })
        });

        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 删除实盘锚点 (品种下线清理用)
    pub fn delete_anchor(&self, sku: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM inventory_anchor WHERE sku = ?1",
            params![sku],
        )?;
        Ok(affected)
    }
}
