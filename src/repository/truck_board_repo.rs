// ==========================================
// 饮料代工生产计划系统 - 车位看板仓储
// ==========================================
// 职责:
// - 管理 truck_board (每品种首车时刻)
// - 管理 truck_po_assignment (车位挂 PO)
// - 管理 truck_cancelled_load (取消车位)
// 红线:
// - 车位号由排程引擎按未过滤序列生成, 仓储只按 slot_id 记键,
//   不得因取消而挪动后续车位的挂账
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::truck::TruckBoardState;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

pub struct TruckBoardRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TruckBoardRepository {
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
            CREATE TABLE IF NOT EXISTS truck_board (
              sku TEXT PRIMARY KEY,
              shift_start_time TEXT NOT NULL DEFAULT '08:00'
            );

            CREATE TABLE IF NOT EXISTS truck_po_assignment (
              sku TEXT NOT NULL,
              slot_id INTEGER NOT NULL,
              po_no TEXT NOT NULL,
              PRIMARY KEY (sku, slot_id)
            );

            CREATE TABLE IF NOT EXISTS truck_cancelled_load (
              sku TEXT NOT NULL,
              slot_id INTEGER NOT NULL,
              PRIMARY KEY (sku, slot_id)
            );
            "#,
        )?;
        Ok(())
    }

    /// 读取整块看板状态 (未初始化的品种返回默认首车 08:00)
    pub fn load_board(&self, sku: &str) -> RepositoryResult<TruckBoardState> {
        let conn = self.get_conn()?;
        let mut board = TruckBoardState::new(sku);

        let shift_start = conn
            .query_row(
                "SELECT shift_start_time FROM truck_board WHERE sku = ?1",
                params![sku],
                |row| row.get::<_, String>(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        if let Some(t) = shift_start {
            board.shift_start_time = t;
        }

        let mut stmt =
            conn.prepare("SELECT slot_id, po_no FROM truck_po_assignment WHERE sku = ?1")?;
        let assignments = stmt
            .query_map(params![sku], |row| {
                Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        for (slot_id, po_no) in assignments {
            board.po_assignments.insert(slot_id, po_no);
        }

        let mut stmt =
            conn.prepare("SELECT slot_id FROM truck_cancelled_load WHERE sku = ?1")?;
        let cancelled = stmt
            .query_map(params![sku], |row| row.get::<_, u32>(0))?
            .collect::<SqliteResult<Vec<_>>>()?;
        board.cancelled_loads.extend(cancelled);

        Ok(board)
    }

    /// 调整首车时刻 ("HH:MM", 合法性由接口层校验)
    pub fn set_shift_start(&self, sku: &str, shift_start_time: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO truck_board (sku, shift_start_time)
            VALUES (?1, ?2)
            ON CONFLICT(sku) DO UPDATE SET shift_start_time = excluded.shift_start_time
            "#,
            params![sku, shift_start_time],
        )?;
        Ok(())
    }

    /// 车位挂 PO (同车位覆盖)
    pub fn assign_po(&self, sku: &str, slot_id: u32, po_no: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO truck_po_assignment (sku, slot_id, po_no)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(sku, slot_id) DO UPDATE SET po_no = excluded.po_no
            "#,
            params![sku, slot_id, po_no],
        )?;
        Ok(())
    }

    /// 摘除车位 PO
    pub fn clear_po(&self, sku: &str, slot_id: u32) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM truck_po_assignment WHERE sku = ?1 AND slot_id = ?2",
            params![sku, slot_id],
        )?;
        Ok(affected)
    }

    /// 取消车位 (幂等)
    pub fn cancel_load(&self, sku: &str, slot_id: u32) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO truck_cancelled_load (sku, slot_id) VALUES (?1, ?2)",
            params![sku, slot_id],
        )?;
        Ok(())
    }

    /// 恢复已取消车位
    pub fn restore_load(&self, sku: &str, slot_id: u32) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM truck_cancelled_load WHERE sku = ?1 AND slot_id = ?2",
            params![sku, slot_id],
        )?;
        Ok(affected)
    }
}
