// ==========================================
// 饮料代工生产计划系统 - 性能核算
// ==========================================
// 两个探头:
// - rusqlite trace/profile 回调: 统计语句数, 对慢 SQL 告警
// - PerfGuard: 包住门面操作, 落 elapsed_ms 与期间 SQL 核算
// 限定: 核算为线程局部, 跨线程/await 的 SQL 不计入当前 Guard
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static SLOW_SQL_MS: AtomicU64 = AtomicU64::new(0);

/// 线程内 SQL 核算（Copy 快照, 由 PerfGuard 做差值）
#[derive(Debug, Clone, Copy, Default)]
struct SqlTally {
    depth: u32,
    statements: u64,
    slow: u64,
}

thread_local! {
    static TALLY: Cell<SqlTally> = Cell::new(SqlTally::default());
}

fn env_flag_on(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// 压平空白并按字符数截断, 超长补省略号
fn compact_sql(sql: &str, limit: usize) -> String {
    let flat = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= limit {
        return flat;
    }
    let head: String = flat.chars().take(limit).collect();
    format!("{}…", head)
}

/// 读取采样开关与慢 SQL 阈值
///
/// - `COPACK_APS_PERF_SQL`: 强制开/关; 未设置时 Debug 构建默认开
/// - `COPACK_APS_SLOW_SQL_MS`: 慢 SQL 阈值（毫秒, 置 0 关闭告警）
fn sql_sampling() -> (bool, u64) {
    let enabled = std::env::var("COPACK_APS_PERF_SQL")
        .map(|v| env_flag_on(&v))
        .unwrap_or(cfg!(debug_assertions));

    let slow_ms = std::env::var("COPACK_APS_SLOW_SQL_MS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(if cfg!(debug_assertions) { 50 } else { 200 });

    (enabled, slow_ms)
}

/// 给连接挂 SQL 观测回调
///
/// 未开启时显式摘除回调, 避免复用连接残留。
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let (enabled, slow_ms) = sql_sampling();
    if !enabled {
        conn.trace(None);
        conn.profile(None);
        return;
    }

    SLOW_SQL_MS.store(slow_ms, Ordering::Relaxed);
    conn.trace(Some(count_statement));
    conn.profile(Some(report_duration));
}

fn count_statement(_sql: &str) {
    TALLY.with(|t| {
        let mut v = t.get();
        if v.depth == 0 {
            return;
        }
        v.statements = v.statements.saturating_add(1);
        t.set(v);
    });
}

fn report_duration(sql: &str, took: Duration) {
    let limit = SLOW_SQL_MS.load(Ordering::Relaxed);
    let ms = took.as_millis() as u64;
    if limit == 0 || ms < limit {
        return;
    }

    tracing::warn!(
        target: "slow_sql",
        duration_ms = ms,
        sql = %compact_sql(sql, 420),
        "slow sql"
    );
    TALLY.with(|t| {
        let mut v = t.get();
        if v.depth == 0 {
            return;
        }
        v.slow = v.slow.saturating_add(1);
        t.set(v);
    });
}

/// 门面操作耗时统计 Guard
///
/// 构造时把线程核算入栈, Drop 时输出
/// `target=perf op=... elapsed_ms=.. sql_count=.. slow_sql_count=..`
///
/// ```ignore
/// let _perf = crate::perf::PerfGuard::new("api.get_schedule");
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    baseline: SqlTally,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        let baseline = TALLY.with(|t| {
            let mut v = t.get();
            v.depth = v.depth.saturating_add(1);
            t.set(v);
            v
        });
        Self {
            op,
            start: Instant::now(),
            baseline,
        }
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let end = TALLY.with(|t| {
            let mut v = t.get();
            v.depth = v.depth.saturating_sub(1);
            t.set(v);
            v
        });

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms = self.start.elapsed().as_millis() as u64,
            sql_count = end.statements.saturating_sub(self.baseline.statements),
            slow_sql_count = end.slow.saturating_sub(self.baseline.slow),
            "done"
        );
    }
}
