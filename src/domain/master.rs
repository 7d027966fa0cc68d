// ==========================================
// 饮料代工生产计划系统 - 总台账领域模型
// ==========================================
// 职责: 跨品种日视图的输出结构与聚合运行元数据
// 红线: 每次聚合从稀疏映射整体重建, 输出整体替换
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// MasterActivityRow - 总台账活动行
// ==========================================
// 仅当日有动作的品种成行: 需求>0 或 实绩>0 或 到货>0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterActivityRow {
    pub sku: String,               // SKU 编码
    pub demand_cases: f64,         // 需求 (箱)
    pub actual_cases: Option<f64>, // 实绩 (箱), 未录入为 None
    pub inbound_loads: f64,        // 到货 (车)
}

// ==========================================
// MasterLedgerDay - 总台账单日
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterLedgerDay {
    pub ledger_date: NaiveDate,      // 日期
    pub rows: Vec<MasterActivityRow>, // 活动行 (固定品种序)
}

// ==========================================
// MasterLedger - 总台账
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MasterLedger {
    pub days: Vec<MasterLedgerDay>, // 日期升序, 无活动的日期不出现
}

impl MasterLedger {
    /// 按日期取单日视图
    pub fn day(&self, date: NaiveDate) -> Option<&MasterLedgerDay> {
        self.days.iter().find(|d| d.ledger_date == date)
    }

    /// 活动行总数
    pub fn row_count(&self) -> usize {
        self.days.iter().map(|d| d.rows.len()).sum()
    }
}

// ==========================================
// FetchFailure - 取数失败记录
// ==========================================
// 单品种取数失败不终止聚合, 以空数据顶替并在此留痕
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchFailure {
    pub sku: String,    // 失败品种
    pub reason: String, // 失败原因 (面向运维的简述)
}

// ==========================================
// MasterAggregateResult - 聚合运行结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterAggregateResult {
    pub run_id: String,             // 本次聚合运行 ID (uuid)
    pub generated_at: NaiveDateTime, // 生成时间
    pub duration_ms: u64,           // 聚合耗时 (毫秒)
    pub product_count: usize,       // 参与品种数
    pub ledger: MasterLedger,       // 总台账
    pub failures: Vec<FetchFailure>, // 取数失败清单
}

impl MasterAggregateResult {
    /// 是否存在取数失败
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
