// ==========================================
// 饮料代工生产计划系统 - 总台账聚合引擎
// ==========================================
// 职责: 跨品种日视图聚合 (纯计算, 取数由服务层负责)
// 输入: 固定品种序 + 各品种计划数据快照
// 输出: MasterLedger (每次聚合整体重建)
// ==========================================
// 规则:
// 1) 并集所有品种三张映射的日期键, 升序
// 2) 品种按调用方给定的固定顺序迭代, 输出确定
// 3) 活动行条件: 需求>0 或 (实绩存在且>0) 或 到货>0
// 4) 过滤后无活动行的日期整日剔除
// ==========================================

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use tracing::instrument;

use crate::domain::master::{MasterActivityRow, MasterLedger, MasterLedgerDay};
use crate::domain::planning::{sanitize_qty, PlanningSnapshot};

// ==========================================
// MasterAggregator - 总台账聚合引擎
// ==========================================
pub struct MasterAggregator {
    // 无状态引擎,不需要注入依赖
}

impl MasterAggregator {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 聚合总台账
    ///
    /// # 参数
    /// - `ordered_skus`: 品种迭代顺序 (通常为产品主数据的展示序)
    /// - `snapshots`: 各品种快照; 取数失败的品种由调用方以空快照顶替
    #[instrument(skip(self, ordered_skus, snapshots), fields(product_count = ordered_skus.len()))]
    pub fn aggregate(
        &self,
        ordered_skus: &[String],
        snapshots: &HashMap<String, PlanningSnapshot>,
    ) -> MasterLedger {
        // 1. 日期键并集 (BTreeSet 天然升序)
        let mut dates: BTreeSet<NaiveDate> = BTreeSet::new();
        for sku in ordered_skus {
            if let Some(snapshot) = snapshots.get(sku) {
                dates.extend(snapshot.date_keys());
            }
        }

        // 2. 逐日逐品种产出活动行
        let mut days = Vec::new();
        for date in dates {
            let mut rows = Vec::new();
            for sku in ordered_skus {
                let Some(snapshot) = snapshots.get(sku) else {
                    continue;
                };
                if let Some(row) = self.activity_row(sku, snapshot, date) {
                    rows.push(row);
                }
            }
            // 3. 无活动行的日期不出现
            if !rows.is_empty() {
                days.push(MasterLedgerDay {
                    ledger_date: date,
                    rows,
                });
            }
        }

        tracing::debug!("总台账聚合完成: {} 天, {} 行", days.len(), days.iter().map(|d| d.rows.len()).sum::<usize>());

        MasterLedger { days }
    }

    /// 单品种单日活动行 (无活动返回 None)
    fn activity_row(
        &self,
        sku: &str,
        snapshot: &PlanningSnapshot,
        date: NaiveDate,
    ) -> Option<MasterActivityRow> {
        let demand = snapshot
            .demand_cases
            .get(&date)
            .map(|v| sanitize_qty(*v))
            .unwrap_or(0.0);
        let actual = snapshot.actual_cases.get(&date).map(|v| sanitize_qty(*v));
        let inbound = snapshot
            .inbound_loads
            .get(&date)
            .map(|v| sanitize_qty(*v))
            .unwrap_or(0.0);

        let has_activity = demand > 0.0 || actual.map_or(false, |a| a > 0.0) || inbound > 0.0;
        if !has_activity {
            return None;
        }

        Some(MasterActivityRow {
            sku: sku.to_string(),
            demand_cases: demand,
            actual_cases: actual,
            inbound_loads: inbound,
        })
    }
}

// ==========================================
// Default trait 实现
// ==========================================
impl Default for MasterAggregator {
    fn default() -> Self {
        Self::new()
    }
}
