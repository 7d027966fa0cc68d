// ==========================================
// 饮料代工生产计划系统 - 计划数据领域模型
// ==========================================
// 职责: 单品种计划数据快照 (需求/实绩/到货/库存锚点)
// 红线: 快照是稀疏映射, 缺失日期语义为 0
// 红线: 引擎按不可变快照消费, 持久化由仓储负责
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ==========================================
// InventoryAnchor - 库存锚点 (盘点基准)
// ==========================================
// 同一 SKU 最多一个生效锚点; 更正口径差异的唯一手段是替换锚点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryAnchor {
    pub sku: String,               // SKU 编码
    pub anchor_date: NaiveDate,    // 盘点日期
    pub count_units: f64,          // 盘点库存 (基准单位: 瓶), 视为锚点日期初余额
    pub noted_by: Option<String>,  // 盘点人
    pub noted_at: NaiveDateTime,   // 录入时间
}

// ==========================================
// PlanningSnapshot - 计划数据快照
// ==========================================
// 三张稀疏日期映射: 需求(箱)/实绩(箱)/到货(车)
// BTreeMap 保证日期升序遍历, 推演无需再排序
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanningSnapshot {
    pub sku: String,                            // SKU 编码
    pub demand_cases: BTreeMap<NaiveDate, f64>, // 需求计划 (箱)
    pub actual_cases: BTreeMap<NaiveDate, f64>, // 生产实绩 (箱), 仅已确认日存在
    pub inbound_loads: BTreeMap<NaiveDate, f64>, // 到货车数 (车)
    pub anchor: Option<InventoryAnchor>,        // 库存锚点
}

impl PlanningSnapshot {
    /// 构造空快照 (取数失败时的降级替身)
    pub fn empty(sku: &str) -> Self {
        PlanningSnapshot {
            sku: sku.to_string(),
            ..Default::default()
        }
    }

    /// 三张映射是否均无记录
    pub fn is_empty(&self) -> bool {
        self.demand_cases.is_empty() && self.actual_cases.is_empty() && self.inbound_loads.is_empty()
    }

    /// 三张映射的日期键并集 (升序)
    pub fn date_keys(&self) -> BTreeSet<NaiveDate> {
        let mut keys: BTreeSet<NaiveDate> = BTreeSet::new();
        keys.extend(self.demand_cases.keys().copied());
        keys.extend(self.actual_cases.keys().copied());
        keys.extend(self.inbound_loads.keys().copied());
        keys
    }
}

// ==========================================
// OnHandStock - 当前在库 (安全库存判定输入)
// ==========================================
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OnHandStock {
    pub floor_units: f64, // 厂内库存 (瓶)
    pub yard_loads: f64,  // 场内待卸车数 (车)
}

// ==========================================
// 数据质量兜底
// ==========================================

/// 数量值兜底: 负数与非有限值一律按 0 计
///
/// 用户录入容错优先于严格校验, 该类问题不上抛
pub fn sanitize_qty(value: f64) -> f64 {
    if !value.is_finite() || value < 0.0 {
        0.0
    } else {
        value
    }
}
