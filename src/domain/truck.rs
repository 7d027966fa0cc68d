// ==========================================
// 饮料代工生产计划系统 - 到货排程领域模型
// ==========================================
// 职责: 到货时刻表的输出结构与看板持久状态
// 红线: 排程为纯派生数据; PO 绑定与取消是外部持久状态,
//       每次重算原样回贴, 不归引擎所有
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::domain::types::ShiftBucket;

// ==========================================
// TruckSlot - 到货槽位
// ==========================================
// slot_id 在取消过滤之前按生成序分配, 同一代内稳定,
// 先头槽位被取消也不重编号, PO 绑定不漂移
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruckSlot {
    pub slot_id: u32,           // 稳定序号 (1 起)
    pub arrival_time: String,   // 展示时刻 HH:MM
    pub raw_decimal_hours: f64, // 未取整的到达小时 [0, 24), 归班依据
    pub shift: ShiftBucket,     // 所属班次
    pub po_no: Option<String>,  // 采购单号 (人工绑定)
}

// ==========================================
// ShiftSummary - 班次汇总
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftSummary {
    pub shift: ShiftBucket, // 班次
    pub loads: u32,         // 该班次到货车数 (不含已取消)
}

// ==========================================
// TruckSchedule - 单品种到货排程
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruckSchedule {
    pub sku: String,               // SKU 编码
    pub required_daily_loads: u32, // 日需车数 = ceil(24h 耗用 / 每车箱数)
    pub hours_per_truck: f64,      // 到车间隔 (小时), 速率为 0 时为 0
    pub shift_start_time: String,  // 首车基准时刻 HH:MM
    pub slots: Vec<TruckSlot>,     // 有效槽位 (已取消的不在列)
    pub shifts: Vec<ShiftSummary>, // 三班汇总 (S1→S2→S3 固定序)
    pub is_high_risk: bool,        // 安全库存车数 < 日需车数
}

impl TruckSchedule {
    /// 有效到货车数 (不含已取消)
    pub fn active_loads(&self) -> u32 {
        self.slots.len() as u32
    }
}

// ==========================================
// TruckBoardState - 到货看板持久状态
// ==========================================
// 看板上的人工痕迹: 首车时刻、PO 绑定、取消标记
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruckBoardState {
    pub sku: String,                        // SKU 编码
    pub shift_start_time: String,           // 首车基准时刻 HH:MM
    pub po_assignments: HashMap<u32, String>, // 槽位 → 采购单号
    pub cancelled_loads: HashSet<u32>,      // 已取消槽位
}

impl TruckBoardState {
    /// 默认首车时刻
    pub const DEFAULT_SHIFT_START: &'static str = "08:00";

    /// 构造某 SKU 的初始看板状态
    pub fn new(sku: &str) -> Self {
        TruckBoardState {
            sku: sku.to_string(),
            shift_start_time: Self::DEFAULT_SHIFT_START.to_string(),
            po_assignments: HashMap::new(),
            cancelled_loads: HashSet::new(),
        }
    }
}
