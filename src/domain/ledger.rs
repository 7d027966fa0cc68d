// ==========================================
// 饮料代工生产计划系统 - 库存台账领域模型
// ==========================================
// 职责: 库存推演的输出结构 (逐日余额/风险/采购建议)
// 红线: 全部为派生数据, 每次推演整体重建, 不落库不原地改
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::types::AdviceUrgency;

// ==========================================
// LedgerDay - 台账单日行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerDay {
    pub ledger_date: NaiveDate, // 台账日期
    pub balance_units: f64,     // 当日末余额 (瓶)
    pub is_safety_risk: bool,   // 余额 < 0
    pub is_overflow: bool,      // 余额 > 库容上限 (未配置库容则恒为 false)
    pub is_confirmed: bool,     // 当日存在实绩录入
}

// ==========================================
// PurchaseAdvice - 采购建议
// ==========================================
// 同一下单日的多笔缺口合并为一条建议 (车数累计)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseAdvice {
    pub order_date: NaiveDate,  // 下单日 = 需求日 - 提前期 (早于今天则压到今天)
    pub need_date: NaiveDate,   // 需求日 (首个触发该建议的缺口日)
    pub truck_count: u32,       // 建议车数 (增量口径, 全表累加即总需求)
    pub urgency: AdviceUrgency, // 今日必办 / 近期待办
    pub reason_json: String,    // 成因 (JSON: 需求日/最深缺口/车数/逐触发日明细)
}

// ==========================================
// LedgerProjection - 单品种推演结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerProjection {
    pub sku: String,                      // SKU 编码
    pub days: Vec<LedgerDay>,             // 逐日台账 (日期升序)
    pub safety_target_units: f64,         // 安全库存目标 (瓶)
    pub runway_days: u32,                 // 续航天数 (今天起至首个风险日前的连续天数)
    pub first_risk_date: Option<NaiveDate>, // 首个余额转负日
    pub is_secure: bool,                  // 在库(厂内+场内折瓶) ≥ 安全目标
    pub advice: Vec<PurchaseAdvice>,      // 采购建议 (按下单日升序)
}

impl LedgerProjection {
    /// 风险天数 (余额为负的日数)
    pub fn risk_day_count(&self) -> usize {
        self.days.iter().filter(|d| d.is_safety_risk).count()
    }

    /// 今日必办的建议车数合计
    pub fn due_today_trucks(&self) -> u32 {
        self.advice
            .iter()
            .filter(|a| a.urgency == AdviceUrgency::DueToday)
            .map(|a| a.truck_count)
            .sum()
    }
}
