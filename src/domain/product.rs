// ==========================================
// 饮料代工生产计划系统 - 产品规格领域模型
// ==========================================
// 职责: 产品包装换算比与灌装速率的唯一载体
// 红线: 规格由配置协作方维护,引擎只读
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// ProductSpec - 产品规格主数据
// ==========================================
// 换算链: 瓶 → 箱 → 托 → 车
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSpec {
    pub sku: String,                             // SKU 编码 (唯一)
    pub product_name: String,                    // 品名
    pub units_per_case: u32,                     // 每箱瓶数
    pub cases_per_pallet: u32,                   // 每托箱数
    pub units_per_truck: u32,                    // 每车瓶数
    pub pallets_per_truck_override: Option<u32>, // 每车托数 (人工覆盖值)
    pub production_rate_cph: f64,                // 灌装速率 (箱/小时)
    pub seq_no: Option<i32>,                     // 展示顺序 (总台账按此排)
    pub is_active: bool,                         // 是否参与计划
    pub updated_at: NaiveDateTime,               // 更新时间
    pub updated_by: Option<String>,              // 更新人
}

impl ProductSpec {
    /// 每车箱数 = floor(每车瓶数 / 每箱瓶数)
    ///
    /// 红线: 除数为 0 时结果为 0, 不得出现 NaN/Inf
    pub fn cases_per_truck(&self) -> u32 {
        if self.units_per_case == 0 {
            return 0;
        }
        self.units_per_truck / self.units_per_case
    }

    /// 每车托数 = floor(每车箱数 / 每托箱数), 人工覆盖值优先
    ///
    /// 整车不按半托计, 一律向下取整
    pub fn pallets_per_truck(&self) -> u32 {
        if let Some(v) = self.pallets_per_truck_override {
            return v;
        }
        if self.cases_per_pallet == 0 {
            return 0;
        }
        self.cases_per_truck() / self.cases_per_pallet
    }

    /// 包装换算比是否齐备 (推演/排程的前置校验)
    pub fn has_valid_ratios(&self) -> bool {
        self.units_per_case > 0
            && self.cases_per_pallet > 0
            && self.units_per_truck > 0
            && self.production_rate_cph.is_finite()
            && self.production_rate_cph >= 0.0
    }
}
