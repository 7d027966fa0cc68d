// ==========================================
// 饮料代工生产计划系统 - 产品规格解析引擎
// ==========================================
// 职责: 规格缺失判定 + 换算比校验 + 派生换算值物化
// 输入: API 层加载的 ProductSpec (可缺失)
// 输出: ResolvedSpec (推演/排程两个引擎的公共前置)
// ==========================================
// 红线: 规格缺失必须以 SpecNotFound 上抛, 调用方按
//       "无结果可用"处理, 不得降级为全 0 规格
// ==========================================

use crate::domain::product::ProductSpec;
use crate::engine::error::{EngineError, EngineResult};

// ==========================================
// ResolvedSpec - 解析后的规格
// ==========================================
// 派生换算值在此一次物化, 下游引擎不再各自除一遍
#[derive(Debug, Clone)]
pub struct ResolvedSpec {
    pub spec: ProductSpec,
    pub cases_per_truck: u32,   // floor(每车瓶数 / 每箱瓶数)
    pub pallets_per_truck: u32, // floor(每车箱数 / 每托箱数), 人工覆盖优先
}

impl ResolvedSpec {
    /// 灌装速率 (箱/小时)
    pub fn burn_rate_cph(&self) -> f64 {
        self.spec.production_rate_cph
    }

    /// 每车瓶数
    pub fn units_per_truck(&self) -> f64 {
        self.spec.units_per_truck as f64
    }

    /// 每箱瓶数
    pub fn units_per_case(&self) -> f64 {
        self.spec.units_per_case as f64
    }
}

// ==========================================
// SpecResolver - 产品规格解析引擎
// ==========================================
pub struct SpecResolver {
    // 无状态引擎,不需要注入依赖
    // Repository 操作由调用方处理
}

impl SpecResolver {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 解析产品规格
    ///
    /// # 参数
    /// - `sku`: SKU 编码
    /// - `spec`: 调用方从配置协作方加载的规格, 未找到为 None
    ///
    /// # 返回
    /// - `Ok(ResolvedSpec)`: 换算比齐备, 派生值已物化
    /// - `Err(SpecNotFound)`: SKU 未登记
    /// - `Err(InvalidPackagingRatio)`: 换算比为 0/负或速率非法
    pub fn resolve(&self, sku: &str, spec: Option<ProductSpec>) -> EngineResult<ResolvedSpec> {
        let spec = spec.ok_or_else(|| EngineError::SpecNotFound(sku.to_string()))?;

        if !spec.has_valid_ratios() {
            return Err(EngineError::InvalidPackagingRatio {
                sku: sku.to_string(),
                message: format!(
                    "units_per_case={}, cases_per_pallet={}, units_per_truck={}, production_rate_cph={}",
                    spec.units_per_case,
                    spec.cases_per_pallet,
                    spec.units_per_truck,
                    spec.production_rate_cph
                ),
            });
        }

        let cases_per_truck = spec.cases_per_truck();
        let pallets_per_truck = spec.pallets_per_truck();

        Ok(ResolvedSpec {
            spec,
            cases_per_truck,
            pallets_per_truck,
        })
    }
}

// ==========================================
// Default trait 实现
// ==========================================
impl Default for SpecResolver {
    fn default() -> Self {
        Self::new()
    }
}
