// ==========================================
// 饮料代工生产计划系统 - 产品规格 API
// ==========================================
// 职责: 产品包装换算比与灌装速率的登记维护
// 说明: 规格变更会触发总台账去抖刷新
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::product::ProductSpec;
use crate::engine::events::{
    OptionalEventPublisher, PlanningEvent, PlanningEventPublisher, PlanningEventType,
};
use crate::repository::ProductSpecRepository;

// ==========================================
// DTO 定义
// ==========================================

/// 产品规格响应 DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSpecView {
    pub sku: String,
    pub product_name: String,
    pub units_per_case: u32,
    pub cases_per_pallet: u32,
    pub units_per_truck: u32,
    pub pallets_per_truck_override: Option<u32>,
    /// 每车箱数（换算派生值, 向下取整）
    pub cases_per_truck: u32,
    /// 每车托数（换算派生值, 覆盖值优先）
    pub pallets_per_truck: u32,
    pub production_rate_cph: f64,
    pub seq_no: Option<i32>,
    pub is_active: bool,
    pub updated_at: String,
    pub updated_by: Option<String>,
}

impl From<ProductSpec> for ProductSpecView {
    fn from(spec: ProductSpec) -> Self {
        Self {
            cases_per_truck: spec.cases_per_truck(),
            pallets_per_truck: spec.pallets_per_truck(),
            sku: spec.sku,
            product_name: spec.product_name,
            units_per_case: spec.units_per_case,
            cases_per_pallet: spec.cases_per_pallet,
            units_per_truck: spec.units_per_truck,
            pallets_per_truck_override: spec.pallets_per_truck_override,
            production_rate_cph: spec.production_rate_cph,
            seq_no: spec.seq_no,
            is_active: spec.is_active,
            updated_at: spec.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            updated_by: spec.updated_by,
        }
    }
}

/// 登记或更新产品规格请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertProductSpecRequest {
    pub sku: String,
    pub product_name: String,
    pub units_per_case: u32,
    pub cases_per_pallet: u32,
    pub units_per_truck: u32,
    pub pallets_per_truck_override: Option<u32>,
    pub production_rate_cph: f64,
    pub seq_no: Option<i32>,
    pub updated_by: Option<String>,
}

// ==========================================
// ProductApi
// ==========================================

/// 产品规格 API
///
/// 职责：
/// 1. 登记/更新产品规格（换算比 + 灌装速率）
/// 2. 查询单个规格与活跃清单
/// 3. 停用/启用（停用后不再参与总台账聚合）
pub struct ProductApi {
    products: Arc<ProductSpecRepository>,
    event_publisher: OptionalEventPublisher,
}

impl ProductApi {
    pub fn new(
        products: Arc<ProductSpecRepository>,
        event_publisher: Option<Arc<dyn PlanningEventPublisher>>,
    ) -> Self {
        let event_publisher = match event_publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };

        Self {
            products,
            event_publisher,
        }
    }

    /// 登记或更新产品规格
    ///
    /// # 说明
    /// - SKU 已存在则整体更新；停用状态保持不变（用 set_active 切换）
    /// - 换算比三项都必须 >= 1, 否则该品种无法推演/排车
    pub fn upsert_spec(&self, request: UpsertProductSpecRequest) -> ApiResult<ProductSpecView> {
        self.validate_upsert_request(&request)?;

        let sku = request.sku.trim().to_string();
        let is_active = self
            .products
            .find_by_sku(&sku)?
            .map(|existing| existing.is_active)
            .unwrap_or(true);

        let spec = ProductSpec {
            sku: sku.clone(),
            product_name: request.product_name.trim().to_string(),
            units_per_case: request.units_per_case,
            cases_per_pallet: request.cases_per_pallet,
            units_per_truck: request.units_per_truck,
            pallets_per_truck_override: request.pallets_per_truck_override,
            production_rate_cph: request.production_rate_cph,
            seq_no: request.seq_no,
            is_active,
            updated_at: chrono::Local::now().naive_local(),
            updated_by: request.updated_by,
        };

        self.products.upsert_spec(&spec)?;
        self.publish_change(&sku, "upsert_spec");

        Ok(spec.into())
    }

    /// 查询单个产品规格
    pub fn get_spec(&self, sku: &str) -> ApiResult<Option<ProductSpecView>> {
        let sku = Self::require_sku(sku)?;
        Ok(self.products.find_by_sku(&sku)?.map(Into::into))
    }

    /// 活跃产品清单（按展示顺序）
    pub fn list_active(&self) -> ApiResult<Vec<ProductSpecView>> {
        let specs = self.products.list_active()?;
        Ok(specs.into_iter().map(Into::into).collect())
    }

    /// 停用/启用产品
    pub fn set_active(&self, sku: &str, is_active: bool) -> ApiResult<()> {
        let sku = Self::require_sku(sku)?;
        let affected = self.products.set_active(&sku, is_active)?;
        if affected == 0 {
            return Err(ApiError::NotFound(crate::i18n::t_with_args(
                "ledger.spec_missing",
                &[("sku", &sku)],
            )));
        }

        self.publish_change(&sku, "set_active");
        Ok(())
    }

    // ==========================================
    // 私有辅助方法
    // ==========================================

    fn require_sku(value: &str) -> ApiResult<String> {
        let sku = value.trim();
        if sku.is_empty() {
            return Err(ApiError::InvalidInput("SKU不能为空".to_string()));
        }
        Ok(sku.to_string())
    }

    fn validate_upsert_request(&self, request: &UpsertProductSpecRequest) -> ApiResult<()> {
        if request.sku.trim().is_empty() {
            return Err(ApiError::InvalidInput("SKU不能为空".to_string()));
        }

        if request.product_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("品名不能为空".to_string()));
        }

        if request.units_per_case == 0 {
            return Err(ApiError::InvalidInput("每箱瓶数必须 >= 1".to_string()));
        }

        if request.cases_per_pallet == 0 {
            return Err(ApiError::InvalidInput("每托箱数必须 >= 1".to_string()));
        }

        if request.units_per_truck == 0 {
            return Err(ApiError::InvalidInput("每车瓶数必须 >= 1".to_string()));
        }

        if let Some(0) = request.pallets_per_truck_override {
            return Err(ApiError::InvalidInput("每车托数覆盖值必须 >= 1".to_string()));
        }

        if !request.production_rate_cph.is_finite() || request.production_rate_cph < 0.0 {
            return Err(ApiError::InvalidInput(
                "灌装速率必须为非负有限数（箱/小时）".to_string(),
            ));
        }

        Ok(())
    }

    fn publish_change(&self, sku: &str, source: &str) {
        let event = PlanningEvent::for_sku(
            PlanningEventType::ProductSpecChanged,
            sku,
            Some(source.to_string()),
        );
        if let Err(e) = self.event_publisher.publish(event) {
            tracing::warn!(sku = sku, "规格变更事件发布失败: {}", e);
        }
    }
}
