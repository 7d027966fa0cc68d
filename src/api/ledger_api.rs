// ==========================================
// 饮料代工生产计划系统 - 库存台账 API
// ==========================================
// 职责:
// - 单品种滚动库存推演（台账 + 风险 + 采购建议）
// - 计划录入写入口（需求/实际/到货/实盘锚点）
// 说明:
// - 所有写操作落库后发布变更事件, 由服务层合并成总台账刷新
// - 推演本身无状态, 每次调用按当前库内数据现算
// ==========================================

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::calendar::{format_plan_date, parse_plan_date};
use crate::domain::ledger::LedgerProjection;
use crate::domain::planning::{InventoryAnchor, OnHandStock, PlanningSnapshot};
use crate::domain::types::EntryKind;
use crate::engine::events::{OptionalEventPublisher, PlanningEvent, PlanningEventPublisher, PlanningEventType};
use crate::engine::ledger_projector::{LedgerProjector, ProjectionPolicy};
use crate::engine::spec_resolver::SpecResolver;
use crate::repository::{PlanningRepository, ProductSpecRepository};

// ==========================================
// 响应 DTO
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerDayView {
    pub ledger_date: String,
    pub balance_units: f64,
    pub is_safety_risk: bool,
    pub is_overflow: bool,
    pub is_confirmed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseAdviceView {
    pub order_date: String,
    pub need_date: String,
    pub truck_count: u32,
    pub urgency: String,
    pub reason_json: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerProjectionView {
    pub sku: String,
    pub product_name: String,
    pub safety_target_units: f64,
    pub runway_days: u32,
    pub first_risk_date: Option<String>,
    pub is_secure: bool,
    pub days: Vec<LedgerDayView>,
    pub advice: Vec<PurchaseAdviceView>,
}

impl LedgerProjectionView {
    fn build(product_name: &str, projection: LedgerProjection) -> Self {
        Self {
            sku: projection.sku,
            product_name: product_name.to_string(),
            safety_target_units: projection.safety_target_units,
            runway_days: projection.runway_days,
            first_risk_date: projection.first_risk_date.map(format_plan_date),
            is_secure: projection.is_secure,
            days: projection
                .days
                .into_iter()
                .map(|d| LedgerDayView {
                    ledger_date: format_plan_date(d.ledger_date),
                    balance_units: d.balance_units,
                    is_safety_risk: d.is_safety_risk,
                    is_overflow: d.is_overflow,
                    is_confirmed: d.is_confirmed,
                })
                .collect(),
            advice: projection
                .advice
                .into_iter()
                .map(|a| PurchaseAdviceView {
                    order_date: format_plan_date(a.order_date),
                    need_date: format_plan_date(a.need_date),
                    truck_count: a.truck_count,
                    urgency: a.urgency.to_string(),
                    reason_json: a.reason_json,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorView {
    pub anchor_date: String,
    pub count_units: f64,
    pub noted_by: Option<String>,
    pub noted_at: String,
}

/// 录入快照视图（供编辑表格回显）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningSnapshotView {
    pub sku: String,
    pub demand_cases: BTreeMap<String, f64>,
    pub actual_cases: BTreeMap<String, f64>,
    pub inbound_loads: BTreeMap<String, f64>,
    pub anchor: Option<AnchorView>,
}

impl From<PlanningSnapshot> for PlanningSnapshotView {
    fn from(snapshot: PlanningSnapshot) -> Self {
        let to_view = |m: BTreeMap<NaiveDate, f64>| -> BTreeMap<String, f64> {
            m.into_iter().map(|(d, v)| (format_plan_date(d), v)).collect()
        };
        Self {
            sku: snapshot.sku,
            demand_cases: to_view(snapshot.demand_cases),
            actual_cases: to_view(snapshot.actual_cases),
            inbound_loads: to_view(snapshot.inbound_loads),
            anchor: snapshot.anchor.map(|a| AnchorView {
                anchor_date: format_plan_date(a.anchor_date),
                count_units: a.count_units,
                noted_by: a.noted_by,
                noted_at: a.noted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            }),
        }
    }
}

// ==========================================
// LedgerApi
// ==========================================
pub struct LedgerApi {
    products: Arc<ProductSpecRepository>,
    planning: Arc<PlanningRepository>,
    config_manager: Arc<ConfigManager>,
    resolver: SpecResolver,
    projector: LedgerProjector,
    event_publisher: OptionalEventPublisher,
}

impl LedgerApi {
    pub fn new(
        products: Arc<ProductSpecRepository>,
        planning: Arc<PlanningRepository>,
        config_manager: Arc<ConfigManager>,
        event_publisher: Option<Arc<dyn PlanningEventPublisher>>,
    ) -> Self {
        let event_publisher = match event_publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };

        Self {
            products,
            planning,
            config_manager,
            resolver: SpecResolver::new(),
            projector: LedgerProjector::new(),
            event_publisher,
        }
    }

    fn require_sku(value: &str) -> ApiResult<String> {
        let sku = value.trim();
        if sku.is_empty() {
            return Err(ApiError::InvalidInput("SKU不能为空".to_string()));
        }
        Ok(sku.to_string())
    }

    fn parse_date(value: &str) -> ApiResult<NaiveDate> {
        parse_plan_date(value).ok_or_else(|| ApiError::InvalidDate(value.trim().to_string()))
    }

    fn projection_policy_for(&self, sku: &str) -> ApiResult<ProjectionPolicy> {
        let map_cfg = |e: Box<dyn std::error::Error>| ApiError::InternalError(format!("配置读取失败: {}", e));
        Ok(ProjectionPolicy {
            safety_stock_loads: self
                .config_manager
                .safety_stock_loads_for(sku)
                .map_err(map_cfg)?,
            lead_time_days: self.config_manager.lead_time_days_for(sku).map_err(map_cfg)?,
            horizon_days: self
                .config_manager
                .projection_horizon_days_for(sku)
                .map_err(map_cfg)?,
            storage_capacity_units: self
                .config_manager
                .storage_capacity_units_for(sku)
                .map_err(map_cfg)?,
        })
    }

    fn publish_change(&self, event_type: PlanningEventType, sku: &str, source: &str) {
        let event = PlanningEvent::for_sku(event_type, sku, Some(source.to_string()));
        if let Err(e) = self.event_publisher.publish(event) {
            tracing::warn!(sku = sku, "计划变更事件发布失败: {}", e);
        }
    }

    // ==========================================
    // 读接口
    // ==========================================

    /// 单品种滚动库存推演
    ///
    /// # 参数
    /// - sku: 品种编码
    /// - today: 推演起始日（"YYYY-MM-DD", 以现场当地日期为准）
    /// - floor_units: 车间在地库存（瓶）
    /// - yard_loads: 场内待卸车数
    pub fn project_ledger(
        &self,
        sku: &str,
        today: &str,
        floor_units: f64,
        yard_loads: f64,
    ) -> ApiResult<LedgerProjectionView> {
        let _perf = crate::perf::PerfGuard::new("api.project_ledger");
        let sku = Self::require_sku(sku)?;
        let today = Self::parse_date(today)?;

        let spec = self.products.find_by_sku(&sku)?;
        let resolved = self.resolver.resolve(&sku, spec)?;
        let snapshot = self.planning.load_snapshot(&sku)?;
        let policy = self.projection_policy_for(&sku)?;
        let on_hand = OnHandStock {
            floor_units,
            yard_loads,
        };

        let projection = self
            .projector
            .project(today, &resolved, &snapshot, on_hand, &policy);

        Ok(LedgerProjectionView::build(
            &resolved.spec.product_name,
            projection,
        ))
    }

    /// 录入快照（编辑表格回显用）
    pub fn planning_snapshot(&self, sku: &str) -> ApiResult<PlanningSnapshotView> {
        let sku = Self::require_sku(sku)?;
        let snapshot = self.planning.load_snapshot(&sku)?;
        Ok(PlanningSnapshotView::from(snapshot))
    }

    // ==========================================
    // 写接口（落库 + 发事件）
    // ==========================================

    /// 写入或覆盖一格录入
    ///
    /// kind 取 DEMAND / ACTUAL / INBOUND; qty 负数与非有限值落库前归零。
    pub fn upsert_entry(
        &self,
        sku: &str,
        entry_date: &str,
        kind: &str,
        qty: f64,
    ) -> ApiResult<()> {
        let sku = Self::require_sku(sku)?;
        let date = Self::parse_date(entry_date)?;
        let kind = EntryKind::from_str(kind).ok_or_else(|| {
            ApiError::InvalidInput(format!(
                "未知录入类别: {}（应为 DEMAND/ACTUAL/INBOUND）",
                kind
            ))
        })?;

        self.planning.upsert_entry(&sku, date, kind, qty)?;
        self.publish_change(PlanningEventType::PlanningEntryChanged, &sku, "upsert_entry");
        Ok(())
    }

    /// 清除一格录入（ACTUAL 清除后回落到需求口径）
    pub fn clear_entry(&self, sku: &str, entry_date: &str, kind: &str) -> ApiResult<usize> {
        let sku = Self::require_sku(sku)?;
        let date = Self::parse_date(entry_date)?;
        let kind = EntryKind::from_str(kind).ok_or_else(|| {
            ApiError::InvalidInput(format!(
                "未知录入类别: {}（应为 DEMAND/ACTUAL/INBOUND）",
                kind
            ))
        })?;

        let affected = self.planning.clear_entry(&sku, date, kind)?;
        if affected > 0 {
            self.publish_change(PlanningEventType::PlanningEntryChanged, &sku, "clear_entry");
        }
        Ok(affected)
    }

    /// 替换实盘锚点（每品种恒为最新一次盘点）
    pub fn replace_anchor(
        &self,
        sku: &str,
        anchor_date: &str,
        count_units: f64,
        noted_by: Option<&str>,
    ) -> ApiResult<()> {
        let sku = Self::require_sku(sku)?;
        let anchor_date = Self::parse_date(anchor_date)?;
        if !count_units.is_finite() || count_units < 0.0 {
            return Err(ApiError::InvalidInput(
                "实盘数必须为非负数".to_string(),
            ));
        }

        let anchor = InventoryAnchor {
            sku: sku.clone(),
            anchor_date,
            count_units,
            noted_by: noted_by
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            noted_at: chrono::Local::now().naive_local(),
        };

        self.planning.replace_anchor(&anchor)?;
        self.publish_change(PlanningEventType::AnchorReplaced, &sku, "replace_anchor");
        Ok(())
    }
}
