// ==========================================
// 饮料代工生产计划系统 - 总台账 API
// ==========================================
// 职责:
// - 跨品种总台账读取口（全部品种×日期的活动行）
// - 手动刷新入口（走去抖闸门, 与自动触发同路径）
// 说明:
// - 读到的永远是完整一轮聚合结果, 不会读到半成品
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::error::ApiResult;
use crate::domain::calendar::format_plan_date;
use crate::domain::master::MasterAggregateResult;
use crate::service::master_refresh::MasterRefreshService;
use crate::service::refresh_gate::{RefreshGate, RefreshTrigger};

// ==========================================
// 响应 DTO
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterRowView {
    pub sku: String,
    pub demand_cases: f64,
    pub actual_cases: Option<f64>,
    pub inbound_loads: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterDayView {
    pub ledger_date: String,
    pub rows: Vec<MasterRowView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchFailureView {
    pub sku: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterLedgerView {
    pub run_id: String,
    pub generated_at: String,
    pub duration_ms: u64,
    pub product_count: usize,
    pub total_rows: usize,
    pub days: Vec<MasterDayView>,
    pub failures: Vec<FetchFailureView>,
}

impl MasterLedgerView {
    fn build(result: &MasterAggregateResult) -> Self {
        Self {
            run_id: result.run_id.clone(),
            generated_at: result.generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            duration_ms: result.duration_ms,
            product_count: result.product_count,
            total_rows: result.ledger.row_count(),
            days: result
                .ledger
                .days
                .iter()
                .map(|day| MasterDayView {
                    ledger_date: format_plan_date(day.ledger_date),
                    rows: day
                        .rows
                        .iter()
                        .map(|row| MasterRowView {
                            sku: row.sku.clone(),
                            demand_cases: row.demand_cases,
                            actual_cases: row.actual_cases,
                            inbound_loads: row.inbound_loads,
                        })
                        .collect(),
                })
                .collect(),
            failures: result
                .failures
                .iter()
                .map(|f| FetchFailureView {
                    sku: f.sku.clone(),
                    reason: f.reason.clone(),
                })
                .collect(),
        }
    }
}

// ==========================================
// MasterApi
// ==========================================
pub struct MasterApi {
    refresh_service: Arc<MasterRefreshService>,
    gate: Arc<RefreshGate>,
}

impl MasterApi {
    pub fn new(refresh_service: Arc<MasterRefreshService>, gate: Arc<RefreshGate>) -> Self {
        Self {
            refresh_service,
            gate,
        }
    }

    /// 立即执行一轮聚合并返回结果（绕过去抖, 排队等当前轮结束）
    pub async fn aggregate_now(&self) -> ApiResult<MasterLedgerView> {
        let result = self.refresh_service.refresh_now().await?;
        Ok(MasterLedgerView::build(&result))
    }

    /// 最近一轮完整结果（尚未刷新过返回 None）
    pub async fn latest(&self) -> Option<MasterLedgerView> {
        self.refresh_service
            .latest()
            .await
            .map(|result| MasterLedgerView::build(&result))
    }

    /// 请求一次刷新（走去抖闸门, 与录入变更触发同路径）
    pub fn request_refresh(&self, source: Option<&str>) {
        self.gate.notify(
            RefreshTrigger::ManualRefresh,
            source.map(|s| s.to_string()),
        );
    }
}
