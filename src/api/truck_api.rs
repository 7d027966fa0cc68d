// ==========================================
// 饮料代工生产计划系统 - 车位排程 API
// ==========================================
// 职责:
// - 当日到货车位排程（车数/间隔/班次分布）
// - 车位看板写入口（首车时刻/挂 PO/取消/恢复）
// 红线:
// - 车位号按未过滤序列固定编号, 取消某车不得挪动其余车位的挂账
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::truck::TruckSchedule;
use crate::engine::events::{OptionalEventPublisher, PlanningEvent, PlanningEventPublisher, PlanningEventType};
use crate::engine::spec_resolver::SpecResolver;
use crate::engine::truck_allocator::TruckAllocator;
use crate::repository::{ProductSpecRepository, TruckBoardRepository};

// ==========================================
// 响应 DTO
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruckSlotView {
    pub slot_id: u32,
    pub arrival_time: String,
    pub shift: String,
    pub shift_label: String,
    pub po_no: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftSummaryView {
    pub shift: String,
    pub shift_label: String,
    pub loads: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruckScheduleView {
    pub sku: String,
    pub product_name: String,
    pub required_daily_loads: u32,
    pub active_loads: u32,
    pub hours_per_truck: f64,
    pub shift_start_time: String,
    pub is_high_risk: bool,
    pub slots: Vec<TruckSlotView>,
    pub shifts: Vec<ShiftSummaryView>,
}

impl TruckScheduleView {
    fn build(product_name: &str, schedule: TruckSchedule) -> Self {
        Self {
            sku: schedule.sku.clone(),
            product_name: product_name.to_string(),
            required_daily_loads: schedule.required_daily_loads,
            active_loads: schedule.active_loads(),
            hours_per_truck: schedule.hours_per_truck,
            shift_start_time: schedule.shift_start_time.clone(),
            is_high_risk: schedule.is_high_risk,
            slots: schedule
                .slots
                .iter()
                .map(|s| TruckSlotView {
                    slot_id: s.slot_id,
                    arrival_time: s.arrival_time.clone(),
                    shift: s.shift.to_string(),
                    shift_label: s.shift.label().to_string(),
                    po_no: s.po_no.clone(),
                })
                .collect(),
            shifts: schedule
                .shifts
                .iter()
                .map(|s| ShiftSummaryView {
                    shift: s.shift.to_string(),
                    shift_label: s.shift.label().to_string(),
                    loads: s.loads,
                })
                .collect(),
        }
    }
}

// ==========================================
// TruckApi
// ==========================================
pub struct TruckApi {
    products: Arc<ProductSpecRepository>,
    board_repo: Arc<TruckBoardRepository>,
    config_manager: Arc<ConfigManager>,
    resolver: SpecResolver,
    allocator: TruckAllocator,
    event_publisher: OptionalEventPublisher,
}

impl TruckApi {
    pub fn new(
        products: Arc<ProductSpecRepository>,
        board_repo: Arc<TruckBoardRepository>,
        config_manager: Arc<ConfigManager>,
        event_publisher: Option<Arc<dyn PlanningEventPublisher>>,
    ) -> Self {
        let event_publisher = match event_publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };

        Self {
            products,
            board_repo,
            config_manager,
            resolver: SpecResolver::new(),
            allocator: TruckAllocator::new(),
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

    /// 校验并规整首车时刻（"HH:MM", 24小时制, 返回零填充格式）
    fn normalize_shift_time(value: &str) -> ApiResult<String> {
        let raw = value.trim();
        let Some((h, m)) = raw.split_once(':') else {
            return Err(ApiError::InvalidInput(format!(
                "首车时刻格式错误: {}（应为 HH:MM）",
                raw
            )));
        };

        let hour = h.parse::<u32>().ok().filter(|v| *v < 24);
        let minute = m.parse::<u32>().ok().filter(|v| *v < 60);

        match (hour, minute) {
            (Some(hour), Some(minute)) => Ok(format!("{:02}:{:02}", hour, minute)),
            _ => Err(ApiError::InvalidInput(format!(
                "首车时刻格式错误: {}（应为 HH:MM）",
                raw
            ))),
        }
    }

    fn require_slot_id(slot_id: u32) -> ApiResult<u32> {
        if slot_id == 0 {
            return Err(ApiError::InvalidInput("车位号从 1 开始".to_string()));
        }
        Ok(slot_id)
    }

    fn publish_board_change(&self, sku: &str, source: &str) {
        tracing::info!(
            source = source,
            "{}",
            crate::i18n::t_with_args("truck.board_updated", &[("sku", sku)])
        );
        let event = PlanningEvent::for_sku(
            PlanningEventType::TruckBoardChanged,
            sku,
            Some(source.to_string()),
        );
        if let Err(e) = self.event_publisher.publish(event) {
            tracing::warn!(sku = sku, "车位看板变更事件发布失败: {}", e);
        }
    }

    // ==========================================
    // 读接口
    // ==========================================

    /// 当日到货车位排程
    pub fn get_schedule(&self, sku: &str) -> ApiResult<TruckScheduleView> {
        let _perf = crate::perf::PerfGuard::new("api.get_schedule");
        let sku = Self::require_sku(sku)?;

        let spec = self.products.find_by_sku(&sku)?;
        let resolved = self.resolver.resolve(&sku, spec)?;
        let board = self.board_repo.load_board(&sku)?;
        let safety_stock_loads = self
            .config_manager
            .safety_stock_loads_for(&sku)
            .map_err(|e| ApiError::InternalError(format!("配置读取失败: {}", e)))?;

        let schedule = self.allocator.generate(&resolved, &board, safety_stock_loads);

        Ok(TruckScheduleView::build(
            &resolved.spec.product_name,
            schedule,
        ))
    }

    // ==========================================
    // 写接口（落库 + 发事件）
    // ==========================================

    /// 调整首车时刻
    pub fn set_shift_start(&self, sku: &str, shift_start_time: &str) -> ApiResult<String> {
        let sku = Self::require_sku(sku)?;
        let normalized = Self::normalize_shift_time(shift_start_time)?;

        self.board_repo.set_shift_start(&sku, &normalized)?;
        self.publish_board_change(&sku, "set_shift_start");
        Ok(normalized)
    }

    /// 车位挂 PO（同车位覆盖）
    pub fn assign_po(&self, sku: &str, slot_id: u32, po_no: &str) -> ApiResult<()> {
        let sku = Self::require_sku(sku)?;
        let slot_id = Self::require_slot_id(slot_id)?;
        let po = po_no.trim();
        if po.is_empty() {
            return Err(ApiError::InvalidInput("PO号不能为空".to_string()));
        }

        self.board_repo.assign_po(&sku, slot_id, po)?;
        self.publish_board_change(&sku, "assign_po");
        Ok(())
    }

    /// 摘除车位 PO
    pub fn clear_po(&self, sku: &str, slot_id: u32) -> ApiResult<usize> {
        let sku = Self::require_sku(sku)?;
        let slot_id = Self::require_slot_id(slot_id)?;

        let affected = self.board_repo.clear_po(&sku, slot_id)?;
        if affected > 0 {
            self.publish_board_change(&sku, "clear_po");
        }
        Ok(affected)
    }

    /// 取消车位（车位号保留, 不重排）
    pub fn cancel_load(&self, sku: &str, slot_id: u32) -> ApiResult<()> {
        let sku = Self::require_sku(sku)?;
        let slot_id = Self::require_slot_id(slot_id)?;

        self.board_repo.cancel_load(&sku, slot_id)?;
        self.publish_board_change(&sku, "cancel_load");
        Ok(())
    }

    /// 恢复已取消车位
    pub fn restore_load(&self, sku: &str, slot_id: u32) -> ApiResult<usize> {
        let sku = Self::require_sku(sku)?;
        let slot_id = Self::require_slot_id(slot_id)?;

        let affected = self.board_repo.restore_load(&sku, slot_id)?;
        if affected > 0 {
            self.publish_board_change(&sku, "restore_load");
        }
        Ok(affected)
    }
}
