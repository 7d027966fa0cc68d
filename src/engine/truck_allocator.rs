// ==========================================
// 饮料代工生产计划系统 - 到货排程引擎
// ==========================================
// 职责: 由灌装速率推导 24 小时到货时刻表
// 输入: ResolvedSpec + 看板状态 (首车时刻/PO/取消)
// 输出: TruckSchedule (纯派生, 每次变更全量重算)
// ==========================================
// 规则:
// 1) 日需车数 = ceil(速率×24 / 每车箱数), 因子为 0 时取 0
// 2) 到车间隔 = 每车箱数 / 速率 (速率 0 时为 0)
// 3) 槽位时刻 = (首车时刻 + i×间隔) mod 24
// 4) slot_id 在取消过滤之前分配, PO 绑定不随取消漂移
// 5) 归班用未取整小时数: 7.97 展示为 08:00 仍算 S1
// ==========================================

use std::collections::HashMap;

use tracing::instrument;

use crate::domain::truck::{ShiftSummary, TruckBoardState, TruckSchedule, TruckSlot};
use crate::domain::types::ShiftBucket;
use crate::engine::spec_resolver::ResolvedSpec;

// ==========================================
// TruckAllocator - 到货排程引擎
// ==========================================
pub struct TruckAllocator {
    // 无状态引擎,不需要注入依赖
}

impl TruckAllocator {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 派生指标 (除 0 一律兜底为 0, 不得出现 NaN/Inf)
    // ==========================================

    /// 日需车数 = ceil(速率 × 24 / 每车箱数)
    pub fn required_daily_loads(&self, burn_rate_cph: f64, cases_per_truck: u32) -> u32 {
        if !burn_rate_cph.is_finite() || burn_rate_cph <= 0.0 || cases_per_truck == 0 {
            return 0;
        }
        ((burn_rate_cph * 24.0) / cases_per_truck as f64).ceil() as u32
    }

    /// 到车间隔 (小时) = 每车箱数 / 速率
    pub fn hours_per_truck(&self, burn_rate_cph: f64, cases_per_truck: u32) -> f64 {
        if !burn_rate_cph.is_finite() || burn_rate_cph <= 0.0 || cases_per_truck == 0 {
            return 0.0;
        }
        cases_per_truck as f64 / burn_rate_cph
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 生成到货排程 (单品种)
    ///
    /// # 参数
    /// - `resolved`: 解析后的产品规格 (速率 + 每车箱数)
    /// - `board`: 看板持久状态 (首车时刻 / PO 绑定 / 取消标记)
    /// - `safety_stock_loads`: 安全库存车数 (高风险判定输入)
    #[instrument(skip(self, resolved, board), fields(sku = %resolved.spec.sku))]
    pub fn generate(
        &self,
        resolved: &ResolvedSpec,
        board: &TruckBoardState,
        safety_stock_loads: u32,
    ) -> TruckSchedule {
        let burn_rate = resolved.burn_rate_cph();
        let cases_per_truck = resolved.cases_per_truck;

        let required_daily_loads = self.required_daily_loads(burn_rate, cases_per_truck);
        let hours_per_truck = self.hours_per_truck(burn_rate, cases_per_truck);
        let shift_start = Self::parse_shift_start(&board.shift_start_time);

        // slot_id 先分配后过滤, 取消不重编号
        let mut slots = Vec::new();
        let mut shift_loads: HashMap<ShiftBucket, u32> = HashMap::new();

        for i in 0..required_daily_loads {
            let slot_id = i + 1;
            let raw = (shift_start + i as f64 * hours_per_truck) % 24.0;

            if board.cancelled_loads.contains(&slot_id) {
                continue;
            }

            let shift = ShiftBucket::from_raw_hours(raw);
            *shift_loads.entry(shift).or_insert(0) += 1;

            slots.push(TruckSlot {
                slot_id,
                arrival_time: Self::format_arrival(raw),
                raw_decimal_hours: raw,
                shift,
                po_no: board.po_assignments.get(&slot_id).cloned(),
            });
        }

        let shifts = ShiftBucket::all()
            .into_iter()
            .map(|shift| ShiftSummary {
                shift,
                loads: shift_loads.get(&shift).copied().unwrap_or(0),
            })
            .collect();

        let is_high_risk = safety_stock_loads < required_daily_loads;
        if is_high_risk {
            tracing::debug!(
                "到货排程高风险: sku={}, 安全库存车数 {} < 日需车数 {}",
                resolved.spec.sku,
                safety_stock_loads,
                required_daily_loads
            );
        }

        TruckSchedule {
            sku: resolved.spec.sku.clone(),
            required_daily_loads,
            hours_per_truck,
            shift_start_time: board.shift_start_time.clone(),
            slots,
            shifts,
            is_high_risk,
        }
    }

    // ==========================================
    // 时刻换算
    // ==========================================

    /// 解析首车时刻 HH:MM 为小数小时
    ///
    /// 非法输入回退默认首车时刻 (08:00)
    fn parse_shift_start(shift_start_time: &str) -> f64 {
        let mut parts = shift_start_time.trim().splitn(2, ':');
        let hh = parts.next().and_then(|p| p.parse::<u32>().ok());
        let mm = parts.next().and_then(|p| p.parse::<u32>().ok());
        match (hh, mm) {
            (Some(h), Some(m)) if h < 24 && m < 60 => h as f64 + m as f64 / 60.0,
            _ => 8.0,
        }
    }

    /// 小数小时 → 展示时刻 HH:MM
    ///
    /// 分钟四舍五入可能进到 60, 此时进位到下一小时; 24 点归 0
    fn format_arrival(raw_hours: f64) -> String {
        let mut hour = raw_hours.floor() as u32;
        let mut minute = ((raw_hours - raw_hours.floor()) * 60.0).round() as u32;
        if minute == 60 {
            hour += 1;
            minute = 0;
        }
        hour %= 24;
        format!("{:02}:{:02}", hour, minute)
    }
}

// ==========================================
// Default trait 实现
// ==========================================
impl Default for TruckAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::ProductSpec;
    use crate::engine::spec_resolver::SpecResolver;
    use chrono::Utc;

    /// 创建测试用的解析规格
    fn create_test_resolved(burn_rate_cph: f64, units_per_truck: u32) -> ResolvedSpec {
        let spec = ProductSpec {
            sku: "SKU-CSD355".to_string(),
            product_name: "355ml 可乐".to_string(),
            units_per_case: 24,
            cases_per_pallet: 91,
            units_per_truck,
            pallets_per_truck_override: None,
            production_rate_cph: burn_rate_cph,
            seq_no: Some(1),
            is_active: true,
            updated_at: Utc::now().naive_utc(),
            updated_by: None,
        };
        SpecResolver::new().resolve("SKU-CSD355", Some(spec)).unwrap()
    }

    fn create_test_board() -> TruckBoardState {
        TruckBoardState {
            sku: "SKU-CSD355".to_string(),
            shift_start_time: "00:00".to_string(),
            po_assignments: HashMap::new(),
            cancelled_loads: Default::default(),
        }
    }

    #[test]
    fn test_schedule_at_reference_rate() {
        // 速率 2500 箱/时, 每车 6732 箱 (161568 瓶 / 24 瓶每箱)
        let allocator = TruckAllocator::new();
        let resolved = create_test_resolved(2500.0, 161568);
        assert_eq!(resolved.cases_per_truck, 6732);

        let schedule = allocator.generate(&resolved, &create_test_board(), 2);

        // ceil(60000 / 6732) = 9 车
        assert_eq!(schedule.required_daily_loads, 9);
        assert!((schedule.hours_per_truck - 2.6928).abs() < 0.001);

        // 首三车 raw = 0 / 2.6928 / 5.3856 小时
        // 分钟就近取整: 41.568 → 42, 23.136 → 23
        assert_eq!(schedule.slots[0].arrival_time, "00:00");
        assert_eq!(schedule.slots[1].arrival_time, "02:42");
        assert_eq!(schedule.slots[2].arrival_time, "05:23");
        assert!((schedule.slots[1].raw_decimal_hours - 2.6928).abs() < 0.001);

        // 安全库存 2 车 < 日需 9 车 → 高风险
        assert!(schedule.is_high_risk);
    }

    #[test]
    fn test_zero_burn_rate_yields_empty_schedule() {
        let allocator = TruckAllocator::new();
        let resolved = create_test_resolved(0.0, 161568);

        let schedule = allocator.generate(&resolved, &create_test_board(), 2);

        assert_eq!(schedule.required_daily_loads, 0);
        assert_eq!(schedule.hours_per_truck, 0.0);
        assert!(schedule.slots.is_empty());
        assert!(schedule.shifts.iter().all(|s| s.loads == 0));
        assert!(!schedule.is_high_risk);
    }

    #[test]
    fn test_required_loads_monotonic_in_burn_rate() {
        let allocator = TruckAllocator::new();
        let mut prev = 0;
        for rate in [0.0, 100.0, 500.0, 2500.0, 2805.0, 9000.0] {
            let loads = allocator.required_daily_loads(rate, 6732);
            assert!(loads >= prev, "rate={} 时车数回落", rate);
            prev = loads;
        }
    }

    #[test]
    fn test_stable_slot_ids_across_cancellation() {
        let allocator = TruckAllocator::new();
        let resolved = create_test_resolved(2500.0, 161568);

        let mut board = create_test_board();
        board.po_assignments.insert(3, "PO-20240415-A".to_string());
        let before = allocator.generate(&resolved, &board, 2);
        assert_eq!(
            before.slots.iter().find(|s| s.slot_id == 3).unwrap().po_no,
            Some("PO-20240415-A".to_string())
        );

        // 取消 2 号槽位后重算: 3 号槽位编号与 PO 绑定不漂移
        board.cancelled_loads.insert(2);
        let after = allocator.generate(&resolved, &board, 2);

        assert_eq!(after.slots.len(), 8);
        assert!(after.slots.iter().all(|s| s.slot_id != 2));
        let slot3 = after.slots.iter().find(|s| s.slot_id == 3).unwrap();
        assert_eq!(slot3.po_no, Some("PO-20240415-A".to_string()));
        assert_eq!(slot3.arrival_time, "05:23");

        // 班次汇总不含已取消槽位
        let total: u32 = after.shifts.iter().map(|s| s.loads).sum();
        assert_eq!(total, 8);
    }

    #[test]
    fn test_shift_partition_complete() {
        let allocator = TruckAllocator::new();
        for rate in [700.0, 1300.0, 2500.0, 4100.0] {
            let resolved = create_test_resolved(rate, 161568);
            let schedule = allocator.generate(&resolved, &create_test_board(), 2);

            let total: u32 = schedule.shifts.iter().map(|s| s.loads).sum();
            assert_eq!(total as usize, schedule.slots.len());
            for slot in &schedule.slots {
                assert_eq!(slot.shift, ShiftBucket::from_raw_hours(slot.raw_decimal_hours));
            }
        }
    }

    #[test]
    fn test_rounded_display_keeps_raw_shift() {
        // 间隔 = 6732 / 841.7 ≈ 7.9981 小时: 分钟取整进到 60,
        // 展示进位成整点, 但归班仍按未取整小时数
        let allocator = TruckAllocator::new();
        let resolved = create_test_resolved(841.7, 161568);
        let schedule = allocator.generate(&resolved, &create_test_board(), 2);

        // ceil(841.7×24 / 6732) = ceil(3.0007) = 4 车
        assert_eq!(schedule.required_daily_loads, 4);

        // 2 号槽位 raw ≈ 7.998 → 展示 08:00, 归班仍为 S1
        let slot2 = &schedule.slots[1];
        assert!(slot2.raw_decimal_hours < 8.0);
        assert_eq!(slot2.arrival_time, "08:00");
        assert_eq!(slot2.shift, ShiftBucket::S1);

        // 3 号槽位 raw ≈ 15.996 → 展示 16:00, 归班 S2
        let slot3 = &schedule.slots[2];
        assert!(slot3.raw_decimal_hours < 16.0);
        assert_eq!(slot3.arrival_time, "16:00");
        assert_eq!(slot3.shift, ShiftBucket::S2);

        // 4 号槽位 raw ≈ 23.994 → 进位到 24 点归 0 展示, 归班 S3
        let slot4 = &schedule.slots[3];
        assert!(slot4.raw_decimal_hours > 23.9);
        assert_eq!(slot4.arrival_time, "00:00");
        assert_eq!(slot4.shift, ShiftBucket::S3);
    }

    #[test]
    fn test_arrival_wraps_past_midnight() {
        // 首车 20:00, 间隔 ≈ 6.37 小时 → 第 2 车跨 0 点
        let allocator = TruckAllocator::new();
        let resolved = create_test_resolved(1056.0, 161568);

        let mut board = create_test_board();
        board.shift_start_time = "20:00".to_string();
        let schedule = allocator.generate(&resolved, &board, 2);

        assert!(schedule.slots.len() >= 2);
        assert_eq!(schedule.slots[0].shift, ShiftBucket::S3);
        let wrapped = &schedule.slots[1];
        assert!(wrapped.raw_decimal_hours < 8.0);
        assert_eq!(wrapped.shift, ShiftBucket::S1);
    }

    #[test]
    fn test_invalid_shift_start_falls_back_to_default() {
        assert_eq!(TruckAllocator::parse_shift_start("07:30"), 7.5);
        assert_eq!(TruckAllocator::parse_shift_start("  23:59 "), 23.0 + 59.0 / 60.0);
        assert_eq!(TruckAllocator::parse_shift_start("25:00"), 8.0);
        assert_eq!(TruckAllocator::parse_shift_start("08:61"), 8.0);
        assert_eq!(TruckAllocator::parse_shift_start("abc"), 8.0);
        assert_eq!(TruckAllocator::parse_shift_start(""), 8.0);
    }

    #[test]
    fn test_not_high_risk_when_safety_covers_loads() {
        let allocator = TruckAllocator::new();
        let resolved = create_test_resolved(2500.0, 161568);
        let schedule = allocator.generate(&resolved, &create_test_board(), 9);
        assert!(!schedule.is_high_risk); // 9 ≥ 9
    }
}
