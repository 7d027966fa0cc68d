// ==========================================
// 饮料代工生产计划系统 - 库存推演引擎
// ==========================================
// 职责: 滚动库存推演 + 安全库存风险 + 采购建议
// 输入: ResolvedSpec + 计划数据快照 + 在库 + 推演策略
// 输出: LedgerProjection (逐日台账, 每次整体重建)
// ==========================================
// 记账式 (基准单位: 瓶):
//   balance[d] = balance[d-1] + 到货[d]×每车瓶数
//                - (实绩[d] ?? 需求[d])×每箱瓶数
// 红线: 实绩一经录入即覆盖同日需求 (含显式 0)
// 红线: 负数/非数一律按 0 兜底, 不上抛
// ==========================================

use chrono::{Duration, NaiveDate};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::instrument;

use crate::domain::calendar::{date_seq, days_between, format_plan_date};
use crate::domain::ledger::{LedgerDay, LedgerProjection, PurchaseAdvice};
use crate::domain::planning::{sanitize_qty, OnHandStock, PlanningSnapshot};
use crate::domain::types::AdviceUrgency;
use crate::engine::spec_resolver::ResolvedSpec;

/// 推演窗口下限 (天)
pub const MIN_HORIZON_DAYS: u32 = 14;
/// 推演窗口上限 (天)
pub const MAX_HORIZON_DAYS: u32 = 28;

// ==========================================
// ProjectionPolicy - 推演策略
// ==========================================
// 来源: 配置协作方 (全局默认 + 按 SKU 覆盖)
#[derive(Debug, Clone)]
pub struct ProjectionPolicy {
    pub safety_stock_loads: u32,             // 安全库存车数
    pub lead_time_days: u32,                 // 采购提前期 (天)
    pub horizon_days: u32,                   // 推演窗口 (天), 引擎侧夹入 [14, 28]
    pub storage_capacity_units: Option<f64>, // 库容上限 (瓶), 未配置则不判溢库
}

impl Default for ProjectionPolicy {
    fn default() -> Self {
        ProjectionPolicy {
            safety_stock_loads: 2,
            lead_time_days: 3,
            horizon_days: 21,
            storage_capacity_units: None,
        }
    }
}

// ==========================================
// LedgerProjector - 库存推演引擎
// ==========================================
pub struct LedgerProjector {
    // 无状态引擎,不需要注入依赖
    // Repository 操作由调用方处理
}

impl LedgerProjector {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 库存推演 (单品种)
    ///
    /// 算法:
    /// 1) 以锚点盘点数为锚点日期初余额, 前滚/回溯推到窗口起点
    /// 2) 自 today 起逐日记账 horizon 天 (夹入 [14, 28])
    /// 3) 余额 < 0 → 安全风险; 首个风险日截断续航天数
    /// 4) 安全目标 = 安全库存车数 × 每车瓶数
    /// 5) 对每个跌破安全目标的日子按增量车数归并采购建议
    ///
    /// # 参数
    /// - `today`: 推演基准日 (窗口起点)
    /// - `resolved`: 解析后的产品规格
    /// - `snapshot`: 计划数据快照 (稀疏映射, 缺失为 0)
    /// - `on_hand`: 当前在库 (安全判定输入)
    /// - `policy`: 推演策略
    #[instrument(skip(self, resolved, snapshot, on_hand, policy), fields(
        sku = %resolved.spec.sku,
        horizon_days = policy.horizon_days
    ))]
    pub fn project(
        &self,
        today: NaiveDate,
        resolved: &ResolvedSpec,
        snapshot: &PlanningSnapshot,
        on_hand: OnHandStock,
        policy: &ProjectionPolicy,
    ) -> LedgerProjection {
        let horizon_days = policy.horizon_days.clamp(MIN_HORIZON_DAYS, MAX_HORIZON_DAYS);
        let units_per_truck = resolved.units_per_truck();
        let units_per_case = resolved.units_per_case();

        // 1. 把余额推到窗口前一日的日末
        let mut balance = self.opening_balance_before(today, resolved, snapshot);

        // 2. 逐日记账
        let safety_target_units = policy.safety_stock_loads as f64 * units_per_truck;
        let mut days = Vec::with_capacity(horizon_days as usize);
        let mut first_risk_date: Option<NaiveDate> = None;

        for date in date_seq(today, horizon_days) {
            balance += self.inbound_units(snapshot, date, units_per_truck)
                - self.outflow_units(snapshot, date, units_per_case);

            let is_safety_risk = balance < 0.0;
            if is_safety_risk && first_risk_date.is_none() {
                first_risk_date = Some(date);
            }

            days.push(LedgerDay {
                ledger_date: date,
                balance_units: balance,
                is_safety_risk,
                is_overflow: policy
                    .storage_capacity_units
                    .map_or(false, |cap| balance > cap),
                is_confirmed: snapshot.actual_cases.contains_key(&date),
            });
        }

        // 3. 续航天数: 今天起到首个风险日之前的连续天数
        let runway_days = match first_risk_date {
            Some(risk_date) => days_between(today, risk_date) as u32,
            None => horizon_days,
        };

        // 4. 在库安全判定 (厂内 + 场内折瓶)
        let on_hand_units = sanitize_qty(on_hand.floor_units)
            + sanitize_qty(on_hand.yard_loads) * units_per_truck;
        let is_secure = on_hand_units >= safety_target_units;

        // 5. 采购建议
        let advice = self.build_advice(
            today,
            &days,
            safety_target_units,
            units_per_truck,
            policy.lead_time_days,
        );

        if first_risk_date.is_some() {
            tracing::debug!(
                "库存推演出现风险日: sku={}, first_risk_date={:?}, runway_days={}",
                resolved.spec.sku,
                first_risk_date,
                runway_days
            );
        }

        LedgerProjection {
            sku: resolved.spec.sku.clone(),
            days,
            safety_target_units,
            runway_days,
            first_risk_date,
            is_secure,
            advice,
        }
    }

    // ==========================================
    // 记账分解
    // ==========================================

    /// 当日入账 (瓶) = 到货车数 × 每车瓶数
    fn inbound_units(&self, snapshot: &PlanningSnapshot, date: NaiveDate, units_per_truck: f64) -> f64 {
        snapshot
            .inbound_loads
            .get(&date)
            .map(|v| sanitize_qty(*v))
            .unwrap_or(0.0)
            * units_per_truck
    }

    /// 当日出账 (瓶) = (实绩 ?? 需求) × 每箱瓶数
    ///
    /// 实绩条目存在即覆盖需求, 显式 0 表示"当日确认无耗用"
    fn outflow_units(&self, snapshot: &PlanningSnapshot, date: NaiveDate, units_per_case: f64) -> f64 {
        let cases = match snapshot.actual_cases.get(&date) {
            Some(actual) => sanitize_qty(*actual),
            None => snapshot
                .demand_cases
                .get(&date)
                .map(|v| sanitize_qty(*v))
                .unwrap_or(0.0),
        };
        cases * units_per_case
    }

    /// 推算窗口前一日的日末余额
    ///
    /// 锚点盘点数视为锚点日期初余额 (= 前一日日末):
    /// - 锚点在窗口起点之前: 自锚点日起逐日前滚补账
    /// - 锚点在窗口起点之后: 按记账式逆推回窗口起点
    /// - 无锚点: 窗口起点前余额按 0 计
    fn opening_balance_before(
        &self,
        window_start: NaiveDate,
        resolved: &ResolvedSpec,
        snapshot: &PlanningSnapshot,
    ) -> f64 {
        let units_per_truck = resolved.units_per_truck();
        let units_per_case = resolved.units_per_case();

        let (anchor_date, anchor_units) = match &snapshot.anchor {
            Some(anchor) => (anchor.anchor_date, sanitize_qty(anchor.count_units)),
            None => return 0.0,
        };

        // balance 语义: anchor_date 前一日的日末余额
        let mut balance = anchor_units;

        if anchor_date < window_start {
            // 前滚: 把锚点日至窗口前一日的流水补进来
            let mut date = anchor_date;
            while date < window_start {
                balance += self.inbound_units(snapshot, date, units_per_truck)
                    - self.outflow_units(snapshot, date, units_per_case);
                date += Duration::days(1);
            }
        } else if anchor_date > window_start {
            // 逆推: closing[d-1] = closing[d] - 当日流水
            let mut date = anchor_date;
            while date > window_start {
                date -= Duration::days(1);
                balance -= self.inbound_units(snapshot, date, units_per_truck)
                    - self.outflow_units(snapshot, date, units_per_case);
            }
        }

        balance
    }

    // ==========================================
    // 采购建议 (增量车数归并)
    // ==========================================

    /// 生成采购建议
    ///
    /// 对每个跌破安全目标的日子:
    ///   累计需求车数 = ceil((安全目标 - 当日余额) / 每车瓶数)
    ///   增量 = 累计需求车数 - 已建议车数 (≤0 则跳过)
    ///   下单日 = max(需求日 - 提前期, today), 同下单日增量合并
    ///
    /// 全表车数累加即覆盖最深缺口, 合并不会放大订货量。
    /// 每条建议附成因 JSON (逐触发日明细), 供界面解释建议从何而来
    fn build_advice(
        &self,
        today: NaiveDate,
        days: &[LedgerDay],
        safety_target_units: f64,
        units_per_truck: f64,
        lead_time_days: u32,
    ) -> Vec<PurchaseAdvice> {
        if units_per_truck <= 0.0 {
            return Vec::new();
        }

        let mut covered_trucks: u32 = 0;
        // BTreeMap 保证建议按下单日升序输出
        let mut merged: BTreeMap<NaiveDate, AdviceDraft> = BTreeMap::new();

        for day in days {
            if day.balance_units >= safety_target_units {
                continue;
            }
            let deficit_units = safety_target_units - day.balance_units;
            let required_trucks = (deficit_units / units_per_truck).ceil() as u32;
            if required_trucks <= covered_trucks {
                continue;
            }
            let delta = required_trucks - covered_trucks;
            covered_trucks = required_trucks;

            let raw_order_date = day.ledger_date - Duration::days(lead_time_days as i64);
            let order_date = raw_order_date.max(today);

            let draft = merged.entry(order_date).or_insert_with(|| AdviceDraft {
                need_date: day.ledger_date,
                truck_count: 0,
                deficit_units: 0.0,
                reasons: Vec::new(),
            });
            draft.truck_count += delta;
            // 累计需求车数单调上升, 后触发日的缺口必然更深
            draft.deficit_units = deficit_units;
            draft.reasons.push(format!(
                "{}: 余额跌破安全目标, 缺口 {:.0} 瓶, 增补 {} 车",
                format_plan_date(day.ledger_date),
                deficit_units,
                delta
            ));
        }

        merged
            .into_iter()
            .map(|(order_date, draft)| PurchaseAdvice {
                order_date,
                need_date: draft.need_date,
                truck_count: draft.truck_count,
                urgency: if order_date <= today {
                    AdviceUrgency::DueToday
                } else {
                    AdviceUrgency::Upcoming
                },
                reason_json: json!({
                    "need_date": format_plan_date(draft.need_date),
                    "deficit_units": draft.deficit_units,
                    "trucks": draft.truck_count,
                    "reasons": draft.reasons,
                })
                .to_string(),
            })
            .collect()
    }
}

// ==========================================
// AdviceDraft - 建议归并草稿
// ==========================================
// 同一下单日的触发明细在此累计, 输出时一次性序列化为成因 JSON
struct AdviceDraft {
    need_date: NaiveDate,  // 首个触发日
    truck_count: u32,      // 累计增量车数
    deficit_units: f64,    // 最深缺口 (瓶)
    reasons: Vec<String>,  // 每触发日一条明细
}

// ==========================================
// Default trait 实现
// ==========================================
impl Default for LedgerProjector {
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
    use crate::domain::planning::InventoryAnchor;
    use crate::domain::product::ProductSpec;
    use crate::engine::spec_resolver::SpecResolver;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// 创建测试用的解析规格 (每箱 12 瓶, 每车 24000 瓶)
    fn create_test_resolved(sku: &str) -> ResolvedSpec {
        let spec = ProductSpec {
            sku: sku.to_string(),
            product_name: "500ml 乌龙茶".to_string(),
            units_per_case: 12,
            cases_per_pallet: 100,
            units_per_truck: 24000,
            pallets_per_truck_override: None,
            production_rate_cph: 1200.0,
            seq_no: Some(1),
            is_active: true,
            updated_at: Utc::now().naive_utc(),
            updated_by: None,
        };
        SpecResolver::new().resolve(sku, Some(spec)).unwrap()
    }

    /// 创建测试用的快照 (锚点 + 单日需求)
    fn create_test_snapshot(sku: &str, anchor_date: NaiveDate, count_units: f64) -> PlanningSnapshot {
        PlanningSnapshot {
            sku: sku.to_string(),
            anchor: Some(InventoryAnchor {
                sku: sku.to_string(),
                anchor_date,
                count_units,
                noted_by: None,
                noted_at: Utc::now().naive_utc(),
            }),
            ..Default::default()
        }
    }

    fn policy_no_safety() -> ProjectionPolicy {
        ProjectionPolicy {
            safety_stock_loads: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_anchor_day_demand_goes_negative() {
        // 锚点 500 瓶, 当日需求 1000 箱 × 12 瓶 ⇒ 500 - 12000 = -11500
        let projector = LedgerProjector::new();
        let resolved = create_test_resolved("SKU-OT500");
        let today = date(2024, 1, 1);

        let mut snapshot = create_test_snapshot("SKU-OT500", today, 500.0);
        snapshot.demand_cases.insert(today, 1000.0);

        let result = projector.project(
            today,
            &resolved,
            &snapshot,
            OnHandStock::default(),
            &policy_no_safety(),
        );

        assert_eq!(result.days[0].ledger_date, today);
        assert_eq!(result.days[0].balance_units, -11500.0);
        assert!(result.days[0].is_safety_risk);
        assert_eq!(result.first_risk_date, Some(today));
        assert_eq!(result.runway_days, 0);
    }

    #[test]
    fn test_ledger_conservation() {
        // 记账式: balance[d] = balance[d-1] + 到货×UPT - 耗用×UPC
        let projector = LedgerProjector::new();
        let resolved = create_test_resolved("SKU-OT500");
        let today = date(2024, 3, 1);

        let mut snapshot = create_test_snapshot("SKU-OT500", today, 50000.0);
        snapshot.demand_cases.insert(date(2024, 3, 2), 300.0);
        snapshot.demand_cases.insert(date(2024, 3, 5), 800.0);
        snapshot.actual_cases.insert(date(2024, 3, 2), 450.0);
        snapshot.inbound_loads.insert(date(2024, 3, 4), 2.0);

        let result = projector.project(
            today,
            &resolved,
            &snapshot,
            OnHandStock::default(),
            &policy_no_safety(),
        );

        for pair in result.days.windows(2) {
            let d = pair[1].ledger_date;
            let inbound = snapshot.inbound_loads.get(&d).copied().unwrap_or(0.0) * 24000.0;
            let out = snapshot
                .actual_cases
                .get(&d)
                .copied()
                .or_else(|| snapshot.demand_cases.get(&d).copied())
                .unwrap_or(0.0)
                * 12.0;
            assert_eq!(pair[1].balance_units, pair[0].balance_units + inbound - out);
        }
    }

    #[test]
    fn test_actual_overrides_demand() {
        let projector = LedgerProjector::new();
        let resolved = create_test_resolved("SKU-OT500");
        let today = date(2024, 3, 1);

        let mut snapshot = create_test_snapshot("SKU-OT500", today, 100000.0);
        snapshot.demand_cases.insert(today, 1000.0);
        snapshot.actual_cases.insert(today, 400.0);

        let result = projector.project(
            today,
            &resolved,
            &snapshot,
            OnHandStock::default(),
            &policy_no_safety(),
        );

        // 实绩 400 箱覆盖需求 1000 箱: 100000 - 4800
        assert_eq!(result.days[0].balance_units, 95200.0);
        assert!(result.days[0].is_confirmed);
        assert!(!result.days[1].is_confirmed);
    }

    #[test]
    fn test_explicit_zero_actual_overrides_demand() {
        // 显式录入实绩 0 表示"确认无耗用", 不回落到需求
        let projector = LedgerProjector::new();
        let resolved = create_test_resolved("SKU-OT500");
        let today = date(2024, 3, 1);

        let mut snapshot = create_test_snapshot("SKU-OT500", today, 100000.0);
        snapshot.demand_cases.insert(today, 1000.0);
        snapshot.actual_cases.insert(today, 0.0);

        let result = projector.project(
            today,
            &resolved,
            &snapshot,
            OnHandStock::default(),
            &policy_no_safety(),
        );

        assert_eq!(result.days[0].balance_units, 100000.0);
        assert!(result.days[0].is_confirmed);
    }

    #[test]
    fn test_anchor_idempotence() {
        let projector = LedgerProjector::new();
        let resolved = create_test_resolved("SKU-OT500");
        let today = date(2024, 3, 1);

        let mut snapshot = create_test_snapshot("SKU-OT500", date(2024, 2, 27), 37000.0);
        snapshot.demand_cases.insert(date(2024, 2, 28), 120.0);
        snapshot.demand_cases.insert(date(2024, 3, 3), 777.0);
        snapshot.inbound_loads.insert(date(2024, 3, 2), 1.0);

        let policy = ProjectionPolicy::default();
        let first = projector.project(today, &resolved, &snapshot, OnHandStock::default(), &policy);
        let second = projector.project(today, &resolved, &snapshot, OnHandStock::default(), &policy);

        assert_eq!(first.days, second.days);
        assert_eq!(first.advice, second.advice);
        assert_eq!(first.runway_days, second.runway_days);
    }

    #[test]
    fn test_backward_extrapolation_from_future_anchor() {
        // 锚点在窗口起点之后: 逆推仍须满足记账式
        let projector = LedgerProjector::new();
        let resolved = create_test_resolved("SKU-OT500");
        let today = date(2024, 3, 1);
        let anchor_date = date(2024, 3, 4);

        let mut snapshot = create_test_snapshot("SKU-OT500", anchor_date, 60000.0);
        // 锚点日之前的流水
        snapshot.demand_cases.insert(date(2024, 3, 2), 500.0); // -6000 瓶
        snapshot.inbound_loads.insert(date(2024, 3, 3), 1.0); // +24000 瓶

        let result = projector.project(
            today,
            &resolved,
            &snapshot,
            OnHandStock::default(),
            &policy_no_safety(),
        );

        // closing[3-3] = 锚点日期初余额 60000
        // closing[3-2] = 60000 - 24000 = 36000
        // closing[3-1] = 36000 + 6000 = 42000
        assert_eq!(result.days[0].balance_units, 42000.0); // 3-1
        assert_eq!(result.days[1].balance_units, 36000.0); // 3-2
        assert_eq!(result.days[2].balance_units, 60000.0); // 3-3
        assert_eq!(result.days[3].balance_units, 60000.0); // 3-4 (锚点日无流水)
    }

    #[test]
    fn test_runway_counts_pre_risk_days() {
        let projector = LedgerProjector::new();
        let resolved = create_test_resolved("SKU-OT500");
        let today = date(2024, 3, 1);

        let mut snapshot = create_test_snapshot("SKU-OT500", today, 30000.0);
        // 每日耗 1000 箱 = 12000 瓶: 3-1 余 18000, 3-2 余 6000, 3-3 余 -6000
        for offset in 0..5 {
            snapshot
                .demand_cases
                .insert(today + Duration::days(offset), 1000.0);
        }

        let result = projector.project(
            today,
            &resolved,
            &snapshot,
            OnHandStock::default(),
            &policy_no_safety(),
        );

        assert_eq!(result.first_risk_date, Some(date(2024, 3, 3)));
        assert_eq!(result.runway_days, 2);
    }

    #[test]
    fn test_runway_full_horizon_when_no_risk() {
        let projector = LedgerProjector::new();
        let resolved = create_test_resolved("SKU-OT500");
        let today = date(2024, 3, 1);
        let snapshot = create_test_snapshot("SKU-OT500", today, 500000.0);

        let result = projector.project(
            today,
            &resolved,
            &snapshot,
            OnHandStock::default(),
            &ProjectionPolicy::default(),
        );

        assert_eq!(result.first_risk_date, None);
        assert_eq!(result.runway_days, 21);
        assert_eq!(result.days.len(), 21);
    }

    #[test]
    fn test_horizon_clamped() {
        let projector = LedgerProjector::new();
        let resolved = create_test_resolved("SKU-OT500");
        let today = date(2024, 3, 1);
        let snapshot = create_test_snapshot("SKU-OT500", today, 0.0);

        let short = ProjectionPolicy {
            horizon_days: 3,
            ..Default::default()
        };
        let long = ProjectionPolicy {
            horizon_days: 90,
            ..Default::default()
        };

        let r1 = projector.project(today, &resolved, &snapshot, OnHandStock::default(), &short);
        let r2 = projector.project(today, &resolved, &snapshot, OnHandStock::default(), &long);

        assert_eq!(r1.days.len(), MIN_HORIZON_DAYS as usize);
        assert_eq!(r2.days.len(), MAX_HORIZON_DAYS as usize);
    }

    #[test]
    fn test_purchase_advice_merges_same_order_date() {
        let projector = LedgerProjector::new();
        let resolved = create_test_resolved("SKU-OT500");
        let today = date(2024, 3, 1);

        // 安全目标 = 1 车 = 24000 瓶; 锚点 30000 瓶
        let mut snapshot = create_test_snapshot("SKU-OT500", today, 30000.0);
        // 3-5 耗 1000 箱 → 余 18000 (缺口 6000, 需 1 车)
        // 3-6 耗 2000 箱 → 余 -6000 (累计缺口 30000, 需 2 车, 增量 1)
        snapshot.demand_cases.insert(date(2024, 3, 5), 1000.0);
        snapshot.demand_cases.insert(date(2024, 3, 6), 2000.0);

        let policy = ProjectionPolicy {
            safety_stock_loads: 1,
            lead_time_days: 3,
            ..Default::default()
        };
        let result = projector.project(today, &resolved, &snapshot, OnHandStock::default(), &policy);

        // 下单日: 3-5-3天=3-2, 3-6-3天=3-3 → 两条建议
        assert_eq!(result.advice.len(), 2);
        assert_eq!(result.advice[0].order_date, date(2024, 3, 2));
        assert_eq!(result.advice[0].need_date, date(2024, 3, 5));
        assert_eq!(result.advice[0].truck_count, 1);
        assert_eq!(result.advice[0].urgency, AdviceUrgency::Upcoming);
        assert_eq!(result.advice[1].order_date, date(2024, 3, 3));
        assert_eq!(result.advice[1].truck_count, 1);

        // 合计车数恰好覆盖最深缺口: 2 车 = 48000 瓶 ≥ 30000 缺口
        let total: u32 = result.advice.iter().map(|a| a.truck_count).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_purchase_advice_overdue_clamps_to_today() {
        let projector = LedgerProjector::new();
        let resolved = create_test_resolved("SKU-OT500");
        let today = date(2024, 3, 1);

        // 窗口首两日即跌破 → 原始下单日在过去, 压到今天并合并
        let mut snapshot = create_test_snapshot("SKU-OT500", today, 20000.0);
        snapshot.demand_cases.insert(today, 1000.0); // 余 8000
        snapshot.demand_cases.insert(date(2024, 3, 2), 1000.0); // 余 -4000

        let policy = ProjectionPolicy {
            safety_stock_loads: 1,
            lead_time_days: 3,
            ..Default::default()
        };
        let result = projector.project(today, &resolved, &snapshot, OnHandStock::default(), &policy);

        assert_eq!(result.advice.len(), 1);
        assert_eq!(result.advice[0].order_date, today);
        assert_eq!(result.advice[0].need_date, today);
        assert_eq!(result.advice[0].urgency, AdviceUrgency::DueToday);
        // 最深缺口 28000 瓶 → 累计 2 车
        assert_eq!(result.advice[0].truck_count, 2);
    }

    #[test]
    fn test_negative_and_nan_inputs_coerced_to_zero() {
        let projector = LedgerProjector::new();
        let resolved = create_test_resolved("SKU-OT500");
        let today = date(2024, 3, 1);

        let mut snapshot = create_test_snapshot("SKU-OT500", today, 10000.0);
        snapshot.demand_cases.insert(today, -500.0);
        snapshot.inbound_loads.insert(date(2024, 3, 2), f64::NAN);

        let result = projector.project(
            today,
            &resolved,
            &snapshot,
            OnHandStock::default(),
            &policy_no_safety(),
        );

        // 负需求与 NAN 到货均按 0 计, 余额保持锚点值
        assert_eq!(result.days[0].balance_units, 10000.0);
        assert_eq!(result.days[1].balance_units, 10000.0);
    }

    #[test]
    fn test_overflow_flag_with_capacity() {
        let projector = LedgerProjector::new();
        let resolved = create_test_resolved("SKU-OT500");
        let today = date(2024, 3, 1);

        let mut snapshot = create_test_snapshot("SKU-OT500", today, 50000.0);
        snapshot.inbound_loads.insert(date(2024, 3, 2), 2.0); // +48000 → 98000

        let policy = ProjectionPolicy {
            safety_stock_loads: 0,
            storage_capacity_units: Some(90000.0),
            ..Default::default()
        };
        let result = projector.project(today, &resolved, &snapshot, OnHandStock::default(), &policy);

        assert!(!result.days[0].is_overflow); // 50000 ≤ 90000
        assert!(result.days[1].is_overflow); // 98000 > 90000

        // 未配置库容时恒为 false
        let no_cap = projector.project(
            today,
            &resolved,
            &snapshot,
            OnHandStock::default(),
            &policy_no_safety(),
        );
        assert!(no_cap.days.iter().all(|d| !d.is_overflow));
    }

    #[test]
    fn test_is_secure_counts_yard_loads() {
        let projector = LedgerProjector::new();
        let resolved = create_test_resolved("SKU-OT500");
        let today = date(2024, 3, 1);
        let snapshot = create_test_snapshot("SKU-OT500", today, 0.0);

        let policy = ProjectionPolicy {
            safety_stock_loads: 2, // 目标 48000 瓶
            ..Default::default()
        };

        // 厂内 30000 + 场内 1 车 (24000) = 54000 ≥ 48000
        let secure = projector.project(
            today,
            &resolved,
            &snapshot,
            OnHandStock {
                floor_units: 30000.0,
                yard_loads: 1.0,
            },
            &policy,
        );
        assert!(secure.is_secure);

        let insecure = projector.project(
            today,
            &resolved,
            &snapshot,
            OnHandStock {
                floor_units: 30000.0,
                yard_loads: 0.0,
            },
            &policy,
        );
        assert!(!insecure.is_secure);
    }

    #[test]
    fn test_missing_anchor_starts_from_zero() {
        let projector = LedgerProjector::new();
        let resolved = create_test_resolved("SKU-OT500");
        let today = date(2024, 3, 1);

        let mut snapshot = PlanningSnapshot::empty("SKU-OT500");
        snapshot.inbound_loads.insert(today, 1.0);

        let result = projector.project(
            today,
            &resolved,
            &snapshot,
            OnHandStock::default(),
            &policy_no_safety(),
        );

        assert_eq!(result.days[0].balance_units, 24000.0);
    }

    #[test]
    fn test_window_dates_continuous_from_today() {
        let projector = LedgerProjector::new();
        let resolved = create_test_resolved("SKU-OT500");
        let today = date(2024, 2, 27);
        let snapshot = create_test_snapshot("SKU-OT500", today, 10000.0);

        let result = projector.project(
            today,
            &resolved,
            &snapshot,
            OnHandStock::default(),
            &ProjectionPolicy::default(),
        );

        // 逐日台账自 today 起连续 (跨 2024 闰日)
        let dates: Vec<NaiveDate> = result.days.iter().map(|d| d.ledger_date).collect();
        assert_eq!(dates, date_seq(today, 21));
    }

    #[test]
    fn test_advice_reason_json_explains_deficit() {
        let projector = LedgerProjector::new();
        let resolved = create_test_resolved("SKU-OT500");
        let today = date(2024, 3, 1);

        // 安全目标 1 车 = 24000 瓶; 3-5 余 18000 (缺 6000), 3-6 余 -6000 (累计缺 30000)
        let mut snapshot = create_test_snapshot("SKU-OT500", today, 30000.0);
        snapshot.demand_cases.insert(date(2024, 3, 5), 1000.0);
        snapshot.demand_cases.insert(date(2024, 3, 6), 2000.0);

        let policy = ProjectionPolicy {
            safety_stock_loads: 1,
            lead_time_days: 3,
            ..Default::default()
        };
        let result = projector.project(today, &resolved, &snapshot, OnHandStock::default(), &policy);

        let reason: serde_json::Value = serde_json::from_str(&result.advice[0].reason_json).unwrap();
        assert_eq!(reason["need_date"], "2024-03-05");
        assert_eq!(reason["deficit_units"], 6000.0);
        assert_eq!(reason["trucks"], 1);
        assert_eq!(reason["reasons"].as_array().unwrap().len(), 1);

        let reason: serde_json::Value = serde_json::from_str(&result.advice[1].reason_json).unwrap();
        assert_eq!(reason["need_date"], "2024-03-06");
        assert_eq!(reason["deficit_units"], 30000.0);
    }

    #[test]
    fn test_advice_reason_json_accumulates_merged_triggers() {
        // 两个触发日压到同一下单日时, 成因明细逐条累计, 缺口取最深值
        let projector = LedgerProjector::new();
        let resolved = create_test_resolved("SKU-OT500");
        let today = date(2024, 3, 1);

        let mut snapshot = create_test_snapshot("SKU-OT500", today, 20000.0);
        snapshot.demand_cases.insert(today, 1000.0); // 余 8000, 缺 16000
        snapshot.demand_cases.insert(date(2024, 3, 2), 1000.0); // 余 -4000, 缺 28000

        let policy = ProjectionPolicy {
            safety_stock_loads: 1,
            lead_time_days: 3,
            ..Default::default()
        };
        let result = projector.project(today, &resolved, &snapshot, OnHandStock::default(), &policy);

        assert_eq!(result.advice.len(), 1);
        let reason: serde_json::Value = serde_json::from_str(&result.advice[0].reason_json).unwrap();
        assert_eq!(reason["trucks"], 2);
        assert_eq!(reason["deficit_units"], 28000.0);

        let details = reason["reasons"].as_array().unwrap();
        assert_eq!(details.len(), 2);
        assert!(details[0].as_str().unwrap().contains("2024-03-01"));
        assert!(details[1].as_str().unwrap().contains("2024-03-02"));
    }
}
