// ==========================================
// 饮料代工生产计划系统 - 刷新去抖闸门
// ==========================================
// 职责: 把密集的录入变更合并成一次总台账重算
// 机制: 代际计数 + 延时检查, 窗口内只有最后一次触发存活
// 红线: 触发丢不得 —— 合并可以, 漏算不行
// ==========================================

use crate::engine::events::{PlanningEvent, PlanningEventPublisher, PlanningEventType};
use crate::service::master_refresh::MasterRefreshService;
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 刷新触发类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// 需求/实际/到货录入变更
    EntryChanged,
    /// 实盘锚点替换
    AnchorReplaced,
    /// 产品规格变更
    SpecChanged,
    /// 车位看板变更
    BoardChanged,
    /// 手动刷新
    ManualRefresh,
}

impl RefreshTrigger {
    pub fn as_str(&self) -> &str {
        match self {
            RefreshTrigger::EntryChanged => "EntryChanged",
            RefreshTrigger::AnchorReplaced => "AnchorReplaced",
            RefreshTrigger::SpecChanged => "SpecChanged",
            RefreshTrigger::BoardChanged => "BoardChanged",
            RefreshTrigger::ManualRefresh => "ManualRefresh",
        }
    }
}

/// 刷新去抖闸门
///
/// 每次 notify 都把代际计数 +1 并挂一个延时任务;
/// 延时醒来后若代际已被后续触发顶掉则直接退出,
/// 否则执行一次全量总台账刷新。连发 N 次只算最后一次。
pub struct RefreshGate {
    service: Arc<MasterRefreshService>,
    debounce: Duration,
    generation: Arc<AtomicU64>,
    runtime: tokio::runtime::Handle,
}

impl RefreshGate {
    /// 创建刷新闸门
    ///
    /// # 参数
    /// - service: 总台账刷新服务
    /// - debounce_ms: 去抖窗口（毫秒）
    /// - runtime: 承载延时任务的 tokio runtime 句柄
    pub fn new(
        service: Arc<MasterRefreshService>,
        debounce_ms: u64,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        Self {
            service,
            debounce: Duration::from_millis(debounce_ms),
            generation: Arc::new(AtomicU64::new(0)),
            runtime,
        }
    }

    /// 登记一次刷新触发（同步接口, 可在任意线程调用）
    pub fn notify(&self, trigger: RefreshTrigger, source: Option<String>) {
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::debug!(
            trigger = trigger.as_str(),
            source = source.as_deref().unwrap_or("-"),
            generation = my_generation,
            "刷新触发已入闸"
        );

        let generation = self.generation.clone();
        let service = self.service.clone();
        let debounce = self.debounce;

        self.runtime.spawn(async move {
            tokio::time::sleep(debounce).await;

            // 窗口内有更新的触发, 让位
            if generation.load(Ordering::SeqCst) != my_generation {
                return;
            }

            match service.refresh_now().await {
                Ok(result) => {
                    tracing::info!(
                        run_id = %result.run_id,
                        trigger = trigger.as_str(),
                        products = result.product_count,
                        rows = result.ledger.row_count(),
                        failures = result.failures.len(),
                        duration_ms = result.duration_ms,
                        "去抖刷新完成"
                    );
                }
                Err(e) => {
                    tracing::error!(trigger = trigger.as_str(), "去抖刷新失败: {}", e);
                }
            }
        });
    }
}

// ==========================================
// RefreshGateAdapter - 事件适配器
// ==========================================
// 实现 Engine 层定义的 PlanningEventPublisher trait,
// 把计划事件转换为闸门触发（依赖倒置: 服务层实现引擎层接口）
// ==========================================
pub struct RefreshGateAdapter {
    gate: Arc<RefreshGate>,
}

impl RefreshGateAdapter {
    pub fn new(gate: Arc<RefreshGate>) -> Self {
        Self { gate }
    }

    fn convert_event_type(event_type: &PlanningEventType) -> RefreshTrigger {
        match event_type {
            PlanningEventType::PlanningEntryChanged => RefreshTrigger::EntryChanged,
            PlanningEventType::AnchorReplaced => RefreshTrigger::AnchorReplaced,
            PlanningEventType::ProductSpecChanged => RefreshTrigger::SpecChanged,
            PlanningEventType::TruckBoardChanged => RefreshTrigger::BoardChanged,
            PlanningEventType::ManualTrigger => RefreshTrigger::ManualRefresh,
        }
    }
}

impl PlanningEventPublisher for RefreshGateAdapter {
    fn publish(&self, event: PlanningEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        let trigger = Self::convert_event_type(&event.event_type);
        self.gate.notify(trigger, event.source.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::master_refresh::testkit::CountingSource;

    fn build_gate(debounce_ms: u64) -> (Arc<RefreshGate>, Arc<CountingSource>) {
        let source = Arc::new(CountingSource::with_skus(vec!["SKU-A".to_string()]));
        let service = Arc::new(MasterRefreshService::new(source.clone()));
        let gate = Arc::new(RefreshGate::new(
            service,
            debounce_ms,
            tokio::runtime::Handle::current(),
        ));
        (gate, source)
    }

    #[test]
    fn test_convert_event_type() {
        assert_eq!(
            RefreshGateAdapter::convert_event_type(&PlanningEventType::PlanningEntryChanged),
            RefreshTrigger::EntryChanged
        );
        assert_eq!(
            RefreshGateAdapter::convert_event_type(&PlanningEventType::AnchorReplaced),
            RefreshTrigger::AnchorReplaced
        );
        assert_eq!(
            RefreshGateAdapter::convert_event_type(&PlanningEventType::ProductSpecChanged),
            RefreshTrigger::SpecChanged
        );
        assert_eq!(
            RefreshGateAdapter::convert_event_type(&PlanningEventType::TruckBoardChanged),
            RefreshTrigger::BoardChanged
        );
        assert_eq!(
            RefreshGateAdapter::convert_event_type(&PlanningEventType::ManualTrigger),
            RefreshTrigger::ManualRefresh
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_burst_collapses_to_single_refresh() {
        let (gate, source) = build_gate(50);

        for _ in 0..5 {
            gate.notify(RefreshTrigger::EntryChanged, Some("test".to_string()));
        }

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(source.list_calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_spaced_triggers_refresh_each() {
        let (gate, source) = build_gate(30);

        gate.notify(RefreshTrigger::EntryChanged, None);
        tokio::time::sleep(Duration::from_millis(150)).await;
        gate.notify(RefreshTrigger::AnchorReplaced, None);
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(source.list_calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_adapter_publishes_through_gate() {
        let (gate, source) = build_gate(30);
        let adapter = RefreshGateAdapter::new(gate);

        adapter
            .publish(PlanningEvent::for_sku(
                PlanningEventType::PlanningEntryChanged,
                "SKU-A",
                Some("test".to_string()),
            ))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(source.list_calls(), 1);
    }
}
