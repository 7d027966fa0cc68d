// ==========================================
// 饮料代工生产计划系统 - 引擎层事件发布
// ==========================================
// 职责: 定义计划数据变更事件发布 trait, 实现依赖倒置
// 说明: Engine 层定义 trait, Service 层实现适配器
// 优势: Engine/Api 不依赖 Service, 单元测试可用 NoOp
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 计划事件类型
// ==========================================

/// 计划数据变更事件类型
///
/// Engine 层定义的事件类型, 用于通知总台账等下游视图重算
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanningEventType {
    /// 计划条目变更 (需求/实绩/到货)
    PlanningEntryChanged,
    /// 库存锚点替换
    AnchorReplaced,
    /// 产品规格变更
    ProductSpecChanged,
    /// 到货看板变更 (首车时刻/PO/取消)
    TruckBoardChanged,
    /// 手动触发
    ManualTrigger,
}

impl PlanningEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            PlanningEventType::PlanningEntryChanged => "PlanningEntryChanged",
            PlanningEventType::AnchorReplaced => "AnchorReplaced",
            PlanningEventType::ProductSpecChanged => "ProductSpecChanged",
            PlanningEventType::TruckBoardChanged => "TruckBoardChanged",
            PlanningEventType::ManualTrigger => "ManualTrigger",
        }
    }
}

/// 计划数据变更事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningEvent {
    /// 事件类型
    pub event_type: PlanningEventType,
    /// 受影响的 SKU (None 表示全部)
    pub sku: Option<String>,
    /// 事件来源描述
    pub source: Option<String>,
}

impl PlanningEvent {
    /// 创建单品种事件
    pub fn for_sku(event_type: PlanningEventType, sku: &str, source: Option<String>) -> Self {
        Self {
            event_type,
            sku: Some(sku.to_string()),
            source,
        }
    }

    /// 创建全量事件
    pub fn full_scope(event_type: PlanningEventType, source: Option<String>) -> Self {
        Self {
            event_type,
            sku: None,
            source,
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 计划事件发布者 Trait
///
/// Engine 层定义, Service 层实现
/// 典型实现: RefreshGateAdapter 把事件折算成一次防抖后的总台账重算
pub trait PlanningEventPublisher: Send + Sync {
    /// 发布计划事件
    ///
    /// # 返回
    /// - `Ok(())`: 已受理 (不保证立即执行)
    /// - `Err`: 发布失败
    fn publish(&self, event: PlanningEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件发布的场景 (如单元测试)
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl PlanningEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: PlanningEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - event_type={}, sku={:?}",
            event.event_type.as_str(),
            event.sku
        );
        Ok(())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn PlanningEventPublisher>> 的使用
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn PlanningEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn PlanningEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例 (不发布事件)
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件 (如果有发布者)
    pub fn publish(&self, event: PlanningEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者, 跳过事件 - event_type={}",
                    event.event_type.as_str()
                );
                Ok(())
            }
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}
