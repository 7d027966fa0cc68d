// ==========================================
// 饮料代工生产计划系统 - 领域类型定义
// ==========================================
// 计划数据分三类记账: 需求/实绩/到货
// 班次体系: 一天三班,每班 8 小时
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 计划条目类型 (Entry Kind)
// ==========================================
// 红线: 需求/实绩以"箱"计, 到货以"车"计
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    Demand,  // 需求计划 (箱)
    Actual,  // 生产实绩 (箱), 录入后覆盖同日需求
    Inbound, // 到货车数 (车)
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Demand => write!(f, "DEMAND"),
            EntryKind::Actual => write!(f, "ACTUAL"),
            EntryKind::Inbound => write!(f, "INBOUND"),
        }
    }
}

impl EntryKind {
    /// 从字符串解析条目类型
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DEMAND" => Some(EntryKind::Demand),
            "ACTUAL" => Some(EntryKind::Actual),
            "INBOUND" => Some(EntryKind::Inbound),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            EntryKind::Demand => "DEMAND",
            EntryKind::Actual => "ACTUAL",
            EntryKind::Inbound => "INBOUND",
        }
    }
}

// ==========================================
// 班次 (Shift Bucket)
// ==========================================
// 固定三班: S1=[0,8) S2=[8,16) S3=[16,24)
// 红线: 归班用未取整的到达小时数,不用展示时刻
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShiftBucket {
    S1, // 早班 00:00-08:00
    S2, // 中班 08:00-16:00
    S3, // 晚班 16:00-24:00
}

impl fmt::Display for ShiftBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShiftBucket::S1 => write!(f, "S1"),
            ShiftBucket::S2 => write!(f, "S2"),
            ShiftBucket::S3 => write!(f, "S3"),
        }
    }
}

impl ShiftBucket {
    /// 按未取整的到达小时数归班
    ///
    /// # 参数
    /// - raw_hours: 到达时刻的小数小时 [0, 24)
    pub fn from_raw_hours(raw_hours: f64) -> Self {
        if raw_hours < 8.0 {
            ShiftBucket::S1
        } else if raw_hours < 16.0 {
            ShiftBucket::S2
        } else {
            ShiftBucket::S3
        }
    }

    /// 班次时间段标签
    pub fn label(&self) -> &'static str {
        match self {
            ShiftBucket::S1 => "00:00-08:00",
            ShiftBucket::S2 => "08:00-16:00",
            ShiftBucket::S3 => "16:00-24:00",
        }
    }

    /// 固定班次顺序 (S1 → S2 → S3)
    pub fn all() -> [ShiftBucket; 3] {
        [ShiftBucket::S1, ShiftBucket::S2, ShiftBucket::S3]
    }
}

// ==========================================
// 采购建议紧急度 (Advice Urgency)
// ==========================================
// 下单日 ≤ 今天 → 今日必办; 否则 → 近期待办
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdviceUrgency {
    DueToday, // 今日必办 (含逾期)
    Upcoming, // 近期待办
}

impl fmt::Display for AdviceUrgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdviceUrgency::DueToday => write!(f, "DUE_TODAY"),
            AdviceUrgency::Upcoming => write!(f, "UPCOMING"),
        }
    }
}
