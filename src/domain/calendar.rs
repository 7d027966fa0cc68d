// ==========================================
// 饮料代工生产计划系统 - 计划日历工具
// ==========================================
// 职责: 计划日期的唯一出入口 (解析/格式化/推移)
// 红线: 领域内部只用 NaiveDate, 字符串日期止于边界
// ==========================================

use chrono::{Duration, NaiveDate};

/// 计划日期的统一外部格式 (ISO, 无时区)
pub const PLAN_DATE_FMT: &str = "%Y-%m-%d";

/// 解析计划日期 (YYYY-MM-DD)
///
/// # 返回
/// - 非法输入返回 None, 由调用方决定是否视为数据质量问题
pub fn parse_plan_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), PLAN_DATE_FMT).ok()
}

/// 格式化计划日期 (YYYY-MM-DD)
pub fn format_plan_date(date: NaiveDate) -> String {
    date.format(PLAN_DATE_FMT).to_string()
}

/// 生成自 start 起连续 days 天的日期序列 (含 start)
pub fn date_seq(start: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..days)
        .map(|i| start + Duration::days(i as i64))
        .collect()
}

/// 计算 from 到 to 的自然日差 (to - from, 可为负)
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}
