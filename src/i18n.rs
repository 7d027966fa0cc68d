// ==========================================
// 饮料代工生产计划系统 - 多语言文案
// ==========================================
// 文案目录: locales/*.yml（rust_i18n::i18n! 在 lib.rs 声明, zh-CN 回退）
// 适用范围: API 返回的业务提示与面向操作员的日志文案
// ==========================================

/// 已打包进二进制的语言代码
pub const SUPPORTED_LOCALES: &[&str] = &["zh-CN", "en"];

/// 当前语言代码
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 语言代码是否受支持
pub fn is_supported(locale: &str) -> bool {
    SUPPORTED_LOCALES.contains(&locale)
}

/// 切换语言; 不认识的代码保持原语言并记告警
pub fn set_locale(locale: &str) {
    if !is_supported(locale) {
        tracing::warn!(locale = locale, "忽略未支持的语言代码");
        return;
    }
    rust_i18n::set_locale(locale);
}

/// 取文案（无占位符）
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 取文案并填充 `%{name}` 占位符
///
/// # 示例
/// ```no_run
/// use copack_aps::i18n::t_with_args;
/// let msg = t_with_args("truck.board_updated", &[("sku", "CB-330ML")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    interpolate(&t(key), args)
}

fn interpolate(template: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("%{{{}}}", name), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // locale 为进程级全局状态, 用例之间需要串行化
    static LOCALE_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_supported_locales() {
        assert!(is_supported("zh-CN"));
        assert!(is_supported("en"));
        assert!(!is_supported("fr"));
    }

    #[test]
    fn test_set_locale_ignores_unknown() {
        let _guard = LOCALE_LOCK.lock().unwrap();
        set_locale("zh-CN");
        set_locale("ja-JP");
        assert_eq!(current_locale(), "zh-CN");
    }

    #[test]
    fn test_switch_locale_round_trip() {
        let _guard = LOCALE_LOCK.lock().unwrap();
        set_locale("en");
        assert_eq!(current_locale(), "en");
        assert_eq!(t("common.success"), "Operation successful");

        set_locale("zh-CN");
        assert_eq!(current_locale(), "zh-CN");
        assert_eq!(t("common.success"), "操作成功");
    }

    #[test]
    fn test_interpolate_fills_placeholders() {
        let out = interpolate("总台账刷新完成: 共 %{count} 个品种", &[("count", "3")]);
        assert_eq!(out, "总台账刷新完成: 共 3 个品种");

        // 未提供的占位符原样保留
        let out = interpolate("%{a}-%{b}", &[("a", "x")]);
        assert_eq!(out, "x-%{b}");
    }

    #[test]
    fn test_board_updated_message_both_locales() {
        let _guard = LOCALE_LOCK.lock().unwrap();
        set_locale("zh-CN");
        let msg = t_with_args("truck.board_updated", &[("sku", "CB-330ML")]);
        assert!(msg.contains("CB-330ML"));
        assert!(msg.contains("车位看板"));

        set_locale("en");
        let msg = t_with_args("truck.board_updated", &[("sku", "CB-330ML")]);
        assert!(msg.contains("Truck board updated"));
        assert!(msg.contains("CB-330ML"));

        set_locale("zh-CN");
    }
}
