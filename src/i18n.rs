// ==========================================
// PU 切割仓储系统 - 本地化消息
// ==========================================
// 语言包: locales/{zh-CN,en,pt-BR}.yml（rust_i18n::i18n! 在 lib.rs 中加载）
// 红线: 消息只用于 API 报告的 message 字段与命令行输出,不参与业务判断
// ==========================================

/// 支持的语言
pub const SUPPORTED_LOCALES: [&str; 3] = ["zh-CN", "en", "pt-BR"];

/// 语言环境变量
pub const LOCALE_ENV: &str = "PU_STOCK_LOCALE";

pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 切换语言,不支持的语言代码被忽略
///
/// # 返回
/// - true: 已切换
pub fn set_locale(locale: &str) -> bool {
    let locale = locale.trim();
    match SUPPORTED_LOCALES.iter().find(|l| l.eq_ignore_ascii_case(locale)) {
        Some(supported) => {
            rust_i18n::set_locale(supported);
            true
        }
        None => {
            tracing::warn!(locale, "不支持的语言,保持 {}", current_locale());
            false
        }
    }
}

/// 按 PU_STOCK_LOCALE 设置语言（未设置时保持默认 zh-CN）
pub fn init_from_env() {
    if let Ok(locale) = std::env::var(LOCALE_ENV) {
        set_locale(&locale);
    }
}

pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 带参数翻译,`%{name}` 占位符按 args 替换
///
/// ```no_run
/// use pu_stock::i18n::t_with_args;
/// let msg = t_with_args("storage.sent_to_stock", &[("count", "3")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    args.iter()
        .fold(t(key), |msg, (name, value)| {
            msg.replace(&format!("%{{{}}}", name), value)
        })
}
