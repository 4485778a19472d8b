//! Localized user-facing strings
//!
//! Everything the user sees (bubble contents, options status lines, relay
//! failure text) comes out of this table in the user's language; raw
//! technical messages stay in the logs. Vietnamese is the shipped UI locale,
//! with English as the fallback.
//!
//! Messages may contain `$1`, `$2`, ... placeholders substituted by
//! [`UiMessages::format`].

use std::collections::HashMap;

/// Keyed message table for one locale, with key fallback on misses.
#[derive(Debug, Clone)]
pub struct UiMessages {
    locale: String,
    messages: HashMap<&'static str, &'static str>,
}

const VI_MESSAGES: &[(&str, &str)] = &[
    ("bubble-loading", "Đang dịch…"),
    (
        "bubble-translate-failed",
        "Không thể dịch. Kiểm tra kết nối mạng hoặc thử lại sau.",
    ),
    (
        "bubble-too-long",
        "Đoạn văn bản được chọn quá dài (tối đa 500 ký tự).",
    ),
    ("bubble-dismiss", "Xóa đoạn dịch"),
    ("relay-missing-url", "Thiếu URL dịch."),
    ("endpoint-not-configured", "API endpoint chưa được cấu hình."),
    ("endpoint-invalid", "API endpoint không hợp lệ."),
    ("options-saved", "Đã lưu thiết lập mới."),
    ("options-save-failed", "Không thể lưu thiết lập: $1"),
    ("options-reset", "Đã khôi phục về mặc định."),
    ("options-reset-failed", "Không thể khôi phục mặc định: $1"),
    ("error-unknown", "Lỗi không xác định"),
];

const EN_MESSAGES: &[(&str, &str)] = &[
    ("bubble-loading", "Translating…"),
    (
        "bubble-translate-failed",
        "Could not translate. Check your network connection and try again.",
    ),
    (
        "bubble-too-long",
        "The selected text is too long (500 characters maximum).",
    ),
    ("bubble-dismiss", "Remove translation"),
    ("relay-missing-url", "Missing translation URL."),
    ("endpoint-not-configured", "API endpoint is not configured."),
    ("endpoint-invalid", "API endpoint is not valid."),
    ("options-saved", "Settings saved."),
    ("options-save-failed", "Could not save settings: $1"),
    ("options-reset", "Defaults restored."),
    ("options-reset-failed", "Could not restore defaults: $1"),
    ("error-unknown", "Unknown error"),
];

impl UiMessages {
    /// Build the message table for a locale. Unknown locales fall back to
    /// English.
    pub fn for_locale(locale: &str) -> Self {
        let table = match locale.to_lowercase().as_str() {
            "vi" => VI_MESSAGES,
            _ => EN_MESSAGES,
        };
        UiMessages {
            locale: locale.to_lowercase(),
            messages: table.iter().copied().collect(),
        }
    }

    /// The shipped UI locale.
    pub fn default_ui() -> Self {
        Self::for_locale("vi")
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Look up a message, returning the key itself when missing so a typo
    /// never produces an empty bubble.
    pub fn get(&self, key: &str) -> String {
        self.messages
            .get(key)
            .map(|m| (*m).to_string())
            .unwrap_or_else(|| key.to_string())
    }

    /// Look up a message and substitute `$1`, `$2`, ... with `values`.
    pub fn format(&self, key: &str, values: &[&str]) -> String {
        let mut message = self.get(key);
        for (i, value) in values.iter().enumerate() {
            message = message.replace(&format!("${}", i + 1), value);
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vi_is_shipped_ui_locale() {
        let messages = UiMessages::default_ui();
        assert_eq!(messages.locale(), "vi");
        assert_eq!(messages.get("bubble-loading"), "Đang dịch…");
    }

    #[test]
    fn test_unknown_locale_falls_back_to_english() {
        let messages = UiMessages::for_locale("xx");
        assert_eq!(messages.get("bubble-loading"), "Translating…");
    }

    #[test]
    fn test_missing_key_returns_key() {
        let messages = UiMessages::default_ui();
        assert_eq!(messages.get("no-such-key"), "no-such-key");
    }

    #[test]
    fn test_format_substitutes_placeholders() {
        let messages = UiMessages::for_locale("en");
        let formatted = messages.format("options-save-failed", &["disk full"]);
        assert_eq!(formatted, "Could not save settings: disk full");
    }
}
