//! Options form: a bidirectional mapping between form fields and the
//! settings store
//!
//! The form is headless: a host options page binds its widgets to this model,
//! and the CLI drives it directly. Loading follows the startup sequence of
//! the options surface — bundled defaults, then the language catalog (with a
//! built-in fallback), then the persisted settings — and population
//! synthesizes a selector option for any stored code missing from the
//! catalog, so the user's choice is never silently dropped.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::{BundleLoader, LanguageOption};
use crate::error::TranslateError;
use crate::messages::UiMessages;
use crate::settings::{Settings, SettingsStore};

/// Status lines disappear this long after being shown.
pub const STATUS_CLEAR: Duration = Duration::from_millis(3000);

/// A transient status line under the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusNotice {
    text: String,
    is_error: bool,
    shown_at: Instant,
}

impl StatusNotice {
    fn new(text: String, is_error: bool) -> Self {
        StatusNotice {
            text,
            is_error,
            shown_at: Instant::now(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Whether the notice should have self-cleared by `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.shown_at) >= STATUS_CLEAR
    }
}

/// A language selector: an option list plus the selected code.
#[derive(Debug, Clone, Default)]
pub struct SelectField {
    options: Vec<LanguageOption>,
    value: String,
}

impl SelectField {
    /// Replace the option list with the catalog.
    fn populate(&mut self, catalog: &[LanguageOption]) {
        self.options = catalog.to_vec();
    }

    /// Select a value, synthesizing an option entry when the code is absent
    /// from the list. Empty values fall back to `fallback`.
    fn set_value(&mut self, value: &str, fallback: &str) {
        let chosen = {
            let trimmed = value.trim();
            if trimmed.is_empty() { fallback.trim() } else { trimmed }
        };
        if chosen.is_empty() {
            return;
        }
        self.ensure_option(chosen);
        self.value = chosen.to_string();
    }

    fn ensure_option(&mut self, code: &str) {
        if !self.options.iter().any(|option| option.code == code) {
            debug!(%code, "Synthesizing selector option for stored code");
            self.options.push(LanguageOption::new(code, code));
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn options(&self) -> &[LanguageOption] {
        &self.options
    }

    /// Display label for a code, falling back to the code itself.
    pub fn label_for(&self, code: &str) -> String {
        self.options
            .iter()
            .find(|option| option.code == code)
            .map(|option| option.label.clone())
            .unwrap_or_else(|| code.to_string())
    }
}

/// Form state for the options surface.
pub struct OptionsForm {
    defaults: Settings,
    catalog: Vec<LanguageOption>,
    endpoint: String,
    endpoint_enabled: bool,
    developer_mode: bool,
    source: SelectField,
    target: SelectField,
    status: Option<StatusNotice>,
    messages: UiMessages,
}

impl OptionsForm {
    /// Build the form the way the options page boots: bundled defaults,
    /// language catalog (built-in fallback), persisted settings.
    pub async fn load(bundle: &BundleLoader, store: &SettingsStore) -> Self {
        let catalog = bundle.language_options_or_builtin();
        let settings = store.load().await;
        let mut form = OptionsForm::with_catalog(store.defaults().clone(), catalog);
        form.populate(&settings);
        form
    }

    /// Build a form over an explicit defaults/catalog pair.
    pub fn with_catalog(defaults: Settings, catalog: Vec<LanguageOption>) -> Self {
        OptionsForm {
            defaults,
            catalog,
            endpoint: String::new(),
            endpoint_enabled: false,
            developer_mode: false,
            source: SelectField::default(),
            target: SelectField::default(),
            status: None,
            messages: UiMessages::default_ui(),
        }
    }

    /// Fill every field from a settings value. The endpoint field shows the
    /// stored endpoint only under developer mode, the default otherwise.
    pub fn populate(&mut self, settings: &Settings) {
        self.developer_mode = settings.developer_mode;
        self.endpoint_enabled = settings.developer_mode;
        self.endpoint = if settings.developer_mode {
            settings.endpoint.clone()
        } else {
            self.defaults.endpoint.clone()
        };
        self.source.populate(&self.catalog);
        self.source
            .set_value(&settings.source_lang, &self.defaults.source_lang);
        self.target.populate(&self.catalog);
        self.target
            .set_value(&settings.target_lang, &self.defaults.target_lang);
    }

    /// Toggle developer mode. Turning it off immediately resets the visible
    /// endpoint field to the default endpoint — visual only, nothing is
    /// persisted until submit.
    pub fn set_developer_mode(&mut self, enabled: bool) {
        self.developer_mode = enabled;
        self.endpoint_enabled = enabled;
        if !enabled {
            self.endpoint = self.defaults.endpoint.clone();
        }
    }

    /// Edit the endpoint field. Ignored while the field is disabled.
    pub fn set_endpoint(&mut self, value: impl Into<String>) {
        if self.endpoint_enabled {
            self.endpoint = value.into();
        }
    }

    pub fn select_source(&mut self, code: &str) {
        let fallback = self.defaults.source_lang.clone();
        self.source.set_value(code, &fallback);
    }

    pub fn select_target(&mut self, code: &str) {
        let fallback = self.defaults.target_lang.clone();
        self.target.set_value(code, &fallback);
    }

    /// Current form values as a settings object. The endpoint is taken from
    /// the field only under developer mode; empty fields fall back to the
    /// defaults.
    pub fn extract(&self) -> Settings {
        let endpoint = self.endpoint.trim();
        Settings {
            endpoint: if self.developer_mode && !endpoint.is_empty() {
                endpoint.to_string()
            } else {
                self.defaults.endpoint.clone()
            },
            source_lang: self.non_empty_or(self.source.value(), &self.defaults.source_lang),
            target_lang: self.non_empty_or(self.target.value(), &self.defaults.target_lang),
            developer_mode: self.developer_mode,
        }
    }

    fn non_empty_or(&self, value: &str, fallback: &str) -> String {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            fallback.to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Persist the current form values. Success and failure both leave a
    /// transient status notice.
    pub async fn submit(&mut self, store: &SettingsStore) {
        let settings = self.extract();
        debug!(?settings, "Submitting settings");
        match store.save(&settings).await {
            Ok(()) => {
                // Stand-in for the storage change event reaching the store.
                if let Ok(raw) = serde_json::to_value(&settings) {
                    store.apply_external_change(&raw);
                }
                self.status = Some(StatusNotice::new(self.messages.get("options-saved"), false));
            }
            Err(e) => {
                let detail = match &e {
                    TranslateError::Storage(msg) => msg.clone(),
                    other => other.to_string(),
                };
                self.status = Some(StatusNotice::new(
                    self.messages.format("options-save-failed", &[&detail]),
                    true,
                ));
            }
        }
    }

    /// Repopulate the form with the defaults and persist them immediately.
    pub async fn reset(&mut self, store: &SettingsStore) {
        let defaults = self.defaults.clone();
        self.populate(&defaults);
        match store.save(&defaults).await {
            Ok(()) => {
                if let Ok(raw) = serde_json::to_value(&defaults) {
                    store.apply_external_change(&raw);
                }
                self.status = Some(StatusNotice::new(self.messages.get("options-reset"), false));
            }
            Err(e) => {
                let detail = match &e {
                    TranslateError::Storage(msg) => msg.clone(),
                    other => other.to_string(),
                };
                self.status = Some(StatusNotice::new(
                    self.messages.format("options-reset-failed", &[&detail]),
                    true,
                ));
            }
        }
    }

    pub fn status(&self) -> Option<&StatusNotice> {
        self.status.as_ref()
    }

    /// Drop the status notice once its display window has passed.
    pub fn clear_expired_status(&mut self, now: Instant) {
        if self.status.as_ref().is_some_and(|s| s.is_expired(now)) {
            self.status = None;
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn endpoint_enabled(&self) -> bool {
        self.endpoint_enabled
    }

    pub fn developer_mode(&self) -> bool {
        self.developer_mode
    }

    pub fn source(&self) -> &SelectField {
        &self.source
    }

    pub fn target(&self) -> &SelectField {
        &self.target
    }

    pub fn catalog(&self) -> &[LanguageOption] {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{DEFAULT_ENDPOINT, MemoryBackend};
    use serde_json::json;
    use std::sync::Arc;

    fn catalog() -> Vec<LanguageOption> {
        vec![
            LanguageOption::new("eng_Latn", "English"),
            LanguageOption::new("vie_Latn", "Vietnamese"),
        ]
    }

    fn form() -> OptionsForm {
        OptionsForm::with_catalog(Settings::default(), catalog())
    }

    fn store_with(backend: MemoryBackend) -> SettingsStore {
        SettingsStore::new(Arc::new(backend), Settings::default())
    }

    // ========== Population Tests ==========

    #[test]
    fn test_populate_hides_stored_endpoint_without_developer_mode() {
        let mut form = form();
        form.populate(&Settings {
            endpoint: "https://dev.example".to_string(),
            developer_mode: false,
            ..Settings::default()
        });
        assert_eq!(form.endpoint(), DEFAULT_ENDPOINT);
        assert!(!form.endpoint_enabled());
    }

    #[test]
    fn test_populate_shows_stored_endpoint_in_developer_mode() {
        let mut form = form();
        form.populate(&Settings {
            endpoint: "https://dev.example".to_string(),
            developer_mode: true,
            ..Settings::default()
        });
        assert_eq!(form.endpoint(), "https://dev.example");
        assert!(form.endpoint_enabled());
    }

    #[test]
    fn test_populate_synthesizes_option_for_unknown_stored_code() {
        let mut form = form();
        form.populate(&Settings {
            target_lang: "zsm_Latn".to_string(),
            ..Settings::default()
        });
        assert_eq!(form.target().value(), "zsm_Latn");
        assert!(
            form.target()
                .options()
                .iter()
                .any(|o| o.code == "zsm_Latn" && o.label == "zsm_Latn")
        );
        // Catalog entries are still present alongside the synthesized one.
        assert!(form.target().options().iter().any(|o| o.code == "vie_Latn"));
    }

    #[test]
    fn test_populate_empty_language_falls_back_to_default() {
        let mut form = form();
        form.populate(&Settings {
            source_lang: "  ".to_string(),
            ..Settings::default()
        });
        assert_eq!(form.source().value(), "eng_Latn");
    }

    // ========== Developer Mode Toggle Tests ==========

    #[test]
    fn test_toggle_off_resets_visible_endpoint_only() {
        let mut form = form();
        form.populate(&Settings {
            endpoint: "https://dev.example".to_string(),
            developer_mode: true,
            ..Settings::default()
        });

        form.set_developer_mode(false);
        assert_eq!(form.endpoint(), DEFAULT_ENDPOINT);
        assert!(!form.endpoint_enabled());
    }

    #[test]
    fn test_endpoint_edits_ignored_while_disabled() {
        let mut form = form();
        form.populate(&Settings::default());
        form.set_endpoint("https://sneaky.example");
        assert_eq!(form.endpoint(), DEFAULT_ENDPOINT);

        form.set_developer_mode(true);
        form.set_endpoint("https://dev.example");
        assert_eq!(form.endpoint(), "https://dev.example");
    }

    // ========== Extraction Tests ==========

    #[test]
    fn test_extract_uses_default_endpoint_without_developer_mode() {
        let mut form = form();
        form.populate(&Settings::default());
        form.set_developer_mode(true);
        form.set_endpoint("https://dev.example");
        form.set_developer_mode(false);

        let extracted = form.extract();
        assert_eq!(extracted.endpoint, DEFAULT_ENDPOINT);
        assert!(!extracted.developer_mode);
    }

    #[test]
    fn test_extract_keeps_developer_endpoint() {
        let mut form = form();
        form.populate(&Settings::default());
        form.set_developer_mode(true);
        form.set_endpoint("  https://dev.example  ");

        let extracted = form.extract();
        assert_eq!(extracted.endpoint, "https://dev.example");
        assert!(extracted.developer_mode);
    }

    #[test]
    fn test_extract_blank_developer_endpoint_falls_back() {
        let mut form = form();
        form.populate(&Settings::default());
        form.set_developer_mode(true);
        form.set_endpoint("   ");
        assert_eq!(form.extract().endpoint, DEFAULT_ENDPOINT);
    }

    // ========== Submit / Reset Tests ==========

    #[tokio::test]
    async fn test_submit_persists_and_reports_success() {
        let store = store_with(MemoryBackend::new());
        let mut form = form();
        form.populate(&Settings::default());
        form.select_target("eng_Latn");

        form.submit(&store).await;

        let status = form.status().unwrap();
        assert!(!status.is_error());
        assert_eq!(status.text(), "Đã lưu thiết lập mới.");
        assert_eq!(store.current().target_lang, "eng_Latn");
    }

    #[tokio::test]
    async fn test_submit_failure_reports_error_status() {
        let store = store_with(MemoryBackend::new().with_write_error("quota exceeded"));
        let mut form = form();
        form.populate(&Settings::default());

        form.submit(&store).await;

        let status = form.status().unwrap();
        assert!(status.is_error());
        assert!(status.text().contains("Không thể lưu thiết lập"));
        assert!(status.text().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_reset_repopulates_and_persists_defaults() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SettingsStore::new(backend.clone(), Settings::default());
        let mut form = form();
        form.populate(&Settings {
            target_lang: "deu_Latn".to_string(),
            developer_mode: true,
            endpoint: "https://dev.example".to_string(),
            ..Settings::default()
        });

        form.reset(&store).await;

        assert_eq!(form.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(form.target().value(), "vie_Latn");
        assert!(!form.developer_mode());
        let stored = backend.stored().unwrap();
        assert_eq!(stored, json!(Settings::default()));
        assert_eq!(form.status().unwrap().text(), "Đã khôi phục về mặc định.");
    }

    // ========== Status Expiry Tests ==========

    #[tokio::test]
    async fn test_status_self_clears_after_window() {
        let store = store_with(MemoryBackend::new());
        let mut form = form();
        form.populate(&Settings::default());
        form.submit(&store).await;
        assert!(form.status().is_some());

        let now = Instant::now();
        form.clear_expired_status(now);
        assert!(form.status().is_some());

        form.clear_expired_status(now + STATUS_CLEAR);
        assert!(form.status().is_none());
    }
}
