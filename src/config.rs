//! Bundled default-configuration and language-catalog loading
//!
//! At startup the system reads two packaged JSON resources: a
//! default-settings document that overrides the compiled-in defaults, and a
//! language catalog for the options selectors. Both loads are best-effort —
//! any failure degrades to compiled-in values and the system keeps working.
//! The loader only ever affects defaults; a value the user explicitly saved
//! is never overwritten here.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{TranslateError, TranslateResult};
use crate::settings::Settings;

/// Bundled default-settings document, relative to the bundle root.
pub const SETTINGS_DATA_PATH: &str = "settings.json";
/// Bundled language catalog, relative to the bundle root.
pub const LANGUAGES_DATA_PATH: &str = "languages.json";

/// One selectable language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageOption {
    /// Language code, non-empty and unique within a list.
    pub code: String,
    /// Display name; defaults to the code when absent.
    pub label: String,
}

impl LanguageOption {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        LanguageOption {
            code: code.into(),
            label: label.into(),
        }
    }
}

/// Minimal built-in catalog used when the bundled one cannot be loaded.
pub fn builtin_language_options() -> Vec<LanguageOption> {
    normalize_language_options(&serde_json::json!([
        { "code": "eng_Latn", "label": "English (Latin script)" },
        { "code": "vie_Latn", "label": "Vietnamese (Latin script)" },
    ]))
}

/// Optional overrides read from the bundled default-settings document.
///
/// Fields follow the same accept-only-if-well-typed rule as settings
/// normalization; anything absent or malformed stays `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultConfig {
    pub default_endpoint: Option<String>,
    pub default_source_lang: Option<String>,
    pub default_target_lang: Option<String>,
    pub developer_mode: Option<bool>,
    pub debug: Option<bool>,
}

impl DefaultConfig {
    /// Extract well-typed fields from a raw document.
    pub fn from_value(raw: &Value) -> TranslateResult<Self> {
        if !raw.is_object() {
            return Err(TranslateError::ConfigLoad(
                "default config root must be an object".to_string(),
            ));
        }

        let string_field = |key: &str| -> Option<String> {
            let trimmed = raw.get(key)?.as_str()?.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        };

        Ok(DefaultConfig {
            default_endpoint: string_field("defaultEndpoint"),
            default_source_lang: string_field("defaultSourceLang"),
            default_target_lang: string_field("defaultTargetLang"),
            developer_mode: raw.get("developerMode").and_then(Value::as_bool),
            // "debug" wins over the legacy "debugMode" spelling.
            debug: raw
                .get("debug")
                .and_then(Value::as_bool)
                .or_else(|| raw.get("debugMode").and_then(Value::as_bool)),
        })
    }

    /// Merge these overrides over a base settings value, field by field.
    pub fn apply_over(&self, base: &Settings) -> Settings {
        let mut merged = base.clone();
        if let Some(endpoint) = &self.default_endpoint {
            merged.endpoint = endpoint.clone();
        }
        if let Some(source) = &self.default_source_lang {
            merged.source_lang = source.clone();
        }
        if let Some(target) = &self.default_target_lang {
            merged.target_lang = target.clone();
        }
        if let Some(developer_mode) = self.developer_mode {
            merged.developer_mode = developer_mode;
        }
        merged
    }
}

/// Reads bundled resources from a directory (the extension-relative URL
/// resolution of the host platform becomes path resolution under this root).
#[derive(Debug, Clone)]
pub struct BundleLoader {
    root: PathBuf,
}

impl BundleLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        BundleLoader { root: root.into() }
    }

    fn read_json(&self, relative: &str) -> TranslateResult<Value> {
        let path = self.root.join(relative);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            TranslateError::ConfigLoad(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            TranslateError::ConfigLoad(format!("Failed to parse '{}': {}", path.display(), e))
        })
    }

    /// Load the bundled default-settings document.
    pub fn load_default_config(&self) -> TranslateResult<DefaultConfig> {
        let raw = self.read_json(SETTINGS_DATA_PATH)?;
        let config = DefaultConfig::from_value(&raw)?;
        debug!(?config, "Default config loaded");
        Ok(config)
    }

    /// Load the bundled language catalog.
    pub fn load_language_catalog(&self) -> TranslateResult<Vec<LanguageOption>> {
        let payload = self.read_json(LANGUAGES_DATA_PATH)?;
        let options = normalize_language_options(&payload);
        if options.is_empty() {
            return Err(TranslateError::ConfigLoad(
                "language catalog contained no usable entries".to_string(),
            ));
        }
        Ok(options)
    }

    /// Compiled-in defaults merged with whatever bundled overrides load.
    /// Loader failures are non-fatal and leave the compiled-in values intact.
    pub fn effective_defaults(&self) -> Settings {
        let base = Settings::default();
        match self.load_default_config() {
            Ok(config) => config.apply_over(&base),
            Err(e) => {
                debug!("Không thể tải cấu hình mặc định: {}", e);
                base
            }
        }
    }

    /// Bundled catalog, or the built-in two-entry list when loading fails.
    pub fn language_options_or_builtin(&self) -> Vec<LanguageOption> {
        match self.load_language_catalog() {
            Ok(options) => options,
            Err(e) => {
                debug!("Không thể tải danh sách ngôn ngữ: {}", e);
                builtin_language_options()
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Normalize one catalog entry: a bare code string or a `{code, label}`
/// object. Anything else yields an empty code and is dropped by the caller.
pub fn normalize_language_option(entry: &Value) -> LanguageOption {
    match entry {
        Value::String(code) => {
            let code = code.trim().to_string();
            LanguageOption::new(code.clone(), code)
        }
        Value::Object(map) => {
            let code = map
                .get("code")
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or("")
                .to_string();
            let label = map
                .get("label")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .unwrap_or(&code)
                .to_string();
            LanguageOption { code, label }
        }
        _ => LanguageOption::new("", ""),
    }
}

/// Normalize a raw catalog payload into a deduplicated, sorted option list.
///
/// The payload may be a bare array, or an object wrapping the list under
/// `languages`, `detailed` or `general` (checked in that order). Entries with
/// an empty code are dropped; duplicate codes keep the first-seen entry.
/// The result is sorted case-insensitively by label.
pub fn normalize_language_options(payload: &Value) -> Vec<LanguageOption> {
    let list = if let Some(list) = payload.as_array() {
        list.as_slice()
    } else {
        ["languages", "detailed", "general"]
            .iter()
            .find_map(|key| payload.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    };

    let mut seen = std::collections::HashSet::new();
    let mut normalized: Vec<LanguageOption> = list
        .iter()
        .map(normalize_language_option)
        .filter(|option| !option.code.is_empty() && seen.insert(option.code.clone()))
        .collect();

    normalized.sort_by_key(|option| option.label.to_lowercase());
    normalized
}
