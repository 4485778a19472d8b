//! User settings: normalization, persistence, and throttled refresh
//!
//! Settings live in a synced key-value store owned by the host platform; this
//! module wraps that store behind the async [`SettingsBackend`] port and keeps
//! an in-memory current value with a single-flight, throttled refresh policy.
//!
//! # Example
//!
//! ```ignore
//! use inline_translator::settings::{MemoryBackend, Settings, SettingsStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = SettingsStore::new(Arc::new(MemoryBackend::new()), Settings::default());
//!     store.ensure_fresh().await;
//!     println!("{}", store.current().target_lang);
//! }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{TranslateError, TranslateResult};

/// Compiled-in default endpoint, used whenever developer mode is off.
pub const DEFAULT_ENDPOINT: &str = "https://translate.seniordev.uk/translate";
/// Compiled-in default source language code.
pub const DEFAULT_SOURCE_LANG: &str = "eng_Latn";
/// Compiled-in default target language code.
pub const DEFAULT_TARGET_LANG: &str = "vie_Latn";

/// Key under which the settings object is persisted in the synced store.
pub const SETTINGS_STORAGE_KEY: &str = "inlineTranslatorSettings";

/// A load within this window counts as fresh and is not repeated.
pub const SETTINGS_SYNC_THROTTLE: Duration = Duration::from_millis(5000);

/// User-configurable preferences, persisted as one JSON object with
/// camelCase keys.
///
/// Invariant: `endpoint` is only honored when `developer_mode` is true;
/// otherwise the default endpoint applies regardless of the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub endpoint: String,
    pub source_lang: String,
    pub target_lang: String,
    pub developer_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            source_lang: DEFAULT_SOURCE_LANG.to_string(),
            target_lang: DEFAULT_TARGET_LANG.to_string(),
            developer_mode: false,
        }
    }
}

/// Accept a string field only when present and non-empty after trimming.
fn string_field(raw: &Value, key: &str) -> Option<String> {
    let trimmed = raw.get(key)?.as_str()?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Normalize an arbitrary raw value into a complete [`Settings`].
///
/// Non-object input yields `defaults` wholesale. For an object, each field is
/// accepted only if present with the correct primitive type (strings must be
/// non-empty after trimming); otherwise that single field falls back to its
/// default. Never fails.
pub fn normalize_settings(raw: Option<&Value>, defaults: &Settings) -> Settings {
    let mut normalized = defaults.clone();
    let Some(raw) = raw else {
        return normalized;
    };
    if !raw.is_object() {
        debug!(?raw, "normalize_settings fallback triggered (non-object raw)");
        return normalized;
    }

    if let Some(endpoint) = string_field(raw, "endpoint") {
        normalized.endpoint = endpoint;
    }
    if let Some(source) = string_field(raw, "sourceLang") {
        normalized.source_lang = source;
    }
    if let Some(target) = string_field(raw, "targetLang") {
        normalized.target_lang = target;
    }
    if let Some(developer_mode) = raw.get("developerMode").and_then(Value::as_bool) {
        normalized.developer_mode = developer_mode;
    }

    normalized
}

/// Async port over the synced key-value store.
///
/// The host's callback-based storage API is wrapped as result-returning async
/// operations with explicit error values.
#[async_trait]
pub trait SettingsBackend: Send + Sync {
    /// Read the raw persisted settings value, `None` when nothing is stored.
    async fn read(&self) -> TranslateResult<Option<Value>>;

    /// Persist the full settings object.
    async fn write(&self, settings: &Settings) -> TranslateResult<()>;
}

/// Backend storing settings as a JSON object in a single file, keyed by
/// [`SETTINGS_STORAGE_KEY`].
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: std::path::PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        JsonFileBackend { path: path.into() }
    }
}

#[async_trait]
impl SettingsBackend for JsonFileBackend {
    async fn read(&self) -> TranslateResult<Option<Value>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(TranslateError::Storage(format!(
                    "Failed to read '{}': {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let root: Value = serde_json::from_str(&content).map_err(|e| {
            TranslateError::Storage(format!(
                "Failed to parse JSON from '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(root.get(SETTINGS_STORAGE_KEY).cloned())
    }

    async fn write(&self, settings: &Settings) -> TranslateResult<()> {
        let root = serde_json::json!({ SETTINGS_STORAGE_KEY: settings });
        let serialized = serde_json::to_string_pretty(&root)
            .map_err(|e| TranslateError::Storage(e.to_string()))?;
        tokio::fs::write(&self.path, serialized).await.map_err(|e| {
            TranslateError::Storage(format!(
                "Failed to write '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}

/// In-memory backend for tests and the mock CLI mode.
///
/// Tracks the number of reads (for single-flight verification) and can
/// simulate slow or failing storage.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    value: StdMutex<Option<Value>>,
    reads: AtomicUsize,
    read_delay_ms: u64,
    read_error: Option<String>,
    write_error: Option<String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the stored value.
    pub fn with_value(value: Value) -> Self {
        MemoryBackend {
            value: StdMutex::new(Some(value)),
            ..Self::default()
        }
    }

    /// Simulate slow storage, so concurrent readers overlap.
    pub fn with_read_delay(mut self, delay_ms: u64) -> Self {
        self.read_delay_ms = delay_ms;
        self
    }

    /// Make every read fail with the given message.
    pub fn with_read_error(mut self, message: impl Into<String>) -> Self {
        self.read_error = Some(message.into());
        self
    }

    /// Make every write fail with the given message.
    pub fn with_write_error(mut self, message: impl Into<String>) -> Self {
        self.write_error = Some(message.into());
        self
    }

    /// Number of reads issued against this backend.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// The currently stored raw value.
    pub fn stored(&self) -> Option<Value> {
        self.value.lock().expect("backend lock poisoned").clone()
    }
}

#[async_trait]
impl SettingsBackend for MemoryBackend {
    async fn read(&self) -> TranslateResult<Option<Value>> {
        if self.read_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.read_delay_ms)).await;
        }
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.read_error {
            return Err(TranslateError::Storage(message.clone()));
        }
        Ok(self.value.lock().expect("backend lock poisoned").clone())
    }

    async fn write(&self, settings: &Settings) -> TranslateResult<()> {
        if let Some(message) = &self.write_error {
            return Err(TranslateError::Storage(message.clone()));
        }
        let serialized =
            serde_json::to_value(settings).map_err(|e| TranslateError::Storage(e.to_string()))?;
        *self.value.lock().expect("backend lock poisoned") = Some(serialized);
        Ok(())
    }
}

#[derive(Debug)]
struct StoreState {
    current: Settings,
    loaded: bool,
    last_sync: Option<Instant>,
}

/// Holder for the current settings value and its freshness bookkeeping.
///
/// Reads of the current value are synchronous snapshots; refreshes go through
/// a single-flight gate so concurrent [`SettingsStore::ensure_fresh`] callers
/// share one underlying storage read.
pub struct SettingsStore {
    backend: Arc<dyn SettingsBackend>,
    defaults: Settings,
    state: RwLock<StoreState>,
    refresh_gate: Mutex<()>,
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().expect("settings lock poisoned");
        f.debug_struct("SettingsStore")
            .field("current", &state.current)
            .field("loaded", &state.loaded)
            .finish()
    }
}

impl SettingsStore {
    /// Create a store seeded with the given effective defaults (compiled-in
    /// values, possibly merged with bundled overrides by the config loader).
    pub fn new(backend: Arc<dyn SettingsBackend>, defaults: Settings) -> Self {
        SettingsStore {
            backend,
            state: RwLock::new(StoreState {
                current: defaults.clone(),
                loaded: false,
                last_sync: None,
            }),
            defaults,
            refresh_gate: Mutex::new(()),
        }
    }

    /// The effective defaults this store normalizes against.
    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }

    /// Snapshot of the current settings.
    pub fn current(&self) -> Settings {
        self.state
            .read()
            .expect("settings lock poisoned")
            .current
            .clone()
    }

    fn is_fresh(&self) -> bool {
        let state = self.state.read().expect("settings lock poisoned");
        state.loaded
            && state
                .last_sync
                .is_some_and(|at| at.elapsed() < SETTINGS_SYNC_THROTTLE)
    }

    fn commit(&self, settings: Settings) {
        let mut state = self.state.write().expect("settings lock poisoned");
        state.current = settings;
        state.loaded = true;
        state.last_sync = Some(Instant::now());
    }

    /// Read from the backend and replace the current value.
    ///
    /// On a read failure or an absent stored value the defaults apply. The
    /// store is marked loaded and timestamped regardless of the outcome.
    pub async fn load(&self) -> Settings {
        let raw = match self.backend.read().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed reading settings from storage: {}", e);
                None
            }
        };

        let settings = normalize_settings(raw.as_ref(), &self.defaults);
        self.commit(settings.clone());
        debug!(?settings, "Settings synchronized from storage");
        settings
    }

    /// Refresh the current value unless a recent load already did.
    ///
    /// Callers arriving while a refresh is in flight wait for that refresh
    /// instead of issuing their own read; a load within the throttle window
    /// returns immediately.
    pub async fn ensure_fresh(&self) {
        if self.is_fresh() {
            return;
        }

        let _flight = self.refresh_gate.lock().await;
        // A concurrent caller may have refreshed while we waited on the gate.
        if self.is_fresh() {
            debug!("Settings refreshed by concurrent caller, skipping read");
            return;
        }
        self.load().await;
    }

    /// Persist the full settings object.
    pub async fn save(&self, settings: &Settings) -> TranslateResult<()> {
        self.backend.write(settings).await
    }

    /// React to an externally-originated update (sync from another device):
    /// replace the current value with the normalized incoming one and refresh
    /// the freshness timestamp, independent of any in-flight refresh.
    pub fn apply_external_change(&self, raw: &Value) {
        let settings = normalize_settings(Some(raw), &self.defaults);
        debug!(?settings, "Settings updated via external change");
        self.commit(settings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ========== Normalization Tests ==========

    #[test]
    fn test_normalize_empty_object_equals_defaults() {
        let normalized = normalize_settings(Some(&json!({})), &Settings::default());
        assert_eq!(normalized, Settings::default());
    }

    #[test]
    fn test_normalize_none_equals_defaults() {
        assert_eq!(
            normalize_settings(None, &Settings::default()),
            Settings::default()
        );
    }

    #[test]
    fn test_normalize_non_object_equals_defaults() {
        for raw in [json!(null), json!("text"), json!(42), json!([1, 2])] {
            assert_eq!(
                normalize_settings(Some(&raw), &Settings::default()),
                Settings::default()
            );
        }
    }

    #[test]
    fn test_normalize_whitespace_endpoint_falls_back() {
        let normalized = normalize_settings(Some(&json!({"endpoint": "  "})), &Settings::default());
        assert_eq!(normalized.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_normalize_is_per_field_not_all_or_nothing() {
        let raw = json!({
            "endpoint": "https://example.com/translate",
            "sourceLang": 42,
            "targetLang": "  fra_Latn ",
            "developerMode": "yes"
        });
        let normalized = normalize_settings(Some(&raw), &Settings::default());
        assert_eq!(normalized.endpoint, "https://example.com/translate");
        assert_eq!(normalized.source_lang, DEFAULT_SOURCE_LANG);
        assert_eq!(normalized.target_lang, "fra_Latn");
        assert!(!normalized.developer_mode);
    }

    #[test]
    fn test_normalize_accepts_boolean_developer_mode() {
        let normalized =
            normalize_settings(Some(&json!({"developerMode": true})), &Settings::default());
        assert!(normalized.developer_mode);
    }

    #[test]
    fn test_normalize_uses_store_defaults_not_compiled_ones() {
        let defaults = Settings {
            endpoint: "https://bundled.example/translate".to_string(),
            ..Settings::default()
        };
        let normalized = normalize_settings(Some(&json!({})), &defaults);
        assert_eq!(normalized.endpoint, "https://bundled.example/translate");
    }

    // ========== Store Tests ==========

    #[tokio::test]
    async fn test_load_reads_stored_value() {
        let backend = Arc::new(MemoryBackend::with_value(json!({
            "endpoint": "https://example.com",
            "sourceLang": "deu_Latn",
            "targetLang": "fra_Latn",
            "developerMode": true
        })));
        let store = SettingsStore::new(backend, Settings::default());

        let settings = store.load().await;
        assert_eq!(settings.source_lang, "deu_Latn");
        assert!(settings.developer_mode);
        assert_eq!(store.current(), settings);
    }

    #[tokio::test]
    async fn test_load_failure_degrades_to_defaults() {
        let backend = Arc::new(MemoryBackend::new().with_read_error("storage detached"));
        let store = SettingsStore::new(backend, Settings::default());

        let settings = store.load().await;
        assert_eq!(settings, Settings::default());
        // The store must still count as loaded afterwards.
        assert!(store.is_fresh());
    }

    #[tokio::test]
    async fn test_concurrent_ensure_fresh_issues_one_read() {
        let backend = Arc::new(MemoryBackend::new().with_read_delay(30));
        let store = Arc::new(SettingsStore::new(backend.clone(), Settings::default()));

        let a = store.clone();
        let b = store.clone();
        tokio::join!(a.ensure_fresh(), b.ensure_fresh());

        assert_eq!(backend.read_count(), 1);
    }

    #[tokio::test]
    async fn test_ensure_fresh_throttles_repeat_loads() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SettingsStore::new(backend.clone(), Settings::default());

        store.ensure_fresh().await;
        store.ensure_fresh().await;
        store.ensure_fresh().await;

        assert_eq!(backend.read_count(), 1);
    }

    #[tokio::test]
    async fn test_save_surfaces_backend_error() {
        let backend = Arc::new(MemoryBackend::new().with_write_error("quota exceeded"));
        let store = SettingsStore::new(backend, Settings::default());

        let result = store.save(&Settings::default()).await;
        match result {
            Err(TranslateError::Storage(msg)) => assert!(msg.contains("quota exceeded")),
            other => panic!("Expected storage error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_save_round_trips_through_backend() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SettingsStore::new(backend.clone(), Settings::default());

        let settings = Settings {
            target_lang: "fra_Latn".to_string(),
            ..Settings::default()
        };
        store.save(&settings).await.unwrap();

        let stored = backend.stored().unwrap();
        assert_eq!(stored["targetLang"], "fra_Latn");
    }

    #[tokio::test]
    async fn test_external_change_replaces_current_and_refreshes() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SettingsStore::new(backend.clone(), Settings::default());

        store.apply_external_change(&json!({"targetLang": "fra_Latn"}));
        assert_eq!(store.current().target_lang, "fra_Latn");

        // The external change counts as a fresh sync, so no read follows.
        store.ensure_fresh().await;
        assert_eq!(backend.read_count(), 0);
    }

    #[tokio::test]
    async fn test_external_change_normalizes_malformed_value() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SettingsStore::new(backend, Settings::default());

        store.apply_external_change(&json!({"endpoint": "   ", "developerMode": true}));
        let current = store.current();
        assert_eq!(current.endpoint, DEFAULT_ENDPOINT);
        assert!(current.developer_mode);
    }

    // ========== File Backend Tests ==========

    #[tokio::test]
    async fn test_file_backend_missing_file_reads_none() {
        let backend = JsonFileBackend::new("/nonexistent/inline-translator-settings.json");
        assert_eq!(backend.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_backend_round_trip() {
        let dir = std::env::temp_dir().join(format!(
            "inline-translator-test-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let backend = JsonFileBackend::new(dir.join("settings.json"));

        let settings = Settings {
            developer_mode: true,
            ..Settings::default()
        };
        backend.write(&settings).await.unwrap();

        let raw = backend.read().await.unwrap().unwrap();
        assert_eq!(raw["developerMode"], true);
        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
