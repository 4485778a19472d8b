//! Inline Selection Translator
//!
//! Select text, press Alt+T, and get the translation rendered inline next to
//! the selection. The crate is the headless core of that experience: a host
//! document supplies events and a rendering surface, and an external HTTP
//! endpoint supplies the translations.
//!
//! # Overview
//!
//! The components, leaves first:
//!
//! 1. **Settings** ([`settings`]) — normalizes, persists, and synchronizes
//!    user preferences with a throttled, single-flight refresh policy.
//! 2. **Bundled config** ([`config`]) — seeds defaults and the language
//!    catalog from packaged resources before any user override applies.
//! 3. **Relay** ([`relay`]) — the only component allowed to touch the
//!    network; turns a `{type: "translate", url}` message into a
//!    `{success, data?, error?}` envelope.
//! 4. **Selection translator** ([`translator`]) — gates the keyboard
//!    trigger, builds the request URL, and drives the bubble lifecycle
//!    through the [`bubble::InlineRenderer`] port.
//! 5. **Options form** ([`options`]) — a form-to-store mapping over the
//!    settings, with language selectors fed by the catalog.
//!
//! # Example
//!
//! ```ignore
//! use inline_translator::{
//!     bubble::MemoryDocument,
//!     messages::UiMessages,
//!     relay::{DirectChannel, TranslationRelay},
//!     settings::{JsonFileBackend, Settings, SettingsStore},
//!     translator::{KeyChord, SelectionSnapshot, SelectionTranslator},
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let messages = UiMessages::default_ui();
//!     let store = Arc::new(SettingsStore::new(
//!         Arc::new(JsonFileBackend::new("settings.json")),
//!         Settings::default(),
//!     ));
//!     let relay = TranslationRelay::new(messages.clone())?;
//!     let translator =
//!         SelectionTranslator::new(store, DirectChannel::new(relay), messages);
//!
//!     let mut doc = MemoryDocument::new();
//!     let selection = SelectionSnapshot::of_text("hello world");
//!     translator
//!         .on_keydown(&KeyChord::alt_t(), Some(&selection), &mut doc)
//!         .await;
//!     println!("{}", doc.render());
//!     Ok(())
//! }
//! ```

pub mod bubble;
pub mod config;
pub mod error;
pub mod messages;
pub mod options;
pub mod relay;
pub mod settings;
pub mod translator;


pub use bubble::{Bubble, BubbleState, InlineRenderer, InlineStyle, MemoryDocument, NodeId};
pub use config::{BundleLoader, LanguageOption, normalize_language_options};
pub use error::{TranslateError, TranslateResult};
pub use messages::UiMessages;
pub use options::OptionsForm;
pub use relay::{
    DirectChannel, MockChannel, MockReply, RelayRequest, RelayResponse, TranslateChannel,
    TranslationRelay,
};
pub use settings::{
    JsonFileBackend, MemoryBackend, Settings, SettingsBackend, SettingsStore, normalize_settings,
};
pub use translator::{
    KeyChord, SelectionSnapshot, SelectionTranslator, build_request_url, extract_translation,
    should_handle,
};
