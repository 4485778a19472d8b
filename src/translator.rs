//! Selection translator: the page-context controller
//!
//! Listens for the Alt+T trigger, validates the current selection, builds the
//! request URL from settings, delegates the fetch to the relay channel, and
//! drives the lifecycle of the inline bubble through the rendering port.
//!
//! Concurrency model: each trigger is an independent future that owns one
//! bubble. Repeated triggers may overlap and resolve out of order; each only
//! ever updates its own bubble, so no serialization between them is needed.
//! The settings refresh is the only de-duplicated concurrent operation, and
//! there is no cancellation — a late result against a dismissed bubble is a
//! harmless no-op in the renderer.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::bubble::{Bubble, BubbleState, InlineRenderer, InlineStyle, NodeId};
use crate::error::{TranslateError, TranslateResult};
use crate::messages::UiMessages;
use crate::relay::{RelayRequest, TranslateChannel};
use crate::settings::{Settings, SettingsStore};

/// Selections longer than this are rejected before any network call.
pub const MAX_TEXT_LENGTH: usize = 500;

/// Response fields recognized as carrying the translation, in priority order.
pub const TRANSLATION_FIELDS: [&str; 4] = ["translated", "translatedText", "translation", "result"];

/// A keydown as seen by the host document.
#[derive(Debug, Clone, Default)]
pub struct KeyChord {
    /// `KeyboardEvent.key`
    pub key: String,
    /// `KeyboardEvent.code`
    pub code: String,
    /// Alt/Option held
    pub alt: bool,
    /// Key-repeat event
    pub repeat: bool,
    /// Focus currently sits inside an editable context (content-editable
    /// ancestor, `<input>` or `<textarea>`)
    pub editable_focus: bool,
}

impl KeyChord {
    /// The trigger chord with no editable focus, as tests and the CLI use it.
    pub fn alt_t() -> Self {
        KeyChord {
            key: "t".to_string(),
            code: "KeyT".to_string(),
            alt: true,
            repeat: false,
            editable_focus: false,
        }
    }

    fn is_letter_t(&self) -> bool {
        self.code == "KeyT" || self.key.eq_ignore_ascii_case("t")
    }
}

/// The current text selection, captured together with its style context.
#[derive(Debug, Clone, Default)]
pub struct SelectionSnapshot {
    pub text: String,
    pub collapsed: bool,
    /// The selection anchor lies inside an editable context.
    pub anchor_editable: bool,
    /// The selection focus lies inside an editable context.
    pub focus_editable: bool,
    /// Typographic snapshot of the context containing the selection start.
    pub style: Option<InlineStyle>,
}

impl SelectionSnapshot {
    pub fn of_text(text: impl Into<String>) -> Self {
        SelectionSnapshot {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Decide whether a keydown should trigger the translator.
///
/// Requires Alt + "T", not a key repeat, focus and both selection ends
/// outside editable contexts, and a non-collapsed selection with non-empty
/// trimmed text.
pub fn should_handle(chord: &KeyChord, selection: Option<&SelectionSnapshot>) -> bool {
    if chord.repeat || !chord.alt || !chord.is_letter_t() || chord.editable_focus {
        return false;
    }

    let Some(selection) = selection else {
        return false;
    };
    if selection.anchor_editable || selection.focus_editable || selection.collapsed {
        return false;
    }

    !selection.text.trim().is_empty()
}

/// Build the request URL for a selection from the effective settings.
///
/// The stored endpoint is honored only under developer mode; otherwise the
/// default endpoint applies. An endpoint that does not parse as an absolute
/// URL is retried with an `https://` prefix before failing. `src`/`tgt`
/// parameters are omitted when their values are empty after trimming.
pub fn build_request_url(
    settings: &Settings,
    defaults: &Settings,
    text: &str,
) -> TranslateResult<reqwest::Url> {
    let stored = settings.endpoint.trim();
    let effective = if settings.developer_mode && !stored.is_empty() {
        stored
    } else {
        defaults.endpoint.trim()
    };
    if effective.is_empty() {
        return Err(TranslateError::Config(
            "endpoint is not configured".to_string(),
        ));
    }

    let mut url = reqwest::Url::parse(effective)
        .or_else(|_| reqwest::Url::parse(&format!("https://{}", effective)))
        .map_err(|_| {
            TranslateError::Config(format!("endpoint '{}' is not a valid URL", effective))
        })?;

    url.query_pairs_mut().append_pair("q", text);
    let source = settings.source_lang.trim();
    if !source.is_empty() {
        url.query_pairs_mut().append_pair("src", source);
    }
    let target = settings.target_lang.trim();
    if !target.is_empty() {
        url.query_pairs_mut().append_pair("tgt", target);
    }

    debug!(%url, "buildRequestUrl");
    Ok(url)
}

/// Resolve the translated string from a relay payload.
///
/// Checks the recognized fields in priority order and accepts the first that
/// is a non-empty string after trimming.
pub fn extract_translation(data: Option<&serde_json::Value>) -> Option<String> {
    let data = data?;
    TRANSLATION_FIELDS.iter().find_map(|field| {
        data.get(*field)
            .and_then(serde_json::Value::as_str)
            .filter(|value| !value.trim().is_empty())
            .map(str::to_string)
    })
}

/// Orchestrates one translation per trigger, from validation to the terminal
/// bubble state.
pub struct SelectionTranslator<C: TranslateChannel> {
    store: Arc<SettingsStore>,
    channel: C,
    messages: UiMessages,
}

impl<C: TranslateChannel> SelectionTranslator<C> {
    pub fn new(store: Arc<SettingsStore>, channel: C, messages: UiMessages) -> Self {
        SelectionTranslator {
            store,
            channel,
            messages,
        }
    }

    pub fn store(&self) -> &Arc<SettingsStore> {
        &self.store
    }

    /// Full keydown entry point: gate the event, then run the translation
    /// flow. Returns the inserted bubble's id, or `None` when the event was
    /// not handled (the caller then leaves default key handling alone).
    pub async fn on_keydown<R: InlineRenderer>(
        &self,
        chord: &KeyChord,
        selection: Option<&SelectionSnapshot>,
        renderer: &mut R,
    ) -> Option<NodeId> {
        if !should_handle(chord, selection) {
            return None;
        }
        let selection = selection?;
        Some(self.translate_selection(selection, renderer).await)
    }

    /// Run the translation flow for an already-validated selection:
    /// refresh settings, length-gate, render the loading bubble, call the
    /// relay, and transition the bubble to its terminal state.
    pub async fn translate_selection<R: InlineRenderer>(
        &self,
        selection: &SelectionSnapshot,
        renderer: &mut R,
    ) -> NodeId {
        let text = selection.text.trim().to_string();
        let style = selection.style.clone();
        debug!(
            length = text.chars().count(),
            preview = %text.chars().take(80).collect::<String>(),
            "Shortcut Option+T triggered"
        );

        // Best-effort freshness: a stale-but-valid value may still be used.
        self.store.ensure_fresh().await;

        if text.chars().count() > MAX_TEXT_LENGTH {
            warn!(length = text.chars().count(), "Selected text too long");
            return renderer.insert_inline_node(Bubble::new(
                self.messages.get("bubble-too-long"),
                BubbleState::Error,
                style,
            ));
        }

        let id = renderer.insert_inline_node(Bubble::new(
            self.messages.get("bubble-loading"),
            BubbleState::Loading,
            style,
        ));

        let settings = self.store.current();
        match self.request_translation(&settings, &text).await {
            Ok(translated) => {
                debug!(%translated, "Translation success");
                renderer.update_node(id, &translated, BubbleState::Default);
            }
            Err(e) => {
                debug!("Inline translator error: {}", e);
                renderer.update_node(
                    id,
                    &self.messages.get("bubble-translate-failed"),
                    BubbleState::Error,
                );
            }
        }
        id
    }

    async fn request_translation(
        &self,
        settings: &Settings,
        text: &str,
    ) -> TranslateResult<String> {
        let url = build_request_url(settings, self.store.defaults(), text)?;
        let response = self
            .channel
            .send(RelayRequest::translate(url.to_string()))
            .await;

        if !response.success {
            let message = response
                .error
                .unwrap_or_else(|| "Translation request failed.".to_string());
            return Err(TranslateError::Network(message));
        }

        extract_translation(response.data.as_ref()).ok_or(TranslateError::Payload)
    }
}
