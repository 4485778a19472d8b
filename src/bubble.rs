//! Inline bubble entity and the rendering port
//!
//! A [`Bubble`] is one translation result living inline in a document.
//! It is created in the `Loading` state, updated in place once the network
//! result arrives, and removed only by explicit user dismissal.
//!
//! Rendering goes through the [`InlineRenderer`] port so the translation flow
//! stays headless: a real host document is one implementation, and
//! [`MemoryDocument`] is the in-crate implementation used by the CLI and the
//! tests.

use serde::{Deserialize, Serialize};

/// Lifecycle states of a bubble: `Loading -> Default | Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleState {
    /// Waiting for the translation result
    Loading,
    /// Terminal success state
    Default,
    /// Terminal failure state
    Error,
}

impl BubbleState {
    /// CSS modifier class used by host-document renderers.
    pub fn css_class(&self) -> &'static str {
        match self {
            BubbleState::Loading => "inline-translation--loading",
            BubbleState::Default => "inline-translation--default",
            BubbleState::Error => "inline-translation--error",
        }
    }
}

/// Typographic snapshot captured from the document context surrounding a
/// selection, so the bubble visually matches the text it sits next to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineStyle {
    pub font_family: String,
    pub font_size: String,
    pub font_weight: String,
    pub font_style: String,
    pub line_height: String,
    pub letter_spacing: String,
}

/// One inline translation result.
///
/// The style snapshot is serialized into the bubble's own metadata when the
/// bubble is created, and re-read from there on every state transition, so
/// the appearance never drifts from the original context even when the
/// document has changed since.
#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    text: String,
    state: BubbleState,
    style_meta: Option<String>,
    style: Option<InlineStyle>,
}

impl Bubble {
    /// Create a bubble, capturing the style snapshot into metadata.
    pub fn new(text: impl Into<String>, state: BubbleState, style: Option<InlineStyle>) -> Self {
        let style_meta = style
            .as_ref()
            .and_then(|s| serde_json::to_string(s).ok());
        Bubble {
            text: text.into(),
            state,
            style_meta,
            style,
        }
    }

    pub fn state(&self) -> BubbleState {
        self.state
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Serialized style metadata attached to the bubble, if any.
    pub fn style_meta(&self) -> Option<&str> {
        self.style_meta.as_deref()
    }

    pub fn style(&self) -> Option<&InlineStyle> {
        self.style.as_ref()
    }

    /// Text as shown to the user: success results are wrapped in brackets.
    pub fn display_text(&self) -> String {
        match self.state {
            BubbleState::Default => format!("[{}]", self.text),
            _ => self.text.clone(),
        }
    }

    /// Transition the bubble in place, re-applying the stored style snapshot
    /// without re-sampling the document.
    pub fn apply(&mut self, text: impl Into<String>, state: BubbleState) {
        self.text = text.into();
        self.state = state;
        self.style = self
            .style_meta
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok());
    }
}

/// Handle to a node inserted through an [`InlineRenderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

/// Rendering port consumed by the translation flow.
///
/// Updates and removals against a node that is no longer in the document are
/// harmless no-ops; a translation resolving after its bubble was dismissed
/// must not fail.
pub trait InlineRenderer {
    /// Insert a bubble immediately after the current selection end.
    /// Implementations prepend a space when the preceding sibling is a text
    /// node not already ending in whitespace, to avoid visual word-merging.
    fn insert_inline_node(&mut self, bubble: Bubble) -> NodeId;

    /// Transition an existing bubble in place.
    fn update_node(&mut self, id: NodeId, text: &str, state: BubbleState);

    /// Detach a bubble from the document (user dismissal).
    fn remove_node(&mut self, id: NodeId);
}

/// A shared document handle is itself a renderer, so concurrent translation
/// futures can each drive their own bubble in one document.
impl<R: InlineRenderer> InlineRenderer for std::sync::Arc<std::sync::Mutex<R>> {
    fn insert_inline_node(&mut self, bubble: Bubble) -> NodeId {
        self.lock().expect("renderer lock poisoned").insert_inline_node(bubble)
    }

    fn update_node(&mut self, id: NodeId, text: &str, state: BubbleState) {
        self.lock()
            .expect("renderer lock poisoned")
            .update_node(id, text, state)
    }

    fn remove_node(&mut self, id: NodeId) {
        self.lock().expect("renderer lock poisoned").remove_node(id)
    }
}

/// A node in a [`MemoryDocument`]: either a run of text or an inserted bubble.
#[derive(Debug, Clone, PartialEq)]
pub enum DocNode {
    Text(String),
    Bubble { id: NodeId, bubble: Bubble },
}

/// In-memory document implementing the rendering port.
///
/// Bubbles are appended at the end, which models insertion at the collapsed
/// end point of the selection.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    nodes: Vec<DocNode>,
    next_id: u64,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text run, standing in for the page content around the
    /// selection.
    pub fn append_text(&mut self, text: impl Into<String>) {
        self.nodes.push(DocNode::Text(text.into()));
    }

    pub fn nodes(&self) -> &[DocNode] {
        &self.nodes
    }

    pub fn bubble(&self, id: NodeId) -> Option<&Bubble> {
        self.nodes.iter().find_map(|node| match node {
            DocNode::Bubble { id: node_id, bubble } if *node_id == id => Some(bubble),
            _ => None,
        })
    }

    /// Flatten the document to a plain string (text runs plus the
    /// user-visible bubble text).
    pub fn render(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                DocNode::Text(text) => out.push_str(text),
                DocNode::Bubble { bubble, .. } => out.push_str(&bubble.display_text()),
            }
        }
        out
    }
}

impl InlineRenderer for MemoryDocument {
    fn insert_inline_node(&mut self, bubble: Bubble) -> NodeId {
        let needs_space = matches!(
            self.nodes.last(),
            Some(DocNode::Text(text)) if !text.is_empty() && !text.ends_with(char::is_whitespace)
        );
        if needs_space {
            self.nodes.push(DocNode::Text(" ".to_string()));
        }

        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.push(DocNode::Bubble { id, bubble });
        id
    }

    fn update_node(&mut self, id: NodeId, text: &str, state: BubbleState) {
        // Detached nodes are silently skipped.
        for node in &mut self.nodes {
            if let DocNode::Bubble { id: node_id, bubble } = node {
                if *node_id == id {
                    bubble.apply(text, state);
                    return;
                }
            }
        }
    }

    fn remove_node(&mut self, id: NodeId) {
        self.nodes.retain(|node| {
            !matches!(node, DocNode::Bubble { id: node_id, .. } if *node_id == id)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_style() -> InlineStyle {
        InlineStyle {
            font_family: "serif".to_string(),
            font_size: "14px".to_string(),
            font_weight: "400".to_string(),
            font_style: "normal".to_string(),
            line_height: "1.4".to_string(),
            letter_spacing: "normal".to_string(),
        }
    }

    // ========== Bubble Tests ==========

    #[test]
    fn test_success_text_is_bracket_wrapped() {
        let bubble = Bubble::new("xin chào", BubbleState::Default, None);
        assert_eq!(bubble.display_text(), "[xin chào]");
    }

    #[test]
    fn test_loading_and_error_text_unwrapped() {
        let loading = Bubble::new("Đang dịch…", BubbleState::Loading, None);
        assert_eq!(loading.display_text(), "Đang dịch…");
        let error = Bubble::new("failed", BubbleState::Error, None);
        assert_eq!(error.display_text(), "failed");
    }

    #[test]
    fn test_style_snapshot_survives_transitions() {
        let mut bubble = Bubble::new("Đang dịch…", BubbleState::Loading, Some(sample_style()));
        assert!(bubble.style_meta().is_some());

        bubble.apply("xin chào", BubbleState::Default);
        assert_eq!(bubble.style(), Some(&sample_style()));

        bubble.apply("failed", BubbleState::Error);
        assert_eq!(bubble.style(), Some(&sample_style()));
    }

    #[test]
    fn test_bubble_without_style_has_no_meta() {
        let bubble = Bubble::new("text", BubbleState::Loading, None);
        assert!(bubble.style_meta().is_none());
    }

    // ========== MemoryDocument Tests ==========

    #[test]
    fn test_insert_after_unspaced_text_adds_space() {
        let mut doc = MemoryDocument::new();
        doc.append_text("trailing word");
        doc.insert_inline_node(Bubble::new("hello", BubbleState::Default, None));
        assert_eq!(doc.render(), "trailing word [hello]");
    }

    #[test]
    fn test_insert_after_whitespace_adds_no_space() {
        let mut doc = MemoryDocument::new();
        doc.append_text("trailing word ");
        doc.insert_inline_node(Bubble::new("hello", BubbleState::Default, None));
        assert_eq!(doc.render(), "trailing word [hello]");
    }

    #[test]
    fn test_insert_into_empty_document_adds_no_space() {
        let mut doc = MemoryDocument::new();
        doc.insert_inline_node(Bubble::new("hello", BubbleState::Default, None));
        assert_eq!(doc.render(), "[hello]");
    }

    #[test]
    fn test_update_transitions_in_place() {
        let mut doc = MemoryDocument::new();
        let id = doc.insert_inline_node(Bubble::new("Đang dịch…", BubbleState::Loading, None));
        doc.update_node(id, "xin chào", BubbleState::Default);

        let bubble = doc.bubble(id).unwrap();
        assert_eq!(bubble.state(), BubbleState::Default);
        assert_eq!(bubble.display_text(), "[xin chào]");
    }

    #[test]
    fn test_remove_detaches_bubble() {
        let mut doc = MemoryDocument::new();
        doc.append_text("before ");
        let id = doc.insert_inline_node(Bubble::new("hello", BubbleState::Default, None));
        doc.remove_node(id);
        assert_eq!(doc.render(), "before ");
        assert!(doc.bubble(id).is_none());
    }

    #[test]
    fn test_update_after_removal_is_noop() {
        let mut doc = MemoryDocument::new();
        let id = doc.insert_inline_node(Bubble::new("hello", BubbleState::Loading, None));
        doc.remove_node(id);
        // A late network result against a dismissed bubble must not panic.
        doc.update_node(id, "late", BubbleState::Default);
        assert!(doc.bubble(id).is_none());
    }

    #[test]
    fn test_independent_bubbles_do_not_crosstalk() {
        let mut doc = MemoryDocument::new();
        let first = doc.insert_inline_node(Bubble::new("a", BubbleState::Loading, None));
        let second = doc.insert_inline_node(Bubble::new("b", BubbleState::Loading, None));

        doc.update_node(second, "b-done", BubbleState::Default);
        assert_eq!(doc.bubble(first).unwrap().state(), BubbleState::Loading);
        assert_eq!(doc.bubble(second).unwrap().state(), BubbleState::Default);
    }
}
