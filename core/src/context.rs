//! Composition context for platform communication.
//!
//! Plain data the presentation layer reads after each session call. The core
//! never calls back into the UI; the platform asks the session to fill a
//! `CompositionContext` and renders from its fields.

/// Snapshot of a `CompositionSession` for display.
///
/// # Fields
///
/// - `selection`: grapheme ids chosen so far, in selection order
/// - `candidates`: ids that may be tapped next, in display order
/// - `commit_text`: characters confirmed so far (consume with `take_commit`)
/// - `auxiliary_text`: short status line ("not found", match notice, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositionContext {
    pub selection: Vec<String>,
    pub candidates: Vec<String>,
    pub commit_text: String,
    pub auxiliary_text: String,
}

impl CompositionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear selection, candidates and auxiliary text. Leaves `commit_text`.
    pub fn clear(&mut self) {
        self.selection.clear();
        self.candidates.clear();
        self.auxiliary_text.clear();
    }

    /// Take the commit text, leaving it empty.
    pub fn take_commit(&mut self) -> String {
        std::mem::take(&mut self.commit_text)
    }

    pub fn has_commit(&self) -> bool {
        !self.commit_text.is_empty()
    }

    /// Whether there is anything to draw besides committed text.
    pub fn has_visible_state(&self) -> bool {
        !self.selection.is_empty() || !self.candidates.is_empty()
    }
}
