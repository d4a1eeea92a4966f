//! Composition session.
//!
//! Holds the user's ordered grapheme selection and the candidate list derived
//! from it. Every edit re-queries the dictionary:
//!
//! - `append` pushes one id (which must be a current candidate) and narrows.
//! - `remove_at` drops one position, then replays the remaining ids from an
//!   empty selection in their original order, recomputing candidates after
//!   each step. Ids whose image has disappeared are dropped during replay.
//! - `confirm` resolves the selection; a match is committed and the session
//!   returns to empty, a miss leaves everything unchanged.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::context::CompositionContext;
use crate::dictionary::Dictionary;
use crate::glyph_store::{GlyphIndex, GlyphStore};
use crate::image_cache::{GlyphImage, ImageCache};

/// Coarse session state. A resolved character is reported through
/// `Confirmation::Resolved`; the session is already `Empty` again by then.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Partial,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Empty
    }
}

/// Result of `CompositionSession::confirm`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// The selection spelled this character; it was committed.
    Resolved(String),
    /// No dictionary entry has exactly this multiset.
    NotFound,
    /// Nothing was selected.
    NothingSelected,
}

/// Rejected session edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("grapheme {0:?} is not among the current candidates")]
    NotACandidate(String),
    #[error("position {position} is out of range for a selection of {len}")]
    OutOfRange { position: usize, len: usize },
}

/// Stateful driver of dictionary queries for one user.
#[derive(Debug)]
pub struct CompositionSession<G = GlyphStore> {
    dictionary: Arc<Dictionary>,
    glyphs: G,
    images: Option<Arc<ImageCache>>,
    selection: Vec<String>,
    candidates: Vec<String>,
    committed: String,
    /// Committed text not yet handed to a context.
    pending_commit: String,
    separator: String,
    status: String,
}

impl<G: GlyphIndex> CompositionSession<G> {
    /// Start an empty session; candidates are the full grapheme set.
    pub fn new(dictionary: Arc<Dictionary>, glyphs: G) -> Self {
        let candidates = glyphs.glyph_ids();
        Self {
            dictionary,
            glyphs,
            images: None,
            selection: Vec::new(),
            candidates,
            committed: String::new(),
            pending_commit: String::new(),
            separator: " ".to_string(),
            status: String::new(),
        }
    }

    /// Attach the shared image cache used by the `*_images` helpers.
    pub fn with_images(mut self, images: Arc<ImageCache>) -> Self {
        self.images = Some(images);
        self
    }

    /// Text placed between consecutive committed characters.
    pub fn with_separator<S: Into<String>>(mut self, separator: S) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    /// Ids that may be appended next, in display order.
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn state(&self) -> SessionState {
        if self.selection.is_empty() {
            SessionState::Empty
        } else {
            SessionState::Partial
        }
    }

    /// Characters confirmed so far.
    pub fn committed_text(&self) -> &str {
        &self.committed
    }

    pub fn take_committed(&mut self) -> String {
        std::mem::take(&mut self.committed)
    }

    /// Last status message for display.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Append `id`, which must be one of the current candidates.
    pub fn append(&mut self, id: &str) -> Result<&[String], SessionError> {
        if !self.candidates.iter().any(|c| c == id) {
            return Err(SessionError::NotACandidate(id.to_string()));
        }
        self.push(id.to_string());
        self.status.clear();
        Ok(&self.candidates)
    }

    /// Remove the id at `position` and replay the rest. Returns the removed id.
    pub fn remove_at(&mut self, position: usize) -> Result<String, SessionError> {
        if position >= self.selection.len() {
            return Err(SessionError::OutOfRange {
                position,
                len: self.selection.len(),
            });
        }

        let removed = self.selection[position].clone();
        let remaining: Vec<String> = self
            .selection
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != position)
            .map(|(_, id)| id.clone())
            .collect();

        self.reset();
        for id in remaining {
            if self.glyphs.has_glyph(&id) {
                self.push(id);
            } else {
                debug!(id = %id, "dropping grapheme without image during replay");
            }
        }
        self.status.clear();
        Ok(removed)
    }

    /// Resolve the current selection.
    pub fn confirm(&mut self) -> Confirmation {
        if self.selection.is_empty() {
            self.status = "select graphemes first".to_string();
            return Confirmation::NothingSelected;
        }

        match self.dictionary.resolve(&self.selection) {
            Some(text) => {
                info!(selection = ?self.selection, text = %text, "resolved character");
                if !self.committed.is_empty() {
                    self.committed.push_str(&self.separator);
                    self.pending_commit.push_str(&self.separator);
                }
                self.committed.push_str(&text);
                self.pending_commit.push_str(&text);
                self.reset();
                self.status = format!("found: {}", text);
                Confirmation::Resolved(text)
            }
            None => {
                debug!(selection = ?self.selection, "no character for selection");
                self.status = "not found".to_string();
                Confirmation::NotFound
            }
        }
    }

    /// Return to the empty state.
    pub fn clear(&mut self) {
        self.reset();
        self.status.clear();
    }

    /// Decoded images for the current candidates, skipping undecodable ids.
    pub fn candidate_images(&self) -> Vec<(String, Arc<GlyphImage>)> {
        self.images_for(&self.candidates)
    }

    /// Decoded images for the current selection, skipping undecodable ids.
    pub fn selection_images(&self) -> Vec<(String, Arc<GlyphImage>)> {
        self.images_for(&self.selection)
    }

    /// Copy the session state into a platform context. Text committed since
    /// the previous sync is appended to `commit_text` exactly once.
    pub fn sync_to_context(&mut self, context: &mut CompositionContext) {
        context.clear();
        context.selection.extend(self.selection.iter().cloned());
        context.candidates.extend(self.candidates.iter().cloned());
        context.commit_text.push_str(&std::mem::take(&mut self.pending_commit));
        context.auxiliary_text.clone_from(&self.status);
    }

    fn push(&mut self, id: String) {
        self.selection.push(id);
        self.candidates = self.dictionary.next_candidates(&self.selection, &self.glyphs);
    }

    fn reset(&mut self) {
        self.selection.clear();
        self.candidates = self.glyphs.glyph_ids();
    }

    fn images_for(&self, ids: &[String]) -> Vec<(String, Arc<GlyphImage>)> {
        let Some(cache) = &self.images else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| cache.get(id).map(|img| (id.clone(), img)))
            .collect()
    }
}
