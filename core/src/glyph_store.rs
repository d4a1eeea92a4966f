//! Grapheme image store.
//!
//! A grapheme exists for the composition engine only if `<id>.png` is present
//! in the store directory and is non-empty. Queries never open the file; they
//! only stat it, so an id whose image disappears mid-session stops being
//! offered on the next query.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::utils::grapheme_order;

/// Existence oracle for grapheme images.
///
/// `Dictionary` queries and `CompositionSession` only need to know which ids
/// have a backing image; the filesystem-backed `GlyphStore` is the production
/// implementation.
pub trait GlyphIndex {
    /// Path of the backing image if it is present and non-empty.
    fn glyph_path(&self, id: &str) -> Option<PathBuf>;

    /// Whether `id` has a usable backing image.
    fn has_glyph(&self, id: &str) -> bool {
        self.glyph_path(id).is_some()
    }

    /// Every id with a usable backing image, in display order.
    fn glyph_ids(&self) -> Vec<String>;
}

impl<G: GlyphIndex + ?Sized> GlyphIndex for &G {
    fn glyph_path(&self, id: &str) -> Option<PathBuf> {
        (**self).glyph_path(id)
    }

    fn has_glyph(&self, id: &str) -> bool {
        (**self).has_glyph(id)
    }

    fn glyph_ids(&self) -> Vec<String> {
        (**self).glyph_ids()
    }
}

/// One file found in the store, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlyphFile {
    pub id: String,
    /// Numeric value of the id when it is a plain integer.
    pub number: Option<u64>,
    pub size: u64,
}

impl GlyphFile {
    /// Zero-length files are never offered as candidates.
    pub fn is_usable(&self) -> bool {
        self.size > 0
    }
}

/// Directory of `<id>.<ext>` grapheme images.
#[derive(Debug, Clone)]
pub struct GlyphStore {
    root: PathBuf,
    extension: String,
}

impl GlyphStore {
    /// Store rooted at `root` using the `png` extension.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self::with_extension(root, "png")
    }

    pub fn with_extension<P: Into<PathBuf>, E: Into<String>>(root: P, extension: E) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an id maps to, whether or not the file exists.
    ///
    /// Returns `None` for ids that could escape the store directory.
    pub fn path_for(&self, id: &str) -> Option<PathBuf> {
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            return None;
        }
        Some(self.root.join(format!("{}.{}", id, self.extension)))
    }

    /// Every `<id>.<ext>` file in the store, including empty ones.
    ///
    /// A missing or unreadable directory yields an empty inventory.
    pub fn inventory(&self) -> Vec<GlyphFile> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "grapheme store not readable");
                return Vec::new();
            }
        };

        let mut files: Vec<GlyphFile> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let meta = entry.metadata().ok()?;
                if !meta.is_file() {
                    return None;
                }
                let path = entry.path();
                if path.extension()?.to_str()? != self.extension {
                    return None;
                }
                let id = path.file_stem()?.to_str()?.to_string();
                Some(GlyphFile {
                    number: id.parse().ok(),
                    id,
                    size: meta.len(),
                })
            })
            .collect();

        files.sort_by(|a, b| grapheme_order(&a.id, &b.id));
        debug!(count = files.len(), "grapheme inventory");
        files
    }
}

impl GlyphIndex for GlyphStore {
    fn glyph_path(&self, id: &str) -> Option<PathBuf> {
        let path = self.path_for(id)?;
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Some(path),
            _ => None,
        }
    }

    fn glyph_ids(&self) -> Vec<String> {
        self.inventory()
            .into_iter()
            .filter(GlyphFile::is_usable)
            .map(|f| f.id)
            .collect()
    }
}
