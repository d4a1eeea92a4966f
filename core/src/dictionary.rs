//! Grapheme dictionary.
//!
//! Maps a character (hexadecimal codepoint key) to the graphemes it is built
//! from. Source format, one entry per line:
//!
//! ```text
//! 4e00:1,2
//! 4e8c:1,1
//! ```
//!
//! The component list keeps source order but is compared as a multiset by
//! both queries. A dictionary is built once and never mutated afterwards.
//!
//! Public API:
//! - `Dictionary::from_lines` / `Dictionary::load_file` - tolerant loaders
//! - `Dictionary::next_candidates` - graphemes that can still be added
//! - `Dictionary::resolve` - character spelled by an exact selection
//! - `Dictionary::validate` - load-time diagnostics

use std::collections::BTreeSet;
use std::path::Path;

use ahash::AHashMap;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::bag::GraphemeBag;
use crate::glyph_store::GlyphIndex;
use crate::utils::{normalize, sort_grapheme_ids};

/// Why a dictionary line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("missing ':' separator")]
    MissingSeparator,
    #[error("expected exactly two ':'-separated fields, found {0}")]
    TooManyFields(usize),
    #[error("empty codepoint")]
    EmptyCodepoint,
    #[error("empty component list")]
    NoComponents,
    #[error("empty component id at position {0}")]
    EmptyComponent(usize),
}

/// Parse one `<codepoint>:<id>,<id>,...` line.
pub fn parse_line(line: &str) -> Result<(String, Vec<String>), LineError> {
    let fields: Vec<&str> = line.split(':').collect();
    match fields.len() {
        1 => return Err(LineError::MissingSeparator),
        2 => {}
        n => return Err(LineError::TooManyFields(n)),
    }

    let codepoint = normalize(fields[0]);
    if codepoint.is_empty() {
        return Err(LineError::EmptyCodepoint);
    }

    let list = fields[1].trim();
    if list.is_empty() {
        return Err(LineError::NoComponents);
    }

    let mut components = Vec::new();
    for (pos, raw) in list.split(',').enumerate() {
        let id = normalize(raw);
        if id.is_empty() {
            return Err(LineError::EmptyComponent(pos));
        }
        components.push(id);
    }

    Ok((codepoint, components))
}

/// Decode a hexadecimal codepoint key into the text it stands for.
pub fn decode_codepoint(codepoint: &str) -> Option<String> {
    let codepoint = codepoint.trim();
    if codepoint.is_empty() || !codepoint.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let value = u32::from_str_radix(codepoint, 16).ok()?;
    char::from_u32(value).map(String::from)
}

/// One resolvable character.
#[derive(Debug, Clone)]
pub struct DictionaryEntry {
    pub codepoint: String,
    /// Component ids in source order.
    pub components: Vec<String>,
    bag: GraphemeBag,
}

impl DictionaryEntry {
    pub fn new<C: Into<String>>(codepoint: C, components: Vec<String>) -> Self {
        let bag = components.iter().cloned().collect();
        Self {
            codepoint: codepoint.into(),
            components,
            bag,
        }
    }

    /// Components as a multiset.
    pub fn bag(&self) -> &GraphemeBag {
        &self.bag
    }

    /// The character this entry spells, if the key is a valid scalar value.
    pub fn text(&self) -> Option<String> {
        decode_codepoint(&self.codepoint)
    }
}

/// Counters gathered while loading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub lines: usize,
    pub entries: usize,
    pub skipped: usize,
    pub replaced: usize,
}

/// Diagnostics produced by `Dictionary::validate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Codepoints sharing one multiset, in insertion order. `resolve` returns
    /// the first of each group.
    pub ambiguous: Vec<Vec<String>>,
    /// Keys that do not decode to a Unicode scalar value.
    pub invalid_codepoints: Vec<String>,
    /// Referenced ids with no backing image.
    pub missing_glyphs: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.ambiguous.is_empty()
            && self.invalid_codepoints.is_empty()
            && self.missing_glyphs.is_empty()
    }
}

/// Immutable codepoint -> components table.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: Vec<DictionaryEntry>,
    index: AHashMap<String, usize>,
    stats: LoadStats,
}

impl Dictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dictionary from source lines.
    ///
    /// Malformed lines are logged and skipped; blank lines are ignored. A
    /// codepoint seen again replaces the earlier components in place.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dict = Self::new();

        for (n, line) in lines.into_iter().enumerate() {
            let line = line.as_ref().trim_start_matches('\u{feff}').trim();
            if line.is_empty() {
                continue;
            }
            dict.stats.lines += 1;

            let (codepoint, components) = match parse_line(line) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(line = n + 1, error = %e, "skipping malformed dictionary line");
                    dict.stats.skipped += 1;
                    continue;
                }
            };

            match dict.index.get(&codepoint) {
                Some(&slot) => {
                    warn!(line = n + 1, codepoint = %codepoint, "duplicate codepoint replaces earlier entry");
                    dict.entries[slot] = DictionaryEntry::new(codepoint, components);
                    dict.stats.replaced += 1;
                }
                None => {
                    dict.index.insert(codepoint.clone(), dict.entries.len());
                    dict.entries.push(DictionaryEntry::new(codepoint, components));
                }
            }
        }

        dict.stats.entries = dict.entries.len();
        for group in dict.ambiguous_groups() {
            warn!(codepoints = ?group, "ambiguous grapheme multiset; first entry wins");
        }
        debug!(stats = ?dict.stats, "dictionary built");
        dict
    }

    /// Load a dictionary file.
    ///
    /// A file that cannot be read in full yields an empty dictionary, never a
    /// partial one.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let dict = Self::from_lines(content.lines());
                info!(
                    path = %path.display(),
                    entries = dict.len(),
                    skipped = dict.stats.skipped,
                    "loaded dictionary"
                );
                dict
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "dictionary not loaded; using empty dictionary");
                Self::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> LoadStats {
        self.stats
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[DictionaryEntry] {
        &self.entries
    }

    pub fn entry(&self, codepoint: &str) -> Option<&DictionaryEntry> {
        self.index.get(codepoint).map(|&i| &self.entries[i])
    }

    /// Component multiset of a codepoint.
    pub fn components_of(&self, codepoint: &str) -> Option<&GraphemeBag> {
        self.entry(codepoint).map(DictionaryEntry::bag)
    }

    /// Graphemes that may legally be added to `selection`.
    ///
    /// With an empty selection this is every id with a backing image. Otherwise
    /// it is the union, over entries whose components contain `selection` as a
    /// sub-multiset, of the components still left over after removing
    /// `selection`, restricted to ids with a backing image.
    pub fn next_candidates<S, G>(&self, selection: &[S], glyphs: &G) -> Vec<String>
    where
        S: AsRef<str>,
        G: GlyphIndex + ?Sized,
    {
        if selection.is_empty() {
            return glyphs.glyph_ids();
        }

        let wanted: GraphemeBag = selection.iter().map(|s| s.as_ref()).collect();
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut out = Vec::new();

        for entry in self.entries.iter().filter(|e| e.bag.contains(&wanted)) {
            let left = entry.bag.difference(&wanted);
            for id in entry.bag.ids().filter(|id| left.count(id) > 0) {
                if seen.insert(id) && glyphs.has_glyph(id) {
                    out.push(id.to_string());
                }
            }
        }

        sort_grapheme_ids(&mut out);
        out
    }

    /// Entry whose components equal `selection` as a multiset.
    ///
    /// When several entries share the multiset the first by insertion order is
    /// returned.
    pub fn find_exact<S: AsRef<str>>(&self, selection: &[S]) -> Option<&DictionaryEntry> {
        if selection.is_empty() {
            return None;
        }
        let wanted: GraphemeBag = selection.iter().map(|s| s.as_ref()).collect();
        self.entries
            .iter()
            .filter(|e| e.components.len() == selection.len())
            .find(|e| e.bag == wanted)
    }

    /// Character spelled by `selection`, or `None`.
    pub fn resolve<S: AsRef<str>>(&self, selection: &[S]) -> Option<String> {
        let entry = self.find_exact(selection)?;
        let text = entry.text();
        if text.is_none() {
            warn!(codepoint = %entry.codepoint, "matched entry has an undecodable codepoint");
        }
        text
    }

    /// Codepoint groups whose multisets are identical, in insertion order.
    pub fn ambiguous_groups(&self) -> Vec<Vec<String>> {
        let mut by_bag: AHashMap<Vec<(String, usize)>, usize> = AHashMap::new();
        let mut groups: Vec<Vec<String>> = Vec::new();

        for entry in &self.entries {
            let key = entry.bag.canonical();
            match by_bag.get(&key) {
                Some(&g) => groups[g].push(entry.codepoint.clone()),
                None => {
                    by_bag.insert(key, groups.len());
                    groups.push(vec![entry.codepoint.clone()]);
                }
            }
        }

        groups.retain(|g| g.len() > 1);
        groups
    }

    /// Run all load-time checks against the dictionary and a grapheme store.
    pub fn validate<G: GlyphIndex + ?Sized>(&self, glyphs: &G) -> ValidationReport {
        let invalid_codepoints = self
            .entries
            .iter()
            .filter(|e| e.text().is_none())
            .map(|e| e.codepoint.clone())
            .collect();

        let referenced: BTreeSet<&str> = self
            .entries
            .iter()
            .flat_map(|e| e.components.iter().map(String::as_str))
            .collect();
        let mut missing_glyphs: Vec<String> = referenced
            .into_iter()
            .filter(|id| !glyphs.has_glyph(id))
            .map(str::to_string)
            .collect();
        sort_grapheme_ids(&mut missing_glyphs);

        ValidationReport {
            ambiguous: self.ambiguous_groups(),
            invalid_codepoints,
            missing_glyphs,
        }
    }
}
