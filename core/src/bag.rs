//! Grapheme multiset.
//!
//! Dictionary entries list their components in source order, but two
//! selections spell the same character whenever they hold the same ids with
//! the same multiplicities. `GraphemeBag` stores `id -> count` so containment
//! and equality are a single pass over the smaller side instead of repeated
//! list scans.

use ahash::AHashMap;

/// Order-insensitive, multiplicity-sensitive collection of grapheme ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphemeBag {
    counts: AHashMap<String, usize>,
    len: usize,
}

impl GraphemeBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one occurrence of `id`.
    pub fn insert<S: Into<String>>(&mut self, id: S) {
        *self.counts.entry(id.into()).or_insert(0) += 1;
        self.len += 1;
    }

    /// Number of occurrences of `id`.
    pub fn count(&self, id: &str) -> usize {
        self.counts.get(id).copied().unwrap_or(0)
    }

    /// Total number of occurrences (not distinct ids).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct ids.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// True when every id of `other` occurs here at least as often.
    pub fn contains(&self, other: &GraphemeBag) -> bool {
        if other.len > self.len {
            return false;
        }
        other
            .counts
            .iter()
            .all(|(id, &needed)| self.count(id) >= needed)
    }

    /// Occurrences left after removing `other` (saturating per id).
    pub fn difference(&self, other: &GraphemeBag) -> GraphemeBag {
        let mut out = GraphemeBag::new();
        for (id, &have) in self.counts.iter() {
            let left = have.saturating_sub(other.count(id));
            if left > 0 {
                out.counts.insert(id.clone(), left);
                out.len += left;
            }
        }
        out
    }

    /// Distinct ids with a non-zero count, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    /// `(id, count)` pairs sorted by id; equal bags yield equal keys.
    pub fn canonical(&self) -> Vec<(String, usize)> {
        let mut pairs: Vec<(String, usize)> =
            self.counts.iter().map(|(k, &v)| (k.clone(), v)).collect();
        pairs.sort();
        pairs
    }
}

impl<S: Into<String>> FromIterator<S> for GraphemeBag {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut bag = GraphemeBag::new();
        for id in iter {
            bag.insert(id);
        }
        bag
    }
}
