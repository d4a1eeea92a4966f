//! libhieroglyph-core
//!
//! Grapheme composition engine: build a logographic character by tapping the
//! visual sub-components ("graphemes") it is made of, radical-IME style.
//!
//! Public API:
//! - `Dictionary` - codepoint -> grapheme multiset table with the two
//!   composition queries (`next_candidates`, `resolve`)
//! - `GraphemeBag` - multiset used for containment and equality
//! - `GlyphStore` / `GlyphIndex` - which graphemes have a backing image
//! - `Materializer` - one-time copy of the bundled assets into the data dir
//! - `ImageCache` - bounded LRU of decoded grapheme images
//! - `CompositionSession` - the user's in-progress selection
//! - `GlyphModel` - composition root wiring the above from a `Config`
//! - `Config` - configuration (TOML)
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

pub mod bag;
pub use bag::GraphemeBag;

pub mod dictionary;
pub use dictionary::{Dictionary, DictionaryEntry, LineError, LoadStats, ValidationReport};

pub mod glyph_store;
pub use glyph_store::{GlyphFile, GlyphIndex, GlyphStore};

pub mod assets;
pub use assets::{AssetKind, AssetNode, AssetSource, DirAssets, MaterializeReport, Materializer};

pub mod image_cache;
pub use image_cache::{DecodeError, GlyphImage, ImageCache};

pub mod context;
pub use context::CompositionContext;

pub mod session;
pub use session::{CompositionSession, Confirmation, SessionError, SessionState};

/// Configuration for the data layout and runtime limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Writable directory holding the materialized dictionary and images.
    pub data_dir: PathBuf,

    /// Read-only asset bundle copied into `data_dir` on first run.
    /// `None` means the data directory is managed externally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_dir: Option<PathBuf>,

    /// Dictionary file name inside `data_dir`.
    pub dictionary_file: String,

    /// Grapheme image directory name inside `data_dir`.
    pub graphemes_dir: String,

    /// File extension of grapheme images.
    pub glyph_extension: String,

    // Cache Management
    /// Maximum number of decoded images kept in memory (0 = default).
    pub image_cache_capacity: usize,

    /// Text inserted between consecutively committed characters.
    pub commit_separator: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("DictionaryData"),
            asset_dir: None,
            dictionary_file: "hieroglyphs.txt".to_string(),
            graphemes_dir: "graphemes".to_string(),
            glyph_extension: "png".to_string(),
            image_cache_capacity: image_cache::DEFAULT_CAPACITY,
            commit_separator: " ".to_string(),
        }
    }
}

impl Config {
    /// Default layout rooted at `data_dir`.
    pub fn with_data_dir<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn dictionary_path(&self) -> PathBuf {
        self.data_dir.join(&self.dictionary_file)
    }

    pub fn graphemes_path(&self) -> PathBuf {
        self.data_dir.join(&self.graphemes_dir)
    }

    pub fn glyph_store(&self) -> GlyphStore {
        GlyphStore::with_extension(self.graphemes_path(), self.glyph_extension.clone())
    }
}

/// Utility helpers.
pub mod utils {
    use std::cmp::Ordering;

    /// Normalize input strings (NFC) and trim whitespace.
    pub fn normalize(s: &str) -> String {
        use unicode_normalization::UnicodeNormalization;
        s.nfc().collect::<String>().trim().to_string()
    }

    /// Display order for grapheme ids: integers ascending, then everything
    /// else lexicographically.
    pub fn grapheme_order(a: &str, b: &str) -> Ordering {
        match (a.parse::<u64>(), b.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => a.cmp(b),
        }
    }

    /// Sort and deduplicate ids in display order.
    pub fn sort_grapheme_ids(ids: &mut Vec<String>) {
        ids.sort_by(|a, b| grapheme_order(a, b));
        ids.dedup();
    }
}

/// Dictionary, grapheme store and image cache wired from a `Config`.
///
/// The dictionary is loaded once and shared read-only; the image cache is
/// shared by every session handed out.
#[derive(Debug, Clone)]
pub struct GlyphModel {
    pub dictionary: Arc<Dictionary>,
    pub glyphs: GlyphStore,
    pub images: Arc<ImageCache>,
    pub config: Config,
}

impl GlyphModel {
    /// Materialize assets (if configured), load the dictionary and log any
    /// validation findings. Never fails; missing data yields an empty model.
    pub fn open(config: &Config) -> Self {
        if let Some(report) = Self::materialize(config) {
            for (asset, error) in &report.failures {
                warn!(asset = %asset, error = %error, "asset not materialized");
            }
        }

        let dictionary = Dictionary::load_file(config.dictionary_path());
        let glyphs = config.glyph_store();
        Self::from_parts(dictionary, glyphs, config.clone())
    }

    /// Build a model from an already loaded dictionary.
    pub fn from_parts(dictionary: Dictionary, glyphs: GlyphStore, config: Config) -> Self {
        let report = dictionary.validate(&glyphs);
        if !report.missing_glyphs.is_empty() {
            warn!(
                count = report.missing_glyphs.len(),
                ids = ?report.missing_glyphs,
                "dictionary references graphemes without images"
            );
        }
        if !report.invalid_codepoints.is_empty() {
            warn!(codepoints = ?report.invalid_codepoints, "undecodable codepoints in dictionary");
        }
        info!(entries = dictionary.len(), "glyph model ready");

        let images = Arc::new(ImageCache::new(glyphs.clone(), config.image_cache_capacity));
        Self {
            dictionary: Arc::new(dictionary),
            glyphs,
            images,
            config,
        }
    }

    /// Run the glyph fast-path materialization when `asset_dir` is set.
    pub fn materialize(config: &Config) -> Option<MaterializeReport> {
        let source = DirAssets::new(config.asset_dir.as_ref()?);
        let materializer = Materializer::new(&config.data_dir);
        Some(materializer.materialize_glyphs(&source, &config.graphemes_dir))
    }

    /// A fresh, empty composition session over this model.
    pub fn session(&self) -> CompositionSession<GlyphStore> {
        CompositionSession::new(Arc::clone(&self.dictionary), self.glyphs.clone())
            .with_images(Arc::clone(&self.images))
            .with_separator(self.config.commit_separator.clone())
    }

    /// Release every cached image; call when the consuming view goes away.
    pub fn release_images(&self) {
        self.images.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::utils::*;
    use super::*;

    #[test]
    fn config_toml_roundtrip() {
        let mut cfg = Config::with_data_dir("/tmp/hieroglyph");
        cfg.image_cache_capacity = 42;
        let text = cfg.to_toml_string().unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), cfg);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let cfg = Config::from_toml_str("data_dir = \"/srv/glyphs\"\n").unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/srv/glyphs"));
        assert_eq!(cfg.dictionary_file, "hieroglyphs.txt");
        assert_eq!(cfg.image_cache_capacity, 1000);
        assert_eq!(cfg.graphemes_path(), PathBuf::from("/srv/glyphs/graphemes"));
    }

    #[test]
    fn numeric_ids_sort_before_names() {
        let mut ids: Vec<String> = ["b", "10", "2", "a", "2", "1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        sort_grapheme_ids(&mut ids);
        assert_eq!(ids, vec!["1", "2", "10", "a", "b"]);
    }

    #[test]
    fn normalize_trims() {
        assert_eq!(normalize("  12 \t"), "12");
    }
}
