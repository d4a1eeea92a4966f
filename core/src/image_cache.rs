//! Decoded grapheme image cache.
//!
//! Bounded LRU keyed by grapheme id. A miss resolves the id through the
//! `GlyphStore`, decodes the PNG and inserts it; a missing, empty or corrupt
//! file is reported as `None`. Images are handed out as `Arc`, so eviction or
//! `clear()` only drops the cache's own reference.
//!
//! All state sits behind one mutex. Decoding happens outside the lock; two
//! threads missing the same id may both decode it, and the later insert wins.

use std::fs;
use std::io::Cursor;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use lru::LruCache;
use thiserror::Error;
use tracing::{debug, warn};

use crate::glyph_store::{GlyphIndex, GlyphStore};

/// Capacity used when a zero capacity is configured.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Failure to turn file bytes into a `GlyphImage`.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("png decode failed: {0}")]
    Png(#[from] png::DecodingError),
    #[error("unsupported pixel layout {0:?}")]
    Unsupported(png::ColorType),
}

/// A decoded glyph as straight RGBA8 pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl GlyphImage {
    /// Decode PNG bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut decoder = png::Decoder::new(Cursor::new(bytes));
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder.read_info()?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let frame = reader.next_frame(&mut buf)?;
        buf.truncate(frame.buffer_size());

        let pixels = match frame.color_type {
            png::ColorType::Rgba => buf,
            png::ColorType::Rgb => buf
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 0xff])
                .collect(),
            png::ColorType::GrayscaleAlpha => buf
                .chunks_exact(2)
                .flat_map(|p| [p[0], p[0], p[0], p[1]])
                .collect(),
            png::ColorType::Grayscale => buf.iter().flat_map(|&g| [g, g, g, 0xff]).collect(),
            other => return Err(DecodeError::Unsupported(other)),
        };

        Ok(Self {
            width: frame.width,
            height: frame.height,
            pixels,
        })
    }

    /// Read and decode a PNG file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DecodeError> {
        let bytes = fs::read(path)?;
        Self::decode(&bytes)
    }
}

struct CacheState {
    lru: LruCache<String, Arc<GlyphImage>>,
    hits: usize,
    misses: usize,
}

/// Process-wide glyph cache; share it as `Arc<ImageCache>`.
pub struct ImageCache {
    store: GlyphStore,
    state: Mutex<CacheState>,
}

impl ImageCache {
    /// Cache over `store` holding at most `capacity` images (0 means the
    /// default capacity).
    pub fn new(store: GlyphStore, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            state: Mutex::new(CacheState {
                lru: LruCache::new(capacity),
                hits: 0,
                misses: 0,
            }),
        }
    }

    pub fn store(&self) -> &GlyphStore {
        &self.store
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // A panic while holding the lock cannot leave the LRU inconsistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Image for `id`, decoding on a miss. `None` if the file is absent,
    /// empty or not decodable.
    pub fn get(&self, id: &str) -> Option<Arc<GlyphImage>> {
        {
            let mut state = self.lock();
            if let Some(image) = state.lru.get(id).cloned() {
                state.hits += 1;
                return Some(image);
            }
            state.misses += 1;
        }

        let path = self.store.glyph_path(id)?;
        let image = match GlyphImage::open(&path) {
            Ok(image) => Arc::new(image),
            Err(e) => {
                warn!(id, path = %path.display(), error = %e, "cannot decode grapheme image");
                return None;
            }
        };
        debug!(id, width = image.width, height = image.height, "decoded grapheme image");

        self.lock().lru.put(id.to_string(), Arc::clone(&image));
        Some(image)
    }

    /// Whether `id` is cached, without touching recency.
    pub fn contains(&self, id: &str) -> bool {
        self.lock().lru.contains(id)
    }

    /// Drop every cached image.
    pub fn clear(&self) {
        self.lock().lru.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().lru.cap().get()
    }

    /// `(hits, misses)` since creation.
    pub fn stats(&self) -> (usize, usize) {
        let state = self.lock();
        (state.hits, state.misses)
    }

    /// Hit rate in percent, `None` before the first lookup.
    pub fn hit_rate(&self) -> Option<f64> {
        let (hits, misses) = self.stats();
        let total = hits + misses;
        (total > 0).then(|| hits as f64 / total as f64 * 100.0)
    }
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCache")
            .field("store", &self.store)
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(width: u32, height: u32, color: png::ColorType, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut enc = png::Encoder::new(&mut out, width, height);
            enc.set_color(color);
            enc.set_depth(png::BitDepth::Eight);
            let mut writer = enc.write_header().unwrap();
            writer.write_image_data(data).unwrap();
        }
        out
    }

    #[test]
    fn rgba_passes_through() {
        let bytes = encode(1, 2, png::ColorType::Rgba, &[1, 2, 3, 4, 5, 6, 7, 8]);
        let img = GlyphImage::decode(&bytes).unwrap();
        assert_eq!((img.width, img.height), (1, 2));
        assert_eq!(img.pixels, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn grayscale_is_widened() {
        let bytes = encode(2, 1, png::ColorType::Grayscale, &[10, 200]);
        let img = GlyphImage::decode(&bytes).unwrap();
        assert_eq!(img.pixels, vec![10, 10, 10, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn rgb_gains_opaque_alpha() {
        let bytes = encode(1, 1, png::ColorType::Rgb, &[9, 8, 7]);
        let img = GlyphImage::decode(&bytes).unwrap();
        assert_eq!(img.pixels, vec![9, 8, 7, 255]);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(GlyphImage::decode(b"definitely not a png").is_err());
    }
}
