//! Asset materialization.
//!
//! Copies the read-only bundle (dictionary, grapheme images) into the
//! writable data directory the dictionary and image cache read from. Copies
//! are skip-if-present: a destination file that exists with non-zero length
//! is never overwritten, so running twice is a cheap no-op.
//!
//! Per-file failures are logged and counted; siblings are still copied.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Kind of a node in an asset tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Dir,
    File,
}

/// A child entry returned by `AssetSource::list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetNode {
    pub name: String,
    pub kind: AssetKind,
}

/// Read-only hierarchical byte tree.
///
/// Paths are `/`-separated and relative to the bundle root; `""` is the root.
pub trait AssetSource {
    /// Children of the directory at `path`.
    fn list(&self, path: &str) -> io::Result<Vec<AssetNode>>;

    /// Open the file at `path` for reading.
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + '_>>;
}

/// Asset bundle backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct DirAssets {
    root: PathBuf,
}

impl DirAssets {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }
}

impl AssetSource for DirAssets {
    fn list(&self, path: &str) -> io::Result<Vec<AssetNode>> {
        let mut nodes = Vec::new();
        for entry in fs::read_dir(self.resolve(path))? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!(path = %entry.path().display(), "skipping non UTF-8 asset name");
                continue;
            };
            let kind = if entry.file_type()?.is_dir() {
                AssetKind::Dir
            } else {
                AssetKind::File
            };
            nodes.push(AssetNode { name, kind });
        }
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(nodes)
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(File::open(self.resolve(path))?))
    }
}

/// Outcome of a materialization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaterializeReport {
    pub dirs_created: usize,
    pub files_copied: usize,
    pub files_skipped: usize,
    /// `(asset path, error)` for each file or directory that failed.
    pub failures: Vec<(String, String)>,
    /// Set when the glyph fast path found an initialized store.
    pub already_initialized: bool,
}

impl MaterializeReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Mirrors an `AssetSource` under a destination root.
#[derive(Debug, Clone)]
pub struct Materializer {
    destination: PathBuf,
}

impl Materializer {
    pub fn new<P: Into<PathBuf>>(destination: P) -> Self {
        Self {
            destination: destination.into(),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Copy every file of `source` that is absent or empty at the destination.
    pub fn materialize<S: AssetSource + ?Sized>(&self, source: &S) -> MaterializeReport {
        let mut report = MaterializeReport::default();
        self.ensure_dir(&self.destination, "", &mut report);
        if report.is_complete() {
            self.walk(source, "", &mut report);
        }
        info!(
            destination = %self.destination.display(),
            copied = report.files_copied,
            skipped = report.files_skipped,
            failed = report.failures.len(),
            "materialized assets"
        );
        report
    }

    /// Like `materialize`, but skip the whole pass when the glyph directory
    /// `glyph_dir` (relative to the destination) already holds any entry.
    pub fn materialize_glyphs<S: AssetSource + ?Sized>(
        &self,
        source: &S,
        glyph_dir: &str,
    ) -> MaterializeReport {
        let glyphs = self.destination.join(glyph_dir);
        let initialized = fs::read_dir(&glyphs)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        if initialized {
            debug!(path = %glyphs.display(), "grapheme store already initialized; skipping copy");
            return MaterializeReport {
                already_initialized: true,
                ..MaterializeReport::default()
            };
        }
        self.materialize(source)
    }

    fn walk<S: AssetSource + ?Sized>(&self, source: &S, path: &str, report: &mut MaterializeReport) {
        let nodes = match source.list(path) {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!(asset = path, error = %e, "cannot list asset directory");
                report.failures.push((path.to_string(), e.to_string()));
                return;
            }
        };

        for node in nodes {
            let child = if path.is_empty() {
                node.name.clone()
            } else {
                format!("{}/{}", path, node.name)
            };
            let target = self.target_for(&child);

            match node.kind {
                AssetKind::Dir => {
                    if self.ensure_dir(&target, &child, report) {
                        self.walk(source, &child, report);
                    }
                }
                AssetKind::File => self.copy_file(source, &child, &target, report),
            }
        }
    }

    fn target_for(&self, asset: &str) -> PathBuf {
        asset
            .split('/')
            .fold(self.destination.clone(), |acc, part| acc.join(part))
    }

    fn ensure_dir(&self, target: &Path, asset: &str, report: &mut MaterializeReport) -> bool {
        if target.is_dir() {
            return true;
        }
        match fs::create_dir_all(target) {
            Ok(()) => {
                debug!(path = %target.display(), "created directory");
                report.dirs_created += 1;
                true
            }
            Err(e) => {
                warn!(path = %target.display(), error = %e, "cannot create directory");
                report.failures.push((asset.to_string(), e.to_string()));
                false
            }
        }
    }

    fn copy_file<S: AssetSource + ?Sized>(
        &self,
        source: &S,
        asset: &str,
        target: &Path,
        report: &mut MaterializeReport,
    ) {
        if fs::metadata(target).map(|m| m.len() > 0).unwrap_or(false) {
            report.files_skipped += 1;
            return;
        }

        match copy_atomically(source, asset, target) {
            Ok(bytes) => {
                debug!(asset, bytes, "copied asset");
                report.files_copied += 1;
            }
            Err(e) => {
                warn!(asset, error = %e, "failed to copy asset; skipping");
                report.failures.push((asset.to_string(), e.to_string()));
            }
        }
    }
}

/// Copy into a temporary sibling and rename, so a failed copy never leaves a
/// truncated file that later runs would mistake for a finished one.
fn copy_atomically<S: AssetSource + ?Sized>(source: &S, asset: &str, target: &Path) -> io::Result<u64> {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let mut reader = source.open(asset)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    let bytes = io::copy(&mut reader, &mut tmp)?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(bytes)
}
