// core/tests/materialize.rs
//
// Asset bundle materialization into the writable data directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use libhieroglyph_core::{DirAssets, Materializer};
use tempfile::TempDir;

fn bundle() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("hieroglyphs.txt"), "4e00:1,2\n").unwrap();
    fs::write(dir.path().join("dictionary.json"), "{}").unwrap();
    fs::create_dir_all(dir.path().join("graphemes/extra")).unwrap();
    fs::write(dir.path().join("graphemes/1.png"), b"one").unwrap();
    fs::write(dir.path().join("graphemes/2.png"), b"two").unwrap();
    fs::write(dir.path().join("graphemes/extra/3.png"), b"three").unwrap();
    dir
}

/// Relative path -> file bytes for every file below `root`.
fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<String, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
                out.insert(rel, fs::read(&path).unwrap());
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

#[test]
fn test_mirrors_the_whole_tree() {
    let src = bundle();
    let dest = TempDir::new().unwrap();
    let target = dest.path().join("DictionaryData");

    let report = Materializer::new(&target).materialize(&DirAssets::new(src.path()));
    assert!(report.is_complete());
    assert_eq!(report.files_copied, 5);
    assert_eq!(snapshot(&target), snapshot(src.path()));
}

#[test]
fn test_second_run_is_a_no_op() {
    let src = bundle();
    let dest = TempDir::new().unwrap();
    let materializer = Materializer::new(dest.path());
    let assets = DirAssets::new(src.path());

    materializer.materialize(&assets);
    let first = snapshot(dest.path());

    let report = materializer.materialize(&assets);
    assert_eq!(report.files_copied, 0);
    assert_eq!(report.files_skipped, 5);
    assert_eq!(report.dirs_created, 0);
    assert_eq!(snapshot(dest.path()), first);
}

#[test]
fn test_glyph_fast_path_skips_initialized_store() {
    let src = bundle();
    let dest = TempDir::new().unwrap();
    fs::create_dir_all(dest.path().join("graphemes")).unwrap();
    fs::write(dest.path().join("graphemes/9.png"), b"nine").unwrap();

    let report = Materializer::new(dest.path()).materialize_glyphs(&DirAssets::new(src.path()), "graphemes");
    assert!(report.already_initialized);
    assert_eq!(report.files_copied, 0);
    assert!(!dest.path().join("hieroglyphs.txt").exists());
}

#[test]
fn test_glyph_fast_path_copies_into_empty_store() {
    let src = bundle();
    let dest = TempDir::new().unwrap();
    fs::create_dir_all(dest.path().join("graphemes")).unwrap();

    let report = Materializer::new(dest.path()).materialize_glyphs(&DirAssets::new(src.path()), "graphemes");
    assert!(!report.already_initialized);
    assert_eq!(report.files_copied, 5);
    assert_eq!(fs::read(dest.path().join("graphemes/1.png")).unwrap(), b"one");
}
