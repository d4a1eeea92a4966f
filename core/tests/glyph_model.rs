// core/tests/glyph_model.rs
//
// GlyphModel wiring: bundle -> data dir -> dictionary + store + cache.

use std::fs;

use libhieroglyph_core::{Config, Confirmation, GlyphModel};
use tempfile::TempDir;

fn png_bytes() -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut enc = png::Encoder::new(&mut out, 1, 1);
        enc.set_color(png::ColorType::Rgba);
        enc.set_depth(png::BitDepth::Eight);
        let mut writer = enc.write_header().expect("header");
        writer.write_image_data(&[0, 0, 0, 255]).expect("data");
    }
    out
}

fn bundle() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    fs::write(
        dir.path().join("hieroglyphs.txt"),
        "4e00:1,2\n4e8c:1,1\nbroken line\n4e09:1,1,1\n",
    )
    .unwrap();
    fs::create_dir_all(dir.path().join("graphemes")).unwrap();
    for id in ["1", "2"] {
        fs::write(dir.path().join(format!("graphemes/{}.png", id)), png_bytes()).unwrap();
    }
    dir
}

#[test]
fn test_open_materializes_and_composes() {
    let assets = bundle();
    let data = TempDir::new().unwrap();
    let mut cfg = Config::with_data_dir(data.path().join("DictionaryData"));
    cfg.asset_dir = Some(assets.path().to_path_buf());

    let model = GlyphModel::open(&cfg);
    assert_eq!(model.dictionary.len(), 3);
    assert_eq!(model.dictionary.stats().skipped, 1);
    assert!(cfg.graphemes_path().join("1.png").exists());

    let mut session = model.session();
    assert_eq!(session.candidates(), ["1", "2"]);
    assert_eq!(session.candidate_images().len(), 2);

    session.append("1").unwrap();
    session.append("1").unwrap();
    assert_eq!(session.candidates(), ["1"]);
    assert_eq!(session.selection_images().len(), 2);
    session.append("1").unwrap();
    assert_eq!(session.confirm(), Confirmation::Resolved("三".to_string()));

    session.append("2").unwrap();
    session.append("1").unwrap();
    assert_eq!(session.confirm(), Confirmation::Resolved("一".to_string()));
    assert_eq!(session.committed_text(), "三 一");

    assert!(!model.images.is_empty());
    model.release_images();
    assert!(model.images.is_empty());
}

#[test]
fn test_open_without_data_is_empty_but_usable() {
    let data = TempDir::new().unwrap();
    let model = GlyphModel::open(&Config::with_data_dir(data.path()));
    assert!(model.dictionary.is_empty());

    let mut session = model.session();
    assert!(session.candidates().is_empty());
    assert_eq!(session.confirm(), Confirmation::NothingSelected);
}
