// core/tests/composition_scenarios.rs
//
// End-to-end composition behaviour over a real grapheme store on disk.
//
// Tests cover:
// - Candidate narrowing and exact resolution (order-insensitive)
// - Repeated graphemes (multiset, not set, semantics)
// - Graphemes referenced by the dictionary but lacking an image
// - Removal replay matching a session built without the removed id
// - Dictionary load round-trip of component multisets

use std::fs;
use std::sync::Arc;

use libhieroglyph_core::{
    CompositionSession, Confirmation, Dictionary, GlyphStore, GraphemeBag, SessionState,
};
use tempfile::TempDir;

fn store_with(ids: &[&str]) -> (TempDir, GlyphStore) {
    let dir = TempDir::new().expect("tempdir");
    for id in ids {
        fs::write(dir.path().join(format!("{}.png", id)), b"glyph").expect("write glyph");
    }
    let store = GlyphStore::new(dir.path());
    (dir, store)
}

fn session(lines: &[&str], store: &GlyphStore) -> CompositionSession<GlyphStore> {
    let dict = Dictionary::from_lines(lines.iter().copied());
    CompositionSession::new(Arc::new(dict), store.clone())
}

#[test]
fn test_scenario_single_character() {
    let (_dir, store) = store_with(&["1", "2"]);
    let dict = Dictionary::from_lines(["4e00:1,2"]);

    let none: [&str; 0] = [];
    assert_eq!(dict.next_candidates(&none, &store), vec!["1", "2"]);
    assert_eq!(dict.next_candidates(&["1"], &store), vec!["2"]);
    assert_eq!(dict.resolve(&["1", "2"]).as_deref(), Some("一"));
}

#[test]
fn test_scenario_order_independent_match() {
    let dict = Dictionary::from_lines(["4e00:1,2"]);
    assert_eq!(dict.resolve(&["2", "1"]).as_deref(), Some("一"));
}

#[test]
fn test_scenario_repeated_grapheme() {
    let (_dir, store) = store_with(&["1"]);
    let dict = Dictionary::from_lines(["4e8c:1,1"]);

    assert_eq!(dict.next_candidates(&["1"], &store), vec!["1"]);
    assert!(dict.next_candidates(&["1", "1"], &store).is_empty());
    assert_eq!(dict.resolve(&["1", "1"]).as_deref(), Some("二"));

    let mut s = session(&["4e8c:1,1"], &store);
    s.append("1").unwrap();
    s.append("1").unwrap();
    assert!(s.candidates().is_empty());
    assert!(s.append("1").is_err());
}

#[test]
fn test_scenario_grapheme_without_image_is_never_offered() {
    let (_dir, store) = store_with(&["1", "2"]);
    let dict = Dictionary::from_lines(["4e00:1,2,3", "4e01:3,1"]);

    let none: [&str; 0] = [];
    for selection in [&none[..], &["1"][..], &["1", "2"][..], &["2"][..]] {
        let candidates = dict.next_candidates(selection, &store);
        assert!(
            !candidates.iter().any(|c| c == "3"),
            "3 offered for {:?}",
            selection
        );
    }
}

#[test]
fn test_scenario_no_match_leaves_selection() {
    let (_dir, store) = store_with(&["1", "2", "3"]);
    let mut s = session(&["4e00:1,2", "4e01:1,2,3"], &store);
    s.append("1").unwrap();
    s.append("3").unwrap();

    assert_eq!(s.confirm(), Confirmation::NotFound);
    assert_eq!(s.selection(), ["1", "3"]);
    assert_eq!(s.state(), SessionState::Partial);
}

#[test]
fn test_scenario_remove_middle_replays() {
    let (_dir, store) = store_with(&["1", "2", "3"]);
    let lines = ["4e00:1,2,3", "4e01:1,3", "4e02:2,3"];

    let mut edited = session(&lines, &store);
    edited.append("1").unwrap();
    edited.append("2").unwrap();
    edited.append("3").unwrap();
    assert_eq!(edited.remove_at(1).unwrap(), "2");

    let mut direct = session(&lines, &store);
    direct.append("1").unwrap();
    direct.append("3").unwrap();

    assert_eq!(edited.selection(), direct.selection());
    assert_eq!(edited.candidates(), direct.candidates());
    assert_eq!(edited.confirm(), Confirmation::Resolved("丁".to_string()));
}

#[test]
fn test_replay_matches_fresh_build_for_every_position() {
    let (_dir, store) = store_with(&["1", "2", "3", "4"]);
    let lines = ["4e00:1,2,3,4", "4e01:1,1,2", "4e02:2,3", "4e03:1,2,4,4"];
    let order = ["1", "2", "4"];

    for pos in 0..order.len() {
        let mut edited = session(&lines, &store);
        for id in order {
            edited.append(id).unwrap();
        }
        edited.remove_at(pos).unwrap();

        let mut fresh = session(&lines, &store);
        for (i, id) in order.iter().enumerate() {
            if i != pos {
                fresh.append(id).unwrap();
            }
        }

        assert_eq!(edited.selection(), fresh.selection(), "pos {}", pos);
        assert_eq!(edited.candidates(), fresh.candidates(), "pos {}", pos);
    }
}

#[test]
fn test_replay_drops_grapheme_whose_image_was_deleted() {
    let (dir, store) = store_with(&["1", "2", "3"]);
    let mut s = session(&["4e00:1,2,3"], &store);
    s.append("1").unwrap();
    s.append("2").unwrap();
    s.append("3").unwrap();

    fs::write(dir.path().join("1.png"), b"").unwrap();
    s.remove_at(1).unwrap();
    assert_eq!(s.selection(), ["3"]);
    assert!(!s.candidates().iter().any(|c| c == "1"));
}

#[test]
fn test_candidates_never_overcount() {
    let (_dir, store) = store_with(&["1", "2"]);
    let dict = Dictionary::from_lines(["4e00:1,2", "4e01:1,1,2"]);

    // Only 4e01 still has a spare "1" once two are selected.
    assert_eq!(dict.next_candidates(&["1", "1"], &store), vec!["2"]);
    assert_eq!(dict.next_candidates(&["1", "2"], &store), vec!["1"]);
    assert!(dict.next_candidates(&["1", "1", "1"], &store).is_empty());
}

#[test]
fn test_resolve_rejects_subsets_and_supersets() {
    let dict = Dictionary::from_lines(["4e00:1,2,3"]);
    assert_eq!(dict.resolve(&["1", "2"]), None);
    assert_eq!(dict.resolve(&["1", "2", "3", "3"]), None);
    assert_eq!(dict.resolve(&["3", "1", "2"]).as_deref(), Some("一"));
}

#[test]
fn test_loaded_components_round_trip() {
    let dict = Dictionary::from_lines(["4e00:2,1,2", "20000:7"]);
    let expected: GraphemeBag = ["2", "2", "1"].into_iter().collect();
    assert_eq!(dict.components_of("4e00"), Some(&expected));
    assert_eq!(dict.resolve(&["7"]).as_deref(), Some("\u{20000}"));
    assert_eq!(dict.components_of("4e01"), None);
}
