//! List file parsing and writing.

mod common;

use std::sync::Arc;

use mtg_deck_buddy::decklist::{
    list_sources, parse_line, read_list, read_list_file, write_deck_list, ListLineError,
};
use mtg_deck_buddy::models::DeckEntry;

fn collect(text: &str) -> Vec<(i64, String)> {
    let mut entries = Vec::new();
    read_list(text.as_bytes(), "test", |count, name| {
        entries.push((count, name.to_string()))
    })
    .unwrap();
    entries
}

// ---------------------------------------------------------------------------
// parse_line
// ---------------------------------------------------------------------------

#[test]
fn parse_count_and_name() {
    assert_eq!(parse_line("4 Lightning Bolt"), Ok(Some((4, "Lightning Bolt"))));
    assert_eq!(parse_line("  2   Island  "), Ok(Some((2, "Island"))));
    assert_eq!(parse_line("1 Fire // Ice"), Ok(Some((1, "Fire // Ice"))));
}

#[test]
fn blank_and_comment_lines_are_skipped() {
    assert_eq!(parse_line(""), Ok(None));
    assert_eq!(parse_line("   "), Ok(None));
    assert_eq!(parse_line("// Deck with 60 cards"), Ok(None));
}

#[test]
fn bad_lines_are_errors() {
    assert_eq!(parse_line("Forest"), Err(ListLineError::MissingName));
    assert_eq!(
        parse_line("four Forest"),
        Err(ListLineError::InvalidCount("four".into()))
    );
}

#[test]
fn negative_counts_parse() {
    assert_eq!(parse_line("-2 Forest"), Ok(Some((-2, "Forest"))));
}

// ---------------------------------------------------------------------------
// read_list
// ---------------------------------------------------------------------------

#[test]
fn read_list_continues_past_bad_lines() {
    let entries = collect("// header\n4 Forest\nx Island\nMountain\n\n2 Island\n");
    assert_eq!(
        entries,
        vec![(4, "Forest".to_string()), (2, "Island".to_string())]
    );
}

#[test]
fn read_list_keeps_going_after_invalid_utf8() {
    let bytes: &[u8] = b"4 Forest\n1 Lim-D\xFBl's Vault\n2 Island\n";
    let mut entries = Vec::new();
    read_list(bytes, "latin1", |count, name| entries.push((count, name.to_string()))).unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0], (4, "Forest".to_string()));
    assert_eq!(entries[1].0, 1);
    assert!(entries[1].1.starts_with("Lim-D"));
    assert_eq!(entries[2], (2, "Island".to_string()));
}

#[test]
fn read_list_file_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("burn.dec");
    std::fs::write(&path, "4 Lightning Bolt\r\n20 Mountain\r\n").unwrap();

    let mut entries = Vec::new();
    read_list_file(&path, |count, name| entries.push((count, name.to_string()))).unwrap();
    assert_eq!(
        entries,
        vec![(4, "Lightning Bolt".to_string()), (20, "Mountain".to_string())]
    );
}

#[test]
fn read_list_file_missing_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = read_list_file(&dir.path().join("missing.dec"), |_, _| {});
    assert!(matches!(result, Err(mtg_deck_buddy::DeckBuddyError::Io(_))));
}

// ---------------------------------------------------------------------------
// list_sources
// ---------------------------------------------------------------------------

#[test]
fn file_source_is_itself() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("one.txt");
    std::fs::write(&path, "1 Forest\n").unwrap();
    assert_eq!(list_sources(&path).unwrap(), vec![path]);
}

#[test]
fn directory_source_expands_to_dec_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("b.dec"), "").unwrap();
    std::fs::write(dir.path().join("a.dec"), "").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "").unwrap();
    std::fs::create_dir(dir.path().join("nested.dec")).unwrap();

    let files = list_sources(dir.path()).unwrap();
    assert_eq!(
        files,
        vec![dir.path().join("a.dec"), dir.path().join("b.dec")]
    );
}

#[test]
fn directory_without_lists_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "").unwrap();
    assert!(list_sources(dir.path()).unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// write_deck_list
// ---------------------------------------------------------------------------

#[test]
fn written_list_has_header_and_entries() {
    let catalog =
        mtg_deck_buddy::catalog::read_catalog(common::sample_catalog_bytes().as_slice()).unwrap();
    let deck = vec![
        DeckEntry {
            card: Arc::clone(catalog.by_name("Forest").unwrap()),
            copies: 4,
        },
        DeckEntry {
            card: Arc::clone(catalog.by_name("Lightning Bolt").unwrap()),
            copies: 2,
        },
    ];

    let mut out = Vec::new();
    write_deck_list(&mut out, &deck, 6).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("// Deck with 6 cards - "));
    assert_eq!(lines[1], "4 Forest");
    assert_eq!(lines[2], "2 Lightning Bolt");

    // The written list reads back to the same entries.
    assert_eq!(
        collect(&text),
        vec![(4, "Forest".to_string()), (2, "Lightning Bolt".to_string())]
    );
}
