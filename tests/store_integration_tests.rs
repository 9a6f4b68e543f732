//! Integration tests for the persisted document: reopening, older file
//! shapes, corrupt files and backups.

use folio::errors::AppError;
use folio::session::PageLoad;
use folio::{Config, DocumentStore, EditorSession, Style};
use serde_json::json;
use std::fs;
use tempfile::tempdir;

fn config_in(dir: &std::path::Path) -> Config {
    Config::for_data_file(dir.join("folio_data.json"))
}

#[test]
fn test_edits_survive_reopen() {
    let dir = tempdir().expect("create temp dir");
    let config = config_in(dir.path());

    {
        let mut store = DocumentStore::open(&config);
        store.add_folder("Drafts").expect("add folder");
        store.add_page("Drafts", "Opening").expect("add page");

        let mut session = EditorSession::new();
        session
            .select_page(&mut store, "Drafts", "Opening")
            .expect("select page");
        session.set_text("Rain on the window");
        session.select(Some(0..4));
        session.toggle_style(Style::Italic);
        session.close(&mut store).expect("close session");
    }

    let mut store = DocumentStore::load(&config).expect("reload");
    assert_eq!(store.folder_names(), vec!["Story Line", "Drafts"]);

    let mut session = EditorSession::new();
    let outcome = session
        .select_page(&mut store, "Drafts", "Opening")
        .expect("select page");
    assert!(matches!(outcome, PageLoad::Loaded));
    assert_eq!(session.buffer().text(), "Rain on the window");
    assert_eq!(session.buffer().tag_ranges("italic"), &[0..4]);
}

#[test]
fn test_bare_event_list_pages_are_read() {
    let dir = tempdir().expect("create temp dir");
    let config = config_in(dir.path());
    let legacy = json!({
        "folders": {
            "Old": {
                "pages": {
                    "Notes": [["text", "from an early version\n", "1.0"]]
                },
                "functions": {}
            }
        }
    });
    fs::write(&config.data_file, legacy.to_string()).expect("write legacy document");

    let mut store = DocumentStore::load(&config).expect("load legacy document");
    assert_eq!(
        store.page_plain_text("Old", "Notes").as_deref(),
        Some("from an early version")
    );
    assert_eq!(store.page_notes("Old", "Notes"), Some(""));
    assert_eq!(store.selected_api_key_name(), Some("Default Key"));

    store.save().expect("save");
    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&config.data_file).unwrap()).unwrap();
    assert_eq!(saved["folders"]["Old"]["pages"]["Notes"]["notes"], "");
    assert!(saved["folders"]["Old"]["pages"]["Notes"]["content"].is_array());
}

#[test]
fn test_corrupt_document_is_backed_up_before_overwrite() {
    let dir = tempdir().expect("create temp dir");
    let config = config_in(dir.path());
    fs::write(&config.data_file, "{ not json").expect("write corrupt document");

    match DocumentStore::load(&config) {
        Err(AppError::Persistence(e)) => assert!(e.to_string().contains("could not be parsed")),
        other => panic!("Expected parse failure, got {:?}", other),
    }

    let mut store = DocumentStore::open(&config);
    assert_eq!(store.folder_names(), vec!["Story Line"]);
    store.add_folder("Fresh").expect("add folder");

    let backups = store.backups().list("folio_data.json");
    assert_eq!(backups.len(), 1);
    assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "{ not json");
    assert!(DocumentStore::load(&config).is_ok());
}

#[test]
fn test_only_first_save_of_a_session_backs_up() {
    let dir = tempdir().expect("create temp dir");
    let config = config_in(dir.path());

    let mut store = DocumentStore::open(&config);
    store.add_folder("A").expect("first save");
    // Nothing existed on disk before the first save.
    assert!(store.backups().list("folio_data.json").is_empty());

    let mut store = DocumentStore::open(&config);
    store.add_folder("B").expect("save");
    store.add_folder("C").expect("save");
    assert_eq!(store.backups().list("folio_data.json").len(), 1);
    assert_eq!(store.write_count(), 2);
}

#[test]
fn test_unchanged_page_is_not_rewritten() {
    let dir = tempdir().expect("create temp dir");
    let config = config_in(dir.path());
    let mut store = DocumentStore::open(&config);
    store.add_page("Story Line", "One").expect("add page");
    store.add_page("Story Line", "Two").expect("add page");
    let writes = store.write_count();

    let mut session = EditorSession::new();
    session.select_page(&mut store, "Story Line", "One").unwrap();
    session.select_page(&mut store, "Story Line", "Two").unwrap();
    session.select_page(&mut store, "Story Line", "One").unwrap();
    assert_eq!(store.write_count(), writes);

    session.set_text("changed");
    session.select_page(&mut store, "Story Line", "Two").unwrap();
    assert_eq!(store.write_count(), writes + 1);
    assert_eq!(
        store.page_plain_text("Story Line", "One").as_deref(),
        Some("changed")
    );
}

#[test]
fn test_malformed_page_opens_as_plain_text() {
    let dir = tempdir().expect("create temp dir");
    let config = config_in(dir.path());
    let document = json!({
        "folders": {
            "Story Line": {
                "pages": {
                    "Broken": {
                        "content": [
                            ["text", "still readable\n", "1.0"],
                            ["tagon-bold", "", "one.two"]
                        ],
                        "notes": ""
                    }
                }
            }
        }
    });
    fs::write(&config.data_file, document.to_string()).expect("write document");

    let mut store = DocumentStore::load(&config).expect("load");
    let mut session = EditorSession::new();
    let outcome = session
        .select_page(&mut store, "Story Line", "Broken")
        .expect("select page");

    assert!(matches!(outcome, PageLoad::Recovered(_)));
    assert_eq!(session.buffer().text(), "still readable");
    assert!(session.buffer().tag_ranges("bold").is_empty());
}
