mod test_helpers;

use predicates::prelude::*;
use serde_json::json;
use serial_test::serial;
use tempfile::tempdir;
use test_helpers::{base_folio_command, data_file_in, read_document};

const GOOGLE_GENERATE_PATH: &str = "/v1beta/models/gemini-1.5-flash-latest:generateContent";

#[test]
fn test_help_lists_commands() {
    let dir = tempdir().unwrap();
    base_folio_command(&data_file_in(dir.path()))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("folder"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("--data-file"));
}

#[test]
fn test_first_run_seeds_document() {
    let dir = tempdir().unwrap();
    let data_file = data_file_in(dir.path());

    base_folio_command(&data_file)
        .args(["folder", "list"])
        .assert()
        .success()
        .stdout("Story Line\n");

    let document = read_document(&data_file);
    assert_eq!(document["selected_api_key_name"], "Default Key");
    assert_eq!(document["api_provider"], "google");
    assert!(document["folders"]["Story Line"]["functions"]["Summarize"].is_string());
}

#[test]
fn test_folder_lifecycle() {
    let dir = tempdir().unwrap();
    let data_file = data_file_in(dir.path());

    base_folio_command(&data_file)
        .args(["folder", "add", "  Drafts  "])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added folder 'Drafts'"));

    base_folio_command(&data_file)
        .args(["folder", "add", "Drafts"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    base_folio_command(&data_file)
        .args(["folder", "list"])
        .assert()
        .success()
        .stdout("Story Line\nDrafts\n");

    base_folio_command(&data_file)
        .args(["folder", "delete", "Story Line"])
        .assert()
        .success();

    base_folio_command(&data_file)
        .args(["folder", "delete", "Drafts"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one folder must remain"));
}

#[test]
fn test_page_write_show_and_count() {
    let dir = tempdir().unwrap();
    let data_file = data_file_in(dir.path());

    base_folio_command(&data_file)
        .args(["page", "add", "Story Line", "Chapter 1"])
        .assert()
        .success();

    base_folio_command(&data_file)
        .args([
            "page",
            "write",
            "Story Line",
            "Chapter 1",
            "It was a **dark** night",
            "--markdown",
        ])
        .assert()
        .success()
        .stdout("5 words\n");

    base_folio_command(&data_file)
        .args(["page", "show", "Story Line", "Chapter 1"])
        .assert()
        .success()
        .stdout("It was a **dark** night\n");

    base_folio_command(&data_file)
        .args(["page", "show", "Story Line", "Chapter 1", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tagon-bold"))
        .stdout(predicate::str::contains("tagoff-bold"));

    base_folio_command(&data_file)
        .args(["page", "count", "Story Line", "Chapter 1"])
        .assert()
        .success()
        .stdout("5\n");
}

#[test]
fn test_page_write_reads_stdin() {
    let dir = tempdir().unwrap();
    let data_file = data_file_in(dir.path());

    base_folio_command(&data_file)
        .args(["page", "add", "Story Line", "Notes"])
        .assert()
        .success();

    base_folio_command(&data_file)
        .args(["page", "write", "Story Line", "Notes"])
        .write_stdin("piped text here\n")
        .assert()
        .success()
        .stdout("3 words\n");

    let document = read_document(&data_file);
    let events = document["folders"]["Story Line"]["pages"]["Notes"]["content"]
        .as_array()
        .expect("content events");
    assert_eq!(events[0], json!(["text", "piped text here\n", "1.0"]));
}

#[test]
fn test_page_style_and_notes() {
    let dir = tempdir().unwrap();
    let data_file = data_file_in(dir.path());

    base_folio_command(&data_file)
        .args(["page", "add", "Story Line", "Intro"])
        .assert()
        .success();
    base_folio_command(&data_file)
        .args(["page", "write", "Story Line", "Intro", "plain words"])
        .assert()
        .success();
    base_folio_command(&data_file)
        .args(["page", "style", "Story Line", "Intro", "underline", "0..5"])
        .assert()
        .success();
    base_folio_command(&data_file)
        .args(["page", "notes", "Story Line", "Intro", "check tone"])
        .assert()
        .success()
        .stdout("check tone\n");

    let document = read_document(&data_file);
    let page = &document["folders"]["Story Line"]["pages"]["Intro"];
    assert_eq!(page["notes"], "check tone");
    let events = page["content"].as_array().expect("content events");
    assert!(events.contains(&json!(["tagon-underline", "", "1.0"])));
    assert!(events.contains(&json!(["tagoff-underline", "", "1.5"])));
}

#[test]
fn test_missing_page_is_reported() {
    let dir = tempdir().unwrap();
    base_folio_command(&data_file_in(dir.path()))
        .args(["page", "show", "Story Line", "Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Page 'Nope' not found"));
}

#[test]
fn test_search_is_case_insensitive() {
    let dir = tempdir().unwrap();
    let data_file = data_file_in(dir.path());

    for (page, text) in [("One", "The Lighthouse stood"), ("Two", "nothing here")] {
        base_folio_command(&data_file)
            .args(["page", "add", "Story Line", page])
            .assert()
            .success();
        base_folio_command(&data_file)
            .args(["page", "write", "Story Line", page, text])
            .assert()
            .success();
    }

    base_folio_command(&data_file)
        .args(["search", "lighthouse"])
        .assert()
        .success()
        .stdout("Story Line/One\n");
}

#[test]
fn test_keys_and_provider_settings() {
    let dir = tempdir().unwrap();
    let data_file = data_file_in(dir.path());

    base_folio_command(&data_file)
        .args(["key", "set", "Work", "sk-123"])
        .assert()
        .success();
    base_folio_command(&data_file)
        .args(["key", "select", "Work"])
        .assert()
        .success();
    base_folio_command(&data_file)
        .args(["key", "list"])
        .assert()
        .success()
        .stdout("  Default Key\n* Work\n");

    base_folio_command(&data_file)
        .args(["provider", "openrouter"])
        .assert()
        .success()
        .stdout("  google\n* openrouter\n");

    base_folio_command(&data_file)
        .args(["appearance", "Dark"])
        .assert()
        .success()
        .stdout("Dark\n");

    let document = read_document(&data_file);
    assert_eq!(document["api_keys"]["Work"], "sk-123");
    assert_eq!(document["api_provider"], "openrouter");
    assert_eq!(document["appearance_mode"], "Dark");
}

#[test]
fn test_functions_and_references() {
    let dir = tempdir().unwrap();
    let data_file = data_file_in(dir.path());

    base_folio_command(&data_file)
        .args(["function", "set", "Story Line", "Shorten", "Make it shorter:"])
        .assert()
        .success();
    base_folio_command(&data_file)
        .args(["function", "list", "Story Line"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Shorten: Make it shorter:"));

    base_folio_command(&data_file)
        .args(["page", "add", "Story Line", "World"])
        .assert()
        .success();
    base_folio_command(&data_file)
        .args(["ref", "add", "Story Line", "World"])
        .assert()
        .success();
    base_folio_command(&data_file)
        .args(["ref", "add", "Story Line", "World"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    base_folio_command(&data_file)
        .args(["ref", "list"])
        .assert()
        .success()
        .stdout("Story Line/World\n");
}

#[test]
fn test_run_requires_api_key() {
    let dir = tempdir().unwrap();
    let data_file = data_file_in(dir.path());

    base_folio_command(&data_file)
        .args(["page", "add", "Story Line", "Intro"])
        .assert()
        .success();
    base_folio_command(&data_file)
        .args(["page", "write", "Story Line", "Intro", "Some text"])
        .assert()
        .success();

    base_folio_command(&data_file)
        .args(["run", "Story Line", "Intro", "Summarize"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key is not configured"));
}

#[test]
#[serial]
fn test_run_replaces_selection_with_result() {
    let dir = tempdir().unwrap();
    let data_file = data_file_in(dir.path());
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", GOOGLE_GENERATE_PATH)
        .match_header("x-goog-api-key", "secret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"candidates": [{"content": {"parts": [{"text": "they're"}]}}]}).to_string(),
        )
        .create();

    base_folio_command(&data_file)
        .args(["key", "set", "Default Key", "secret"])
        .assert()
        .success();
    base_folio_command(&data_file)
        .args(["page", "add", "Story Line", "Intro"])
        .assert()
        .success();
    base_folio_command(&data_file)
        .args(["page", "write", "Story Line", "Intro", "So their going home"])
        .assert()
        .success();

    base_folio_command(&data_file)
        .env("FOLIO_GOOGLE_API_URL", server.url())
        .args([
            "run",
            "Story Line",
            "Intro",
            "Fix Grammar",
            "--selection",
            "3..8",
            "--timeout",
            "30",
        ])
        .assert()
        .success()
        .stdout("So they're going home\n");

    mock.assert();
    base_folio_command(&data_file)
        .args(["page", "show", "Story Line", "Intro"])
        .assert()
        .success()
        .stdout("So they're going home\n");
}

#[test]
#[serial]
fn test_run_reports_quota_errors() {
    let dir = tempdir().unwrap();
    let data_file = data_file_in(dir.path());
    let mut server = mockito::Server::new();
    server
        .mock("POST", GOOGLE_GENERATE_PATH)
        .with_status(429)
        .with_body("slow down")
        .create();

    base_folio_command(&data_file)
        .args(["key", "set", "Default Key", "secret"])
        .assert()
        .success();
    base_folio_command(&data_file)
        .args(["page", "add", "Story Line", "Intro"])
        .assert()
        .success();
    base_folio_command(&data_file)
        .args(["page", "write", "Story Line", "Intro", "Keep me"])
        .assert()
        .success();

    base_folio_command(&data_file)
        .env("FOLIO_GOOGLE_API_URL", server.url())
        .args(["run", "Story Line", "Intro", "Summarize", "--timeout", "30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Quota exceeded"));

    base_folio_command(&data_file)
        .args(["page", "show", "Story Line", "Intro"])
        .assert()
        .success()
        .stdout("Keep me\n");
}

#[test]
fn test_save_as_and_load() {
    let dir = tempdir().unwrap();
    let data_file = data_file_in(dir.path());
    let copy = dir.path().join("copies").join("project.json");

    base_folio_command(&data_file)
        .args(["folder", "add", "Research"])
        .assert()
        .success();
    base_folio_command(&data_file)
        .arg("save-as")
        .arg(&copy)
        .assert()
        .success()
        .stdout(predicate::str::contains("Project saved to"));
    assert!(copy.exists());

    base_folio_command(&data_file)
        .arg("load")
        .arg(&copy)
        .assert()
        .success()
        .stdout("Story Line\nResearch\n");

    base_folio_command(&data_file)
        .arg("load")
        .arg(dir.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read document"));
}

#[test]
fn test_data_file_flag_overrides_environment() {
    let dir = tempdir().unwrap();
    let data_file = data_file_in(dir.path());
    let other = dir.path().join("other.json");

    base_folio_command(&data_file)
        .arg("--data-file")
        .arg(&other)
        .args(["folder", "add", "Elsewhere"])
        .assert()
        .success();

    assert!(other.exists());
    assert!(!data_file.exists());
}

#[test]
fn test_read_only_commands_leave_backups_alone() {
    let dir = tempdir().unwrap();
    let data_file = data_file_in(dir.path());
    let backup_dir = dir.path().join("backups");

    base_folio_command(&data_file)
        .args(["folder", "add", "Drafts"])
        .assert()
        .success();
    let saved = std::fs::read_to_string(&data_file).unwrap();

    for _ in 0..3 {
        base_folio_command(&data_file)
            .args(["search", "anything"])
            .assert()
            .success();
        base_folio_command(&data_file)
            .args(["folder", "list"])
            .assert()
            .success();
    }

    assert!(!backup_dir.exists());
    assert_eq!(std::fs::read_to_string(&data_file).unwrap(), saved);

    base_folio_command(&data_file)
        .args(["folder", "add", "Research"])
        .assert()
        .success();
    assert_eq!(std::fs::read_dir(&backup_dir).unwrap().count(), 1);
}
