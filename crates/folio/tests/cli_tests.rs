//! CLI integration tests.
//!
//! These tests exercise the CLI commands end-to-end against a temporary store.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

fn folio(data_dir: &Path, args: &[&str], stdin: Option<&str>) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_folio"))
        .arg("--data-dir")
        .arg(data_dir)
        .args(args)
        .env_remove("FOLIO_CONFIG_CONTENT")
        .env_remove("FOLIO_DATA_DIR")
        .env_remove("FOLIO_LOG_LEVEL")
        .current_dir(data_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute command");

    {
        let mut pipe = child.stdin.take().expect("stdin is piped");
        if let Some(input) = stdin {
            pipe.write_all(input.as_bytes()).expect("Failed to write stdin");
        }
    }

    child.wait_with_output().expect("Failed to wait for command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_help_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_folio"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("Document version store"));
    assert!(stdout.contains("compare"));
    assert!(stdout.contains("--data-dir"));
}

#[test]
fn test_create_show_and_list() {
    let dir = tempfile::tempdir().unwrap();

    let output = folio(
        dir.path(),
        &["create", "notes", "--actor", "alice", "--meta", "title=Notes"],
        Some("first line\n"),
    );
    assert!(output.status.success(), "{:?}", output);
    assert!(stdout(&output).contains("Created version 1 of notes"));

    let output = folio(
        dir.path(),
        &["create", "notes", "--actor", "bob"],
        Some("first line\nsecond line\n"),
    );
    assert!(stdout(&output).contains("Created version 2 of notes"));

    let output = folio(dir.path(), &["show", "notes", "1"], None);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Author:   alice"));
    assert!(text.contains("title = \"Notes\""));
    assert!(text.contains("first line"));

    let output = folio(dir.path(), &["--json", "list", "notes"], None);
    let page: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(page["total"], 2);
    assert_eq!(page["versions"][0]["version_number"], 2);
    assert_eq!(page["versions"][1]["version_number"], 1);
}

#[test]
fn test_restore_and_compare() {
    let dir = tempfile::tempdir().unwrap();
    folio(dir.path(), &["create", "doc", "-a", "alice"], Some("hello"));
    folio(dir.path(), &["create", "doc", "-a", "alice"], Some("hello world"));

    let output = folio(dir.path(), &["compare", "doc", "1", "2"], None);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("--- doc@1"));
    assert!(text.contains("+++ doc@2"));
    assert!(text.contains("-hello\n"));
    assert!(text.contains("+hello world\n"));

    let output = folio(dir.path(), &["restore", "doc", "1", "--actor", "bob"], None);
    assert!(output.status.success());
    assert!(stdout(&output).contains("as version 3"));

    let output = folio(dir.path(), &["--json", "latest", "doc"], None);
    let latest: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(latest["content"], "hello");
    assert_eq!(latest["created_by"], "bob");
    assert_eq!(latest["restored_from"]["version_number"], 1);

    let output = folio(
        dir.path(),
        &["compare", "doc", "1", "3", "--format", "json"],
        None,
    );
    let comparison: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(comparison["stats"]["added"], 0);
    assert_eq!(comparison["stats"]["removed"], 0);
}

#[test]
fn test_missing_version_fails() {
    let dir = tempfile::tempdir().unwrap();
    folio(dir.path(), &["create", "doc", "-a", "alice"], Some("text\n"));

    let output = folio(dir.path(), &["show", "doc", "42"], None);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"));
}

#[test]
fn test_empty_content_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = folio(dir.path(), &["create", "doc", "-a", "alice"], Some(""));
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("content cannot be empty"));
}

#[test]
fn test_delete_then_create_skips_number() {
    let dir = tempfile::tempdir().unwrap();
    folio(dir.path(), &["create", "doc", "-a", "alice"], Some("one\n"));
    folio(dir.path(), &["create", "doc", "-a", "alice"], Some("two\n"));

    let output = folio(dir.path(), &["delete", "doc", "2"], None);
    assert!(output.status.success());

    let output = folio(dir.path(), &["create", "doc", "-a", "alice"], Some("three\n"));
    assert!(stdout(&output).contains("Created version 3 of doc"));
}
