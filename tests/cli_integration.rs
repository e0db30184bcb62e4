// CLI integration tests: catalog check plus row decoding against fixture databases.
use std::path::Path;
use std::process::{Command, Output};

use plist::{Dictionary, Value as ArchiveValue};
use rusqlite::{Connection, params};
use serde_json::Value;

fn cmd(dir: &Path) -> Command {
    let exe = env!("CARGO_BIN_EXE_notedump");
    let mut command = Command::new(exe);
    command.current_dir(dir).env_remove("RUST_LOG");
    command
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

fn parse_json(value: &str) -> Value {
    serde_json::from_str(value).expect("valid json")
}

fn archive(objects: &[&str]) -> Vec<u8> {
    archive_by("NSKeyedArchiver", objects)
}

fn archive_by(archiver: &str, objects: &[&str]) -> Vec<u8> {
    let mut root = Dictionary::new();
    root.insert(
        "$archiver".to_string(),
        ArchiveValue::String(archiver.to_string()),
    );
    root.insert("$version".to_string(), ArchiveValue::Integer(100000i64.into()));
    root.insert(
        "$objects".to_string(),
        ArchiveValue::Array(
            objects
                .iter()
                .map(|s| ArchiveValue::String(s.to_string()))
                .collect(),
        ),
    );
    let mut buf = Vec::new();
    ArchiveValue::Dictionary(root)
        .to_writer_binary(&mut buf)
        .expect("encode archive");
    buf
}

fn create_db(dir: &Path, rows: &[(i64, i64, Vec<u8>)]) {
    let conn = Connection::open(dir.join("db")).expect("open db");
    conn.execute_batch(
        "CREATE TABLE notifications (note_id INTEGER PRIMARY KEY, app_id INTEGER, encoded_data BLOB);",
    )
    .expect("schema");
    for (note_id, app_id, blob) in rows {
        conn.execute(
            "INSERT INTO notifications (note_id, app_id, encoded_data) VALUES (?1, ?2, ?3)",
            params![note_id, app_id, blob],
        )
        .expect("insert");
    }
}

#[test]
fn empty_table_prints_catalog_only() {
    let temp = tempfile::tempdir().expect("tempdir");
    create_db(temp.path(), &[]);

    let output = cmd(temp.path()).output().expect("run");
    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_ne!(lines[0], "[]");
    assert!(lines[0].contains("notifications"));
}

#[test]
fn missing_table_prints_empty_catalog_then_fails() {
    let temp = tempfile::tempdir().expect("tempdir");
    let conn = Connection::open(temp.path().join("db")).expect("open db");
    conn.execute_batch("CREATE TABLE app (app_id INTEGER PRIMARY KEY, identifier TEXT);")
        .expect("schema");
    drop(conn);

    let output = cmd(temp.path()).output().expect("run");
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(stdout_lines(&output), vec!["[]".to_string()]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut stderr_json = stderr.lines().map(parse_json);
    let notice = stderr_json.next().expect("notice line");
    assert_eq!(notice["notice"]["kind"], "missing_table");
    let error = stderr_json.next().expect("error line");
    assert_eq!(error["error"]["kind"], "NotFound");
    assert!(
        error["error"]["causes"][0]
            .as_str()
            .unwrap()
            .contains("no such table")
    );
}

#[test]
fn decodes_title_and_message() {
    let temp = tempfile::tempdir().expect("tempdir");
    create_db(
        temp.path(),
        &[
            (1, 12, archive(&["root", "metadata", "Hello", "World", "tail"])),
            (2, 13, archive(&["$null", "meta", "Build", "green"])),
        ],
    );

    let output = cmd(temp.path()).output().expect("run");
    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "1 12 Hello World");
    assert_eq!(lines[2], "2 13 Build green");
    assert!(output.stderr.is_empty());
}

#[test]
fn invalid_blob_aborts_remaining_rows() {
    let temp = tempfile::tempdir().expect("tempdir");
    create_db(
        temp.path(),
        &[
            (1, 12, archive(&["root", "metadata", "Hello", "World"])),
            (2, 12, b"bplist00 but not really".to_vec()),
            (3, 12, archive(&["root", "metadata", "Later", "Row"])),
        ],
    );

    let output = cmd(temp.path()).output().expect("run");
    assert_eq!(output.status.code(), Some(7));
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1], "1 12 Hello World");

    let error = parse_json(String::from_utf8_lossy(&output.stderr).trim());
    assert_eq!(error["error"]["kind"], "Corrupt");
    assert_eq!(error["error"]["note_id"], 2);
}

#[test]
fn short_object_list_is_out_of_bounds() {
    let temp = tempfile::tempdir().expect("tempdir");
    create_db(temp.path(), &[(4, 12, archive(&["root", "metadata"]))]);

    let output = cmd(temp.path()).output().expect("run");
    assert_eq!(output.status.code(), Some(9));
    assert_eq!(stdout_lines(&output).len(), 1);

    let error = parse_json(String::from_utf8_lossy(&output.stderr).trim());
    assert_eq!(error["error"]["kind"], "Layout");
    assert_eq!(error["error"]["note_id"], 4);
    assert_eq!(error["error"]["index"], 2);
}

#[test]
fn repeated_runs_are_identical() {
    let temp = tempfile::tempdir().expect("tempdir");
    create_db(
        temp.path(),
        &[
            (1, 12, archive(&["root", "metadata", "Hello", "World"])),
            (2, 14, archive(&["root", "metadata", "Again", "Same"])),
        ],
    );

    let first = cmd(temp.path()).output().expect("first run");
    let second = cmd(temp.path()).output().expect("second run");
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn jsonl_format_emits_records() {
    let temp = tempfile::tempdir().expect("tempdir");
    create_db(
        temp.path(),
        &[(1, 12, archive(&["root", "metadata", "Hello", "World"]))],
    );

    let output = cmd(temp.path())
        .args(["--format", "jsonl"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);

    let catalog = parse_json(&lines[0]);
    let entry = &catalog["catalog"][0];
    assert_eq!(entry["type"], "table");
    assert_eq!(entry["name"], "notifications");
    assert!(entry["sql"].as_str().unwrap().contains("encoded_data"));

    let row = parse_json(&lines[1]);
    assert_eq!(row["note_id"], 1);
    assert_eq!(row["app_id"], 12);
    assert_eq!(row["title"], "Hello");
    assert_eq!(row["message"], "World");
    assert_eq!(row["archive_version"], 100000);
}

#[test]
fn foreign_archiver_emits_notice_and_still_decodes() {
    let temp = tempfile::tempdir().expect("tempdir");
    create_db(
        temp.path(),
        &[(6, 21, archive_by("MyArchiver", &["root", "metadata", "Hello", "World"]))],
    );

    let output = cmd(temp.path()).output().expect("run");
    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1], "6 21 Hello World");

    let stderr = String::from_utf8_lossy(&output.stderr);
    let notices: Vec<Value> = stderr.lines().map(parse_json).collect();
    assert_eq!(notices.len(), 1);
    let notice = &notices[0]["notice"];
    assert_eq!(notice["kind"], "unexpected_archiver");
    assert_eq!(notice["details"]["note_id"], 6);
    assert_eq!(notice["details"]["archiver"], "MyArchiver");
    assert_eq!(notice["details"]["archive_version"], 100000);
}

#[test]
fn index_flags_select_other_positions() {
    let temp = tempfile::tempdir().expect("tempdir");
    create_db(
        temp.path(),
        &[(7, 1, archive(&["$null", "a", "b", "c", "Subject", "Body"]))],
    );

    let output = cmd(temp.path())
        .args(["--title-index", "4", "--message-index", "5"])
        .output()
        .expect("run");
    assert!(output.status.success());
    assert_eq!(stdout_lines(&output)[1], "7 1 Subject Body");
}

#[test]
fn db_flag_points_at_another_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    create_db(
        temp.path(),
        &[(1, 12, archive(&["root", "metadata", "Hello", "World"]))],
    );
    let elsewhere = tempfile::tempdir().expect("tempdir");
    let db_path = temp.path().join("db");

    let output = cmd(elsewhere.path())
        .args(["--db", db_path.to_str().unwrap()])
        .output()
        .expect("run");
    assert!(output.status.success());
    assert_eq!(stdout_lines(&output)[1], "1 12 Hello World");
}

#[test]
fn missing_database_file_is_not_created() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = cmd(temp.path()).output().expect("run");
    assert_eq!(output.status.code(), Some(3));
    assert!(output.stdout.is_empty());
    assert!(!temp.path().join("db").exists());

    let error = parse_json(String::from_utf8_lossy(&output.stderr).trim());
    assert_eq!(error["error"]["message"], "database file not found");
}

#[test]
fn usage_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = cmd(temp.path())
        .args(["--format", "yaml"])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(2));
}
