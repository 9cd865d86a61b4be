use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_lmsd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn lmsd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({ "id": id, "method": method, "params": params });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "expected ok for {}: {}",
        method,
        value
    );
    value.get("result").cloned().expect("result")
}

fn error_code(value: &serde_json::Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

fn seed_record(id: i64, file_name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "fileName": file_name,
        "uploadedBy": "t@x.edu",
        "role": "TEACHER",
        "filePath": format!("uploads/teachers/{}", file_name),
        "timestamp": "2025-03-01 08:00:00",
        "fileSize": 12,
        "visibleTo": ["s1@x.edu", "ALL", "s1@x.edu"],
        "legacyField": { "kept": "ignored on read" }
    })
}

#[test]
fn gappy_ids_and_unknown_fields_survive_a_reload() {
    let workspace = temp_dir("lmsd-roundtrip-ws");
    let staging = temp_dir("lmsd-roundtrip-files");
    let seeded = json!([
        seed_record(1, "a.txt"),
        seed_record(3, "b.txt"),
        seed_record(5, "c.txt"),
    ]);
    std::fs::write(
        workspace.join("uploads.json"),
        serde_json::to_string_pretty(&seeded).expect("serialize seed"),
    )
    .expect("write seed uploads.json");

    let next_file = staging.join("d.txt");
    std::fs::write(&next_file, b"payload").expect("write candidate");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let listed = request_ok(&mut stdin, &mut reader, "2", "uploads.list", json!({}));
    assert_eq!(listed.get("total").and_then(|v| v.as_i64()), Some(3));

    // next id is recomputed over the gaps, never from a stored counter.
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "uploads.create",
        json!({
            "sourcePath": next_file.to_string_lossy(),
            "uploadedBy": "t@x.edu",
            "role": "TEACHER",
            "visibleTo": ["s2@x.edu", "s2@x.edu"],
        }),
    );
    assert_eq!(
        created
            .get("upload")
            .and_then(|u| u.get("id"))
            .and_then(|v| v.as_i64()),
        Some(6)
    );

    let _ = child.kill();

    // The rewritten file still holds all records; the visibility lists keep
    // their order and duplicates.
    let text = std::fs::read_to_string(workspace.join("uploads.json")).expect("read uploads.json");
    let reloaded: serde_json::Value = serde_json::from_str(&text).expect("parse uploads.json");
    let records = reloaded.as_array().expect("array");
    assert_eq!(records.len(), 4);
    assert_eq!(
        records[0].get("visibleTo"),
        Some(&json!(["s1@x.edu", "ALL", "s1@x.edu"]))
    );
    assert_eq!(
        records[3].get("visibleTo"),
        Some(&json!(["s2@x.edu", "s2@x.edu"]))
    );

    // A second daemon sees the same set.
    let (mut child2, mut stdin2, mut reader2) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin2,
        &mut reader2,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let listed = request_ok(&mut stdin2, &mut reader2, "2", "uploads.list", json!({}));
    assert_eq!(listed.get("total").and_then(|v| v.as_i64()), Some(4));

    let _ = child2.kill();
    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(staging);
}

#[test]
fn failed_persist_rolls_back_memory_and_removes_the_new_copy() {
    let workspace = temp_dir("lmsd-rollback-ws");
    let staging = temp_dir("lmsd-rollback-files");
    std::fs::write(
        workspace.join("uploads.json"),
        serde_json::to_string_pretty(&json!([seed_record(1, "a.txt")])).expect("serialize seed"),
    )
    .expect("write seed uploads.json");

    let candidate = staging.join("d.txt");
    std::fs::write(&candidate, b"payload").expect("write candidate");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    std::fs::write(workspace.join("uploads/teachers/a.txt"), b"committed")
        .expect("write committed content");

    // A directory squatting on the temp-file name makes the durable write
    // fail after the content copy already happened.
    std::fs::create_dir_all(workspace.join("uploads.json.tmp")).expect("block temp file");

    let failed = request(
        &mut stdin,
        &mut reader,
        "2",
        "uploads.create",
        json!({
            "sourcePath": candidate.to_string_lossy(),
            "uploadedBy": "t@x.edu",
            "role": "TEACHER",
            "visibleTo": [],
        }),
    );
    assert_eq!(failed.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(error_code(&failed), "persist_failed");

    // Memory still holds the pre-call set and the orphaned copy is gone.
    let listed = request_ok(&mut stdin, &mut reader, "3", "uploads.list", json!({}));
    assert_eq!(listed.get("total").and_then(|v| v.as_i64()), Some(1));
    assert!(!workspace.join("uploads/teachers/d.txt").exists());
    assert!(workspace.join("uploads/teachers/a.txt").is_file());

    // Once the blocker is removed the same request commits cleanly.
    std::fs::remove_dir_all(workspace.join("uploads.json.tmp")).expect("unblock temp file");
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "uploads.create",
        json!({
            "sourcePath": candidate.to_string_lossy(),
            "uploadedBy": "t@x.edu",
            "role": "TEACHER",
            "visibleTo": [],
        }),
    );
    assert_eq!(
        created
            .get("upload")
            .and_then(|u| u.get("id"))
            .and_then(|v| v.as_i64()),
        Some(2)
    );
    assert!(workspace.join("uploads/teachers/d.txt").is_file());

    let _ = child.kill();
    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(staging);
}

#[test]
fn failed_persist_keeps_content_an_earlier_record_points_at() {
    let workspace = temp_dir("lmsd-collision-ws");
    let staging = temp_dir("lmsd-collision-files");
    std::fs::write(
        workspace.join("uploads.json"),
        serde_json::to_string_pretty(&json!([seed_record(1, "a.txt")])).expect("serialize seed"),
    )
    .expect("write seed uploads.json");

    let candidate = staging.join("a.txt");
    std::fs::write(&candidate, b"replacement").expect("write candidate");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    std::fs::write(workspace.join("uploads/teachers/a.txt"), b"committed")
        .expect("write committed content");
    std::fs::create_dir_all(workspace.join("uploads.json.tmp")).expect("block temp file");

    let failed = request(
        &mut stdin,
        &mut reader,
        "2",
        "uploads.create",
        json!({
            "sourcePath": candidate.to_string_lossy(),
            "uploadedBy": "t@x.edu",
            "role": "TEACHER",
            "visibleTo": [],
        }),
    );
    assert_eq!(error_code(&failed), "persist_failed");

    // The colliding name was overwritten in place; the rollback must not
    // delete it out from under record 1.
    let content =
        std::fs::read(workspace.join("uploads/teachers/a.txt")).expect("read surviving content");
    assert_eq!(content, b"replacement");

    let _ = child.kill();
    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(staging);
}

#[test]
fn unreadable_store_file_degrades_to_an_empty_collection() {
    let workspace = temp_dir("lmsd-unreadable-ws");
    // A directory where the data file should be fails the read without
    // being a missing-file case.
    std::fs::create_dir_all(workspace.join("uploads.json")).expect("write blocking dir");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let listed = request_ok(&mut stdin, &mut reader, "2", "uploads.list", json!({}));
    assert_eq!(listed.get("total").and_then(|v| v.as_i64()), Some(0));

    let _ = child.kill();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn corrupt_store_file_degrades_to_an_empty_collection() {
    let workspace = temp_dir("lmsd-corrupt-ws");
    std::fs::write(workspace.join("uploads.json"), b"{ not json").expect("write corrupt file");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let listed = request_ok(&mut stdin, &mut reader, "2", "uploads.list", json!({}));
    assert_eq!(listed.get("total").and_then(|v| v.as_i64()), Some(0));

    let _ = child.kill();
    let _ = std::fs::remove_dir_all(workspace);
}
