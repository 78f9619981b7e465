use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
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
    let exe = env!("CARGO_BIN_EXE_campusd");
    let mut child = Command::new(exe)
        .env_remove("CAMPUSD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn campusd");
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
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
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
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

fn open_as_faculty(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    workspace: &Path,
) {
    request_ok(
        stdin,
        reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    request_ok(
        stdin,
        reader,
        "login",
        "session.login",
        json!({ "email": "drsmith@example.com", "password": "password" }),
    );
}

fn group_for<'a>(view: &'a serde_json::Value, date: &str) -> Option<&'a serde_json::Value> {
    view["groups"]
        .as_array()
        .and_then(|groups| groups.iter().find(|g| g["date"] == json!(date)))
}

fn row_for<'a>(group: &'a serde_json::Value, student_id: &str) -> &'a serde_json::Value {
    group["rows"]
        .as_array()
        .expect("rows")
        .iter()
        .find(|row| row["student"]["id"] == json!(student_id))
        .expect("row for student")
}

#[test]
fn remarking_a_slot_leaves_one_record_with_latest_status() {
    let workspace = temp_dir("campusd-faculty-remark");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_as_faculty(&mut stdin, &mut reader, &workspace);

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.mark",
        json!({ "studentId": "s1", "courseId": "1", "date": "2025-04-01", "status": "present" }),
    );
    assert_eq!(first["record"]["markedBy"], json!("f1"));
    assert_eq!(first["record"]["status"], json!("present"));

    let second = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.mark",
        json!({ "studentId": "s1", "courseId": "1", "date": "2025-04-01", "status": "absent" }),
    );
    assert_ne!(first["record"]["id"], second["record"]["id"]);

    let view = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.facultyCourse",
        json!({ "courseId": "1" }),
    );
    assert_eq!(view["course"]["code"], json!("CS301"));
    let group = group_for(&view, "2025-04-01").expect("group for date");
    assert_eq!(group["rows"].as_array().map(|r| r.len()), Some(3));
    let row = row_for(group, "s1");
    assert_eq!(row["record"]["status"], json!("absent"));
    assert_eq!(row["record"]["id"], second["record"]["id"]);
    assert!(row_for(group, "s2")["record"].is_null());
    assert_eq!(group["stats"]["total"], json!(1));
    assert_eq!(group["stats"]["absent"], json!(1));

    // Dates come newest first.
    let dates: Vec<&str> = view["groups"]
        .as_array()
        .expect("groups")
        .iter()
        .filter_map(|g| g["date"].as_str())
        .collect();
    let mut sorted = dates.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(dates, sorted);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn delete_removes_record_and_reports_whether_it_existed() {
    let workspace = temp_dir("campusd-faculty-delete");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_as_faculty(&mut stdin, &mut reader, &workspace);

    let marked = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.mark",
        json!({ "studentId": "s2", "courseId": "2", "date": "2031-03-03", "status": "present" }),
    );
    let id = marked["record"]["id"].as_str().expect("id").to_string();

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.delete",
        json!({ "id": id }),
    );
    assert_eq!(deleted["deleted"], json!(true));

    let view = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.facultyCourse",
        json!({ "courseId": "2" }),
    );
    assert!(group_for(&view, "2031-03-03").is_none());
    let still_listed = view["groups"]
        .as_array()
        .expect("groups")
        .iter()
        .flat_map(|g| g["rows"].as_array().cloned().unwrap_or_default())
        .any(|row| row["record"]["id"] == json!(id));
    assert!(!still_listed);

    let again = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.delete",
        json!({ "id": id }),
    );
    assert_eq!(again["deleted"], json!(false));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn group_stats_ignore_records_for_unknown_students() {
    let workspace = temp_dir("campusd-faculty-orphan");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_as_faculty(&mut stdin, &mut reader, &workspace);

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.mark",
        json!({ "studentId": "s1", "courseId": "3", "date": "2031-03-10", "status": "present" }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.mark",
        json!({ "studentId": "ghost", "courseId": "3", "date": "2031-03-10", "status": "absent" }),
    );

    let view = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.facultyCourse",
        json!({ "courseId": "3" }),
    );
    let group = group_for(&view, "2031-03-10").expect("group for date");
    let filled = group["rows"]
        .as_array()
        .expect("rows")
        .iter()
        .filter(|row| !row["record"].is_null())
        .count();
    assert_eq!(filled, 1);
    assert_eq!(group["stats"]["total"], json!(1));
    assert_eq!(group["stats"]["absent"], json!(0));
    assert_eq!(group["stats"]["percentage"], json!(100));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn update_and_validation_errors() {
    let workspace = temp_dir("campusd-faculty-update");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_as_faculty(&mut stdin, &mut reader, &workspace);

    let marked = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.mark",
        json!({ "studentId": "s3", "courseId": "3", "date": "2031-03-04", "status": "absent" }),
    );
    let id = marked["record"]["id"].clone();

    let once = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.update",
        json!({ "id": id, "status": "present" }),
    );
    let twice = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.update",
        json!({ "id": id, "status": "present" }),
    );
    assert_eq!(once["record"]["status"], json!("present"));
    assert_eq!(twice["record"]["status"], json!("present"));
    assert_eq!(twice["record"]["id"], id);
    assert_eq!(twice["record"]["createdAt"], marked["record"]["createdAt"]);
    // Fixed-width ISO timestamps order lexically.
    let created = twice["record"]["createdAt"].as_str().expect("createdAt");
    let updated = twice["record"]["updatedAt"].as_str().expect("updatedAt");
    assert!(updated >= created);

    let missing = request(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.update",
        json!({ "id": "attendance_0_missing", "status": "absent" }),
    );
    assert_eq!(error_code(&missing), Some("not_found"));

    let bad_status = request(
        &mut stdin,
        &mut reader,
        "5",
        "attendance.mark",
        json!({ "studentId": "s1", "courseId": "1", "date": "2031-03-04", "status": "late" }),
    );
    assert_eq!(error_code(&bad_status), Some("bad_params"));

    let bad_date = request(
        &mut stdin,
        &mut reader,
        "6",
        "attendance.mark",
        json!({ "studentId": "s1", "courseId": "1", "date": "04/03/2031", "status": "present" }),
    );
    assert_eq!(error_code(&bad_date), Some("bad_params"));

    let no_student = request(
        &mut stdin,
        &mut reader,
        "7",
        "attendance.mark",
        json!({ "courseId": "1", "date": "2031-03-04", "status": "present" }),
    );
    assert_eq!(error_code(&no_student), Some("bad_params"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn date_groups_toggle_and_reset_on_logout() {
    let workspace = temp_dir("campusd-faculty-toggle");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_as_faculty(&mut stdin, &mut reader, &workspace);

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.mark",
        json!({ "studentId": "s1", "courseId": "1", "date": "2031-03-05", "status": "present" }),
    );

    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.toggleDate",
        json!({ "date": "2031-03-05" }),
    );
    assert_eq!(opened["expanded"], json!(true));

    let view = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.facultyCourse",
        json!({ "courseId": "1" }),
    );
    assert_eq!(
        group_for(&view, "2031-03-05").expect("group")["expanded"],
        json!(true)
    );

    let closed = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.toggleDate",
        json!({ "date": "2031-03-05" }),
    );
    assert_eq!(closed["expanded"], json!(false));

    request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "attendance.toggleDate",
        json!({ "date": "2031-03-05" }),
    );
    request_ok(&mut stdin, &mut reader, "6", "session.logout", json!({}));
    request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "session.login",
        json!({ "email": "drsmith@example.com", "password": "password" }),
    );
    let view = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "attendance.facultyCourse",
        json!({ "courseId": "1" }),
    );
    assert_eq!(
        group_for(&view, "2031-03-05").expect("group")["expanded"],
        json!(false)
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn faculty_cannot_use_student_views() {
    let workspace = temp_dir("campusd-faculty-forbidden");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_as_faculty(&mut stdin, &mut reader, &workspace);

    let overview = request(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.studentOverview",
        json!({}),
    );
    assert_eq!(error_code(&overview), Some("forbidden"));

    let course = request(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.studentCourse",
        json!({ "courseId": "1" }),
    );
    assert_eq!(error_code(&course), Some("forbidden"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
