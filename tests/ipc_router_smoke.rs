use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_servantprepd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn servantprepd");
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

fn error_code(value: &serde_json::Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let student_id = "00000000-0000-0000-0000-000000000001";
    let mentor_id = "00000000-0000-0000-0000-0000000000aa";
    let snapshot = json!({
        "enrollments": [
            { "studentId": student_id, "yearLevel": "YEAR_1", "isActive": true, "mentorId": mentor_id }
        ]
    });

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health.get("ok").and_then(|v| v.as_bool()), Some(true));
    assert!(
        health
            .get("result")
            .and_then(|r| r.get("version"))
            .and_then(|v| v.as_str())
            .is_some(),
        "health should report a version"
    );

    let open = request(
        &mut stdin,
        &mut reader,
        "2",
        "analytics.studentOpen",
        json!({ "studentId": student_id, "snapshot": snapshot }),
    );
    assert_eq!(open.get("ok").and_then(|v| v.as_bool()), Some(true));
    assert!(
        open.get("result")
            .and_then(|r| r.get("graduation"))
            .is_some(),
        "studentOpen should carry a graduation block"
    );

    let mentor = request(
        &mut stdin,
        &mut reader,
        "3",
        "dashboard.mentorOpen",
        json!({ "mentorId": mentor_id, "snapshot": snapshot }),
    );
    assert_eq!(mentor.get("ok").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(
        mentor
            .get("result")
            .and_then(|r| r.get("menteeCount"))
            .and_then(|v| v.as_u64()),
        Some(1)
    );

    let admin = request(
        &mut stdin,
        &mut reader,
        "4",
        "dashboard.adminOpen",
        json!({ "snapshot": snapshot }),
    );
    assert_eq!(admin.get("ok").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(
        admin
            .get("result")
            .and_then(|r| r.get("cohortSize"))
            .and_then(|v| v.as_u64()),
        Some(1)
    );

    let report = request(
        &mut stdin,
        &mut reader,
        "5",
        "reports.atRisk",
        json!({ "snapshot": snapshot }),
    );
    assert_eq!(report.get("ok").and_then(|v| v.as_bool()), Some(true));
    assert!(
        report
            .get("result")
            .and_then(|r| r.get("markdown"))
            .and_then(|v| v.as_str())
            .map(|m| m.starts_with("# At-Risk Summary"))
            .unwrap_or(false),
        "atRisk should render a markdown document"
    );

    let unknown = request(&mut stdin, &mut reader, "6", "grades.export", json!({}));
    assert_eq!(unknown.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(error_code(&unknown), "not_implemented");

    let missing_param = request(
        &mut stdin,
        &mut reader,
        "7",
        "analytics.studentOpen",
        json!({ "snapshot": snapshot }),
    );
    assert_eq!(missing_param.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(error_code(&missing_param), "bad_params");

    writeln!(stdin, "this is not json").expect("write raw line");
    stdin.flush().expect("flush raw line");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let bad: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(bad.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(error_code(&bad), "bad_json");

    let after = request(&mut stdin, &mut reader, "8", "health", json!({}));
    assert_eq!(
        after.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "sidecar should keep serving after a bad line"
    );

    drop(stdin);
    let _ = child.wait();
}
