
use serde_json::json;
use test_support::{request_ok, spawn_sidecar};

const STUDENT: &str = "00000000-0000-0000-0000-000000000001";
const YEAR: &str = "00000000-0000-0000-0000-000000000a01";
const DOCTRINE: &str = "00000000-0000-0000-0000-0000000000d1";
const LITURGICS: &str = "00000000-0000-0000-0000-0000000000d2";

fn exam_json(n: u32, section: &str, total_points: f64) -> serde_json::Value {
    json!({
        "id": format!("00000000-0000-0000-0000-00000000{:04x}", 0x0e00 + n),
        "academicYearId": YEAR,
        "examSectionId": section,
        "yearLevel": "YEAR_1",
        "examDate": "2026-02-01T10:00:00Z",
        "totalPoints": total_points
    })
}

fn score_json(n: u32, score: f64) -> serde_json::Value {
    json!({
        "examId": format!("00000000-0000-0000-0000-00000000{:04x}", 0x0e00 + n),
        "studentId": STUDENT,
        "score": score
    })
}

fn sections_json() -> serde_json::Value {
    json!([
        { "id": DOCTRINE, "name": "doctrine", "displayName": "Doctrine" },
        { "id": LITURGICS, "name": "liturgics", "displayName": "Liturgics" }
    ])
}

fn open_exams(exams: serde_json::Value, scores: serde_json::Value) -> serde_json::Value {
    let snapshot = json!({
        "enrollments": [{ "studentId": STUDENT, "yearLevel": "YEAR_1", "isActive": true }],
        "sections": sections_json(),
        "exams": exams,
        "scores": scores
    });

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let progress = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "analytics.studentOpen",
        json!({ "studentId": STUDENT, "asOf": "2026-05-01T00:00:00Z", "snapshot": snapshot }),
    );
    progress.get("exams").cloned().expect("exams block")
}

#[test]
fn one_weak_section_blocks_even_with_a_strong_overall() {
    let exams = json!([
        exam_json(1, DOCTRINE, 100.0),
        exam_json(2, DOCTRINE, 100.0),
        exam_json(3, LITURGICS, 100.0)
    ]);
    let scores = json!([score_json(1, 90.0), score_json(2, 95.0), score_json(3, 55.0)]);
    let exams_block = open_exams(exams, scores);

    assert_eq!(exams_block.get("overallAverage"), Some(&json!(80.0)));
    assert_eq!(exams_block.get("overallAverageMet"), Some(&json!(true)));
    assert_eq!(exams_block.get("allSectionsPassing"), Some(&json!(false)));
    let rows = exams_block
        .get("sectionAverages")
        .and_then(|v| v.as_array())
        .expect("sectionAverages array");
    assert_eq!(rows[0].get("section"), Some(&json!("Doctrine")));
    assert_eq!(rows[0].get("passingMet"), Some(&json!(true)));
    assert_eq!(rows[1].get("section"), Some(&json!("Liturgics")));
    assert_eq!(rows[1].get("average"), Some(&json!(55.0)));
    assert_eq!(rows[1].get("passingMet"), Some(&json!(false)));
}

#[test]
fn zero_point_exams_count_as_taken_but_never_averaged() {
    let exams = json!([exam_json(1, DOCTRINE, 0.0), exam_json(2, DOCTRINE, 100.0)]);
    let scores = json!([score_json(1, 10.0), score_json(2, 70.0)]);
    let exams_block = open_exams(exams, scores);

    assert_eq!(exams_block.get("examsTaken"), Some(&json!(2)));
    assert_eq!(exams_block.get("overallAverage"), Some(&json!(70.0)));
    let rows = exams_block
        .get("sectionAverages")
        .and_then(|v| v.as_array())
        .expect("sectionAverages array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("scores"), Some(&json!(1)));
}

#[test]
fn duplicate_scores_keep_the_first_recorded_row() {
    let exams = json!([exam_json(1, DOCTRINE, 100.0)]);
    let scores = json!([score_json(1, 40.0), score_json(1, 90.0)]);
    let exams_block = open_exams(exams, scores);

    assert_eq!(exams_block.get("examsTaken"), Some(&json!(1)));
    assert_eq!(exams_block.get("overallAverage"), Some(&json!(40.0)));
}

#[test]
fn unknown_exam_scores_count_as_taken_but_never_averaged() {
    let exams = json!([exam_json(1, DOCTRINE, 100.0)]);
    let scores = json!([score_json(1, 80.0), score_json(9, 10.0)]);
    let exams_block = open_exams(exams, scores);

    assert_eq!(exams_block.get("examsTaken"), Some(&json!(2)));
    assert_eq!(exams_block.get("totalApplicableExams"), Some(&json!(1)));
    assert_eq!(exams_block.get("overallAverage"), Some(&json!(80.0)));
    let rows = exams_block
        .get("sectionAverages")
        .and_then(|v| v.as_array())
        .expect("sectionAverages array");
    assert_eq!(rows.len(), 1);
}
