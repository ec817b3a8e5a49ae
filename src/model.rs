use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome recorded for one student at one lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    Excused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LessonStatus {
    Scheduled,
    Completed,
    Cancelled,
}

/// Enrollment level inside the two-year program. Ordered so that the second
/// year compares greater than the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum YearLevel {
    #[serde(rename = "YEAR_1")]
    Year1,
    #[serde(rename = "YEAR_2")]
    Year2,
}

/// Which enrollment level(s) an exam is set for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExamYearLevel {
    #[serde(rename = "YEAR_1")]
    Year1,
    #[serde(rename = "YEAR_2")]
    Year2,
    #[serde(rename = "BOTH")]
    Both,
}

impl ExamYearLevel {
    pub fn applies_to(self, level: YearLevel) -> bool {
        match self {
            ExamYearLevel::Both => true,
            ExamYearLevel::Year1 => level == YearLevel::Year1,
            ExamYearLevel::Year2 => level == YearLevel::Year2,
        }
    }
}

/// One attendance row, already joined to its lesson by id. Upstream rows may
/// carry presentation fields (`arrivedAt`, `notes`); only what the rules read
/// is deserialized.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub student_id: Uuid,
    pub lesson_id: Uuid,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: Uuid,
    pub academic_year_id: Uuid,
    pub scheduled_date: DateTime<Utc>,
    /// Exam sittings are flagged here and never count toward attendance.
    #[serde(default)]
    pub is_exam_day: bool,
    pub status: LessonStatus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: Uuid,
    pub academic_year_id: Uuid,
    pub exam_section_id: Uuid,
    pub year_level: ExamYearLevel,
    pub exam_date: DateTime<Utc>,
    pub total_points: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamScore {
    pub exam_id: Uuid,
    pub student_id: Uuid,
    pub score: f64,
}

/// A student may hold one row per academic year; the second-year row is what
/// makes the first year's exams carry forward.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentEnrollment {
    pub student_id: Uuid,
    pub year_level: YearLevel,
    pub is_active: bool,
    #[serde(default)]
    pub mentor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSection {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl ExamSection {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// One consistent read of the rows a caller fetched for a single invocation.
/// Every collection defaults to empty: partial data is a normal input here,
/// never an error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub enrollments: Vec<StudentEnrollment>,
    #[serde(default)]
    pub sections: Vec<ExamSection>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    pub attendance: Vec<AttendanceRecord>,
    #[serde(default)]
    pub exams: Vec<Exam>,
    #[serde(default)]
    pub scores: Vec<ExamScore>,
}

impl Snapshot {
    pub fn lessons_by_id(&self) -> HashMap<Uuid, &Lesson> {
        self.lessons.iter().map(|l| (l.id, l)).collect()
    }

    pub fn exams_by_id(&self) -> HashMap<Uuid, &Exam> {
        self.exams.iter().map(|e| (e.id, e)).collect()
    }
}

/// Display label for a section id; sections missing from the metadata list
/// surface under their raw id so nothing silently disappears.
pub fn section_label(sections: &[ExamSection], id: Uuid) -> String {
    sections
        .iter()
        .find(|s| s.id == id)
        .map(|s| s.label().to_string())
        .unwrap_or_else(|| id.to_string())
}
