//! Eligibility and analytics rules for the servants preparation program.
//!
//! Everything in this module is a pure function over an in-memory
//! [`Snapshot`]: no clocks are read, no state is kept, and the same input
//! always produces the same output. Undefined metrics stay `None` and are
//! never collapsed into zero.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::model::{
    section_label, AttendanceRecord, AttendanceStatus, Exam, ExamScore, ExamSection, ExamYearLevel,
    Lesson, Snapshot, StudentEnrollment, YearLevel,
};

/// Minimum attendance rate, in percent.
pub const ATTENDANCE_REQUIRED_PERCENT: u32 = 75;
/// Minimum overall exam average, in percent.
pub const OVERALL_AVERAGE_REQUIRED_PERCENT: u32 = 75;
/// Minimum per-section exam average, in percent. Deliberately lower than the
/// overall bar.
pub const SECTION_MINIMUM_PERCENT: u32 = 60;
/// A late arrival earns half the credit of a present one. Fixed policy, not
/// configurable.
pub const LATE_CREDIT: f64 = 0.5;

/// Half-up rounding to two decimal places. Applied to every percentage
/// before it is reported or compared against a threshold, so the verdict a
/// caller sees always matches the number printed next to it.
pub fn round_off_2_decimals(value: f64) -> f64 {
    ((100.0 * value) + 0.5).floor() / 100.0
}

/// An attendance record paired with the lesson it was taken at.
#[derive(Debug, Clone, Copy)]
pub struct CountableRecord<'a> {
    pub record: &'a AttendanceRecord,
    pub lesson: &'a Lesson,
}

/// Filters raw attendance rows down to the ones the rate math may see.
/// Rows whose lesson is not in the snapshot are dropped, exam sittings are
/// dropped, and when duplicates share a (student, lesson) pair only the
/// first row survives.
pub fn countable_records<'a>(
    records: impl IntoIterator<Item = &'a AttendanceRecord>,
    lessons_by_id: &HashMap<Uuid, &'a Lesson>,
) -> Vec<CountableRecord<'a>> {
    let mut seen: HashSet<(Uuid, Uuid)> = HashSet::new();
    let mut countable = Vec::new();
    for record in records {
        let lesson = match lessons_by_id.get(&record.lesson_id) {
            Some(lesson) => *lesson,
            None => continue,
        };
        if lesson.is_exam_day {
            continue;
        }
        if !seen.insert((record.student_id, record.lesson_id)) {
            continue;
        }
        countable.push(CountableRecord { record, lesson });
    }
    countable
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    /// Lessons that count toward the rate: everything except excused ones.
    pub total_lessons: u32,
    /// Every countable lesson, excused included.
    pub all_lessons: u32,
    pub present_count: u32,
    pub late_count: u32,
    pub absent_count: u32,
    pub excused_count: u32,
    pub effective_present: f64,
    /// `None` until at least one unexcused lesson exists.
    pub percentage: Option<f64>,
    pub met: bool,
    pub required: u32,
}

/// Tallies one scope of countable records. Excused lessons never penalize:
/// they leave the denominator entirely. A student with no denominator yet
/// has an undefined rate, and an undefined rate passes the threshold.
pub fn attendance_summary(
    statuses: impl IntoIterator<Item = AttendanceStatus>,
) -> AttendanceSummary {
    let mut present = 0u32;
    let mut late = 0u32;
    let mut absent = 0u32;
    let mut excused = 0u32;
    for status in statuses {
        match status {
            AttendanceStatus::Present => present += 1,
            AttendanceStatus::Late => late += 1,
            AttendanceStatus::Absent => absent += 1,
            AttendanceStatus::Excused => excused += 1,
        }
    }
    let all_lessons = present + late + absent + excused;
    let total_lessons = all_lessons - excused;
    let effective_present = f64::from(present) + LATE_CREDIT * f64::from(late);
    let percentage = if total_lessons > 0 {
        Some(round_off_2_decimals(
            effective_present / f64::from(total_lessons) * 100.0,
        ))
    } else {
        None
    };
    let met = percentage.map_or(true, |p| p >= f64::from(ATTENDANCE_REQUIRED_PERCENT));
    AttendanceSummary {
        total_lessons,
        all_lessons,
        present_count: present,
        late_count: late,
        absent_count: absent,
        excused_count: excused,
        effective_present,
        percentage,
        met,
        required: ATTENDANCE_REQUIRED_PERCENT,
    }
}

/// Percentage earned on one exam. An exam configured with no points cannot
/// produce a percentage; its scores are kept out of every average.
pub fn score_percentage(score: &ExamScore, exam: &Exam) -> Option<f64> {
    if exam.total_points > 0.0 {
        Some(score.score / exam.total_points * 100.0)
    } else {
        None
    }
}

/// Rounded mean over a set of percentages, `None` when there is nothing to
/// average.
pub fn mean_percentage(percentages: &[f64]) -> Option<f64> {
    if percentages.is_empty() {
        None
    } else {
        let mean = percentages.iter().sum::<f64>() / percentages.len() as f64;
        Some(round_off_2_decimals(mean))
    }
}

/// First recorded score wins when duplicates share an (exam, student) pair.
pub fn dedup_scores<'a>(scores: impl IntoIterator<Item = &'a ExamScore>) -> Vec<&'a ExamScore> {
    let mut seen: HashSet<(Uuid, Uuid)> = HashSet::new();
    scores
        .into_iter()
        .filter(|s| seen.insert((s.exam_id, s.student_id)))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionAverage {
    pub section_id: Uuid,
    pub section: String,
    pub average: f64,
    pub scores: u32,
    pub passing_met: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingExam {
    pub exam_id: Uuid,
    pub section_id: Uuid,
    pub section: String,
    pub year_level: ExamYearLevel,
    pub exam_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSummary {
    pub section_averages: Vec<SectionAverage>,
    /// Plain mean across every counted score, not a mean of section
    /// averages. `None` until the first score is counted.
    pub overall_average: Option<f64>,
    pub overall_average_met: bool,
    /// Vacuously true while no section has a counted score.
    pub all_sections_passing: bool,
    pub required_average: u32,
    pub required_minimum: u32,
    pub missing_exams: Vec<MissingExam>,
    pub total_applicable_exams: u32,
    /// Every deduplicated score row in scope, counted even when its exam
    /// cannot be resolved for averaging.
    pub exams_taken: u32,
}

/// Aggregates one student's recorded scores.
///
/// Two exam scopes feed this: `scorable` is the set whose scores count
/// toward the averages (the whole catalogue for the headline view, one
/// level's exams for a per-level view), while `applicable` is the set the
/// student owes, which drives `totalApplicableExams` and missing-exam
/// detection. Every row in `scores` counts as taken; averages deliberately
/// count every resolvable score even when the exam is not owed, while rows
/// that resolve to no exam, or to one worth zero points, feed no average.
/// A section with no counted scores is omitted from the list rather than
/// scored as zero, and only past-due exams with no recorded score are
/// reported missing.
pub fn exam_summary(
    scores: &[&ExamScore],
    scorable: &[&Exam],
    applicable: &[&Exam],
    sections: &[ExamSection],
    now: DateTime<Utc>,
) -> ExamSummary {
    let scorable_by_id: HashMap<Uuid, &Exam> =
        scorable.iter().map(|exam| (exam.id, *exam)).collect();

    let scored_exams: HashSet<Uuid> = scores.iter().map(|s| s.exam_id).collect();
    let mut percentages: Vec<f64> = Vec::new();
    let mut by_section: HashMap<Uuid, (f64, u32)> = HashMap::new();
    for score in scores {
        let exam = match scorable_by_id.get(&score.exam_id) {
            Some(exam) => *exam,
            None => continue,
        };
        let pct = match score_percentage(score, exam) {
            Some(pct) => pct,
            None => continue,
        };
        percentages.push(pct);
        let entry = by_section.entry(exam.exam_section_id).or_insert((0.0, 0));
        entry.0 += pct;
        entry.1 += 1;
    }

    let section_averages = ordered_section_averages(by_section, sections);
    let overall_average = mean_percentage(&percentages);
    let overall_average_met =
        overall_average.map_or(true, |avg| avg >= f64::from(OVERALL_AVERAGE_REQUIRED_PERCENT));
    let all_sections_passing = section_averages.iter().all(|s| s.passing_met);

    let mut missing_exams: Vec<MissingExam> = applicable
        .iter()
        .filter(|exam| exam.exam_date < now && !scored_exams.contains(&exam.id))
        .map(|exam| MissingExam {
            exam_id: exam.id,
            section_id: exam.exam_section_id,
            section: section_label(sections, exam.exam_section_id),
            year_level: exam.year_level,
            exam_date: exam.exam_date,
        })
        .collect();
    missing_exams.sort_by(|a, b| a.exam_date.cmp(&b.exam_date).then(a.exam_id.cmp(&b.exam_id)));

    ExamSummary {
        section_averages,
        overall_average,
        overall_average_met,
        all_sections_passing,
        required_average: OVERALL_AVERAGE_REQUIRED_PERCENT,
        required_minimum: SECTION_MINIMUM_PERCENT,
        missing_exams,
        total_applicable_exams: applicable.len() as u32,
        exams_taken: scores.len() as u32,
    }
}

/// Section rows come out in the order of the section list, with scored
/// sections missing from that list appended afterwards by id so nothing
/// silently disappears.
pub(crate) fn ordered_section_averages(
    by_section: HashMap<Uuid, (f64, u32)>,
    sections: &[ExamSection],
) -> Vec<SectionAverage> {
    let mut stragglers: Vec<Uuid> = by_section
        .keys()
        .filter(|id| !sections.iter().any(|s| s.id == **id))
        .copied()
        .collect();
    stragglers.sort();

    sections
        .iter()
        .map(|s| s.id)
        .chain(stragglers)
        .filter_map(|id| {
            let (sum, count) = *by_section.get(&id)?;
            let average = round_off_2_decimals(sum / f64::from(count));
            Some(SectionAverage {
                section_id: id,
                section: section_label(sections, id),
                average,
                scores: count,
                passing_met: average >= f64::from(SECTION_MINIMUM_PERCENT),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraduationSummary {
    pub eligible: bool,
    pub attendance_met: bool,
    pub overall_average_met: bool,
    pub all_sections_passing: bool,
}

/// Final verdict over the student's full history. Every gate must hold, and
/// each gate defaults to met while its metric is still undefined, so a
/// student is never failed for data that does not exist yet.
pub fn graduation_summary(
    attendance: &AttendanceSummary,
    exams: &ExamSummary,
) -> GraduationSummary {
    GraduationSummary {
        eligible: attendance.met && exams.overall_average_met && exams.all_sections_passing,
        attendance_met: attendance.met,
        overall_average_met: exams.overall_average_met,
        all_sections_passing: exams.all_sections_passing,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentSummary {
    pub year_level: YearLevel,
    pub status: EnrollmentStatus,
}

/// Collapses a student's enrollment rows to the level that drives exam
/// applicability: the highest year they ever enrolled in, active while any
/// row still is. A student with no rows has no enrollment to summarize.
pub fn enrollment_summary(enrollments: &[&StudentEnrollment]) -> Option<EnrollmentSummary> {
    let year_level = enrollments.iter().map(|e| e.year_level).max()?;
    let status = if enrollments.iter().any(|e| e.is_active) {
        EnrollmentStatus::Active
    } else {
        EnrollmentStatus::Inactive
    };
    Some(EnrollmentSummary { year_level, status })
}

/// The exams a student must eventually clear. A second-year student carries
/// the first year's exams forward, so the whole catalogue applies to them.
pub fn required_exams<'a>(exams: &'a [Exam], highest: Option<YearLevel>) -> Vec<&'a Exam> {
    match highest {
        None => Vec::new(),
        Some(YearLevel::Year1) => exams
            .iter()
            .filter(|exam| exam.year_level.applies_to(YearLevel::Year1))
            .collect(),
        Some(YearLevel::Year2) => exams.iter().collect(),
    }
}

/// Exams belonging to a single year level, for the per-level breakdown.
pub fn level_exams(exams: &[Exam], level: YearLevel) -> Vec<&Exam> {
    exams
        .iter()
        .filter(|exam| exam.year_level.applies_to(level))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearAttendance {
    pub academic_year_id: Uuid,
    pub attendance: AttendanceSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelExams {
    pub year_level: YearLevel,
    pub exams: ExamSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProgress {
    pub enrollment: Option<EnrollmentSummary>,
    pub attendance: AttendanceSummary,
    pub exams: ExamSummary,
    pub graduation: GraduationSummary,
    pub attendance_by_year: Vec<YearAttendance>,
    pub exams_by_year_level: Vec<LevelExams>,
}

/// Full analytics for one student, evaluated fresh from the snapshot.
///
/// The headline attendance and exam blocks span the student's entire
/// history; the by-year and by-level breakdowns rescope the same rules to
/// one academic year or one year level at a time.
pub fn student_progress(
    snapshot: &Snapshot,
    student_id: Uuid,
    now: DateTime<Utc>,
) -> StudentProgress {
    let lessons_by_id = snapshot.lessons_by_id();
    let rows: Vec<&StudentEnrollment> = snapshot
        .enrollments
        .iter()
        .filter(|e| e.student_id == student_id)
        .collect();
    let enrollment = enrollment_summary(&rows);
    let highest = enrollment.map(|e| e.year_level);

    let countable = countable_records(
        snapshot
            .attendance
            .iter()
            .filter(|r| r.student_id == student_id),
        &lessons_by_id,
    );
    let attendance = attendance_summary(countable.iter().map(|c| c.record.status));

    let mut year_ids: Vec<Uuid> = countable.iter().map(|c| c.lesson.academic_year_id).collect();
    year_ids.sort();
    year_ids.dedup();
    let attendance_by_year = year_ids
        .into_iter()
        .map(|year_id| YearAttendance {
            academic_year_id: year_id,
            attendance: attendance_summary(
                countable
                    .iter()
                    .filter(|c| c.lesson.academic_year_id == year_id)
                    .map(|c| c.record.status),
            ),
        })
        .collect();

    let scores = dedup_scores(
        snapshot
            .scores
            .iter()
            .filter(|s| s.student_id == student_id),
    );
    let catalogue: Vec<&Exam> = snapshot.exams.iter().collect();
    let applicable = required_exams(&snapshot.exams, highest);
    let exams = exam_summary(&scores, &catalogue, &applicable, &snapshot.sections, now);

    let levels: &[YearLevel] = match highest {
        None => &[],
        Some(YearLevel::Year1) => &[YearLevel::Year1],
        Some(YearLevel::Year2) => &[YearLevel::Year1, YearLevel::Year2],
    };
    let exams_by_year_level = levels
        .iter()
        .map(|&level| {
            let level_set = level_exams(&snapshot.exams, level);
            let level_scores: Vec<&ExamScore> = scores
                .iter()
                .filter(|s| level_set.iter().any(|e| e.id == s.exam_id))
                .copied()
                .collect();
            LevelExams {
                year_level: level,
                exams: exam_summary(
                    &level_scores,
                    &level_set,
                    &level_set,
                    &snapshot.sections,
                    now,
                ),
            }
        })
        .collect();

    let graduation = graduation_summary(&attendance, &exams);

    StudentProgress {
        enrollment,
        attendance,
        exams,
        graduation,
        attendance_by_year,
        exams_by_year_level,
    }
}
