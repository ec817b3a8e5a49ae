//! Cohort-level views built on top of the per-student rules: mentor
//! dashboards, the program-wide admin overview, and the at-risk ranking
//! shared by both.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::model::{Exam, ExamScore, ExamSection, LessonStatus, Snapshot, YearLevel};
use crate::progress::{
    attendance_summary, countable_records, dedup_scores, mean_percentage,
    ordered_section_averages, score_percentage, student_progress, AttendanceSummary,
    SectionAverage, StudentProgress,
};

/// One evaluated cohort member: the full per-student analytics keyed by id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortStudent {
    pub student_id: Uuid,
    pub progress: StudentProgress,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AtRiskStudent {
    pub student_id: Uuid,
    pub year_level: Option<YearLevel>,
    pub issues: Vec<String>,
    pub attendance_rate: Option<f64>,
    pub exam_average: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnTrackStudent {
    pub student_id: Uuid,
    pub year_level: Option<YearLevel>,
    pub attendance_rate: Option<f64>,
    pub exam_average: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortPartition {
    pub at_risk: Vec<AtRiskStudent>,
    pub on_track: Vec<OnTrackStudent>,
}

/// Itemized reasons a student is not eligible, in fixed display order.
/// A failed gate whose metric is undefined contributes nothing, so every
/// entry always carries a concrete number or section list.
pub fn issues_for(progress: &StudentProgress) -> Vec<String> {
    let mut issues = Vec::new();
    if !progress.attendance.met {
        if let Some(rate) = progress.attendance.percentage {
            issues.push(format!("Low attendance: {:.2}%", rate));
        }
    }
    if !progress.exams.overall_average_met {
        if let Some(average) = progress.exams.overall_average {
            issues.push(format!("Low exam average: {:.2}%", average));
        }
    }
    let failing: Vec<&str> = progress
        .exams
        .section_averages
        .iter()
        .filter(|s| !s.passing_met)
        .map(|s| s.section.as_str())
        .collect();
    if !failing.is_empty() {
        issues.push(format!("Sections below minimum: {}", failing.join(", ")));
    }
    issues
}

fn weakest_metric(attendance_rate: Option<f64>, exam_average: Option<f64>) -> f64 {
    attendance_rate
        .unwrap_or(100.0)
        .min(exam_average.unwrap_or(100.0))
}

/// Splits an evaluated cohort into at-risk and on-track lists. The at-risk
/// list is ranked by severity: more simultaneous issues first, ties broken
/// by the weaker of the two rates ascending, with a missing rate standing
/// in as 100 so nobody is ranked down on a metric they do not have yet.
/// The sort is stable over the cohort input order.
pub fn rank_cohort(cohort: &[CohortStudent]) -> CohortPartition {
    let mut partition = CohortPartition::default();
    for member in cohort {
        let progress = &member.progress;
        let year_level = progress.enrollment.map(|e| e.year_level);
        let attendance_rate = progress.attendance.percentage;
        let exam_average = progress.exams.overall_average;
        if progress.graduation.eligible {
            partition.on_track.push(OnTrackStudent {
                student_id: member.student_id,
                year_level,
                attendance_rate,
                exam_average,
            });
        } else {
            partition.at_risk.push(AtRiskStudent {
                student_id: member.student_id,
                year_level,
                issues: issues_for(progress),
                attendance_rate,
                exam_average,
            });
        }
    }
    partition.at_risk.sort_by(|a, b| {
        b.issues.len().cmp(&a.issues.len()).then_with(|| {
            weakest_metric(a.attendance_rate, a.exam_average)
                .partial_cmp(&weakest_metric(b.attendance_rate, b.exam_average))
                .unwrap_or(Ordering::Equal)
        })
    });
    partition
}

/// Distinct students holding at least one active enrollment, in first
/// appearance order.
pub fn active_students(snapshot: &Snapshot) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    snapshot
        .enrollments
        .iter()
        .filter(|e| e.is_active)
        .map(|e| e.student_id)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Distinct students actively assigned to the given mentor, in first
/// appearance order.
pub fn mentees_of(snapshot: &Snapshot, mentor_id: Uuid) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    snapshot
        .enrollments
        .iter()
        .filter(|e| e.is_active && e.mentor_id == Some(mentor_id))
        .map(|e| e.student_id)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Runs the full per-student evaluation for every listed student.
pub fn evaluate_cohort(
    snapshot: &Snapshot,
    students: &[Uuid],
    now: DateTime<Utc>,
) -> Vec<CohortStudent> {
    students
        .iter()
        .map(|&student_id| CohortStudent {
            student_id,
            progress: student_progress(snapshot, student_id, now),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorOverview {
    pub mentor_id: Uuid,
    pub mentee_count: u32,
    pub mentees: Vec<CohortStudent>,
    pub at_risk: Vec<AtRiskStudent>,
    pub on_track: Vec<OnTrackStudent>,
}

/// Everything a mentor's dashboard shows: one card per mentee plus the
/// ranked partitions over exactly those mentees.
pub fn mentor_overview(snapshot: &Snapshot, mentor_id: Uuid, now: DateTime<Utc>) -> MentorOverview {
    let mentees = evaluate_cohort(snapshot, &mentees_of(snapshot, mentor_id), now);
    let CohortPartition { at_risk, on_track } = rank_cohort(&mentees);
    MentorOverview {
        mentor_id,
        mentee_count: mentees.len() as u32,
        mentees,
        at_risk,
        on_track,
    }
}

/// Exam stats pooled across many students: every resolvable score in scope
/// counts once, with no per-student weighting.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PooledExams {
    pub section_averages: Vec<SectionAverage>,
    pub overall_average: Option<f64>,
    pub scores_counted: u32,
}

fn pooled_exams(
    scores: &[&ExamScore],
    exams_by_id: &HashMap<Uuid, &Exam>,
    sections: &[ExamSection],
) -> PooledExams {
    let mut percentages: Vec<f64> = Vec::new();
    let mut by_section: HashMap<Uuid, (f64, u32)> = HashMap::new();
    for score in scores {
        let exam = match exams_by_id.get(&score.exam_id) {
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
    PooledExams {
        section_averages: ordered_section_averages(by_section, sections),
        overall_average: mean_percentage(&percentages),
        scores_counted: percentages.len() as u32,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearLevelStats {
    pub year_level: YearLevel,
    pub students: u32,
    pub attendance: AttendanceSummary,
    pub exams: PooledExams,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicYearStats {
    pub academic_year_id: Uuid,
    pub attendance: AttendanceSummary,
    pub exam_average: Option<f64>,
    pub exams_scheduled: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonTally {
    pub total: u32,
    pub completed: u32,
    pub cancelled: u32,
    pub exam_days: u32,
    pub upcoming: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingExamRollup {
    pub students_with_missing: u32,
    pub total_missing: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOverview {
    pub cohort_size: u32,
    pub eligible_count: u32,
    pub at_risk_count: u32,
    pub attendance: AttendanceSummary,
    pub exams: PooledExams,
    pub by_year_level: Vec<YearLevelStats>,
    pub by_academic_year: Vec<AcademicYearStats>,
    pub lessons: LessonTally,
    pub missing_exams: MissingExamRollup,
    pub at_risk: Vec<AtRiskStudent>,
    pub on_track: Vec<OnTrackStudent>,
}

/// The program-wide dashboard. The cohort is every actively enrolled
/// student; attendance and exam pools tally their records together rather
/// than averaging per-student rates. Both year-level buckets are always
/// present, a studentless one carrying zero counts and null summaries, and
/// the per-academic-year rows cover every year any lesson or exam belongs
/// to, in id order.
pub fn admin_overview(snapshot: &Snapshot, now: DateTime<Utc>) -> AdminOverview {
    let students = active_students(snapshot);
    let cohort = evaluate_cohort(snapshot, &students, now);

    let lessons_by_id = snapshot.lessons_by_id();
    let exams_by_id = snapshot.exams_by_id();
    let members: HashSet<Uuid> = students.iter().copied().collect();

    let countable = countable_records(
        snapshot
            .attendance
            .iter()
            .filter(|r| members.contains(&r.student_id)),
        &lessons_by_id,
    );
    let attendance = attendance_summary(countable.iter().map(|c| c.record.status));

    let scores = dedup_scores(
        snapshot
            .scores
            .iter()
            .filter(|s| members.contains(&s.student_id)),
    );
    let exams = pooled_exams(&scores, &exams_by_id, &snapshot.sections);

    let mut by_year_level = Vec::new();
    for level in [YearLevel::Year1, YearLevel::Year2] {
        let bucket: HashSet<Uuid> = cohort
            .iter()
            .filter(|m| m.progress.enrollment.map(|e| e.year_level) == Some(level))
            .map(|m| m.student_id)
            .collect();
        let bucket_countable = countable_records(
            snapshot
                .attendance
                .iter()
                .filter(|r| bucket.contains(&r.student_id)),
            &lessons_by_id,
        );
        let bucket_scores = dedup_scores(
            snapshot
                .scores
                .iter()
                .filter(|s| bucket.contains(&s.student_id)),
        );
        by_year_level.push(YearLevelStats {
            year_level: level,
            students: bucket.len() as u32,
            attendance: attendance_summary(bucket_countable.iter().map(|c| c.record.status)),
            exams: pooled_exams(&bucket_scores, &exams_by_id, &snapshot.sections),
        });
    }

    let mut year_ids: Vec<Uuid> = snapshot
        .lessons
        .iter()
        .map(|l| l.academic_year_id)
        .chain(snapshot.exams.iter().map(|e| e.academic_year_id))
        .collect();
    year_ids.sort();
    year_ids.dedup();
    let by_academic_year = year_ids
        .into_iter()
        .map(|year_id| {
            let year_percentages: Vec<f64> = scores
                .iter()
                .filter_map(|&score| {
                    let exam = *exams_by_id.get(&score.exam_id)?;
                    if exam.academic_year_id != year_id {
                        return None;
                    }
                    score_percentage(score, exam)
                })
                .collect();
            AcademicYearStats {
                academic_year_id: year_id,
                attendance: attendance_summary(
                    countable
                        .iter()
                        .filter(|c| c.lesson.academic_year_id == year_id)
                        .map(|c| c.record.status),
                ),
                exam_average: mean_percentage(&year_percentages),
                exams_scheduled: snapshot
                    .exams
                    .iter()
                    .filter(|e| e.academic_year_id == year_id)
                    .count() as u32,
            }
        })
        .collect();

    let mut lessons = LessonTally::default();
    for lesson in &snapshot.lessons {
        lessons.total += 1;
        match lesson.status {
            LessonStatus::Completed => lessons.completed += 1,
            LessonStatus::Cancelled => lessons.cancelled += 1,
            LessonStatus::Scheduled => {
                if lesson.scheduled_date > now {
                    lessons.upcoming += 1;
                }
            }
        }
        if lesson.is_exam_day {
            lessons.exam_days += 1;
        }
    }

    let mut missing_exams = MissingExamRollup::default();
    for member in &cohort {
        let missing = member.progress.exams.missing_exams.len() as u32;
        if missing > 0 {
            missing_exams.students_with_missing += 1;
            missing_exams.total_missing += missing;
        }
    }

    let eligible_count = cohort
        .iter()
        .filter(|m| m.progress.graduation.eligible)
        .count() as u32;
    let CohortPartition { at_risk, on_track } = rank_cohort(&cohort);

    AdminOverview {
        cohort_size: cohort.len() as u32,
        eligible_count,
        at_risk_count: at_risk.len() as u32,
        attendance,
        exams,
        by_year_level,
        by_academic_year,
        lessons,
        missing_exams,
        at_risk,
        on_track,
    }
}
